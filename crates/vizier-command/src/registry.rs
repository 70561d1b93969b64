//! Package registry
//!
//! Command specs by `(package, command)`, built from the service descriptor.

use crate::error::CommandError;
use crate::spec::CommandSpec;
use indexmap::IndexMap;
use vizier_resource::ServiceDescriptor;

/// Registry of the commands the server can execute
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    commands: IndexMap<(String, String), CommandSpec>,
}

impl PackageRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the service descriptor, preserving declaration order
    #[must_use]
    pub fn from_service(service: &ServiceDescriptor) -> Self {
        let mut registry = Self::new();
        for package in &service.packages {
            for command in &package.commands {
                registry.register(CommandSpec::from_descriptor(&package.id, command));
            }
        }
        registry
    }

    /// Register (or replace) a command spec
    pub fn register(&mut self, spec: CommandSpec) {
        self.commands
            .insert((spec.package_id.clone(), spec.command_id.clone()), spec);
    }

    /// Look up a command spec
    #[must_use]
    pub fn command(&self, package_id: &str, command_id: &str) -> Option<&CommandSpec> {
        self.commands
            .get(&(package_id.to_string(), command_id.to_string()))
    }

    /// Look up a command spec, failing for unknown commands
    ///
    /// # Errors
    /// `CommandError::UnknownCommand`
    pub fn require(&self, package_id: &str, command_id: &str) -> Result<&CommandSpec, CommandError> {
        self.command(package_id, command_id)
            .ok_or_else(|| CommandError::UnknownCommand {
                package_id: package_id.to_string(),
                command_id: command_id.to_string(),
            })
    }

    /// Commands of one package in declaration order
    pub fn package(&self, package_id: &str) -> impl Iterator<Item = &CommandSpec> {
        let package_id = package_id.to_string();
        self.commands
            .values()
            .filter(move |spec| spec.package_id == package_id)
    }

    /// Number of registered commands
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if no command is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
