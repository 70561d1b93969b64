//! Service descriptor (API root)
//!
//! Lists the packages and commands the server can execute. Parameter
//! declarations are kept as raw JSON here; the command layer turns them into
//! typed parameter trees.

use crate::links::LinkTable;
use crate::wire;
use serde_json::Value;

/// Command declared by a package
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDescriptor {
    /// Command identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Flat parameter declarations
    pub parameters: Vec<Value>,
}

/// Package of commands
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    /// Package identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Commands of this package
    pub commands: Vec<CommandDescriptor>,
}

/// API root descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    /// Service name
    pub name: String,
    /// Packages available for the default environment
    pub packages: Vec<PackageDescriptor>,
    /// Hypermedia links
    pub links: LinkTable,
}

impl ServiceDescriptor {
    /// Hydrate from wire JSON
    ///
    /// Packages are read from `environment.packages` or a top-level `packages`.
    #[must_use]
    pub fn from_wire(json: &Value) -> Self {
        let package_list = json
            .get("environment")
            .filter(|env| env.get("packages").is_some())
            .unwrap_or(json);

        let packages = wire::array_field(package_list, "packages")
            .iter()
            .map(|pkg| PackageDescriptor {
                id: wire::str_field(pkg, "id").unwrap_or_default(),
                name: wire::str_field(pkg, "name").unwrap_or_default(),
                commands: wire::array_field(pkg, "commands")
                    .iter()
                    .map(|cmd| CommandDescriptor {
                        id: wire::str_field(cmd, "id").unwrap_or_default(),
                        name: wire::str_field(cmd, "name").unwrap_or_default(),
                        parameters: wire::array_field(cmd, "parameters").to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            name: wire::str_field(json, "name").unwrap_or_default(),
            packages,
            links: LinkTable::of(json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn packages_from_environment() {
        let svc = ServiceDescriptor::from_wire(&json!({
            "name": "Vizier Web API",
            "environment": {"packages": [
                {"id": "vizual", "name": "VizUAL", "commands": [
                    {"id": "deleteRow", "name": "Delete Row", "parameters": [{"id": "dataset"}]}
                ]}
            ]},
            "links": [{"rel": "self", "href": "http://api/"}]
        }));

        assert_eq!(svc.packages.len(), 1);
        assert_eq!(svc.packages[0].commands[0].id, "deleteRow");
        assert_eq!(svc.packages[0].commands[0].parameters.len(), 1);
    }
}
