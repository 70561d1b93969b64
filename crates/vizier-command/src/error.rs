//! Error types for command encoding

/// Command encoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Form values failed validation; nothing may be submitted
    #[error("invalid command arguments: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Command is not part of the package catalogue
    #[error("unknown command: {package_id}.{command_id}")]
    UnknownCommand {
        /// Package identifier
        package_id: String,
        /// Command identifier
        command_id: String,
    },

    /// A structured argument had the wrong JSON shape
    #[error("malformed argument '{parameter}': expected {expected}")]
    MalformedArgument {
        /// Parameter identifier
        parameter: String,
        /// Expected shape
        expected: &'static str,
    },
}

impl CommandError {
    /// Validation messages, empty for other kinds
    #[must_use]
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Validation(messages) => messages,
            _ => &[],
        }
    }
}
