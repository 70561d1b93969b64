//! Error types for the resource layer
//!
//! Hydration itself is infallible. These errors cover the two things that can
//! still go wrong around it: a relation the caller needs is not in the link
//! table, or a response body is not JSON at all.

/// Resource layer errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// Relation not present in the resource's link table
    #[error("missing link relation: '{relation}'")]
    MissingLink {
        /// Relation name that was requested
        relation: String,
    },

    /// Body could not be decoded as JSON
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
}

impl ResourceError {
    /// Create missing link error
    #[inline]
    pub fn missing_link(relation: impl Into<String>) -> Self {
        Self::MissingLink {
            relation: relation.into(),
        }
    }
}

/// Parse a raw body into a JSON value
///
/// # Errors
/// `ResourceError::InvalidJson` when the bytes are not valid JSON.
pub fn parse_json(body: &[u8]) -> Result<serde_json::Value, ResourceError> {
    serde_json::from_slice(body).map_err(|e| ResourceError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_link_display() {
        let err = ResourceError::missing_link("module-append");
        assert_eq!(err.to_string(), "missing link relation: 'module-append'");
    }

    #[test]
    fn parse_json_rejects_html() {
        let err = parse_json(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, ResourceError::InvalidJson(_)));
    }
}
