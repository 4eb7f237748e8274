//! Error types for QuickInput Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using QuickInput Error
pub type Result<T> = std::result::Result<T, Error>;

/// QuickInput error types
#[derive(Error, Debug)]
pub enum Error {
    /// Failure delivered by the requester (`$setError`) or carried by an item source
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Quick input service error: {0}")]
    Service(String),

    #[error("Requester error: {0}")]
    Requester(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error transferred from the requester process.
///
/// Cloneable so a single failure can reject a shared item future that
/// several consumers are polling.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: None,
            stack: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display_is_message() {
        let err = RemoteError::new("items failed").with_name("TypeError");
        assert_eq!(err.to_string(), "items failed");
        assert_eq!(Error::from(err).to_string(), "Remote error: items failed");
    }

    #[test]
    fn test_remote_error_deserializes_without_optional_fields() {
        let err: RemoteError = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(err, RemoteError::new("boom"));
    }
}
