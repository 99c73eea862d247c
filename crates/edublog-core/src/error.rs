//! Error types for edublog-core

use thiserror::Error;

/// Generic text shown when the server rejected a request without a message
pub const GENERIC_LOGIN_FAILURE: &str = "Login failed. Please try again.";

/// Main error type for edublog-core
#[derive(Error, Debug)]
pub enum Error {
    /// The authentication service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a malformed or incomplete payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The service rejected the credentials (or the request payload)
    #[error("Credential error: {message}")]
    Credential { message: String },

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// An operation required an authenticated session
    #[error("Not authenticated")]
    Unauthenticated,

    /// The authenticated user lacks the role required by an operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A newer session operation finished first; this result was discarded
    #[error("Session operation superseded by a newer one")]
    Superseded,

    /// Locally built input was rejected before reaching the server
    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Text suitable for showing to the end user.
    ///
    /// Credential errors carry the server-supplied message; network errors
    /// get a connectivity hint; everything else falls back to a generic text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Credential { message } if !message.trim().is_empty() => message.clone(),
            Self::Credential { .. } => GENERIC_LOGIN_FAILURE.to_string(),
            Self::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Self::Protocol(_) => {
                "The server sent an unexpected response. Please try again later.".to_string()
            }
            Self::Unauthenticated => "Please sign in to continue.".to_string(),
            Self::Forbidden(_) => "You do not have permission to do that.".to_string(),
            Self::Invalid(message) => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether this error belongs to the login failure taxonomy
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Protocol(_) | Self::Credential { .. } | Self::Storage(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type alias for edublog-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_message_is_surfaced() {
        let err = Error::Credential {
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_blank_credential_message_falls_back() {
        let err = Error::Credential {
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_LOGIN_FAILURE);
    }

    #[test]
    fn test_network_hint() {
        let err = Error::Network("connection refused".to_string());
        assert!(err.user_message().contains("connection"));
        assert!(err.is_login_failure());
        assert!(!Error::Superseded.is_login_failure());
    }

    #[test]
    fn test_invalid_input_is_not_a_login_failure() {
        let err = Error::Invalid("A student needs 1 or 2 guardians, got 0".to_string());
        assert_eq!(err.user_message(), "A student needs 1 or 2 guardians, got 0");
        assert!(!err.is_login_failure());
    }
}
