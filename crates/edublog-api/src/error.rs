//! Error types for edublog-api

use thiserror::Error;

/// edublog-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// Session or authorization failure raised before any request was sent
    #[error(transparent)]
    Core(#[from] edublog_core::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a failure envelope or a non-2xx status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Text suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(e) => e.user_message(),
            Self::Server { message, .. } => message.clone(),
            Self::Http(e) if e.is_timeout() || e.is_connect() => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Self::InvalidArgument(message) => message.clone(),
            Self::Io(e) => format!("Could not read the file: {}", e),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// HTTP status of a server-side failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_keep_their_message() {
        let err = ApiError::from(edublog_core::Error::Unauthenticated);
        assert_eq!(err.user_message(), "Please sign in to continue.");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_server_message_is_shown() {
        let err = ApiError::Server {
            status: 422,
            message: "Title is required".to_string(),
        };
        assert_eq!(err.user_message(), "Title is required");
        assert_eq!(err.status(), Some(422));
    }
}
