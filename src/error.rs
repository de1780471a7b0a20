//! Error types for tongyeok.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Authentication and role errors
    #[error("Authentication failed: wrong secret")]
    AuthenticationFailed,

    #[error("Connection is not the active publisher")]
    NotPublisher,

    // Translation gateway errors
    #[error("Translation request failed: {message}")]
    Gateway { message: String },

    #[error("Translation gateway returned a malformed response: {message}")]
    GatewayResponse { message: String },

    // Wire protocol errors
    #[error("Malformed message: {message}")]
    MalformedMessage { message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_not_found_display() {
        let error = RelayError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = RelayError::ConfigInvalidValue {
            key: "session.debounce_ms".to_string(),
            message: "must be greater than zero".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for session.debounce_ms: must be greater than zero"
        );
    }

    #[test]
    fn test_authentication_failed_display() {
        let error = RelayError::AuthenticationFailed;
        assert_eq!(error.to_string(), "Authentication failed: wrong secret");
    }

    #[test]
    fn test_not_publisher_display() {
        let error = RelayError::NotPublisher;
        assert_eq!(error.to_string(), "Connection is not the active publisher");
    }

    #[test]
    fn test_gateway_display() {
        let error = RelayError::Gateway {
            message: "connection reset by peer".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Translation request failed: connection reset by peer"
        );
    }

    #[test]
    fn test_malformed_message_display() {
        let error = RelayError::MalformedMessage {
            message: "expected value at line 1 column 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed message: expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error: RelayError = io_error.into();
        assert!(matches!(error, RelayError::Io(_)));
        assert!(error.to_string().contains("pipe closed"));
    }
}
