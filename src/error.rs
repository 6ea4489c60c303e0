//! Custom error types for the ARX-RING configuration server
//!
//! This module defines the crate-wide error type and implements the necessary
//! traits to propagate failures from every request stage with `?`.

use std::fmt;

/// Main error type for the ARX-RING configuration server
#[derive(Debug)]
pub enum ArxRingError {
    /// Error occurred while parsing the bind address
    AddressParse(std::net::AddrParseError),

    /// Socket or file I/O failed
    Io(std::io::Error),

    /// The persisted configuration could not be parsed
    ConfigParse(json5::Error),

    /// The configuration record could not be serialized
    ConfigSerialize(serde_json::Error),

    /// A page template failed to render
    Render(askama::Error),

    /// An alarm list is missing or holds something other than a list
    AlarmList(String),

    /// Generic error with a message
    Generic(String),
}

impl fmt::Display for ArxRingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArxRingError::AddressParse(e) => {
                write!(f, "Failed to parse network address: {e}")
            }
            ArxRingError::Io(e) => {
                write!(f, "I/O error: {e}")
            }
            ArxRingError::ConfigParse(e) => {
                write!(f, "Failed to parse configuration: {e}")
            }
            ArxRingError::ConfigSerialize(e) => {
                write!(f, "Failed to serialize configuration: {e}")
            }
            ArxRingError::Render(e) => {
                write!(f, "Failed to render page: {e}")
            }
            ArxRingError::AlarmList(key) => {
                write!(f, "'{key}' not found in configuration or is not a list")
            }
            ArxRingError::Generic(msg) => {
                write!(f, "Error: {msg}")
            }
        }
    }
}

impl std::error::Error for ArxRingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArxRingError::AddressParse(e) => Some(e),
            ArxRingError::Io(e) => Some(e),
            ArxRingError::ConfigParse(e) => Some(e),
            ArxRingError::ConfigSerialize(e) => Some(e),
            ArxRingError::Render(e) => Some(e),
            ArxRingError::AlarmList(_) | ArxRingError::Generic(_) => None,
        }
    }
}

impl From<std::net::AddrParseError> for ArxRingError {
    fn from(error: std::net::AddrParseError) -> Self {
        ArxRingError::AddressParse(error)
    }
}

impl From<std::io::Error> for ArxRingError {
    fn from(error: std::io::Error) -> Self {
        ArxRingError::Io(error)
    }
}

impl From<json5::Error> for ArxRingError {
    fn from(error: json5::Error) -> Self {
        ArxRingError::ConfigParse(error)
    }
}

impl From<serde_json::Error> for ArxRingError {
    fn from(error: serde_json::Error) -> Self {
        ArxRingError::ConfigSerialize(error)
    }
}

impl From<askama::Error> for ArxRingError {
    fn from(error: askama::Error) -> Self {
        ArxRingError::Render(error)
    }
}

impl From<&str> for ArxRingError {
    fn from(message: &str) -> Self {
        ArxRingError::Generic(message.to_string())
    }
}

impl From<String> for ArxRingError {
    fn from(message: String) -> Self {
        ArxRingError::Generic(message)
    }
}

/// Result type alias using our custom error type
pub type Result<T> = std::result::Result<T, ArxRingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_generic_error_display() {
        let err = ArxRingError::from("Something broke");
        assert_eq!(err.to_string(), "Error: Something broke");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = ArxRingError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(err.to_string().starts_with("I/O error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_alarm_list_error_names_key() {
        let err = ArxRingError::AlarmList("mother_alarms".to_string());
        assert_eq!(
            err.to_string(),
            "'mother_alarms' not found in configuration or is not a list"
        );
    }
}
