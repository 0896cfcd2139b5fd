//! Error types and handling for the Amtron exporter
//!
//! This module defines the error types used throughout the application.
//! Poll-cycle failures are classified here so the run loop can log them
//! distinctly without ever terminating the process.

use thiserror::Error;

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, AmtronError>;

/// Main error type for the exporter
#[derive(Debug, Error)]
pub enum AmtronError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Connection-level failures talking to the charger (refused, timeout, DNS)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The charger answered with a non-200 status
    #[error("HTTP error: {url} responded with status {status}")]
    HttpStatus { status: u16, url: String },

    /// The charger rejected the supplied credentials
    #[error("Authentication rejected: check username and password")]
    AuthRejected,

    /// The charger accepted the login but needs operator configuration first
    #[error(
        "Device requires operator configuration (change_default_pw={change_default_pw}, set_master_rfid={set_master_rfid})"
    )]
    DeviceNotReady {
        change_default_pw: bool,
        set_master_rfid: bool,
    },

    /// The dashboard still reports `logged_in:false` after a fresh login
    #[error("Session expired again immediately after re-login")]
    SessionExpired,

    /// Well-formed HTTP exchange with an unexpected body shape
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Metrics registry errors
    #[error("Metrics error: {message}")]
    Metrics { message: String },

    /// HTTP server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

impl AmtronError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        AmtronError::Config {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        AmtronError::Network {
            message: message.into(),
        }
    }

    /// Create a new HTTP status error
    pub fn http_status<S: Into<String>>(status: u16, url: S) -> Self {
        AmtronError::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        AmtronError::Protocol {
            message: message.into(),
        }
    }

    /// Create a new metrics error
    pub fn metrics<S: Into<String>>(message: S) -> Self {
        AmtronError::Metrics {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        AmtronError::Web {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        AmtronError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        AmtronError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Credentials or device setup prevented a session from being established
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AmtronError::AuthRejected | AmtronError::DeviceNotReady { .. }
        )
    }

    /// The charger could not be reached or answered with a non-200 status
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            AmtronError::Network { .. } | AmtronError::HttpStatus { .. }
        )
    }
}

impl From<std::io::Error> for AmtronError {
    fn from(err: std::io::Error) -> Self {
        AmtronError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for AmtronError {
    fn from(err: serde_yaml::Error) -> Self {
        AmtronError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AmtronError {
    fn from(err: serde_json::Error) -> Self {
        AmtronError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AmtronError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AmtronError::Serialization {
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return AmtronError::http_status(status.as_u16(), url);
        }
        AmtronError::network(err.to_string())
    }
}

impl From<prometheus::Error> for AmtronError {
    fn from(err: prometheus::Error) -> Self {
        AmtronError::metrics(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = AmtronError::config("test config error");
        assert!(matches!(err, AmtronError::Config { .. }));

        let err = AmtronError::http_status(500, "http://charger/json/dashboard.json");
        assert!(matches!(err, AmtronError::HttpStatus { status: 500, .. }));

        let err = AmtronError::validation("field", "test validation error");
        assert!(matches!(err, AmtronError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = AmtronError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = AmtronError::http_status(503, "http://10.0.0.5:80/json/dashboard.json");
        assert_eq!(
            format!("{}", err),
            "HTTP error: http://10.0.0.5:80/json/dashboard.json responded with status 503"
        );

        let err = AmtronError::DeviceNotReady {
            change_default_pw: true,
            set_master_rfid: false,
        };
        assert!(format!("{}", err).contains("operator configuration"));
    }

    #[test]
    fn test_classification() {
        assert!(AmtronError::AuthRejected.is_auth_failure());
        assert!(
            AmtronError::DeviceNotReady {
                change_default_pw: false,
                set_master_rfid: true
            }
            .is_auth_failure()
        );
        assert!(!AmtronError::SessionExpired.is_auth_failure());

        assert!(AmtronError::network("refused").is_transport_failure());
        assert!(AmtronError::http_status(404, "x").is_transport_failure());
        assert!(!AmtronError::protocol("x").is_transport_failure());
    }
}
