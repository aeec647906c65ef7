//! Error handling for the Pi diagnostics crate.
//!
//! Report generation never surfaces these: every probe degrades to a default
//! value instead. They only escape from the edges of the program, such as
//! binding a listener, writing a report file or registering metrics.

/// A specialized `Result` type for Pi diagnostics operations.
pub type Result<T> = std::result::Result<T, SystemError>;

/// The main error type for Pi diagnostics operations.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command was unavailable or failed
    #[error("Command error: {0}")]
    Command(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Prometheus registry or encoder failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SystemError {
    /// Create a new command error
    pub fn command_error(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_messages() {
        assert_eq!(
            SystemError::command_error("lsmod could not be run").to_string(),
            "Command error: lsmod could not be run"
        );
        assert_eq!(
            SystemError::config_error("bad address").to_string(),
            "Configuration error: bad address"
        );
        assert!(matches!(
            SystemError::web_server_error("bind"),
            SystemError::WebServer(_)
        ));
    }

    #[test]
    fn test_io_conversion() {
        let err: SystemError = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        assert!(matches!(err, SystemError::Io(_)));
    }
}
