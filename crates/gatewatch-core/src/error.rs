//! Error types for GateWatch

use std::path::PathBuf;

/// GateWatch error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Process not monitored: {0}")]
    ProcessNotMonitored(String),

    #[error("Process not running: {0}")]
    ProcessNotRunning(String),

    #[error("Pid mismatch for {name}: monitored={monitored}, requested={requested}")]
    PidMismatch {
        name: String,
        monitored: u32,
        requested: u32,
    },

    #[error("Access denied: {0}. Try running with elevated privileges")]
    AccessDenied(String),

    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("Process failed to start: {0}")]
    SpawnFailed(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Result type alias for GateWatch
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    pub fn store<S: Into<String>>(msg: S) -> Self {
        Error::StoreError(msg.into())
    }

    pub fn spawn<S: Into<String>>(msg: S) -> Self {
        Error::SpawnFailed(msg.into())
    }

    pub fn schedule<S: Into<String>>(msg: S) -> Self {
        Error::InvalidSchedule(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ProcessNotFound("gateway.exe".to_string());
        assert_eq!(err.to_string(), "Process not found: gateway.exe");
    }

    #[test]
    fn test_pid_mismatch_display() {
        let err = Error::PidMismatch {
            name: "gw".to_string(),
            monitored: 100,
            requested: 200,
        };
        assert!(err.to_string().contains("monitored=100"));
        assert!(err.to_string().contains("requested=200"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }
}
