use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("{0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("cannot reach container runtime: {0}")]
    Connect(String),

    #[error("container runtime answered {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("{0}")]
    Execution(String),

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u128 },

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Classification attached to failed operation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "IOError")]
    Io,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "PermissionError")]
    Permission,
    #[serde(rename = "ConnectError")]
    Connect,
    #[serde(rename = "RemoteError")]
    Remote,
    #[serde(rename = "ExecutionError")]
    Execution,
    #[serde(rename = "TimeoutError")]
    Timeout,
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "ValidationError")]
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "IOError",
            Self::NotFound => "NotFoundError",
            Self::Permission => "PermissionError",
            Self::Connect => "ConnectError",
            Self::Remote => "RemoteError",
            Self::Execution => "ExecutionError",
            Self::Timeout => "TimeoutError",
            Self::Configuration => "ConfigurationError",
            Self::Validation => "ValidationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ControlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Permission(_) => ErrorKind::Permission,
            Self::Connect(_) => ErrorKind::Connect,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub fn timeout(operation: impl Into<String>, limit: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis: limit.as_millis(),
        }
    }

    /// Wrap an I/O error with the path or action it concerns.
    pub fn io(context: impl fmt::Display, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(format!("{}: {}", context, err)),
            _ => Self::Io(format!("{}: {}", context, err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
