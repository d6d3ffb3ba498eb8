use std::fmt;

use fsmapper::MapperError;

/// Startup and lifecycle failures of the dev server.
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Invalid configuration or environment.
    Config(String),
    /// Socket or filesystem failure.
    Io(String),
    /// Namespace exploration failed.
    Mapper(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(msg) => write!(f, "configuration error: {msg}"),
            ServerError::Io(msg) => write!(f, "io error: {msg}"),
            ServerError::Mapper(msg) => write!(f, "mapper error: {msg}"),
            ServerError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(error: std::io::Error) -> Self {
        ServerError::Io(error.to_string())
    }
}

impl From<MapperError> for ServerError {
    fn from(error: MapperError) -> Self {
        match error {
            MapperError::Config(msg) => ServerError::Config(msg),
            other => ServerError::Mapper(other.to_string()),
        }
    }
}

/// Result type alias using [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;
