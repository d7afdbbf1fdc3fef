//! Client error types.

use std::fmt;

use courtside_engine::EngineError;
use courtside_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Bad command input (slot file, arguments).
    Input(String),
    /// Provider error.
    Provider(ProviderError),
    /// Engine error.
    Engine(EngineError),
    /// IO error.
    Io(std::io::Error),
    /// Output could not be encoded.
    Output(serde_json::Error),
    /// The command ran but some slots were not booked.
    Incomplete(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::Provider(err) => write!(f, "{} ({})", err.user_message(), err),
            Self::Engine(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Output(err) => write!(f, "failed to encode output: {}", err),
            Self::Incomplete(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Output(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<EngineError> for ClientError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Provider(inner) => Self::Provider(inner),
            other => Self::Engine(other),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err)
    }
}
