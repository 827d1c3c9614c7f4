use shared::error::NameError;
use thiserror::Error;

use crate::navigation::Level;

/// A local edit or submission that failed its type constraints. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: expected {expected}, got '{candidate}'")]
pub struct ValidationError {
    pub field: String,
    pub expected: String,
    pub candidate: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            candidate: candidate.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptionError {
    #[error("description has no name")]
    MissingName,
    #[error("invalid name: {0}")]
    Name(#[from] NameError),
    #[error("variable '{name}': {reason}")]
    MalformedVariable { name: String, reason: String },
    #[error("command '{name}' has a malformed argument list: {reason}")]
    MalformedArguments { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("remote rejected the request: {message}")]
    RemoteRejected { message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error(transparent)]
    Description(#[from] DescriptionError),
    #[error("no {level} named '{name}' in the current listing")]
    NotFound { level: Level, name: String },
    #[error("no {0} selected")]
    NoSelection(Level),
    #[error("arguments of '{command}' are not available: {reason}")]
    ArgumentsUnavailable { command: String, reason: String },
    #[error("invalid backend url '{url}': {reason}")]
    InvalidBackendUrl { url: String, reason: String },
}

impl From<NameError> for PanelError {
    fn from(value: NameError) -> Self {
        PanelError::Description(DescriptionError::Name(value))
    }
}
