use std::fmt::{self, Debug, Display};
use std::io;

use crate::animal::AnimalId;
use crate::cell::CellId;

/// Provides `ModelError` and maps to other errors to
/// convert to a `ModelError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ModelError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// A constructor or setter was handed a value outside its domain.
    IllegalArgument {
        name: &'static str,
        reason: String,
    },
    UnknownCell(CellId),
    DuplicateCell(CellId),
    DuplicateAnimal(AnimalId),
    ModelError(String),
}

impl ModelError {
    pub(crate) fn illegal(name: &'static str, reason: impl Into<String>) -> Self {
        ModelError::IllegalArgument {
            name,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for ModelError {
    fn from(error: io::Error) -> Self {
        ModelError::IoError(error)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        ModelError::JsonError(error)
    }
}

impl From<csv::Error> for ModelError {
    fn from(error: csv::Error) -> Self {
        ModelError::CSVError(error)
    }
}

impl From<String> for ModelError {
    fn from(error: String) -> Self {
        ModelError::ModelError(error)
    }
}

impl From<&str> for ModelError {
    fn from(error: &str) -> Self {
        ModelError::ModelError(error.to_string())
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::IoError(e) => Some(e),
            ModelError::JsonError(e) => Some(e),
            ModelError::CSVError(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::IllegalArgument { name, reason } => {
                write!(f, "Error: invalid value for `{name}`: {reason}")
            }
            ModelError::UnknownCell(id) => write!(f, "Error: cell {id} is not in the model"),
            ModelError::DuplicateCell(id) => write!(f, "Error: cell {id} already exists"),
            ModelError::DuplicateAnimal(id) => {
                write!(f, "Error: animal {id} is already in the population")
            }
            ModelError::ModelError(message) => write!(f, "Error: {message}"),
            other => write!(f, "Error: {other:?}"),
        }
    }
}
