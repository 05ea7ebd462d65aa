//! Error type shared by the inspector crates.

use thiserror::Error;

use crate::path::FieldPath;
use crate::value::InstanceId;

/// Errors raised by fallible inspector internals.
///
/// The renderer never lets these escape to the host: they are turned into
/// diagnostics attached to the owning instance.
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("no value at path '{0}'")]
    PathNotFound(FieldPath),

    #[error("value at '{path}' is not {expected}")]
    TypeMismatch { path: FieldPath, expected: &'static str },

    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("instance {0} is not part of the edited set")]
    UnknownInstance(InstanceId),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("invalid history index {0}")]
    InvalidHistoryIndex(usize),

    #[error("could not determine home directory")]
    NoHomeDirectory,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InspectorError>;
