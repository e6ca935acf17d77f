use crate::task::TaskId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend is unavailable")]
    Unavailable,

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid board type: {0}")]
    UnknownColumn(String),

    #[error("task {id} not found in {column}")]
    TaskNotFound { id: TaskId, column: String },

    #[error("task {0} not found")]
    UnknownTask(TaskId),

    #[error("position {index} is out of range for {column}")]
    InvalidPosition { index: usize, column: String },

    #[error("no task id left after {0}")]
    IdSpaceExhausted(TaskId),

    #[error("import payload must be a JSON object: {0}")]
    InvalidImport(String),
}
