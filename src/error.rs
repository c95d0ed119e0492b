use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}", labeled("Not found", .0))]
    NotFound(String),
    #[error("{}", labeled("Invalid input", .0))]
    InvalidInput(String),
    #[error("{}", labeled("Invalid format", .0))]
    InvalidFormat(String),
    #[error("storage read failed: {0}")]
    StorageRead(#[source] StorageError),
    #[error("storage write failed: {0}")]
    StorageWrite(#[source] StorageError),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

fn labeled(label: &str, message: &str) -> String {
    if message.contains('\n') {
        format!("{label}:\n{message}")
    } else {
        format!("{label}: {message}")
    }
}
