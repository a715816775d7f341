use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid summary: {0}")]
    InvalidSummary(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),
}

impl From<serde_json::Error> for OpsError {
    fn from(e: serde_json::Error) -> Self {
        OpsError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
