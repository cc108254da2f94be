use crate::storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to persist torrent metadata: {0}")]
    StoreWrite(#[source] StoreError),

    #[error("Failed to read torrent metadata: {0}")]
    StoreRead(#[source] StoreError),

    #[error("No torrent metadata for {bucket}/{object}")]
    NotFound { bucket: String, object: String },

    #[error("Bencode contract violation: {0}")]
    EncodingContract(String),

    #[error("Bencode parsing error: {0}")]
    Bencode(String),

    #[error("Invalid torrent file: {0}")]
    InvalidTorrent(String),

    #[error("Invalid builder state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeedError {
    /// True when the object simply has no torrent metadata yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, SeedError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
