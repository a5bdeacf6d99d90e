use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("request to object store failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("object store responded with {status} for {key}")]
    UnexpectedStatus { status: u16, key: String },
}
