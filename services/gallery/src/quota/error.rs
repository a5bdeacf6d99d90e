use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StorageError;

use super::info::QuotaInfo;

/// A rejected upload. The stored counter is untouched.
#[derive(Debug, Clone, Error)]
#[error(
    "daily upload quota exceeded for artist {artist_id}: used={used_bytes}, limit={limit_bytes}, attempted={attempted_bytes}"
)]
pub struct QuotaExceeded {
    pub artist_id: String,
    pub used_bytes: u64,
    pub limit_bytes: u64,
    pub attempted_bytes: u64,
    pub reset_time: DateTime<Utc>,
    pub hint: String,
    pub info: QuotaInfo,
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("{0}")]
    Exceeded(Box<QuotaExceeded>),
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),
}
