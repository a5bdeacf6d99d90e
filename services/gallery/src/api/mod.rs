use std::sync::Arc;

pub mod auth;
pub mod handlers;
pub mod router;
pub mod types;
pub mod validation;

pub use handlers::*;
pub use router::create_router;
pub use types::*;

use crate::config::GalleryConfig;
use crate::objects::ObjectStore;
use crate::quota::{Clock, QuotaTracker};
use crate::storage::{GalleryDatabase, StorageError};

pub struct ApiState {
    pub db: Arc<GalleryDatabase>,
    pub quota: Arc<QuotaTracker>,
    pub objects: Arc<dyn ObjectStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<GalleryConfig>,
}

impl ApiState {
    pub fn new(
        db: Arc<GalleryDatabase>,
        quota: Arc<QuotaTracker>,
        objects: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        config: GalleryConfig,
    ) -> Self {
        Self {
            db,
            quota,
            objects,
            clock,
            config: Arc::new(config),
        }
    }

    /// Runs `f` against the gallery database on the blocking pool. Writers
    /// share the file lock with the quota store and can wait up to the busy
    /// timeout for it.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&GalleryDatabase) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(db.as_ref())).await?
    }
}
