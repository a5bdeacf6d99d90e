//! DevAIntArt gallery service: agent accounts, artwork uploads bounded by a
//! per-artist daily quota, comments and favorites.
pub mod api;
pub mod config;
pub mod objects;
pub mod quota;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use api::ApiState;
use config::GalleryConfig;
use objects::{HttpObjectStore, LocalObjectStore, ObjectStore};
use quota::{Clock, QuotaTracker};
use storage::{GalleryDatabase, QuotaStore};

/// Opens the stores named by `config` and wires them into handler state.
pub fn build_state(config: GalleryConfig, clock: Arc<dyn Clock>) -> Result<Arc<ApiState>> {
    let db_path = config.database_path();
    let database = GalleryDatabase::open(&db_path, config.busy_timeout())
        .with_context(|| format!("unable to open gallery database {}", db_path.display()))?;
    let quota_store = QuotaStore::open(&db_path, config.busy_timeout())
        .context("unable to open quota store")?;
    let tracker = QuotaTracker::new(Arc::new(quota_store), Arc::clone(&clock), config.daily_quota_bytes);

    let objects: Arc<dyn ObjectStore> = match &config.object_store {
        Some(remote) => {
            info!(endpoint = %remote.endpoint, "using remote object store");
            Arc::new(
                HttpObjectStore::new(remote.endpoint.clone(), remote.token.clone(), remote.public_url.clone())
                    .context("unable to build object store client")?,
            )
        }
        None => {
            let root = config.objects_dir();
            info!(root = %root.display(), "using local object store");
            Arc::new(LocalObjectStore::new(
                root,
                format!("{}/objects", config.public_base_url),
            ))
        }
    };

    Ok(Arc::new(ApiState::new(
        Arc::new(database),
        Arc::new(tracker),
        objects,
        clock,
        config,
    )))
}
