use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use super::error::StorageError;
use super::open_connection;
use super::schema::init_gallery_schema;

/// Artists, artworks, comments and favorites.
///
/// Queries live in `artists.rs`, `artworks.rs` and `engagement.rs` as
/// separate `impl` blocks over this type.
pub struct GalleryDatabase {
    conn: Mutex<Connection>,
}

impl GalleryDatabase {
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_connection(db_path, busy_timeout)?;
        init_gallery_schema(&conn)?;
        info!(path = %db_path.display(), "opened gallery database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::ConnectionPoisoned)
    }
}
