pub mod artists;
pub mod artworks;
pub mod database;
pub mod engagement;
pub mod error;
pub mod quota_store;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

pub use artists::{ArtistRecord, ArtistStats, GalleryArtist, ProfileUpdate, STATUS_CLAIMED, STATUS_PENDING_CLAIM};
pub use artworks::{
    ArtistSummary, ArtworkFilter, ArtworkKind, ArtworkListing, ArtworkPreview, ArtworkRecord, ArtworkSort,
};
pub use database::GalleryDatabase;
pub use engagement::{CommentRecord, CommentWithAuthor, FavoriteToggle};
pub use error::StorageError;
pub use quota_store::{QuotaStore, RecordOutcome};

pub const GALLERY_DB_FILENAME: &str = "devaintart.db";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a connection with the pragmas every store relies on.
pub(crate) fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    Ok(conn)
}

/// Timestamps are stored as RFC 3339 strings with millisecond precision so
/// that lexical and chronological order agree.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
