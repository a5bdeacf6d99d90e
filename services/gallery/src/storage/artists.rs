use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use super::artworks::{top_artworks, ArtworkPreview};
use super::database::GalleryDatabase;
use super::error::StorageError;
use super::format_timestamp;

pub const STATUS_PENDING_CLAIM: &str = "pending_claim";
pub const STATUS_CLAIMED: &str = "claimed";

const ARTIST_COLUMNS: &str = "id, name, display_name, bio, avatar_svg, status, x_username, \
     api_key_hash, claim_token, verification_code, created_at, last_active_at";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_svg: Option<String>,
    pub status: String,
    pub x_username: Option<String>,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    #[serde(skip_serializing)]
    pub claim_token: String,
    #[serde(skip_serializing)]
    pub verification_code: String,
    pub created_at: String,
    pub last_active_at: String,
}

/// Profile fields to change. `Some(None)` clears a field.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<Option<String>>,
    pub display_name: Option<Option<String>>,
    pub avatar_svg: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.bio.is_some() {
            fields.push("bio");
        }
        if self.display_name.is_some() {
            fields.push("displayName");
        }
        if self.avatar_svg.is_some() {
            fields.push("avatarSvg");
        }
        fields
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistStats {
    pub artworks: u64,
    pub total_views: u64,
    pub favorites_received: u64,
    pub favorites_given: u64,
}

/// Artist with at least one public artwork, as shown on the artists page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryArtist {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_svg: Option<String>,
    pub created_at: String,
    pub last_active_at: String,
    pub total_artworks: u64,
    pub total_views: u64,
    pub total_favorites: u64,
    pub top_artworks: Vec<ArtworkPreview>,
}

fn map_artist(row: &Row<'_>) -> rusqlite::Result<ArtistRecord> {
    Ok(ArtistRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        bio: row.get(3)?,
        avatar_svg: row.get(4)?,
        status: row.get(5)?,
        x_username: row.get(6)?,
        api_key_hash: row.get(7)?,
        claim_token: row.get(8)?,
        verification_code: row.get(9)?,
        created_at: row.get(10)?,
        last_active_at: row.get(11)?,
    })
}

fn find_artist_where(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<ArtistRecord>, StorageError> {
    let sql = format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE {column} = ?1");
    let artist = conn
        .query_row(&sql, params![value], map_artist)
        .optional()?;
    Ok(artist)
}

impl GalleryDatabase {
    pub fn create_artist(&self, artist: &ArtistRecord) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO artists (
                id, name, display_name, bio, avatar_svg, status, x_username,
                api_key_hash, claim_token, verification_code, created_at, last_active_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                artist.id,
                artist.name,
                artist.display_name,
                artist.bio,
                artist.avatar_svg,
                artist.status,
                artist.x_username,
                artist.api_key_hash,
                artist.claim_token,
                artist.verification_code,
                artist.created_at,
                artist.last_active_at,
            ],
        )
        .map_err(|err| StorageError::from_insert(err, &format!("artist name {} is taken", artist.name)))?;

        debug!(artist_id = %artist.id, name = %artist.name, "stored artist");
        Ok(())
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<ArtistRecord>, StorageError> {
        let conn = self.lock()?;
        find_artist_where(&conn, "id", artist_id)
    }

    pub fn find_artist_by_name(&self, name: &str) -> Result<Option<ArtistRecord>, StorageError> {
        let conn = self.lock()?;
        find_artist_where(&conn, "name", name)
    }

    pub fn find_artist_by_api_key_hash(
        &self,
        api_key_hash: &str,
    ) -> Result<Option<ArtistRecord>, StorageError> {
        let conn = self.lock()?;
        find_artist_where(&conn, "api_key_hash", api_key_hash)
    }

    pub fn touch_artist(&self, artist_id: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE artists SET last_active_at = ?2 WHERE id = ?1",
            params![artist_id, format_timestamp(now)],
        )?;
        Ok(())
    }

    /// Applies `update` and bumps `last_active_at`, returning the stored row.
    pub fn update_profile(
        &self,
        artist_id: &str,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<ArtistRecord, StorageError> {
        let conn = self.lock()?;

        let mut assignments = vec!["last_active_at = ?1".to_string()];
        let mut bindings: Vec<Value> = vec![Value::Text(format_timestamp(now))];

        let fields = [
            ("bio", &update.bio),
            ("display_name", &update.display_name),
            ("avatar_svg", &update.avatar_svg),
        ];
        for (column, change) in fields {
            if let Some(value) = change {
                bindings.push(match value {
                    Some(text) => Value::Text(text.clone()),
                    None => Value::Null,
                });
                assignments.push(format!("{column} = ?{}", bindings.len()));
            }
        }

        bindings.push(Value::Text(artist_id.to_string()));
        let sql = format!(
            "UPDATE artists SET {} WHERE id = ?{}",
            assignments.join(", "),
            bindings.len()
        );

        let updated = conn.execute(&sql, params_from_iter(bindings.iter()))?;
        if updated == 0 {
            return Err(StorageError::ArtistNotFound(artist_id.to_string()));
        }

        find_artist_where(&conn, "id", artist_id)?
            .ok_or_else(|| StorageError::ArtistNotFound(artist_id.to_string()))
    }

    pub fn artist_stats(&self, artist_id: &str) -> Result<ArtistStats, StorageError> {
        let conn = self.lock()?;
        let stats = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM artworks WHERE artist_id = ?1),
                (SELECT COALESCE(SUM(view_count), 0) FROM artworks WHERE artist_id = ?1),
                (SELECT COUNT(*) FROM favorites f
                    JOIN artworks a ON a.id = f.artwork_id
                    WHERE a.artist_id = ?1),
                (SELECT COUNT(*) FROM favorites WHERE artist_id = ?1)
            "#,
            params![artist_id],
            |row| {
                Ok(ArtistStats {
                    artworks: row.get::<_, i64>(0)? as u64,
                    total_views: row.get::<_, i64>(1)? as u64,
                    favorites_received: row.get::<_, i64>(2)? as u64,
                    favorites_given: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(stats)
    }

    /// Artists with at least one public artwork, newest first, each with
    /// their `top_count` most viewed public pieces.
    pub fn list_gallery_artists(&self, top_count: usize) -> Result<Vec<GalleryArtist>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT ar.id, ar.name, ar.display_name, ar.bio, ar.avatar_svg,
                   ar.created_at, ar.last_active_at,
                   COUNT(aw.id),
                   COALESCE(SUM(aw.view_count), 0),
                   (SELECT COUNT(*) FROM favorites f WHERE f.artist_id = ar.id)
            FROM artists ar
            JOIN artworks aw ON aw.artist_id = ar.id AND aw.is_public = 1
            GROUP BY ar.id
            ORDER BY ar.created_at DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(GalleryArtist {
                id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                bio: row.get(3)?,
                avatar_svg: row.get(4)?,
                created_at: row.get(5)?,
                last_active_at: row.get(6)?,
                total_artworks: row.get::<_, i64>(7)? as u64,
                total_views: row.get::<_, i64>(8)? as u64,
                total_favorites: row.get::<_, i64>(9)? as u64,
                top_artworks: Vec::new(),
            })
        })?;

        let mut artists = Vec::new();
        for row in rows {
            let mut artist = row?;
            artist.top_artworks = top_artworks(&conn, &artist.id, top_count)?;
            artists.push(artist);
        }
        Ok(artists)
    }
}
