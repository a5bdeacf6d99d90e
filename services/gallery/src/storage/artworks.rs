use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::database::GalleryDatabase;
use super::error::StorageError;

const ARTWORK_COLUMNS: &str = "aw.id, aw.artist_id, aw.title, aw.description, aw.content_type, \
     aw.svg_data, aw.image_url, aw.object_key, aw.file_size, aw.width, aw.height, aw.prompt, \
     aw.model, aw.tags, aw.category, aw.is_public, aw.view_count, aw.agent_view_count, aw.created_at";
const ARTWORK_COLUMN_COUNT: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkKind {
    Svg,
    Png,
}

impl ArtworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtworkKind::Svg => "svg",
            ArtworkKind::Png => "png",
        }
    }
}

impl fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for ArtworkKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ArtworkKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "svg" => Ok(ArtworkKind::Svg),
            "png" => Ok(ArtworkKind::Png),
            other => Err(FromSqlError::Other(
                format!("unknown artwork content type {other}").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkRecord {
    pub id: String,
    pub artist_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content_type: ArtworkKind,
    pub svg_data: Option<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub object_key: Option<String>,
    pub file_size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub is_public: bool,
    pub view_count: u64,
    pub agent_view_count: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub avatar_svg: Option<String>,
}

/// Artwork joined with its artist and engagement counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkListing {
    #[serde(flatten)]
    pub artwork: ArtworkRecord,
    pub artist: ArtistSummary,
    pub favorite_count: u64,
    pub comment_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkPreview {
    pub id: String,
    pub title: String,
    pub content_type: ArtworkKind,
    pub svg_data: Option<String>,
    pub image_url: Option<String>,
    pub view_count: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkSort {
    #[default]
    Recent,
    Popular,
}

impl ArtworkSort {
    fn order_clause(&self) -> &'static str {
        match self {
            ArtworkSort::Recent => "aw.created_at DESC",
            ArtworkSort::Popular => "aw.view_count DESC, aw.created_at DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtworkFilter {
    pub category: Option<String>,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub sort: ArtworkSort,
    pub page: u32,
    pub limit: u32,
}

impl Default for ArtworkFilter {
    fn default() -> Self {
        Self {
            category: None,
            artist_id: None,
            artist_name: None,
            sort: ArtworkSort::Recent,
            page: 1,
            limit: 20,
        }
    }
}

fn map_artwork(row: &Row<'_>) -> rusqlite::Result<ArtworkRecord> {
    Ok(ArtworkRecord {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        content_type: row.get(4)?,
        svg_data: row.get(5)?,
        image_url: row.get(6)?,
        object_key: row.get(7)?,
        file_size: row.get::<_, i64>(8)? as u64,
        width: row.get(9)?,
        height: row.get(10)?,
        prompt: row.get(11)?,
        model: row.get(12)?,
        tags: row.get(13)?,
        category: row.get(14)?,
        is_public: row.get(15)?,
        view_count: row.get::<_, i64>(16)? as u64,
        agent_view_count: row.get::<_, i64>(17)? as u64,
        created_at: row.get(18)?,
    })
}

fn map_listing(row: &Row<'_>) -> rusqlite::Result<ArtworkListing> {
    let base = ARTWORK_COLUMN_COUNT;
    Ok(ArtworkListing {
        artwork: map_artwork(row)?,
        artist: ArtistSummary {
            id: row.get(base)?,
            name: row.get(base + 1)?,
            display_name: row.get(base + 2)?,
            avatar_svg: row.get(base + 3)?,
        },
        favorite_count: row.get::<_, i64>(base + 4)? as u64,
        comment_count: row.get::<_, i64>(base + 5)? as u64,
    })
}

fn listing_select() -> String {
    format!(
        "SELECT {ARTWORK_COLUMNS}, ar.id, ar.name, ar.display_name, ar.avatar_svg, \
         (SELECT COUNT(*) FROM favorites f WHERE f.artwork_id = aw.id), \
         (SELECT COUNT(*) FROM comments c WHERE c.artwork_id = aw.id) \
         FROM artworks aw JOIN artists ar ON ar.id = aw.artist_id"
    )
}

fn map_preview(row: &Row<'_>) -> rusqlite::Result<ArtworkPreview> {
    Ok(ArtworkPreview {
        id: row.get(0)?,
        title: row.get(1)?,
        content_type: row.get(2)?,
        svg_data: row.get(3)?,
        image_url: row.get(4)?,
        view_count: row.get::<_, i64>(5)? as u64,
        created_at: row.get(6)?,
    })
}

fn previews(
    conn: &Connection,
    artist_id: &str,
    order: &str,
    limit: usize,
) -> Result<Vec<ArtworkPreview>, StorageError> {
    let sql = format!(
        "SELECT id, title, content_type, svg_data, image_url, view_count, created_at \
         FROM artworks WHERE artist_id = ?1 AND is_public = 1 \
         ORDER BY {order} LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![artist_id, limit as i64], map_preview)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Most viewed public artworks for an artist.
pub(crate) fn top_artworks(
    conn: &Connection,
    artist_id: &str,
    limit: usize,
) -> Result<Vec<ArtworkPreview>, StorageError> {
    previews(conn, artist_id, "view_count DESC, created_at DESC", limit)
}

fn find_artwork(conn: &Connection, artwork_id: &str) -> Result<Option<ArtworkRecord>, StorageError> {
    let sql = format!("SELECT {ARTWORK_COLUMNS} FROM artworks aw WHERE aw.id = ?1");
    let artwork = conn
        .query_row(&sql, params![artwork_id], map_artwork)
        .optional()?;
    Ok(artwork)
}

pub(crate) fn bump_agent_views(conn: &Connection, artwork_id: &str) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE artworks SET agent_view_count = agent_view_count + 1 WHERE id = ?1",
        params![artwork_id],
    )?;
    Ok(())
}

impl GalleryDatabase {
    pub fn insert_artwork(&self, artwork: &ArtworkRecord) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO artworks (
                id, artist_id, title, description, content_type, svg_data, image_url,
                object_key, file_size, width, height, prompt, model, tags, category,
                is_public, view_count, agent_view_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                artwork.id,
                artwork.artist_id,
                artwork.title,
                artwork.description,
                artwork.content_type,
                artwork.svg_data,
                artwork.image_url,
                artwork.object_key,
                artwork.file_size as i64,
                artwork.width,
                artwork.height,
                artwork.prompt,
                artwork.model,
                artwork.tags,
                artwork.category,
                artwork.is_public,
                artwork.view_count as i64,
                artwork.agent_view_count as i64,
                artwork.created_at,
            ],
        )
        .map_err(|err| StorageError::from_insert(err, &format!("artwork {} already exists", artwork.id)))?;

        debug!(
            artwork_id = %artwork.id,
            artist_id = %artwork.artist_id,
            kind = %artwork.content_type,
            bytes = artwork.file_size,
            "stored artwork"
        );
        Ok(())
    }

    pub fn get_artwork(&self, artwork_id: &str) -> Result<Option<ArtworkRecord>, StorageError> {
        let conn = self.lock()?;
        find_artwork(&conn, artwork_id)
    }

    pub fn get_artwork_listing(&self, artwork_id: &str) -> Result<Option<ArtworkListing>, StorageError> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE aw.id = ?1", listing_select());
        let listing = conn
            .query_row(&sql, params![artwork_id], map_listing)
            .optional()?;
        Ok(listing)
    }

    /// One page of public artworks plus the total matching count.
    pub fn list_artworks(&self, filter: &ArtworkFilter) -> Result<(Vec<ArtworkListing>, u64), StorageError> {
        let conn = self.lock()?;

        let mut conditions = vec!["aw.is_public = 1".to_string()];
        let mut bindings: Vec<Value> = Vec::new();

        if let Some(category) = &filter.category {
            bindings.push(Value::Text(category.clone()));
            conditions.push(format!("aw.category = ?{}", bindings.len()));
        }
        if let Some(artist_id) = &filter.artist_id {
            bindings.push(Value::Text(artist_id.clone()));
            conditions.push(format!("aw.artist_id = ?{}", bindings.len()));
        }
        if let Some(artist_name) = &filter.artist_name {
            bindings.push(Value::Text(artist_name.clone()));
            conditions.push(format!("ar.name = ?{}", bindings.len()));
        }
        let where_clause = conditions.join(" AND ");

        let count_sql = format!(
            "SELECT COUNT(*) FROM artworks aw JOIN artists ar ON ar.id = aw.artist_id WHERE {where_clause}"
        );
        let total = conn.query_row(&count_sql, params_from_iter(bindings.iter()), |row| {
            row.get::<_, i64>(0)
        })? as u64;

        let limit = filter.limit.max(1);
        let offset = (filter.page.max(1) - 1) as i64 * limit as i64;
        bindings.push(Value::Integer(limit as i64));
        let limit_idx = bindings.len();
        bindings.push(Value::Integer(offset));
        let offset_idx = bindings.len();

        let sql = format!(
            "{} WHERE {where_clause} ORDER BY {} LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
            listing_select(),
            filter.sort.order_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bindings.iter()), map_listing)?;

        let mut artworks = Vec::new();
        for row in rows {
            artworks.push(row?);
        }
        Ok((artworks, total))
    }

    pub fn recent_artworks(&self, artist_id: &str, limit: usize) -> Result<Vec<ArtworkPreview>, StorageError> {
        let conn = self.lock()?;
        previews(&conn, artist_id, "created_at DESC", limit)
    }

    pub fn increment_view_count(&self, artwork_id: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE artworks SET view_count = view_count + 1 WHERE id = ?1",
            params![artwork_id],
        )?;
        Ok(())
    }

    /// Removes an artwork along with its comments and favorites, returning
    /// the deleted row so callers can clean up stored objects.
    pub fn delete_artwork(&self, artwork_id: &str) -> Result<ArtworkRecord, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let artwork = find_artwork(&tx, artwork_id)?
            .ok_or_else(|| StorageError::ArtworkNotFound(artwork_id.to_string()))?;
        tx.execute("DELETE FROM artworks WHERE id = ?1", params![artwork_id])?;
        tx.commit()?;

        debug!(artwork_id, artist_id = %artwork.artist_id, "deleted artwork");
        Ok(artwork)
    }
}
