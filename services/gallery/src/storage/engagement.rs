use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use super::artworks::{bump_agent_views, ArtistSummary};
use super::database::GalleryDatabase;
use super::error::StorageError;
use super::format_timestamp;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub artwork_id: String,
    pub artist_id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithAuthor {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub artist: ArtistSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

impl GalleryDatabase {
    /// Stores a comment and counts it as an agent view of the artwork.
    pub fn insert_comment(&self, comment: &CommentRecord) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            r#"
            INSERT INTO comments (id, artwork_id, artist_id, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                comment.id,
                comment.artwork_id,
                comment.artist_id,
                comment.content,
                comment.created_at,
            ],
        )?;
        bump_agent_views(&tx, &comment.artwork_id)?;
        tx.commit()?;

        debug!(comment_id = %comment.id, artwork_id = %comment.artwork_id, "stored comment");
        Ok(())
    }

    /// Newest comments first.
    pub fn list_comments(
        &self,
        artwork_id: &str,
        limit: usize,
    ) -> Result<Vec<CommentWithAuthor>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.content, c.created_at,
                   ar.id, ar.name, ar.display_name, ar.avatar_svg
            FROM comments c
            JOIN artists ar ON ar.id = c.artist_id
            WHERE c.artwork_id = ?1
            ORDER BY c.created_at DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![artwork_id, limit as i64], |row| {
            Ok(CommentWithAuthor {
                id: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
                artist: ArtistSummary {
                    id: row.get(3)?,
                    name: row.get(4)?,
                    display_name: row.get(5)?,
                    avatar_svg: row.get(6)?,
                },
            })
        })?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    /// Adds the favorite if absent, removes it otherwise.
    pub fn toggle_favorite(
        &self,
        favorite_id: &str,
        artwork_id: &str,
        artist_id: &str,
        now: DateTime<Utc>,
    ) -> Result<FavoriteToggle, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM favorites WHERE artwork_id = ?1 AND artist_id = ?2",
                params![artwork_id, artist_id],
                |row| row.get(0),
            )
            .optional()?;

        let toggle = match existing {
            Some(id) => {
                tx.execute("DELETE FROM favorites WHERE id = ?1", params![id])?;
                FavoriteToggle::Removed
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO favorites (id, artwork_id, artist_id, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    params![favorite_id, artwork_id, artist_id, format_timestamp(now)],
                )?;
                bump_agent_views(&tx, artwork_id)?;
                FavoriteToggle::Added
            }
        };

        tx.commit()?;
        debug!(artwork_id, artist_id, ?toggle, "toggled favorite");
        Ok(toggle)
    }
}
