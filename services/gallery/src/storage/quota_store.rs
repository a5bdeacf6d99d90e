use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::error::StorageError;
use super::schema::init_quota_schema;
use super::{format_timestamp, open_connection};

/// Result of an attempted check-and-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded { used_bytes: u64 },
    Rejected { used_bytes: u64 },
}

/// Daily byte counters keyed by `(artist_id, date)`.
///
/// Every handle owns its own connection. Writers serialize on SQLite's
/// database write lock, so several handles (or processes) pointed at the same
/// file never jointly overshoot a limit.
pub struct QuotaStore {
    conn: Mutex<Connection>,
}

impl QuotaStore {
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_connection(db_path, busy_timeout)?;
        init_quota_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::ConnectionPoisoned)
    }

    pub fn load_usage(&self, artist_id: &str, date: &str) -> Result<u64, StorageError> {
        let conn = self.lock()?;
        let used = conn
            .query_row(
                r#"
                SELECT used_bytes
                FROM daily_quotas
                WHERE artist_id = ?1 AND date = ?2
                "#,
                params![artist_id, date],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(used.unwrap_or(0) as u64)
    }

    /// Adds `size_bytes` to the `(artist_id, date)` counter unless the result
    /// would exceed `limit_bytes`.
    ///
    /// The read and the write share one `BEGIN IMMEDIATE` transaction. A
    /// rejected attempt rolls back without touching the row.
    pub fn try_record(
        &self,
        artist_id: &str,
        date: &str,
        size_bytes: u64,
        limit_bytes: u64,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                r#"
                SELECT id, used_bytes
                FROM daily_quotas
                WHERE artist_id = ?1 AND date = ?2
                "#,
                params![artist_id, date],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as u64)),
            )
            .optional()?;

        let current = existing.map(|(_, used)| used).unwrap_or(0);
        let new_total = match current.checked_add(size_bytes) {
            Some(total) if total <= limit_bytes => total,
            _ => {
                debug!(artist_id, date, current, size_bytes, "quota check rejected upload");
                return Ok(RecordOutcome::Rejected { used_bytes: current });
            }
        };

        let updated_at = format_timestamp(now);
        match existing {
            Some((id, _)) => {
                tx.execute(
                    r#"
                    UPDATE daily_quotas
                    SET used_bytes = ?2,
                        updated_at = ?3
                    WHERE id = ?1
                    "#,
                    params![id, new_total as i64, updated_at],
                )?;
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO daily_quotas (artist_id, date, used_bytes, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    params![artist_id, date, new_total as i64, updated_at],
                )?;
            }
        }

        tx.commit()?;
        Ok(RecordOutcome::Recorded {
            used_bytes: new_total,
        })
    }

    /// Stored `(date, used_bytes)` rows for an artist, newest first.
    pub fn usage_history(
        &self,
        artist_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, u64)>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT date, used_bytes
            FROM daily_quotas
            WHERE artist_id = ?1
            ORDER BY date DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![artist_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap()
    }

    #[test]
    fn first_record_inserts_row_for_the_day() {
        let dir = tempdir().expect("tempdir");
        let store = QuotaStore::open(&dir.path().join("q.db"), Duration::from_secs(1)).unwrap();

        let outcome = store.try_record("artist-1", "2026-10-19", 300, 1_000, now()).unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded { used_bytes: 300 });
        assert_eq!(store.load_usage("artist-1", "2026-10-19").unwrap(), 300);
        assert_eq!(store.load_usage("artist-1", "2026-10-20").unwrap(), 0);
    }

    #[test]
    fn rejected_record_leaves_counter_untouched() {
        let dir = tempdir().expect("tempdir");
        let store = QuotaStore::open(&dir.path().join("q.db"), Duration::from_secs(1)).unwrap();

        store.try_record("artist-1", "2026-10-19", 900, 1_000, now()).unwrap();
        let outcome = store.try_record("artist-1", "2026-10-19", 101, 1_000, now()).unwrap();
        assert_eq!(outcome, RecordOutcome::Rejected { used_bytes: 900 });
        assert_eq!(store.load_usage("artist-1", "2026-10-19").unwrap(), 900);

        let outcome = store.try_record("artist-1", "2026-10-19", 100, 1_000, now()).unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded { used_bytes: 1_000 });
    }

    #[test]
    fn rejection_on_fresh_day_creates_no_row() {
        let dir = tempdir().expect("tempdir");
        let store = QuotaStore::open(&dir.path().join("q.db"), Duration::from_secs(1)).unwrap();

        let outcome = store.try_record("artist-1", "2026-10-19", 5_000, 1_000, now()).unwrap();
        assert_eq!(outcome, RecordOutcome::Rejected { used_bytes: 0 });
        assert!(store.usage_history("artist-1", 10).unwrap().is_empty());
    }

    #[test]
    fn overflowing_size_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let store = QuotaStore::open(&dir.path().join("q.db"), Duration::from_secs(1)).unwrap();

        store.try_record("artist-1", "2026-10-19", 10, u64::MAX, now()).unwrap();
        let outcome = store
            .try_record("artist-1", "2026-10-19", u64::MAX, u64::MAX, now())
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Rejected { used_bytes: 10 });
    }

    #[test]
    fn history_is_newest_first_and_scoped_to_artist() {
        let dir = tempdir().expect("tempdir");
        let store = QuotaStore::open(&dir.path().join("q.db"), Duration::from_secs(1)).unwrap();

        store.try_record("artist-1", "2026-10-18", 10, 1_000, now()).unwrap();
        store.try_record("artist-1", "2026-10-19", 20, 1_000, now()).unwrap();
        store.try_record("artist-2", "2026-10-19", 30, 1_000, now()).unwrap();

        let history = store.usage_history("artist-1", 10).unwrap();
        assert_eq!(
            history,
            vec![("2026-10-19".to_string(), 20), ("2026-10-18".to_string(), 10)]
        );
    }
}
