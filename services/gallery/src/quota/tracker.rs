use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::storage::{QuotaStore, RecordOutcome, StorageError};

use super::clock::Clock;
use super::error::{QuotaError, QuotaExceeded};
use super::info::{exceeded_hint, format_bytes, QuotaInfo};
use super::pacific;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: String,
    pub used_bytes: u64,
}

/// Per-artist byte allowance for the current Pacific day.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<QuotaStore>,
    clock: Arc<dyn Clock>,
    daily_limit_bytes: u64,
}

impl QuotaTracker {
    pub fn new(store: Arc<QuotaStore>, clock: Arc<dyn Clock>, daily_limit_bytes: u64) -> Self {
        Self {
            store,
            clock,
            daily_limit_bytes,
        }
    }

    pub fn get_quota_info(&self, artist_id: &str) -> Result<QuotaInfo, QuotaError> {
        let now = self.clock.now();
        let key = today_key(now);
        let used = self.store.load_usage(artist_id, &key)?;
        Ok(QuotaInfo::new(self.daily_limit_bytes, used, pacific::next_reset(now)))
    }

    /// Charges `size_bytes` against today's allowance, or rejects the upload
    /// without changing the stored counter.
    pub fn check_and_record_upload(
        &self,
        artist_id: &str,
        size_bytes: u64,
    ) -> Result<QuotaInfo, QuotaError> {
        let now = self.clock.now();
        let key = today_key(now);
        let reset_time = pacific::next_reset(now);

        match self
            .store
            .try_record(artist_id, &key, size_bytes, self.daily_limit_bytes, now)?
        {
            RecordOutcome::Recorded { used_bytes } => {
                let info = QuotaInfo::new(self.daily_limit_bytes, used_bytes, reset_time);
                debug!(
                    artist_id,
                    date = %key,
                    size_bytes,
                    used_bytes,
                    reset_in_daylight_time = pacific::is_daylight_time(pacific::pacific_date(reset_time)),
                    "recorded upload"
                );
                if info.is_exhausted() {
                    info!(artist_id, date = %key, "daily upload quota used up");
                }
                Ok(info)
            }
            RecordOutcome::Rejected { used_bytes } => {
                let info = QuotaInfo::new(self.daily_limit_bytes, used_bytes, reset_time);
                info!(
                    artist_id,
                    date = %key,
                    used_bytes,
                    attempted = %format_bytes(size_bytes),
                    limit = %format_bytes(self.daily_limit_bytes),
                    "daily upload quota exceeded"
                );
                Err(QuotaError::Exceeded(Box::new(QuotaExceeded {
                    artist_id: artist_id.to_string(),
                    used_bytes,
                    limit_bytes: self.daily_limit_bytes,
                    attempted_bytes: size_bytes,
                    reset_time,
                    hint: exceeded_hint(&info, size_bytes, now),
                    info,
                })))
            }
        }
    }

    pub fn usage_history(&self, artist_id: &str, days: usize) -> Result<Vec<DailyUsage>, StorageError> {
        let rows = self.store.usage_history(artist_id, days)?;
        Ok(rows
            .into_iter()
            .map(|(date, used_bytes)| DailyUsage { date, used_bytes })
            .collect())
    }
}

fn today_key(now: DateTime<Utc>) -> String {
    pacific::date_key(pacific::pacific_date(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::clock::FixedClock;
    use crate::storage::DEFAULT_BUSY_TIMEOUT;
    use chrono::{Duration, TimeZone};
    use tempfile::{tempdir, TempDir};

    const MB: u64 = 1024 * 1024;

    fn tracker_at(instant: DateTime<Utc>, limit: u64) -> (TempDir, Arc<FixedClock>, QuotaTracker) {
        let dir = tempdir().expect("tempdir");
        let store = QuotaStore::open(&dir.path().join("quota.db"), DEFAULT_BUSY_TIMEOUT).unwrap();
        let clock = Arc::new(FixedClock::new(instant));
        let tracker = QuotaTracker::new(Arc::new(store), clock.clone(), limit);
        (dir, clock, tracker)
    }

    #[test]
    fn over_limit_upload_is_rejected_and_smaller_one_fits() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let (_dir, _clock, tracker) = tracker_at(now, 45 * MB);

        tracker.check_and_record_upload("artist-1", 40 * MB).unwrap();

        let err = tracker.check_and_record_upload("artist-1", 10 * MB).unwrap_err();
        match err {
            QuotaError::Exceeded(exceeded) => {
                assert_eq!(exceeded.used_bytes, 40 * MB);
                assert_eq!(exceeded.limit_bytes, 45 * MB);
                assert_eq!(exceeded.attempted_bytes, 10 * MB);
                assert_eq!(exceeded.info.remaining_bytes, 5 * MB);
                assert!(exceeded.hint.contains("Your upload: 10.0MB"));
                assert_eq!(
                    exceeded.to_string(),
                    "daily upload quota exceeded for artist artist-1: used=41943040, limit=47185920, attempted=10485760"
                );
            }
            other => panic!("expected quota exceeded, got {other:?}"),
        }
        assert_eq!(tracker.get_quota_info("artist-1").unwrap().used_bytes, 40 * MB);

        let info = tracker.check_and_record_upload("artist-1", 4 * MB).unwrap();
        assert_eq!(info.used_bytes, 44 * MB);
        assert_eq!(info.remaining_bytes, MB);
    }

    #[test]
    fn quota_info_is_side_effect_free() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let (_dir, _clock, tracker) = tracker_at(now, 45 * MB);
        tracker.check_and_record_upload("artist-1", 3 * MB).unwrap();

        let first = tracker.get_quota_info("artist-1").unwrap();
        let second = tracker.get_quota_info("artist-1").unwrap();
        assert_eq!(first, second);
        assert_eq!(tracker.usage_history("artist-1", 7).unwrap().len(), 1);
        assert!(tracker.usage_history("artist-2", 7).unwrap().is_empty());
    }

    #[test]
    fn counter_resets_at_pacific_midnight() {
        // 23:30 PDT on Oct 19
        let late = Utc.with_ymd_and_hms(2026, 10, 20, 6, 30, 0).unwrap();
        let (_dir, clock, tracker) = tracker_at(late, 45 * MB);

        let recorded = tracker.check_and_record_upload("artist-1", 45 * MB).unwrap();
        assert!(recorded.is_exhausted());
        let info = tracker.get_quota_info("artist-1").unwrap();
        assert!(info.is_exhausted());
        assert_eq!(info.reset_time, Utc.with_ymd_and_hms(2026, 10, 20, 7, 0, 0).unwrap());

        clock.advance(Duration::minutes(30));
        let info = tracker.get_quota_info("artist-1").unwrap();
        assert_eq!(info.used_bytes, 0);
        assert_eq!(info.reset_time, Utc.with_ymd_and_hms(2026, 10, 21, 7, 0, 0).unwrap());

        let history = tracker.usage_history("artist-1", 7).unwrap();
        assert_eq!(
            history,
            vec![DailyUsage {
                date: "2026-10-19".into(),
                used_bytes: 45 * MB
            }]
        );
    }

    #[test]
    fn utc_date_does_not_decide_the_day() {
        // 01:00Z on Oct 20 is still Oct 19 in Los Angeles
        let now = Utc.with_ymd_and_hms(2026, 10, 20, 1, 0, 0).unwrap();
        let (_dir, _clock, tracker) = tracker_at(now, 45 * MB);
        tracker.check_and_record_upload("artist-1", MB).unwrap();

        let history = tracker.usage_history("artist-1", 1).unwrap();
        assert_eq!(history[0].date, "2026-10-19");
    }
}
