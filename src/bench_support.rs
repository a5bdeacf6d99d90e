use std::sync::Arc;

use chrono::{TimeZone, Utc};
use devaintart_gallery::quota::{FixedClock, QuotaTracker};
use devaintart_gallery::storage::{QuotaStore, DEFAULT_BUSY_TIMEOUT};
use tempfile::TempDir;

/// Tracker over a scratch database with a pinned clock.
pub struct QuotaBenchFixture {
    pub tracker: QuotaTracker,
    pub clock: Arc<FixedClock>,
    pub temp_dir: TempDir,
}

impl QuotaBenchFixture {
    pub fn new(daily_limit_bytes: u64) -> Self {
        let temp_dir = TempDir::new().expect("tempdir");
        let store = QuotaStore::open(&temp_dir.path().join("bench.db"), DEFAULT_BUSY_TIMEOUT)
            .expect("open quota store for fixture");
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap(),
        ));
        let tracker = QuotaTracker::new(Arc::new(store), clock.clone(), daily_limit_bytes);
        Self {
            tracker,
            clock,
            temp_dir,
        }
    }

    /// Fixture whose artist already used `used_bytes` today.
    pub fn with_usage(daily_limit_bytes: u64, artist_id: &str, used_bytes: u64) -> Self {
        let fixture = Self::new(daily_limit_bytes);
        if used_bytes > 0 {
            fixture
                .tracker
                .check_and_record_upload(artist_id, used_bytes)
                .expect("seed usage");
        }
        fixture
    }
}
