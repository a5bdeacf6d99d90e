use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use devaintart_gallery::quota::{FixedClock, QuotaError, QuotaTracker};
use devaintart_gallery::storage::QuotaStore;
use tempfile::tempdir;

const MB: u64 = 1024 * 1024;
const WORKERS: usize = 8;

/// One tracker per worker, each with its own SQLite connection, the way
/// separate gallery instances share one database file.
fn trackers(path: &Path, clock: &Arc<FixedClock>, limit: u64) -> Vec<QuotaTracker> {
    (0..WORKERS)
        .map(|_| {
            let store = QuotaStore::open(path, Duration::from_secs(30)).expect("open quota store");
            QuotaTracker::new(Arc::new(store), clock.clone(), limit)
        })
        .collect()
}

fn run_workers<F>(trackers: Vec<QuotaTracker>, attempt: F) -> u64
where
    F: Fn(usize, usize) -> u64 + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(trackers.len()));
    let attempt = Arc::new(attempt);

    let handles: Vec<_> = trackers
        .into_iter()
        .enumerate()
        .map(|(worker, tracker)| {
            let barrier = Arc::clone(&barrier);
            let attempt = Arc::clone(&attempt);
            thread::spawn(move || {
                barrier.wait();
                let mut accepted = 0u64;
                for round in 0..10 {
                    let size = attempt(worker, round);
                    match tracker.check_and_record_upload("artist-1", size) {
                        Ok(info) => {
                            assert!(info.used_bytes <= info.daily_limit_bytes);
                            accepted += size;
                        }
                        Err(QuotaError::Exceeded(exceeded)) => {
                            assert!(exceeded.used_bytes + size > exceeded.limit_bytes);
                        }
                        Err(other) => panic!("unexpected quota failure: {other}"),
                    }
                }
                accepted
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("worker panicked"))
        .sum()
}

#[test]
fn concurrent_uploads_fill_the_limit_exactly_once() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("devaintart.db");
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap()));

    let workers = trackers(&path, &clock, 45 * MB);
    let observer = workers[0].clone();

    // 80 attempts of 3MB against 45MB: exactly 15 may pass.
    let accepted = run_workers(workers, |_, _| 3 * MB);
    assert_eq!(accepted, 45 * MB);

    let info = observer.get_quota_info("artist-1").unwrap();
    assert_eq!(info.used_bytes, 45 * MB);
    assert_eq!(info.remaining_bytes, 0);
}

#[test]
fn stored_usage_matches_accepted_bytes_for_mixed_sizes() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("devaintart.db");
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap()));

    let workers = trackers(&path, &clock, 45 * MB);
    let observer = workers[0].clone();

    let accepted = run_workers(workers, |worker, round| {
        ((worker * 7 + round * 3) % 5 + 1) as u64 * MB
    });

    let info = observer.get_quota_info("artist-1").unwrap();
    assert!(accepted <= 45 * MB);
    assert_eq!(info.used_bytes, accepted);
}

#[test]
fn separate_days_are_counted_independently() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("devaintart.db");
    // 23:00 PST on Jan 15
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 1, 16, 7, 0, 0).unwrap()));
    let workers = trackers(&path, &clock, 10 * MB);
    let tracker = workers[0].clone();

    tracker.check_and_record_upload("artist-1", 10 * MB).unwrap();
    assert!(matches!(
        tracker.check_and_record_upload("artist-1", 1),
        Err(QuotaError::Exceeded(_))
    ));

    clock.advance(chrono::Duration::hours(1));
    let info = tracker.check_and_record_upload("artist-1", 2 * MB).unwrap();
    assert_eq!(info.used_bytes, 2 * MB);
    assert_eq!(info.reset_time, Utc.with_ymd_and_hms(2026, 1, 17, 8, 0, 0).unwrap());
}
