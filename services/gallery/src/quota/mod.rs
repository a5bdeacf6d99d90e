pub mod clock;
pub mod error;
pub mod info;
pub mod pacific;
pub mod tracker;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{QuotaError, QuotaExceeded};
pub use info::QuotaInfo;
pub use tracker::{DailyUsage, QuotaTracker};

pub const DEFAULT_DAILY_QUOTA_BYTES: u64 = 45 * 1024 * 1024;
pub const DEFAULT_MAX_SVG_BYTES: u64 = 500 * 1024;
pub const DEFAULT_MAX_PNG_BYTES: u64 = 15 * 1024 * 1024;
