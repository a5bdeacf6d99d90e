//! Pacific calendar-day arithmetic for quota keys and reset instants.
//!
//! Dates are resolved through the IANA database entry for
//! `America/Los_Angeles`, so the UTC instant of a Pacific midnight is 08:00Z
//! while standard time applies and 07:00Z under daylight saving time.
use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

pub const PACIFIC: Tz = chrono_tz::America::Los_Angeles;

/// UTC offset of Pacific Standard Time, in seconds.
pub const STANDARD_OFFSET_SECS: i32 = -8 * 3600;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Calendar date in the Pacific zone at `instant`.
pub fn pacific_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&PACIFIC).date_naive()
}

/// Storage key for a Pacific date, `YYYY-MM-DD`.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// UTC instant at which `date` begins in the Pacific zone.
pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match PACIFIC.from_local_datetime(&midnight) {
        LocalResult::Single(start) => start.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Pacific transitions happen at 02:00 so this arm is unreachable for
        // real dates; fall back to the standard offset.
        LocalResult::None => {
            Utc.from_utc_datetime(&midnight) - chrono::Duration::seconds(STANDARD_OFFSET_SECS as i64)
        }
    }
}

/// The next Pacific midnight strictly after `instant`, as a UTC instant.
pub fn next_reset(instant: DateTime<Utc>) -> DateTime<Utc> {
    let today = pacific_date(instant);
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    midnight_utc(tomorrow)
}

/// Whether daylight saving time is in effect at the start of `date`.
pub fn is_daylight_time(date: NaiveDate) -> bool {
    let start = midnight_utc(date).with_timezone(&PACIFIC);
    start.offset().fix().local_minus_utc() > STANDARD_OFFSET_SECS
}
