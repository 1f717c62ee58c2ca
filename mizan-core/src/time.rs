//! Time utilities: timezone parsing and local-day arithmetic.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone name like "Asia/Riyadh".
pub fn parse_tz(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {name}"))
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("invalid RFC3339 timestamp {raw:?}: {e}"))
}

/// Local wall-clock hour (0..=23) of a UTC instant.
pub fn local_hour<Z: TimeZone>(at: DateTime<Utc>, tz: &Z) -> u32 {
    at.with_timezone(tz).hour()
}

/// Local calendar date of a UTC instant.
pub fn local_day<Z: TimeZone>(at: DateTime<Utc>, tz: &Z) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Whole days between two local dates, `later - earlier`.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Elapsed time since `earlier`, never negative.
pub fn elapsed(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - earlier).max(Duration::zero())
}
