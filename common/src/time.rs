// A simple module to define the time types used in the project
//
// Block times handled by the harness are always derived from the genesis
// time and the increments requested by tests. `get_current_time_in_millis`
// is only used as a default genesis time when none is configured.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

pub const MILLIS_PER_SECOND: u64 = 1000;

#[inline]
pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Return timestamp in milliseconds
// We cast it to u64 as we have plenty of time before it overflows (year 584,942,417 AD)
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}

// Add a number of seconds to a millisecond timestamp, saturating at the end of time
#[inline]
pub fn add_seconds(time: TimestampMillis, seconds: TimestampSeconds) -> TimestampMillis {
    time.saturating_add(seconds.saturating_mul(MILLIS_PER_SECOND))
}
