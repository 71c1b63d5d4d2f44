/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Milliseconds in one hour
pub const HOUR_MILLIS: i64 = 60 * 60 * 1000;

/// Convert a millisecond span to fractional hours
pub fn millis_to_hours(millis: i64) -> f64 {
    millis as f64 / HOUR_MILLIS as f64
}
