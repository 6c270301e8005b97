use chrono::Utc;

pub type DateTime = chrono::DateTime<Utc>;

pub fn now() -> DateTime {
    Utc::now()
}

/// Microseconds elapsed between two instants, negative when `to` is earlier.
pub fn micros_between(from: &DateTime, to: &DateTime) -> i64 {
    to.signed_duration_since(*from)
        .num_microseconds()
        .unwrap_or(i64::MAX)
}
