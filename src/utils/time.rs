use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    now().timestamp()
}
