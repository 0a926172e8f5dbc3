use std::time::Duration;

use chrono::{DateTime, Utc};

/// Returns how long ago `created_at` was, clamped to zero for future timestamps.
pub fn age_at(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(created_at)
        .to_std()
        .unwrap_or_default()
}

/// Returns true when `created_at` is strictly older than `now - horizon`.
pub fn is_past_retention(created_at: DateTime<Utc>, now: DateTime<Utc>, horizon: Duration) -> bool {
    age_at(created_at, now) > horizon
}
