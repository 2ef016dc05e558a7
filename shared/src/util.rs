use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time in Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render a Unix-millisecond timestamp as RFC 3339 (`2024-03-01T10:15:30+00:00`).
///
/// Out-of-range values fall back to the Unix epoch.
pub fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_to_rfc3339() {
        assert_eq!(millis_to_rfc3339(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(
            millis_to_rfc3339(1_709_288_130_000),
            "2024-03-01T10:15:30+00:00"
        );
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2024-01-01
        assert!(now_millis() > 1_704_067_200_000);
    }
}
