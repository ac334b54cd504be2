//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp the way it is stored (RFC 3339, UTC)
pub fn to_storage(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}

/// Parse a stored RFC 3339 timestamp
pub fn from_storage(value: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01
    }

    #[test]
    fn test_storage_round_trip_preserves_instant() {
        let original = now();
        let parsed = from_storage(&to_storage(&original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_from_storage_rejects_garbage() {
        let result = from_storage("yesterday-ish");
        assert!(matches!(result, Err(crate::Error::Internal(_))));
    }
}
