//! Wire-level visit event exchanged over the message channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One visit event, JSON-encoded on the `visits` queue.
///
/// Produced by [`crate::application::services::VisitService`] on every
/// redirect, consumed by [`crate::workers::VisitWorker`]. The message lives
/// from enqueue to acknowledgement and is never persisted as-is; the batch
/// worker converts it into a [`crate::domain::entities::NewVisit`].
///
/// Wire shape: `{"short_code": "...", "ip": "..."|null, "timestamp": "RFC-3339"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitMessage {
    pub short_code: String,
    #[serde(default)]
    pub ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_missing_ip_as_null() {
        let msg = VisitMessage {
            short_code: "abc123".to_string(),
            ip: None,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""ip":null"#));
        assert!(json.contains(r#""short_code":"abc123""#));
    }

    #[test]
    fn test_deserializes_without_ip_field() {
        let msg: VisitMessage = serde_json::from_str(
            r#"{"short_code": "abc123", "timestamp": "2025-03-01T12:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(msg.short_code, "abc123");
        assert!(msg.ip.is_none());
    }

    #[test]
    fn test_rejects_message_without_short_code() {
        let result = serde_json::from_str::<VisitMessage>(
            r#"{"ip": "10.0.0.1", "timestamp": "2025-03-01T12:00:00Z"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_malformed_timestamp() {
        let result = serde_json::from_str::<VisitMessage>(
            r#"{"short_code": "abc123", "ip": null, "timestamp": "yesterday"}"#,
        );
        assert!(result.is_err());
    }
}
