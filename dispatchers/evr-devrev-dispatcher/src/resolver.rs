use chrono::{DateTime, Utc};
use evr_core::{Map, Value};
use tracing::debug;

use crate::fields::{ResolvedEventFields, Timestamp};

/// Resolved fields with a timestamp that is never absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub event_name: String,
    pub occurred_at: String,
    pub email: Option<String>,
    pub user_id: String,
    pub properties: Option<Map<String, Value>>,
}

/// Fills in `occurredAt` with the current time when it is unset or empty.
pub fn backfill(fields: ResolvedEventFields) -> StreamEvent {
    backfill_at(fields, Utc::now())
}

/// Like [`backfill`], with `now` as the current time.
pub fn backfill_at(fields: ResolvedEventFields, now: DateTime<Utc>) -> StreamEvent {
    let occurred_at = match fields.occurred_at {
        Some(Timestamp::Text(text)) if !text.is_empty() => text,
        Some(timestamp @ Timestamp::Instant(_)) => timestamp.to_string(),
        _ => {
            debug!(
                "event {} has no timestamp, using the current time",
                fields.event_name
            );
            Timestamp::Instant(now).to_string()
        }
    };

    StreamEvent {
        event_name: fields.event_name,
        occurred_at,
        email: fields.email,
        user_id: fields.user_id,
        properties: fields.properties,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, DurationRound};

    use super::*;

    fn fields(occurred_at: Option<Timestamp>) -> ResolvedEventFields {
        ResolvedEventFields {
            event_name: "Signed Up".to_string(),
            occurred_at,
            email: None,
            user_id: "u1".to_string(),
            properties: None,
        }
    }

    #[test]
    fn keeps_existing_timestamp() {
        let text = "2023-01-01T00:00:00.000Z".to_string();
        let event = backfill(fields(Some(Timestamp::Text(text.clone()))));
        assert_eq!(event.occurred_at, text);

        // passed through verbatim, even when not in the canonical form
        let offset = Timestamp::Text("2023-01-01T01:00:00+01:00".to_string());
        let event = backfill(fields(Some(offset)));
        assert_eq!(event.occurred_at, "2023-01-01T01:00:00+01:00");
    }

    #[test]
    fn renders_instants_with_millis() {
        let instant = DateTime::parse_from_rfc3339("2023-06-01T12:30:45.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = backfill(fields(Some(Timestamp::Instant(instant))));
        assert_eq!(event.occurred_at, "2023-06-01T12:30:45.123Z");
    }

    #[test]
    fn backfills_missing_or_empty_timestamp() {
        let start = Utc::now()
            .duration_trunc(Duration::milliseconds(1))
            .unwrap();

        for occurred_at in [None, Some(Timestamp::Text(String::new()))] {
            let event = backfill(fields(occurred_at));
            assert!(event.occurred_at.ends_with('Z'));
            let parsed = DateTime::parse_from_rfc3339(&event.occurred_at).unwrap();
            assert!(parsed >= start);
        }
    }

    #[test]
    fn backfill_with_fixed_clock() {
        let now = DateTime::parse_from_rfc3339("2024-02-29T23:59:59Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = backfill_at(fields(None), now);
        assert_eq!(event.occurred_at, "2024-02-29T23:59:59.000Z");
        assert_eq!(event.event_name, "Signed Up");
        assert_eq!(event.user_id, "u1");
    }
}
