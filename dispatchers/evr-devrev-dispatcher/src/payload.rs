use evr_core::{Map, Value};

use crate::{
    fields::{EMAIL, EVENT_NAME, OCCURRED_AT, PROPERTIES, USER_ID},
    resolver::StreamEvent,
};

/// Request body of the DevRev `track-events.publish` API. Its JSON shape is
/// given by the `From<TrackEventsPublishBody> for Value` impl below.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEventsPublishBody {
    pub events_list: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub name: String,
    pub event_time: String,
    pub payload: Map<String, Value>,
}

/// Builds the body for a single event. The whole field set is repeated under
/// `payload`, next to the top level `name` and `event_time`.
pub fn build(event: &StreamEvent) -> TrackEventsPublishBody {
    TrackEventsPublishBody {
        events_list: vec![EventRecord {
            name: event.event_name.clone(),
            event_time: event.occurred_at.clone(),
            payload: event.to_payload(),
        }],
    }
}

impl StreamEvent {
    /// The resolved fields keyed by their field names. Unset optional fields
    /// are left out rather than sent as `null`.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(EVENT_NAME.into(), self.event_name.clone().into());
        payload.insert(OCCURRED_AT.into(), self.occurred_at.clone().into());
        if let Some(email) = &self.email {
            payload.insert(EMAIL.into(), email.clone().into());
        }
        payload.insert(USER_ID.into(), self.user_id.clone().into());
        if let Some(properties) = &self.properties {
            payload.insert(PROPERTIES.into(), Value::Object(properties.clone()));
        }
        payload
    }
}

impl From<TrackEventsPublishBody> for Value {
    fn from(body: TrackEventsPublishBody) -> Self {
        let events_list = body
            .events_list
            .into_iter()
            .map(|record| {
                let mut object = Map::new();
                object.insert("name".into(), record.name.into());
                object.insert("event_time".into(), record.event_time.into());
                object.insert("payload".into(), Value::Object(record.payload));
                Value::Object(object)
            })
            .collect();

        let mut object = Map::new();
        object.insert("events_list".into(), Value::Array(events_list));
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use evr_core::value;

    use super::*;

    fn signed_up() -> StreamEvent {
        StreamEvent {
            event_name: "Signed Up".to_string(),
            occurred_at: "2023-01-01T00:00:00.000Z".to_string(),
            email: Some("a@b.com".to_string()),
            user_id: "u1".to_string(),
            properties: value!({ "plan": "pro" }).as_object().cloned(),
        }
    }

    #[test]
    fn wraps_one_record_with_full_payload() {
        let body = Value::from(build(&signed_up()));

        assert_eq!(
            body,
            value!({
                "events_list": [{
                    "name": "Signed Up",
                    "event_time": "2023-01-01T00:00:00.000Z",
                    "payload": {
                        "eventName": "Signed Up",
                        "occurredAt": "2023-01-01T00:00:00.000Z",
                        "email": "a@b.com",
                        "userId": "u1",
                        "properties": { "plan": "pro" }
                    }
                }]
            })
        );
    }

    #[test]
    fn leaves_out_unset_fields() {
        let event = StreamEvent {
            email: None,
            properties: None,
            ..signed_up()
        };
        let body = build(&event);

        assert_eq!(body.events_list.len(), 1);
        let payload = &body.events_list[0].payload;
        assert!(!payload.contains_key(EMAIL));
        assert!(!payload.contains_key(PROPERTIES));
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn building_is_idempotent() {
        let event = signed_up();
        let first = build(&event);
        let second = build(&event);

        assert_eq!(first, second);
        let (first, second) = (Value::from(first), Value::from(second));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first, second);
    }
}
