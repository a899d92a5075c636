use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Value;

/// A raw analytics event as emitted by the upstream tracking pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub value: Value,
    // usually used by internal components, for tracing, tracking, etc.
    pub meta: EventMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMeta {
    pub received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            meta: EventMeta {
                received_at: Utc::now(),
            },
        }
    }

    /// The `type` of the event (`track`, `identify`, ...), if any.
    pub fn kind(&self) -> Option<&str> {
        self.value.get("type").and_then(Value::as_str)
    }
}
