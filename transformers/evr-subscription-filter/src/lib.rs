use std::sync::Arc;

use async_trait::async_trait;
use evr_core::{
    event_router::{EventRouter, EventRouterApi},
    mapping::{self, json_pointer},
    ComponentApi, ComponentKind, Event, Value,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Forwards the events an action is subscribed to and drops the rest.
#[derive(Deserialize, Debug)]
pub struct SubscriptionFilter {
    pub id: String,
    pub destination: String,
    #[serde(default = "default_conditions")]
    pub conditions: Vec<Condition>,
}

/// `path = equals`, e.g. `$.type = "track"`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: String,
    pub equals: Value,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("event router error, {0}")]
    EventRouter(#[from] evr_core::event_router::Error),
    #[error("invalid subscription, {0}")]
    Subscription(#[from] mapping::Error),
}

/// The stream-event action's default subscription, `type = "track"`.
pub fn default_conditions() -> Vec<Condition> {
    vec![Condition {
        path: "$.type".to_string(),
        equals: Value::from("track"),
    }]
}

struct CompiledCondition {
    pointer: String,
    equals: Value,
}

impl SubscriptionFilter {
    pub fn new(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            conditions: default_conditions(),
        }
    }

    fn compile(&self) -> Result<Vec<CompiledCondition>, Error> {
        self.conditions
            .iter()
            .map(|condition| -> Result<CompiledCondition, Error> {
                Ok(CompiledCondition {
                    pointer: json_pointer(&condition.path)?,
                    equals: condition.equals.clone(),
                })
            })
            .collect()
    }

    pub async fn start_filtering(&self, router: &EventRouter) -> Result<(), Error> {
        let conditions = self.compile()?;

        while let Ok(event) = router.poll_event(self.id()).await {
            if !matches_all(&conditions, &event) {
                debug!("{} drops event of type {:?}", self.id, event.kind());
                continue;
            }
            router.send_event(event, &self.destination).await?;
        }

        info!("{} is done", self.id);
        Ok(())
    }
}

fn matches_all(conditions: &[CompiledCondition], event: &Event) -> bool {
    conditions
        .iter()
        .all(|c| event.value.pointer(&c.pointer) == Some(&c.equals))
}

#[async_trait]
impl ComponentApi for SubscriptionFilter {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Transformer
    }

    async fn run(
        &self,
        router: Arc<EventRouter>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.start_filtering(&router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use evr_core::value;
    use utils::test_utils::DummyComponent;

    use super::*;

    async fn filter_events(filter: &SubscriptionFilter, events: Vec<Value>) -> Vec<Event> {
        let dummy_dispatcher = DummyComponent::new("dispatcher", ComponentKind::Dispatcher);

        let mut router = EventRouter::new();
        router.register_component(filter);
        router.register_component(&dummy_dispatcher);

        for event in events {
            router.send_event(Event::new(event), filter.id()).await.unwrap();
        }
        router.close(filter.id()).await.unwrap();
        filter.start_filtering(&router).await.unwrap();
        router.close("dispatcher").await.unwrap();

        let mut forwarded = vec![];
        while let Ok(event) = router.poll_event("dispatcher").await {
            forwarded.push(event);
        }
        forwarded
    }

    #[tokio::test]
    async fn forwards_track_events_only() {
        let filter = SubscriptionFilter::new("filter", "dispatcher");
        let forwarded = filter_events(
            &filter,
            vec![
                value!({ "type": "track", "event": "Signed Up" }),
                value!({ "type": "identify", "userId": "u1" }),
                value!({ "event": "no type" }),
                value!({ "type": "track", "event": "Logged In" }),
            ],
        )
        .await;

        let names: Vec<_> = forwarded
            .iter()
            .map(|e| e.value["event"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Signed Up", "Logged In"]);
    }

    #[tokio::test]
    async fn all_conditions_must_match() {
        let mut filter = SubscriptionFilter::new("filter", "dispatcher");
        filter.conditions.push(Condition {
            path: "$.event".to_string(),
            equals: value!("Signed Up"),
        });

        let forwarded = filter_events(
            &filter,
            vec![
                value!({ "type": "track", "event": "Signed Up" }),
                value!({ "type": "track", "event": "Logged In" }),
            ],
        )
        .await;
        assert_eq!(forwarded.len(), 1);
    }

    #[tokio::test]
    async fn invalid_path_is_rejected() {
        let mut filter = SubscriptionFilter::new("filter", "dispatcher");
        filter.conditions = vec![Condition {
            path: "type".to_string(),
            equals: value!("track"),
        }];

        let mut router = EventRouter::new();
        router.register_component(&filter);
        assert!(matches!(
            filter.start_filtering(&router).await,
            Err(Error::Subscription(_))
        ));
    }
}
