use std::collections::HashMap;

use async_trait::async_trait;
use flume::{RecvError, SendError};

use crate::{event::Event, ComponentApi, ComponentKind};
use thiserror::Error;
use tracing::{debug, error};

#[async_trait]
pub trait EventRouterApi {
    async fn send_event(&self, event: Event, component_id: &str) -> Result<(), Error>;
    async fn poll_event(&self, component_id: &str) -> Result<Event, Error>;
    /// Marks the end of the stream for `component_id`. Events already queued are
    /// still delivered, after which `poll_event` returns [`Error::Closed`].
    async fn close(&self, component_id: &str) -> Result<(), Error>;
    fn register_component(&mut self, component: &dyn ComponentApi);
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no such component {0}")]
    NoSuchComponent(String),
    #[error("wrong component kind")]
    WrongComponentKind,
    #[error("event stream of component {0} is closed")]
    Closed(String),
    #[error("internal error, {0}")]
    Internal(String),
}

enum Message {
    Event(Event),
    EndOfStream,
}

struct Queue {
    tx: flume::Sender<Message>,
    rx: flume::Receiver<Message>,
}

impl Queue {
    fn unbounded() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }
}

/// Routes events between the components of one pipeline. Collectors only
/// produce events, so only transformers and dispatchers own a queue.
pub struct EventRouter {
    registry: HashMap<String, Option<Queue>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    fn queue(&self, component_id: &str) -> Result<&Queue, Error> {
        let record = self.registry.get(component_id).ok_or_else(|| {
            error!("component {component_id} does not exist");
            Error::NoSuchComponent(component_id.to_string())
        })?;
        record.as_ref().ok_or_else(|| {
            error!("component {component_id} is a collector and has no event queue");
            Error::WrongComponentKind
        })
    }
}

#[async_trait]
impl EventRouterApi for EventRouter {
    async fn send_event(&self, event: Event, component_id: &str) -> Result<(), Error> {
        let queue = self.queue(component_id)?;
        queue.tx.send_async(Message::Event(event)).await?;
        Ok(())
    }

    async fn poll_event(&self, component_id: &str) -> Result<Event, Error> {
        let queue = self.queue(component_id)?;
        match queue.rx.recv_async().await? {
            Message::Event(event) => Ok(event),
            Message::EndOfStream => {
                debug!("{component_id} reached the end of its event stream");
                Err(Error::Closed(component_id.to_string()))
            }
        }
    }

    async fn close(&self, component_id: &str) -> Result<(), Error> {
        let queue = self.queue(component_id)?;
        queue.tx.send_async(Message::EndOfStream).await?;
        Ok(())
    }

    fn register_component(&mut self, component: &dyn ComponentApi) {
        if self.registry.contains_key(component.id()) {
            error!("component {} has already been registered", component.id());
            return;
        }
        let queue = match component.kind() {
            ComponentKind::Collector => None,
            ComponentKind::Transformer | ComponentKind::Dispatcher => Some(Queue::unbounded()),
        };
        self.registry.insert(component.id().to_owned(), queue);
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<SendError<T>> for Error {
    fn from(_value: SendError<T>) -> Self {
        Error::Internal("failed to send event".to_string())
    }
}

impl From<RecvError> for Error {
    fn from(_value: RecvError) -> Self {
        Error::Internal("failed to receive event".to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::value;

    struct Stub {
        id: &'static str,
        kind: ComponentKind,
    }

    #[async_trait]
    impl ComponentApi for Stub {
        fn id(&self) -> &str {
            self.id
        }

        fn kind(&self) -> ComponentKind {
            self.kind
        }

        async fn run(
            &self,
            _router: Arc<EventRouter>,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }
    }

    fn router() -> EventRouter {
        let mut router = EventRouter::new();
        router.register_component(&Stub {
            id: "collector",
            kind: ComponentKind::Collector,
        });
        router.register_component(&Stub {
            id: "dispatcher",
            kind: ComponentKind::Dispatcher,
        });
        router
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let router = router();
        for n in 0..3 {
            router
                .send_event(Event::new(value!({ "n": n })), "dispatcher")
                .await
                .unwrap();
        }
        for n in 0..3 {
            let event = router.poll_event("dispatcher").await.unwrap();
            assert_eq!(event.value["n"], n);
        }
    }

    #[tokio::test]
    async fn close_drains_pending_events_first() {
        let router = router();
        router
            .send_event(Event::new(value!({ "event": "Signed Up" })), "dispatcher")
            .await
            .unwrap();
        router.close("dispatcher").await.unwrap();

        assert!(router.poll_event("dispatcher").await.is_ok());
        assert!(matches!(
            router.poll_event("dispatcher").await,
            Err(Error::Closed(id)) if id == "dispatcher"
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_first_component() {
        let mut router = router();
        router.register_component(&Stub {
            id: "dispatcher",
            kind: ComponentKind::Collector,
        });

        router
            .send_event(Event::new(value!({ "n": 1 })), "dispatcher")
            .await
            .unwrap();
        let event = router.poll_event("dispatcher").await.unwrap();
        assert_eq!(event.value["n"], 1);
    }

    #[tokio::test]
    async fn rejects_unknown_and_collector_targets() {
        let router = router();
        let event = Event::new(value!({}));

        assert!(matches!(
            router.send_event(event.clone(), "missing").await,
            Err(Error::NoSuchComponent(_))
        ));
        assert!(matches!(
            router.send_event(event, "collector").await,
            Err(Error::WrongComponentKind)
        ));
        assert!(matches!(
            router.poll_event("collector").await,
            Err(Error::WrongComponentKind)
        ));
    }
}
