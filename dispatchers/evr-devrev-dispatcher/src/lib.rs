//! Streams tracked analytics events to DevRev through the
//! `track-events.publish` API, one request per event.

use std::sync::Arc;

use async_trait::async_trait;
use evr_core::{
    event_router::{EventRouter, EventRouterApi},
    transport::{RequestOptions, Transport},
    ComponentApi, ComponentKind,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

mod endpoints;
pub mod fields;
mod http;
pub mod payload;
pub mod resolver;

pub use endpoints::{Endpoints, DEVREV_API_ROOT, TRACK_EVENTS_PUBLISH};
pub use fields::{resolve_fields, Error as FieldError, Mapping, ResolvedEventFields, Timestamp};
pub use http::{default_timeout_secs, HttpTransport, Settings};
pub use payload::{EventRecord, TrackEventsPublishBody};
pub use resolver::StreamEvent;

/// Delivers one event: backfills the timestamp, builds the publish body and
/// POSTs it. Whatever the transport returns is handed back untouched.
pub async fn perform<T: Transport>(
    transport: &T,
    endpoints: &Endpoints,
    fields: ResolvedEventFields,
) -> Result<T::Response, T::Error> {
    let event = resolver::backfill(fields);
    let body = payload::build(&event);
    let url = endpoints.track_events_publish().as_str();

    debug!("publishing event {} at {}", event.event_name, event.occurred_at);
    transport.request(url, RequestOptions::post(body.into())).await
}

#[derive(Deserialize, Debug)]
pub struct DevrevDispatcher {
    pub id: String,
    #[serde(flatten)]
    pub settings: Settings,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub mapping: Mapping,
}

/// Outcome counts of one [`DevrevDispatcher::dispatch`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: usize,
    /// Events whose fields could not be resolved.
    pub rejected: usize,
    /// Events the transport failed to deliver.
    pub failed: usize,
}

impl DevrevDispatcher {
    pub fn new(id: impl Into<String>, settings: Settings) -> Self {
        Self {
            id: id.into(),
            settings,
            endpoints: Endpoints::default(),
            mapping: Mapping::default(),
        }
    }

    /// Delivers every event routed to this dispatcher until its stream is closed.
    pub async fn dispatch<T: Transport>(
        &self,
        transport: &T,
        router: &EventRouter,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        while let Ok(event) = router.poll_event(self.id()).await {
            debug!("{} receives new event:\n\t{event:?}", self.id);

            let fields = match resolve_fields(&event.value, &self.mapping) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!("{} drops an event, {e}", self.id);
                    summary.rejected += 1;
                    continue;
                }
            };

            let event_name = fields.event_name.clone();
            match perform(transport, &self.endpoints, fields).await {
                Ok(_) => {
                    info!("event {event_name} is dispatched to devrev");
                    summary.delivered += 1;
                }
                Err(e) => {
                    error!("failed to dispatch event {event_name} to devrev, {e}");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[async_trait]
impl ComponentApi for DevrevDispatcher {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Dispatcher
    }

    async fn run(
        &self,
        router: Arc<EventRouter>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.mapping.check()?;
        let transport = HttpTransport::new(self.settings.clone())?;

        let summary = self.dispatch(&transport, &router).await;
        info!(
            "{} is done, {} delivered, {} rejected, {} failed",
            self.id, summary.delivered, summary.rejected, summary.failed
        );
        Ok(())
    }
}
