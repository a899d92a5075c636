//! Utilities for testing

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use evr_core::{
    event_router::EventRouter,
    transport::{RequestOptions, Transport},
    ComponentApi, ComponentKind,
};
use thiserror::Error;

pub struct DummyComponent {
    id: String,
    kind: ComponentKind,
}

impl DummyComponent {
    pub fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

#[async_trait]
impl ComponentApi for DummyComponent {
    fn id(&self) -> &str {
        &self.id
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// A [`Transport`] that records every request and answers with a fixed outcome.
#[derive(Debug)]
pub struct MockTransport {
    outcome: Result<MockResponse, MockError>,
    requests: Mutex<Vec<(String, RequestOptions)>>,
}

impl MockTransport {
    pub fn ok(status: u16) -> Self {
        Self::with_outcome(Ok(MockResponse { status }))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(Err(MockError(message.into())))
    }

    fn with_outcome(outcome: Result<MockResponse, MockError>) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, as `(url, options)` pairs.
    pub fn requests(&self) -> Vec<(String, RequestOptions)> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Response = MockResponse;
    type Error = MockError;

    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<MockResponse, MockError> {
        self.requests
            .lock()
            .expect("mock transport lock poisoned")
            .push((url.to_string(), options));
        self.outcome.clone()
    }
}
