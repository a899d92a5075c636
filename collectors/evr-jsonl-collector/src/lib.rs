use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use evr_core::{
    event_router::{EventRouter, EventRouterApi},
    ComponentApi, ComponentKind, Event, Value,
};
use serde::Deserialize;
use tokio::{
    fs::File,
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
};
use tracing::{info, warn};

mod error;

pub use error::Error;

/// Reads raw analytics events, one JSON object per line, from a file or stdin.
#[derive(Deserialize, Debug)]
pub struct JsonLinesCollector {
    pub id: String,
    pub destination: String,
    /// Read from stdin when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl JsonLinesCollector {
    pub fn new(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            path: None,
        }
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    pub async fn start_collecting(&self, router: &EventRouter) -> Result<usize, Error> {
        match &self.path {
            Some(path) => {
                info!("{} reads events from {}", self.id, path.display());
                let file = File::open(path).await?;
                self.collect_from(BufReader::new(file), router).await
            }
            None => {
                info!("{} reads events from stdin", self.id);
                self.collect_from(BufReader::new(io::stdin()), router).await
            }
        }
    }

    /// Routes every event in `reader` and returns how many were sent. Lines
    /// that are not json objects are skipped.
    pub async fn collect_from<R>(
        &self,
        mut reader: R,
        router: &EventRouter,
    ) -> Result<usize, Error>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut buf = Vec::new();
        let mut line_number = 0;
        let mut sent = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_number += 1;

            let Ok(line) = std::str::from_utf8(&buf) else {
                warn!("line {line_number} is not valid utf-8, skipped");
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(value @ Value::Object(_)) => {
                    router
                        .send_event(Event::new(value), &self.destination)
                        .await?;
                    sent += 1;
                }
                Ok(_) => warn!("line {line_number} is not a json object, skipped"),
                Err(e) => warn!("line {line_number} is not valid json, {e}"),
            }
        }

        info!("{} collected {sent} events", self.id);
        Ok(sent)
    }
}

#[async_trait]
impl ComponentApi for JsonLinesCollector {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Collector
    }

    async fn run(
        &self,
        router: Arc<EventRouter>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.start_collecting(&router).await?;
        Ok(())
    }
}
