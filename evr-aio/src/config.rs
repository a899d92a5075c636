use std::{fs::File, io::BufReader, path::Path};

use evr_core::ComponentApi;
use evr_devrev_dispatcher::DevrevDispatcher;
use evr_jsonl_collector::JsonLinesCollector;
use evr_subscription_filter::SubscriptionFilter;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("can't read config file, {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config, {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("can't recognize config file format of {0}, expected .yaml or .yml")]
    UnknownFormat(String),
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) collectors: Vec<Collector>,
    #[serde(default)]
    pub(crate) transformers: Vec<Transformer>,
    #[serde(default)]
    pub(crate) dispatchers: Vec<Dispatcher>,
}

impl Config {
    pub(crate) fn from_path(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => {
                let reader = BufReader::new(File::open(path)?);
                Ok(serde_yaml::from_reader(reader)?)
            }
            _ => Err(Error::UnknownFormat(path.display().to_string())),
        }
    }

    /// Reorders transformers so each one comes after every transformer that
    /// sends events to it, which is the order they can be closed in.
    pub(crate) fn sort_transformers(&mut self) {
        let mut pending = std::mem::take(&mut self.transformers);
        while !pending.is_empty() {
            let ready = pending.iter().position(|t| {
                !pending
                    .iter()
                    .any(|upstream| upstream.destination() == t.id())
            });
            let index = ready.unwrap_or_else(|| {
                warn!("transformers form a cycle, closing the rest in configured order");
                0
            });
            self.transformers.push(pending.remove(index));
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub(crate) enum Collector {
    JsonLines(JsonLinesCollector),
}

impl Collector {
    pub(crate) fn into_component(self) -> Box<dyn ComponentApi> {
        match self {
            Collector::JsonLines(c) => Box::new(c),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub(crate) enum Transformer {
    SubscriptionFilter(SubscriptionFilter),
}

impl Transformer {
    pub(crate) fn id(&self) -> &str {
        match self {
            Transformer::SubscriptionFilter(t) => &t.id,
        }
    }

    pub(crate) fn destination(&self) -> &str {
        match self {
            Transformer::SubscriptionFilter(t) => &t.destination,
        }
    }

    pub(crate) fn into_component(self) -> Box<dyn ComponentApi> {
        match self {
            Transformer::SubscriptionFilter(t) => Box::new(t),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub(crate) enum Dispatcher {
    DevrevStreamEvent(DevrevDispatcher),
}

impl Dispatcher {
    pub(crate) fn into_component(self) -> Box<dyn ComponentApi> {
        match self {
            Dispatcher::DevrevStreamEvent(d) => Box::new(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const PIPELINE: &str = r#"
collectors:
  - type: JsonLines
    id: input
    destination: track_only
    path: events.jsonl
transformers:
  - type: SubscriptionFilter
    id: track_only
    destination: devrev
dispatchers:
  - type: DevrevStreamEvent
    id: devrev
    api_key: secret-key
    timeout_secs: 5
    endpoints:
      api_root: http://localhost:8080/
    mapping:
      userId:
        "@if":
          exists: { "@path": "$.userId" }
          then: { "@path": "$.userId" }
          else: { "@path": "$.properties.userId" }
"#;

    #[test]
    fn parse_pipeline() {
        let config: Config = serde_yaml::from_str(PIPELINE).unwrap();

        let Collector::JsonLines(collector) = &config.collectors[0];
        assert_eq!(collector.path, Some(PathBuf::from("events.jsonl")));

        let Transformer::SubscriptionFilter(filter) = &config.transformers[0];
        assert_eq!(filter.conditions, evr_subscription_filter::default_conditions());

        let Dispatcher::DevrevStreamEvent(dispatcher) = &config.dispatchers[0];
        assert_eq!(dispatcher.settings.timeout_secs, 5);
        assert_eq!(
            dispatcher.endpoints.track_events_publish().as_str(),
            "http://localhost:8080/track-events.publish"
        );
        assert!(dispatcher.mapping.check().is_ok());
    }

    #[test]
    fn upstream_transformers_come_first() {
        let mut config: Config = serde_yaml::from_str(
            r#"
transformers:
  - { type: SubscriptionFilter, id: c, destination: devrev }
  - { type: SubscriptionFilter, id: b, destination: c }
  - { type: SubscriptionFilter, id: a, destination: b }
  - { type: SubscriptionFilter, id: solo, destination: devrev }
"#,
        )
        .unwrap();
        config.sort_transformers();

        let ids: Vec<_> = config.transformers.iter().map(Transformer::id).collect();
        assert_eq!(ids, ["a", "b", "c", "solo"]);
    }

    #[test]
    fn transformer_cycle_keeps_every_transformer() {
        let mut config: Config = serde_yaml::from_str(
            r#"
transformers:
  - { type: SubscriptionFilter, id: a, destination: b }
  - { type: SubscriptionFilter, id: b, destination: a }
"#,
        )
        .unwrap();
        config.sort_transformers();

        let ids: Vec<_> = config.transformers.iter().map(Transformer::id).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn rejects_unknown_component_type() {
        let result = serde_yaml::from_str::<Config>(
            "dispatchers:\n  - type: Kafka\n    id: kafka\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_file_format() {
        assert!(matches!(
            Config::from_path(Path::new("pipeline.properties")),
            Err(Error::UnknownFormat(_))
        ));
    }
}
