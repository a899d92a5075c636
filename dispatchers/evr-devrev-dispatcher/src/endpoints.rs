use serde::Deserialize;
use url::Url;

pub const DEVREV_API_ROOT: &str = "https://api.devrev.ai/";
pub const TRACK_EVENTS_PUBLISH: &str = "track-events.publish";

/// DevRev API locations, resolved once when the dispatcher is configured.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "EndpointsConfig")]
pub struct Endpoints {
    api_root: Url,
    track_events_publish: Url,
}

#[derive(Deserialize)]
struct EndpointsConfig {
    #[serde(default = "default_api_root")]
    api_root: String,
    #[serde(default = "default_track_events_publish")]
    track_events_publish: String,
}

pub fn default_api_root() -> String {
    DEVREV_API_ROOT.to_string()
}

pub fn default_track_events_publish() -> String {
    TRACK_EVENTS_PUBLISH.to_string()
}

impl Endpoints {
    pub fn new(api_root: &str, track_events_publish: &str) -> Result<Self, url::ParseError> {
        let mut api_root = Url::parse(api_root)?;
        if !api_root.path().ends_with('/') {
            let path = format!("{}/", api_root.path());
            api_root.set_path(&path);
        }
        let track_events_publish = api_root.join(track_events_publish)?;
        Ok(Self {
            api_root,
            track_events_publish,
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    pub fn track_events_publish(&self) -> &Url {
        &self.track_events_publish
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEVREV_API_ROOT, TRACK_EVENTS_PUBLISH)
            .expect("built-in DevRev endpoints are valid urls")
    }
}

impl TryFrom<EndpointsConfig> for Endpoints {
    type Error = url::ParseError;

    fn try_from(config: EndpointsConfig) -> Result<Self, Self::Error> {
        Self::new(&config.api_root, &config.track_events_publish)
    }
}
