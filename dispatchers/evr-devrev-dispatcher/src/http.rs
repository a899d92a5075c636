use std::{fmt, time::Duration};

use async_trait::async_trait;
use evr_core::transport::{Method, RequestOptions, Transport};
use reqwest::{header::AUTHORIZATION, Client, Request, Response};
use serde::Deserialize;
use tracing::debug;

/// Destination settings, passed through to every request.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub fn default_timeout_secs() -> u64 {
    10
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// [`Transport`] over HTTPS. Non-2xx responses are turned into errors.
pub struct HttpTransport {
    client: Client,
    settings: Settings,
}

impl HttpTransport {
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn build_request(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<Request, reqwest::Error> {
        let method = match options.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, &self.settings.api_key);
        if let Some(json) = &options.json {
            builder = builder.json(json);
        }
        builder.build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    type Response = Response;
    type Error = reqwest::Error;

    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Response, reqwest::Error> {
        let request = self.build_request(url, &options)?;
        debug!("{} {url}", options.method);
        self.client.execute(request).await?.error_for_status()
    }
}
