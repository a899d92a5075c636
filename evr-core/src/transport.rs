//! The seam between an action and the network.
//!
//! Actions only describe a request (method, url, json body); a [`Transport`]
//! performs it. Authentication, timeouts and any retry policy belong to the
//! transport, and its response or error is handed back to the caller as is.

use std::fmt;

use async_trait::async_trait;

use crate::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    /// Serialized as the request body with `Content-Type: application/json`.
    pub json: Option<Value>,
}

impl RequestOptions {
    pub fn post(json: Value) -> Self {
        Self {
            method: Method::Post,
            json: Some(json),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    type Response: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Self::Response, Self::Error>;
}
