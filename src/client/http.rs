//! HTTP Client
//!
//! Thin reqwest wrapper that performs one provider request and turns every
//! outcome into either a decoded payload or a classified [`Failure`].

use crate::client::classify::classify_response;
use crate::error::{Failure, LazywriteError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Raw successful response
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    /// Decode the body as JSON, classifying malformed payloads as fatal
    pub fn json<R: DeserializeOwned>(&self) -> std::result::Result<R, Failure> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let text = String::from_utf8_lossy(&self.body);
            Failure::fatal(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// Shared HTTP client for all providers
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// Per-attempt deadlines are enforced by the invoker, so the client only
    /// carries a connect timeout.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                LazywriteError::Internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// POST a JSON body, optionally with a bearer credential
    pub async fn post<T>(
        &self,
        url: &str,
        body: &T,
        api_key: Option<&str>,
    ) -> std::result::Result<HttpReply, Failure>
    where
        T: Serialize + ?Sized,
    {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Failure::fatal(format!("Invalid API key format: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_headers = response.headers().clone();
            let response_body = response.text().await.unwrap_or_default();
            return Err(classify_response(status, &response_headers, &response_body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(HttpReply { content_type, body })
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<T, R>(
        &self,
        url: &str,
        body: &T,
        api_key: Option<&str>,
    ) -> std::result::Result<R, Failure>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.post(url, body, api_key).await?.json()
    }
}
