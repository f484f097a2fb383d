//! Remote generation endpoint
//!
//! Keyless provider that forwards `{prompt}` to another LazyWrite deployment
//! (`<base>/generate-text`, `<base>/generate-image`). Used when book assembly
//! runs apart from the service holding the provider keys.

use crate::api::payload::PromptRequest;
use crate::api::provider::Provider;
use crate::client::HttpClient;
use crate::error::Failure;
use crate::router::Credential;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;

pub const TEXT_PATH: &str = "/generate-text";
pub const IMAGE_PATH: &str = "/generate-image";

pub struct RemoteEndpoint<T> {
    http: HttpClient,
    name: String,
    url: String,
    timeout: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> RemoteEndpoint<T> {
    pub fn new(http: HttpClient, base_url: &str, path: &str, timeout: Duration) -> Self {
        Self {
            http,
            name: format!("remote{}", path),
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
            timeout,
            _payload: PhantomData,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl<T> Provider<T> for RemoteEndpoint<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn call(
        &self,
        prompt: &str,
        _credential: Option<&Credential>,
    ) -> std::result::Result<T, Failure> {
        tracing::debug!(url = %self.url, "Calling remote generation endpoint");
        let body = PromptRequest {
            prompt: prompt.to_string(),
        };
        self.http.post_json(&self.url, &body, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::payload::{GeneratedImage, GeneratedText};
    use crate::error::FailureKind;

    fn http() -> HttpClient {
        HttpClient::new(Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_remote_text_and_image() {
        let mut server = mockito::Server::new_async().await;
        let _text = server
            .mock("POST", TEXT_PATH)
            .with_status(200)
            .with_body(r#"{"text":"Chapter 1: Rivers"}"#)
            .create_async()
            .await;
        let _image = server
            .mock("POST", IMAGE_PATH)
            .with_status(200)
            .with_body(r#"{"imageUrl":"https://cdn/river.png"}"#)
            .create_async()
            .await;

        let base = format!("{}/", server.url());
        let text: RemoteEndpoint<GeneratedText> =
            RemoteEndpoint::new(http(), &base, TEXT_PATH, Duration::from_secs(5));
        assert_eq!(text.url(), format!("{}{}", server.url(), TEXT_PATH));
        assert_eq!(text.call("rivers", None).await.unwrap().text, "Chapter 1: Rivers");

        let image: RemoteEndpoint<GeneratedImage> =
            RemoteEndpoint::new(http(), &server.url(), IMAGE_PATH, Duration::from_secs(5));
        assert_eq!(
            image.call("rivers", None).await.unwrap(),
            GeneratedImage::url("https://cdn/river.png")
        );
        assert_eq!(
            Provider::<GeneratedImage>::attempt_timeout(&image),
            Some(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn test_remote_error_bodies() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", TEXT_PATH)
            .with_status(400)
            .with_body(r#"{"error":"Content filter triggered"}"#)
            .create_async()
            .await;

        let text: RemoteEndpoint<GeneratedText> =
            RemoteEndpoint::new(http(), &server.url(), TEXT_PATH, Duration::from_secs(5));
        let failure = text.call("rivers", None).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::ContentRejected);
    }
}
