//! Text provider
//!
//! OpenRouter chat completions with round-robin keys.

use crate::api::payload::{ChatMessage, ChatRequest, ChatResponse, GeneratedText};
use crate::api::provider::{require_credential, Provider};
use crate::client::HttpClient;
use crate::error::Failure;
use crate::router::{Credential, KeyPool};
use async_trait::async_trait;
use std::sync::Arc;

pub const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4.1";
pub const SYSTEM_PROMPT: &str = "You are a creative book-writing assistant.";

/// OpenRouter-compatible chat completion provider
pub struct OpenRouterText {
    http: HttpClient,
    url: String,
    model: String,
    pool: Arc<KeyPool>,
}

impl OpenRouterText {
    pub fn new(
        http: HttpClient,
        url: impl Into<String>,
        model: impl Into<String>,
        pool: Arc<KeyPool>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            model: model.into(),
            pool,
        }
    }

    fn request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", prompt),
            ],
        }
    }
}

#[async_trait]
impl Provider<GeneratedText> for OpenRouterText {
    fn name(&self) -> &str {
        self.pool.provider()
    }

    fn key_pool(&self) -> Option<Arc<KeyPool>> {
        Some(Arc::clone(&self.pool))
    }

    async fn call(
        &self,
        prompt: &str,
        credential: Option<&Credential>,
    ) -> std::result::Result<GeneratedText, Failure> {
        let credential = require_credential(self.name(), credential)?;
        let response: ChatResponse = self
            .http
            .post_json(&self.url, &self.request(prompt), Some(credential.value()))
            .await?;

        response
            .content()
            .map(|text| GeneratedText {
                text: text.to_string(),
            })
            .ok_or_else(|| Failure::fatal("Unexpected response from OpenRouter."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn provider(url: String) -> OpenRouterText {
        let pool = Arc::new(KeyPool::new("openrouter", vec!["or-key-1".to_string()]));
        OpenRouterText::new(
            HttpClient::new(Duration::from_secs(2)).unwrap(),
            url,
            DEFAULT_TEXT_MODEL,
            pool,
        )
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer or-key-1")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4.1",
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": "Write about bees"}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Bees buzz."}}]}"#)
            .create_async()
            .await;

        let provider = provider(format!("{}/chat/completions", server.url()));
        let credential = Credential::new("or-key-1");
        let text = provider
            .call("Write about bees", Some(&credential))
            .await
            .unwrap();
        assert_eq!(text.text, "Bees buzz.");
    }

    #[tokio::test]
    async fn test_empty_choices_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let provider = provider(format!("{}/chat/completions", server.url()));
        let credential = Credential::new("or-key-1");
        let failure = provider.call("x", Some(&credential)).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Fatal);
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal() {
        let provider = provider("http://127.0.0.1:9".to_string());
        let failure = provider.call("x", None).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Fatal);
    }
}
