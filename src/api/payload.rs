//! Generation payloads
//!
//! The two logical operation results plus the wire shapes of the built-in
//! providers.

use serde::{Deserialize, Serialize};

/// Result of `GenerateText`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
}

/// Result of `GenerateImage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeneratedImage {
    Url {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Base64 {
        #[serde(rename = "imageBase64")]
        image_base64: String,
    },
}

impl GeneratedImage {
    pub fn url(url: impl Into<String>) -> Self {
        GeneratedImage::Url {
            image_url: url.into(),
        }
    }

    pub fn base64(data: impl Into<String>) -> Self {
        GeneratedImage::Base64 {
            image_base64: data.into(),
        }
    }

    /// The URL or base64 data, whichever is present
    pub fn as_str(&self) -> &str {
        match self {
            GeneratedImage::Url { image_url } => image_url,
            GeneratedImage::Base64 { image_base64 } => image_base64,
        }
    }
}

/// Body accepted by the remote `/generate-*` endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// A message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,

    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
        }
    }
}

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Chat completion response, reduced to what the text provider reads
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Get the first non-empty message content
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// One entry of a Hugging Face JSON image response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HfImage {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub image: Option<String>,
}

/// Craiyon response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CraiyonResponse {
    #[serde(default)]
    pub images: Vec<String>,
}
