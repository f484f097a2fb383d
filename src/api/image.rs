//! Image providers
//!
//! Hugging Face inference (keyed) and Craiyon (keyless fallback).

use crate::api::payload::{CraiyonResponse, GeneratedImage, HfImage};
use crate::api::provider::{require_credential, Provider};
use crate::client::HttpClient;
use crate::error::Failure;
use crate::router::{Credential, KeyPool};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;

pub const HUGGING_FACE_API_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-2";
pub const CRAIYON_API_URL: &str = "https://backend.craiyon.com/generate";

/// Hugging Face text-to-image inference
pub struct HuggingFaceImage {
    http: HttpClient,
    url: String,
    pool: Arc<KeyPool>,
}

impl HuggingFaceImage {
    pub fn new(http: HttpClient, url: impl Into<String>, pool: Arc<KeyPool>) -> Self {
        Self {
            http,
            url: url.into(),
            pool,
        }
    }
}

#[async_trait]
impl Provider<GeneratedImage> for HuggingFaceImage {
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
    ) -> std::result::Result<GeneratedImage, Failure> {
        let credential = require_credential(self.name(), credential)?;
        let reply = self
            .http
            .post(&self.url, &json!({ "inputs": prompt }), Some(credential.value()))
            .await?;

        // Raw image bytes straight from the inference API
        if reply.is_image() {
            return Ok(GeneratedImage::base64(STANDARD.encode(&reply.body)));
        }

        let images: Vec<HfImage> = reply.json()?;
        match images.into_iter().next() {
            Some(HfImage { url: Some(url), .. }) => Ok(GeneratedImage::url(url)),
            Some(HfImage {
                image: Some(data), ..
            }) => Ok(GeneratedImage::base64(data)),
            _ => Err(Failure::fatal("Unexpected response from Hugging Face.")),
        }
    }
}

/// Craiyon, a free unauthenticated backend
pub struct CraiyonImage {
    http: HttpClient,
    url: String,
}

impl CraiyonImage {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Provider<GeneratedImage> for CraiyonImage {
    fn name(&self) -> &str {
        "craiyon"
    }

    async fn call(
        &self,
        prompt: &str,
        _credential: Option<&Credential>,
    ) -> std::result::Result<GeneratedImage, Failure> {
        let response: CraiyonResponse = self
            .http
            .post_json(&self.url, &json!({ "prompt": prompt }), None)
            .await?;

        response
            .images
            .into_iter()
            .next()
            .map(GeneratedImage::base64)
            .ok_or_else(|| Failure::fatal("Unexpected response from Craiyon."))
    }
}
