//! LazyWrite - illustrated children's book generator
//!
//! Resilient calls to rate-limited text and image providers: round-robin key
//! pools with blocklists, bounded retry with exponential backoff, and ordered
//! provider fallback chains.

use std::sync::Arc;

pub mod api;
pub mod book;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod router;

use api::remote::{IMAGE_PATH, TEXT_PATH};
use api::{
    CraiyonImage, GeneratedImage, GeneratedText, HuggingFaceImage, OpenRouterText, RemoteEndpoint,
};
use client::{CallReport, HttpClient, ResilientInvoker};
use config::Settings;
use error::{LazywriteError, Result};
use router::{KeyPool, ProviderChain};

/// Entry point for the `GenerateText` and `GenerateImage` operations
pub struct CallOrchestrator {
    text: ProviderChain<GeneratedText>,
    image: ProviderChain<GeneratedImage>,
    invoker: ResilientInvoker,
}

impl CallOrchestrator {
    pub fn new(
        text: ProviderChain<GeneratedText>,
        image: ProviderChain<GeneratedImage>,
        invoker: ResilientInvoker,
    ) -> Self {
        Self {
            text,
            image,
            invoker,
        }
    }

    /// Build the default chains: text = [OpenRouter], image = [Hugging Face, Craiyon]
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = HttpClient::new(settings.connect_timeout())?;

        let openrouter_pool = Arc::new(KeyPool::new(
            "openrouter",
            settings.openrouter.keys.clone(),
        ));
        let hugging_face_pool = Arc::new(KeyPool::new(
            "huggingface",
            settings.hugging_face.keys.clone(),
        ));
        for pool in [&openrouter_pool, &hugging_face_pool] {
            if pool.is_empty() {
                tracing::warn!(provider = %pool.provider(), "No API keys configured");
            } else {
                tracing::info!(provider = %pool.provider(), keys = pool.len(), "Loaded API keys");
            }
        }

        let openrouter = OpenRouterText::new(
            http.clone(),
            settings.openrouter.url.clone(),
            settings.openrouter.model.clone(),
            openrouter_pool,
        );
        let hugging_face = HuggingFaceImage::new(
            http.clone(),
            settings.hugging_face.url.clone(),
            hugging_face_pool,
        );

        let text = ProviderChain::<GeneratedText>::new("text").with_provider(Arc::new(openrouter));
        let mut image =
            ProviderChain::<GeneratedImage>::new("image").with_provider(Arc::new(hugging_face));
        if settings.craiyon.enabled {
            let craiyon = CraiyonImage::new(http, settings.craiyon.url.clone());
            image = image.with_provider(Arc::new(craiyon));
        }

        Ok(Self::new(
            text,
            image,
            ResilientInvoker::new(settings.retry_policy()),
        ))
    }

    /// Forward both operations to another deployment's HTTP endpoints
    pub fn remote(settings: &Settings) -> Result<Self> {
        let http = HttpClient::new(settings.connect_timeout())?;
        let base_url = settings.resolved_self_url();
        let timeout = settings.internal_timeout();

        let text_endpoint =
            RemoteEndpoint::<GeneratedText>::new(http.clone(), &base_url, TEXT_PATH, timeout);
        let image_endpoint =
            RemoteEndpoint::<GeneratedImage>::new(http, &base_url, IMAGE_PATH, timeout);

        let text = ProviderChain::<GeneratedText>::new("text").with_provider(Arc::new(text_endpoint));
        let image =
            ProviderChain::<GeneratedImage>::new("image").with_provider(Arc::new(image_endpoint));

        tracing::info!(url = %base_url, "Using remote generation endpoints");
        Ok(Self::new(
            text,
            image,
            ResilientInvoker::new(settings.retry_policy()),
        ))
    }

    pub async fn generate_text(&self, prompt: &str) -> Result<GeneratedText> {
        self.generate_text_with_report(prompt).await.0
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        self.generate_image_with_report(prompt).await.0
    }

    /// Like [`generate_text`](Self::generate_text), also returning every attempt made
    pub async fn generate_text_with_report(
        &self,
        prompt: &str,
    ) -> (Result<GeneratedText>, CallReport) {
        self.run(&self.text, prompt).await
    }

    pub async fn generate_image_with_report(
        &self,
        prompt: &str,
    ) -> (Result<GeneratedImage>, CallReport) {
        self.run(&self.image, prompt).await
    }

    /// Every key pool behind either chain
    pub fn key_pools(&self) -> Vec<Arc<KeyPool>> {
        let mut pools = self.text.key_pools();
        pools.extend(self.image.key_pools());
        pools
    }

    async fn run<T>(&self, chain: &ProviderChain<T>, prompt: &str) -> (Result<T>, CallReport) {
        let mut report = CallReport::new(chain.call_budget(&self.invoker));
        if prompt.trim().is_empty() {
            return (Err(LazywriteError::EmptyPrompt), report);
        }

        let result = chain.invoke(&self.invoker, prompt, &mut report).await;
        let budget = &report.budget;
        match &result {
            Ok(_) => tracing::info!(
                operation = %chain.operation(),
                calls = budget.calls(),
                rotations = budget.rotations(),
                retries = budget.retries(),
                escalations = budget.escalations(),
                "Generation succeeded"
            ),
            Err(e) => tracing::error!(
                operation = %chain.operation(),
                calls = budget.calls(),
                error = %e,
                "Generation failed"
            ),
        }
        (result, report)
    }
}
