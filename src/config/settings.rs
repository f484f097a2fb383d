//! Settings
//!
//! Configuration schema with defaults, environment overrides and validation.

use crate::api::image::{CRAIYON_API_URL, HUGGING_FACE_API_URL};
use crate::api::text::{DEFAULT_TEXT_MODEL, OPENROUTER_API_URL};
use crate::client::invoker::{RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::error::{LazywriteError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Highest numbered key variable scanned (`FOO_API_KEY_2` .. `FOO_API_KEY_16`)
pub const MAX_NUMBERED_KEYS: usize = 16;

const PRODUCTION_SELF_URL: &str = "https://lazywrite.onrender.com";
const LOCAL_SELF_URL: &str = "http://localhost:5000";

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Nothing configured
    #[default]
    Local,
    Development,
    Production,
}

impl Environment {
    /// Diagnostic detail is only exposed in development
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = LazywriteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "local" => Ok(Environment::Local),
            "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            other => Err(LazywriteError::Config(format!(
                "Unknown environment '{}'. Expected local, development or production",
                other
            ))),
        }
    }
}

/// OpenRouter text provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSettings {
    pub url: String,

    /// Model identifier sent in the request body
    pub model: String,

    /// Credentials in priority order
    #[serde(skip_serializing)]
    pub keys: Vec<String>,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            url: OPENROUTER_API_URL.to_string(),
            model: DEFAULT_TEXT_MODEL.to_string(),
            keys: Vec::new(),
        }
    }
}

/// Hugging Face image provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceSettings {
    pub url: String,

    #[serde(skip_serializing)]
    pub keys: Vec<String>,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            url: HUGGING_FACE_API_URL.to_string(),
            keys: Vec::new(),
        }
    }
}

/// The keyless image fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    pub enabled: bool,
    pub url: String,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: CRAIYON_API_URL.to_string(),
        }
    }
}

/// Retry and timeout knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub attempt_timeout_secs: u64,

    /// Deadline for calls to a remote LazyWrite deployment
    pub internal_timeout_secs: u64,

    pub connect_timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: 2000,
            attempt_timeout_secs: 60,
            internal_timeout_secs: 180,
            connect_timeout_secs: 10,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: Environment,

    /// Base URL of a remote LazyWrite deployment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,

    pub log_level: String,
    pub openrouter: OpenRouterSettings,
    pub hugging_face: HuggingFaceSettings,
    pub craiyon: FallbackSettings,
    pub retry: RetrySettings,

    /// Period of the blocked-key reset task; unset disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_reset_interval_secs: Option<u64>,

    /// Illustrations generated concurrently during book assembly
    pub image_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            self_url: None,
            log_level: "info".to_string(),
            openrouter: OpenRouterSettings::default(),
            hugging_face: HuggingFaceSettings::default(),
            craiyon: FallbackSettings::default(),
            retry: RetrySettings::default(),
            key_reset_interval_secs: None,
            image_concurrency: 1,
        }
    }
}

impl Settings {
    /// Overlay values from the process environment
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Overlay values from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(env) = var("APP_ENV") {
            self.environment = env.parse()?;
        }
        if let Some(url) = var("SELF_URL") {
            self.self_url = Some(url);
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(url) = var("OPENROUTER_API_URL") {
            self.openrouter.url = url;
        }
        if let Some(model) = var("OPENROUTER_MODEL") {
            self.openrouter.model = model;
        }
        extend_keys(&mut self.openrouter.keys, &lookup, "OPENROUTER_API_KEY");

        if let Some(url) = var("HUGGING_FACE_API_URL") {
            self.hugging_face.url = url;
        }
        extend_keys(&mut self.hugging_face.keys, &lookup, "HUGGING_FACE_API_KEY");

        if let Some(url) = var("CRAIYON_API_URL") {
            self.craiyon.url = url;
        }
        if let Some(enabled) = parse_var::<bool, _>(&var, "CRAIYON_ENABLED")? {
            self.craiyon.enabled = enabled;
        }

        if let Some(n) = parse_var(&var, "MAX_RETRIES")? {
            self.retry.max_retries = n;
        }
        if let Some(ms) = parse_var(&var, "BACKOFF_BASE_MS")? {
            self.retry.backoff_base_ms = ms;
        }
        if let Some(secs) = parse_var(&var, "ATTEMPT_TIMEOUT_SECS")? {
            self.retry.attempt_timeout_secs = secs;
        }
        if let Some(secs) = parse_var(&var, "INTERNAL_TIMEOUT_SECS")? {
            self.retry.internal_timeout_secs = secs;
        }
        if let Some(secs) = parse_var(&var, "KEY_RESET_INTERVAL_SECS")? {
            self.key_reset_interval_secs = Some(secs);
        }
        if let Some(n) = parse_var(&var, "IMAGE_CONCURRENCY")? {
            self.image_concurrency = n;
        }

        Ok(())
    }

    /// Check values that would break the call policy
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_retries > 10 {
            return Err(LazywriteError::Config(format!(
                "max_retries must be at most 10, got {}",
                self.retry.max_retries
            )));
        }
        if self.retry.backoff_base_ms == 0 {
            return Err(LazywriteError::Config(
                "backoff_base_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry.attempt_timeout_secs == 0 || self.retry.internal_timeout_secs == 0 {
            return Err(LazywriteError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.image_concurrency == 0 {
            return Err(LazywriteError::Config(
                "image_concurrency must be at least 1".to_string(),
            ));
        }
        if self.key_reset_interval_secs == Some(0) {
            return Err(LazywriteError::Config(
                "key_reset_interval_secs must be greater than zero".to_string(),
            ));
        }
        for (name, url) in [
            ("openrouter.url", self.openrouter.url.as_str()),
            ("hugging_face.url", self.hugging_face.url.as_str()),
            ("craiyon.url", self.craiyon.url.as_str()),
            ("self_url", self.self_url.as_deref().unwrap_or(LOCAL_SELF_URL)),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(LazywriteError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            backoff_base: Duration::from_millis(self.retry.backoff_base_ms),
            attempt_timeout: Duration::from_secs(self.retry.attempt_timeout_secs),
        }
    }

    /// Remote deployment URL, defaulting by environment
    pub fn resolved_self_url(&self) -> String {
        match &self.self_url {
            Some(url) => url.clone(),
            None if self.environment == Environment::Production => PRODUCTION_SELF_URL.to_string(),
            None => LOCAL_SELF_URL.to_string(),
        }
    }

    pub fn internal_timeout(&self) -> Duration {
        Duration::from_secs(self.retry.internal_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.retry.connect_timeout_secs)
    }

    pub fn key_reset_interval(&self) -> Option<Duration> {
        self.key_reset_interval_secs.map(Duration::from_secs)
    }
}

/// Collect `NAME`, `NAME_2`..`NAME_16` and comma-separated `NAMES`
fn extend_keys<F>(keys: &mut Vec<String>, lookup: &F, name: &str)
where
    F: Fn(&str) -> Option<String>,
{
    let numbered = std::iter::once(name.to_string())
        .chain((2..=MAX_NUMBERED_KEYS).map(|i| format!("{}_{}", name, i)));

    let mut found: Vec<String> = numbered.filter_map(|var| lookup(&var)).collect();
    if let Some(list) = lookup(&format!("{}S", name)) {
        found.extend(list.split(',').map(str::to_string));
    }

    for key in found {
        let key = key.trim();
        if !key.is_empty() && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                LazywriteError::Config(format!("Invalid value '{}' for {}: {}", raw, name, e))
            })
        })
        .transpose()
}
