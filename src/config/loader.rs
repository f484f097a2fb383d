//! Configuration Loader
//!
//! Loads settings from built-in defaults, an optional JSON file and the
//! environment, in that order.

use crate::config::Settings;
use crate::error::{LazywriteError, Result};
use std::path::{Path, PathBuf};

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    settings: Settings,
}

impl ConfigLoader {
    /// Load defaults, the first config file found, then the process environment
    pub fn new() -> Result<Self> {
        let mut loader = Self {
            settings: Settings::default(),
        };

        loader.load_from_default_paths()?;
        loader.settings.apply_process_env()?;
        loader.settings.validate()?;

        Ok(loader)
    }

    /// Load defaults, a specific config file, then the process environment
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self {
            settings: Settings::default(),
        };

        loader.load_from_file(path)?;
        loader.settings.apply_process_env()?;
        loader.settings.validate()?;

        Ok(loader)
    }

    /// Load from a file (if any) and an explicit environment lookup
    pub fn from_sources<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut loader = Self {
            settings: Settings::default(),
        };

        if let Some(path) = path {
            loader.load_from_file(path)?;
        }
        loader.settings.apply_env(lookup)?;
        loader.settings.validate()?;

        Ok(loader)
    }

    /// Load the first config file that exists
    fn load_from_default_paths(&mut self) -> Result<()> {
        if let Some(path) = Self::get_config_paths().into_iter().find(|p| p.exists()) {
            self.load_from_file(&path)?;
        }
        Ok(())
    }

    /// Get list of config paths to check
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable
        if let Ok(custom_path) = std::env::var("LAZYWRITE_CONFIG") {
            paths.push(PathBuf::from(custom_path));
        }

        // 2. Current directory
        paths.push(PathBuf::from("lazywrite.json"));

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("lazywrite").join("config.json"));
        }

        paths
    }

    /// Replace the current settings with a file's, missing fields take defaults
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LazywriteError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.settings = serde_json::from_str(&content).map_err(|e| {
            LazywriteError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(())
    }

    /// Get the loaded settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Take ownership of the settings
    pub fn into_settings(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_sources() {
        let loader = ConfigLoader::from_sources(None, no_env).unwrap();
        assert_eq!(loader.settings(), &Settings::default());
    }

    #[test]
    fn test_load_from_custom_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "environment": "development",
                "openrouter": {{
                    "url": "https://router.example.com/v1/chat/completions",
                    "model": "gpt-4.1-mini",
                    "keys": ["file-key"]
                }},
                "retry": {{ "max_retries": 3 }}
            }}"#
        )
        .unwrap();

        let settings = ConfigLoader::from_sources(Some(file.path()), no_env)
            .unwrap()
            .into_settings();

        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.openrouter.model, "gpt-4.1-mini");
        assert_eq!(settings.openrouter.keys, vec!["file-key"]);
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.retry.backoff_base_ms, 2000);
        assert!(settings.craiyon.enabled);
    }

    #[test]
    fn test_partial_provider_sections_keep_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "craiyon": {{ "enabled": false }},
                "hugging_face": {{ "keys": ["hf"] }},
                "openrouter": {{ "model": "gpt-4.1-mini" }}
            }}"#
        )
        .unwrap();

        let settings = ConfigLoader::from_sources(Some(file.path()), no_env)
            .unwrap()
            .into_settings();
        let defaults = Settings::default();

        assert!(!settings.craiyon.enabled);
        assert_eq!(settings.craiyon.url, defaults.craiyon.url);
        assert_eq!(settings.hugging_face.keys, vec!["hf"]);
        assert_eq!(settings.hugging_face.url, defaults.hugging_face.url);
        assert_eq!(settings.openrouter.model, "gpt-4.1-mini");
        assert_eq!(settings.openrouter.url, defaults.openrouter.url);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "retry": {{ "max_retries": 3 }} }}"#).unwrap();

        let settings = ConfigLoader::from_sources(Some(file.path()), |name| match name {
            "MAX_RETRIES" => Some("1".to_string()),
            "OPENROUTER_API_KEY" => Some("env-key".to_string()),
            _ => None,
        })
        .unwrap()
        .into_settings();

        assert_eq!(settings.retry.max_retries, 1);
        assert_eq!(settings.openrouter.keys, vec!["env-key"]);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let err = ConfigLoader::from_sources(Some(file.path()), no_env)
            .err()
            .unwrap();
        assert!(matches!(err, LazywriteError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ConfigLoader::from_path("/nonexistent/lazywrite.json")
            .err()
            .unwrap();
        assert!(matches!(err, LazywriteError::Config(msg) if msg.contains("Failed to read")));
    }
}
