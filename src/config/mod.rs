//! Configuration Module
//!
//! Settings schema and the layered loader.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    Environment, FallbackSettings, HuggingFaceSettings, OpenRouterSettings, RetrySettings,
    Settings,
};
