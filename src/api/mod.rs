//! API Module
//!
//! Provider abstraction, payload types and the built-in providers.

pub mod image;
pub mod payload;
pub mod provider;
pub mod remote;
pub mod text;

pub use image::{CraiyonImage, HuggingFaceImage};
pub use payload::{GeneratedImage, GeneratedText, PromptRequest};
pub use provider::Provider;
pub use remote::RemoteEndpoint;
pub use text::OpenRouterText;
