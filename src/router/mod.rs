//! Router Module
//!
//! Credential pools, provider fallback chains and key recovery.

pub mod chain;
pub mod key_pool;
pub mod recovery;

pub use chain::ProviderChain;
pub use key_pool::{Credential, KeyPool, KeyPoolStats};
pub use recovery::{recover, spawn_recovery};
