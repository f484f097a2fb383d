//! Provider abstraction
//!
//! One external content-generation service, either backed by a [`KeyPool`]
//! or keyless.

use crate::error::Failure;
use crate::router::{Credential, KeyPool};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// An external service producing payloads of type `T` from a prompt
#[async_trait]
pub trait Provider<T>: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Credential pool, `None` for keyless providers
    fn key_pool(&self) -> Option<Arc<KeyPool>> {
        None
    }

    /// Per-attempt deadline overriding the invoker default
    fn attempt_timeout(&self) -> Option<Duration> {
        None
    }

    /// Perform one call. `credential` is `Some` exactly when the provider
    /// has a key pool.
    async fn call(
        &self,
        prompt: &str,
        credential: Option<&Credential>,
    ) -> std::result::Result<T, Failure>;
}

/// Extract the credential a keyed provider was handed
pub(crate) fn require_credential<'a>(
    provider: &str,
    credential: Option<&'a Credential>,
) -> std::result::Result<&'a Credential, Failure> {
    credential.ok_or_else(|| Failure::fatal(format!("'{}' called without a credential", provider)))
}
