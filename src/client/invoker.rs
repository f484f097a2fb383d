//! Resilient Invoker
//!
//! Runs one provider until it succeeds, fails terminally, or is exhausted:
//! rate limits block the credential and rotate to the next one, transient
//! failures are retried with exponential backoff, everything else is
//! returned as-is.

use crate::api::Provider;
use crate::error::{Failure, FailureKind, LazywriteError};
use crate::router::Credential;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(2000);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Retry knobs shared by every provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts allowed after a transient failure
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each further one
    pub backoff_base: Duration,

    /// Default per-attempt deadline
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry_index` (zero-based)
    pub fn backoff(&self, retry_index: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_index).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }

    /// Hard cap on underlying calls for one provider
    pub fn calls_per_provider(&self, pool_size: usize) -> usize {
        pool_size.max(1) * (self.max_retries as usize + 1)
    }
}

/// Outcome recorded for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed(FailureKind),
}

/// A single outbound call record
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub provider: String,

    /// Redacted credential hint, `None` for keyless providers
    pub credential: Option<String>,

    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Utc>,

    /// Backoff waited before this attempt
    pub delay: Duration,
}

/// Bounded counters for one logical request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallBudget {
    max_calls: usize,
    calls: usize,
    rotations: usize,
    retries: usize,
    escalations: usize,
}

impl CallBudget {
    pub fn new(max_calls: usize) -> Self {
        Self {
            max_calls,
            ..Default::default()
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn rotations(&self) -> usize {
        self.rotations
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn escalations(&self) -> usize {
        self.escalations
    }

    pub fn is_spent(&self) -> bool {
        self.calls >= self.max_calls
    }

    pub(crate) fn record_escalation(&mut self) {
        self.escalations += 1;
    }
}

/// Everything observed while serving one logical request
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallReport {
    pub budget: CallBudget,
    pub attempts: Vec<Attempt>,
}

impl CallReport {
    pub fn new(budget: CallBudget) -> Self {
        Self {
            budget,
            attempts: Vec::new(),
        }
    }
}

/// How a provider run ended
#[derive(Debug)]
pub enum ProviderOutcome<T> {
    /// A payload was produced
    Success(T),

    /// Not retryable anywhere: stop the chain
    Terminal(LazywriteError),

    /// This provider is used up: try the next one
    Exhausted(LazywriteError),
}

/// Performs and classifies provider calls under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct ResilientInvoker {
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one provider until success, a terminal failure, or exhaustion
    pub async fn invoke<T>(
        &self,
        provider: &dyn Provider<T>,
        prompt: &str,
        report: &mut CallReport,
    ) -> ProviderOutcome<T> {
        let name = provider.name().to_string();
        let pool = provider.key_pool();
        let deadline = provider
            .attempt_timeout()
            .unwrap_or(self.policy.attempt_timeout);
        let cap = self
            .policy
            .calls_per_provider(pool.as_ref().map_or(1, |p| p.len()));

        let mut calls = 0usize;
        let mut retries = 0u32;
        let mut delay = Duration::ZERO;
        let mut last_failure: Option<Failure> = None;

        loop {
            if calls >= cap || report.budget.is_spent() {
                tracing::warn!(provider = %name, calls, "Call budget spent");
                return ProviderOutcome::Exhausted(exhaustion_error(&name, last_failure));
            }

            let credential = match &pool {
                Some(pool) => match pool.next() {
                    Ok(credential) => Some(credential),
                    Err(LazywriteError::PoolExhausted { provider, .. }) => {
                        tracing::warn!(provider = %name, "Key pool exhausted");
                        // Keep the hint of the rate limit that blocked the last key
                        let retry_after = last_failure
                            .as_ref()
                            .and_then(|f| f.retry_after)
                            .map(|d| d.as_secs());
                        return ProviderOutcome::Exhausted(LazywriteError::PoolExhausted {
                            provider,
                            retry_after,
                        });
                    }
                    Err(e) => return ProviderOutcome::Exhausted(e),
                },
                None => None,
            };

            report.budget.calls += 1;
            calls += 1;

            let started_at = Utc::now();
            let result = self
                .attempt(provider, prompt, credential.as_ref(), deadline)
                .await;

            report.attempts.push(Attempt {
                provider: name.clone(),
                credential: credential.as_ref().map(Credential::redacted),
                outcome: match &result {
                    Ok(_) => AttemptOutcome::Success,
                    Err(f) => AttemptOutcome::Failed(f.kind),
                },
                started_at,
                delay,
            });
            delay = Duration::ZERO;

            let failure = match result {
                Ok(payload) => return ProviderOutcome::Success(payload),
                Err(failure) => failure,
            };

            match failure.kind {
                FailureKind::RateLimited => {
                    let (Some(pool), Some(credential)) = (&pool, &credential) else {
                        tracing::warn!(provider = %name, "Keyless provider rate limited");
                        return ProviderOutcome::Exhausted(LazywriteError::from_failure(
                            &name, failure,
                        ));
                    };
                    pool.block(credential);
                    report.budget.rotations += 1;
                    tracing::warn!(
                        provider = %name,
                        key = %credential,
                        remaining = pool.stats().available_keys,
                        "Key rate limited, rotating"
                    );
                }
                FailureKind::Transient => {
                    if retries >= self.policy.max_retries {
                        tracing::warn!(
                            provider = %name,
                            retries,
                            error = %failure.message,
                            "Transient failure, retries exhausted"
                        );
                        return ProviderOutcome::Exhausted(LazywriteError::from_failure(
                            &name, failure,
                        ));
                    }
                    delay = self.policy.backoff(retries);
                    retries += 1;
                    report.budget.retries += 1;
                    tracing::info!(
                        provider = %name,
                        attempt = retries,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.message,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                FailureKind::ContentRejected | FailureKind::Fatal => {
                    tracing::error!(
                        provider = %name,
                        kind = %failure.kind,
                        error = %failure.message,
                        "Provider call failed"
                    );
                    return ProviderOutcome::Terminal(LazywriteError::from_failure(
                        &name, failure,
                    ));
                }
            }

            last_failure = Some(failure);
        }
    }

    /// One call under a deadline; an elapsed deadline is transient
    async fn attempt<T>(
        &self,
        provider: &dyn Provider<T>,
        prompt: &str,
        credential: Option<&Credential>,
        deadline: Duration,
    ) -> std::result::Result<T, Failure> {
        match tokio::time::timeout(deadline, provider.call(prompt, credential)).await {
            Ok(result) => result,
            Err(_) => Err(Failure::transient(format!(
                "No response within {:?}",
                deadline
            ))),
        }
    }
}

fn exhaustion_error(provider: &str, last_failure: Option<Failure>) -> LazywriteError {
    match last_failure {
        Some(failure) => LazywriteError::from_failure(provider, failure),
        None => LazywriteError::Internal(format!("No call budget left for '{}'", provider)),
    }
}
