//! Provider Chain
//!
//! Ordered fallback sequence of providers for one operation.

use crate::api::Provider;
use crate::client::invoker::{CallBudget, CallReport, ProviderOutcome, ResilientInvoker};
use crate::error::{LazywriteError, ProviderFailure, Result};
use crate::router::KeyPool;
use std::sync::Arc;

/// Providers tried strictly in order until one succeeds
pub struct ProviderChain<T> {
    /// Operation name ("text", "image") for logs and errors
    operation: String,

    providers: Vec<Arc<dyn Provider<T>>>,
}

impl<T> ProviderChain<T> {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            providers: Vec::new(),
        }
    }

    /// Append a provider at the lowest priority
    pub fn with_provider(mut self, provider: Arc<dyn Provider<T>>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in call order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Key pools of the keyed providers
    pub fn key_pools(&self) -> Vec<Arc<KeyPool>> {
        self.providers.iter().filter_map(|p| p.key_pool()).collect()
    }

    /// Total call allowance for one request through this chain
    pub fn call_budget(&self, invoker: &ResilientInvoker) -> CallBudget {
        let max_calls = self
            .providers
            .iter()
            .map(|p| {
                let pool_size = p.key_pool().map_or(1, |pool| pool.len());
                invoker.policy().calls_per_provider(pool_size)
            })
            .sum();
        CallBudget::new(max_calls)
    }

    /// Try each provider in order; the first success wins
    pub async fn invoke(
        &self,
        invoker: &ResilientInvoker,
        prompt: &str,
        report: &mut CallReport,
    ) -> Result<T> {
        if self.providers.is_empty() {
            return Err(LazywriteError::Config(format!(
                "No providers configured for {} generation",
                self.operation
            )));
        }

        let mut failures = Vec::new();

        for (position, provider) in self.providers.iter().enumerate() {
            if position > 0 {
                report.budget.record_escalation();
                tracing::info!(
                    operation = %self.operation,
                    provider = %provider.name(),
                    "Escalating to fallback provider"
                );
            }

            match invoker.invoke(provider.as_ref(), prompt, report).await {
                ProviderOutcome::Success(payload) => {
                    tracing::debug!(
                        operation = %self.operation,
                        provider = %provider.name(),
                        "Provider succeeded"
                    );
                    return Ok(payload);
                }
                ProviderOutcome::Terminal(error) => return Err(error),
                ProviderOutcome::Exhausted(error) => {
                    tracing::warn!(
                        operation = %self.operation,
                        provider = %provider.name(),
                        error = %error,
                        "Provider exhausted"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        // A lone provider reports its own error
        if failures.len() == 1 && self.providers.len() == 1 {
            if let Some(only) = failures.pop() {
                return Err(only.error);
            }
        }

        Err(LazywriteError::AllProvidersExhausted { failures })
    }
}
