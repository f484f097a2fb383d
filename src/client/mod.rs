//! Client Module
//!
//! HTTP transport, response classification and the resilient invoker.

pub mod classify;
pub mod http;
pub mod invoker;

pub use http::{HttpClient, HttpReply};
pub use invoker::{
    Attempt, AttemptOutcome, CallBudget, CallReport, ProviderOutcome, ResilientInvoker,
    RetryPolicy,
};
