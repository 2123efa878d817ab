#![deny(unused)]
//! Model gateway for the ticket triage engine.
//!
//! This crate provides:
//! - Deployment registry with atomically swapped configuration snapshots
//! - Circuit breaker state machine per provider/model
//! - Outbound HTTP clients for OpenAI-compatible providers
//! - Provider router with single-level model fallback

pub mod breaker;
pub mod clients;
pub mod registry;
pub mod router;

pub use breaker::{BreakerState, CircuitBreaker};
pub use clients::{AzureOpenAiClient, MockProviderClient, OpenAiClient};
pub use registry::{DeploymentRegistry, SharedCredential};
pub use router::ProviderRouter;
