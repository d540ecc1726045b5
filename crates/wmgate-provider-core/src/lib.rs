//! Provider abstractions for the gateway.
//!
//! This crate does not depend on axum or any concrete HTTP client. Backends
//! implement [`WebModelProvider`]; the [`ProviderRegistry`] tracks which of
//! them passed their last initialization probe.

pub mod errors;
pub mod provider;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use errors::{ProviderError, ProviderResult};
pub use provider::{ChatSession, ContinuationMetadata, ProviderOutput, WebModelProvider};
pub use registry::{ProviderRegistry, ProviderStatus};
