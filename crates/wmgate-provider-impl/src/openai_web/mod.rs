//! Forwarding backend for a hosted OpenAI-compatible chat API.

mod client;
mod provider;

pub use client::{OpenAiWebClient, WireMessage};
pub use provider::OpenAiWebProvider;
