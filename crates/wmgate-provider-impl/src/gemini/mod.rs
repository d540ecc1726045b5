//! Cookie-authenticated web model backend.

mod client;
mod constants;
mod cookies;
pub mod decode;
mod provider;

pub use client::{GeminiChatSession, GeminiWebClient};
pub use constants::GeminiEndpoints;
pub use cookies::{CookieSource, Credentials, NoBrowserCookies};
pub use decode::{Candidate, DecodeError, ModelOutput, decode_candidates};
pub use provider::GeminiWebProvider;
