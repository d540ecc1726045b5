//! Wire types for every dialect the gateway speaks.
//!
//! Only the fields typical clients send or read are modelled; unknown
//! request fields are ignored.

pub mod error;
pub mod gemini;
pub mod openai;
pub mod sse;
pub mod web;
