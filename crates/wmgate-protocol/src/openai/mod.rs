pub mod chat_completions;
pub mod models;
pub mod responses;
pub mod types;
