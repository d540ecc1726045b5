//! Gateway state shared by the HTTP routers and the runtime controller.

pub mod context;
pub mod error;
pub mod generation;
pub mod models;
pub mod runtime;
pub mod session;

pub use context::{GatewayContext, ProviderResolver, RuntimeMode};
pub use error::RuntimeError;
pub use generation::{CHUNK_CHARS, Generation, StreamPart, Usage, chunk_text};
pub use models::{LanguageModel, ModelRegistry, ONETEST_MODEL_ID, ONETEST_OUTPUT_TEXT, OPENAI_WEB_MODEL_IDS};
pub use runtime::{AppFactory, RuntimeController, RuntimeState};
pub use session::{SessionManager, SessionSlots};
