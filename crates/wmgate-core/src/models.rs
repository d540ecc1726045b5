use tokio::sync::mpsc;
use tracing::debug;
use wmgate_common::GEMINI_MODEL_IDS;
use wmgate_provider_core::ProviderResult;

use crate::context::ProviderResolver;
use crate::generation::{CHUNK_CHARS, Generation, StreamPart, Usage, chunk_text};

pub const OPENAI_WEB_MODEL_IDS: [&str; 3] = ["gpt-4o", "gpt-4.1", "gpt-4.1-mini"];

pub const ONETEST_MODEL_ID: &str = "onetest-model";
pub const ONETEST_OUTPUT_TEXT: &str = "onetest";

const STREAM_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    /// Served by whichever provider is primary.
    Provider,
    /// Deterministic answer, no backend involved.
    OneTest,
}

/// Generation adapter bound to one model id.
#[derive(Clone)]
pub struct LanguageModel {
    id: String,
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Provider(ProviderResolver),
    OneTest,
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Provider(_) => "provider",
            Backend::OneTest => "onetest",
        };
        f.debug_struct("LanguageModel")
            .field("id", &self.id)
            .field("backend", &backend)
            .finish()
    }
}

impl LanguageModel {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// One stateless round-trip through the primary provider.
    pub async fn generate(&self, prompt: &str) -> ProviderResult<Generation> {
        match &self.backend {
            Backend::OneTest => Ok(Generation {
                text: ONETEST_OUTPUT_TEXT.to_string(),
                usage: Usage {
                    input_tokens: 0,
                    output_tokens: 1,
                },
            }),
            Backend::Provider(resolve) => {
                let provider = resolve()?;
                let output = provider
                    .generate_content(prompt.trim(), &self.id, &[], None)
                    .await?;
                let output_tokens = output.text.chars().count() as u64;
                Ok(Generation {
                    text: output.text,
                    usage: Usage {
                        input_tokens: 0,
                        output_tokens,
                    },
                })
            }
        }
    }

    /// Replays a full generation as fixed-size deltas over a bounded
    /// channel. The producer stops when the receiver is dropped.
    pub fn stream(&self, prompt: &str) -> mpsc::Receiver<StreamPart> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let model = self.clone();
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            let generation = match model.generate(&prompt).await {
                Ok(generation) => generation,
                Err(err) => {
                    let _ = tx.send(StreamPart::Error(err)).await;
                    return;
                }
            };
            for delta in chunk_text(&generation.text, CHUNK_CHARS) {
                if tx.send(StreamPart::Delta(delta)).await.is_err() {
                    debug!(model = %model.id, "stream receiver dropped");
                    return;
                }
            }
            let _ = tx.send(StreamPart::Finish(generation.usage)).await;
        });
        rx
    }
}

/// Known external model ids in listing order.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<(&'static str, ModelFamily)>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        let mut entries = vec![(ONETEST_MODEL_ID, ModelFamily::OneTest)];
        entries.extend(GEMINI_MODEL_IDS.iter().map(|id| (*id, ModelFamily::Provider)));
        entries.extend(OPENAI_WEB_MODEL_IDS.iter().map(|id| (*id, ModelFamily::Provider)));
        Self { entries }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.family(id).is_some()
    }

    fn family(&self, id: &str) -> Option<(&'static str, ModelFamily)> {
        self.entries.iter().find(|(known, _)| *known == id).copied()
    }

    /// `requested` if known, else `default_model` if known, else the first
    /// web model id.
    pub fn resolve(
        &self,
        requested: Option<&str>,
        default_model: &str,
        resolver: &ProviderResolver,
    ) -> LanguageModel {
        let requested = requested.filter(|id| !id.is_empty()).unwrap_or(default_model);
        let (id, family) = self
            .family(requested)
            .or_else(|| self.family(default_model))
            .unwrap_or((GEMINI_MODEL_IDS[0], ModelFamily::Provider));
        let backend = match family {
            ModelFamily::OneTest => Backend::OneTest,
            ModelFamily::Provider => Backend::Provider(resolver.clone()),
        };
        LanguageModel {
            id: id.to_string(),
            backend,
        }
    }
}
