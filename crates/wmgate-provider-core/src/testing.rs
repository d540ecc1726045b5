//! In-memory provider double that records every call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::errors::{ProviderError, ProviderResult};
use crate::provider::{ChatSession, ContinuationMetadata, ProviderOutput, WebModelProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub model: String,
    pub files: Vec<String>,
    pub metadata: ContinuationMetadata,
    /// Index of the chat session that issued the call, `None` for stateless calls.
    pub session: Option<usize>,
}

struct FakeState {
    reply: Mutex<ProviderResult<String>>,
    init_result: Mutex<Result<(), String>>,
    last_error: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    chats_started: AtomicUsize,
    init_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeState {
    fn answer(
        &self,
        prompt: &str,
        model: &str,
        files: &[String],
        metadata: ContinuationMetadata,
        session: Option<usize>,
    ) -> ProviderResult<ProviderOutput> {
        let turn = {
            let mut calls = lock(&self.calls);
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                model: model.to_string(),
                files: files.to_vec(),
                metadata,
                session,
            });
            calls.len()
        };
        let text = lock(&self.reply).clone()?;
        Ok(ProviderOutput {
            text,
            metadata: vec![
                format!("c_{}", session.unwrap_or(0)),
                format!("r_{turn}"),
            ],
            candidate_id: Some(format!("rc_{turn}")),
        })
    }
}

/// Provider double. Succeeds by default; configure failures with the builder
/// methods or the setters.
pub struct FakeProvider {
    id: String,
    label: String,
    enabled: AtomicBool,
    state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: format!("Fake {id}"),
            id,
            enabled: AtomicBool::new(true),
            state: Arc::new(FakeState {
                reply: Mutex::new(Ok("fake reply".to_string())),
                init_result: Mutex::new(Ok(())),
                last_error: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                chats_started: AtomicUsize::new(0),
                init_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn disabled(self) -> Self {
        self.enabled.store(false, Ordering::SeqCst);
        self
    }

    pub fn failing_init(self, reason: impl Into<String>) -> Self {
        self.set_init_result(Err(reason.into()));
        self
    }

    pub fn replying(self, text: impl Into<String>) -> Self {
        self.set_reply(Ok(text.into()));
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_init_result(&self, result: Result<(), String>) {
        *lock(&self.state.init_result) = result;
    }

    pub fn set_reply(&self, reply: ProviderResult<String>) {
        *lock(&self.state.reply) = reply;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.prompt).collect()
    }

    pub fn chats_started(&self) -> usize {
        self.state.chats_started.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.state.init_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebModelProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn last_error(&self) -> Option<String> {
        lock(&self.state.last_error).clone()
    }

    async fn initialize(&self) -> bool {
        self.state.init_calls.fetch_add(1, Ordering::SeqCst);
        let result = lock(&self.state.init_result).clone();
        *lock(&self.state.last_error) = result.clone().err();
        result.is_ok()
    }

    async fn generate_content(
        &self,
        prompt: &str,
        model: &str,
        files: &[String],
        metadata: Option<&ContinuationMetadata>,
    ) -> ProviderResult<ProviderOutput> {
        self.state.answer(
            prompt,
            model,
            files,
            metadata.cloned().unwrap_or_default(),
            None,
        )
    }

    fn start_chat(&self, model: &str) -> ProviderResult<Box<dyn ChatSession>> {
        let index = self.state.chats_started.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(FakeChatSession {
            state: self.state.clone(),
            model: model.to_string(),
            index,
            metadata: ContinuationMetadata::default(),
        }))
    }
}

struct FakeChatSession {
    state: Arc<FakeState>,
    model: String,
    index: usize,
    metadata: ContinuationMetadata,
}

#[async_trait]
impl ChatSession for FakeChatSession {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &mut self,
        prompt: &str,
        files: &[String],
    ) -> ProviderResult<ProviderOutput> {
        let output = self.state.answer(
            prompt,
            &self.model,
            files,
            self.metadata.clone(),
            Some(self.index),
        )?;
        self.metadata = ContinuationMetadata::after_turn(&output);
        Ok(output)
    }
}

/// Error handy for tests that need an upstream failure.
pub fn upstream_failure() -> ProviderError {
    ProviderError::UpstreamStatus {
        provider: "Fake".to_string(),
        status: 500,
        body: String::new(),
    }
}
