//! Scripted providers for pipeline tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{
    BackendResolver, EmbeddingProvider, LlmProvider, ResolvedBackend, VectorMatch, VectorRecord,
    VectorStoreProvider,
};
use crate::storage::{ChatStore, ProfileStore};
use crate::types::{BackendChoice, CredentialSource, Turn};

type ErrorFn = Box<dyn Fn() -> Error + Send + Sync>;

#[derive(Default)]
pub struct FakeVectorStore {
    matches: Vec<VectorMatch>,
    error: Option<ErrorFn>,
    namespaces: Mutex<HashMap<String, Vec<VectorRecord>>>,
    queried: Mutex<Vec<String>>,
}

impl FakeVectorStore {
    pub fn with_matches(matches: Vec<VectorMatch>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }

    pub fn failing(error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            error: Some(Box::new(error)),
            ..Self::default()
        }
    }

    pub fn queried_namespaces(&self) -> Vec<String> {
        self.queried.lock().clone()
    }

    pub fn upserted(&self, namespace: &str) -> Vec<VectorRecord> {
        self.namespaces.lock().get(namespace).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl VectorStoreProvider for FakeVectorStore {
    async fn query(&self, namespace: &str, _vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        self.queried.lock().push(namespace.to_string());
        if let Some(error) = &self.error {
            return Err(error());
        }
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        if let Some(error) = &self.error {
            return Err(error());
        }
        self.namespaces
            .lock()
            .entry(namespace.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records.len())
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        Ok(self
            .namespaces
            .lock()
            .get(namespace)
            .map(|records| !records.is_empty())
            .unwrap_or(false))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct LlmCall {
    pub question: String,
    pub context: String,
    pub history_len: usize,
}

pub struct FakeLlm {
    answer: String,
    error: Option<ErrorFn>,
    calls: Mutex<Vec<LlmCall>>,
}

impl FakeLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            answer: String::new(),
            error: Some(Box::new(error)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn last_call(&self) -> Option<LlmCall> {
        self.calls.lock().last().map(|c| LlmCall {
            question: c.question.clone(),
            context: c.context.clone(),
            history_len: c.history_len,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate_answer(&self, question: &str, context: &str, history: &[Turn]) -> Result<String> {
        self.calls.lock().push(LlmCall {
            question: question.to_string(),
            context: context.to_string(),
            history_len: history.len(),
        });
        match &self.error {
            Some(error) => Err(error()),
            None => Ok(self.answer.clone()),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

pub struct FakeEmbedder {
    dimensions: usize,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let seed = text.len() as f32;
        Ok((0..self.dimensions).map(|i| seed + i as f32).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn backend(llm: Arc<FakeLlm>, embedder: FakeEmbedder) -> ResolvedBackend {
    ResolvedBackend {
        llm,
        embedder: Arc::new(embedder),
        source: CredentialSource::ServiceDefault,
    }
}

/// Resolves every choice to the same backend, or fails construction
pub struct FakeResolver {
    backend: Option<ResolvedBackend>,
    resolved: Mutex<Vec<&'static str>>,
}

impl FakeResolver {
    pub fn new(backend: ResolvedBackend) -> Self {
        Self {
            backend: Some(backend),
            resolved: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            backend: None,
            resolved: Mutex::new(Vec::new()),
        }
    }

    pub fn resolved(&self) -> Vec<&'static str> {
        self.resolved.lock().clone()
    }
}

impl BackendResolver for FakeResolver {
    fn resolve(&self, choice: &BackendChoice) -> Result<ResolvedBackend> {
        self.resolved.lock().push(choice.label());
        self.backend
            .clone()
            .ok_or_else(|| Error::backend_init("Invalid OpenAI API key"))
    }
}

/// Chat and profile store whose every call fails
pub struct FailingStore {
    reason: &'static str,
}

impl FailingStore {
    pub fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl ChatStore for FailingStore {
    async fn append_turn(&self, _user_id: &str, _document_id: &str, _turn: &Turn) -> Result<()> {
        Err(Error::storage(self.reason))
    }

    async fn list_turns(&self, _user_id: &str, _document_id: &str) -> Result<Vec<Turn>> {
        Err(Error::storage(self.reason))
    }
}

#[async_trait]
impl ProfileStore for FailingStore {
    async fn has_active_membership(&self, _user_id: &str) -> Result<bool> {
        Err(Error::storage(self.reason))
    }

    async fn set_membership(&self, _user_id: &str, _active: bool) -> Result<()> {
        Err(Error::storage(self.reason))
    }
}
