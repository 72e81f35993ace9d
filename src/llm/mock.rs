//! Scripted in-memory client used by the routing tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

use super::client::LLMClient;
use super::types::{Backend, CompletionRequest, CompletionResponse};

/// One scripted answer to `complete`.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Timeout,
    Fail(String),
    Fatal(String),
}

/// Scripted answer to `health_check`.
#[derive(Debug, Clone, Copy)]
pub enum Health {
    Up,
    Down,
    Error,
    Panic,
}

/// Mock client that replays a queue of steps and records what it was asked.
///
/// Once the queue is empty every call succeeds with `"mock response"`.
#[derive(Debug, Clone)]
pub struct MockClient {
    label: &'static str,
    backend: Backend,
    model: String,
    steps: Arc<Mutex<VecDeque<Step>>>,
    health: Health,
    calls: Arc<AtomicUsize>,
    models_seen: Arc<Mutex<Vec<String>>>,
}

impl MockClient {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            backend: Backend::Ollama,
            model: format!("{}-model", label),
            steps: Arc::new(Mutex::new(VecDeque::new())),
            health: Health::Up,
            calls: Arc::new(AtomicUsize::new(0)),
            models_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_steps(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.lock().unwrap().extend(steps);
        self
    }

    /// Fail every call with a retryable provider error.
    pub fn always_failing(self, message: &str) -> Self {
        let steps = (0..32).map(|_| Step::Fail(message.to_string()));
        self.with_steps(steps)
    }

    pub fn with_health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn models_seen(&self) -> Vec<String> {
        self.models_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for MockClient {
    async fn complete(
        &self,
        _request: &CompletionRequest,
        model: Option<&str>,
    ) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let model = model.unwrap_or(&self.model).to_string();
        self.models_seen.lock().unwrap().push(model.clone());

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(CompletionResponse::new("mock response", model, self.label)),
            Some(Step::Reply(content)) => Ok(CompletionResponse::new(content, model, self.label)),
            Some(Step::Timeout) => Err(Error::timeout(self.label, 120_000)),
            Some(Step::Fail(message)) => Err(Error::provider(self.label, message)),
            Some(Step::Fatal(message)) => Err(Error::Internal(message)),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self.health {
            Health::Up => Ok(true),
            Health::Down => Ok(false),
            Health::Error => Err(Error::provider(self.label, "probe exploded")),
            Health::Panic => panic!("health probe panicked"),
        }
    }

    async fn list_models(&self) -> Vec<String> {
        vec![self.model.clone()]
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
