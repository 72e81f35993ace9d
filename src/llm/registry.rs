//! Provider registry: routing identities bound to shared clients.
//!
//! One client may back several identities. The OpenAI client serves both
//! `gpt-5` and `gpt-5-mini`; each [`ProviderBinding`] carries its own model
//! name and passes it per call, so the client itself is never reconfigured.

use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;

use super::client::LLMClient;
use super::retry::RetryPolicy;
use super::types::{CompletionRequest, CompletionResponse};

/// A routing identity bound to a client and, optionally, a fixed model.
#[derive(Clone)]
pub struct ProviderBinding {
    identity: String,
    client: Arc<dyn LLMClient>,
    model: Option<String>,
}

impl ProviderBinding {
    /// Bind `identity` to `client`, using the client's default model.
    pub fn new(identity: impl Into<String>, client: Arc<dyn LLMClient>) -> Self {
        Self {
            identity: identity.into(),
            client,
            model: None,
        }
    }

    /// Pin the model sent on every call through this binding.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn client(&self) -> &Arc<dyn LLMClient> {
        &self.client
    }

    /// Model this binding asks for.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.client.default_model())
    }

    /// Call the client under `policy`, attributing results to this identity.
    ///
    /// The response's `provider` becomes the identity and the vendor kind is
    /// recorded under the `backend` metadata key.
    pub async fn complete_with_retry(
        &self,
        request: &CompletionRequest,
        policy: &RetryPolicy,
    ) -> Result<CompletionResponse> {
        let client = &self.client;
        let model = self.model.as_deref();
        let identity = self.identity.as_str();

        let mut response = policy
            .execute(identity, request.complexity, || async move {
                client
                    .complete(request, model)
                    .await
                    .map_err(|e| e.attributed_to(identity))
            })
            .await?;

        response.provider = self.identity.clone();
        response
            .metadata
            .insert("backend".to_string(), client.backend().to_string().into());
        Ok(response)
    }
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("identity", &self.identity)
            .field("backend", &self.client.backend())
            .field("model", &self.model())
            .finish()
    }
}

/// Ordered map of routing identity to binding.
///
/// An entry with no binding is declared but unconfigured (for example, a
/// hosted provider whose API key is missing). Read-only once handed to a
/// router.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<(String, Option<ProviderBinding>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configured provider, replacing any entry with the same identity.
    pub fn with_binding(mut self, binding: ProviderBinding) -> Self {
        let identity = binding.identity().to_string();
        self.upsert(identity, Some(binding));
        self
    }

    /// Declare an identity without a client.
    pub fn with_unconfigured(mut self, identity: impl Into<String>) -> Self {
        self.upsert(identity.into(), None);
        self
    }

    /// Add an entry that may or may not be configured.
    pub fn with_entry(
        mut self,
        identity: impl Into<String>,
        binding: Option<ProviderBinding>,
    ) -> Self {
        self.upsert(identity.into(), binding);
        self
    }

    fn upsert(&mut self, identity: String, binding: Option<ProviderBinding>) {
        match self.entries.iter_mut().find(|(id, _)| *id == identity) {
            Some(entry) => entry.1 = binding,
            None => {
                info!(
                    provider = %identity,
                    configured = binding.is_some(),
                    "Registered provider"
                );
                self.entries.push((identity, binding));
            }
        }
    }

    /// Whether `identity` is declared, configured or not.
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.iter().any(|(id, _)| id == identity)
    }

    /// Configured binding for `identity`.
    pub fn get(&self, identity: &str) -> Option<&ProviderBinding> {
        self.entries
            .iter()
            .find(|(id, _)| id == identity)
            .and_then(|(_, binding)| binding.as_ref())
    }

    /// All entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ProviderBinding>)> {
        self.entries
            .iter()
            .map(|(id, binding)| (id.as_str(), binding.as_ref()))
    }

    /// Configured identities in registration order.
    pub fn configured(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, binding)| binding.is_some())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
