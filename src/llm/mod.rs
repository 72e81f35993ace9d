//! LLM provider clients with complexity-aware routing.
//!
//! This module provides a unified interface over four LLM backends (local
//! Ollama, Anthropic, OpenAI, Google Gemini) and a [`Router`] that tries them
//! in a complexity-dependent order with retry and fallback.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medroute_core::llm::{
//!     ClientConfig, CompletionRequest, OllamaClient, ProviderBinding, ProviderRegistry, Router,
//! };
//!
//! let ollama = OllamaClient::new(ClientConfig::local())?;
//! let registry = ProviderRegistry::new()
//!     .with_binding(ProviderBinding::new("ollama", Arc::new(ollama)));
//! let router = Router::new(registry);
//!
//! let mut request = CompletionRequest::new("Summarize the last three visits");
//! let response = router.route(&mut request, Some("patient_summary"), None).await?;
//! println!("{} answered: {}", response.provider, response.content);
//! ```

mod client;
#[cfg(test)]
pub(crate) mod mock;
mod proptest;
mod registry;
mod retry;
mod router;
mod types;

pub use client::{
    AnthropicClient, ClientConfig, GoogleClient, LLMClient, OllamaClient, OpenAIClient,
};
pub use registry::{ProviderBinding, ProviderRegistry};
pub use retry::RetryPolicy;
pub use router::{Router, RoutingStrategy, RoutingTable};
pub use types::{Backend, CompletionRequest, CompletionResponse, TaskComplexity};
