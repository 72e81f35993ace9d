//! # medroute-core
//!
//! Complexity-aware routing of clinical LLM requests across local and hosted
//! providers, with bounded retry and cross-provider fallback.
//!
//! ## Core Components
//!
//! - **Clients**: one [`LLMClient`] contract over Ollama, Anthropic, OpenAI and Gemini
//! - **Classification**: task type to [`TaskComplexity`] tier
//! - **Router**: tier to provider chain, retry per provider, first success wins
//! - **Factory**: [`Settings`] to a ready [`Router`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use medroute_core::{create_router, CompletionRequest, Settings};
//!
//! let router = create_router(&Settings::from_env())?;
//!
//! let mut request = CompletionRequest::new("List possible causes of the lab abnormalities")
//!     .with_system("You are a clinical decision support assistant");
//! let response = router
//!     .route(&mut request, Some("differential_diagnosis"), None)
//!     .await?;
//! println!("[{}] {}", response.provider, response.content);
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod llm;

// Re-exports for convenience
pub use config::{ProviderToggles, Settings};
pub use error::{Error, Result};
pub use factory::create_router;
pub use llm::{
    AnthropicClient, Backend, ClientConfig, CompletionRequest, CompletionResponse, GoogleClient,
    LLMClient, OllamaClient, OpenAIClient, ProviderBinding, ProviderRegistry, RetryPolicy, Router,
    RoutingStrategy, RoutingTable, TaskComplexity,
};
