//! Complexity-aware router with retry and cross-provider fallback.
//!
//! Routes a request through an ordered provider chain:
//! - classify the task type into a [`TaskComplexity`] tier
//! - resolve the tier (plus an optional preferred provider) into a chain
//! - try each provider in order under the [`RetryPolicy`]
//! - return the first success, or an aggregate error once the chain is spent
//!
//! # Default chains
//!
//! | tier     | chain                                   |
//! |----------|-----------------------------------------|
//! | simple   | `ollama`                                |
//! | moderate | `ollama`, `gpt-5-mini`                  |
//! | complex  | `claude`, `gpt-5`, `gemini`, `ollama`   |

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::registry::ProviderRegistry;
use super::retry::RetryPolicy;
use super::types::{CompletionRequest, CompletionResponse, TaskComplexity};

/// How the router orders providers.
///
/// Only `Smart` ordering is applied; the other names are accepted so that
/// existing configuration keeps parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Complexity-tier chains
    #[default]
    Smart,
    Manual,
    RoundRobin,
}

impl RoutingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Manual => "manual",
            Self::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(Self::Smart),
            "manual" => Ok(Self::Manual),
            "round_robin" | "round-robin" => Ok(Self::RoundRobin),
            other => Err(Error::Config(format!("Unknown routing strategy: {}", other))),
        }
    }
}

/// Tier to provider-chain table.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTable {
    chains: HashMap<TaskComplexity, Vec<String>>,
    default_provider: String,
}

impl RoutingTable {
    /// Empty table; every tier resolves to `[default_provider]` until set.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            chains: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn with_chain<I, S>(mut self, tier: TaskComplexity, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chain: Vec<String> = chain.into_iter().map(Into::into).collect();
        if chain.is_empty() {
            self.chains.remove(&tier);
        } else {
            self.chains.insert(tier, chain);
        }
        self
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Standard chain for `tier`; never empty.
    pub fn chain(&self, tier: TaskComplexity) -> Vec<String> {
        self.chains
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| vec![self.default_provider.clone()])
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new("ollama")
            .with_chain(TaskComplexity::Simple, ["ollama"])
            .with_chain(TaskComplexity::Moderate, ["ollama", "gpt-5-mini"])
            .with_chain(TaskComplexity::Complex, ["claude", "gpt-5", "gemini", "ollama"])
    }
}

/// Router over a fixed provider registry.
///
/// Holds no per-call state; share it behind an `Arc` across tasks.
#[derive(Debug, Clone)]
pub struct Router {
    registry: ProviderRegistry,
    table: RoutingTable,
    retry: RetryPolicy,
    strategy: RoutingStrategy,
    enable_fallback: bool,
}

impl Router {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            table: RoutingTable::default(),
            retry: RetryPolicy::default(),
            strategy: RoutingStrategy::default(),
            enable_fallback: true,
        }
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.enable_fallback = enabled;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_routing_table(mut self, table: RoutingTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    pub fn fallback_enabled(&self) -> bool {
        self.enable_fallback
    }

    /// Ordered provider identities to try for `tier`.
    ///
    /// A registered `preferred` identity (configured or not) moves to the
    /// front and is dropped from its standard position.
    pub fn resolve_chain(&self, tier: TaskComplexity, preferred: Option<&str>) -> Vec<String> {
        let standard = self.table.chain(tier);

        match preferred {
            Some(preferred) if self.registry.contains(preferred) => {
                let mut chain = Vec::with_capacity(standard.len() + 1);
                chain.push(preferred.to_string());
                chain.extend(standard.into_iter().filter(|id| id != preferred));
                chain
            }
            _ => standard,
        }
    }

    /// Route a request to the first provider in its chain that answers.
    ///
    /// When `task_type` is given, `request.complexity` is overwritten with
    /// its classification before the chain is resolved.
    pub async fn route(
        &self,
        request: &mut CompletionRequest,
        task_type: Option<&str>,
        preferred: Option<&str>,
    ) -> Result<CompletionResponse> {
        let span = info_span!(
            "route",
            request_id = %Uuid::new_v4(),
            task_type = task_type.unwrap_or("-"),
        );
        self.route_inner(request, task_type, preferred)
            .instrument(span)
            .await
    }

    async fn route_inner(
        &self,
        request: &mut CompletionRequest,
        task_type: Option<&str>,
        preferred: Option<&str>,
    ) -> Result<CompletionResponse> {
        if let Some(task_type) = task_type {
            request.complexity = TaskComplexity::classify(task_type);
        }
        let request: &CompletionRequest = request;
        let complexity = request.complexity;

        let chain = self.resolve_chain(complexity, preferred);
        info!(%complexity, ?chain, "Routing request");

        let mut failures = Vec::new();

        for identity in &chain {
            let outcome = match self.registry.get(identity) {
                Some(binding) => binding.complete_with_retry(request, &self.retry).await,
                None => Err(Error::not_configured(identity.as_str())),
            };

            match outcome {
                Ok(response) => {
                    info!(
                        provider = %identity,
                        model = %response.model,
                        latency_ms = response.latency_ms.unwrap_or_default(),
                        tokens = response.tokens_used.unwrap_or_default(),
                        "Request completed"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_provider_failure() => {
                    warn!(provider = %identity, %complexity, error = %e, "Provider failed");

                    if !self.enable_fallback {
                        return Err(e);
                    }

                    let entry = match e {
                        Error::NotConfigured { .. } => format!("{}: {}", identity, e),
                        _ => e.to_string(),
                    };
                    failures.push(entry);
                    debug!(remaining = chain.len() - failures.len(), "Falling back");
                }
                Err(e) => return Err(e),
            }
        }

        error!(%complexity, attempted = failures.len(), "All providers failed");
        Err(Error::Exhausted { failures })
    }

    /// Probe every registered provider concurrently.
    ///
    /// Unconfigured entries report `false` without a probe. A probe that
    /// errors or panics reports `false` and does not affect the others.
    pub async fn health_check_all(&self) -> BTreeMap<String, bool> {
        let probes = self.registry.iter().map(|(identity, binding)| async move {
            let healthy = match binding {
                None => false,
                Some(binding) => {
                    match AssertUnwindSafe(binding.client().health_check())
                        .catch_unwind()
                        .await
                    {
                        Ok(Ok(healthy)) => healthy,
                        Ok(Err(e)) => {
                            error!(provider = identity, error = %e, "Health check failed");
                            false
                        }
                        Err(_) => {
                            error!(provider = identity, "Health check panicked");
                            false
                        }
                    }
                }
            };
            (identity.to_string(), healthy)
        });

        let results: BTreeMap<String, bool> = join_all(probes).await.into_iter().collect();
        info!(?results, "Health check results");
        results
    }

    /// Configured provider identities in registration order.
    pub fn get_available_providers(&self) -> Vec<String> {
        self.registry.configured()
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Router(strategy={}, providers=[{}])",
            self.strategy,
            self.get_available_providers().join(", ")
        )
    }
}
