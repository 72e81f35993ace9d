//! LLM types for requests, responses, and task classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vendor backend behind a provider client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Local Ollama server
    Ollama,
    Anthropic,
    OpenAI,
    Google,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
            Self::Google => write!(f, "google"),
        }
    }
}

/// Complexity tier of a clinical task; drives which providers are tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    /// Summaries and basic statistics
    Simple,
    /// Analysis that does not drive a clinical decision
    #[default]
    Moderate,
    /// Critical clinical decisions
    Complex,
}

impl TaskComplexity {
    /// Classify a task identifier. Unknown identifiers are `Moderate`.
    pub fn classify(task_type: &str) -> Self {
        match task_type {
            "patient_summary" | "basic_stats" | "recent_visits" => TaskComplexity::Simple,
            "lab_trend_analysis" | "medication_adherence" | "visit_patterns" => {
                TaskComplexity::Moderate
            }
            "differential_diagnosis"
            | "treatment_planning"
            | "drug_interactions"
            | "risk_stratification" => TaskComplexity::Complex,
            _ => TaskComplexity::Moderate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion request routed to a provider chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,
    /// System instructions
    pub system: Option<String>,
    /// Temperature (0.0 - 1.0); the client default applies when unset
    pub temperature: Option<f64>,
    /// Maximum tokens to generate; the client default applies when unset
    pub max_tokens: Option<u32>,
    /// Complexity tier, overwritten by the router when a task type is given
    pub complexity: TaskComplexity,
    /// Metadata for tracking
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Normalized response from whichever provider answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,
    /// Concrete model that produced the content
    pub model: String,
    /// Provider identity that answered
    pub provider: String,
    /// Total tokens, when the backend reports usage
    pub tokens_used: Option<u64>,
    /// Wall-clock latency of the network call
    pub latency_ms: Option<f64>,
    /// Provider-specific extras (stop reason, raw id, token breakdown)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Response timestamp
    pub created_at: DateTime<Utc>,
}

impl CompletionResponse {
    pub fn new(
        content: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            provider: provider.into(),
            tokens_used: None,
            latency_ms: None,
            metadata: serde_json::Map::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tokens_used(mut self, tokens: Option<u64>) -> Self {
        self.tokens_used = tokens;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Insert a metadata entry; `None` values are stored as JSON null.
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
