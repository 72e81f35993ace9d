//! Error types for medroute-core.

use thiserror::Error;

/// Result type alias using medroute-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Provider identity attached to the aggregate failure of a whole chain.
pub const ROUTER_PROVIDER: &str = "router";

/// Errors that can occur while routing a request to LLM providers.
#[derive(Error, Debug)]
pub enum Error {
    /// A single provider call exceeded its time budget.
    #[error("{provider}: request timed out after {duration_ms}ms")]
    Timeout { provider: String, duration_ms: u64 },

    /// The backend answered with a failure or could not be talked to.
    #[error("{provider}: {message}{}", status_suffix(.status_code))]
    Provider {
        provider: String,
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider in the chain has no configured client.
    #[error("Provider '{provider}' not configured")]
    NotConfigured { provider: String },

    /// Every provider in the resolved chain failed.
    #[error("{}: All providers failed. Errors: {}", ROUTER_PROVIDER, .failures.join("; "))]
    Exhausted { failures: Vec<String> },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl Error {
    /// Create a timeout error.
    pub fn timeout(provider: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            provider: provider.into(),
            duration_ms,
        }
    }

    /// Create a provider error without status or source.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a provider error carrying the upstream HTTP status.
    pub fn provider_status(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code: Some(status_code),
            source: None,
        }
    }

    /// Create a provider error wrapping the original error.
    pub fn provider_with_source(
        provider: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-configured error.
    pub fn not_configured(provider: impl Into<String>) -> Self {
        Self::NotConfigured {
            provider: provider.into(),
        }
    }

    /// Transient failures that the retry wrapper may attempt again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Provider { .. })
    }

    /// Failures that count as "this provider failed" inside a fallback chain.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Provider { .. } | Self::NotConfigured { .. }
        )
    }

    /// Provider identity the error is attributed to, if any.
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Self::Timeout { provider, .. }
            | Self::Provider { provider, .. }
            | Self::NotConfigured { provider } => Some(provider),
            Self::Exhausted { .. } => Some(ROUTER_PROVIDER),
            _ => None,
        }
    }

    /// Re-attribute a per-call failure to a routing identity.
    ///
    /// Clients report their backend label; the router reports the name the
    /// provider was registered under (`gpt-5-mini` rather than `openai`).
    pub fn attributed_to(self, identity: &str) -> Self {
        match self {
            Self::Timeout { duration_ms, .. } => Self::Timeout {
                provider: identity.to_string(),
                duration_ms,
            },
            Self::Provider {
                message,
                status_code,
                source,
                ..
            } => Self::Provider {
                provider: identity.to_string(),
                message,
                status_code,
                source,
            },
            other => other,
        }
    }

    /// Upstream HTTP status code, when the backend reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::error::Error as _;

    #[test]
    fn test_provider_error_display_with_status() {
        let err = Error::provider_status("claude", "Claude API error: overloaded", 529);
        assert_eq!(err.to_string(), "claude: Claude API error: overloaded (HTTP 529)");
        assert_eq!(err.status_code(), Some(529));
    }

    #[test]
    fn test_provider_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::provider_with_source("ollama", "Ollama connection error", io);
        assert_eq!(err.to_string(), "ollama: Ollama connection error");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_retry_classification() {
        assert!(Error::timeout("gemini", 120_000).is_retryable());
        assert!(Error::provider("gpt-5", "boom").is_retryable());
        assert!(!Error::not_configured("gemini").is_retryable());
        assert!(!Error::Config("missing key".into()).is_retryable());
        assert!(!Error::Internal("bug".into()).is_retryable());

        assert!(Error::not_configured("gemini").is_provider_failure());
        assert!(!Error::Internal("bug".into()).is_provider_failure());
    }

    #[test]
    fn test_attributed_to_rewrites_provider_only() {
        let err = Error::provider_status("openai", "OpenAI API error: rate limited", 429)
            .attributed_to("gpt-5-mini");
        assert_eq!(
            err.to_string(),
            "gpt-5-mini: OpenAI API error: rate limited (HTTP 429)"
        );

        let err = Error::timeout("google", 120_000).attributed_to("gemini");
        assert_eq!(err.provider_name(), Some("gemini"));

        let err = Error::Config("bad".into()).attributed_to("claude");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_exhausted_is_attributed_to_router() {
        let err = Error::Exhausted {
            failures: vec!["claude: down".into(), "gpt-5: down".into()],
        };
        assert_eq!(err.provider_name(), Some("router"));
        assert_eq!(
            err.to_string(),
            "router: All providers failed. Errors: claude: down; gpt-5: down"
        );
    }
}
