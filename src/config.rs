//! Router settings: API keys, model names, retry and fallback knobs.
//!
//! Settings come from the environment ([`Settings::from_env`]), from JSON
//! ([`Settings::from_json`], [`Settings::from_file`]) or are built in code.
//! Missing fields take their defaults; unparsable environment values are
//! ignored in favour of the default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};
use crate::llm::{RetryPolicy, RoutingStrategy};

/// Per-backend enable switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderToggles {
    pub ollama: bool,
    pub claude: bool,
    pub openai: bool,
    pub gemini: bool,
}

impl Default for ProviderToggles {
    fn default() -> Self {
        Self {
            ollama: true,
            claude: true,
            openai: true,
            gemini: true,
        }
    }
}

/// Configuration consumed by [`crate::factory::create_router`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,

    pub ollama_base_url: String,
    pub ollama_model: String,
    pub claude_model: String,
    pub openai_model: String,
    /// Model behind the `gpt-5-mini` identity (shares the OpenAI client)
    pub openai_mini_model: String,
    pub gemini_model: String,

    pub routing_strategy: RoutingStrategy,
    pub enable_fallback: bool,
    /// Attempts per provider, including the first
    pub max_retries: u32,
    /// Per-request timeout for hosted backends
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,

    pub retry_delay_multiplier: f64,
    pub retry_delay_min_secs: f64,
    pub retry_delay_max_secs: f64,

    pub providers: ProviderToggles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            google_api_key: None,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "gemma:7b".to_string(),
            claude_model: "claude-3-5-sonnet-20241022".to_string(),
            openai_model: "gpt-5".to_string(),
            openai_mini_model: "gpt-5-mini".to_string(),
            gemini_model: "gemini-2.5-pro".to_string(),
            routing_strategy: RoutingStrategy::Smart,
            enable_fallback: true,
            max_retries: 3,
            timeout_secs: 120,
            temperature: 0.5,
            max_tokens: 4096,
            retry_delay_multiplier: 1.0,
            retry_delay_min_secs: 1.0,
            retry_delay_max_secs: 10.0,
            providers: ProviderToggles::default(),
        }
    }
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            openai_api_key: lookup("OPENAI_API_KEY"),
            google_api_key: lookup("GOOGLE_API_KEY"),
            ollama_base_url: string("OLLAMA_BASE_URL", defaults.ollama_base_url),
            ollama_model: string("OLLAMA_MODEL", defaults.ollama_model),
            claude_model: string("CLAUDE_MODEL", defaults.claude_model),
            openai_model: string("OPENAI_MODEL", defaults.openai_model),
            openai_mini_model: string("OPENAI_MINI_MODEL", defaults.openai_mini_model),
            gemini_model: string("GEMINI_MODEL", defaults.gemini_model),
            routing_strategy: lookup("AI_ROUTING_STRATEGY")
                .and_then(|s| match s.parse() {
                    Ok(strategy) => Some(strategy),
                    Err(e) => {
                        warn!(error = %e, "Ignoring AI_ROUTING_STRATEGY");
                        None
                    }
                })
                .unwrap_or(defaults.routing_strategy),
            enable_fallback: lookup("AI_ENABLE_FALLBACK")
                .map(|s| truthy(&s))
                .unwrap_or(defaults.enable_fallback),
            max_retries: parsed(&lookup, "AI_MAX_RETRIES", defaults.max_retries),
            timeout_secs: parsed(&lookup, "AI_TIMEOUT", defaults.timeout_secs),
            temperature: parsed(&lookup, "AI_TEMPERATURE", defaults.temperature),
            max_tokens: parsed(&lookup, "AI_MAX_TOKENS", defaults.max_tokens),
            retry_delay_multiplier: parsed(
                &lookup,
                "AI_RETRY_DELAY_MULTIPLIER",
                defaults.retry_delay_multiplier,
            ),
            retry_delay_min_secs: parsed(
                &lookup,
                "AI_RETRY_DELAY_MIN",
                defaults.retry_delay_min_secs,
            ),
            retry_delay_max_secs: parsed(
                &lookup,
                "AI_RETRY_DELAY_MAX",
                defaults.retry_delay_max_secs,
            ),
            providers: defaults.providers,
        }
    }

    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read settings file {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn anthropic_key(&self) -> Option<&str> {
        non_blank(self.anthropic_api_key.as_deref())
    }

    pub fn openai_key(&self) -> Option<&str> {
        non_blank(self.openai_api_key.as_deref())
    }

    pub fn google_key(&self) -> Option<&str> {
        non_blank(self.google_api_key.as_deref())
    }

    /// Whether any hosted-provider key is set.
    pub fn has_ai_keys(&self) -> bool {
        self.anthropic_key().is_some() || self.openai_key().is_some() || self.google_key().is_some()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries.max(1))
            .with_multiplier(self.retry_delay_multiplier)
            .with_delay_bounds(
                secs(self.retry_delay_min_secs),
                secs(self.retry_delay_max_secs),
            )
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    }
}

fn truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert!(!settings.has_ai_keys());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("OLLAMA_MODEL", "qwen2.5:7b"),
            ("AI_ROUTING_STRATEGY", "round_robin"),
            ("AI_ENABLE_FALLBACK", "false"),
            ("AI_MAX_RETRIES", "5"),
            ("AI_TIMEOUT", "30"),
            ("AI_TEMPERATURE", "0.2"),
        ]));

        assert_eq!(settings.anthropic_key(), Some("sk-ant"));
        assert_eq!(settings.ollama_model, "qwen2.5:7b");
        assert_eq!(settings.routing_strategy, RoutingStrategy::RoundRobin);
        assert!(!settings.enable_fallback);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.temperature, 0.2);
        assert!(settings.has_ai_keys());
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("AI_MAX_RETRIES", "many"),
            ("AI_ROUTING_STRATEGY", "fastest"),
            ("AI_ENABLE_FALLBACK", "yes"),
        ]));

        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.routing_strategy, RoutingStrategy::Smart);
        assert!(settings.enable_fallback);
    }

    #[test]
    fn test_blank_keys_count_as_absent() {
        let settings = Settings {
            openai_api_key: Some("   ".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.openai_key(), None);
        assert!(!settings.has_ai_keys());
    }

    #[test]
    fn test_from_json_defaults_missing_fields() {
        let settings = Settings::from_json(
            r#"{"google_api_key": "g-key", "providers": {"claude": false}}"#,
        )
        .unwrap();

        assert_eq!(settings.google_key(), Some("g-key"));
        assert!(!settings.providers.claude);
        assert!(settings.providers.ollama);
        assert_eq!(settings.gemini_model, "gemini-2.5-pro");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"enable_fallback": false, "max_retries": 2}}"#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert!(!settings.enable_fallback);
        assert_eq!(settings.max_retries, 2);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(Settings::from_file(missing), Err(Error::Config(_))));
    }

    #[test]
    fn test_fallback_switch_accepts_common_false_spellings() {
        for value in ["0", "false", "FALSE", "no", "off", " Off "] {
            let settings = Settings::from_lookup(lookup_from(&[("AI_ENABLE_FALLBACK", value)]));
            assert!(!settings.enable_fallback, "{:?} should disable fallback", value);
        }
        for value in ["1", "true", "on", "yes"] {
            let settings = Settings::from_lookup(lookup_from(&[("AI_ENABLE_FALLBACK", value)]));
            assert!(settings.enable_fallback, "{:?} should enable fallback", value);
        }
    }

    #[test]
    fn test_huge_retry_delay_does_not_panic() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("AI_RETRY_DELAY_MAX", "1e30"),
            ("AI_RETRY_DELAY_MULTIPLIER", "1e30"),
            ("AI_TIMEOUT", "18446744073709551615"),
        ]));
        let policy = settings.retry_policy();

        assert_eq!(policy.max_delay, Duration::MAX);
        assert_eq!(policy.backoff_for_attempt(3), Duration::MAX);
        assert!(crate::factory::create_router(&settings).is_ok());

        let from_json = Settings::from_json(r#"{"retry_delay_max_secs": 1e300}"#).unwrap();
        assert_eq!(from_json.retry_policy().max_delay, Duration::MAX);
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let settings = Settings {
            max_retries: 4,
            retry_delay_multiplier: 2.0,
            retry_delay_min_secs: 0.5,
            retry_delay_max_secs: 6.0,
            ..Settings::default()
        };
        let policy = settings.retry_policy();

        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(6));
        assert_eq!(Settings::default().retry_policy(), RetryPolicy::default());
    }
}
