//! Build a [`Router`] from [`Settings`].

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::llm::{
    AnthropicClient, ClientConfig, GoogleClient, LLMClient, OllamaClient, OpenAIClient,
    ProviderBinding, ProviderRegistry, Router,
};

/// Token ceiling applied to Gemini regardless of the configured default.
pub const GEMINI_MAX_TOKENS: u32 = 2048;

/// Create a router with every enabled backend that can be constructed.
///
/// The registry always declares `ollama`, `claude`, `gpt-5`, `gpt-5-mini`
/// and `gemini` in that order; identities whose client is disabled or has
/// no API key stay unconfigured. `gpt-5-mini` shares the OpenAI client.
///
/// Fails with [`Error::Config`] when no backend could be built at all.
pub fn create_router(settings: &Settings) -> Result<Router> {
    let toggles = &settings.providers;

    let ollama = if toggles.ollama {
        build("Ollama", || {
            OllamaClient::new(
                base_config(settings)
                    .with_base_url(settings.ollama_base_url.as_str())
                    .with_default_model(settings.ollama_model.as_str()),
            )
        })
    } else {
        None
    };

    let claude = match settings.anthropic_key() {
        Some(key) if toggles.claude => build("Claude", || {
            AnthropicClient::new(
                base_config(settings)
                    .with_api_key(key)
                    .with_default_model(settings.claude_model.as_str()),
            )
        }),
        _ => None,
    };

    let openai = match settings.openai_key() {
        Some(key) if toggles.openai => build("OpenAI", || {
            OpenAIClient::new(
                base_config(settings)
                    .with_api_key(key)
                    .with_default_model(settings.openai_model.as_str()),
            )
        }),
        _ => None,
    };

    let gemini = match settings.google_key() {
        Some(key) if toggles.gemini => build("Gemini", || {
            GoogleClient::new(
                base_config(settings)
                    .with_api_key(key)
                    .with_default_model(settings.gemini_model.as_str())
                    .with_max_tokens(GEMINI_MAX_TOKENS),
            )
        }),
        _ => None,
    };

    let registry = ProviderRegistry::new()
        .with_entry("ollama", ollama.map(|c| ProviderBinding::new("ollama", c)))
        .with_entry("claude", claude.map(|c| ProviderBinding::new("claude", c)))
        .with_entry(
            "gpt-5",
            openai.clone().map(|c| ProviderBinding::new("gpt-5", c)),
        )
        .with_entry(
            "gpt-5-mini",
            openai.map(|c| {
                ProviderBinding::new("gpt-5-mini", c)
                    .with_model(settings.openai_mini_model.as_str())
            }),
        )
        .with_entry("gemini", gemini.map(|c| ProviderBinding::new("gemini", c)));

    if registry.configured().is_empty() {
        error!("No AI clients could be initialized");
        return Err(Error::Config(
            "Failed to initialize any AI providers. Check configuration and API keys.".to_string(),
        ));
    }

    let router = Router::new(registry)
        .with_strategy(settings.routing_strategy)
        .with_fallback(settings.enable_fallback)
        .with_retry_policy(settings.retry_policy());

    info!(
        providers = ?router.get_available_providers(),
        strategy = %settings.routing_strategy,
        fallback = settings.enable_fallback,
        "Router created"
    );

    Ok(router)
}

fn base_config(settings: &Settings) -> ClientConfig {
    ClientConfig::local()
        .with_timeout(settings.timeout_secs)
        .with_temperature(settings.temperature)
        .with_max_tokens(settings.max_tokens)
}

fn build<C, F>(label: &str, construct: F) -> Option<Arc<dyn LLMClient>>
where
    C: LLMClient + std::fmt::Display + 'static,
    F: FnOnce() -> Result<C>,
{
    match construct() {
        Ok(client) => {
            info!(client = %client, "{} client initialized", label);
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!(error = %e, "Failed to initialize {} client", label);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderToggles;
    use crate::llm::{Backend, RoutingStrategy};
    use pretty_assertions::assert_eq;

    fn all_keys() -> Settings {
        Settings {
            anthropic_api_key: Some("sk-ant".into()),
            openai_api_key: Some("sk-openai".into()),
            google_api_key: Some("g-key".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn test_no_providers_is_fatal() {
        let settings = Settings {
            providers: ProviderToggles {
                ollama: false,
                ..ProviderToggles::default()
            },
            ..Settings::default()
        };

        let err = create_router(&settings).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Failed to initialize any AI providers"));
    }

    #[test]
    fn test_local_only_router() {
        let router = create_router(&Settings::default()).unwrap();

        assert_eq!(router.get_available_providers(), vec!["ollama"]);
        let declared: Vec<&str> = router.registry().iter().map(|(id, _)| id).collect();
        assert_eq!(declared, vec!["ollama", "claude", "gpt-5", "gpt-5-mini", "gemini"]);
        assert_eq!(router.to_string(), "Router(strategy=smart, providers=[ollama])");
    }

    #[test]
    fn test_all_providers_configured() {
        let router = create_router(&all_keys()).unwrap();

        assert_eq!(
            router.get_available_providers(),
            vec!["ollama", "claude", "gpt-5", "gpt-5-mini", "gemini"]
        );

        let registry = router.registry();
        let full = registry.get("gpt-5").unwrap();
        let mini = registry.get("gpt-5-mini").unwrap();
        assert!(Arc::ptr_eq(full.client(), mini.client()));
        assert_eq!(full.model(), "gpt-5");
        assert_eq!(mini.model(), "gpt-5-mini");
        assert_eq!(registry.get("gemini").unwrap().client().backend(), Backend::Google);
    }

    #[test]
    fn test_blank_key_and_disabled_toggle_leave_unconfigured() {
        let settings = Settings {
            anthropic_api_key: Some("  ".into()),
            providers: ProviderToggles {
                gemini: false,
                ..ProviderToggles::default()
            },
            ..all_keys()
        };

        let router = create_router(&settings).unwrap();
        assert_eq!(
            router.get_available_providers(),
            vec!["ollama", "gpt-5", "gpt-5-mini"]
        );
        assert!(router.registry().contains("claude"));
    }

    #[test]
    fn test_router_takes_settings_knobs() {
        let settings = Settings {
            enable_fallback: false,
            routing_strategy: RoutingStrategy::Manual,
            max_retries: 1,
            ..Settings::default()
        };

        let router = create_router(&settings).unwrap();
        assert!(!router.fallback_enabled());
        assert_eq!(router.strategy(), RoutingStrategy::Manual);
    }
}
