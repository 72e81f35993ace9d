//! LLM client trait and provider implementations.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::{Backend, CompletionRequest, CompletionResponse};

/// Uniform contract over one LLM backend.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Complete a prompt.
    ///
    /// `model` overrides the client's default model for this call only.
    /// Failures surface as [`Error::Timeout`] or [`Error::Provider`].
    async fn complete(
        &self,
        request: &CompletionRequest,
        model: Option<&str>,
    ) -> Result<CompletionResponse>;

    /// Cheapest call that proves the backend is reachable.
    ///
    /// Built-in clients report every failure as `Ok(false)`.
    async fn health_check(&self) -> Result<bool>;

    /// List model names; empty when the listing fails.
    async fn list_models(&self) -> Vec<String>;

    /// Get the backend kind for this client.
    fn backend(&self) -> Backend;

    /// Model used when a call does not override it.
    fn default_model(&self) -> &str;
}

/// Configuration for LLM clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key (hosted backends only)
    pub api_key: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Default model
    pub default_model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature used when a request leaves it unset
    pub temperature: f64,
    /// Max tokens used when a request leaves it unset
    pub max_tokens: u32,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: None,
            default_model: None,
            timeout_secs: 120,
            temperature: 0.5,
            max_tokens: 4096,
        }
    }

    /// Configuration for a keyless local server.
    pub fn local() -> Self {
        Self {
            api_key: None,
            base_url: None,
            default_model: None,
            timeout_secs: 60,
            temperature: 0.3,
            max_tokens: 2048,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn require_api_key(&self, vendor: &str, env_var: &str) -> Result<String> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(Error::Config(format!(
                "{} API key required. Set {} or pass it in the client configuration.",
                vendor, env_var
            ))),
        }
    }

    fn temperature_for(&self, request: &CompletionRequest) -> f64 {
        request.temperature.unwrap_or(self.temperature)
    }

    fn max_tokens_for(&self, request: &CompletionRequest) -> u32 {
        request.max_tokens.unwrap_or(self.max_tokens)
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let timeout = Duration::from_secs(timeout_secs);

    // Some sandboxed macOS environments can panic during proxy auto-detection
    // in reqwest's default client builder. Fall back to no-proxy in that case.
    match catch_unwind(AssertUnwindSafe(|| {
        Client::builder().timeout(timeout).build()
    })) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e))),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn timeout_ms(timeout_secs: u64) -> u64 {
    timeout_secs.saturating_mul(1000)
}

/// Translate a transport failure into the timeout / provider split.
fn transport_error(err: reqwest::Error, provider: &str, label: &str, timeout_secs: u64) -> Error {
    if err.is_timeout() {
        Error::timeout(provider, timeout_ms(timeout_secs))
    } else {
        Error::provider_with_source(provider, format!("{} connection error: {}", label, err), err)
    }
}

/// Send a request and read the whole body.
async fn send_request(
    request: RequestBuilder,
    provider: &str,
    label: &str,
    timeout_secs: u64,
) -> Result<(StatusCode, String)> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, provider, label, timeout_secs))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(e, provider, label, timeout_secs))?;

    Ok((status, body))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str, provider: &str, label: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        Error::provider_with_source(provider, format!("Unexpected {} response: {}", label, e), e)
    })
}

// =============================================================================
// Ollama (local)
// =============================================================================

/// Local Ollama server client.
pub struct OllamaClient {
    config: ClientConfig,
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    const DEFAULT_BASE_URL: &'static str = "http://localhost:11434";
    const DEFAULT_MODEL: &'static str = "gemma:7b";
    const PROVIDER: &'static str = "ollama";
    const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
    const LIST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(config.timeout_secs)?;
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let model = config
            .default_model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        Ok(Self {
            config,
            http,
            base_url,
            model,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_tags(&self, timeout: Duration) -> Result<OllamaTagsResponse> {
        let request = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(timeout);
        let (status, body) =
            send_request(request, Self::PROVIDER, "Ollama", timeout.as_secs()).await?;

        if !status.is_success() {
            return Err(Error::provider_status(
                Self::PROVIDER,
                format!("Ollama tags request failed: {}", body),
                status.as_u16(),
            ));
        }
        parse_body(&body, Self::PROVIDER, "Ollama")
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        model: Option<&str>,
    ) -> Result<CompletionResponse> {
        let model = model.unwrap_or(&self.model);
        let start = Instant::now();

        let api_request = OllamaGenerateRequest {
            model,
            prompt: &request.prompt,
            stream: false,
            system: request.system.as_deref(),
            options: OllamaOptions {
                temperature: self.config.temperature_for(request),
                num_predict: self.config.max_tokens_for(request),
            },
        };

        let http_request = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&api_request);
        let (status, body) =
            send_request(http_request, Self::PROVIDER, "Ollama", self.config.timeout_secs).await?;

        if status != StatusCode::OK {
            return Err(Error::provider_status(
                Self::PROVIDER,
                format!("Ollama request failed: {}", body),
                status.as_u16(),
            ));
        }

        let api_response: OllamaGenerateResponse = parse_body(&body, Self::PROVIDER, "Ollama")?;
        let latency_ms = elapsed_ms(start);

        debug!(
            model,
            latency_ms,
            tokens = api_response.eval_count.unwrap_or(0),
            "Ollama completion"
        );

        Ok(CompletionResponse::new(api_response.response, model, Self::PROVIDER)
            .with_tokens_used(api_response.eval_count)
            .with_latency_ms(latency_ms)
            .with_meta("prompt_eval_count", api_response.prompt_eval_count)
            .with_meta("eval_count", api_response.eval_count)
            .with_meta("total_duration", api_response.total_duration))
    }

    async fn health_check(&self) -> Result<bool> {
        let result = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Self::HEALTH_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response.status() == StatusCode::OK),
            Err(e) => {
                warn!(error = %e, "Ollama health check failed");
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        match self.fetch_tags(Self::LIST_TIMEOUT).await {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list Ollama models");
                Vec::new()
            }
        }
    }

    fn backend(&self) -> Backend {
        Backend::Ollama
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OllamaClient(model={}, url={})", self.model, self.base_url)
    }
}

// =============================================================================
// Anthropic
// =============================================================================

/// Anthropic Claude client.
pub struct AnthropicClient {
    config: ClientConfig,
    http: Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    const DEFAULT_MODEL: &'static str = "claude-3-5-sonnet-20241022";
    const API_VERSION: &'static str = "2023-06-01";
    const PROVIDER: &'static str = "anthropic";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let api_key = config.require_api_key("Anthropic", "ANTHROPIC_API_KEY")?;
        let http = build_http_client(config.timeout_secs)?;
        let model = config
            .default_model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        Ok(Self {
            config,
            http,
            api_key,
            model,
        })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    async fn create_message(&self, api_request: &AnthropicRequest<'_>) -> Result<AnthropicResponse> {
        let request = self
            .http
            .post(format!("{}/v1/messages", self.base_url()))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(api_request);
        let (status, body) =
            send_request(request, Self::PROVIDER, "Claude", self.config.timeout_secs).await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<AnthropicError>(&body) {
                Ok(error) => format!(
                    "Claude API error ({}): {}",
                    error.error.error_type, error.error.message
                ),
                Err(_) => format!("Claude API error: {}", body),
            };
            return Err(Error::provider_status(Self::PROVIDER, message, status.as_u16()));
        }

        parse_body(&body, Self::PROVIDER, "Claude")
    }
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        model: Option<&str>,
    ) -> Result<CompletionResponse> {
        let model = model.unwrap_or(&self.model);
        let start = Instant::now();

        let api_request = AnthropicRequest {
            model,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: self.config.max_tokens_for(request),
            system: request.system.as_deref(),
            temperature: Some(self.config.temperature_for(request)),
        };

        let api_response = self.create_message(&api_request).await?;
        let latency_ms = elapsed_ms(start);

        let content = api_response
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        let usage = &api_response.usage;
        let tokens = usage.input_tokens + usage.output_tokens;

        debug!(
            model = %api_response.model,
            latency_ms,
            tokens,
            "Claude completion"
        );

        Ok(
            CompletionResponse::new(content, api_response.model.clone(), Self::PROVIDER)
                .with_tokens_used(Some(tokens))
                .with_latency_ms(latency_ms)
                .with_meta("input_tokens", usage.input_tokens)
                .with_meta("output_tokens", usage.output_tokens)
                .with_meta("stop_reason", api_response.stop_reason.clone())
                .with_meta("id", api_response.id.clone()),
        )
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = AnthropicRequest {
            model: &self.model,
            messages: vec![AnthropicMessage {
                role: "user",
                content: "test",
            }],
            max_tokens: 10,
            system: None,
            temperature: None,
        };

        match self.create_message(&probe).await {
            Ok(response) => Ok(!response.content.is_empty()),
            Err(e) => {
                warn!(error = %e, "Claude health check failed");
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        // No listing endpoint is used; these are the known-good models.
        [
            "claude-3-5-sonnet-20241022",
            "claude-3-opus-20240229",
            "claude-3-sonnet-20240229",
            "claude-3-haiku-20240307",
        ]
        .iter()
        .map(|m| m.to_string())
        .collect()
    }

    fn backend(&self) -> Backend {
        Backend::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for AnthropicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnthropicClient(model={})", self.model)
    }
}

// =============================================================================
// OpenAI
// =============================================================================

/// OpenAI client.
pub struct OpenAIClient {
    config: ClientConfig,
    http: Client,
    api_key: String,
    model: String,
}

impl OpenAIClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";
    const DEFAULT_MODEL: &'static str = "gpt-5";
    const PROVIDER: &'static str = "openai";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let api_key = config.require_api_key("OpenAI", "OPENAI_API_KEY")?;
        let http = build_http_client(config.timeout_secs)?;
        let model = config
            .default_model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        Ok(Self {
            config,
            http,
            api_key,
            model,
        })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn api_error(status: StatusCode, body: &str) -> Error {
        let message = match serde_json::from_str::<OpenAIError>(body) {
            Ok(error) => format!("OpenAI API error: {}", error.error.message),
            Err(_) => format!("OpenAI API error: {}", body),
        };
        Error::provider_status(Self::PROVIDER, message, status.as_u16())
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_completion_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    id: String,
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIModelList {
    #[serde(default)]
    data: Vec<Value>,
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        model: Option<&str>,
    ) -> Result<CompletionResponse> {
        let model = model.unwrap_or(&self.model);
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(OpenAIMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(OpenAIMessage {
            role: "user",
            content: &request.prompt,
        });

        let api_request = OpenAIRequest {
            model,
            messages,
            max_completion_tokens: self.config.max_tokens_for(request),
            temperature: self.config.temperature_for(request),
        };

        let http_request = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url()))
            .bearer_auth(&self.api_key)
            .json(&api_request);
        let (status, body) =
            send_request(http_request, Self::PROVIDER, "OpenAI", self.config.timeout_secs).await?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        let api_response: OpenAIResponse = parse_body(&body, Self::PROVIDER, "OpenAI")?;
        let latency_ms = elapsed_ms(start);

        let choice = api_response
            .choices
            .first()
            .ok_or_else(|| Error::provider(Self::PROVIDER, "OpenAI response had no choices"))?;
        let content = choice.message.content.clone().unwrap_or_default();
        let usage = api_response.usage.as_ref();

        debug!(
            model = %api_response.model,
            latency_ms,
            tokens = usage.map_or(0, |u| u.total_tokens),
            "GPT completion"
        );

        Ok(
            CompletionResponse::new(content, api_response.model.clone(), Self::PROVIDER)
                .with_tokens_used(usage.map(|u| u.total_tokens))
                .with_latency_ms(latency_ms)
                .with_meta("prompt_tokens", usage.map(|u| u.prompt_tokens))
                .with_meta("completion_tokens", usage.map(|u| u.completion_tokens))
                .with_meta("finish_reason", choice.finish_reason.clone())
                .with_meta("id", api_response.id.clone()),
        )
    }

    async fn health_check(&self) -> Result<bool> {
        let request = self
            .http
            .get(format!("{}/v1/models", self.base_url()))
            .bearer_auth(&self.api_key);

        let outcome = match send_request(request, Self::PROVIDER, "OpenAI", self.config.timeout_secs)
            .await
        {
            Ok((status, body)) if status.is_success() => {
                parse_body::<OpenAIModelList>(&body, Self::PROVIDER, "OpenAI")
            }
            Ok((status, body)) => Err(Self::api_error(status, &body)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(models) => Ok(!models.data.is_empty()),
            Err(e) => {
                warn!(error = %e, "OpenAI health check failed");
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        ["gpt-5", "gpt-5-mini", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    fn backend(&self) -> Backend {
        Backend::OpenAI
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for OpenAIClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenAIClient(model={})", self.model)
    }
}

// =============================================================================
// Google Gemini
// =============================================================================

/// Google Gemini client.
pub struct GoogleClient {
    config: ClientConfig,
    http: Client,
    api_key: String,
    model: String,
}

impl GoogleClient {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    const DEFAULT_MODEL: &'static str = "gemini-2.5-pro";
    const PROVIDER: &'static str = "google";

    pub fn new(config: ClientConfig) -> Result<Self> {
        let api_key = config.require_api_key("Google", "GOOGLE_API_KEY")?;
        let http = build_http_client(config.timeout_secs)?;
        let model = config
            .default_model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        Ok(Self {
            config,
            http,
            api_key,
            model,
        })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn api_error(status: StatusCode, body: &str) -> Error {
        let message = match serde_json::from_str::<GeminiError>(body) {
            Ok(error) => format!("Google Gemini API error: {}", error.error.message),
            Err(_) => format!("Google Gemini API error: {}", body),
        };
        Error::provider_status(Self::PROVIDER, message, status.as_u16())
    }

    async fn fetch_models(&self) -> Result<Vec<GeminiModel>> {
        let request = self
            .http
            .get(format!("{}/v1beta/models", self.base_url()))
            .query(&[("key", self.api_key.as_str())]);
        let (status, body) =
            send_request(request, Self::PROVIDER, "Google Gemini", self.config.timeout_secs)
                .await?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }
        let list: GeminiModelList = parse_body(&body, Self::PROVIDER, "Google Gemini")?;
        Ok(list.models)
    }
}

// Google Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[async_trait]
impl LLMClient for GoogleClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        model: Option<&str>,
    ) -> Result<CompletionResponse> {
        let model = model.unwrap_or(&self.model);
        let start = Instant::now();

        // Gemini gets the system prompt folded into the user turn.
        let full_prompt = match request.system.as_deref() {
            Some(system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        let api_request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens_for(request),
                temperature: self.config.temperature_for(request),
            },
        };

        let http_request = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url(),
                model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&api_request);
        let (status, body) = send_request(
            http_request,
            Self::PROVIDER,
            "Google Gemini",
            self.config.timeout_secs,
        )
        .await?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        let api_response: GeminiResponse = parse_body(&body, Self::PROVIDER, "Google Gemini")?;
        let latency_ms = elapsed_ms(start);

        let candidate = api_response.candidates.first().ok_or_else(|| {
            Error::provider(Self::PROVIDER, "Google Gemini response had no candidates")
        })?;
        // Safety or recitation blocks come back as a candidate without parts.
        let content = match candidate.content.as_ref() {
            Some(c) if !c.parts.is_empty() => {
                c.parts.iter().map(|p| p.text.as_str()).collect::<String>()
            }
            _ => {
                return Err(Error::provider(
                    Self::PROVIDER,
                    format!(
                        "Google Gemini returned no content (finish_reason={:?})",
                        candidate.finish_reason
                    ),
                ))
            }
        };
        let usage = api_response.usage_metadata.as_ref();
        let tokens = usage.map(|u| u.prompt_token_count + u.candidates_token_count);

        debug!(model, latency_ms, tokens = tokens.unwrap_or(0), "Gemini completion");

        Ok(CompletionResponse::new(content, model, Self::PROVIDER)
            .with_tokens_used(tokens)
            .with_latency_ms(latency_ms)
            .with_meta("prompt_token_count", usage.map(|u| u.prompt_token_count))
            .with_meta(
                "candidates_token_count",
                usage.map(|u| u.candidates_token_count),
            )
            .with_meta("finish_reason", candidate.finish_reason.clone()))
    }

    async fn health_check(&self) -> Result<bool> {
        match self.fetch_models().await {
            Ok(models) => Ok(!models.is_empty()),
            Err(e) => {
                warn!(error = %e, "Google Gemini health check failed");
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        match self.fetch_models().await {
            Ok(models) => models
                .into_iter()
                .filter(|m| {
                    m.supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
                })
                .map(|m| m.name.trim_start_matches("models/").to_string())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list Google models");
                Vec::new()
            }
        }
    }

    fn backend(&self) -> Backend {
        Backend::Google
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for GoogleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoogleClient(model={})", self.model)
    }
}
