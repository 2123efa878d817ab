//! Outbound provider client implementations.
//!
//! Every client is total: transport failures, non-2xx statuses, and body
//! parse problems all come back as a populated `ProviderResponse`, never as
//! a raised error. Transport-level retry is bounded and applies only to
//! network failures; model-level fallback is the router's job.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use triage_core::config::{AzureConfig, DeploymentConfig, OpenAiConfig, ResilienceConfig};
use triage_core::{Error, ErrorCode, ProviderClient, ProviderRequest, ProviderResponse, Result};

use crate::registry::{SharedCredential, AZURE_PROVIDER, OPENAI_PROVIDER};

/// Bounded transport retry: `max_attempts` total attempts with a fixed
/// pause, retrying only on network-level failures.
#[derive(Debug, Clone)]
struct RetryPolicy {
    max_attempts: u32,
    wait: Duration,
}

impl From<&ResilienceConfig> for RetryPolicy {
    fn from(cfg: &ResilienceConfig) -> Self {
        Self {
            max_attempts: cfg.retry_max_attempts.max(1),
            wait: Duration::from_millis(cfg.retry_wait_ms),
        }
    }
}

async fn send_with_retry<F>(
    build: F,
    policy: &RetryPolicy,
) -> std::result::Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 1u32;
    loop {
        match build().send().await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < policy.max_attempts && (e.is_timeout() || e.is_connect()) => {
                tracing::warn!(attempt, error = %e, "transient transport failure, retrying");
                tokio::time::sleep(policy.wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parse an OpenAI-compatible chat-completions body into a response.
fn parse_chat_completion(body: &str, model: &str, latency_ms: u64) -> ProviderResponse {
    let root: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return ProviderResponse::failure(
                ErrorCode::Parse,
                format!("invalid completion body: {}", e),
            )
            .with_model(model)
            .with_latency(latency_ms);
        }
    };

    let content = root
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str());
    let Some(content) = content else {
        return ProviderResponse::failure(
            ErrorCode::Parse,
            "completion body missing choices[0].message.content",
        )
        .with_model(model)
        .with_latency(latency_ms);
    };

    let usage = |field: &str| {
        root.pointer(&format!("/usage/{}", field))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32
    };
    let (prompt, completion, total) = (
        usage("prompt_tokens"),
        usage("completion_tokens"),
        usage("total_tokens"),
    );

    tracing::debug!(
        model = model,
        prompt_tokens = prompt,
        completion_tokens = completion,
        latency_ms,
        "completion received"
    );

    ProviderResponse::ok(content, model, latency_ms).with_usage(prompt, completion, total)
}

fn chat_body(
    model: Option<&str>,
    system_prompt: &str,
    user_prompt: &str,
    temperature: f64,
    max_tokens: u32,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt },
        ],
        "temperature": temperature,
        "max_tokens": max_tokens,
        "response_format": { "type": "json_object" },
    });
    if let Some(model) = model {
        body["model"] = serde_json::Value::String(model.to_string());
    }
    body
}

// =============================================================================
// OpenAI
// =============================================================================

/// Client for the OpenAI chat-completions API (and API-compatible
/// endpoints).
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    default_model: String,
    default_temperature: f64,
    default_max_tokens: u32,
    credential: SharedCredential,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(cfg: &OpenAiConfig, resilience: &ResilienceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            default_model: cfg.model.clone(),
            default_temperature: cfg.temperature,
            default_max_tokens: cfg.max_tokens,
            credential: SharedCredential::new(cfg.api_key.clone()),
            retry: RetryPolicy::from(resilience),
        })
    }

    /// Handle to the credential, for administrative rotation.
    pub fn credential(&self) -> SharedCredential {
        self.credential.clone()
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn send_chat_completion(&self, request: &ProviderRequest) -> ProviderResponse {
        let started = Instant::now();

        let Some(key) = self.credential.expose().await else {
            return ProviderResponse::failure(
                ErrorCode::NotConfigured,
                "API key not configured for OpenAI",
            );
        };

        let model = request
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model)
            .to_string();
        let temperature = request.temperature.unwrap_or(self.default_temperature);
        let max_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);
        let body = chat_body(
            Some(&model),
            &request.system_prompt,
            &request.user_prompt,
            temperature,
            max_tokens,
        );

        tracing::debug!(model = %model, "sending request to OpenAI");

        let sent = send_with_retry(
            || self.http.post(&self.endpoint).bearer_auth(&key).json(&body),
            &self.retry,
        )
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match sent {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    return ProviderResponse::failure(
                        ErrorCode::Http(status.as_u16()),
                        format!("OpenAI returned status {}", status.as_u16()),
                    )
                    .with_model(&model)
                    .with_latency(latency_ms);
                }
                match response.text().await {
                    Ok(text) => parse_chat_completion(&text, &model, latency_ms),
                    Err(e) => ProviderResponse::failure(ErrorCode::Transport, e.to_string())
                        .with_model(&model)
                        .with_latency(latency_ms),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "OpenAI call failed");
                ProviderResponse::failure(ErrorCode::Transport, e.to_string())
                    .with_model(&model)
                    .with_latency(latency_ms)
            }
        }
    }

    fn name(&self) -> &str {
        OPENAI_PROVIDER
    }

    async fn is_available(&self) -> bool {
        self.credential.is_set().await
    }
}

// =============================================================================
// Azure OpenAI
// =============================================================================

/// Client for Azure OpenAI resources with multiple named deployments.
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    cfg: AzureConfig,
    credential: SharedCredential,
    retry: RetryPolicy,
}

impl AzureOpenAiClient {
    pub fn new(cfg: &AzureConfig, resilience: &ResilienceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            cfg: cfg.clone(),
            credential: SharedCredential::new(cfg.api_key.clone()),
            retry: RetryPolicy::from(resilience),
        })
    }

    /// Handle to the credential, for administrative rotation.
    pub fn credential(&self) -> SharedCredential {
        self.credential.clone()
    }

    fn has_configured_shape(&self) -> bool {
        self.cfg.enabled
            && self
                .cfg
                .resource_name
                .as_deref()
                .is_some_and(|r| !r.is_empty())
            && !self.cfg.deployments.is_empty()
    }

    fn deployment(&self, model: &str) -> Option<&DeploymentConfig> {
        self.cfg.deployments.get(model).filter(|d| d.enabled)
    }
}

#[async_trait]
impl ProviderClient for AzureOpenAiClient {
    async fn send_chat_completion(&self, request: &ProviderRequest) -> ProviderResponse {
        let started = Instant::now();

        if !self.has_configured_shape() {
            return ProviderResponse::failure(
                ErrorCode::NotConfigured,
                "Azure OpenAI is not configured or enabled",
            );
        }
        let Some(key) = self.credential.expose().await else {
            return ProviderResponse::failure(
                ErrorCode::NotConfigured,
                "API key not configured for Azure OpenAI",
            );
        };

        let model = match request.model.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(m) => m.to_string(),
            None => {
                return ProviderResponse::failure(
                    ErrorCode::NoModel,
                    "model id not specified for Azure OpenAI",
                );
            }
        };
        let Some(deployment) = self.deployment(&model) else {
            return ProviderResponse::failure(
                ErrorCode::InvalidModel,
                format!("model '{}' not found or disabled", model),
            )
            .with_model(&model);
        };

        // Parameter precedence: request > deployment > provider default.
        let temperature = request
            .temperature
            .or(deployment.temperature)
            .unwrap_or(self.cfg.default_temperature);
        let max_tokens = request
            .max_tokens
            .or(deployment.max_tokens)
            .unwrap_or(self.cfg.default_max_tokens);

        let endpoint = self.cfg.build_endpoint_url(&deployment.deployment_name);
        // Azure routes by deployment name in the URL; no model field in the body.
        let body = chat_body(
            None,
            &request.system_prompt,
            &request.user_prompt,
            temperature,
            max_tokens,
        );

        tracing::debug!(
            deployment = %deployment.deployment_name,
            model = %model,
            "sending request to Azure OpenAI"
        );

        let sent = send_with_retry(
            || {
                self.http
                    .post(&endpoint)
                    .header("api-key", key.as_str())
                    .json(&body)
            },
            &self.retry,
        )
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match sent {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    return ProviderResponse::failure(
                        ErrorCode::Http(status.as_u16()),
                        format!("Azure OpenAI returned status {}", status.as_u16()),
                    )
                    .with_model(&model)
                    .with_latency(latency_ms);
                }
                match response.text().await {
                    Ok(text) => parse_chat_completion(&text, &model, latency_ms),
                    Err(e) => ProviderResponse::failure(ErrorCode::Transport, e.to_string())
                        .with_model(&model)
                        .with_latency(latency_ms),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Azure OpenAI call failed");
                ProviderResponse::failure(ErrorCode::Transport, e.to_string())
                    .with_model(&model)
                    .with_latency(latency_ms)
            }
        }
    }

    fn name(&self) -> &str {
        AZURE_PROVIDER
    }

    async fn is_available(&self) -> bool {
        self.has_configured_shape() && self.credential.is_set().await
    }
}

// =============================================================================
// Mock client for testing
// =============================================================================

/// Mock provider client for testing without real API calls. Failures can be
/// scripted globally or per model id, which is what the router's fallback
/// path needs.
pub struct MockProviderClient {
    name: String,
    content: String,
    fail_all: bool,
    fail_models: Vec<String>,
    calls: AtomicU64,
}

impl MockProviderClient {
    /// Create a mock that answers every call with `content`.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            fail_all: false,
            fail_models: Vec::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Create a mock that fails every call.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            fail_all: true,
            fail_models: Vec::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Script a failure for one model id only.
    pub fn fail_for_model(mut self, model: impl Into<String>) -> Self {
        self.fail_models.push(model.into());
        self
    }

    /// Number of completion calls received.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    async fn send_chat_completion(&self, request: &ProviderRequest) -> ProviderResponse {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let model = request.model.clone().unwrap_or_default();

        if self.fail_all || self.fail_models.iter().any(|m| *m == model) {
            return ProviderResponse::failure(ErrorCode::Transport, "mock transport failure")
                .with_model(&model);
        }

        ProviderResponse::ok(self.content.clone(), model, 1).with_usage(10, 5, 15)
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        true
    }
}
