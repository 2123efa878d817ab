//! Application configuration.
//!
//! Layered load: `config/default` file, environment-specific file,
//! `config/local`, then `APP__`-prefixed environment variables. Secrets are
//! wrapped in `secrecy::Secret` so they never appear in debug output.

use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub classification: ClassificationConfig,
    pub cache: CacheConfig,
    pub sanitizer: SanitizerConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Provider used when the request does not specify one.
    pub default_provider: String,
    /// Model used when the request does not specify one.
    pub default_model: String,
    /// Model tried once when the resolved model is unavailable or fails.
    pub fallback_model: String,
    pub openai: OpenAiConfig,
    pub azure: AzureConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<Secret<String>>,
    pub endpoint: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AzureConfig {
    pub enabled: bool,
    /// Azure OpenAI resource name (part of the endpoint URL).
    pub resource_name: Option<String>,
    pub api_key: Option<Secret<String>>,
    pub api_version: String,
    pub timeout_ms: u64,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
    /// Configured deployments, keyed by model id.
    pub deployments: HashMap<String, DeploymentConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentConfig {
    /// Deployment name on the Azure resource.
    pub deployment_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-deployment overrides; provider defaults apply when absent.
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Minimum model-reported confidence for auto-apply.
    pub confidence_threshold: f64,
    /// Catch-all queue for manual handling.
    pub fallback_queue: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: u64,
    pub max_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SanitizerConfig {
    pub body_max_length: usize,
    /// Word-boundary truncation only backtracks past this length.
    pub body_min_length: usize,
    pub sanitize_pii: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Circuit breaker sliding window size (count based).
    pub window_size: usize,
    /// Minimum calls in the window before the failure rate is evaluated.
    pub min_calls: usize,
    /// Failure rate in [0, 1] that opens the circuit.
    pub failure_rate_threshold: f64,
    /// How long the circuit stays open before half-open probes.
    pub open_cooldown_secs: u64,
    /// Trial calls admitted while half-open.
    pub half_open_probes: u32,
    /// Total transport attempts per outbound call (1 = no retry).
    pub retry_max_attempts: u32,
    pub retry_wait_ms: u64,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("TRIAGE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__PROVIDERS__DEFAULT_MODEL=gpt-4o to providers.default_model
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl AzureConfig {
    /// Whether the Azure configuration is complete enough to dial out.
    pub fn is_configured(&self) -> bool {
        self.enabled
            && self.resource_name.as_deref().is_some_and(|r| !r.is_empty())
            && self.api_key.is_some()
            && !self.deployments.is_empty()
    }

    /// Endpoint URL for a specific deployment.
    pub fn build_endpoint_url(&self, deployment_name: &str) -> String {
        format!(
            "https://{}.openai.azure.com/openai/deployments/{}/chat/completions?api-version={}",
            self.resource_name.as_deref().unwrap_or_default(),
            deployment_name,
            self.api_version
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            classification: ClassificationConfig::default(),
            cache: CacheConfig::default(),
            sanitizer: SanitizerConfig::default(),
            resilience: ResilienceConfig::default(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_provider: "azure-openai".into(),
            default_model: "gpt-4o-mini".into(),
            fallback_model: "gpt-4o-mini".into(),
            openai: OpenAiConfig::default(),
            azure: AzureConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_ms: 30_000,
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            resource_name: None,
            api_key: None,
            api_version: "2024-02-01".into(),
            timeout_ms: 30_000,
            default_temperature: 0.3,
            default_max_tokens: 500,
            deployments: HashMap::new(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            fallback_queue: "Service Desk (1o Nivel)".into(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 5,
            max_size: 1000,
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            body_max_length: 300,
            body_min_length: 200,
            sanitize_pii: true,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_calls: 5,
            failure_rate_threshold: 0.5,
            open_cooldown_secs: 30,
            half_open_probes: 3,
            retry_max_attempts: 3,
            retry_wait_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_settings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.classification.confidence_threshold, 0.75);
        assert_eq!(cfg.cache.ttl_minutes, 5);
        assert_eq!(cfg.cache.max_size, 1000);
        assert_eq!(cfg.providers.default_provider, "azure-openai");
        assert_eq!(cfg.providers.fallback_model, "gpt-4o-mini");
        assert_eq!(cfg.resilience.retry_max_attempts, 3);
    }

    #[test]
    fn azure_requires_key_and_deployments() {
        let mut azure = AzureConfig {
            enabled: true,
            resource_name: Some("triage-prod".into()),
            ..AzureConfig::default()
        };
        assert!(!azure.is_configured());

        azure.api_key = Some(Secret::new("key".into()));
        azure.deployments.insert(
            "gpt-4o-mini".into(),
            DeploymentConfig {
                deployment_name: "gpt-4o-mini-deploy".into(),
                display_name: None,
                description: None,
                enabled: true,
                temperature: None,
                max_tokens: None,
            },
        );
        assert!(azure.is_configured());
        assert!(azure
            .build_endpoint_url("gpt-4o-mini-deploy")
            .starts_with("https://triage-prod.openai.azure.com/openai/deployments/gpt-4o-mini-deploy"));
    }
}
