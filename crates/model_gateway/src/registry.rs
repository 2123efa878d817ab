//! Deployment registry.
//!
//! Read model of the configured model deployments per provider plus the
//! process-wide defaults. Populated once at startup; administrative writes
//! replace the whole snapshot behind a lock so concurrent readers always see
//! a consistent view, never a half-mutated map.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use tokio::sync::RwLock;

use triage_core::config::ProvidersConfig;
use triage_core::{Deployment, Error, Result};

/// Azure-style provider key used for deployments loaded from configuration.
pub const AZURE_PROVIDER: &str = "azure-openai";
/// Provider key for the plain OpenAI API.
pub const OPENAI_PROVIDER: &str = "openai";

/// Immutable view of the registry at one point in time.
#[derive(Debug, Clone)]
struct RegistrySnapshot {
    deployments: HashMap<String, Vec<Deployment>>,
    default_provider: String,
    default_model: String,
}

/// Catalog of configured model deployments.
pub struct DeploymentRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl DeploymentRegistry {
    /// Create a registry from explicit parts. Used by [`Self::from_config`]
    /// and by tests that need a synthetic catalog.
    pub fn new(
        deployments: HashMap<String, Vec<Deployment>>,
        default_provider: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let snapshot = RegistrySnapshot {
            deployments,
            default_provider: default_provider.into(),
            default_model: default_model.into(),
        };
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Build the registry from application configuration.
    pub fn from_config(cfg: &ProvidersConfig) -> Self {
        let mut deployments: HashMap<String, Vec<Deployment>> = HashMap::new();

        if cfg.azure.is_configured() {
            let mut azure: Vec<Deployment> = cfg
                .azure
                .deployments
                .iter()
                .filter(|(_, d)| d.enabled)
                .map(|(model_id, d)| Deployment {
                    model_id: model_id.clone(),
                    deployment_name: d.deployment_name.clone(),
                    display_name: d.display_name.clone().unwrap_or_else(|| model_id.clone()),
                    description: d.description.clone(),
                    enabled: true,
                    default_temperature: d.temperature.unwrap_or(cfg.azure.default_temperature),
                    default_max_tokens: d.max_tokens.unwrap_or(cfg.azure.default_max_tokens),
                })
                .collect();
            azure.sort_by(|a, b| a.model_id.cmp(&b.model_id));
            if !azure.is_empty() {
                tracing::info!(
                    models = azure.len(),
                    "registered {} with {} deployments",
                    AZURE_PROVIDER,
                    azure.len()
                );
                deployments.insert(AZURE_PROVIDER.to_string(), azure);
            }
        } else if cfg.azure.enabled {
            tracing::warn!("azure provider enabled but incompletely configured, skipping");
        }

        if cfg.openai.api_key.is_some() {
            deployments.insert(
                OPENAI_PROVIDER.to_string(),
                vec![Deployment {
                    model_id: cfg.openai.model.clone(),
                    deployment_name: cfg.openai.model.clone(),
                    display_name: cfg.openai.model.clone(),
                    description: None,
                    enabled: true,
                    default_temperature: cfg.openai.temperature,
                    default_max_tokens: cfg.openai.max_tokens,
                }],
            );
        }

        let default_provider = if cfg.default_provider.trim().is_empty() {
            AZURE_PROVIDER.to_string()
        } else {
            cfg.default_provider.clone()
        };
        let default_model = if cfg.default_model.trim().is_empty() {
            "gpt-4o-mini".to_string()
        } else {
            cfg.default_model.clone()
        };

        tracing::info!(
            providers = ?deployments.keys().collect::<Vec<_>>(),
            default = %format!("{}/{}", default_provider, default_model),
            "deployment registry initialized"
        );

        Self::new(deployments, default_provider, default_model)
    }

    async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Resolve a provider: explicit value (lower-cased, trimmed) when
    /// non-blank, the configured default otherwise.
    pub async fn resolve_provider(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(p) if !p.trim().is_empty() => p.trim().to_lowercase(),
            _ => self.snapshot().await.default_provider.clone(),
        }
    }

    /// Resolve a model for a provider: the explicit value when given, the
    /// default model when the provider is the default provider, the first
    /// enabled deployment of the provider otherwise, the default model as
    /// last resort.
    pub async fn resolve_model(&self, provider: &str, explicit: Option<&str>) -> String {
        if let Some(m) = explicit {
            if !m.trim().is_empty() {
                return m.trim().to_string();
            }
        }

        let snapshot = self.snapshot().await;
        if provider == snapshot.default_provider {
            return snapshot.default_model.clone();
        }

        snapshot
            .deployments
            .get(provider)
            .and_then(|models| models.iter().find(|d| d.enabled))
            .map(|d| d.model_id.clone())
            .unwrap_or_else(|| snapshot.default_model.clone())
    }

    /// Whether the provider has at least one enabled deployment.
    pub async fn is_provider_available(&self, provider: &str) -> bool {
        self.snapshot()
            .await
            .deployments
            .get(provider)
            .is_some_and(|models| models.iter().any(|d| d.enabled))
    }

    /// Whether an enabled deployment with this model id exists under the
    /// provider.
    pub async fn is_model_available(&self, provider: &str, model: &str) -> bool {
        self.snapshot()
            .await
            .deployments
            .get(provider)
            .is_some_and(|models| models.iter().any(|d| d.model_id == model && d.enabled))
    }

    /// Look up a deployment.
    pub async fn deployment(&self, provider: &str, model: &str) -> Option<Deployment> {
        self.snapshot()
            .await
            .deployments
            .get(provider)
            .and_then(|models| models.iter().find(|d| d.model_id == model))
            .cloned()
    }

    /// All deployments for a provider.
    pub async fn models_for_provider(&self, provider: &str) -> Vec<Deployment> {
        self.snapshot()
            .await
            .deployments
            .get(provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Provider keys with configured deployments.
    pub async fn available_providers(&self) -> Vec<String> {
        let mut providers: Vec<String> =
            self.snapshot().await.deployments.keys().cloned().collect();
        providers.sort();
        providers
    }

    /// Total deployment count across providers.
    pub async fn total_models(&self) -> usize {
        self.snapshot()
            .await
            .deployments
            .values()
            .map(Vec::len)
            .sum()
    }

    pub async fn default_provider(&self) -> String {
        self.snapshot().await.default_provider.clone()
    }

    pub async fn default_model(&self) -> String {
        self.snapshot().await.default_model.clone()
    }

    /// Administrative write: replace the default model. Validated against
    /// the enabled deployments of the default provider and made visible to
    /// subsequent reads through a snapshot swap. Returns the previous model.
    pub async fn set_default_model(&self, model: &str) -> Result<String> {
        if model.trim().is_empty() {
            return Err(Error::validation("field 'model' is required"));
        }

        let mut guard = self.snapshot.write().await;
        let current = guard.as_ref();

        let available = current
            .deployments
            .get(&current.default_provider)
            .is_some_and(|models| models.iter().any(|d| d.model_id == model && d.enabled));
        if !available {
            return Err(Error::validation(format!(
                "model '{}' not found or disabled for provider '{}'",
                model, current.default_provider
            )));
        }

        let previous = current.default_model.clone();
        let mut next = current.clone();
        next.default_model = model.trim().to_string();
        *guard = Arc::new(next);

        tracing::info!(previous = %previous, current = %model, "default model changed");
        Ok(previous)
    }
}

/// Provider credential shared between a client and the administrative
/// rotation path. Rotation swaps the secret without a restart; in-flight
/// calls keep the value they already read.
#[derive(Clone)]
pub struct SharedCredential {
    inner: Arc<RwLock<Option<Secret<String>>>>,
}

impl SharedCredential {
    pub fn new(initial: Option<Secret<String>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replace the credential.
    pub async fn rotate(&self, key: Secret<String>) {
        *self.inner.write().await = Some(key);
        tracing::info!("provider credential rotated");
    }

    pub async fn is_set(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Copy of the secret value for use in an outbound request header.
    pub async fn expose(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|s| s.expose_secret().clone())
    }
}
