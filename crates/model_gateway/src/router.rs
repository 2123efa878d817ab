//! Provider router.
//!
//! Resolves the provider and model for each request against the deployment
//! registry, gates every attempt through the circuit breaker, and applies a
//! single-level model fallback: the resolved model is tried first and the
//! configured fallback model at most once after it. When both fail the
//! router reports the dependency as unavailable rather than erroring out,
//! so the caller can degrade to a manual-review outcome.

use std::sync::Arc;

use dashmap::DashMap;

use triage_core::config::ResilienceConfig;
use triage_core::{ErrorCode, ProviderClient, ProviderRequest, ProviderResponse};

use crate::breaker::{BreakerSettings, BreakerState, CircuitBreaker};
use crate::registry::DeploymentRegistry;

pub struct ProviderRouter {
    registry: Arc<DeploymentRegistry>,
    clients: DashMap<String, Arc<dyn ProviderClient>>,
    breaker: CircuitBreaker,
    fallback_model: String,
}

impl ProviderRouter {
    pub fn new(
        registry: Arc<DeploymentRegistry>,
        resilience: &ResilienceConfig,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            clients: DashMap::new(),
            breaker: CircuitBreaker::new(BreakerSettings::from(resilience)),
            fallback_model: fallback_model.into(),
        }
    }

    /// Register a provider client under its own name.
    pub fn register(&self, client: Arc<dyn ProviderClient>) {
        let name = client.name().to_string();
        tracing::info!(provider = %name, "provider client registered");
        self.clients.insert(name, client);
    }

    pub fn registry(&self) -> &DeploymentRegistry {
        &self.registry
    }

    /// Breaker state for a provider/model pair.
    pub fn breaker_state(&self, provider: &str, model: &str) -> BreakerState {
        self.breaker.state(&breaker_key(provider, model))
    }

    /// Resolve the provider and model this request would be routed to,
    /// including the registry-level substitution of unavailable models.
    pub async fn resolve(&self, request: &ProviderRequest) -> (String, String) {
        let provider = self.registry.resolve_provider(request.provider.as_deref()).await;
        let mut model = self
            .registry
            .resolve_model(&provider, request.model.as_deref())
            .await;

        // A model the registry does not know cannot be dialed; substitute
        // the fallback before spending an attempt on it.
        if !self.registry.is_model_available(&provider, &model).await
            && model != self.fallback_model
            && self
                .registry
                .is_model_available(&provider, &self.fallback_model)
                .await
        {
            tracing::warn!(
                provider = %provider,
                requested = %model,
                fallback = %self.fallback_model,
                "requested model unavailable, substituting fallback"
            );
            model = self.fallback_model.clone();
        }

        (provider, model)
    }

    /// Route a completion request: resolved model first, fallback model at
    /// most once. Total failure collapses into an `AI_UNAVAILABLE` response.
    pub async fn route(&self, request: &ProviderRequest) -> ProviderResponse {
        let (provider, model) = self.resolve(request).await;

        if !self.registry.is_provider_available(&provider).await {
            return ProviderResponse::failure(
                ErrorCode::AiUnavailable,
                format!("provider '{}' has no enabled deployments", provider),
            );
        }
        let Some(client) = self.clients.get(&provider).map(|c| c.clone()) else {
            return ProviderResponse::failure(
                ErrorCode::UnknownProvider,
                format!("no client registered for provider '{}'", provider),
            );
        };
        if !self.registry.is_model_available(&provider, &model).await {
            // resolve() already tried the fallback; nothing left to dial.
            return ProviderResponse::failure(
                ErrorCode::AiUnavailable,
                format!(
                    "neither model '{}' nor fallback '{}' is available on '{}'",
                    model, self.fallback_model, provider
                ),
            )
            .with_model(&model);
        }

        let mut candidates = vec![model.clone()];
        if model != self.fallback_model
            && self
                .registry
                .is_model_available(&provider, &self.fallback_model)
                .await
        {
            candidates.push(self.fallback_model.clone());
        }

        let mut last_failure: Option<ProviderResponse> = None;
        for (attempt, candidate) in candidates.iter().enumerate() {
            let key = breaker_key(&provider, candidate);
            if !self.breaker.try_acquire(&key) {
                tracing::warn!(provider = %provider, model = %candidate, "circuit open, skipping");
                last_failure = Some(
                    ProviderResponse::failure(
                        ErrorCode::CircuitOpen,
                        format!("circuit open for {}", key),
                    )
                    .with_model(candidate),
                );
                continue;
            }

            let attempt_request = ProviderRequest {
                model: Some(candidate.clone()),
                ..request.clone()
            };
            let response = client.send_chat_completion(&attempt_request).await;

            if response.success {
                self.breaker.record_success(&key);
                if attempt > 0 {
                    tracing::info!(provider = %provider, model = %candidate, "fallback model succeeded");
                }
                return response;
            }

            self.breaker.record_failure(&key);
            tracing::warn!(
                provider = %provider,
                model = %candidate,
                error_code = ?response.error_code,
                error = response.error_message.as_deref().unwrap_or("unknown"),
                "provider attempt failed"
            );
            last_failure = Some(response);
        }

        let detail = last_failure
            .as_ref()
            .and_then(|r| r.error_message.clone())
            .unwrap_or_else(|| "no attempt completed".to_string());
        ProviderResponse::failure(
            ErrorCode::AiUnavailable,
            format!("all model attempts failed: {}", detail),
        )
        .with_model(&model)
    }

    /// Connectivity probe for a provider/model pair, bypassing fallback.
    pub async fn test_connection(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> ProviderResponse {
        let provider = self.registry.resolve_provider(provider).await;
        let model = self.registry.resolve_model(&provider, model).await;

        if !self.registry.is_provider_available(&provider).await {
            return ProviderResponse::failure(
                ErrorCode::ProviderUnavailable,
                format!("provider '{}' has no enabled deployments", provider),
            );
        }
        let Some(client) = self.clients.get(&provider).map(|c| c.clone()) else {
            return ProviderResponse::failure(
                ErrorCode::UnknownProvider,
                format!("no client registered for provider '{}'", provider),
            );
        };
        if !client.is_available().await {
            return ProviderResponse::failure(
                ErrorCode::ProviderUnavailable,
                format!("provider '{}' is not available", provider),
            );
        }

        client.test_connection(&model).await
    }
}

fn breaker_key(provider: &str, model: &str) -> String {
    format!("{}:{}", provider, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use triage_core::Deployment;

    use crate::clients::MockProviderClient;

    const PROVIDER: &str = "azure-openai";

    fn deployment(model_id: &str) -> Deployment {
        Deployment {
            model_id: model_id.to_string(),
            deployment_name: format!("{}-deploy", model_id),
            display_name: model_id.to_string(),
            description: None,
            enabled: true,
            default_temperature: 0.3,
            default_max_tokens: 500,
        }
    }

    fn registry() -> Arc<DeploymentRegistry> {
        let mut map = HashMap::new();
        map.insert(
            PROVIDER.to_string(),
            vec![deployment("gpt-4o"), deployment("gpt-4o-mini")],
        );
        Arc::new(DeploymentRegistry::new(map, PROVIDER, "gpt-4o"))
    }

    fn registry_with_openai() -> Arc<DeploymentRegistry> {
        let mut map = HashMap::new();
        map.insert(PROVIDER.to_string(), vec![deployment("gpt-4o")]);
        map.insert("openai".to_string(), vec![deployment("o3-mini")]);
        Arc::new(DeploymentRegistry::new(map, PROVIDER, "gpt-4o"))
    }

    fn router(registry: Arc<DeploymentRegistry>) -> ProviderRouter {
        ProviderRouter::new(registry, &ResilienceConfig::default(), "gpt-4o-mini")
    }

    fn request(provider: Option<&str>, model: Option<&str>) -> ProviderRequest {
        ProviderRequest {
            system_prompt: "system".into(),
            user_prompt: "user".into(),
            provider: provider.map(str::to_string),
            model: model.map(str::to_string),
            temperature: None,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn routes_to_default_provider_and_model() {
        let router = router(registry());
        let mock = Arc::new(MockProviderClient::new(PROVIDER, "{\"ok\":true}"));
        router.register(mock.clone());

        let response = router.route(&request(None, None)).await;
        assert!(response.success);
        assert_eq!(response.model.as_deref(), Some("gpt-4o"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn falls_back_once_when_primary_fails() {
        let router = router(registry());
        let mock = Arc::new(
            MockProviderClient::new(PROVIDER, "{\"ok\":true}").fail_for_model("gpt-4o"),
        );
        router.register(mock.clone());

        let response = router.route(&request(None, Some("gpt-4o"))).await;
        assert!(response.success);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_fallback_reports_ai_unavailable() {
        let router = router(registry());
        let mock = Arc::new(MockProviderClient::failing(PROVIDER));
        router.register(mock.clone());

        let response = router.route(&request(None, None)).await;
        assert!(!response.success);
        assert_eq!(response.error_code, Some(ErrorCode::AiUnavailable));
        // Primary plus one fallback attempt, never more.
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn unavailable_model_is_substituted_before_dialing() {
        let router = router(registry());
        let mock = Arc::new(MockProviderClient::new(PROVIDER, "{\"ok\":true}"));
        router.register(mock.clone());

        let response = router.route(&request(None, Some("gpt-5-turbo"))).await;
        assert!(response.success);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn provider_without_deployments_is_unavailable() {
        let router = router(registry());
        let mock = Arc::new(MockProviderClient::new(PROVIDER, "{\"ok\":true}"));
        router.register(mock.clone());

        let response = router.route(&request(Some("gemini"), None)).await;
        assert!(!response.success);
        assert_eq!(response.error_code, Some(ErrorCode::AiUnavailable));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn configured_provider_without_client_is_rejected() {
        // "openai" has deployments in the registry but no registered client.
        let router = router(registry_with_openai());

        let response = router.route(&request(Some("openai"), None)).await;
        assert!(!response.success);
        assert_eq!(response.error_code, Some(ErrorCode::UnknownProvider));
    }

    #[tokio::test]
    async fn open_circuit_skips_to_fallback() {
        let registry = registry();
        let router = router(registry);
        let mock = Arc::new(MockProviderClient::new(PROVIDER, "{\"ok\":true}"));
        router.register(mock.clone());

        // Trip the breaker for the primary model only.
        for _ in 0..5 {
            router.breaker.record_failure(&breaker_key(PROVIDER, "gpt-4o"));
        }
        assert_eq!(router.breaker_state(PROVIDER, "gpt-4o"), BreakerState::Open);

        let response = router.route(&request(None, Some("gpt-4o"))).await;
        assert!(response.success);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn connection_test_reaches_the_client() {
        let router = router(registry());
        let mock = Arc::new(MockProviderClient::new(PROVIDER, "{\"status\":\"ok\"}"));
        router.register(mock.clone());

        let response = router.test_connection(None, Some("gpt-4o-mini")).await;
        assert!(response.success);
        assert_eq!(mock.calls(), 1);
    }
}
