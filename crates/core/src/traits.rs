//! Provider client contract.

use async_trait::async_trait;

use crate::types::{ProviderRequest, ProviderResponse};

/// Outbound client for one LLM provider.
///
/// Implementations are registered in the router's capability map under the
/// provider key; adding a provider means registering a new implementation,
/// not extending a dispatch switch.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send a chat completion. Total: all failures come back as a
    /// [`ProviderResponse`] with `success = false`.
    async fn send_chat_completion(&self, request: &ProviderRequest) -> ProviderResponse;

    /// Provider key this client serves (e.g. "azure-openai").
    fn name(&self) -> &str;

    /// Whether the client has the configuration it needs to dial out.
    async fn is_available(&self) -> bool;

    /// Probe connectivity for a specific model by reusing the completion
    /// path with a minimal synthetic request.
    async fn test_connection(&self, model: &str) -> ProviderResponse {
        let mut request = ProviderRequest::connection_test();
        request.model = Some(model.to_string());
        self.send_chat_completion(&request).await
    }
}
