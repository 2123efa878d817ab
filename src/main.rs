#![deny(unused)]
//! Triage engine runner.
//!
//! Reads one classification request as JSON on stdin, runs it through the
//! pipeline, and prints the classification result as JSON on stdout.
//! Providers are configured through the layered `config/` files and
//! `APP__`-prefixed environment variables.

use std::io::Read;
use std::sync::Arc;

use triage_classifier::{ClassificationPipeline, ServiceCatalog};
use triage_core::config::AppConfig;
use triage_core::ClassificationRequest;
use triage_model_gateway::{AzureOpenAiClient, DeploymentRegistry, OpenAiClient, ProviderRouter};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("starting triage engine v{}", env!("CARGO_PKG_VERSION"));

    let cfg = AppConfig::load()?;

    let registry = Arc::new(DeploymentRegistry::from_config(&cfg.providers));
    let router = Arc::new(ProviderRouter::new(
        registry,
        &cfg.resilience,
        cfg.providers.fallback_model.clone(),
    ));
    router.register(Arc::new(AzureOpenAiClient::new(
        &cfg.providers.azure,
        &cfg.resilience,
    )?));
    router.register(Arc::new(OpenAiClient::new(
        &cfg.providers.openai,
        &cfg.resilience,
    )?));

    let catalog = Arc::new(ServiceCatalog::builtin());
    let pipeline = ClassificationPipeline::new(&cfg, catalog, router);

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let request: ClassificationRequest = serde_json::from_str(&input)?;

    let result = pipeline.classify(request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
