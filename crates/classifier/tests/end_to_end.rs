//! End-to-end pipeline scenarios against a mock provider.

use std::collections::HashMap;
use std::sync::Arc;

use triage_core::config::{AppConfig, ResilienceConfig};
use triage_core::{ClassificationRequest, ClassificationStatus, Deployment, ErrorCode};
use triage_model_gateway::{DeploymentRegistry, MockProviderClient, ProviderRouter};

use triage_classifier::{ClassificationPipeline, ServiceCatalog};

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

fn router() -> Arc<ProviderRouter> {
    let mut map = HashMap::new();
    map.insert(
        PROVIDER.to_string(),
        vec![deployment("gpt-4o"), deployment("gpt-4o-mini")],
    );
    let registry = Arc::new(DeploymentRegistry::new(map, PROVIDER, "gpt-4o"));
    Arc::new(ProviderRouter::new(
        registry,
        &ResilienceConfig::default(),
        "gpt-4o-mini",
    ))
}

fn pipeline(router: Arc<ProviderRouter>) -> ClassificationPipeline {
    ClassificationPipeline::new(
        &AppConfig::default(),
        Arc::new(ServiceCatalog::builtin()),
        router,
    )
}

fn ticket(subject: &str, body: &str, ticket_id: &str) -> ClassificationRequest {
    ClassificationRequest {
        subject: subject.to_string(),
        body: Some(body.to_string()),
        sender_email: Some("carlos.souza@empresa.com.br".to_string()),
        ticket_id: Some(ticket_id.to_string()),
        provider: None,
        model: None,
        correlation_id: None,
    }
}

#[tokio::test]
async fn password_reset_is_classified_and_applied() {
    let router = router();
    let mock = Arc::new(MockProviderClient::new(
        PROVIDER,
        r#"{"tipo":"REQ","servico_id":"REQ-101","servico_nome":"Resetar Senha","confidence_score":0.93}"#,
    ));
    router.register(mock.clone());
    let pipeline = pipeline(router);

    let result = pipeline
        .classify(ticket(
            "RE: Esqueci minha senha",
            "Nao consigo acessar a rede, preciso resetar minha senha. Meu CPF e 123.456.789-01.",
            "TK-1001",
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.status, ClassificationStatus::Applied);
    assert_eq!(result.ticket_type.as_deref(), Some("REQ"));
    assert_eq!(result.service_id.as_deref(), Some("REQ-101"));
    assert_eq!(result.queue.as_deref(), Some("Identidade e Acesso"));
    assert_eq!(result.masked_sender.as_deref(), Some("c****@empresa.com.br"));
    // PII never reaches the result echo.
    let body_echo = result.sanitized_body_summary.unwrap();
    assert!(body_echo.contains("[CPF]"));
    assert!(!body_echo.contains("123.456.789-01"));
}

#[tokio::test]
async fn primary_model_failure_falls_back_transparently() {
    let router = router();
    let mock = Arc::new(
        MockProviderClient::new(
            PROVIDER,
            r#"{"tipo":"INC","servico_id":"INC-202","servico_nome":"Internet","confidence_score":0.88}"#,
        )
        .fail_for_model("gpt-4o"),
    );
    router.register(mock.clone());
    let pipeline = pipeline(router);

    let result = pipeline
        .classify(ticket(
            "URGENTE: sem internet",
            "A internet esta fora do ar no predio inteiro",
            "TK-1002",
        ))
        .await;

    assert!(result.success);
    assert_eq!(result.status, ClassificationStatus::Applied);
    assert_eq!(result.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(mock.calls(), 2);
    // Urgency plus negative sentiment raises criticality to the maximum.
    assert!(result.urgency_detected);
    assert_eq!(result.criticality_score, Some(3));
    assert!(result.should_increase_severity);
}

#[tokio::test]
async fn total_outage_degrades_to_manual_queue() {
    let router = router();
    let mock = Arc::new(MockProviderClient::failing(PROVIDER));
    router.register(mock.clone());
    let pipeline = pipeline(router);

    let result = pipeline
        .classify(ticket("Impressora", "A impressora parou", "TK-1003"))
        .await;

    assert!(result.success);
    assert_eq!(result.status, ClassificationStatus::Manual);
    assert_eq!(result.error_code, Some(ErrorCode::AiUnavailable));
    assert_eq!(result.queue.as_deref(), Some("Service Desk (1o Nivel)"));
    assert_eq!(mock.calls(), 2);

    // The degraded outcome is cached; an identical retry does not dial out.
    let retry = pipeline
        .classify(ticket("Impressora", "A impressora parou", "TK-1003"))
        .await;
    assert_eq!(retry.status, ClassificationStatus::Manual);
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn repeated_outage_opens_the_circuit() {
    let router = router();
    let mock = Arc::new(MockProviderClient::failing(PROVIDER));
    router.register(mock.clone());
    let pipeline = pipeline(router.clone());

    // Distinct tickets so the cache does not absorb the retries. Each run
    // spends one attempt per model; after enough runs both circuits open
    // and the provider stops being dialed at all.
    for i in 0..6 {
        let _ = pipeline
            .classify(ticket("Falha geral", "Sistema critico parado", &format!("TK-2{:03}", i)))
            .await;
    }
    let dialed_before = mock.calls();

    let result = pipeline
        .classify(ticket("Falha geral", "Sistema critico parado", "TK-2999"))
        .await;
    assert_eq!(result.status, ClassificationStatus::Manual);
    assert_eq!(mock.calls(), dialed_before);
}

#[tokio::test]
async fn explicit_provider_and_model_are_honored() {
    let router = router();
    let mock = Arc::new(MockProviderClient::new(
        PROVIDER,
        r#"{"tipo":"OS","servico_id":"OS-300","servico_nome":"Projetos","confidence_score":0.81}"#,
    ));
    router.register(mock.clone());
    let pipeline = pipeline(router);

    let mut request = ticket("Projeto de migracao", "Atividade planejada", "TK-1004");
    request.provider = Some("AZURE-OPENAI".to_string());
    request.model = Some("gpt-4o-mini".to_string());

    let result = pipeline.classify(request).await;

    assert_eq!(result.status, ClassificationStatus::Applied);
    assert_eq!(result.provider.as_deref(), Some("azure-openai"));
    assert_eq!(result.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(result.ticket_type.as_deref(), Some("OS"));
    assert_eq!(result.queue.as_deref(), Some("Manutencoes e Projetos"));
    assert_eq!(mock.calls(), 1);
}
