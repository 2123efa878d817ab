//! Classification pipeline.
//!
//! Orchestrates one ticket end to end: cache probe, sanitation, sentiment,
//! prompt assembly, the routed model call, and the confidence policy over
//! the model's answer. The pipeline is total: every path, including total
//! provider failure, ends in a well-formed `ClassificationResult`.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use triage_core::config::AppConfig;
use triage_core::{
    ClassificationRequest, ClassificationResult, ClassificationStatus, ErrorCode, ProviderRequest,
    SanitizedTicket, SentimentSignal,
};
use triage_model_gateway::ProviderRouter;

use crate::cache::ResultCache;
use crate::catalog::ServiceCatalog;
use crate::prompt::PromptBuilder;
use crate::sanitizer::TicketSanitizer;
use crate::sentiment::SentimentAnalyzer;

pub struct ClassificationPipeline {
    sanitizer: TicketSanitizer,
    sentiment: SentimentAnalyzer,
    prompt: PromptBuilder,
    catalog: Arc<ServiceCatalog>,
    cache: ResultCache,
    router: Arc<ProviderRouter>,
    confidence_threshold: f64,
    fallback_queue: String,
}

/// What the model answered, before the confidence policy is applied.
struct ModelAnswer {
    ticket_type: Option<String>,
    service_id: Option<String>,
    service_name: Option<String>,
    confidence_score: Option<f64>,
}

impl ClassificationPipeline {
    pub fn new(cfg: &AppConfig, catalog: Arc<ServiceCatalog>, router: Arc<ProviderRouter>) -> Self {
        Self {
            sanitizer: TicketSanitizer::new(cfg.sanitizer.clone()),
            sentiment: SentimentAnalyzer::new(),
            prompt: PromptBuilder::new(catalog.clone()),
            catalog,
            cache: ResultCache::new(&cfg.cache),
            router,
            confidence_threshold: cfg.classification.confidence_threshold,
            fallback_queue: cfg.classification.fallback_queue.clone(),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Classify one ticket. Never fails: unexpected faults collapse into a
    /// `not_applied` result carrying `INTERNAL_ERROR`.
    pub async fn classify(&self, request: ClassificationRequest) -> ClassificationResult {
        let started = Instant::now();
        let correlation_id = request
            .correlation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        tracing::info!(
            correlation_id = %correlation_id,
            subject_len = request.subject.len(),
            "classification started"
        );

        match self.run(&request, &correlation_id, started).await {
            Ok(result) => {
                tracing::info!(
                    correlation_id = %result.correlation_id,
                    status = %result.status,
                    service_id = result.service_id.as_deref().unwrap_or("-"),
                    processing_time_ms = result.processing_time_ms,
                    "classification finished"
                );
                result
            }
            Err(e) => {
                tracing::error!(correlation_id = %correlation_id, error = %e, "classification failed");
                let mut result = self.base_result(&correlation_id, started);
                result.status = ClassificationStatus::NotApplied;
                result.error_code = Some(ErrorCode::Internal);
                result.error_message = Some(e.to_string());
                result
            }
        }
    }

    async fn run(
        &self,
        request: &ClassificationRequest,
        correlation_id: &str,
        started: Instant,
    ) -> triage_core::Result<ClassificationResult> {
        let fingerprint = ResultCache::fingerprint(
            request.ticket_id.as_deref(),
            &request.subject,
            request.body.as_deref(),
        );
        if let Some(cached) = self.cache.get(&fingerprint) {
            tracing::info!(correlation_id, fingerprint = %fingerprint, "served from cache");
            return Ok(cached);
        }

        let ticket = self.sanitizer.sanitize(request);
        let signal = self.sentiment.analyze(&ticket.subject, &ticket.body);
        let prompts = self
            .prompt
            .build(&ticket.subject, &ticket.body, Some(&signal), None);

        let provider_request = ProviderRequest {
            system_prompt: prompts.system_prompt,
            user_prompt: prompts.user_prompt,
            provider: request.provider.clone(),
            model: request.model.clone(),
            temperature: None,
            max_tokens: None,
        };
        let (provider, resolved_model) = self.router.resolve(&provider_request).await;
        let response = self.router.route(&provider_request).await;

        let mut result = self.base_result(correlation_id, started);
        result.provider = Some(provider);
        result.model = response.model.clone().or(Some(resolved_model));
        self.attach_signal(&mut result, &signal);
        self.attach_ticket(&mut result, &ticket);

        if !response.success {
            return Ok(self.handle_failure(result, &response.error_code, response.error_message, &fingerprint, started));
        }

        let content = response.content.as_deref().unwrap_or_default();
        let answer = match parse_model_answer(content) {
            Ok(answer) => answer,
            Err(message) => {
                // A malformed model answer is not cached; a retry may parse.
                result.status = ClassificationStatus::NotApplied;
                result.error_code = Some(ErrorCode::Parse);
                result.error_message = Some(message);
                result.processing_time_ms = started.elapsed().as_millis() as u64;
                return Ok(result);
            }
        };

        self.apply_policy(&mut result, answer);
        result.success = true;
        result.processing_time_ms = started.elapsed().as_millis() as u64;
        self.cache.put(fingerprint, result.clone());
        Ok(result)
    }

    /// Provider failure policy: exhausted fallback degrades to a manual
    /// outcome routed to the fallback queue and is cached, so a burst of
    /// identical retries does not hammer a provider that is already down.
    /// Anything else is `not_applied` and left uncached.
    fn handle_failure(
        &self,
        mut result: ClassificationResult,
        error_code: &Option<ErrorCode>,
        error_message: Option<String>,
        fingerprint: &str,
        started: Instant,
    ) -> ClassificationResult {
        result.error_code = *error_code;
        result.error_message = error_message;

        if *error_code == Some(ErrorCode::AiUnavailable) {
            result.success = true;
            result.status = ClassificationStatus::Manual;
            result.queue = Some(self.fallback_queue.clone());
            result.message = Some("Classificacao requer revisao manual".to_string());
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            self.cache.put(fingerprint.to_string(), result.clone());
        } else {
            result.status = ClassificationStatus::NotApplied;
            result.processing_time_ms = started.elapsed().as_millis() as u64;
        }
        result
    }

    /// Confidence policy. The catalog is authoritative: names and queues
    /// come from it, never from the model, and an unknown service id forces
    /// a manual outcome.
    fn apply_policy(&self, result: &mut ClassificationResult, answer: ModelAnswer) {
        let confidence = answer.confidence_score.unwrap_or(0.0);
        result.confidence_score = answer.confidence_score;

        let service = answer
            .service_id
            .as_deref()
            .and_then(|id| self.catalog.service(id));

        match service {
            Some(entry) => {
                result.service_id = Some(entry.id.clone());
                result.service_name = Some(entry.name.clone());
                result.ticket_type = Some(entry.ticket_type.clone());
                result.threshold_met = confidence >= self.confidence_threshold;

                if result.threshold_met {
                    result.status = ClassificationStatus::Applied;
                    result.queue = self
                        .catalog
                        .queue_for_service(&entry.id)
                        .map(|q| q.name.clone());
                    result.message =
                        Some("Classificacao aplicada automaticamente".to_string());
                } else {
                    result.status = ClassificationStatus::Partial;
                    result.queue = self
                        .catalog
                        .queue_for_service(&entry.id)
                        .map(|q| q.name.clone());
                    result.message =
                        Some("Confianca abaixo do limiar, revisao recomendada".to_string());
                }
            }
            None => {
                if let Some(id) = answer.service_id.as_deref() {
                    tracing::warn!(service_id = id, "model answered with unknown service id");
                }
                result.ticket_type = answer.ticket_type;
                result.service_name = answer.service_name;
                result.threshold_met = false;
                result.status = ClassificationStatus::Manual;
                result.queue = Some(self.fallback_queue.clone());
                result.message = Some("Classificacao requer revisao manual".to_string());
            }
        }
    }

    fn attach_signal(&self, result: &mut ClassificationResult, signal: &SentimentSignal) {
        result.sentiment_score = Some(signal.score);
        result.sentiment_label = Some(signal.label);
        result.urgency_detected = signal.urgency_detected;
        result.criticality_score = Some(signal.criticality_score);
        result.should_increase_severity = signal.should_increase_severity;
    }

    fn attach_ticket(&self, result: &mut ClassificationResult, ticket: &SanitizedTicket) {
        result.sanitized_subject = Some(ticket.subject.clone());
        result.sanitized_body_summary = Some(ticket.body.clone());
        result.masked_sender = if ticket.masked_sender.is_empty() {
            None
        } else {
            Some(ticket.masked_sender.clone())
        };
    }

    fn base_result(&self, correlation_id: &str, started: Instant) -> ClassificationResult {
        ClassificationResult {
            success: false,
            status: ClassificationStatus::NotApplied,
            correlation_id: correlation_id.to_string(),
            ticket_type: None,
            service_id: None,
            service_name: None,
            queue: None,
            confidence_score: None,
            threshold_met: false,
            sentiment_score: None,
            sentiment_label: None,
            urgency_detected: false,
            criticality_score: None,
            should_increase_severity: false,
            processing_time_ms: started.elapsed().as_millis() as u64,
            message: None,
            error_code: None,
            error_message: None,
            provider: None,
            model: None,
            sanitized_subject: None,
            sanitized_body_summary: None,
            masked_sender: None,
        }
    }
}

/// Parse the model's JSON answer. The confidence score is read as a number
/// or a numeric string; everything else missing is tolerated and handled by
/// the policy.
fn parse_model_answer(content: &str) -> Result<ModelAnswer, String> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| format!("model answer is not valid JSON: {}", e))?;
    if !value.is_object() {
        return Err("model answer is not a JSON object".to_string());
    }

    let text = |field: &str| {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let confidence = value.get("confidence_score").and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.parse::<f64>().ok()))
    });

    Ok(ModelAnswer {
        ticket_type: text("tipo"),
        service_id: text("servico_id"),
        service_name: text("servico_nome"),
        confidence_score: confidence.map(|c| c.clamp(0.0, 1.0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use triage_core::Deployment;
    use triage_model_gateway::{DeploymentRegistry, MockProviderClient};

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
            &triage_core::config::ResilienceConfig::default(),
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

    fn request(subject: &str, ticket_id: &str) -> ClassificationRequest {
        ClassificationRequest {
            subject: subject.to_string(),
            body: Some("Preciso de ajuda com este chamado".to_string()),
            sender_email: Some("maria@empresa.com.br".to_string()),
            ticket_id: Some(ticket_id.to_string()),
            provider: None,
            model: None,
            correlation_id: None,
        }
    }

    fn answer(service_id: &str, confidence: f64) -> String {
        format!(
            "{{\"tipo\":\"REQ\",\"servico_id\":\"{}\",\"servico_nome\":\"qualquer\",\"confidence_score\":{}}}",
            service_id, confidence
        )
    }

    #[tokio::test]
    async fn confident_valid_answer_is_applied() {
        let router = router();
        let mock = Arc::new(MockProviderClient::new(PROVIDER, answer("REQ-101", 0.92)));
        router.register(mock.clone());
        let pipeline = pipeline(router);

        let result = pipeline.classify(request("Resetar senha", "T-1")).await;

        assert!(result.success);
        assert_eq!(result.status, ClassificationStatus::Applied);
        assert!(result.threshold_met);
        assert_eq!(result.service_id.as_deref(), Some("REQ-101"));
        // Catalog name wins over whatever the model wrote.
        assert_eq!(result.service_name.as_deref(), Some("Resetar Senha de Usuario"));
        assert_eq!(result.queue.as_deref(), Some("Identidade e Acesso"));
        assert_eq!(result.masked_sender.as_deref(), Some("m****@empresa.com.br"));
    }

    #[tokio::test]
    async fn low_confidence_is_partial() {
        let router = router();
        router.register(Arc::new(MockProviderClient::new(
            PROVIDER,
            answer("REQ-101", 0.42),
        )));
        let pipeline = pipeline(router);

        let result = pipeline.classify(request("Senha", "T-2")).await;

        assert_eq!(result.status, ClassificationStatus::Partial);
        assert!(!result.threshold_met);
        assert_eq!(result.service_id.as_deref(), Some("REQ-101"));
    }

    #[tokio::test]
    async fn unknown_service_id_forces_manual() {
        let router = router();
        router.register(Arc::new(MockProviderClient::new(
            PROVIDER,
            answer("REQ-999", 0.95),
        )));
        let pipeline = pipeline(router);

        let result = pipeline.classify(request("Algo estranho", "T-3")).await;

        assert_eq!(result.status, ClassificationStatus::Manual);
        assert!(!result.threshold_met);
        assert!(result.service_id.is_none());
        assert_eq!(result.queue.as_deref(), Some("Service Desk (1o Nivel)"));
    }

    #[tokio::test]
    async fn provider_exhaustion_degrades_to_manual_and_caches() {
        let router = router();
        router.register(Arc::new(MockProviderClient::failing(PROVIDER)));
        let pipeline = pipeline(router);

        let result = pipeline.classify(request("VPN parada", "T-4")).await;

        assert!(result.success);
        assert_eq!(result.status, ClassificationStatus::Manual);
        assert_eq!(result.error_code, Some(ErrorCode::AiUnavailable));
        assert_eq!(result.queue.as_deref(), Some("Service Desk (1o Nivel)"));
        assert_eq!(pipeline.cache().len(), 1);
    }

    #[tokio::test]
    async fn malformed_answer_is_not_applied_and_not_cached() {
        let router = router();
        router.register(Arc::new(MockProviderClient::new(PROVIDER, "not json at all")));
        let pipeline = pipeline(router);

        let result = pipeline.classify(request("Qualquer", "T-5")).await;

        assert!(!result.success);
        assert_eq!(result.status, ClassificationStatus::NotApplied);
        assert_eq!(result.error_code, Some(ErrorCode::Parse));
        assert!(pipeline.cache().is_empty());
    }

    #[tokio::test]
    async fn identical_ticket_is_served_from_cache() {
        let router = router();
        let mock = Arc::new(MockProviderClient::new(PROVIDER, answer("REQ-101", 0.9)));
        router.register(mock.clone());
        let pipeline = pipeline(router);

        let first = pipeline.classify(request("Resetar senha", "T-6")).await;
        let second = pipeline.classify(request("Resetar senha", "T-6")).await;

        assert_eq!(mock.calls(), 1);
        assert_eq!(first.correlation_id, second.correlation_id);
        assert_eq!(pipeline.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn supplied_correlation_id_is_kept() {
        let router = router();
        router.register(Arc::new(MockProviderClient::new(
            PROVIDER,
            answer("INC-202", 0.88),
        )));
        let pipeline = pipeline(router);

        let mut req = request("Sem internet", "T-7");
        req.correlation_id = Some("corr-42".to_string());
        let result = pipeline.classify(req).await;

        assert_eq!(result.correlation_id, "corr-42");
        assert_eq!(result.ticket_type.as_deref(), Some("INC"));
    }

    #[test]
    fn confidence_parses_from_number_or_string() {
        let a = parse_model_answer("{\"servico_id\":\"REQ-101\",\"confidence_score\":0.8}").unwrap();
        assert_eq!(a.confidence_score, Some(0.8));

        let b = parse_model_answer("{\"servico_id\":\"REQ-101\",\"confidence_score\":\"0.65\"}")
            .unwrap();
        assert_eq!(b.confidence_score, Some(0.65));

        let c = parse_model_answer("{\"servico_id\":\"REQ-101\",\"confidence_score\":1.7}").unwrap();
        assert_eq!(c.confidence_score, Some(1.0));
    }
}
