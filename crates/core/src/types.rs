//! Shared data model for classification requests, provider wire types, and
//! the final classification result.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Error code taxonomy
// =============================================================================

/// Stable error codes surfaced in provider responses and classification
/// results. Codes are part of the external contract and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Provider is not configured or not enabled.
    NotConfigured,
    /// No model id was supplied where one is required.
    NoModel,
    /// Model id is unknown or disabled for the provider.
    InvalidModel,
    /// Provider key has no registered client.
    UnknownProvider,
    /// Provider has no enabled deployments.
    ProviderUnavailable,
    /// Primary and fallback attempts are exhausted; classification must be
    /// handled manually.
    AiUnavailable,
    /// Upstream returned a non-success HTTP status.
    Http(u16),
    /// Network-level failure (connect, timeout, broken transfer).
    Transport,
    /// Circuit breaker rejected the call without dialing out.
    CircuitOpen,
    /// Model output or upstream body could not be parsed.
    Parse,
    /// Unexpected fault caught at the pipeline boundary.
    Internal,
    /// Administrative input failed validation.
    Validation,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "NOT_CONFIGURED"),
            Self::NoModel => write!(f, "NO_MODEL"),
            Self::InvalidModel => write!(f, "INVALID_MODEL"),
            Self::UnknownProvider => write!(f, "UNKNOWN_PROVIDER"),
            Self::ProviderUnavailable => write!(f, "PROVIDER_UNAVAILABLE"),
            Self::AiUnavailable => write!(f, "AI_UNAVAILABLE"),
            Self::Http(status) => write!(f, "HTTP_{}", status),
            Self::Transport => write!(f, "TRANSPORT_ERROR"),
            Self::CircuitOpen => write!(f, "CIRCUIT_OPEN"),
            Self::Parse => write!(f, "PARSE_ERROR"),
            Self::Internal => write!(f, "INTERNAL_ERROR"),
            Self::Validation => write!(f, "VALIDATION_ERROR"),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Inbound request and collaborator signals
// =============================================================================

/// Inbound ticket to classify. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    /// Ticket subject.
    pub subject: String,
    /// Ticket body (optional, will be sanitized and truncated).
    pub body: Option<String>,
    /// Sender email (optional, will be masked).
    pub sender_email: Option<String>,
    /// Source system ticket id, used for the cache fingerprint.
    pub ticket_id: Option<String>,
    /// Explicit provider override; registry default when absent.
    pub provider: Option<String>,
    /// Explicit model override; provider default when absent.
    pub model: Option<String>,
    /// Correlation id for tracing; generated when absent.
    pub correlation_id: Option<String>,
}

/// PII-scrubbed, length-bounded ticket produced by the sanitizer.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTicket {
    pub subject: String,
    pub body: String,
    pub masked_sender: String,
}

/// Sentiment label derived from the lexicon score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Lexicon-derived sentiment and urgency signal.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SentimentSignal {
    /// Sentiment score in [-1.0, 1.0].
    pub score: f64,
    pub label: SentimentLabel,
    pub urgency_detected: bool,
    /// Criticality in 0..=3: +1 for negative sentiment, +2 for urgency.
    pub criticality_score: u8,
    /// True when criticality_score >= 2.
    pub should_increase_severity: bool,
}

impl SentimentSignal {
    /// Neutral signal used for empty input.
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
            urgency_detected: false,
            criticality_score: 0,
            should_increase_severity: false,
        }
    }
}

// =============================================================================
// Provider wire types
// =============================================================================

/// Wire-level request routed to an LLM provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Provider hint; resolved against the registry by the router.
    pub provider: Option<String>,
    /// Model hint; resolved against the registry by the router.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    /// Minimal synthetic request used by connectivity checks.
    pub fn connection_test() -> Self {
        Self {
            system_prompt: "Responda apenas com JSON: {\"status\": \"ok\"}".to_string(),
            user_prompt: "Teste de conexao".to_string(),
            provider: None,
            model: None,
            temperature: Some(0.0),
            max_tokens: Some(20),
        }
    }
}

/// Wire-level response from an LLM provider.
///
/// Total by construction: every outcome of an outbound call, including
/// transport failure, is represented here with `success = false` and a
/// populated error code. The router and clients never raise for this class
/// of failure.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub success: bool,
    /// Model output; expected to be a JSON object string on success.
    pub content: Option<String>,
    pub model: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub latency_ms: u64,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

impl ProviderResponse {
    /// Build a success response.
    pub fn ok(content: impl Into<String>, model: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            model: Some(model.into()),
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            latency_ms,
            error_code: None,
            error_message: None,
        }
    }

    /// Build a failure response.
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            model: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            latency_ms: 0,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }

    /// Attach the model id to a response.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach token usage to a response.
    pub fn with_usage(mut self, prompt: u32, completion: u32, total: u32) -> Self {
        self.prompt_tokens = Some(prompt);
        self.completion_tokens = Some(completion);
        self.total_tokens = Some(total);
        self
    }

    /// Attach the measured latency to a response.
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

// =============================================================================
// Classification result
// =============================================================================

/// Final disposition of a classification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    /// Confidence met the threshold and the service id is valid.
    Applied,
    /// Service id is valid but confidence fell below the threshold.
    Partial,
    /// No valid classification; routed to the fallback queue.
    Manual,
    /// The request itself could not be processed.
    NotApplied,
}

impl fmt::Display for ClassificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Partial => write!(f, "partial"),
            Self::Manual => write!(f, "manual"),
            Self::NotApplied => write!(f, "not_applied"),
        }
    }
}

/// Final decision returned to the caller. Always well-formed; failure
/// information is inspectable through `status` and `error_code`.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub success: bool,
    pub status: ClassificationStatus,
    pub correlation_id: String,
    /// Classified type: REQ, INC or OS.
    #[serde(rename = "type")]
    pub ticket_type: Option<String>,
    /// Catalog service id (e.g. REQ-101).
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    /// Destination queue, catalog-authoritative when the service is valid.
    pub queue: Option<String>,
    /// Model-reported confidence in [0, 1], trusted as given.
    pub confidence_score: Option<f64>,
    pub threshold_met: bool,
    pub sentiment_score: Option<f64>,
    pub sentiment_label: Option<SentimentLabel>,
    pub urgency_detected: bool,
    pub criticality_score: Option<u8>,
    pub should_increase_severity: bool,
    pub processing_time_ms: u64,
    pub message: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub sanitized_subject: Option<String>,
    pub sanitized_body_summary: Option<String>,
    pub masked_sender: Option<String>,
}

// =============================================================================
// Deployments
// =============================================================================

/// One usable model on one provider, with its own default sampling
/// parameters.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    /// Model id (e.g. gpt-4o-mini).
    pub model_id: String,
    /// Provider-side deployment name (Azure resource deployments).
    pub deployment_name: String,
    /// Display name for administrative listings.
    pub display_name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub default_temperature: f64,
    pub default_max_tokens: u32,
}
