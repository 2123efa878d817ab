//! Ticket sanitizer.
//!
//! Strips markup, masks Brazilian-format PII before any text leaves the
//! process, normalizes whitespace, removes e-mail signatures, and bounds
//! the body length with word-aware truncation. The sanitized ticket is the
//! only form the prompt builder and the cache fingerprint ever see... with
//! the exception of the sender address, which is masked separately.

use regex::Regex;

use triage_core::config::SanitizerConfig;
use triage_core::{ClassificationRequest, SanitizedTicket};

pub struct TicketSanitizer {
    cfg: SanitizerConfig,
    html_tag: Regex,
    email: Regex,
    cnpj: Regex,
    cpf: Regex,
    card: Regex,
    phone: Regex,
    ip: Regex,
    signature: Regex,
    reply_prefix: Regex,
    ticket_ref: Regex,
    whitespace: Regex,
}

impl TicketSanitizer {
    pub fn new(cfg: SanitizerConfig) -> Self {
        // Pattern literals are static; a failure here is a programming
        // error, so unwrap is fine.
        Self {
            cfg,
            html_tag: Regex::new(r"<[^>]+>").unwrap(),
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
            cnpj: Regex::new(r"\b\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}\b").unwrap(),
            cpf: Regex::new(r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b").unwrap(),
            card: Regex::new(r"\b(?:\d{4}[ .-]){3}\d{4}\b").unwrap(),
            phone: Regex::new(r"(?:\(\d{2}\)\s?|\b\d{2}\s)?9?\d{4}[- ]\d{4}\b").unwrap(),
            ip: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
            signature: Regex::new(
                r"(?is)\n\s*(atenciosamente|cordialmente|abra[cç]os|att\.?|obrigad[oa])[\s,.].*$",
            )
            .unwrap(),
            reply_prefix: Regex::new(r"(?i)^\s*((re|fw|fwd|enc|res)\s*:\s*)+").unwrap(),
            ticket_ref: Regex::new(r"(?i)[\[(]\s*(ticket|chamado)\s*#?\s*\d+\s*[\])]").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Produce the sanitized view of an inbound ticket.
    pub fn sanitize(&self, request: &ClassificationRequest) -> SanitizedTicket {
        let subject = self.clean_subject(&request.subject);
        let body = self.clean_body(request.body.as_deref().unwrap_or_default());
        let masked_sender = request
            .sender_email
            .as_deref()
            .map(mask_email)
            .unwrap_or_default();

        SanitizedTicket {
            subject,
            body,
            masked_sender,
        }
    }

    /// Normalize a subject: drop reply/forward prefixes and inline ticket
    /// references, then mask and collapse like the body.
    pub fn clean_subject(&self, subject: &str) -> String {
        let subject = self.reply_prefix.replace(subject, "");
        let subject = self.ticket_ref.replace_all(&subject, " ");
        let subject = self.mask_pii(&subject);
        self.whitespace.replace_all(subject.trim(), " ").to_string()
    }

    fn clean_body(&self, body: &str) -> String {
        if body.trim().is_empty() {
            return String::new();
        }

        let text = self.html_tag.replace_all(body, " ");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        let text = self.signature.replace(&text, "");
        let text = self.mask_pii(&text);
        let text = self.whitespace.replace_all(text.trim(), " ").to_string();

        self.truncate(&text)
    }

    fn mask_pii(&self, text: &str) -> String {
        if !self.cfg.sanitize_pii {
            return text.to_string();
        }
        let text = self.email.replace_all(text, "[EMAIL]");
        let text = self.cnpj.replace_all(&text, "[CNPJ]");
        let text = self.cpf.replace_all(&text, "[CPF]");
        let text = self.card.replace_all(&text, "[CARD]");
        let text = self.phone.replace_all(&text, "[PHONE]");
        self.ip.replace_all(&text, "[IP]").to_string()
    }

    /// Bound the body to `body_max_length` characters, preferring to cut at
    /// a word boundary as long as that keeps at least `body_min_length`
    /// characters. Operates on character counts, never raw byte offsets.
    fn truncate(&self, text: &str) -> String {
        let max = self.cfg.body_max_length;
        if text.chars().count() <= max {
            return text.to_string();
        }

        let cut: String = text.chars().take(max).collect();
        let trimmed = match cut.rfind(' ') {
            Some(pos) if cut[..pos].chars().count() >= self.cfg.body_min_length => &cut[..pos],
            _ => cut.as_str(),
        };
        format!("{}...", trimmed.trim_end())
    }
}

/// Mask an e-mail address for logging and result echoes: first character of
/// the local part, asterisks, and the intact domain. Accepts the
/// `Name <address>` form and plain addresses.
pub fn mask_email(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let address = match (raw.find('<'), raw.find('>')) {
        (Some(open), Some(close)) if close > open => &raw[open + 1..close],
        _ => raw,
    };

    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().unwrap_or('*');
            format!("{}****@{}", first, domain)
        }
        _ => "****".to_string(),
    }
}
