//! Lexicon-based sentiment and urgency signal.
//!
//! Weighted Portuguese term lists scored against the lowercased ticket
//! text. The signal never blocks classification; it feeds the prompt as a
//! hint and the result as triage metadata. Matching is boundary-aware so
//! "lento" does not fire inside "violento".

use regex::Regex;

use triage_core::{SentimentLabel, SentimentSignal};

/// Negative terms with weights; multi-word phrases match as a unit.
const NEGATIVE_TERMS: &[(&str, f64)] = &[
    ("urgente", 0.30),
    ("parado", 0.25),
    ("travado", 0.25),
    ("erro", 0.20),
    ("falha", 0.20),
    ("nao funciona", 0.35),
    ("não funciona", 0.35),
    ("fora do ar", 0.40),
    ("indisponivel", 0.30),
    ("indisponível", 0.30),
    ("lento", 0.15),
    ("lentidao", 0.15),
    ("lentidão", 0.15),
    ("problema", 0.15),
    ("critico", 0.30),
    ("crítico", 0.30),
    ("bloqueado", 0.25),
    ("perdi", 0.20),
    ("prejuizo", 0.35),
    ("prejuízo", 0.35),
    ("reclamacao", 0.25),
    ("reclamação", 0.25),
    ("insatisfeito", 0.30),
    ("pessimo", 0.35),
    ("péssimo", 0.35),
];

const POSITIVE_TERMS: &[(&str, f64)] = &[
    ("obrigado", 0.20),
    ("obrigada", 0.20),
    ("agradeco", 0.25),
    ("agradeço", 0.25),
    ("resolvido", 0.30),
    ("funcionou", 0.30),
    ("excelente", 0.35),
    ("otimo", 0.30),
    ("ótimo", 0.30),
    ("parabens", 0.30),
    ("parabéns", 0.30),
    ("perfeito", 0.30),
];

/// Terms that flag the ticket as urgent regardless of polarity.
const URGENCY_TERMS: &[&str] = &[
    "urgente",
    "urgencia",
    "urgência",
    "imediato",
    "imediatamente",
    "critico",
    "crítico",
    "emergencia",
    "emergência",
    "parou tudo",
    "fora do ar",
    "producao parada",
    "produção parada",
];

pub struct SentimentAnalyzer {
    negative: Vec<(Regex, f64)>,
    positive: Vec<(Regex, f64)>,
    urgency: Vec<Regex>,
}

fn boundary_pattern(term: &str) -> Regex {
    // \b does not treat accented letters as word characters the way we
    // need, so spell the boundary out with explicit letter classes.
    let escaped = regex::escape(term);
    Regex::new(&format!(
        r"(?i)(^|[^\p{{L}}]){}($|[^\p{{L}}])",
        escaped
    ))
    .unwrap()
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            negative: NEGATIVE_TERMS
                .iter()
                .map(|(t, w)| (boundary_pattern(t), *w))
                .collect(),
            positive: POSITIVE_TERMS
                .iter()
                .map(|(t, w)| (boundary_pattern(t), *w))
                .collect(),
            urgency: URGENCY_TERMS.iter().map(|t| boundary_pattern(t)).collect(),
        }
    }

    /// Score the combined subject and body text.
    pub fn analyze(&self, subject: &str, body: &str) -> SentimentSignal {
        let text = format!("{} {}", subject, body).to_lowercase();
        if text.trim().is_empty() {
            return SentimentSignal::neutral();
        }

        let negative: f64 = self
            .negative
            .iter()
            .filter(|(re, _)| re.is_match(&text))
            .map(|(_, w)| w)
            .sum();
        let positive: f64 = self
            .positive
            .iter()
            .filter(|(re, _)| re.is_match(&text))
            .map(|(_, w)| w)
            .sum();

        let score = ((positive - negative).clamp(-1.0, 1.0) * 100.0).round() / 100.0;
        let label = if score >= 0.1 {
            SentimentLabel::Positive
        } else if score <= -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        let urgency_detected = self.urgency.iter().any(|re| re.is_match(&text));

        let mut criticality: u8 = 0;
        if label == SentimentLabel::Negative {
            criticality += 1;
        }
        if urgency_detected {
            criticality += 2;
        }

        SentimentSignal {
            score,
            label,
            urgency_detected,
            criticality_score: criticality,
            should_increase_severity: criticality >= 2,
        }
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
