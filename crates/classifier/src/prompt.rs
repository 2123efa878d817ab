//! Prompt builder.
//!
//! Renders the service catalog into the system prompt so the model can only
//! choose among real services, and assembles the per-ticket user prompt
//! with the sentiment hints appended to the summary.

use std::fmt::Write as _;
use std::sync::Arc;

use triage_core::{SentimentLabel, SentimentSignal};

use crate::catalog::ServiceCatalog;

/// System and user prompt pair ready for the gateway.
#[derive(Debug, Clone)]
pub struct PromptResult {
    pub system_prompt: String,
    pub user_prompt: String,
}

pub struct PromptBuilder {
    catalog: Arc<ServiceCatalog>,
    system_prompt: String,
}

impl PromptBuilder {
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        let system_prompt = render_system_prompt(&catalog);
        Self {
            catalog,
            system_prompt,
        }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Build the prompt pair for one sanitized ticket. The sentiment hints
    /// and the similar-ticket context are optional.
    pub fn build(
        &self,
        subject: &str,
        body: &str,
        sentiment: Option<&SentimentSignal>,
        similar_context: Option<&str>,
    ) -> PromptResult {
        let mut user_prompt = String::with_capacity(256);
        user_prompt.push_str("### Ticket a Classificar\n");
        let _ = writeln!(user_prompt, "Assunto: \"{}\"", subject);

        let mut summary = body.to_string();
        if let Some(signal) = sentiment {
            if signal.label != SentimentLabel::Neutral {
                let _ = write!(summary, " [Sentimento: {}]", signal.label);
            }
            if signal.urgency_detected {
                summary.push_str(" [Urgencia detectada]");
            }
        }
        let _ = writeln!(user_prompt, "Resumo: \"{}\"", summary);

        if let Some(context) = similar_context.filter(|c| !c.trim().is_empty()) {
            let _ = write!(
                user_prompt,
                "\n### Contexto de tickets similares:\n{}\n",
                context
            );
        }

        PromptResult {
            system_prompt: self.system_prompt.clone(),
            user_prompt,
        }
    }
}

fn render_system_prompt(catalog: &ServiceCatalog) -> String {
    let mut prompt = String::with_capacity(8 * 1024);

    prompt.push_str(
        "Voce e um classificador de tickets corporativos para o sistema de Service Desk.\n\
         \n\
         Sua tarefa e:\n\
         1. Classificar o ticket em: Tipo (REQ, INC ou OS).\n\
         2. Selecionar o servico final mais adequado dentre a lista fornecida.\n\
         3. Calcular um \"confidence_score\" entre 0 e 1.\n\
         4. Retornar APENAS no formato JSON.\n\
         5. Se nao houver correspondencia clara, retornar confidence_score < 0.75.\n\
         \n\
         ================================================================\n\
         CATALOGO DE SERVICOS\n\
         ================================================================\n\
         \n\
         --- FILAS DISPONIVEIS ---\n",
    );

    for queue in catalog.queues() {
        let _ = writeln!(
            prompt,
            "{} | {} | {}",
            queue.id, queue.name, queue.description
        );
    }

    // One section per queue, in catalog order, services in catalog order.
    for queue in catalog.queues() {
        let services: Vec<_> = catalog
            .services()
            .iter()
            .filter(|s| s.queue_id == queue.id)
            .collect();
        if services.is_empty() {
            continue;
        }

        let _ = write!(
            prompt,
            "\n--- {} ({}) ---\n",
            services[0].domain.to_uppercase(),
            queue.id
        );
        for service in services {
            let _ = writeln!(
                prompt,
                "{} | {} | {} | {} | {}",
                service.id, service.ticket_type, service.name, service.description, service.domain
            );
        }
    }

    prompt.push_str(
        "\n================================================================\n\
         \n\
         ### Formato de resposta obrigatorio:\n\
         {\n\
         \x20 \"tipo\": \"REQ|INC|OS\",\n\
         \x20 \"servico_id\": \"XXX-NNN\",\n\
         \x20 \"servico_nome\": \"Nome do Servico\",\n\
         \x20 \"confidence_score\": 0.00\n\
         }\n\
         \n\
         ### Regras de classificacao:\n\
         - REQ (Requisicao): Solicitacoes planejadas como reset de senha, criacao de usuario, instalacao de software\n\
         - INC (Incidente): Interrupcoes nao planejadas como falhas, erros, indisponibilidade\n\
         - OS (Ordem de Servico): Atividades programadas como manutencoes, projetos, mudancas\n\
         - Analise palavras-chave no assunto e resumo para identificar o tipo e servico\n\
         - Se o texto indicar urgencia ou sentimento negativo, considere INC se houver problema reportado\n\
         - Retorne confidence_score >= 0.75 apenas se houver correspondencia clara com um servico\n",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(Arc::new(ServiceCatalog::builtin()))
    }

    #[test]
    fn system_prompt_embeds_the_catalog() {
        let b = builder();
        let result = b.build("VPN nao conecta", "Preciso de acesso", None, None);

        assert!(result.system_prompt.contains("--- FILAS DISPONIVEIS ---"));
        assert!(result.system_prompt.contains("--- IDENTIDADE E ACESSO (Q-010) ---"));
        assert!(result
            .system_prompt
            .contains("REQ-108 | REQ | Acesso VPN"));
        assert!(result.system_prompt.contains("confidence_score"));
    }

    #[test]
    fn user_prompt_carries_subject_and_summary() {
        let b = builder();
        let result = b.build("Resetar senha", "Esqueci minha senha da rede", None, None);

        assert!(result.user_prompt.contains("Assunto: \"Resetar senha\""));
        assert!(result
            .user_prompt
            .contains("Resumo: \"Esqueci minha senha da rede\""));
        assert!(!result.user_prompt.contains("[Sentimento:"));
    }

    #[test]
    fn sentiment_hints_are_appended() {
        let b = builder();
        let mut signal = SentimentSignal::neutral();
        signal.label = SentimentLabel::Negative;
        signal.urgency_detected = true;

        let result = b.build("Sistema fora do ar", "Nada funciona", Some(&signal), None);
        assert!(result.user_prompt.contains("[Sentimento: negative]"));
        assert!(result.user_prompt.contains("[Urgencia detectada]"));
    }

    #[test]
    fn similar_ticket_context_is_optional() {
        let b = builder();
        let with = b.build("a", "b", None, Some("T-1: REQ-101"));
        assert!(with.user_prompt.contains("### Contexto de tickets similares:"));

        let without = b.build("a", "b", None, Some("   "));
        assert!(!without.user_prompt.contains("Contexto"));
    }
}
