//! Service catalog.
//!
//! Authoritative list of triage queues and catalog services. The model only
//! ever picks a service id; the name, queue, and domain attached to the
//! result always come from here, so a hallucinated name can never leak into
//! the outcome. The built-in catalog mirrors the service desk portfolio;
//! `from_entries` exists for deployments that load their own.

use std::collections::HashMap;

use serde::Serialize;

/// A triage queue tickets are routed to.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// One classifiable service in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    /// Service id, e.g. REQ-101.
    pub id: String,
    /// REQ, INC or OS.
    pub ticket_type: String,
    pub name: String,
    pub description: String,
    /// Human-readable domain grouping.
    pub domain: String,
    pub queue_id: String,
}

// (id, name, description)
const BUILTIN_QUEUES: &[(&str, &str, &str)] = &[
    ("Q-001", "Service Desk (1o Nivel)", "Triagem inicial e resolucao de problemas simples"),
    ("Q-010", "Identidade e Acesso", "Usuarios, senhas, permissoes, acessos"),
    ("Q-020", "Estacoes de Trabalho", "Desktops, notebooks, perifericos"),
    ("Q-030", "Software e Aplicacoes", "Instalacoes e configuracoes de software"),
    ("Q-040", "Impressoras", "Impressoras e multifuncionais"),
    ("Q-050", "Banco de Dados", "Performance, restore, adequacoes de BD"),
    ("Q-060", "Infraestrutura", "Redes, servidores, storage, telefonia"),
    ("Q-070", "Sistemas Corporativos", "Erros e falhas em sistemas"),
    ("Q-080", "Manutencoes e Projetos", "Atividades agendadas e projetos"),
];

// (id, type, name, description, domain, queue_id)
const BUILTIN_SERVICES: &[(&str, &str, &str, &str, &str, &str)] = &[
    // Identidade e Acesso
    ("REQ-100", "REQ", "Gestao de Identidade e Acesso", "Usuarios, senhas, acessos e permissoes", "Identidade e Acesso", "Q-010"),
    ("REQ-101", "REQ", "Resetar Senha de Usuario", "Reset de senha da rede, email ou sistema", "Identidade e Acesso", "Q-010"),
    ("REQ-102", "REQ", "Criar Conta de Usuario", "Criar novo login/conta de usuario", "Identidade e Acesso", "Q-010"),
    ("REQ-103", "REQ", "Conceder Permissao em Sistema", "Liberacao de acesso a sistemas/aplicacoes", "Identidade e Acesso", "Q-010"),
    ("REQ-104", "REQ", "Habilitar Acesso a Rede", "Liberacao de acesso a rede corporativa", "Identidade e Acesso", "Q-010"),
    ("REQ-105", "REQ", "Acesso a Caixa de Email Compartilhada", "Acesso a mailbox compartilhada", "Identidade e Acesso", "Q-010"),
    ("REQ-106", "REQ", "Permissao em Pasta de Rede", "Adicionar acesso a pasta compartilhada", "Identidade e Acesso", "Q-010"),
    ("REQ-107", "REQ", "Desativar Conta de Usuario", "Desativacao/exclusao de conta", "Identidade e Acesso", "Q-010"),
    ("REQ-108", "REQ", "Acesso VPN", "Solicitacao ou configuracao de VPN", "Identidade e Acesso", "Q-010"),
    ("REQ-109", "REQ", "Inclusao em Grupo de Seguranca", "Adicionar usuario a grupos do AD/LDAP", "Identidade e Acesso", "Q-010"),
    ("REQ-110", "REQ", "Liberacao de Acesso Especial", "Acessos fora do padrao", "Identidade e Acesso", "Q-010"),
    ("REQ-111", "REQ", "Problema com Login", "Login nao funciona ou conta bloqueada", "Identidade e Acesso", "Q-010"),
    // Estacoes de Trabalho
    ("REQ-200", "REQ", "Gestao de Estacoes de Trabalho", "Desktops, notebooks e perifericos", "Estacoes de Trabalho", "Q-020"),
    ("REQ-201", "REQ", "Configurar Estacao de Trabalho", "Configuracao de desktop/notebook", "Estacoes de Trabalho", "Q-020"),
    ("REQ-202", "REQ", "Instalar Nova Estacao", "Instalacao completa de equipamento novo", "Estacoes de Trabalho", "Q-020"),
    ("REQ-203", "REQ", "Reparo de Estacao de Trabalho", "Reparacao de hardware/software", "Estacoes de Trabalho", "Q-020"),
    ("REQ-204", "REQ", "Remanejar Equipamento", "Movimentacao de equipamento", "Estacoes de Trabalho", "Q-020"),
    ("REQ-205", "REQ", "Substituir Equipamento", "Troca por defeito ou upgrade", "Estacoes de Trabalho", "Q-020"),
    ("REQ-206", "REQ", "Suporte a Notebook", "Suporte especifico para notebooks", "Estacoes de Trabalho", "Q-020"),
    ("REQ-207", "REQ", "Suporte Desktop - Performance", "Lentidao ou performance baixa", "Estacoes de Trabalho", "Q-020"),
    // Software e Aplicacoes
    ("REQ-300", "REQ", "Gestao de Software e Aplicacoes", "Instalacao e suporte a software", "Software e Aplicacoes", "Q-030"),
    ("REQ-301", "REQ", "Instalacao de Software e Aplicativos", "Instalar softwares/aplicativos", "Software e Aplicacoes", "Q-030"),
    ("REQ-302", "REQ", "Suporte a Software", "Problemas com software instalado", "Software e Aplicacoes", "Q-030"),
    ("REQ-303", "REQ", "Remocao de Software", "Desinstalar aplicativos", "Software e Aplicacoes", "Q-030"),
    ("REQ-304", "REQ", "Servicos de Diretorio", "Configuracoes de AD/LDAP", "Software e Aplicacoes", "Q-030"),
    ("REQ-305", "REQ", "Atualizacao de Antivirus", "Atualizar ou corrigir antivirus", "Software e Aplicacoes", "Q-030"),
    // Impressoras
    ("REQ-400", "REQ", "Gestao de Impressoras", "Suporte a impressoras e multifuncionais", "Impressoras", "Q-040"),
    ("REQ-401", "REQ", "Configurar Impressora", "Configuracao de impressoras", "Impressoras", "Q-040"),
    ("REQ-402", "REQ", "Instalar Nova Impressora", "Instalacao de impressora", "Impressoras", "Q-040"),
    ("REQ-403", "REQ", "Reparo de Impressora", "Manutencao e reparo", "Impressoras", "Q-040"),
    ("REQ-404", "REQ", "Suprimentos de Impressao", "Toner, papel etc", "Impressoras", "Q-040"),
    // Banco de Dados
    ("REQ-500", "REQ", "Banco de Dados", "Servicos de banco de dados", "Banco de Dados", "Q-050"),
    ("REQ-501", "REQ", "Adequacao de Base de Dados", "Ajustar base para nova versao", "Banco de Dados", "Q-050"),
    ("REQ-502", "REQ", "Analise de Impacto de Mudanca", "Avaliar impacto de mudancas", "Banco de Dados", "Q-050"),
    ("REQ-503", "REQ", "Restore de Banco de Dados", "Restaurar dados", "Banco de Dados", "Q-050"),
    ("REQ-504", "REQ", "Requisicao Especializada - BD", "Demanda de banco nao padronizada", "Banco de Dados", "Q-050"),
    // Infraestrutura
    ("REQ-600", "REQ", "Infraestrutura e Redes", "Servicos de rede e infraestrutura", "Infraestrutura", "Q-060"),
    ("REQ-601", "REQ", "Ponto de Rede", "Instalacao/configuracao", "Infraestrutura", "Q-060"),
    ("REQ-602", "REQ", "Rede Sem Fio", "Configuracao de WiFi/AP", "Infraestrutura", "Q-060"),
    ("REQ-603", "REQ", "Infraestrutura de Cabeamento", "Cabos e infraestrutura fisica", "Infraestrutura", "Q-060"),
    ("REQ-604", "REQ", "Acesso Remoto (VPN)", "VPN na estacao", "Infraestrutura", "Q-060"),
    ("INC-200", "INC", "Infraestrutura de Rede", "Falhas em redes e conectividade", "Infraestrutura", "Q-060"),
    ("INC-201", "INC", "Falha em Ponto de Acesso WiFi", "AP nao funciona", "Infraestrutura", "Q-060"),
    ("INC-202", "INC", "Indisponibilidade de Internet", "Sem acesso a internet", "Infraestrutura", "Q-060"),
    ("INC-203", "INC", "Falha na Rede Local", "Problemas internos de rede", "Infraestrutura", "Q-060"),
    ("INC-204", "INC", "Falha em Ponto de Rede", "Ponto de rede nao funciona", "Infraestrutura", "Q-060"),
    ("INC-400", "INC", "Telefonia", "Falhas no servico de telefonia", "Infraestrutura", "Q-060"),
    ("INC-401", "INC", "Falha no Servico de Telefonia", "Telefone/ramal nao funciona", "Infraestrutura", "Q-060"),
    // Sistemas Corporativos
    ("INC-100", "INC", "Sistemas Corporativos", "Falhas em aplicacoes e sistemas", "Sistemas Corporativos", "Q-070"),
    ("INC-101", "INC", "Falha em Sistema Corporativo", "Sistema indisponivel/lento", "Sistemas Corporativos", "Q-070"),
    ("INC-102", "INC", "Erro de Sistema", "Mensagem de erro", "Sistemas Corporativos", "Q-070"),
    ("INC-103", "INC", "Falha em Aplicacao", "Aplicacao nao funciona", "Sistemas Corporativos", "Q-070"),
    ("INC-104", "INC", "Suporte Sistema - Outros", "Outros problemas de sistema", "Sistemas Corporativos", "Q-070"),
    ("INC-300", "INC", "Aplicacoes de Comunicacao", "Problemas com email e comunicacao", "Sistemas Corporativos", "Q-070"),
    ("INC-301", "INC", "Falha no Cliente de Email", "Outlook nao funciona", "Sistemas Corporativos", "Q-070"),
    ("INC-302", "INC", "Problema em Caixa Postal", "Caixa de email com erro", "Sistemas Corporativos", "Q-070"),
    ("INC-303", "INC", "Problema de Acesso ao Email", "Nao consegue acessar email", "Sistemas Corporativos", "Q-070"),
    ("INC-304", "INC", "Suporte Email - Outros", "Outros problemas de email", "Sistemas Corporativos", "Q-070"),
    // Manutencoes e Projetos
    ("OS-100", "OS", "Manutencoes Preventivas", "Atividades programadas", "Manutencoes e Projetos", "Q-080"),
    ("OS-200", "OS", "Atividades Agendadas", "Instalacoes/configuracoes planejadas", "Manutencoes e Projetos", "Q-080"),
    ("OS-300", "OS", "Projetos", "Implementacoes de projeto", "Manutencoes e Projetos", "Q-080"),
];

pub struct ServiceCatalog {
    queues: Vec<QueueEntry>,
    services: Vec<CatalogEntry>,
    queue_index: HashMap<String, usize>,
    service_index: HashMap<String, usize>,
}

impl ServiceCatalog {
    /// Catalog shipped with the engine.
    pub fn builtin() -> Self {
        let queues = BUILTIN_QUEUES
            .iter()
            .map(|(id, name, description)| QueueEntry {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect();
        let services = BUILTIN_SERVICES
            .iter()
            .map(|(id, ticket_type, name, description, domain, queue_id)| CatalogEntry {
                id: id.to_string(),
                ticket_type: ticket_type.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                domain: domain.to_string(),
                queue_id: queue_id.to_string(),
            })
            .collect();
        Self::from_entries(queues, services)
    }

    /// Build a catalog from externally loaded entries, preserving order.
    pub fn from_entries(queues: Vec<QueueEntry>, services: Vec<CatalogEntry>) -> Self {
        let queue_index = queues
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();
        let service_index = services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self {
            queues,
            services,
            queue_index,
            service_index,
        }
    }

    pub fn service(&self, service_id: &str) -> Option<&CatalogEntry> {
        self.service_index
            .get(service_id)
            .map(|&i| &self.services[i])
    }

    pub fn queue(&self, queue_id: &str) -> Option<&QueueEntry> {
        self.queue_index.get(queue_id).map(|&i| &self.queues[i])
    }

    /// The queue a service routes to.
    pub fn queue_for_service(&self, service_id: &str) -> Option<&QueueEntry> {
        self.service(service_id)
            .and_then(|s| self.queue(&s.queue_id))
    }

    pub fn is_valid_service_id(&self, service_id: &str) -> bool {
        self.service_index.contains_key(service_id)
    }

    /// Domain grouping for a service.
    pub fn domain_for_service(&self, service_id: &str) -> Option<&str> {
        self.service(service_id).map(|s| s.domain.as_str())
    }

    /// All services, in catalog order.
    pub fn services(&self) -> &[CatalogEntry] {
        &self.services
    }

    /// All queues, in catalog order.
    pub fn queues(&self) -> &[QueueEntry] {
        &self.queues
    }
}
