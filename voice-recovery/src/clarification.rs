//! Clarification questions for when automated recovery gives up
//!
//! Output depends only on the diagnosis kind, the financial snapshot and
//! the regional tag. Hints never change what the primary question asks.

use serde::{Deserialize, Serialize};

use crate::context::RecoveryContext;
use crate::diagnosis::{ErrorDiagnosis, ErrorKind};
use crate::dialect::Region;

/// User-facing follow-up payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationRequest {
    pub primary_question: String,
    pub follow_ups: Vec<String>,
    pub hints: Vec<String>,
    pub suggested_utterances: Vec<String>,
}

struct Template {
    question: &'static str,
    follow_ups: &'static [&'static str],
    suggestions: &'static [&'static str],
}

fn template(kind: ErrorKind) -> Template {
    match kind {
        ErrorKind::PatternMiss => Template {
            question: "Não entendi o que você quer fazer. Pode repetir de outro jeito?",
            follow_ups: &[
                "Você quer ver seu saldo, pagar uma conta ou fazer uma transferência?",
            ],
            suggestions: &["qual é meu saldo", "pagar a conta de luz", "transferir 50 reais para Maria"],
        },
        ErrorKind::EntityExtraction => Template {
            question: "Qual é o valor e para quem você quer fazer isso?",
            follow_ups: &["Qual é o valor, em reais?", "Para quem é?", "Qual conta você quer pagar?"],
            suggestions: &["transferir 100 reais para João", "pagar a conta de água"],
        },
        ErrorKind::IntentConfusion => Template {
            question: "Fiquei em dúvida. O que exatamente você quer fazer?",
            follow_ups: &["Pode me dizer em poucas palavras?"],
            suggestions: &["ver meu orçamento", "quanto eu ganho por mês"],
        },
        ErrorKind::LowConfidence => Template {
            question: "Não tenho certeza se entendi. Pode confirmar o que você quer?",
            follow_ups: &["Pode falar um pouco mais devagar?"],
            suggestions: &["qual é meu saldo", "ver meu orçamento"],
        },
        ErrorKind::RegionalMisunderstanding => Template {
            question: "Não reconheci algumas palavras. Pode dizer de outro jeito?",
            follow_ups: &["Que palavra você usaria para dinheiro ou reais?"],
            suggestions: &["quanto dinheiro eu tenho", "transferir 20 reais para Ana"],
        },
        ErrorKind::ProcessingError => Template {
            question: "Tive um problema para processar seu pedido. Pode tentar de novo?",
            follow_ups: &[],
            suggestions: &["qual é meu saldo"],
        },
    }
}

fn regional_hint(region: Region) -> Option<&'static str> {
    match region {
        Region::Sul => Some("Bah, pode falar do teu jeito, só tenta usar \"reais\" para os valores."),
        Region::Nordeste => Some("Oxe, sem problema! Tente dizer o valor em reais."),
        Region::Sudeste => Some("Pode falar \"reais\" em vez de \"conto\" ou \"pau\"."),
        Region::Norte => Some("Égua, quase! Tente usar palavras como \"saldo\" ou \"pagar\"."),
        Region::CentroOeste => Some("Tente usar palavras como \"saldo\" ou \"transferir\"."),
        Region::Unknown => None,
    }
}

/// Builds clarification requests; holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarificationGenerator;

impl ClarificationGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, diagnosis: &ErrorDiagnosis, context: &RecoveryContext) -> ClarificationRequest {
        let template = template(diagnosis.kind);
        let mut hints = Vec::new();

        let snapshot = &context.financial_snapshot;
        if snapshot.has_pending_bills() {
            let bills: Vec<&str> = snapshot
                .pending_bills
                .iter()
                .map(|b| b.bill_type.as_str())
                .collect();
            hints.push(format!("Você tem contas pendentes: {}.", bills.join(", ")));
        }
        if diagnosis.kind == ErrorKind::EntityExtraction {
            if let Some(last) = snapshot.recent_transfers.last() {
                hints.push(format!(
                    "Sua última transferência foi para {} (R$ {:.2}).",
                    last.recipient, last.amount
                ));
            }
        }

        let region = diagnosis
            .dialect
            .as_ref()
            .map(|t| t.region)
            .filter(Region::is_known)
            .or_else(|| context.regional_tag.as_ref().map(|t| t.region))
            .unwrap_or(Region::Unknown);
        if let Some(hint) = regional_hint(region) {
            hints.push(hint.to_string());
        }

        ClarificationRequest {
            primary_question: template.question.to_string(),
            follow_ups: template.follow_ups.iter().map(|s| s.to_string()).collect(),
            hints,
            suggested_utterances: template.suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }
}
