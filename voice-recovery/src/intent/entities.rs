//! Entity extraction: amounts, bill types and recipients
//!
//! The strict pass runs with every classification. The loose pass is only
//! used by entity-extraction recovery: bare numbers, written numbers,
//! colloquial recipient markers and bill-type synonyms.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::intent::types::{EntityKind, ExtractedEntity};
use crate::normalizer::{fold, is_stop_word};

static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)r\$\s*(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?)").unwrap()
});

static REAIS_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:[.,]\d{1,2})?)\s*(?:reais|real)\b")
        .unwrap()
});

static BILL_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(luz|água|agua|internet|telefone|aluguel|cartão|cartao|gás|gas|condomínio|condominio)\b")
        .unwrap()
});

static RECIPIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpara\s+(?:o\s+|a\s+)?((?:minha|meu)\s+)?(\p{L}{2,})").unwrap()
});

static BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+(?:[.,]\d+)*)\b").unwrap());

static WRITTEN_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    let word = r"(?:dez|vinte|trinta|quarenta|cinquenta|sessenta|setenta|oitenta|noventa|cem|cento|duzentos|trezentos|quatrocentos|quinhentos|seiscentos|setecentos|oitocentos|novecentos|mil)";
    Regex::new(&format!(r"(?i)\b{word}(?:\s+e\s+{word})*\b")).unwrap()
});

static LOOSE_RECIPIENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:pro|pra|pros|pras|ao|à)\s+((?:minha|meu)\s+)?(\p{L}{2,})").unwrap()
});

static BILL_SYNONYM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(energia|eletricidade|celular|wifi|wi-fi|net|fatura|moradia|saneamento)\b")
        .unwrap()
});

/// Words that follow "para" but are not recipients
const NON_RECIPIENTS: &[&str] = &[
    "mim", "voce", "ele", "ela", "hoje", "amanha", "ontem", "agora", "conta", "pagar", "ver",
    "saber", "mes", "semana", "ano", "gastar", "transferir", "fazer", "minha", "meu",
];

/// Canonical bill type for a folded word, if it is one
fn canonical_bill(word: &str) -> Option<&'static str> {
    match word {
        "luz" | "energia" | "eletricidade" => Some("luz"),
        "agua" | "saneamento" => Some("agua"),
        "internet" | "wifi" | "wi fi" | "net" => Some("internet"),
        "telefone" | "celular" => Some("telefone"),
        "aluguel" | "moradia" => Some("aluguel"),
        "cartao" | "fatura" => Some("cartao"),
        "gas" => Some("gas"),
        "condominio" => Some("condominio"),
        _ => None,
    }
}

fn written_number_value(word: &str) -> Option<f64> {
    let v = match word {
        "dez" => 10.0,
        "vinte" => 20.0,
        "trinta" => 30.0,
        "quarenta" => 40.0,
        "cinquenta" => 50.0,
        "sessenta" => 60.0,
        "setenta" => 70.0,
        "oitenta" => 80.0,
        "noventa" => 90.0,
        "cem" | "cento" => 100.0,
        "duzentos" => 200.0,
        "trezentos" => 300.0,
        "quatrocentos" => 400.0,
        "quinhentos" => 500.0,
        "seiscentos" => 600.0,
        "setecentos" => 700.0,
        "oitocentos" => 800.0,
        "novecentos" => 900.0,
        "mil" => 1000.0,
        _ => return None,
    };
    Some(v)
}

/// Parse a Brazilian-formatted number: `1.200,50` → 1200.5, `150.5` → 150.5.
pub fn parse_brl_amount(raw: &str) -> Option<f64> {
    let cleaned = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else if raw.matches('.').count() > 1
        || raw.split('.').nth(1).is_some_and(|frac| frac.len() == 3)
    {
        raw.replace('.', "")
    } else {
        raw.to_string()
    };
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn amount_entity(raw: &str, value: f64, confidence: f64, span: (usize, usize)) -> ExtractedEntity {
    ExtractedEntity::new(
        EntityKind::Amount,
        raw,
        format!("{:.2}", value),
        confidence,
        span,
    )
    .with_metadata("currency", "BRL")
}

fn recipient_entity(caps: &Captures<'_>, confidence: f64) -> Option<ExtractedEntity> {
    let name = caps.get(2)?;
    let folded = fold(name.as_str());
    if is_stop_word(&folded) || NON_RECIPIENTS.contains(&folded.as_str()) {
        return None;
    }
    if canonical_bill(&folded).is_some() {
        return None;
    }
    let start = caps.get(1).map(|m| m.start()).unwrap_or(name.start());
    let raw = &caps.get(0)?.as_str()[start - caps.get(0)?.start()..];
    let mut entity = ExtractedEntity::new(
        EntityKind::Recipient,
        raw,
        folded,
        confidence,
        (start, name.end()),
    );
    if caps.get(1).is_some() {
        entity = entity.with_metadata("relation", "family_or_close");
    }
    Some(entity)
}

fn overlaps(a: &ExtractedEntity, b: &ExtractedEntity) -> bool {
    a.span_start < b.span_end && b.span_start < a.span_end
}

fn push_unique(entities: &mut Vec<ExtractedEntity>, candidate: ExtractedEntity) {
    if !entities
        .iter()
        .any(|e| e.kind == candidate.kind && overlaps(e, &candidate))
    {
        entities.push(candidate);
    }
}

/// Stateless extractor; spans are byte offsets into the lowercased input.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Strict pass. Entities of one kind are never merged.
    pub fn extract(&self, text: &str) -> Vec<ExtractedEntity> {
        let lowered = text.to_lowercase();
        let mut entities = Vec::new();

        for caps in CURRENCY_AMOUNT.captures_iter(&lowered) {
            let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Some(value) = parse_brl_amount(num.as_str()) {
                push_unique(
                    &mut entities,
                    amount_entity(whole.as_str(), value, 0.95, (whole.start(), whole.end())),
                );
            }
        }
        for caps in REAIS_AMOUNT.captures_iter(&lowered) {
            let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Some(value) = parse_brl_amount(num.as_str()) {
                push_unique(
                    &mut entities,
                    amount_entity(whole.as_str(), value, 0.9, (whole.start(), whole.end())),
                );
            }
        }
        for m in BILL_TYPE.find_iter(&lowered) {
            if let Some(bill) = canonical_bill(&fold(m.as_str())) {
                push_unique(
                    &mut entities,
                    ExtractedEntity::new(
                        EntityKind::BillType,
                        m.as_str(),
                        bill,
                        0.9,
                        (m.start(), m.end()),
                    ),
                );
            }
        }
        for caps in RECIPIENT.captures_iter(&lowered) {
            if let Some(entity) = recipient_entity(&caps, 0.8) {
                push_unique(&mut entities, entity);
            }
        }

        entities
    }

    /// Strict pass followed by the looser rules; entities the strict pass
    /// already covers are not duplicated.
    pub fn extract_loose(&self, text: &str) -> Vec<ExtractedEntity> {
        let lowered = text.to_lowercase();
        let mut entities = self.extract(text);

        for caps in BARE_NUMBER.captures_iter(&lowered) {
            let Some(num) = caps.get(1) else { continue };
            if let Some(value) = parse_brl_amount(num.as_str()) {
                push_unique(
                    &mut entities,
                    amount_entity(num.as_str(), value, 0.6, (num.start(), num.end()))
                        .with_metadata("source", "bare_number"),
                );
            }
        }
        for m in WRITTEN_NUMBER.find_iter(&lowered) {
            let value: Option<f64> = m
                .as_str()
                .split_whitespace()
                .filter(|w| *w != "e")
                .map(written_number_value)
                .sum();
            if let Some(value) = value {
                push_unique(
                    &mut entities,
                    amount_entity(m.as_str(), value, 0.55, (m.start(), m.end()))
                        .with_metadata("source", "written_number"),
                );
            }
        }
        for m in BILL_SYNONYM.find_iter(&lowered) {
            if let Some(bill) = canonical_bill(&fold(m.as_str())) {
                push_unique(
                    &mut entities,
                    ExtractedEntity::new(
                        EntityKind::BillType,
                        m.as_str(),
                        bill,
                        0.6,
                        (m.start(), m.end()),
                    )
                    .with_metadata("source", "synonym"),
                );
            }
        }
        for caps in LOOSE_RECIPIENT.captures_iter(&lowered) {
            if let Some(entity) = recipient_entity(&caps, 0.6) {
                push_unique(&mut entities, entity.with_metadata("source", "colloquial"));
            }
        }

        entities
    }
}
