//! Static intent tables: regular expressions, keywords and canonical examples
//!
//! Patterns are written against lowercased text and accept both accented and
//! unaccented spellings, so they hold for raw transcriptions and for folded
//! rewrites alike. Keywords and examples are stored folded.

use std::sync::LazyLock;

use regex::Regex;

use crate::intent::types::IntentLabel;

/// Table entry for one intent
#[derive(Debug)]
pub struct IntentSpec {
    pub intent: IntentLabel,
    pub patterns: Vec<Regex>,
    pub keywords: &'static [&'static str],
    pub examples: &'static [&'static str],
}

/// A complete pattern table; the standard table and the expanded recovery
/// table share this shape.
#[derive(Debug)]
pub struct PatternTable {
    pub specs: Vec<IntentSpec>,
}

impl PatternTable {
    pub fn spec(&self, intent: IntentLabel) -> Option<&IntentSpec> {
        self.specs.iter().find(|s| s.intent == intent)
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

const BALANCE_PATTERNS: &[&str] = &[
    r"\b(qual|quanto)\s+(é|e|tem|ta|tá)?\s*(o\s+)?(meu\s+)?saldo\b",
    r"\b(ver|veja|mostrar|mostre|mostra|consultar|checar|verificar|conferir)\s+(o\s+)?(meu\s+)?saldo\b",
    r"\bquanto\s+(dinheiro\s+)?(eu\s+)?tenho(\s+(na|em)\s+(minha\s+)?conta)?\b",
    r"\bsaldo\s+(atual|disponível|disponivel|da\s+conta|na\s+conta)\b",
];
const BALANCE_KEYWORDS: &[&str] = &["saldo", "dinheiro", "disponivel", "extrato", "tenho"];
const BALANCE_EXAMPLES: &[&str] = &[
    "qual e o meu saldo",
    "quanto dinheiro eu tenho na conta",
    "mostrar saldo disponivel",
    "ver o extrato e o saldo",
];

const PAY_BILL_PATTERNS: &[&str] = &[
    r"\b(pagar|pague|paga|quitar|quite)\s+(a\s+|o\s+|as\s+|os\s+)?(minha\s+|meu\s+|minhas\s+|meus\s+)?(conta|contas|boleto|boletos|fatura)\b",
    r"\b(pagar|pague|paga|quitar)\s+(a\s+|o\s+)?(conta\s+d[aeo]\s+)?(luz|água|agua|internet|telefone|celular|aluguel|cartão|cartao|gás|gas|condomínio|condominio|energia)\b",
    r"\bpagamento\s+d[aeo]s?\s+(conta|boleto|fatura|luz|água|agua|internet|aluguel|cartão|cartao)\b",
    r"\bboleto\s+d[aeo]\s+\w+",
];
const PAY_BILL_KEYWORDS: &[&str] = &[
    "pagar",
    "boleto",
    "fatura",
    "vencimento",
    "quitar",
    "pagamento",
    "conta de",
];
const PAY_BILL_EXAMPLES: &[&str] = &[
    "pagar a conta de luz",
    "quero pagar o boleto do aluguel",
    "pagamento da fatura do cartao",
    "quitar a conta de agua",
];

const TRANSFER_PATTERNS: &[&str] = &[
    r"\b(transferir|transfere|transfira|mandar|manda|mande|enviar|envia|envie)\s+(r\$\s*)?\d+",
    r"\b(fazer|faz|faça|faca)\s+(uma\s+|um\s+)?(transferência|transferencia|pix|ted|doc)\b",
    r"\b(transferir|transfira|mandar|mande|enviar|envie)\s+\S.*\s+para\s+\w+",
    r"\bpix\s+(de|para|pro|pra)\s+\w+",
];
const TRANSFER_KEYWORDS: &[&str] = &[
    "transferir",
    "transferencia",
    "pix",
    "enviar",
    "mandar",
    "ted",
];
const TRANSFER_EXAMPLES: &[&str] = &[
    "transferir cem reais para joao",
    "fazer um pix para maria",
    "mandar dinheiro para minha mae",
    "enviar uma transferencia",
];

const BUDGET_PATTERNS: &[&str] = &[
    r"\b(ver|como\s+está|como\s+esta|como\s+tá|como\s+ta|qual)\s+(é\s+|e\s+)?(o\s+)?(meu\s+)?(orçamento|orcamento)\b",
    r"\bquanto\s+(ainda\s+)?(posso|dá\s+pra|da\s+pra|consigo)\s+gastar\b",
    r"\b(limite|teto)\s+de\s+gastos?\b",
    r"\bquanto\s+(eu\s+)?(já\s+|ja\s+)?gastei\b",
];
const BUDGET_KEYWORDS: &[&str] = &["orcamento", "gastar", "gastos", "gastei", "limite", "despesas"];
const BUDGET_EXAMPLES: &[&str] = &[
    "como esta meu orcamento",
    "quanto ainda posso gastar este mes",
    "qual o limite de gastos",
    "quanto eu ja gastei com despesas",
];

const INCOME_PATTERNS: &[&str] = &[
    r"\bquanto\s+(eu\s+)?(ganho|ganhei|recebo|recebi|entrou)\b",
    r"\b(qual|ver)\s+(é\s+|e\s+)?(a\s+)?(minha\s+)?(renda|receita|salário|salario)\b",
    r"\b(meu\s+)?(salário|salario)\s+(já\s+|ja\s+)?(caiu|entrou)\b",
    r"\b(entradas|receitas|rendimentos)\s+d[oe]\s+(mês|mes)\b",
];
const INCOME_KEYWORDS: &[&str] = &[
    "renda",
    "salario",
    "ganho",
    "recebi",
    "receita",
    "rendimentos",
    "entradas",
];
const INCOME_EXAMPLES: &[&str] = &[
    "quanto eu ganho por mes",
    "qual e a minha renda",
    "meu salario ja caiu",
    "ver as entradas do mes",
];

const PROJECTION_PATTERNS: &[&str] = &[
    r"\b(projeção|projecao|previsão|previsao)\b",
    r"\bquanto\s+(vou|vai)\s+(ter|sobrar|economizar|juntar)\b",
    r"\b(se\s+eu\s+)?(continuar|manter)\s+(gastando|economizando|assim)\b",
    r"\b(simular|simulação|simulacao|planejar)\s+(meu\s+|o\s+|a\s+)?(futuro|economia|aposentadoria|investimento)\b",
];
const PROJECTION_KEYWORDS: &[&str] = &[
    "projecao",
    "previsao",
    "futuro",
    "sobrar",
    "economizar",
    "juntar",
    "simular",
];
const PROJECTION_EXAMPLES: &[&str] = &[
    "qual a projecao para o proximo ano",
    "quanto vou ter no fim do ano",
    "se eu continuar gastando assim",
    "simular meu futuro financeiro",
];

/// Colloquial and dialect-aware patterns used only during recovery, on top
/// of the standard ones.
const BALANCE_EXPANDED: &[&str] = &[
    r"\b(tô|to|estou)\s+com\s+quanto\b",
    r"\bquanto\s+(que\s+)?(eu\s+)?(tenho|tem)\b",
    r"\b(quanto\s+sobrou|sobrou\s+quanto)\b",
    r"\bquanto\s+(de\s+)?dinheiro\s+(eu\s+)?(tenho|tem)\b",
];
const PAY_BILL_EXPANDED: &[&str] = &[
    r"\b(bora|vamos)\s+pagar\b",
    r"\b(acertar|liquidar)\s+(a\s+|o\s+)?(conta|boleto|fatura|dívida|divida)\b",
    r"\bpaga\s+(aí\s+|ai\s+)?(a|o)\s+(conta|boleto|fatura)\b",
];
const TRANSFER_EXPANDED: &[&str] = &[
    r"\b(manda|passa|joga|faz)\s+(um\s+|uma\s+)?(pix|ted|transferência|transferencia)\b",
    r"\b(passar|passa)\s+(r\$\s*)?\d+",
    r"\b(manda|mande|envia|passa)\s+(o\s+)?(dinheiro|reais)\b",
];
const BUDGET_EXPANDED: &[&str] = &[
    r"\b(dá|da)\s+pra\s+gastar\b",
    r"\bposso\s+gastar\b",
    r"\bgastei\s+(muito|demais)\b",
];
const INCOME_EXPANDED: &[&str] = &[
    r"\b(caiu|entrou)\s+(o\s+)?(meu\s+)?(salário|salario|pagamento)\b",
    r"\bquanto\s+(eu\s+)?(tiro|faturo|faturei)\b",
];
const PROJECTION_EXPANDED: &[&str] = &[
    r"\b(como|quanto)\s+(vou|vai)\s+(estar|ficar)\b",
    r"\bdaqui\s+a\s+\w+\s+(meses|anos)\b",
];

fn spec(
    intent: IntentLabel,
    patterns: &[&[&str]],
    keywords: &'static [&'static str],
    examples: &'static [&'static str],
) -> IntentSpec {
    IntentSpec {
        intent,
        patterns: patterns.iter().flat_map(|p| compile(p)).collect(),
        keywords,
        examples,
    }
}

/// Table used by the primary classifier
pub static STANDARD_TABLE: LazyLock<PatternTable> = LazyLock::new(|| PatternTable {
    specs: vec![
        spec(
            IntentLabel::CheckBalance,
            &[BALANCE_PATTERNS],
            BALANCE_KEYWORDS,
            BALANCE_EXAMPLES,
        ),
        spec(
            IntentLabel::PayBill,
            &[PAY_BILL_PATTERNS],
            PAY_BILL_KEYWORDS,
            PAY_BILL_EXAMPLES,
        ),
        spec(
            IntentLabel::TransferMoney,
            &[TRANSFER_PATTERNS],
            TRANSFER_KEYWORDS,
            TRANSFER_EXAMPLES,
        ),
        spec(
            IntentLabel::CheckBudget,
            &[BUDGET_PATTERNS],
            BUDGET_KEYWORDS,
            BUDGET_EXAMPLES,
        ),
        spec(
            IntentLabel::CheckIncome,
            &[INCOME_PATTERNS],
            INCOME_KEYWORDS,
            INCOME_EXAMPLES,
        ),
        spec(
            IntentLabel::FinancialProjection,
            &[PROJECTION_PATTERNS],
            PROJECTION_KEYWORDS,
            PROJECTION_EXAMPLES,
        ),
    ],
});

/// Standard patterns plus the colloquial recovery set
pub static EXPANDED_TABLE: LazyLock<PatternTable> = LazyLock::new(|| PatternTable {
    specs: vec![
        spec(
            IntentLabel::CheckBalance,
            &[BALANCE_PATTERNS, BALANCE_EXPANDED],
            BALANCE_KEYWORDS,
            BALANCE_EXAMPLES,
        ),
        spec(
            IntentLabel::PayBill,
            &[PAY_BILL_PATTERNS, PAY_BILL_EXPANDED],
            PAY_BILL_KEYWORDS,
            PAY_BILL_EXAMPLES,
        ),
        spec(
            IntentLabel::TransferMoney,
            &[TRANSFER_PATTERNS, TRANSFER_EXPANDED],
            TRANSFER_KEYWORDS,
            TRANSFER_EXAMPLES,
        ),
        spec(
            IntentLabel::CheckBudget,
            &[BUDGET_PATTERNS, BUDGET_EXPANDED],
            BUDGET_KEYWORDS,
            BUDGET_EXAMPLES,
        ),
        spec(
            IntentLabel::CheckIncome,
            &[INCOME_PATTERNS, INCOME_EXPANDED],
            INCOME_KEYWORDS,
            INCOME_EXAMPLES,
        ),
        spec(
            IntentLabel::FinancialProjection,
            &[PROJECTION_PATTERNS, PROJECTION_EXPANDED],
            PROJECTION_KEYWORDS,
            PROJECTION_EXAMPLES,
        ),
    ],
});
