//! Regional slang to standard Portuguese
//!
//! Terms are folded single words. An empty replacement drops the word
//! (interjections such as `bah` or `oxe`).

use crate::dialect::Region;
use crate::normalizer::fold;

/// Terms understood nationwide
const NATIONAL: &[(&str, &str)] = &[
    ("grana", "dinheiro"),
    ("bufunfa", "dinheiro"),
    ("dindin", "dinheiro"),
    ("tutu", "dinheiro"),
    ("cascalho", "dinheiro"),
    ("carne", "boleto"),
    ("holerite", "salario"),
];

const SUL: &[(&str, &str)] = &[
    ("pila", "reais"),
    ("pilas", "reais"),
    ("bah", ""),
    ("tche", ""),
    ("tri", "muito"),
    ("guri", ""),
];

const NORDESTE: &[(&str, &str)] = &[
    ("oxe", ""),
    ("oxente", ""),
    ("visse", ""),
    ("apurei", "ganhei"),
    ("conto", "reais"),
    ("mainha", "mae"),
];

const SUDESTE: &[(&str, &str)] = &[
    ("conto", "reais"),
    ("contos", "reais"),
    ("pau", "reais"),
    ("paus", "reais"),
    ("uai", ""),
    ("mano", ""),
];

const NORTE: &[(&str, &str)] = &[("egua", ""), ("maninho", ""), ("merreca", "dinheiro")];

const CENTRO_OESTE: &[(&str, &str)] = &[("trem", "coisa"), ("oce", "voce")];

/// Substitution table for a region. `Unknown` has none of its own.
pub fn region_table(region: Region) -> &'static [(&'static str, &'static str)] {
    match region {
        Region::Sul => SUL,
        Region::Nordeste => NORDESTE,
        Region::Sudeste => SUDESTE,
        Region::Norte => NORTE,
        Region::CentroOeste => CENTRO_OESTE,
        Region::Unknown => &[],
    }
}

/// A rewrite and the substitutions that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub substitutions: Vec<(String, String)>,
}

/// Rewrite `text` using the region's table then the national one. `None`
/// when no term was replaced.
pub fn rewrite(text: &str, region: Region) -> Option<Rewrite> {
    let folded = fold(text);
    let mut substitutions = Vec::new();
    let mut words = Vec::new();

    for word in folded.split_whitespace() {
        let replacement = region_table(region)
            .iter()
            .chain(NATIONAL.iter())
            .find(|(term, _)| *term == word)
            .map(|(_, standard)| *standard);
        match replacement {
            Some(standard) => {
                substitutions.push((word.to_string(), standard.to_string()));
                if !standard.is_empty() {
                    words.push(standard.to_string());
                }
            }
            None => words.push(word.to_string()),
        }
    }

    if substitutions.is_empty() {
        return None;
    }
    Some(Rewrite {
        text: words.join(" "),
        substitutions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_terms_apply_everywhere() {
        let r = rewrite("quanto de bufunfa eu tenho", Region::Unknown).unwrap();
        assert_eq!(r.text, "quanto de dinheiro eu tenho");
        assert_eq!(r.substitutions, vec![("bufunfa".into(), "dinheiro".into())]);
    }

    #[test]
    fn test_region_terms_and_interjections() {
        let r = rewrite("Bah, tchê, quantos pila eu tenho?", Region::Sul).unwrap();
        assert_eq!(r.text, "quantos reais eu tenho");
        assert_eq!(r.substitutions.len(), 3);
    }

    #[test]
    fn test_region_specific_terms_need_the_region() {
        assert!(rewrite("manda dez pila", Region::Nordeste).is_none());
        assert!(rewrite("manda dez pila", Region::Sul).is_some());
    }

    #[test]
    fn test_no_slang_no_rewrite() {
        assert!(rewrite("qual é meu saldo", Region::Sudeste).is_none());
    }
}
