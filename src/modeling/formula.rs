//! Typed model specifications.
//!
//! Factor names are held as data and never parsed, so names containing spaces, operators or
//! quotes are safe. The patsy-style rendering from `Display` is only used for labels and logs.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Intercept,
    /// Main effect of a factor, always treatment coded as categorical
    Categorical(String),
    /// Two-factor interaction of categorical factors
    Interaction(String, String),
}

impl Term {
    /// Factor names the term is built from (empty for the intercept).
    pub fn factors(&self) -> Vec<&str> {
        match self {
            Term::Intercept => Vec::new(),
            Term::Categorical(name) => vec![name.as_str()],
            Term::Interaction(a, b) => vec![a.as_str(), b.as_str()],
        }
    }

    /// True if `self` is a higher-order term whose factors strictly contain those of `other`.
    pub fn contains(&self, other: &Term) -> bool {
        let mine = self.factors();
        let theirs = other.factors();
        !theirs.is_empty() && theirs.len() < mine.len() && theirs.iter().all(|f| mine.contains(f))
    }

    pub fn label(&self) -> String {
        match self {
            Term::Intercept => "Intercept".to_string(),
            Term::Categorical(name) => categorical_label(name),
            Term::Interaction(a, b) => format!("{}:{}", categorical_label(a), categorical_label(b)),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn quoted(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("Q(\"{}\")", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn categorical_label(name: &str) -> String {
    format!("C({})", quoted(name))
}

/// Response name plus an ordered, duplicate-free list of terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    response: String,
    terms: Vec<Term>,
}

impl ModelSpec {
    /// An intercept-only model for `response`.
    pub fn new(response: &str) -> Self {
        ModelSpec {
            response: response.to_string(),
            terms: vec![Term::Intercept],
        }
    }

    /// `response ~ C(factor1) + C(factor2) + C(factor1):C(factor2)`
    pub fn two_way(response: &str, factor1: &str, factor2: &str) -> Self {
        ModelSpec::new(response)
            .categorical(factor1)
            .categorical(factor2)
            .interaction(factor1, factor2)
    }

    pub fn with_term(mut self, term: Term) -> Self {
        if !self.terms.contains(&term) {
            self.terms.push(term);
        }
        self
    }

    pub fn categorical(self, factor: &str) -> Self {
        self.with_term(Term::Categorical(factor.to_string()))
    }

    pub fn interaction(self, factor1: &str, factor2: &str) -> Self {
        self.with_term(Term::Interaction(factor1.to_string(), factor2.to_string()))
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn has_intercept(&self) -> bool {
        self.terms.contains(&Term::Intercept)
    }

    /// Distinct factor names in order of first appearance.
    pub fn factor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for term in &self.terms {
            for factor in term.factors() {
                if !names.contains(&factor) {
                    names.push(factor);
                }
            }
        }
        names
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let effects: Vec<String> = self
            .terms
            .iter()
            .filter(|t| **t != Term::Intercept)
            .map(Term::label)
            .collect();

        write!(f, "{} ~ ", quoted(&self.response))?;
        if effects.is_empty() {
            write!(f, "1")?;
        } else {
            write!(f, "{}", effects.join(" + "))?;
        }
        if !self.has_intercept() {
            write!(f, " - 1")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_way_terms() {
        let spec = ModelSpec::two_way("Expression", "Diet", "Genotype");
        assert_eq!(
            spec.terms(),
            &[
                Term::Intercept,
                Term::Categorical("Diet".into()),
                Term::Categorical("Genotype".into()),
                Term::Interaction("Diet".into(), "Genotype".into()),
            ]
        );
        assert_eq!(spec.factor_names(), vec!["Diet", "Genotype"]);
        assert_eq!(
            spec.to_string(),
            "Expression ~ C(Diet) + C(Genotype) + C(Diet):C(Genotype)"
        );
    }

    #[test]
    fn test_special_characters_are_quoted() {
        let spec = ModelSpec::two_way("Expression", "diet group", "geno\"type");
        assert_eq!(
            spec.to_string(),
            "Expression ~ C(Q(\"diet group\")) + C(Q(\"geno\\\"type\")) + C(Q(\"diet group\")):C(Q(\"geno\\\"type\"))"
        );
        assert_eq!(spec.factor_names(), vec!["diet group", "geno\"type"]);
    }

    #[test]
    fn test_containment() {
        let diet = Term::Categorical("Diet".into());
        let geno = Term::Categorical("Genotype".into());
        let both = Term::Interaction("Diet".into(), "Genotype".into());
        assert!(both.contains(&diet));
        assert!(both.contains(&geno));
        assert!(!diet.contains(&both));
        assert!(!diet.contains(&diet));
        assert!(!both.contains(&Term::Intercept));
    }

    #[test]
    fn test_duplicate_terms_ignored() {
        let spec = ModelSpec::new("y").categorical("a").categorical("a");
        assert_eq!(spec.terms().len(), 2);
        assert_eq!(ModelSpec::new("y").to_string(), "y ~ 1");
    }
}
