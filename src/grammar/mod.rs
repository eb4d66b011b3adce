pub mod analysis;
pub mod loader;

use std::collections::BTreeSet;

use crate::diagnostic::Diagnostic;

/// What a grammar symbol stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    Epsilon,
}

/// One symbol on the right-hand side of a production, optionally
/// carrying the name of a semantic action to fire after it is consumed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarSymbol {
    pub text: String,
    pub kind: SymbolKind,
    pub action: Option<String>,
}

impl GrammarSymbol {
    pub fn terminal(text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind: SymbolKind::Terminal,
            action: None,
        }
    }

    pub fn nonterminal(text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind: SymbolKind::Nonterminal,
            action: None,
        }
    }

    pub fn epsilon() -> Self {
        Self {
            text: loader::EPSILON.to_string(),
            kind: SymbolKind::Epsilon,
            action: None,
        }
    }
}

/// A production: left nonterminal and a non-empty ordered rhs.
#[derive(Clone, Debug)]
pub struct Production {
    pub lhs: String,
    pub rhs: Vec<GrammarSymbol>,
}

impl Production {
    /// True when the rhs is the single epsilon symbol.
    pub fn is_epsilon(&self) -> bool {
        self.rhs.len() == 1 && self.rhs[0].kind == SymbolKind::Epsilon
    }
}

/// An ordered list of productions. The first production's lhs is the
/// start nonterminal and its rhs ends with the end-of-input terminal.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    pub productions: Vec<Production>,
}

impl Grammar {
    /// Load a grammar from production lines, then check its shape.
    pub fn from_lines(lines: &[&str]) -> Result<Grammar, Diagnostic> {
        let mut grammar = Grammar::default();
        for line in lines {
            grammar.productions.push(loader::parse_production(line)?);
        }
        grammar.validate()?;
        Ok(grammar)
    }

    pub fn start_symbol(&self) -> &str {
        &self.productions[0].lhs
    }

    /// The end-of-input terminal: last rhs symbol of the first production.
    pub fn end_terminal(&self) -> &str {
        let rhs = &self.productions[0].rhs;
        &rhs[rhs.len() - 1].text
    }

    pub fn nonterminals(&self) -> BTreeSet<&str> {
        self.productions.iter().map(|p| p.lhs.as_str()).collect()
    }

    /// Indices of the productions with the given lhs, in order.
    pub fn productions_for(&self, lhs: &str) -> Vec<usize> {
        self.productions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.lhs == lhs)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the first production for a nonterminal.
    pub fn first_production_of(&self, nonterminal: &str) -> Option<usize> {
        self.productions.iter().position(|p| p.lhs == nonterminal)
    }

    /// Whether a later production shares this production's lhs. The
    /// table driver steps to `index + 1` to try the next alternative,
    /// so alternatives must be contiguous; `validate` enforces that.
    pub fn has_alternative_after(&self, index: usize) -> bool {
        index + 1 < self.productions.len() && self.productions[index + 1].lhs == self.productions[index].lhs
    }

    fn validate(&self) -> Result<(), Diagnostic> {
        if self.productions.is_empty() {
            return Err(Diagnostic::internal("grammar has no productions".to_string()));
        }

        let first_rhs = &self.productions[0].rhs;
        if first_rhs[first_rhs.len() - 1].kind != SymbolKind::Terminal {
            return Err(Diagnostic::internal(
                "start production must end with the end-of-input terminal".to_string(),
            ));
        }

        let defined = self.nonterminals();
        for production in &self.productions {
            for symbol in &production.rhs {
                if symbol.kind == SymbolKind::Nonterminal && !defined.contains(symbol.text.as_str())
                {
                    return Err(Diagnostic::internal(format!(
                        "nonterminal <{}> is referenced but has no production",
                        symbol.text
                    )));
                }
            }
        }

        // Alternatives of one lhs must form a contiguous run.
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut previous: Option<&str> = None;
        for production in &self.productions {
            let lhs = production.lhs.as_str();
            if previous != Some(lhs) {
                if seen.contains(lhs) {
                    return Err(Diagnostic::internal(format!(
                        "productions for <{}> must be listed contiguously",
                        lhs
                    )));
                }
                seen.insert(lhs);
            }
            previous = Some(lhs);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_end_symbols() {
        let grammar = Grammar::from_lines(&[
            "<S> -> <A> EndOfFile",
            "<A> -> Plus",
        ])
        .unwrap();
        assert_eq!(grammar.start_symbol(), "S");
        assert_eq!(grammar.end_terminal(), "EndOfFile");
    }

    #[test]
    fn undefined_nonterminal_is_rejected() {
        let err = Grammar::from_lines(&["<S> -> <Missing> EndOfFile"]).unwrap_err();
        assert!(err.message.contains("Missing"));
    }

    #[test]
    fn scattered_alternatives_are_rejected() {
        let err = Grammar::from_lines(&[
            "<S> -> <A> EndOfFile",
            "<A> -> Plus",
            "<B> -> Minus",
            "<A> -> Minus",
            "<B> -> Plus",
        ])
        .unwrap_err();
        assert!(err.message.contains("contiguously"));
    }

    #[test]
    fn start_production_must_end_in_terminal() {
        let err = Grammar::from_lines(&["<S> -> <A>", "<A> -> Plus"]).unwrap_err();
        assert!(err.message.contains("end-of-input"));
    }

    #[test]
    fn alternatives_are_found() {
        let grammar = Grammar::from_lines(&[
            "<S> -> <A> EndOfFile",
            "<A> -> Plus",
            "<A> -> Minus",
        ])
        .unwrap();
        assert!(grammar.has_alternative_after(1));
        assert!(!grammar.has_alternative_after(2));
        assert_eq!(grammar.productions_for("A"), vec![1, 2]);
    }
}
