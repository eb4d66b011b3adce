//! Grammar analyses: nullability, FIRST, FOLLOW, and predict sets.
//!
//! All three sets are computed as fixed points over the production
//! list, so the results are independent of production order. Sets are
//! keyed and valued by terminal names.

use std::collections::{BTreeMap, BTreeSet};

use crate::grammar::{Grammar, GrammarSymbol, SymbolKind};

pub struct GrammarAnalysis {
    nullable: BTreeSet<String>,
    first: BTreeMap<String, BTreeSet<String>>,
    follow: BTreeMap<String, BTreeSet<String>>,
}

impl GrammarAnalysis {
    pub fn analyze(grammar: &Grammar) -> Self {
        let nullable = compute_nullable(grammar);
        let first = compute_first(grammar, &nullable);
        let follow = compute_follow(grammar, &nullable, &first);
        Self {
            nullable,
            first,
            follow,
        }
    }

    /// Whether the nonterminal can derive the empty string.
    pub fn is_nullable(&self, nonterminal: &str) -> bool {
        self.nullable.contains(nonterminal)
    }

    pub fn first(&self, nonterminal: &str) -> BTreeSet<String> {
        self.first.get(nonterminal).cloned().unwrap_or_default()
    }

    pub fn follow(&self, nonterminal: &str) -> BTreeSet<String> {
        self.follow.get(nonterminal).cloned().unwrap_or_default()
    }

    /// FIRST of a symbol sequence, plus whether the whole sequence can
    /// derive empty.
    pub fn first_of_sequence(&self, symbols: &[GrammarSymbol]) -> (BTreeSet<String>, bool) {
        let mut set = BTreeSet::new();
        for symbol in symbols {
            match symbol.kind {
                SymbolKind::Terminal => {
                    set.insert(symbol.text.clone());
                    return (set, false);
                }
                SymbolKind::Nonterminal => {
                    set.extend(self.first(&symbol.text));
                    if !self.is_nullable(&symbol.text) {
                        return (set, false);
                    }
                }
                SymbolKind::Epsilon => {}
            }
        }
        (set, true)
    }

    /// Predict set of a production: FIRST(rhs), plus FOLLOW(lhs) when
    /// the rhs can derive empty.
    pub fn predict(&self, grammar: &Grammar, index: usize) -> BTreeSet<String> {
        let production = &grammar.productions[index];
        let (mut set, rhs_nullable) = self.first_of_sequence(&production.rhs);
        if rhs_nullable {
            set.extend(self.follow(&production.lhs));
        }
        set
    }

    /// Predict set of a nonterminal occurrence inside a production
    /// body: FIRST(nt), plus FOLLOW(nt) when nt is nullable.
    pub fn symbol_predict(&self, nonterminal: &str) -> BTreeSet<String> {
        let mut set = self.first(nonterminal);
        if self.is_nullable(nonterminal) {
            set.extend(self.follow(nonterminal));
        }
        set
    }
}

fn compute_nullable(grammar: &Grammar) -> BTreeSet<String> {
    let mut nullable: BTreeSet<String> = BTreeSet::new();
    loop {
        let mut changed = false;
        for production in &grammar.productions {
            if nullable.contains(&production.lhs) {
                continue;
            }
            let derives_empty = production.rhs.iter().all(|symbol| match symbol.kind {
                SymbolKind::Epsilon => true,
                SymbolKind::Nonterminal => nullable.contains(&symbol.text),
                SymbolKind::Terminal => false,
            });
            if derives_empty {
                nullable.insert(production.lhs.clone());
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn compute_first(
    grammar: &Grammar,
    nullable: &BTreeSet<String>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut first: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for lhs in grammar.nonterminals() {
        first.insert(lhs.to_string(), BTreeSet::new());
    }

    loop {
        let mut changed = false;
        for production in &grammar.productions {
            let mut addition: BTreeSet<String> = BTreeSet::new();
            for symbol in &production.rhs {
                match symbol.kind {
                    SymbolKind::Terminal => {
                        addition.insert(symbol.text.clone());
                        break;
                    }
                    SymbolKind::Nonterminal => {
                        if let Some(set) = first.get(&symbol.text) {
                            addition.extend(set.iter().cloned());
                        }
                        if !nullable.contains(&symbol.text) {
                            break;
                        }
                    }
                    SymbolKind::Epsilon => break,
                }
            }
            let target = first.entry(production.lhs.clone()).or_default();
            for terminal in addition {
                changed |= target.insert(terminal);
            }
        }
        if !changed {
            return first;
        }
    }
}

fn compute_follow(
    grammar: &Grammar,
    nullable: &BTreeSet<String>,
    first: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut follow: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for lhs in grammar.nonterminals() {
        follow.insert(lhs.to_string(), BTreeSet::new());
    }
    follow
        .entry(grammar.start_symbol().to_string())
        .or_default()
        .insert(grammar.end_terminal().to_string());

    loop {
        let mut changed = false;
        for production in &grammar.productions {
            for (i, symbol) in production.rhs.iter().enumerate() {
                if symbol.kind != SymbolKind::Nonterminal {
                    continue;
                }

                let mut addition: BTreeSet<String> = BTreeSet::new();
                let mut tail_nullable = true;
                for rest in &production.rhs[i + 1..] {
                    match rest.kind {
                        SymbolKind::Terminal => {
                            addition.insert(rest.text.clone());
                            tail_nullable = false;
                            break;
                        }
                        SymbolKind::Nonterminal => {
                            if let Some(set) = first.get(&rest.text) {
                                addition.extend(set.iter().cloned());
                            }
                            if !nullable.contains(&rest.text) {
                                tail_nullable = false;
                                break;
                            }
                        }
                        SymbolKind::Epsilon => {}
                    }
                }
                if tail_nullable {
                    if let Some(set) = follow.get(&production.lhs) {
                        addition.extend(set.iter().cloned());
                    }
                }

                let target = follow.entry(symbol.text.clone()).or_default();
                for terminal in addition {
                    changed |= target.insert(terminal);
                }
            }
        }
        if !changed {
            return follow;
        }
    }
}
