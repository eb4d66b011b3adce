//! Parser-table compiler.
//!
//! The table is one flat entry array. The first P entries are headers,
//! one per production in grammar order; alternatives of a nonterminal
//! are therefore adjacent and the driver tries the next one by stepping
//! to `index + 1`. Body entries for each production follow the headers,
//! and each header's `next` is patched to its first body entry.

use std::collections::BTreeSet;

use crate::diagnostic::Diagnostic;
use crate::grammar::analysis::GrammarAnalysis;
use crate::grammar::{Grammar, SymbolKind};
use crate::parser::actions::Action;

#[derive(Clone, Debug)]
pub struct TableEntry {
    /// The lhs name for headers, the symbol text for body entries, the
    /// tag name for action entries.
    pub name: String,
    pub do_shift: bool,
    pub do_push: bool,
    /// Whether a predict miss here is final. False on a header means a
    /// later alternative of the same lhs can still match.
    pub is_error: bool,
    pub is_ending: bool,
    pub action: Option<Action>,
    pub next: Option<usize>,
    pub predict: BTreeSet<String>,
}

#[derive(Clone, Debug)]
pub struct ParserTable {
    pub entries: Vec<TableEntry>,
}

impl ParserTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compile the flat parsing table for a grammar. Resolves every action
/// tag on the way; an unbound tag is a fail-fast configuration error.
pub fn compile_table(
    grammar: &Grammar,
    analysis: &GrammarAnalysis,
) -> Result<ParserTable, Diagnostic> {
    let mut entries: Vec<TableEntry> = Vec::new();
    let end_terminal = grammar.end_terminal().to_string();

    for (index, production) in grammar.productions.iter().enumerate() {
        entries.push(TableEntry {
            name: production.lhs.clone(),
            do_shift: false,
            do_push: false,
            is_error: !grammar.has_alternative_after(index),
            is_ending: false,
            action: None,
            next: None, // patched below
            predict: analysis.predict(grammar, index),
        });
    }

    for (row, production) in grammar.productions.iter().enumerate() {
        let mut action_count = 0usize;
        let last = production.rhs.len() - 1;

        for (col, symbol) in production.rhs.iter().enumerate() {
            let has_action = symbol.action.is_some();
            let next_index = entries.len() + 1;

            let entry = match symbol.kind {
                SymbolKind::Terminal => TableEntry {
                    name: symbol.text.clone(),
                    // A trailing action takes over the shift so the
                    // handler still sees the token it consumed.
                    do_shift: !has_action,
                    do_push: false,
                    is_error: true,
                    is_ending: symbol.text == end_terminal && !has_action,
                    action: None,
                    next: if col == last && !has_action {
                        None
                    } else {
                        Some(next_index)
                    },
                    predict: BTreeSet::from([symbol.text.clone()]),
                },
                SymbolKind::Nonterminal => TableEntry {
                    name: symbol.text.clone(),
                    do_shift: false,
                    do_push: col < last || has_action,
                    is_error: true,
                    is_ending: false,
                    action: None,
                    next: Some(grammar.first_production_of(&symbol.text).ok_or_else(|| {
                        Diagnostic::internal(format!(
                            "grammar doesn't have nonterminal <{}>",
                            symbol.text
                        ))
                    })?),
                    predict: analysis.symbol_predict(&symbol.text),
                },
                SymbolKind::Epsilon => TableEntry {
                    name: symbol.text.clone(),
                    do_shift: false,
                    do_push: false,
                    is_error: true,
                    is_ending: false,
                    action: None,
                    next: if has_action { Some(next_index) } else { None },
                    predict: analysis.predict(grammar, row),
                },
            };
            entries.push(entry);

            if let Some(tag) = &symbol.action {
                let action = Action::from_name(tag).ok_or_else(|| {
                    Diagnostic::internal(format!(
                        "action tag '{}' doesn't have an associated handler",
                        tag
                    ))
                })?;
                entries.push(TableEntry {
                    name: tag.clone(),
                    do_shift: symbol.kind == SymbolKind::Terminal,
                    do_push: false,
                    is_error: false,
                    is_ending: symbol.text == end_terminal,
                    action: Some(action),
                    next: if col == last {
                        None
                    } else {
                        Some(entries.len() + 1)
                    },
                    predict: BTreeSet::new(),
                });
                action_count += 1;
            }
        }

        entries[row].next = Some(entries.len() - production.rhs.len() - action_count);
    }

    Ok(ParserTable { entries })
}
