use std::collections::BTreeMap;

use crate::backend::Value;
use crate::diagnostic::Diagnostic;
use crate::types::Ty;

/// A named storage binding: the declared language type and the backend
/// stack slot holding the current value.
#[derive(Clone, Copy, Debug)]
pub struct Slot {
    pub ty: Ty,
    pub ptr: Value,
}

/// The lexical scope chain. Declarations go into the innermost frame;
/// lookups scan innermost-first, so shadowing across frames works and
/// redeclaring within one frame is an error.
#[derive(Default)]
pub struct ScopeChain {
    scopes: Vec<BTreeMap<String, Slot>>,
}

impl ScopeChain {
    pub fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn define(&mut self, name: &str, slot: Slot) -> Result<(), Diagnostic> {
        let frame = self
            .scopes
            .last_mut()
            .ok_or_else(|| Diagnostic::internal("no scope to define a variable in".to_string()))?;
        if frame.contains_key(name) {
            return Err(Diagnostic::semantic(format!(
                "variable '{}' is already defined",
                name
            )));
        }
        frame.insert(name.to_string(), slot);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }
}
