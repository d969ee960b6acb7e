use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{ArrayIntrinsic, Asr, Overload, ScopeId, SymbolId, SymbolKind, TypeCategory};
use crate::errors::{SemanticError, SemanticErrorKind, SemanticResult, Span};

/// Identifies one instantiated array-intrinsic helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HelperKey {
    pub intrinsic: ArrayIntrinsic,
    pub category: TypeCategory,
    pub kind: u8,
    pub rank: usize,
    pub overload: Overload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    pub parent: Option<ScopeId>,
    /// Symbol whose scope this is; `None` for the translation-unit root.
    pub owner: Option<SymbolId>,
    /// Enumerates in insertion order.
    pub symbols: IndexMap<String, SymbolId>,
    /// Instantiated helpers; one key may need several argument signatures.
    #[serde(skip)]
    pub helpers: HashMap<HelperKey, Vec<SymbolId>>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Asr {
    /// Registers `sym` under `name` in `scope`, taking ownership of it.
    pub fn declare(&mut self, scope: ScopeId, name: &str, sym: SymbolId, span: Span) -> SemanticResult<()> {
        if self.scope(scope).symbols.contains_key(name) {
            return Err(SemanticError::duplicate(name, span));
        }
        self.scope_mut(scope).symbols.insert(name.to_string(), sym);
        let s = self.symbol_mut(sym);
        s.owner = scope;
        if s.name != name {
            s.name = name.to_string();
        }
        Ok(())
    }

    /// Replaces whatever `name` maps to in `scope`.
    pub fn overwrite(&mut self, scope: ScopeId, name: &str, sym: SymbolId) {
        self.scope_mut(scope).symbols.insert(name.to_string(), sym);
        self.symbol_mut(sym).owner = scope;
    }

    /// Walks from `scope` up through its parents; the first match wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let table = self.scope(s);
            if let Some(id) = table.get(name) {
                return Some(id);
            }
            cur = table.parent;
        }
        None
    }

    pub fn resolve(&self, scope: ScopeId, name: &str, span: Span) -> SemanticResult<SymbolId> {
        self.lookup(scope, name)
            .ok_or_else(|| SemanticError::undeclared_symbol(name, span))
    }

    /// Member lookup in a derived type, then in its ancestors.
    pub fn find_member(&self, dt: SymbolId, name: &str) -> Option<SymbolId> {
        let mut cur = Some(self.past_external(dt));
        while let Some(t) = cur {
            let SymbolKind::DerivedType(def) = &self.symbol(t).kind else {
                return None;
            };
            if let Some(id) = self.scope(def.scope).get(name) {
                return Some(id);
            }
            cur = def.parent.map(|p| self.past_external(p));
        }
        None
    }

    pub fn resolve_member(&self, dt: SymbolId, name: &str, span: Span) -> SemanticResult<SymbolId> {
        self.find_member(dt, name).ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::NoSuchMember,
                format!(
                    "Member '{}' not found in derived type '{}'",
                    name,
                    self.name(self.past_external(dt))
                ),
                span,
            )
        })
    }

    /// All components of a derived type, inherited ones first.
    pub fn all_members(&self, dt: SymbolId) -> Vec<SymbolId> {
        let dt = self.past_external(dt);
        let SymbolKind::DerivedType(def) = &self.symbol(dt).kind else {
            return Vec::new();
        };
        let mut out = def.parent.map(|p| self.all_members(p)).unwrap_or_default();
        for m in &def.members {
            if let Some(id) = self.scope(def.scope).get(m) {
                out.push(id);
            }
        }
        out
    }

    /// `base` if unused in `scope`, otherwise `base_1`, `base_2`, ...
    pub fn unique_name(&self, scope: ScopeId, base: &str) -> String {
        let table = self.scope(scope);
        if !table.symbols.contains_key(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{}_{}", base, i))
            .find(|n| !table.symbols.contains_key(n))
            .unwrap_or_else(|| base.to_string())
    }

    /// Names from the root down to `id`, used to re-find a symbol by path.
    pub fn symbol_path(&self, id: SymbolId) -> Vec<String> {
        let mut path = vec![self.name(id).to_string()];
        let mut scope = self.symbol(id).owner;
        while let Some(owner) = self.scope(scope).owner {
            path.push(self.name(owner).to_string());
            scope = self.symbol(owner).owner;
        }
        path.reverse();
        path
    }

    /// Inverse of [`Asr::symbol_path`].
    pub fn find_path(&self, path: &[String]) -> Option<SymbolId> {
        let (first, rest) = path.split_first()?;
        let mut cur = self.scope(self.root).get(first)?;
        for name in rest {
            let scope = self.symbol_scope(cur)?;
            cur = self.scope(scope).get(name)?;
        }
        Some(cur)
    }
}
