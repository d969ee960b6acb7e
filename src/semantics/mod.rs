//! AST to ASR translation.
//!
//! Analysis runs in three steps over one translation unit: the symbol-table
//! pass declares everything, the body pass resolves executable statements,
//! and (optionally) array intrinsic calls are lowered to generated helpers.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::asr::{Asr, ScopeId, SymbolId, SymbolKind, TType};
use crate::ast;
use crate::config::SemaSettings;
use crate::diagnostics::Lint;
use crate::errors::{SemanticError, SemanticErrorKind, SemanticResult, Span};
use crate::intrinsics;
use crate::modfile::{self, ModuleLoader};
use crate::passes;

pub mod body;
pub mod cast;
pub mod fold;
pub mod implicit;
pub mod overload;
pub mod resolver;
pub mod symtab_builder;

pub use body::BodyResolver;
pub use implicit::ImplicitTyping;
pub use overload::{OverloadStrategy, Selection};
pub use resolver::{CallArg, ExpressionResolver};
pub use symtab_builder::SymbolTableBuilder;

/// State shared by every pass over one translation unit.
pub struct Context<'a> {
    pub asr: Asr,
    pub settings: &'a SemaSettings,
    pub loader: &'a mut dyn ModuleLoader,
    /// Implicit typing rules of the scopes that declare their own.
    pub implicit: HashMap<ScopeId, ImplicitTyping>,
    pub lints: Vec<Lint>,
    /// Where each variable was declared, for diagnostics.
    pub decl_spans: HashMap<SymbolId, Span>,
    pub strategy: Box<dyn OverloadStrategy>,
    loading: HashSet<String>,
}

/// Result of analysing one translation unit.
#[derive(Debug)]
pub struct Analysis {
    pub asr: Asr,
    pub lints: Vec<Lint>,
}

impl<'a> Context<'a> {
    pub fn new(settings: &'a SemaSettings, loader: &'a mut dyn ModuleLoader) -> Self {
        Self::with_asr(Asr::new(), settings, loader)
    }

    /// Continues in an ASR that already holds earlier translation units.
    pub fn with_asr(asr: Asr, settings: &'a SemaSettings, loader: &'a mut dyn ModuleLoader) -> Self {
        Context {
            asr,
            settings,
            loader,
            implicit: HashMap::new(),
            lints: Vec::new(),
            decl_spans: HashMap::new(),
            strategy: overload::strategy_for(settings.overload_policy),
            loading: HashSet::new(),
        }
    }

    pub fn resolver(&mut self) -> ExpressionResolver<'_, 'a> {
        ExpressionResolver::new(self)
    }

    pub fn builder(&mut self) -> SymbolTableBuilder<'_, 'a> {
        SymbolTableBuilder::new(self)
    }

    pub fn lint(&mut self, name: &'static str, message: impl Into<String>, span: Span) {
        self.lints.push(Lint::new(name, message, span));
    }

    /// Implicit type for `name` from the nearest scope that has rules.
    pub fn implicit_type(&self, scope: ScopeId, name: &str) -> Option<TType> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(rules) = self.implicit.get(&s) {
                return rules.get_implicit_type(name);
            }
            cur = self.asr.scope(s).parent;
        }
        None
    }

    /// Finds a module in the root scope, loading its image if needed.
    pub fn load_module(&mut self, name: &str, span: Span) -> SemanticResult<SymbolId> {
        let root = self.asr.root;
        if let Some(id) = self.asr.scope(root).get(name) {
            return match self.asr.symbol(id).kind {
                SymbolKind::Module(_) => Ok(id),
                _ => Err(SemanticError::new(
                    SemanticErrorKind::ModuleLoad,
                    format!("'{}' is not a module", name),
                    span,
                )),
            };
        }
        if !self.loading.insert(name.to_string()) {
            return Err(SemanticError::new(
                SemanticErrorKind::ModuleLoad,
                format!("Circular dependency while loading module '{}'", name),
                span,
            ));
        }
        debug!("loading module '{}'", name);
        let image = self.loader.load(name).map_err(|e| {
            SemanticError::new(
                SemanticErrorKind::ModuleLoad,
                format!("Could not load module '{}': {}", name, e),
                span.clone(),
            )
        })?;
        let mut imports = Vec::with_capacity(image.imports.len());
        for path in &image.imports {
            imports.push(self.resolve_import(name, path, span.clone())?);
        }
        let id = modfile::graft_module(&mut self.asr, image, &imports);
        self.asr.declare(root, name, id, span)?;
        self.loading.remove(name);
        Ok(id)
    }

    fn resolve_import(&mut self, loading: &str, path: &[String], span: Span) -> SemanticResult<SymbolId> {
        let Some(first) = path.first() else {
            crate::internal_error!("empty import path in image of '{}'", loading);
        };
        if self.asr.scope(self.asr.root).get(first).is_none() {
            if intrinsics::is_intrinsic_module(first) {
                if let Some(func) = path.get(1) {
                    intrinsics::intrinsic_function(&mut self.asr, first, func);
                }
            } else {
                self.load_module(first, span.clone())?;
            }
        }
        self.asr.find_path(path).ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::ModuleLoad,
                format!(
                    "Module '{}' refers to '{}', which does not exist",
                    loading,
                    path.join("%")
                ),
                span,
            )
        })
    }

    pub fn finish(self) -> Analysis {
        Analysis {
            asr: self.asr,
            lints: self.lints,
        }
    }
}

pub fn lower(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Runs every semantic pass over `unit`.
pub fn ast_to_asr(
    unit: &ast::TranslationUnit,
    loader: &mut dyn ModuleLoader,
    settings: &SemaSettings,
) -> SemanticResult<Analysis> {
    extend_asr(Asr::new(), unit, loader, settings)
}

/// Runs every semantic pass over `unit` on top of `asr`, as an interactive
/// session does for each new input. Procedures marked `Abi::Interactive`
/// may be redefined.
pub fn extend_asr(
    asr: Asr,
    unit: &ast::TranslationUnit,
    loader: &mut dyn ModuleLoader,
    settings: &SemaSettings,
) -> SemanticResult<Analysis> {
    let mut ctx = Context::with_asr(asr, settings, loader);
    ctx.builder().build(unit)?;
    let mut bodies = BodyResolver::new(&mut ctx);
    for item in &unit.items {
        bodies.resolve_unit(item)?;
    }
    if settings.lower_array_intrinsics {
        passes::array_intrinsics::lower_array_intrinsics(&mut ctx.asr);
    }
    passes::lints::unused_dummy_arguments(&mut ctx);
    Ok(ctx.finish())
}
