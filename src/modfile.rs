//! Persisted module images.
//!
//! A module image is a self-contained [`Asr`] holding one module and
//! everything it owns. Symbols the module refers to but does not own (other
//! modules, intrinsic functions) are stored as name paths in `imports`; the
//! image refers to import `k` through `SymbolId(symbols.len() + k)`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asr::remap::IdMapper;
use crate::asr::{Asr, Expr, ExprId, ScopeId, SymbolId, SymbolKind, SymbolTable};

#[derive(Debug, Error)]
pub enum ModfileError {
    #[error("no module file found for '{0}'")]
    NotFound(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: corrupt module file: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleImage {
    pub name: String,
    pub asr: Asr,
    pub module: SymbolId,
    pub imports: Vec<Vec<String>>,
}

/// Supplies module images to the semantic passes when a `use` names a module
/// that is not part of the current translation unit.
pub trait ModuleLoader {
    fn load(&mut self, name: &str) -> Result<ModuleImage, ModfileError>;
}

/// Looks up `<dir>/<name>.mod` in each search directory in turn.
#[derive(Debug, Clone, Default)]
pub struct FsModuleLoader {
    pub paths: Vec<PathBuf>,
}

impl FsModuleLoader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        FsModuleLoader { paths }
    }
}

impl ModuleLoader for FsModuleLoader {
    fn load(&mut self, name: &str) -> Result<ModuleImage, ModfileError> {
        let file = format!("{}.mod", name);
        let Some(path) = self.paths.iter().map(|p| p.join(&file)).find(|p| p.is_file()) else {
            return Err(ModfileError::NotFound(name.to_string()));
        };
        debug!("reading module image {}", path.display());
        let text = fs::read_to_string(&path).map_err(|source| ModfileError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ModfileError::Corrupt { path, source })
    }
}

/// Serves images kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryModuleLoader {
    images: HashMap<String, ModuleImage>,
}

impl MemoryModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: ModuleImage) {
        self.images.insert(image.name.clone(), image);
    }

    /// Extracts every user module of a finished translation unit.
    pub fn from_asr(asr: &Asr) -> Self {
        let mut loader = Self::new();
        for (_, id) in asr.scope(asr.root).iter() {
            if let SymbolKind::Module(m) = &asr.symbol(id).kind {
                if !m.intrinsic {
                    loader.insert(extract_module(asr, id));
                }
            }
        }
        loader
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }
}

impl ModuleLoader for MemoryModuleLoader {
    fn load(&mut self, name: &str) -> Result<ModuleImage, ModfileError> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| ModfileError::NotFound(name.to_string()))
    }
}

/// Never finds anything; for translation units that use no outside modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModules;

impl ModuleLoader for NoModules {
    fn load(&mut self, name: &str) -> Result<ModuleImage, ModfileError> {
        Err(ModfileError::NotFound(name.to_string()))
    }
}

struct Extractor<'a> {
    asr: &'a Asr,
    owned: usize,
    symbols: HashMap<SymbolId, SymbolId>,
    scopes: HashMap<ScopeId, ScopeId>,
    exprs: HashMap<ExprId, ExprId>,
    pending: Vec<(ExprId, ExprId)>,
    imports: Vec<Vec<String>>,
}

impl IdMapper for Extractor<'_> {
    fn symbol(&mut self, id: SymbolId) -> SymbolId {
        if let Some(m) = self.symbols.get(&id) {
            return *m;
        }
        let mapped = SymbolId(self.owned + self.imports.len());
        self.imports.push(self.asr.symbol_path(id));
        self.symbols.insert(id, mapped);
        mapped
    }

    fn scope(&mut self, id: ScopeId) -> ScopeId {
        self.scopes.get(&id).copied().unwrap_or(ScopeId(0))
    }

    fn expr(&mut self, id: ExprId) -> ExprId {
        if let Some(m) = self.exprs.get(&id) {
            return *m;
        }
        let mapped = ExprId(self.exprs.len());
        self.exprs.insert(id, mapped);
        self.pending.push((id, mapped));
        mapped
    }
}

/// Builds the image of `module`, which must be a module symbol of `asr`.
pub fn extract_module(asr: &Asr, module: SymbolId) -> ModuleImage {
    let Some(mscope) = asr.symbol_scope(module) else {
        crate::internal_error!("'{}' is not a module", asr.name(module));
    };
    let mut scopes = HashMap::from([(asr.root, ScopeId(0))]);
    let mut stack = vec![mscope];
    while let Some(s) = stack.pop() {
        if scopes.contains_key(&s) {
            continue;
        }
        scopes.insert(s, ScopeId(scopes.len()));
        for (_, id) in asr.scope(s).iter() {
            if asr.symbol(id).owner == s {
                if let Some(inner) = asr.symbol_scope(id) {
                    stack.push(inner);
                }
            }
        }
    }

    // Every symbol created in one of the module's scopes belongs to the
    // image, registered or not.
    let mut owned = vec![module];
    owned.extend(
        (0..asr.symbols.len())
            .map(SymbolId)
            .filter(|id| *id != module && asr.symbol(*id).owner != asr.root && scopes.contains_key(&asr.symbol(*id).owner)),
    );
    let symbols = owned.iter().enumerate().map(|(i, id)| (*id, SymbolId(i))).collect();
    let mut ex = Extractor {
        asr,
        owned: owned.len(),
        symbols,
        scopes: scopes.clone(),
        exprs: HashMap::new(),
        pending: Vec::new(),
        imports: Vec::new(),
    };

    let mut image_symbols = Vec::with_capacity(owned.len());
    for id in &owned {
        let mut sym = asr.symbol(*id).clone();
        sym.remap(&mut ex);
        image_symbols.push(sym);
    }

    let mut by_new: Vec<(ScopeId, ScopeId)> = scopes.iter().map(|(o, n)| (*o, *n)).collect();
    by_new.sort_by_key(|(_, n)| *n);
    let mut image_scopes = Vec::with_capacity(by_new.len());
    for (old, new) in by_new {
        if new == ScopeId(0) {
            let mut root = SymbolTable::default();
            root.symbols.insert(asr.name(module).to_string(), SymbolId(0));
            image_scopes.push(root);
        } else {
            let mut table = asr.scope(old).clone();
            table.remap(&mut ex);
            image_scopes.push(table);
        }
    }

    let mut image_exprs: Vec<Option<Expr>> = Vec::new();
    while let Some((old, new)) = ex.pending.pop() {
        let mut e = asr.expr(old).clone();
        e.remap(&mut ex);
        if image_exprs.len() <= new.0 {
            image_exprs.resize(new.0 + 1, None);
        }
        image_exprs[new.0] = Some(e);
    }

    debug!(
        "extracted module '{}': {} symbols, {} imports",
        asr.name(module),
        image_symbols.len(),
        ex.imports.len()
    );
    ModuleImage {
        name: asr.name(module).to_string(),
        asr: Asr {
            symbols: image_symbols,
            scopes: image_scopes,
            exprs: image_exprs.into_iter().flatten().collect(),
            root: ScopeId(0),
        },
        module: SymbolId(0),
        imports: ex.imports,
    }
}

/// Writes the image of `module` to `<dir>/<name>.mod`.
pub fn save_module(asr: &Asr, module: SymbolId, dir: &Path) -> Result<PathBuf, ModfileError> {
    let image = extract_module(asr, module);
    let path = dir.join(format!("{}.mod", image.name));
    let text = serde_json::to_string(&image).map_err(|source| ModfileError::Corrupt {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, text).map_err(|source| ModfileError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

struct Grafter<'a> {
    owned: usize,
    symbol_base: usize,
    scope_base: usize,
    expr_base: usize,
    imports: &'a [SymbolId],
    root: ScopeId,
}

impl IdMapper for Grafter<'_> {
    fn symbol(&mut self, id: SymbolId) -> SymbolId {
        if id.0 < self.owned {
            SymbolId(id.0 + self.symbol_base)
        } else {
            match self.imports.get(id.0 - self.owned) {
                Some(s) => *s,
                None => crate::internal_error!("module image refers to missing import {}", id.0 - self.owned),
            }
        }
    }

    fn scope(&mut self, id: ScopeId) -> ScopeId {
        if id.0 == 0 {
            self.root
        } else {
            ScopeId(id.0 - 1 + self.scope_base)
        }
    }

    fn expr(&mut self, id: ExprId) -> ExprId {
        ExprId(id.0 + self.expr_base)
    }
}

/// Moves an image into `asr`. `imports` are the already resolved targets of
/// `image.imports`, in order. Returns the module symbol, which the caller
/// registers in the root scope.
pub fn graft_module(asr: &mut Asr, image: ModuleImage, imports: &[SymbolId]) -> SymbolId {
    let mut g = Grafter {
        owned: image.asr.symbols.len(),
        symbol_base: asr.symbols.len(),
        scope_base: asr.scopes.len(),
        expr_base: asr.exprs.len(),
        imports,
        root: asr.root,
    };
    for mut sym in image.asr.symbols {
        sym.remap(&mut g);
        asr.symbols.push(sym);
    }
    for mut table in image.asr.scopes.into_iter().skip(1) {
        table.remap(&mut g);
        asr.scopes.push(table);
    }
    for mut e in image.asr.exprs {
        e.remap(&mut g);
        asr.exprs.push(e);
    }
    let module = g.symbol(image.module);
    if let SymbolKind::Module(m) = &mut asr.symbol_mut(module).kind {
        m.loaded_from_mod = true;
    }
    module
}
