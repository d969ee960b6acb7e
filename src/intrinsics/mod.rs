//! Intrinsic procedures.
//!
//! Intrinsics are imported on first use as external symbols pointing into
//! one of the `lfortran_intrinsic_*` modules, which are created on demand.
//! A call of an array intrinsic resolves to an `IntrinsicArrayFunction` node
//! that the lowering pass later replaces.

use log::debug;

use crate::asr::{Abi, Access, Asr, DefType, ExternalSymbol, Function, Module, ScopeId, SymbolId, SymbolKind};

pub mod array;
pub mod builder;
pub mod scalar;

const INTRINSIC_MODULES: &[&str] = &[
    "lfortran_intrinsic_kind",
    "lfortran_intrinsic_math",
    "lfortran_intrinsic_array",
    "lfortran_intrinsic_string",
];

pub fn is_intrinsic_module(name: &str) -> bool {
    INTRINSIC_MODULES.contains(&name)
}

/// Module that provides an intrinsic.
pub fn module_for(name: &str) -> Option<&'static str> {
    match scalar::lookup(name) {
        Some(i) => Some(i.module),
        None => array::lookup(name).map(|_| "lfortran_intrinsic_array"),
    }
}

/// The function `name` of intrinsic module `module`, creating the module and
/// the function as needed.
pub fn intrinsic_function(asr: &mut Asr, module: &str, name: &str) -> SymbolId {
    let root = asr.root;
    let module_sym = match asr.scope(root).get(module) {
        Some(m) => m,
        None => {
            debug!("creating intrinsic module '{}'", module);
            let scope = asr.new_scope(Some(root));
            let m = asr.add_symbol(
                module,
                root,
                SymbolKind::Module(Module {
                    scope,
                    dependencies: Vec::new(),
                    intrinsic: true,
                    loaded_from_mod: false,
                }),
            );
            asr.scope_mut(scope).owner = Some(m);
            asr.overwrite(root, module, m);
            m
        }
    };
    let Some(mscope) = asr.symbol_scope(module_sym) else {
        crate::internal_error!("intrinsic module '{}' has no scope", module);
    };
    if let Some(f) = asr.scope(mscope).get(name) {
        return f;
    }
    let fscope = asr.new_scope(Some(mscope));
    let f = asr.add_symbol(
        name,
        mscope,
        SymbolKind::Function(Function {
            scope: fscope,
            args: Vec::new(),
            return_var: None,
            body: Vec::new(),
            abi: Abi::Intrinsic,
            deftype: DefType::Interface,
            access: Access::Public,
            dependencies: Vec::new(),
        }),
    );
    asr.scope_mut(fscope).owner = Some(f);
    asr.overwrite(mscope, name, f);
    f
}

/// Makes intrinsic `name` visible in `scope` through an external symbol,
/// and records the dependency on its module. `None` when `name` is not an
/// intrinsic.
pub fn import_intrinsic(asr: &mut Asr, scope: ScopeId, name: &str) -> Option<SymbolId> {
    let module = module_for(name)?;
    let target = intrinsic_function(asr, module, name);
    if let Some(existing) = asr.scope(scope).get(name) {
        if asr.past_external(existing) == target {
            return Some(existing);
        }
    }
    let local = asr.unique_name(scope, name);
    let ext = asr.add_symbol(
        local.clone(),
        scope,
        SymbolKind::ExternalSymbol(ExternalSymbol {
            target,
            module_name: module.to_string(),
            original_name: name.to_string(),
            access: Access::Private,
        }),
    );
    asr.overwrite(scope, &local, ext);
    asr.add_dependency(scope, module);
    Some(ext)
}
