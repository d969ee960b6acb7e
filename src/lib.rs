pub mod asr;
pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod intrinsics;
pub mod modfile;
pub mod passes;
pub mod semantics;

pub use config::SemaSettings;
pub use errors::{SemanticError, SemanticErrorKind};
pub use semantics::{ast_to_asr, extend_asr, Analysis};
