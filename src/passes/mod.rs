//! Passes over a resolved translation unit.

pub mod array_intrinsics;
pub mod lints;
