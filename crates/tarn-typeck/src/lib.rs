//! Tarn type checker: scope resolution and overload-resolving inference.
//!
//! Parameter types are always annotated; return types, local variable types
//! and the types of call expressions are inferred. Calls are resolved
//! against overload sets by unification, with `Variant` types standing in
//! for calls whose overload is still open until a consuming context picks
//! one.
//!
//! # Architecture
//!
//! - [`unify`]: partial unification over `Ty`
//! - [`scope`]: arena scope tree with variable and overload tables
//! - [`builtins`]: built-in type names and operator overloads
//! - [`resolve`]: scope initialization and signature declaration
//! - [`infer`]: return-type discovery and the committing inference pass
//! - [`error`]: type error types with provenance tracking
//! - [`diagnostics`]: ariadne and JSON rendering of errors

pub mod builtins;
pub mod diagnostics;
pub mod error;
pub mod infer;
pub mod resolve;
pub mod scope;
pub mod unify;

use log::debug;

use tarn_common::ast::{CompileUnit, ScopeId};

use crate::error::TypeError;
use crate::scope::{ScopeTree, SigId};

/// The result of type checking a Tarn compilation unit.
///
/// The syntax tree itself carries the resolved types; this holds the scope
/// tree its declaration handles point into.
#[derive(Clone, Debug)]
pub struct TypeckResult {
    pub scopes: ScopeTree,
    pub unit_scope: ScopeId,
    /// Signature of each function, in the order of `CompileUnit::functions`.
    pub signatures: Vec<SigId>,
}

/// Type-check a compilation unit in place.
///
/// Binds every name, infers every type and writes the type slots of the
/// tree. The first error aborts checking. Running it again on a checked
/// tree is a no-op.
pub fn check(unit: &mut CompileUnit) -> Result<TypeckResult, TypeError> {
    debug!("resolving scopes");
    let mut res = resolve::resolve(unit)?;
    infer::infer_unit(unit, &mut res)?;
    Ok(TypeckResult {
        scopes: res.tree,
        unit_scope: res.unit_scope,
        signatures: res.signatures,
    })
}
