//! Textual IR generation for the Tarn compiler.
//!
//! This crate turns a type-checked Tarn compilation unit into LLVM-flavoured
//! SSA text: one `define` per user function, the script as the entry
//! routine, and `declare` lines for the runtime routines it calls.
//!
//! ## Pipeline
//!
//! ```text
//! CompileUnit -> tarn_typeck::check -> typed CompileUnit -> translate -> IR text
//! ```

pub mod codegen;

pub use codegen::CodegenOptions;

use log::debug;

use tarn_common::ast::CompileUnit;
use tarn_typeck::error::TypeError;
use tarn_typeck::TypeckResult;

use codegen::CodeGen;

/// Generate IR for a unit that has already been type-checked.
///
/// # Errors
///
/// Returns `InsufficientPreprocessing` if the tree is missing a declaration
/// handle or a resolved type.
pub fn translate(
    unit: &CompileUnit,
    typeck: &TypeckResult,
    options: &CodegenOptions,
) -> Result<String, TypeError> {
    CodeGen::new(unit, &typeck.scopes, options).translate(unit)
}

/// Type-check `unit` in place and generate its IR.
pub fn compile(unit: &mut CompileUnit, options: &CodegenOptions) -> Result<String, TypeError> {
    let typeck = tarn_typeck::check(unit)?;
    debug!("generating module {}", options.module_name);
    translate(unit, &typeck, options)
}
