//! Shared types for the Tarn compiler.
//!
//! - [`span`]: byte spans and on-demand line/column lookup
//! - [`ty`]: the type model (`Basic`, `Fun`, `Variant`, `Unknown`)
//! - [`ast`]: the syntax tree contract between the parser and the core,
//!   including the annotation slots filled by scope resolution and inference

pub mod ast;
pub mod span;
pub mod ty;
