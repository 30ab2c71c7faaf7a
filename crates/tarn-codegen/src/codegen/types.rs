//! Tarn type to IR type mapping.
//!
//! | Ty    | IR type  | zero value             |
//! |-------|----------|------------------------|
//! | Int   | `i64`    | `0`                    |
//! | Float | `double` | `0x0000000000000000`   |
//! | Bool  | `i1`     | `false`                |
//! | Void  | `void`   | (none)                 |
//!
//! Anything else reaching code generation means inference left a hole.

use tarn_common::ast::Literal;
use tarn_common::span::Span;
use tarn_common::ty::Ty;
use tarn_typeck::error::TypeError;

/// IR spelling of a resolved type.
pub fn ir_type(ty: &Ty, span: Span) -> Result<&'static str, TypeError> {
    if let Ty::Basic(con) = ty {
        match con.name.as_str() {
            "Int" => return Ok("i64"),
            "Float" => return Ok("double"),
            "Bool" => return Ok("i1"),
            "Void" => return Ok("void"),
            _ => {}
        }
    }
    Err(TypeError::missing(
        format!("no IR type for `{}`", ty),
        span,
    ))
}

/// The value returned when control falls off the end of a routine.
pub fn zero_value(ir_ty: &str) -> &'static str {
    match ir_ty {
        "double" => "0x0000000000000000",
        "i1" => "false",
        _ => "0",
    }
}

/// A float constant as its exact bit pattern.
pub fn float_constant(value: f64) -> String {
    format!("0x{:016X}", value.to_bits())
}

/// IR operand for a literal.
pub fn literal_operand(lit: &Literal) -> String {
    match lit {
        Literal::Bool(b) => b.to_string(),
        Literal::Int(n) => n.to_string(),
        Literal::Float(x) => float_constant(*x),
    }
}

/// Global symbol of a routine.
///
/// Names that are defined more than once get their parameter types
/// appended (`inc.i64`, `inc.double`). Names that are not plain
/// identifiers are quoted.
pub fn symbol(name: &str, param_tys: &[&str], overloaded: bool) -> String {
    let mut sym = name.to_string();
    if overloaded {
        for ty in param_tys {
            sym.push('.');
            sym.push_str(ty);
        }
    }
    let plain = sym
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-'));
    if plain && !sym.starts_with(|c: char| c.is_ascii_digit()) {
        format!("@{}", sym)
    } else {
        format!("@\"{}\"", sym)
    }
}
