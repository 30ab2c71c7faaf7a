//! Built-in type and operator registration.
//!
//! Registers the primitive type names (Int, Float, Bool, Void) used by
//! annotations, and the overloaded operators and procedures that every
//! program can call, into the root scope of a fresh scope tree.

use tarn_common::ast::TypeExpr;
use tarn_common::span::Span;
use tarn_common::ty::Ty;

use crate::error::TypeError;
use crate::scope::{ScopeTree, SigKind};

/// Type names accepted in annotations.
pub const TYPE_NAMES: [&str; 4] = ["Int", "Float", "Bool", "Void"];

/// Resolve an annotation to its type.
pub fn resolve_type(expr: &TypeExpr) -> Result<Ty, TypeError> {
    if TYPE_NAMES.contains(&expr.name.as_str()) {
        Ok(Ty::basic(expr.name.as_str()))
    } else {
        Err(TypeError::UnknownType {
            name: expr.name.clone(),
            span: expr.span,
        })
    }
}

/// Register all built-in functions in the root scope.
///
/// After this call the root scope contains:
/// - Arithmetic: `+ - * / %` and `^` on Int and Float
/// - Negation: unary `-` on Int and Float
/// - Comparison: `== != < <= > >=` on Int and Float, `== !=` on Bool
/// - Logic: `and`, `or`, `not` on Bool
/// - I/O: `print` on Int, Float and Bool
pub fn register_builtins(tree: &mut ScopeTree) -> Result<(), TypeError> {
    let root = tree.root();
    let mut add = |name: &str, params: Vec<Ty>, ret: Ty| {
        tree.declare_function(root, name, params, ret, SigKind::Builtin, Span::default())
            .map(|_| ())
    };

    // ── Arithmetic ─────────────────────────────────────────────────

    for num in [Ty::int(), Ty::float()] {
        for op in ["+", "-", "*", "/", "%", "^"] {
            add(op, vec![num.clone(), num.clone()], num.clone())?;
        }
        add("-", vec![num.clone()], num.clone())?;
    }

    // ── Comparison ─────────────────────────────────────────────────

    for num in [Ty::int(), Ty::float()] {
        for op in ["==", "!=", "<", "<=", ">", ">="] {
            add(op, vec![num.clone(), num.clone()], Ty::bool())?;
        }
    }
    for op in ["==", "!="] {
        add(op, vec![Ty::bool(), Ty::bool()], Ty::bool())?;
    }

    // ── Logic ──────────────────────────────────────────────────────

    add("and", vec![Ty::bool(), Ty::bool()], Ty::bool())?;
    add("or", vec![Ty::bool(), Ty::bool()], Ty::bool())?;
    add("not", vec![Ty::bool()], Ty::bool())?;

    // ── I/O ────────────────────────────────────────────────────────

    for ty in [Ty::int(), Ty::float(), Ty::bool()] {
        add("print", vec![ty], Ty::void())?;
    }

    Ok(())
}
