//! Type error types with provenance tracking.
//!
//! Every mismatch carries a `ConstraintOrigin` recording which construct
//! demanded the two types agree, so diagnostics can point at the assignment,
//! condition or return statement responsible rather than a bare pair of
//! types.

use std::fmt;

use tarn_common::span::Span;
use tarn_common::ty::Ty;

/// The origin of a type constraint -- where in the source code did we
/// decide these two types should be equal?
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintOrigin {
    /// `target = value`: the value must match the variable's type.
    Assignment { target: String, span: Span },
    /// `name: Ty := value`: the value must match the annotation.
    Annotation {
        name: String,
        annotation_span: Span,
        value_span: Span,
    },
    /// A branch or while condition must be `Bool`.
    Condition { span: Span },
    /// A `for` bound must be `Int`.
    ForBound { span: Span },
    /// A `return` expression must match the function's return type.
    Return { return_span: Span, fn_span: Span },
    /// A function without any `return` must be declared `Void`.
    MissingReturn { fn_span: Span },
    /// The value stored in `name` must not be `Void`.
    StoredValue { name: String, span: Span },
    /// Synthetic origin for internal constraints.
    Builtin,
}

impl ConstraintOrigin {
    /// Primary span of the constraint, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            ConstraintOrigin::Assignment { span, .. } => Some(*span),
            ConstraintOrigin::Annotation { value_span, .. } => Some(*value_span),
            ConstraintOrigin::Condition { span } => Some(*span),
            ConstraintOrigin::ForBound { span } => Some(*span),
            ConstraintOrigin::Return { return_span, .. } => Some(*return_span),
            ConstraintOrigin::MissingReturn { fn_span } => Some(*fn_span),
            ConstraintOrigin::StoredValue { span, .. } => Some(*span),
            ConstraintOrigin::Builtin => None,
        }
    }
}

/// An error that aborts the compilation of a unit.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// A name was not found in the scope chain.
    UndeclaredVariable { name: String, span: Span },
    /// No overload of `name` accepts the argument types (or no function of
    /// that name exists at all).
    UndeclaredFunction {
        name: String,
        args: Vec<Ty>,
        span: Span,
    },
    /// Two types that must unify do not.
    TypeMismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
    },
    /// A consumer needed a concrete type but the expression is still unknown
    /// or ambiguous.
    CouldNotInferType { ty: Ty, span: Span },
    /// A name or overload key was declared twice in one scope.
    IllegalRedefine {
        name: String,
        span: Span,
        previous: Span,
    },
    /// Assignment to a parameter or loop variable.
    NotAssignable { name: String, span: Span },
    /// A node reached a later pass without an annotation an earlier pass
    /// must have left. Always a compiler defect.
    InsufficientPreprocessing { what: String, span: Span },
    /// A type annotation names no known type.
    UnknownType { name: String, span: Span },
}

impl TypeError {
    /// Primary span of the error.
    pub fn span(&self) -> Span {
        match self {
            TypeError::UndeclaredVariable { span, .. }
            | TypeError::UndeclaredFunction { span, .. }
            | TypeError::CouldNotInferType { span, .. }
            | TypeError::IllegalRedefine { span, .. }
            | TypeError::NotAssignable { span, .. }
            | TypeError::InsufficientPreprocessing { span, .. }
            | TypeError::UnknownType { span, .. } => *span,
            TypeError::TypeMismatch { origin, .. } => origin.span().unwrap_or_default(),
        }
    }

    /// Whether the error signals a defect in the compiler rather than in the
    /// program being compiled.
    pub fn is_internal(&self) -> bool {
        matches!(self, TypeError::InsufficientPreprocessing { .. })
    }

    pub(crate) fn mismatch(expected: &Ty, found: &Ty, origin: ConstraintOrigin) -> Self {
        TypeError::TypeMismatch {
            expected: expected.clone(),
            found: found.clone(),
            origin,
        }
    }

    pub fn missing(what: impl Into<String>, span: Span) -> Self {
        TypeError::InsufficientPreprocessing {
            what: what.into(),
            span,
        }
    }
}

fn write_types(f: &mut fmt::Formatter<'_>, tys: &[Ty]) -> fmt::Result {
    for (i, ty) in tys.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UndeclaredVariable { name, .. } => {
                write!(f, "undeclared variable `{}`", name)
            }
            TypeError::UndeclaredFunction { name, args, .. } => {
                write!(f, "no function `{}` accepting (", name)?;
                write_types(f, args)?;
                write!(f, ")")
            }
            TypeError::TypeMismatch {
                origin: ConstraintOrigin::StoredValue { name, .. },
                ..
            } => {
                write!(f, "`{}` cannot hold the result of a procedure", name)
            }
            TypeError::TypeMismatch {
                expected, found, ..
            } => {
                write!(f, "type mismatch: expected `{}`, found `{}`", expected, found)
            }
            TypeError::CouldNotInferType { ty, .. } => match ty {
                Ty::Variant(_) => write!(f, "ambiguous type: could be any of {}", ty),
                _ => write!(f, "could not infer type"),
            },
            TypeError::IllegalRedefine { name, .. } => {
                write!(f, "`{}` is already defined in this scope", name)
            }
            TypeError::NotAssignable { name, .. } => {
                write!(f, "cannot assign to `{}`", name)
            }
            TypeError::InsufficientPreprocessing { what, .. } => {
                write!(f, "internal compiler error: {}", what)
            }
            TypeError::UnknownType { name, .. } => {
                write!(f, "unknown type `{}`", name)
            }
        }
    }
}

impl std::error::Error for TypeError {}
