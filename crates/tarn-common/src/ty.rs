//! Type representation for the Tarn type system.
//!
//! Defines the `Ty` enum and the nominal type constructor `TyCon`. Unlike a
//! Hindley-Milner representation there are no type variables: `Unknown` is
//! the single placeholder, and `Variant` carries the candidate set of a
//! call whose overload has not been narrowed yet.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A nominal type constructor -- `Int`, `Float`, `Bool`, `Void`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TyCon {
    pub name: String,
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon { name: name.into() }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A Tarn type.
///
/// - `Basic`: a nominal primitive, equal by name
/// - `Fun`: a function type (params -> return), equal pointwise
/// - `Variant`: one of several candidate types, pending disambiguation
/// - `Unknown`: not determined yet; the identity element of unification
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ty {
    /// A concrete primitive type.
    Basic(TyCon),
    /// A function type: `(param_types) -> return_type`.
    Fun(Vec<Ty>, Box<Ty>),
    /// An unresolved set of alternatives. Never has fewer than two members
    /// when built through [`Ty::variant`].
    Variant(BTreeSet<Ty>),
    /// Not yet determined.
    #[default]
    Unknown,
}

impl Ty {
    /// Create a basic type with the given name.
    pub fn basic(name: impl Into<String>) -> Ty {
        Ty::Basic(TyCon::new(name))
    }

    /// Create an `Int` type.
    pub fn int() -> Ty {
        Ty::basic("Int")
    }

    /// Create a `Float` type.
    pub fn float() -> Ty {
        Ty::basic("Float")
    }

    /// Create a `Bool` type.
    pub fn bool() -> Ty {
        Ty::basic("Bool")
    }

    /// Create the `Void` type of procedures.
    pub fn void() -> Ty {
        Ty::basic("Void")
    }

    /// Create a function type.
    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Fun(params, Box::new(ret))
    }

    /// Build a variant from a set of alternatives, collapsing degenerate sets.
    ///
    /// No alternatives yields `None`; exactly one yields that type; nested
    /// variants are flattened.
    pub fn variant(alternatives: impl IntoIterator<Item = Ty>) -> Option<Ty> {
        let mut set = BTreeSet::new();
        for alt in alternatives {
            match alt {
                Ty::Variant(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }
        match set.len() {
            0 => None,
            1 => set.into_iter().next(),
            _ => Some(Ty::Variant(set)),
        }
    }

    /// The alternatives this type stands for: the members of a variant, or
    /// the type itself.
    pub fn alternatives(&self) -> Vec<Ty> {
        match self {
            Ty::Variant(set) => set.iter().cloned().collect(),
            other => vec![other.clone()],
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Basic(con) if con.name == "Void")
    }

    /// True when the type contains no `Unknown` and no `Variant`, recursively.
    pub fn is_fully_known(&self) -> bool {
        match self {
            Ty::Basic(_) => true,
            Ty::Fun(params, ret) => params.iter().all(Ty::is_fully_known) && ret.is_fully_known(),
            Ty::Variant(_) | Ty::Unknown => false,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Basic(c) => write!(f, "{}", c),
            Ty::Fun(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Ty::Variant(alts) => {
                write!(f, "{{")?;
                for (i, a) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, "}}")
            }
            Ty::Unknown => write!(f, "?"),
        }
    }
}
