//! Partial unification over Tarn types.
//!
//! Unification here is a pure, symmetric merge: there are no type variables
//! and no substitution table. `Unknown` is the identity element, `Variant`
//! sets are intersected by cross-unifying every pair of alternatives, and
//! basic and function types unify structurally.

use tarn_common::ty::Ty;

use crate::error::{ConstraintOrigin, TypeError};

/// Merge two types into the most specific type compatible with both.
///
/// Returns `None` when the types cannot be reconciled.
pub fn unify(a: &Ty, b: &Ty) -> Option<Ty> {
    match (a, b) {
        // Unknown is the identity.
        (Ty::Unknown, other) | (other, Ty::Unknown) => Some(other.clone()),

        // Either side is a variant: cross-unify the alternatives, treating a
        // plain type as a singleton set.
        (Ty::Variant(_), _) | (_, Ty::Variant(_)) => {
            let mut merged = Vec::new();
            for x in a.alternatives() {
                for y in b.alternatives() {
                    if let Some(ty) = unify(&x, &y) {
                        merged.push(ty);
                    }
                }
            }
            Ty::variant(merged)
        }

        (Ty::Basic(x), Ty::Basic(y)) => (x == y).then(|| a.clone()),

        (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) => {
            let params = unify_all(p1, p2)?;
            let ret = unify(r1, r2)?;
            Some(Ty::Fun(params, Box::new(ret)))
        }

        _ => None,
    }
}

/// Unify two ordered type lists element-wise.
///
/// Fails on a length mismatch or on any failing pair. This is how call
/// arguments are matched against an overload's parameters.
pub fn unify_all(a: &[Ty], b: &[Ty]) -> Option<Vec<Ty>> {
    if a.len() != b.len() {
        return None;
    }
    a.iter().zip(b).map(|(x, y)| unify(x, y)).collect()
}

/// Unify `found` against `expected`, reporting a mismatch with its origin.
pub fn unify_or_mismatch(
    expected: &Ty,
    found: &Ty,
    origin: ConstraintOrigin,
) -> Result<Ty, TypeError> {
    unify(expected, found).ok_or_else(|| TypeError::mismatch(expected, found, origin))
}

// ── Tests ──────────────────────────────────────────────────────────────
