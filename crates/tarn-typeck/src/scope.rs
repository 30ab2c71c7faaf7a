//! Lexical scope tree.
//!
//! Scopes are stored in an arena and addressed by `ScopeId`; each scope
//! except the root points at its parent. Variable declarations live in a
//! second arena addressed by `DeclId`, which is the handle the syntax tree
//! carries on every binding and reference. Function signatures live in a
//! third arena addressed by `SigId`, grouped per scope into overload sets.
//!
//! Lookups walk from a scope towards the root and return the nearest match.
//! Overload sets do not merge across levels: the nearest scope declaring any
//! overload of a name hides every outer overload of it.

use rustc_hash::FxHashMap;

use tarn_common::ast::{DeclId, ScopeId};
use tarn_common::span::Span;
use tarn_common::ty::Ty;

use crate::error::TypeError;

/// Index of a function signature in the scope tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigId(pub u32);

/// What introduced a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    /// A function parameter.
    Param,
    /// A `name := value` declaration.
    Local,
    /// The variable of a `for` loop.
    Induction,
}

impl DeclKind {
    /// Only locals may be the target of an assignment.
    pub fn is_assignable(self) -> bool {
        matches!(self, DeclKind::Local)
    }
}

/// A declared variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub name: String,
    /// The type fixed at declaration: the annotation of a parameter or
    /// typed local, `Int` for an induction variable, `Unknown` otherwise.
    pub declared: Ty,
    /// The current type, refined by inference.
    pub ty: Ty,
    pub assignable: bool,
    pub kind: DeclKind,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SigKind {
    /// Pre-declared in the root scope.
    Builtin,
    /// Declared by a function definition.
    User,
}

/// One member of an overload set.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub kind: SigKind,
    pub span: Span,
}

impl Signature {
    /// The signature as a function type.
    pub fn fn_ty(&self) -> Ty {
        Ty::fun(self.params.clone(), self.ret.clone())
    }
}

#[derive(Clone, Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    vars: FxHashMap<String, DeclId>,
    fns: FxHashMap<String, Vec<SigId>>,
}

/// The arena of scopes, declarations and signatures for one compilation.
#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    decls: Vec<VarDecl>,
    sigs: Vec<Signature>,
}

impl ScopeTree {
    /// Create a tree holding only an empty root scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope::default()],
            decls: Vec::new(),
            sigs: Vec::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a child scope of `parent`.
    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0 as usize].parent
    }

    fn chain(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(Some(scope), move |s| self.parent(*s))
            .map(move |s| &self.scopes[s.0 as usize])
    }

    // ── Variables ──────────────────────────────────────────────────────

    /// Declare a variable in `scope`.
    ///
    /// A name may be declared once per scope; inner scopes may shadow it.
    pub fn declare_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: Ty,
        kind: DeclKind,
        span: Span,
    ) -> Result<DeclId, TypeError> {
        if let Some(&prev) = self.scopes[scope.0 as usize].vars.get(name) {
            return Err(TypeError::IllegalRedefine {
                name: name.to_string(),
                span,
                previous: self.var(prev).span,
            });
        }
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(VarDecl {
            name: name.to_string(),
            declared: ty.clone(),
            ty,
            assignable: kind.is_assignable(),
            kind,
            scope,
            span,
        });
        self.scopes[scope.0 as usize].vars.insert(name.to_string(), id);
        Ok(id)
    }

    /// Find the nearest declaration of `name` visible from `scope`.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.chain(scope).find_map(|s| s.vars.get(name).copied())
    }

    pub fn var(&self, id: DeclId) -> &VarDecl {
        &self.decls[id.0 as usize]
    }

    /// Checked access for handles that arrive on a syntax tree.
    pub fn try_var(&self, id: DeclId) -> Option<&VarDecl> {
        self.decls.get(id.0 as usize)
    }

    pub fn set_var_type(&mut self, id: DeclId, ty: Ty) {
        self.decls[id.0 as usize].ty = ty;
    }

    /// Forget every inferred variable type, restoring declared types.
    pub fn reset_inferred(&mut self) {
        for decl in &mut self.decls {
            decl.ty = decl.declared.clone();
        }
    }

    // ── Functions ──────────────────────────────────────────────────────

    /// Add a signature to the overload set of `name` in `scope`.
    ///
    /// The `(name, params)` key must be unique within the scope.
    pub fn declare_function(
        &mut self,
        scope: ScopeId,
        name: &str,
        params: Vec<Ty>,
        ret: Ty,
        kind: SigKind,
        span: Span,
    ) -> Result<SigId, TypeError> {
        if let Some(existing) = self.scopes[scope.0 as usize].fns.get(name) {
            if let Some(&dup) = existing.iter().find(|id| self.signature(**id).params == params) {
                return Err(TypeError::IllegalRedefine {
                    name: name.to_string(),
                    span,
                    previous: self.signature(dup).span,
                });
            }
        }
        let id = SigId(self.sigs.len() as u32);
        self.sigs.push(Signature {
            name: name.to_string(),
            params,
            ret,
            kind,
            span,
        });
        self.scopes[scope.0 as usize]
            .fns
            .entry(name.to_string())
            .or_default()
            .push(id);
        Ok(id)
    }

    /// The overload set of the nearest scope that declares `name`, in
    /// declaration order. Empty when no scope does.
    pub fn lookup_overloads(&self, scope: ScopeId, name: &str) -> &[SigId] {
        self.chain(scope)
            .find_map(|s| s.fns.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn signature(&self, id: SigId) -> &Signature {
        &self.sigs[id.0 as usize]
    }

    /// Back-fill the return type of a signature.
    pub fn set_return(&mut self, id: SigId, ret: Ty) {
        self.sigs[id.0 as usize].ret = ret;
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(tree: &mut ScopeTree, scope: ScopeId, name: &str, ty: Ty) -> DeclId {
        tree.declare_variable(scope, name, ty, DeclKind::Local, Span::default())
            .unwrap()
    }

    #[test]
    fn lookup_walks_ancestors() {
        let mut tree = ScopeTree::new();
        let outer = tree.new_scope(tree.root());
        let inner = tree.new_scope(outer);
        let x = local(&mut tree, outer, "x", Ty::int());

        assert_eq!(tree.lookup_variable(inner, "x"), Some(x));
        assert_eq!(tree.lookup_variable(inner, "y"), None);
    }

    #[test]
    fn shadowing() {
        let mut tree = ScopeTree::new();
        let outer = tree.new_scope(tree.root());
        let inner = tree.new_scope(outer);
        let outer_x = local(&mut tree, outer, "x", Ty::int());
        let inner_x = local(&mut tree, inner, "x", Ty::float());

        assert_eq!(tree.lookup_variable(inner, "x"), Some(inner_x));
        assert_eq!(tree.lookup_variable(outer, "x"), Some(outer_x));
        assert_eq!(tree.var(inner_x).ty, Ty::float());
    }

    #[test]
    fn siblings_are_isolated() {
        let mut tree = ScopeTree::new();
        let parent = tree.new_scope(tree.root());
        let left = tree.new_scope(parent);
        let right = tree.new_scope(parent);
        local(&mut tree, left, "only_left", Ty::bool());

        assert!(tree.lookup_variable(left, "only_left").is_some());
        assert!(tree.lookup_variable(right, "only_left").is_none());
        assert!(tree.lookup_variable(parent, "only_left").is_none());
    }

    #[test]
    fn redeclaring_in_same_scope_is_rejected() {
        let mut tree = ScopeTree::new();
        let scope = tree.new_scope(tree.root());
        tree.declare_variable(scope, "x", Ty::int(), DeclKind::Local, Span::new(0, 1))
            .unwrap();
        let err = tree
            .declare_variable(scope, "x", Ty::int(), DeclKind::Local, Span::new(10, 11))
            .unwrap_err();
        assert_eq!(
            err,
            TypeError::IllegalRedefine {
                name: "x".into(),
                span: Span::new(10, 11),
                previous: Span::new(0, 1),
            }
        );
    }

    #[test]
    fn params_and_induction_are_not_assignable() {
        let mut tree = ScopeTree::new();
        let scope = tree.new_scope(tree.root());
        let p = tree
            .declare_variable(scope, "p", Ty::int(), DeclKind::Param, Span::default())
            .unwrap();
        let i = tree
            .declare_variable(scope, "i", Ty::int(), DeclKind::Induction, Span::default())
            .unwrap();
        let l = local(&mut tree, scope, "l", Ty::Unknown);
        assert!(!tree.var(p).assignable);
        assert!(!tree.var(i).assignable);
        assert!(tree.var(l).assignable);
    }

    #[test]
    fn reset_restores_declared_types() {
        let mut tree = ScopeTree::new();
        let scope = tree.new_scope(tree.root());
        let x = local(&mut tree, scope, "x", Ty::Unknown);
        tree.set_var_type(x, Ty::int());
        assert_eq!(tree.var(x).ty, Ty::int());
        tree.reset_inferred();
        assert_eq!(tree.var(x).ty, Ty::Unknown);
    }

    #[test]
    fn overloads_share_a_name() {
        let mut tree = ScopeTree::new();
        let unit = tree.new_scope(tree.root());
        let a = tree
            .declare_function(unit, "inc", vec![Ty::int()], Ty::int(), SigKind::User, Span::default())
            .unwrap();
        let b = tree
            .declare_function(unit, "inc", vec![Ty::float()], Ty::float(), SigKind::User, Span::default())
            .unwrap();
        assert_eq!(tree.lookup_overloads(unit, "inc"), &[a, b]);
        assert!(tree.lookup_overloads(unit, "dec").is_empty());
    }

    #[test]
    fn duplicate_overload_key_is_rejected() {
        let mut tree = ScopeTree::new();
        let unit = tree.new_scope(tree.root());
        tree.declare_function(unit, "f", vec![Ty::int()], Ty::int(), SigKind::User, Span::default())
            .unwrap();
        // Same parameters, different return: still the same key.
        let err = tree
            .declare_function(unit, "f", vec![Ty::int()], Ty::float(), SigKind::User, Span::default())
            .unwrap_err();
        assert!(matches!(err, TypeError::IllegalRedefine { name, .. } if name == "f"));
    }

    #[test]
    fn nearest_overload_set_hides_outer_ones() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let unit = tree.new_scope(root);
        let body = tree.new_scope(unit);
        tree.declare_function(root, "+", vec![Ty::int(), Ty::int()], Ty::int(), SigKind::Builtin, Span::default())
            .unwrap();
        let user = tree
            .declare_function(unit, "+", vec![Ty::bool(), Ty::bool()], Ty::bool(), SigKind::User, Span::default())
            .unwrap();
        assert_eq!(tree.lookup_overloads(body, "+"), &[user]);
        assert_eq!(tree.lookup_overloads(root, "+").len(), 1);
    }

    #[test]
    fn set_return_back_fills() {
        let mut tree = ScopeTree::new();
        let unit = tree.new_scope(tree.root());
        let f = tree
            .declare_function(unit, "f", vec![], Ty::Unknown, SigKind::User, Span::default())
            .unwrap();
        tree.set_return(f, Ty::int());
        assert_eq!(tree.signature(f).fn_ty(), Ty::fun(vec![], Ty::int()));
    }
}
