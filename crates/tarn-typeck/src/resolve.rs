//! Scope initialization and signature declaration.
//!
//! Builds the scope tree for a compilation unit and binds every name in the
//! syntax tree to its declaration:
//!
//! - root scope: builtins
//! - unit scope: the overload table of user functions
//! - one scope per function body (parameters) and one for the script
//! - one scope per `for` body (the induction variable)
//!
//! Branch and while bodies share their enclosing scope. Statements are walked
//! in textual order, so a variable is visible from its declaration onwards.

use log::debug;

use tarn_common::ast::{Block, CompileUnit, Expr, ExprKind, FnDef, ScopeId, Stmt};
use tarn_common::ty::Ty;

use crate::builtins::{register_builtins, resolve_type};
use crate::error::TypeError;
use crate::scope::{DeclKind, ScopeTree, SigId, SigKind};

/// The scope tree of a unit together with the signature of each function,
/// in the order of `CompileUnit::functions`.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub tree: ScopeTree,
    pub unit_scope: ScopeId,
    pub signatures: Vec<SigId>,
}

/// Build the scope tree, declare every function signature and bind every
/// variable reference in `unit`.
pub fn resolve(unit: &mut CompileUnit) -> Result<Resolution, TypeError> {
    let mut tree = ScopeTree::new();
    register_builtins(&mut tree)?;
    let unit_scope = tree.new_scope(tree.root());
    unit.scope = Some(unit_scope);

    // Signatures first, so bodies may call functions defined later.
    let mut signatures = Vec::with_capacity(unit.functions.len());
    for f in &unit.functions {
        signatures.push(declare_signature(&mut tree, unit_scope, f)?);
    }

    let mut resolver = Resolver { tree: &mut tree };
    for f in &mut unit.functions {
        let scope = resolver.tree.new_scope(unit_scope);
        for param in &mut f.params {
            let ty = resolve_type(&param.ty)?;
            let id = resolver
                .tree
                .declare_variable(scope, &param.name, ty, DeclKind::Param, param.span)?;
            param.decl = Some(id);
        }
        resolver.block(&mut f.body, scope)?;
    }

    let script_scope = resolver.tree.new_scope(unit_scope);
    resolver.block(&mut unit.script.body, script_scope)?;

    Ok(Resolution {
        tree,
        unit_scope,
        signatures,
    })
}

/// Pass 1: put a function's signature into the unit overload table.
///
/// The return type is the annotation when there is one, `Void` for a body
/// without any `return`, and `Unknown` otherwise.
fn declare_signature(
    tree: &mut ScopeTree,
    unit_scope: ScopeId,
    f: &FnDef,
) -> Result<SigId, TypeError> {
    let params = f
        .params
        .iter()
        .map(|p| resolve_type(&p.ty))
        .collect::<Result<Vec<_>, _>>()?;
    let ret = match &f.ret {
        Some(annotation) => resolve_type(annotation)?,
        None if f.body.contains_return() => Ty::Unknown,
        None => Ty::void(),
    };
    debug!("declaring {}: {}", f.name, Ty::fun(params.clone(), ret.clone()));
    tree.declare_function(unit_scope, &f.name, params, ret, SigKind::User, f.span)
}

struct Resolver<'t> {
    tree: &'t mut ScopeTree,
}

impl Resolver<'_> {
    fn block(&mut self, block: &mut Block, scope: ScopeId) -> Result<(), TypeError> {
        block.scope = Some(scope);
        self.stmts(block, scope)
    }

    /// Bind the contents of a block that shares `scope` with its parent.
    fn stmts(&mut self, block: &mut Block, scope: ScopeId) -> Result<(), TypeError> {
        for stmt in &mut block.stmts {
            self.stmt(stmt, scope)?;
        }
        if let Some(ret) = &mut block.ret {
            self.expr(&mut ret.value, scope)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt, scope: ScopeId) -> Result<(), TypeError> {
        match stmt {
            Stmt::Decl(decl) => {
                // The initializer sees the enclosing bindings, not the new one.
                self.expr(&mut decl.value, scope)?;
                let declared = match &decl.ty {
                    Some(annotation) => resolve_type(annotation)?,
                    None => Ty::Unknown,
                };
                let id = self
                    .tree
                    .declare_variable(scope, &decl.name, declared, DeclKind::Local, decl.span)?;
                decl.decl = Some(id);
            }
            Stmt::Assign(assign) => {
                self.expr(&mut assign.value, scope)?;
                let id = self.tree.lookup_variable(scope, &assign.target).ok_or_else(|| {
                    TypeError::UndeclaredVariable {
                        name: assign.target.clone(),
                        span: assign.span,
                    }
                })?;
                assign.decl = Some(id);
            }
            Stmt::Branch(branch) => {
                let (conds, blocks) = (branch.conds.len(), branch.blocks.len());
                if conds == 0 || (blocks != conds && blocks != conds + 1) {
                    return Err(TypeError::missing(
                        format!("branch with {} conditions and {} blocks", conds, blocks),
                        branch.span,
                    ));
                }
                for cond in &mut branch.conds {
                    self.expr(cond, scope)?;
                }
                for block in &mut branch.blocks {
                    self.stmts(block, scope)?;
                }
            }
            Stmt::For(for_loop) => {
                self.expr(&mut for_loop.from, scope)?;
                self.expr(&mut for_loop.to, scope)?;
                let body_scope = self.tree.new_scope(scope);
                let id = self.tree.declare_variable(
                    body_scope,
                    &for_loop.var,
                    Ty::int(),
                    DeclKind::Induction,
                    for_loop.span,
                )?;
                for_loop.decl = Some(id);
                self.block(&mut for_loop.body, body_scope)?;
            }
            Stmt::While(while_loop) => {
                self.expr(&mut while_loop.cond, scope)?;
                self.stmts(&mut while_loop.body, scope)?;
            }
            Stmt::Call(expr) => self.expr(expr, scope)?,
        }
        Ok(())
    }

    fn expr(&mut self, expr: &mut Expr, scope: ScopeId) -> Result<(), TypeError> {
        match &mut expr.kind {
            ExprKind::Lit(_) => Ok(()),
            ExprKind::Var(var) => {
                let id = self.tree.lookup_variable(scope, &var.name).ok_or_else(|| {
                    TypeError::UndeclaredVariable {
                        name: var.name.clone(),
                        span: expr.span,
                    }
                })?;
                var.decl = Some(id);
                Ok(())
            }
            ExprKind::Call(call) => {
                for arg in &mut call.args {
                    self.expr(arg, scope)?;
                }
                Ok(())
            }
        }
    }
}
