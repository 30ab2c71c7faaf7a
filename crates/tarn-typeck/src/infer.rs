//! Body inference and overload resolution.
//!
//! Runs after [`crate::resolve`] has bound every name. Inference of an
//! expression is split in two:
//!
//! - `synth` computes a type bottom-up without touching the tree. A call
//!   whose arguments match several overloads synthesizes a `Variant` of the
//!   candidate return types.
//! - `commit` pushes the type demanded by the consuming context back down,
//!   picks the single matching overload of each call and writes the type
//!   slots.
//!
//! Return types that are not annotated are discovered by probing: function
//! bodies are inferred in `Probe` mode, which never writes slots, and every
//! signature whose return type comes out fully known is back-filled. Rounds
//! repeat until one back-fills nothing, then a `Commit` pass over every
//! function and the script writes the tree and reports the first error.

use log::{debug, trace};

use tarn_common::ast::{Block, CompileUnit, DeclId, Expr, ExprKind, FnDef, ScopeId, Stmt, TypeSlot};
use tarn_common::span::Span;
use tarn_common::ty::Ty;

use crate::error::{ConstraintOrigin, TypeError};
use crate::resolve::Resolution;
use crate::scope::{ScopeTree, SigId, VarDecl};
use crate::unify::{unify, unify_all, unify_or_mismatch};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    /// Infer types only; leave the tree untouched.
    Probe,
    /// Require fully known types and write them into the tree.
    Commit,
}

/// What the enclosing routine expects of `return` statements.
struct RoutineCtx {
    /// Return type so far: the declared or back-filled type, refined by
    /// every `return` seen.
    ret: Ty,
    fn_span: Span,
    is_script: bool,
}

/// Infer every function body and the script of `unit`.
pub fn infer_unit(unit: &mut CompileUnit, res: &mut Resolution) -> Result<(), TypeError> {
    let failed = discover_returns(unit, res);

    // Functions whose last probe failed go first: their error is the cause
    // of any unknown return type their callers run into.
    let mut order: Vec<usize> = (0..unit.functions.len()).collect();
    order.sort_by_key(|&i| !failed[i]);

    debug!("committing types");
    res.tree.reset_inferred();
    for i in order {
        let mut infer = Infer::new(&mut res.tree, res.unit_scope, Mode::Commit);
        infer.function(&mut unit.functions[i], res.signatures[i])?;
    }
    let mut infer = Infer::new(&mut res.tree, res.unit_scope, Mode::Commit);
    infer.script(&mut unit.script.body, unit.script.span)
}

/// Probe rounds: back-fill every return type that can be discovered.
///
/// Returns, per function, whether its last probe ended in an error.
fn discover_returns(unit: &mut CompileUnit, res: &mut Resolution) -> Vec<bool> {
    let mut failed = vec![false; unit.functions.len()];
    let mut round = 0;
    loop {
        round += 1;
        let mut progress = false;
        for (i, (f, &sig)) in unit.functions.iter_mut().zip(&res.signatures).enumerate() {
            if res.tree.signature(sig).ret.is_fully_known() {
                continue;
            }
            res.tree.reset_inferred();
            let mut infer = Infer::new(&mut res.tree, res.unit_scope, Mode::Probe);
            let probe = infer.routine_body(f, sig);
            failed[i] = probe.is_err();
            match probe {
                Ok(ret) if ret.is_fully_known() => {
                    debug!("round {}: {} returns {}", round, f.name, ret);
                    res.tree.set_return(sig, ret);
                    progress = true;
                }
                Ok(ret) => trace!("round {}: {} still returns {}", round, f.name, ret),
                Err(err) => trace!("round {}: probing {} failed: {}", round, f.name, err),
            }
        }
        if !progress {
            return failed;
        }
    }
}

fn write_slot(slot: &mut TypeSlot, ty: Ty, span: Span) -> Result<(), TypeError> {
    slot.set(ty).map_err(|conflict| {
        TypeError::missing(
            format!(
                "type slot already holds `{}`, cannot write `{}`",
                conflict.existing, conflict.attempted
            ),
            span,
        )
    })
}

/// A variable cannot hold the result of a procedure.
fn stored_value(name: &str, expected: &Ty, ty: &Ty, span: Span) -> Result<(), TypeError> {
    if ty.is_void() {
        return Err(TypeError::mismatch(
            expected,
            ty,
            ConstraintOrigin::StoredValue {
                name: name.to_string(),
                span,
            },
        ));
    }
    Ok(())
}

struct Infer<'t> {
    tree: &'t mut ScopeTree,
    unit_scope: ScopeId,
    mode: Mode,
}

impl<'t> Infer<'t> {
    fn new(tree: &'t mut ScopeTree, unit_scope: ScopeId, mode: Mode) -> Self {
        Infer {
            tree,
            unit_scope,
            mode,
        }
    }

    fn var(&self, id: DeclId, span: Span) -> Result<&VarDecl, TypeError> {
        self.tree
            .try_var(id)
            .ok_or_else(|| TypeError::missing(format!("dangling declaration handle {}", id.0), span))
    }

    // ── Routines ───────────────────────────────────────────────────────

    /// Infer a function body and return its resulting return type.
    fn routine_body(&mut self, f: &mut FnDef, sig: SigId) -> Result<Ty, TypeError> {
        let mut ctx = RoutineCtx {
            ret: self.tree.signature(sig).ret.clone(),
            fn_span: f.span,
            is_script: false,
        };
        self.block(&mut f.body, &mut ctx)?;
        Ok(ctx.ret)
    }

    fn function(&mut self, f: &mut FnDef, sig: SigId) -> Result<(), TypeError> {
        debug!("inferring function {}", f.name);
        let ret = self.routine_body(f, sig)?;

        if !ret.is_void() && !f.body.contains_return() {
            return Err(TypeError::mismatch(
                &ret,
                &Ty::void(),
                ConstraintOrigin::MissingReturn { fn_span: f.span },
            ));
        }
        if !ret.is_fully_known() {
            return Err(TypeError::CouldNotInferType { ty: ret, span: f.span });
        }
        write_slot(&mut f.ret_ty, ret.clone(), f.span)?;
        self.tree.set_return(sig, ret);
        Ok(())
    }

    fn script(&mut self, body: &mut Block, span: Span) -> Result<(), TypeError> {
        debug!("inferring script");
        let mut ctx = RoutineCtx {
            ret: Ty::int(),
            fn_span: span,
            is_script: true,
        };
        self.block(body, &mut ctx)
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn block(&mut self, block: &mut Block, ctx: &mut RoutineCtx) -> Result<(), TypeError> {
        for stmt in &mut block.stmts {
            self.stmt(stmt, ctx)?;
        }
        if let Some(ret) = &mut block.ret {
            let origin = ConstraintOrigin::Return {
                return_span: ret.span,
                fn_span: ctx.fn_span,
            };
            let expected = if ctx.is_script { Ty::int() } else { ctx.ret.clone() };
            ctx.ret = self.consume(&mut ret.value, &expected, origin)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt, ctx: &mut RoutineCtx) -> Result<(), TypeError> {
        match stmt {
            Stmt::Decl(decl) => {
                let id = decl
                    .decl
                    .ok_or_else(|| TypeError::missing("unbound declaration", decl.span))?;
                let declared = self.var(id, decl.span)?.declared.clone();
                let origin = match &decl.ty {
                    Some(annotation) => ConstraintOrigin::Annotation {
                        name: decl.name.clone(),
                        annotation_span: annotation.span,
                        value_span: decl.value.span,
                    },
                    None => ConstraintOrigin::Builtin,
                };
                let ty = self.consume(&mut decl.value, &declared, origin)?;
                stored_value(&decl.name, &declared, &ty, decl.value.span)?;
                trace!("{} : {}", decl.name, ty);
                self.tree.set_var_type(id, ty);
            }
            Stmt::Assign(assign) => {
                let id = assign
                    .decl
                    .ok_or_else(|| TypeError::missing("unbound assignment target", assign.span))?;
                let var = self.var(id, assign.span)?;
                if !var.assignable {
                    return Err(TypeError::NotAssignable {
                        name: assign.target.clone(),
                        span: assign.span,
                    });
                }
                let current = var.ty.clone();
                let origin = ConstraintOrigin::Assignment {
                    target: assign.target.clone(),
                    span: assign.span,
                };
                let ty = self.consume(&mut assign.value, &current, origin)?;
                stored_value(&assign.target, &current, &ty, assign.value.span)?;
                self.tree.set_var_type(id, ty);
            }
            Stmt::Branch(branch) => {
                for cond in &mut branch.conds {
                    let origin = ConstraintOrigin::Condition { span: cond.span };
                    self.consume(cond, &Ty::bool(), origin)?;
                }
                for block in &mut branch.blocks {
                    self.block(block, ctx)?;
                }
            }
            Stmt::For(for_loop) => {
                for bound in [&mut for_loop.from, &mut for_loop.to] {
                    let origin = ConstraintOrigin::ForBound { span: bound.span };
                    self.consume(bound, &Ty::int(), origin)?;
                }
                self.block(&mut for_loop.body, ctx)?;
            }
            Stmt::While(while_loop) => {
                let origin = ConstraintOrigin::Condition {
                    span: while_loop.cond.span,
                };
                self.consume(&mut while_loop.cond, &Ty::bool(), origin)?;
                self.block(&mut while_loop.body, ctx)?;
            }
            Stmt::Call(expr) => {
                // Any result type is accepted, but it must be unambiguous.
                self.consume(expr, &Ty::Unknown, ConstraintOrigin::Builtin)?;
            }
        }
        Ok(())
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Infer `expr` in a context expecting `expected`.
    ///
    /// The context is where a pending overload choice gets decided: the
    /// synthesized type is unified with `expected` and must then be a single
    /// type. In commit mode it must also be fully known and is written down.
    fn consume(
        &mut self,
        expr: &mut Expr,
        expected: &Ty,
        origin: ConstraintOrigin,
    ) -> Result<Ty, TypeError> {
        let found = self.synth(expr)?;
        let ty = unify_or_mismatch(expected, &found, origin)?;
        if matches!(ty, Ty::Variant(_)) {
            return Err(TypeError::CouldNotInferType { ty, span: expr.span });
        }
        if self.mode == Mode::Commit {
            self.commit(expr, &ty)?;
        }
        Ok(ty)
    }

    /// Bottom-up type of `expr`. Never writes to the tree.
    fn synth(&self, expr: &Expr) -> Result<Ty, TypeError> {
        match &expr.kind {
            ExprKind::Lit(lit) => Ok(lit.ty()),
            ExprKind::Var(var) => {
                let id = var
                    .decl
                    .ok_or_else(|| TypeError::missing("unbound variable reference", expr.span))?;
                Ok(self.var(id, expr.span)?.ty.clone())
            }
            ExprKind::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.synth(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let candidates = self.candidates(&call.name, &args);
                if candidates.is_empty() {
                    return Err(TypeError::UndeclaredFunction {
                        name: call.name.clone(),
                        args,
                        span: expr.span,
                    });
                }
                let rets: Vec<Ty> = candidates
                    .iter()
                    .map(|id| self.tree.signature(*id).ret.clone())
                    .collect();
                if rets.iter().any(Ty::is_unknown) {
                    return Ok(Ty::Unknown);
                }
                Ok(Ty::variant(rets).unwrap_or_default())
            }
        }
    }

    /// Overloads of `name` whose parameters accept `args`.
    fn candidates(&self, name: &str, args: &[Ty]) -> Vec<SigId> {
        self.tree
            .lookup_overloads(self.unit_scope, name)
            .iter()
            .copied()
            .filter(|id| unify_all(&self.tree.signature(*id).params, args).is_some())
            .collect()
    }

    /// Write `ty`, and the types it implies for sub-expressions, into the
    /// slots of `expr`.
    fn commit(&mut self, expr: &mut Expr, ty: &Ty) -> Result<(), TypeError> {
        if !ty.is_fully_known() {
            return Err(TypeError::CouldNotInferType {
                ty: ty.clone(),
                span: expr.span,
            });
        }
        if let ExprKind::Call(call) = &mut expr.kind {
            let args = call
                .args
                .iter()
                .map(|arg| self.synth(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let chosen: Vec<SigId> = self
                .candidates(&call.name, &args)
                .into_iter()
                .filter(|id| unify(&self.tree.signature(*id).ret, ty).is_some())
                .collect();
            let sig = match chosen.as_slice() {
                [one] => self.tree.signature(*one).clone(),
                [] => {
                    return Err(TypeError::UndeclaredFunction {
                        name: call.name.clone(),
                        args,
                        span: expr.span,
                    })
                }
                _ => {
                    return Err(TypeError::CouldNotInferType {
                        ty: ty.clone(),
                        span: expr.span,
                    })
                }
            };
            trace!("{} picks {}", call.name, sig.fn_ty());
            for ((arg, param), found) in call.args.iter_mut().zip(&sig.params).zip(&args) {
                let arg_ty = unify(param, found)
                    .ok_or_else(|| TypeError::mismatch(param, found, ConstraintOrigin::Builtin))?;
                self.commit(arg, &arg_ty)?;
            }
        }
        write_slot(&mut expr.ty, ty.clone(), expr.span)
    }
}
