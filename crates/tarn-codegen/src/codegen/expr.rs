//! Expression, statement and control-flow emission.

use tarn_common::ast::{Block, Branch, Call, Expr, ExprKind, ForLoop, Return, Stmt, WhileLoop};
use tarn_common::span::Span;
use tarn_typeck::error::TypeError;
use tarn_typeck::scope::DeclKind;

use super::intrinsics::{native, runtime_routine};
use super::types::{ir_type, literal_operand};
use super::{CodeGen, RoutineKind};

/// Result of translating an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A literal, parameter or register usable directly as an operand.
    Operand(String),
    /// An instruction producing the value, not yet bound to a register.
    Inst(String),
}

impl<'a> CodeGen<'a> {
    // ── Blocks and statements ────────────────────────────────────────

    pub(crate) fn block(&mut self, block: &Block) -> Result<(), TypeError> {
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        if let Some(ret) = &block.ret {
            self.ret(ret)?;
        }
        if let Some(brk) = &block.brk {
            let exit = self
                .loop_stack
                .last()
                .cloned()
                .ok_or_else(|| TypeError::missing("break outside of a loop", brk.span))?;
            self.terminate(format!("br label %{}", exit));
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), TypeError> {
        match stmt {
            Stmt::Decl(decl) => {
                let id = decl
                    .decl
                    .ok_or_else(|| TypeError::missing(format!("local `{}`", decl.name), decl.span))?;
                self.store(&decl.name, id.0, &decl.value)
            }
            Stmt::Assign(assign) => {
                let id = assign.decl.ok_or_else(|| {
                    TypeError::missing(format!("target `{}`", assign.target), assign.span)
                })?;
                self.store(&assign.target, id.0, &assign.value)
            }
            Stmt::Branch(branch) => self.branch(branch, 0),
            Stmt::For(for_loop) => self.for_loop(for_loop),
            Stmt::While(while_loop) => self.while_loop(while_loop),
            Stmt::Call(expr) => self.effect(expr),
        }
    }

    /// `store` the value of `value` into the slot of a local.
    fn store(&mut self, name: &str, decl: u32, value: &Expr) -> Result<(), TypeError> {
        let ty = self.ir_ty_of(value)?;
        let v = self.operand(value)?;
        self.emit(format!("store {} {}, ptr %{}.{}", ty, v, name, decl));
        Ok(())
    }

    /// Evaluate an expression for its effect only.
    fn effect(&mut self, expr: &Expr) -> Result<(), TypeError> {
        let void = self.ir_ty_of(expr)? == "void";
        match self.expr(expr)? {
            Value::Inst(inst) if void => self.emit(inst),
            Value::Inst(inst) => {
                let reg = self.fresh_reg();
                self.emit(format!("{} = {}", reg, inst));
            }
            Value::Operand(_) => {}
        }
        Ok(())
    }

    fn ret(&mut self, ret: &Return) -> Result<(), TypeError> {
        match self.routine {
            RoutineKind::Script => {
                let v = self.operand(&ret.value)?;
                let status = self.fresh_reg();
                self.emit(format!("{} = trunc i64 {} to i32", status, v));
                self.terminate(format!("ret i32 {}", status));
            }
            RoutineKind::Function { ret: "void" } => {
                self.effect(&ret.value)?;
                self.terminate("ret void".to_string());
            }
            RoutineKind::Function { ret: ty } => {
                let v = self.operand(&ret.value)?;
                self.terminate(format!("ret {} {}", ty, v));
            }
        }
        Ok(())
    }

    // ── Control flow ─────────────────────────────────────────────────

    /// Emit the arm at `index` of a branch; each `elseif` nests as the
    /// `else` of the arm before it.
    fn branch(&mut self, branch: &Branch, index: usize) -> Result<(), TypeError> {
        let id = self.fresh_label_id();
        let (then_l, else_l, cont_l) = (
            format!("then_{}", id),
            format!("else_{}", id),
            format!("cont_{}", id),
        );

        let cond = branch
            .conds
            .get(index)
            .ok_or_else(|| TypeError::missing("branch without a condition", branch.span))?;
        let cond = self.operand(cond)?;
        self.terminate(format!("br i1 {}, label %{}, label %{}", cond, then_l, else_l));

        self.start_block(&then_l);
        let then_block = branch
            .blocks
            .get(index)
            .ok_or_else(|| TypeError::missing("branch arm without a block", branch.span))?;
        self.block(then_block)?;
        let then_falls = !self.terminated;
        if then_falls {
            self.terminate(format!("br label %{}", cont_l));
        }

        self.start_block(&else_l);
        if index + 1 < branch.conds.len() {
            self.branch(branch, index + 1)?;
        } else if let Some(else_block) = branch.else_block() {
            self.block(else_block)?;
        }
        let else_falls = !self.terminated;
        if else_falls {
            self.terminate(format!("br label %{}", cont_l));
        }

        if then_falls || else_falls {
            self.start_block(&cont_l);
        }
        Ok(())
    }

    /// ```text
    ///   br label %head_N
    /// head_N:
    ///   %i.D = phi i64 [from, %pred], [%next, %tail]
    ///   %cmp = icmp sle i64 %i.D, to
    ///   br i1 %cmp, label %body_N, label %cont_N
    /// body_N:
    ///   ...
    ///   %next = add i64 1, %i.D
    ///   br label %head_N
    /// cont_N:
    /// ```
    ///
    /// The body is generated before the header is written, since the phi
    /// needs the label of the block the body ends in.
    fn for_loop(&mut self, for_loop: &ForLoop) -> Result<(), TypeError> {
        let decl = for_loop
            .decl
            .ok_or_else(|| TypeError::missing(format!("loop variable `{}`", for_loop.var), for_loop.span))?;
        let var = format!("%{}.{}", for_loop.var, decl.0);

        let from = self.operand(&for_loop.from)?;
        let to = self.operand(&for_loop.to)?;
        // The phi names its predecessor, so it must be an open block.
        if self.terminated {
            let id = self.fresh_label_id();
            self.start_block(&format!("dead_{}", id));
        }
        let pred = self.current_block.clone();

        let id = self.fresh_label_id();
        let next = self.fresh_reg();
        let cmp = self.fresh_reg();
        let (head_l, body_l, cont_l) = (
            format!("head_{}", id),
            format!("body_{}", id),
            format!("cont_{}", id),
        );
        self.terminate(format!("br label %{}", head_l));

        let outer = std::mem::take(&mut self.body);
        self.start_block(&body_l);
        self.loop_stack.push(cont_l.clone());
        let body = self.block(&for_loop.body);
        self.loop_stack.pop();
        let tail = if body.is_ok() && !self.terminated {
            self.emit(format!("{} = add i64 1, {}", next, var));
            let tail = self.current_block.clone();
            self.terminate(format!("br label %{}", head_l));
            Some(tail)
        } else {
            None
        };
        let body_text = std::mem::replace(&mut self.body, outer);
        body?;

        self.start_block(&head_l);
        match tail {
            Some(tail) => self.emit(format!(
                "{} = phi i64 [{}, %{}], [{}, %{}]",
                var, from, pred, next, tail
            )),
            None => self.emit(format!("{} = phi i64 [{}, %{}]", var, from, pred)),
        }
        self.emit(format!("{} = icmp sle i64 {}, {}", cmp, var, to));
        self.terminate(format!("br i1 {}, label %{}, label %{}", cmp, body_l, cont_l));
        self.body.push_str(&body_text);
        self.start_block(&cont_l);
        Ok(())
    }

    fn while_loop(&mut self, while_loop: &WhileLoop) -> Result<(), TypeError> {
        let id = self.fresh_label_id();
        let (head_l, body_l, cont_l) = (
            format!("head_{}", id),
            format!("body_{}", id),
            format!("cont_{}", id),
        );
        self.terminate(format!("br label %{}", head_l));

        self.start_block(&head_l);
        let cond = self.operand(&while_loop.cond)?;
        self.terminate(format!("br i1 {}, label %{}, label %{}", cond, body_l, cont_l));

        self.start_block(&body_l);
        self.loop_stack.push(cont_l.clone());
        let body = self.block(&while_loop.body);
        self.loop_stack.pop();
        body?;
        if !self.terminated {
            self.terminate(format!("br label %{}", head_l));
        }

        self.start_block(&cont_l);
        Ok(())
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// IR type written on an expression by inference.
    pub(crate) fn ir_ty_of(&self, expr: &Expr) -> Result<&'static str, TypeError> {
        let ty = expr
            .ty
            .get()
            .ok_or_else(|| TypeError::missing("untyped expression", expr.span))?;
        ir_type(ty, expr.span)
    }

    /// Translate an expression and bind instruction results to a register.
    pub(crate) fn operand(&mut self, expr: &Expr) -> Result<String, TypeError> {
        match self.expr(expr)? {
            Value::Operand(op) => Ok(op),
            Value::Inst(inst) => {
                let reg = self.fresh_reg();
                self.emit(format!("{} = {}", reg, inst));
                Ok(reg)
            }
        }
    }

    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<Value, TypeError> {
        let ty = self.ir_ty_of(expr)?;
        match &expr.kind {
            ExprKind::Lit(lit) => Ok(Value::Operand(literal_operand(lit))),
            ExprKind::Var(var) => {
                let id = var
                    .decl
                    .ok_or_else(|| TypeError::missing(format!("variable `{}`", var.name), expr.span))?;
                let decl = self.decl(id, expr.span)?;
                // Named values carry their declaration id; registers and
                // labels never contain a dot.
                let name = format!("%{}.{}", var.name, id.0);
                Ok(match decl.kind {
                    DeclKind::Param | DeclKind::Induction => Value::Operand(name),
                    DeclKind::Local => Value::Inst(format!("load {}, ptr {}", ty, name)),
                })
            }
            ExprKind::Call(call) => self.call(call, ty, expr.span),
        }
    }

    /// User functions hide built-ins of the same name; otherwise a native
    /// instruction is preferred over a runtime routine.
    fn call(&mut self, call: &Call, ret: &'static str, span: Span) -> Result<Value, TypeError> {
        let mut arg_tys = Vec::with_capacity(call.args.len());
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            arg_tys.push(self.ir_ty_of(arg)?);
            args.push(self.operand(arg)?);
        }
        let typed_args = || {
            arg_tys
                .iter()
                .zip(&args)
                .map(|(ty, v)| format!("{} {}", ty, v))
                .collect::<Vec<_>>()
                .join(", ")
        };

        if self.user_fns.contains_key(&call.name) {
            let sym = self.fn_symbol(&call.name, &arg_tys);
            return Ok(Value::Inst(format!("call {} {}({})", ret, sym, typed_args())));
        }
        if let Some(op) = native(&call.name, &arg_tys) {
            return Ok(Value::Inst(op.render(&args)));
        }
        if let Some(routine) = runtime_routine(&call.name, &arg_tys) {
            self.declares.insert(routine.declaration());
            return Ok(Value::Inst(format!(
                "call {} @{}({})",
                routine.ret,
                routine.symbol,
                typed_args()
            )));
        }
        Err(TypeError::missing(
            format!("no lowering for `{}`({})", call.name, arg_tys.join(", ")),
            span,
        ))
    }
}
