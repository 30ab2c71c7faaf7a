//! IR text generation from the typed syntax tree.
//!
//! A single walk over each routine appends instructions to a text buffer.
//! The generator tracks the label of the block being filled, whether that
//! block already ended in a terminator, and the exit labels of the
//! enclosing loops.
//!
//! ## Architecture
//!
//! - [`CodeGen`]: per-translation state and routine emission
//! - [`types`]: Ty to IR type mapping, constants and symbols
//! - [`intrinsics`]: native operator lowering and runtime routines
//! - [`expr`]: expressions, statements and control flow

pub mod expr;
pub mod intrinsics;
pub mod types;

use std::collections::BTreeSet;
use std::fmt::Write as _;

use log::debug;
use rustc_hash::FxHashMap;

use tarn_common::ast::{Block, CompileUnit, DeclId, FnDef, Stmt};
use tarn_common::span::Span;
use tarn_common::ty::Ty;
use tarn_typeck::error::TypeError;
use tarn_typeck::scope::{ScopeTree, VarDecl};

use self::types::{ir_type, symbol, zero_value};

// ── Options ──────────────────────────────────────────────────────────

/// Settings for one translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Name written in the module header.
    pub module_name: String,
    /// Symbol of the routine generated for the script.
    pub entry_symbol: String,
    /// Target triple line; omitted when `None`.
    pub target_triple: Option<String>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            module_name: "tarn_module".to_string(),
            entry_symbol: "main".to_string(),
            target_triple: None,
        }
    }
}

// ── CodeGen ──────────────────────────────────────────────────────────

/// What a routine returns, for `return` and the epilogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoutineKind {
    Function { ret: &'static str },
    Script,
}

/// State of one `translate` call.
pub struct CodeGen<'a> {
    pub(crate) scopes: &'a ScopeTree,
    pub(crate) options: &'a CodegenOptions,

    /// Number of definitions of each user function name.
    pub(crate) user_fns: FxHashMap<String, usize>,
    /// `declare` lines of the runtime routines used so far.
    pub(crate) declares: BTreeSet<String>,

    // ── Routine state ────────────────────────────────────────────────

    /// Instructions of the routine being emitted.
    pub(crate) body: String,
    pub(crate) next_reg: u32,
    pub(crate) next_label: u32,
    /// Label of the block being filled.
    pub(crate) current_block: String,
    /// Whether the current block already ends in `br` or `ret`.
    pub(crate) terminated: bool,
    /// Exit labels of the enclosing loops, innermost last.
    pub(crate) loop_stack: Vec<String>,
    pub(crate) routine: RoutineKind,
}

impl<'a> CodeGen<'a> {
    pub fn new(unit: &CompileUnit, scopes: &'a ScopeTree, options: &'a CodegenOptions) -> Self {
        let mut user_fns: FxHashMap<String, usize> = FxHashMap::default();
        for f in &unit.functions {
            *user_fns.entry(f.name.clone()).or_default() += 1;
        }
        CodeGen {
            scopes,
            options,
            user_fns,
            declares: BTreeSet::new(),
            body: String::new(),
            next_reg: 1,
            next_label: 0,
            current_block: String::new(),
            terminated: false,
            loop_stack: Vec::new(),
            routine: RoutineKind::Script,
        }
    }

    /// Generate the module text for `unit`.
    pub fn translate(mut self, unit: &CompileUnit) -> Result<String, TypeError> {
        let mut out = String::new();
        let _ = writeln!(out, "; ModuleID = '{}'", self.options.module_name);
        if let Some(triple) = &self.options.target_triple {
            let _ = writeln!(out, "target triple = \"{}\"", triple);
        }

        for f in &unit.functions {
            out.push('\n');
            out.push_str(&self.function(f)?);
        }
        out.push('\n');
        out.push_str(&self.script(&unit.script.body)?);

        if !self.declares.is_empty() {
            out.push('\n');
            for decl in &self.declares {
                out.push_str(decl);
                out.push('\n');
            }
        }
        Ok(out)
    }

    // ── Routines ─────────────────────────────────────────────────────

    fn function(&mut self, f: &FnDef) -> Result<String, TypeError> {
        let ret = f
            .ret_ty
            .get()
            .ok_or_else(|| TypeError::missing(format!("return type of `{}`", f.name), f.span))?;
        let ret = ir_type(ret, f.span)?;

        let mut params = Vec::with_capacity(f.params.len());
        let mut param_tys = Vec::with_capacity(f.params.len());
        for p in &f.params {
            let id = p
                .decl
                .ok_or_else(|| TypeError::missing(format!("parameter `{}`", p.name), p.span))?;
            let ty = ir_type(&self.decl(id, p.span)?.ty, p.span)?;
            params.push(format!("{} %{}.{}", ty, p.name, id.0));
            param_tys.push(ty);
        }
        let sym = self.fn_symbol(&f.name, &param_tys);
        debug!("emitting {}", sym);

        self.begin_routine(RoutineKind::Function { ret }, &f.body)?;
        self.block(&f.body)?;
        self.end_routine();

        Ok(format!(
            "define {} {}({}) {{\n{}}}\n",
            ret,
            sym,
            params.join(", "),
            std::mem::take(&mut self.body)
        ))
    }

    fn script(&mut self, body: &Block) -> Result<String, TypeError> {
        let sym = symbol(&self.options.entry_symbol, &[], false);
        debug!("emitting {}", sym);
        self.begin_routine(RoutineKind::Script, body)?;
        self.block(body)?;
        self.end_routine();
        Ok(format!(
            "define i32 {}() {{\n{}}}\n",
            sym,
            std::mem::take(&mut self.body)
        ))
    }

    /// Reset the routine state and open the entry block with one `alloca`
    /// per local declared anywhere in `body`.
    fn begin_routine(&mut self, kind: RoutineKind, body: &Block) -> Result<(), TypeError> {
        self.routine = kind;
        self.body.clear();
        self.loop_stack.clear();
        self.start_block("entry");

        let mut locals = Vec::new();
        collect_locals(body, &mut locals);
        for (name, id, ty, span) in locals {
            let id = id.ok_or_else(|| TypeError::missing(format!("local `{}`", name), span))?;
            let ty = ty.ok_or_else(|| TypeError::missing(format!("type of `{}`", name), span))?;
            let ty = ir_type(ty, span)?;
            self.emit(format!("%{}.{} = alloca {}", name, id.0, ty));
        }
        Ok(())
    }

    /// Close the last block if control can fall off its end.
    fn end_routine(&mut self) {
        if self.terminated {
            return;
        }
        match self.routine {
            RoutineKind::Function { ret: "void" } => self.terminate("ret void".to_string()),
            RoutineKind::Function { ret } => {
                self.terminate(format!("ret {} {}", ret, zero_value(ret)))
            }
            RoutineKind::Script => self.terminate("ret i32 0".to_string()),
        }
    }

    /// Symbol of a user function given its parameter IR types.
    pub(crate) fn fn_symbol(&self, name: &str, param_tys: &[&str]) -> String {
        let overloaded = self.user_fns.get(name).copied().unwrap_or(0) > 1;
        symbol(name, param_tys, overloaded)
    }

    pub(crate) fn decl(&self, id: DeclId, span: Span) -> Result<&'a VarDecl, TypeError> {
        self.scopes
            .try_var(id)
            .ok_or_else(|| TypeError::missing(format!("dangling declaration handle {}", id.0), span))
    }

    // ── Blocks and instructions ──────────────────────────────────────

    pub(crate) fn fresh_reg(&mut self) -> String {
        let reg = format!("%r{}", self.next_reg);
        self.next_reg += 1;
        reg
    }

    pub(crate) fn fresh_label_id(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    /// Open a new block. The previous block must be terminated.
    pub(crate) fn start_block(&mut self, label: &str) {
        let _ = writeln!(self.body, "{}:", label);
        self.current_block = label.to_string();
        self.terminated = false;
    }

    /// Append an instruction, opening an unreachable block first if the
    /// current one is already terminated.
    pub(crate) fn emit(&mut self, inst: String) {
        if self.terminated {
            let id = self.fresh_label_id();
            self.start_block(&format!("dead_{}", id));
        }
        let _ = writeln!(self.body, "  {}", inst);
    }

    /// Append a terminator.
    pub(crate) fn terminate(&mut self, inst: String) {
        self.emit(inst);
        self.terminated = true;
    }
}

/// Every local declaration in `block`, nested blocks included, in textual
/// order.
fn collect_locals<'b>(
    block: &'b Block,
    out: &mut Vec<(&'b str, Option<DeclId>, Option<&'b Ty>, Span)>,
) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Decl(decl) => out.push((&decl.name, decl.decl, decl.value.ty.get(), decl.span)),
            Stmt::Branch(branch) => {
                for b in &branch.blocks {
                    collect_locals(b, out);
                }
            }
            Stmt::For(for_loop) => collect_locals(&for_loop.body, out),
            Stmt::While(while_loop) => collect_locals(&while_loop.body, out),
            Stmt::Assign(_) | Stmt::Call(_) => {}
        }
    }
}
