//! The syntax tree handed over by the parser.
//!
//! Node kinds are closed sum types per category (statements, expressions,
//! literals) so every pass matches them exhaustively. Three kinds of
//! annotation are filled in after parsing:
//!
//! - `scope` on binding blocks, set by scope initialization
//! - `decl` handles on parameters, declarations, assignments, loop
//!   variables and variable references, set by scope initialization
//! - `ty` slots on expressions and `ret_ty` on function definitions, written
//!   once by type inference and read by code generation
//!
//! All annotation fields default to empty, so a parser producing JSON can
//! leave them out.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::ty::Ty;

// ── Handles ────────────────────────────────────────────────────────────

/// Index of a variable declaration in the scope tree's declaration arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// Index of a scope in the scope tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

// ── Type slot ──────────────────────────────────────────────────────────

/// A type annotation that starts unset and is written exactly once.
///
/// Writing the value it already holds is accepted, which keeps re-running
/// inference on a typed tree a no-op.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSlot(Option<Ty>);

/// A second, different write to a [`TypeSlot`].
#[derive(Clone, Debug, PartialEq)]
pub struct SlotConflict {
    pub existing: Ty,
    pub attempted: Ty,
}

impl TypeSlot {
    pub fn get(&self) -> Option<&Ty> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn set(&mut self, ty: Ty) -> Result<(), SlotConflict> {
        match &self.0 {
            None => {
                self.0 = Some(ty);
                Ok(())
            }
            Some(existing) if *existing == ty => Ok(()),
            Some(existing) => Err(SlotConflict {
                existing: existing.clone(),
                attempted: ty,
            }),
        }
    }
}

// ── Items ──────────────────────────────────────────────────────────────

/// A compilation unit: function definitions plus exactly one script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompileUnit {
    pub functions: Vec<FnDef>,
    pub script: Script,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

/// The top-level script, compiled to the program entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FnDef {
    pub name: String,
    pub params: Vec<Param>,
    /// Declared return type, if annotated.
    pub ret: Option<TypeExpr>,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
    /// Resolved return type, written by inference.
    #[serde(default)]
    pub ret_ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub decl: Option<DeclId>,
}

/// A type annotation as written in source (`Int`, `Float`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

// ── Statements ─────────────────────────────────────────────────────────

/// An ordered statement list with an optional terminal `return` or `break`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub ret: Option<Return>,
    #[serde(default)]
    pub brk: Option<Break>,
    #[serde(default)]
    pub span: Span,
    /// Set on blocks that introduce bindings (function, script and loop bodies).
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub value: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Break {
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Decl(Decl),
    Assign(Assign),
    Branch(Branch),
    For(ForLoop),
    While(WhileLoop),
    /// A call evaluated for its effect.
    Call(Expr),
}

/// `name := value` or `name: Ty := value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub decl: Option<DeclId>,
}

/// `target = value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub target: String,
    pub value: Expr,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub decl: Option<DeclId>,
}

/// `if c0 then b0 elseif c1 then b1 ... else bn end`.
///
/// `blocks` holds one block per condition, plus one more when there is an
/// `else`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub conds: Vec<Expr>,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub span: Span,
}

impl Branch {
    pub fn else_block(&self) -> Option<&Block> {
        if self.blocks.len() > self.conds.len() {
            self.blocks.last()
        } else {
            None
        }
    }
}

/// `for var from .. to .. do body end`, inclusive upper bound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForLoop {
    pub var: String,
    pub from: Expr,
    pub to: Expr,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub decl: Option<DeclId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhileLoop {
    pub cond: Expr,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

// ── Expressions ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub ty: TypeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Lit(Literal),
    Var(VarRef),
    /// Function, procedure and operator calls alike; operators are calls to
    /// their symbol (`+`, `<=`, `not`, ...).
    Call(Call),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    /// The intrinsic type of the constant.
    pub fn ty(&self) -> Ty {
        match self {
            Literal::Bool(_) => Ty::bool(),
            Literal::Int(_) => Ty::int(),
            Literal::Float(_) => Ty::float(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarRef {
    pub name: String,
    #[serde(default)]
    pub decl: Option<DeclId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
}

// ── Syntactic queries ──────────────────────────────────────────────────

impl Block {
    /// Whether a `return` appears anywhere in this block, including nested
    /// branches and loops.
    pub fn contains_return(&self) -> bool {
        self.ret.is_some()
            || self.stmts.iter().any(|stmt| match stmt {
                Stmt::Branch(branch) => branch.blocks.iter().any(Block::contains_return),
                Stmt::For(for_loop) => for_loop.body.contains_return(),
                Stmt::While(while_loop) => while_loop.body.contains_return(),
                Stmt::Decl(_) | Stmt::Assign(_) | Stmt::Call(_) => false,
            })
    }
}

// ── Builders ───────────────────────────────────────────────────────────
//
// Programmatic construction with empty spans. Parsers set spans through
// `with_span`.

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::default(),
            ty: TypeSlot::default(),
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::Lit(Literal::Int(value)))
    }

    pub fn float(value: f64) -> Self {
        Expr::new(ExprKind::Lit(Literal::Float(value)))
    }

    pub fn bool(value: bool) -> Self {
        Expr::new(ExprKind::Lit(Literal::Bool(value)))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::new(ExprKind::Var(VarRef {
            name: name.into(),
            decl: None,
        }))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Call(Call {
            name: name.into(),
            args,
        }))
    }

    /// A binary operator application, `lhs op rhs`.
    pub fn binary(op: &str, lhs: Expr, rhs: Expr) -> Self {
        Expr::call(op, vec![lhs, rhs])
    }

    /// A unary operator application, `op operand`.
    pub fn unary(op: &str, operand: Expr) -> Self {
        Expr::call(op, vec![operand])
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Stmt {
    pub fn decl(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Decl(Decl {
            name: name.into(),
            ty: None,
            value,
            span: Span::default(),
            decl: None,
        })
    }

    pub fn decl_typed(name: impl Into<String>, ty: &str, value: Expr) -> Self {
        Stmt::Decl(Decl {
            name: name.into(),
            ty: Some(TypeExpr::named(ty)),
            value,
            span: Span::default(),
            decl: None,
        })
    }

    pub fn assign(target: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign(Assign {
            target: target.into(),
            value,
            span: Span::default(),
            decl: None,
        })
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Stmt::Call(Expr::call(name, args))
    }

    pub fn branch(conds: Vec<Expr>, blocks: Vec<Block>) -> Self {
        Stmt::Branch(Branch {
            conds,
            blocks,
            span: Span::default(),
        })
    }

    pub fn for_loop(var: impl Into<String>, from: Expr, to: Expr, body: Block) -> Self {
        Stmt::For(ForLoop {
            var: var.into(),
            from,
            to,
            body,
            span: Span::default(),
            decl: None,
        })
    }

    pub fn while_loop(cond: Expr, body: Block) -> Self {
        Stmt::While(WhileLoop {
            cond,
            body,
            span: Span::default(),
        })
    }
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr {
            name: name.into(),
            span: Span::default(),
        }
    }
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block {
            stmts,
            ..Block::default()
        }
    }

    pub fn with_return(mut self, value: Expr) -> Self {
        self.ret = Some(Return {
            value,
            span: Span::default(),
        });
        self
    }

    pub fn with_break(mut self) -> Self {
        self.brk = Some(Break {
            span: Span::default(),
        });
        self
    }
}

impl FnDef {
    /// A function with `(name, type)` parameters and an optional declared
    /// return type.
    pub fn new(name: impl Into<String>, params: &[(&str, &str)], ret: Option<&str>, body: Block) -> Self {
        FnDef {
            name: name.into(),
            params: params
                .iter()
                .map(|(name, ty)| Param {
                    name: (*name).to_string(),
                    ty: TypeExpr::named(*ty),
                    span: Span::default(),
                    decl: None,
                })
                .collect(),
            ret: ret.map(TypeExpr::named),
            body,
            span: Span::default(),
            ret_ty: TypeSlot::default(),
        }
    }
}

impl CompileUnit {
    pub fn new(functions: Vec<FnDef>, script_body: Block) -> Self {
        CompileUnit {
            functions,
            script: Script {
                name: "main".to_string(),
                body: script_body,
                span: Span::default(),
            },
            span: Span::default(),
            scope: None,
        }
    }
}
