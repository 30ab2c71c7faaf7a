//! Rendering of errors produced by checking real trees.
//!
//! Spans are set by hand to match the source text shown in each test, the
//! way a parser would set them.

use tarn_common::ast::{Block, CompileUnit, Expr, FnDef, Stmt};
use tarn_common::span::Span;
use tarn_typeck::diagnostics::{render_diagnostic, DiagnosticOptions};
use tarn_typeck::error::TypeError;

// ── Helpers ────────────────────────────────────────────────────────────

fn first_error(mut unit: CompileUnit) -> TypeError {
    tarn_typeck::check(&mut unit).expect_err("expected a type error")
}

fn spanned(mut stmt: Stmt, span: Span) -> Stmt {
    match &mut stmt {
        Stmt::Decl(decl) => decl.span = span,
        Stmt::Assign(assign) => assign.span = span,
        Stmt::Branch(branch) => branch.span = span,
        Stmt::For(for_loop) => for_loop.span = span,
        Stmt::While(while_loop) => while_loop.span = span,
        Stmt::Call(expr) => expr.span = span,
    }
    stmt
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn assignment_mismatch_report() {
    let src = "y: Int := 1\ny = 3.5\n";
    let unit = CompileUnit::new(
        vec![],
        Block::new(vec![
            spanned(Stmt::decl_typed("y", "Int", Expr::int(1)), Span::new(0, 11)),
            spanned(
                Stmt::assign("y", Expr::float(3.5).with_span(Span::new(16, 19))),
                Span::new(12, 19),
            ),
        ]),
    );
    let err = first_error(unit);
    let out = render_diagnostic(&err, src, "main.tarn", &DiagnosticOptions::colorless());
    assert!(out.contains("E0001"), "{}", out);
    assert!(out.contains("`y` has type Int, found Float"), "{}", out);
}

#[test]
fn redefinition_json_points_at_both_declarations() {
    let src = "x := 1\nx := 2\n";
    let unit = CompileUnit::new(
        vec![],
        Block::new(vec![
            spanned(Stmt::decl("x", Expr::int(1)), Span::new(0, 6)),
            spanned(Stmt::decl("x", Expr::int(2)), Span::new(7, 13)),
        ]),
    );
    let err = first_error(unit);
    let out = render_diagnostic(&err, src, "main.tarn", &DiagnosticOptions::json_mode());
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["code"], "E0005");
    assert_eq!(value["message"], "`x` is already defined in this scope");
    assert_eq!(value["line"], 2);
    assert_eq!(value["spans"][1]["label"], "first defined here");
}

#[test]
fn undeclared_function_lists_arguments() {
    let src = "print(1, 2)\n";
    let unit = CompileUnit::new(
        vec![],
        Block::new(vec![spanned(
            Stmt::call("print", vec![Expr::int(1), Expr::int(2)]),
            Span::new(0, 11),
        )]),
    );
    let err = first_error(unit);
    let out = render_diagnostic(&err, src, "main.tarn", &DiagnosticOptions::colorless());
    assert!(out.contains("E0003"), "{}", out);
    assert!(out.contains("no function `print` accepting (Int, Int)"), "{}", out);
}

#[test]
fn missing_return_suggests_a_procedure() {
    let src = "f() -> Int :=\nend\n";
    let mut f = FnDef::new("f", &[], Some("Int"), Block::default());
    f.span = Span::new(0, 17);
    let err = first_error(CompileUnit::new(vec![f], Block::default()));
    let out = render_diagnostic(&err, src, "main.tarn", &DiagnosticOptions::colorless());
    assert!(out.contains("declared to return Int but never returns"), "{}", out);
    assert!(out.contains("make this a procedure"), "{}", out);
}

#[test]
fn ambiguity_asks_for_an_annotation() {
    let src = "f(n: Int) := return f(n) + f(n)\n";
    let sum = Expr::binary(
        "+",
        Expr::call("f", vec![Expr::var("n")]),
        Expr::call("f", vec![Expr::var("n")]),
    )
    .with_span(Span::new(20, 31));
    let f = FnDef::new("f", &[("n", "Int")], None, Block::default().with_return(sum));
    let err = first_error(CompileUnit::new(vec![f], Block::default()));
    let out = render_diagnostic(&err, src, "main.tarn", &DiagnosticOptions::colorless());
    assert!(out.contains("E0004"), "{}", out);
    assert!(out.contains("could be any of {Float | Int}"), "{}", out);
    assert!(out.contains("add a type annotation"), "{}", out);
}

#[test]
fn stored_procedure_result_points_at_the_call() {
    let src = "v := show(1)\n";
    let show = FnDef::new("show", &[("x", "Int")], None, Block::default());
    let unit = CompileUnit::new(
        vec![show],
        Block::new(vec![spanned(
            Stmt::decl("v", Expr::call("show", vec![Expr::int(1)]).with_span(Span::new(5, 12))),
            Span::new(0, 12),
        )]),
    );
    let err = first_error(unit);
    let out = render_diagnostic(&err, src, "main.tarn", &DiagnosticOptions::colorless());
    assert!(out.contains("`v` cannot hold the result of a procedure"), "{}", out);
    assert!(out.contains("this call returns Void"), "{}", out);
}
