//! End-to-end tests: build a tree, check it, and inspect the emitted IR.

use tarn_codegen::{compile, translate, CodegenOptions};
use tarn_common::ast::{Block, CompileUnit, Expr, FnDef, Stmt};
use tarn_common::ty::Ty;
use tarn_typeck::error::TypeError;

// ── Helpers ────────────────────────────────────────────────────────────

fn ir(mut unit: CompileUnit) -> String {
    match compile(&mut unit, &CodegenOptions::default()) {
        Ok(text) => text,
        Err(err) => panic!("expected the unit to compile, got: {:?}", err),
    }
}

fn print(value: Expr) -> Stmt {
    Stmt::call("print", vec![value])
}

fn assert_contains(ir: &str, needle: &str) {
    assert!(ir.contains(needle), "expected `{}` in:\n{}", needle, ir);
}

// ── Routines ───────────────────────────────────────────────────────────

#[test]
fn square_is_called_with_a_typed_argument() {
    let square = FnDef::new(
        "square",
        &[("x", "Int")],
        Some("Int"),
        Block::default().with_return(Expr::binary("*", Expr::var("x"), Expr::var("x"))),
    );
    let script = Block::new(vec![
        Stmt::decl("y", Expr::call("square", vec![Expr::int(7)])),
        print(Expr::var("y")),
    ]);
    insta::assert_snapshot!(ir(CompileUnit::new(vec![square], script)), @r"
    ; ModuleID = 'tarn_module'

    define i64 @square(i64 %x.0) {
    entry:
      %r1 = mul i64 %x.0, %x.0
      ret i64 %r1
    }

    define i32 @main() {
    entry:
      %y.1 = alloca i64
      %r2 = call i64 @square(i64 7)
      store i64 %r2, ptr %y.1
      %r3 = load i64, ptr %y.1
      call void @tarn_print_int(i64 %r3)
      ret i32 0
    }

    declare void @tarn_print_int(i64)
    ");
}

#[test]
fn procedures_return_void() {
    let show = FnDef::new("show", &[("x", "Int")], None, Block::new(vec![print(Expr::var("x"))]));
    let out = ir(CompileUnit::new(
        vec![show],
        Block::new(vec![Stmt::call("show", vec![Expr::int(4)])]),
    ));
    assert_contains(&out, "define void @show(i64 %x.0) {");
    assert_contains(&out, "  call void @tarn_print_int(i64 %x.0)\n  ret void\n");
    assert_contains(&out, "  call void @show(i64 4)\n");
}

#[test]
fn script_return_is_truncated_to_a_status() {
    let out = ir(CompileUnit::new(vec![], Block::default().with_return(Expr::int(3))));
    assert_contains(&out, "  %r1 = trunc i64 3 to i32\n  ret i32 %r1\n");
    assert!(!out.contains("ret i32 0"), "{}", out);
}

#[test]
fn options_shape_the_module_header() {
    let options = CodegenOptions {
        module_name: "demo".to_string(),
        entry_symbol: "tarn_entry".to_string(),
        target_triple: Some("x86_64-unknown-linux-gnu".to_string()),
    };
    let mut unit = CompileUnit::new(vec![], Block::default());
    let out = compile(&mut unit, &options).unwrap();
    assert!(
        out.starts_with("; ModuleID = 'demo'\ntarget triple = \"x86_64-unknown-linux-gnu\"\n"),
        "{}",
        out
    );
    assert_contains(&out, "define i32 @tarn_entry() {\nentry:\n  ret i32 0\n}\n");
}

#[test]
fn parameter_names_never_shadow_registers() {
    // f(r1: Int) -> Int := return r1 * 2 + 1
    let f = FnDef::new(
        "f",
        &[("r1", "Int")],
        Some("Int"),
        Block::default().with_return(Expr::binary(
            "+",
            Expr::binary("*", Expr::var("r1"), Expr::int(2)),
            Expr::int(1),
        )),
    );
    let out = ir(CompileUnit::new(vec![f], Block::default()));
    assert_contains(
        &out,
        "define i64 @f(i64 %r1.0) {\nentry:\n  %r1 = mul i64 %r1.0, 2\n  %r2 = add i64 %r1, 1\n  ret i64 %r2\n}\n",
    );
}

// ── Overloads and built-ins ────────────────────────────────────────────

#[test]
fn overloaded_functions_get_mangled_symbols() {
    let incs = vec![
        FnDef::new(
            "inc",
            &[("x", "Int")],
            None,
            Block::default().with_return(Expr::binary("+", Expr::var("x"), Expr::int(1))),
        ),
        FnDef::new(
            "inc",
            &[("x", "Float")],
            None,
            Block::default().with_return(Expr::binary("+", Expr::var("x"), Expr::float(1.0))),
        ),
    ];
    let script = Block::new(vec![
        Stmt::decl("a", Expr::call("inc", vec![Expr::int(5)])),
        Stmt::decl("b", Expr::call("inc", vec![Expr::float(2.5)])),
    ]);
    let out = ir(CompileUnit::new(incs, script));
    assert_contains(&out, "define i64 @inc.i64(i64 %x.0) {");
    assert_contains(&out, "define double @inc.double(double %x.1) {");
    assert_contains(&out, "fadd double %x.1, 0x3FF0000000000000");
    assert_contains(&out, "call i64 @inc.i64(i64 5)");
    assert_contains(&out, "call double @inc.double(double 0x4004000000000000)");
}

#[test]
fn runtime_routines_are_declared_once_in_order() {
    let script = Block::new(vec![
        Stmt::decl("p", Expr::binary("^", Expr::float(2.0), Expr::float(0.5))),
        Stmt::decl("q", Expr::binary("^", Expr::int(2), Expr::int(10))),
        Stmt::decl("r", Expr::binary("^", Expr::int(3), Expr::int(2))),
    ]);
    let out = ir(CompileUnit::new(vec![], script));
    assert_contains(
        &out,
        "call double @llvm.pow.f64(double 0x4000000000000000, double 0x3FE0000000000000)",
    );
    assert_contains(&out, "call i64 @tarn_ipow(i64 3, i64 2)");
    assert!(
        out.ends_with(
            "\ndeclare double @llvm.pow.f64(double, double)\ndeclare i64 @tarn_ipow(i64, i64)\n"
        ),
        "{}",
        out
    );
}

#[test]
fn unary_and_logical_operators_lower_natively() {
    let script = Block::new(vec![
        Stmt::decl("n", Expr::unary("-", Expr::int(4))),
        Stmt::decl(
            "b",
            Expr::binary("and", Expr::unary("not", Expr::bool(false)), Expr::bool(true)),
        ),
    ]);
    let out = ir(CompileUnit::new(vec![], script));
    assert_contains(&out, "%r1 = sub i64 0, 4\n  store i64 %r1, ptr %n.0");
    assert_contains(&out, "%r2 = xor i1 false, true\n  %r3 = and i1 %r2, true");
    assert_contains(&out, "%b.1 = alloca i1");
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn counting_loop_merges_the_induction_variable() {
    let script = Block::new(vec![
        Stmt::decl("total", Expr::int(0)),
        Stmt::for_loop(
            "i",
            Expr::int(1),
            Expr::int(3),
            Block::new(vec![Stmt::assign(
                "total",
                Expr::binary("+", Expr::var("total"), Expr::var("i")),
            )]),
        ),
        print(Expr::var("total")),
    ]);
    insta::assert_snapshot!(ir(CompileUnit::new(vec![], script)), @r"
    ; ModuleID = 'tarn_module'

    define i32 @main() {
    entry:
      %total.0 = alloca i64
      store i64 0, ptr %total.0
      br label %head_0
    head_0:
      %i.1 = phi i64 [1, %entry], [%r1, %body_0]
      %r2 = icmp sle i64 %i.1, 3
      br i1 %r2, label %body_0, label %cont_0
    body_0:
      %r3 = load i64, ptr %total.0
      %r4 = add i64 %r3, %i.1
      store i64 %r4, ptr %total.0
      %r1 = add i64 1, %i.1
      br label %head_0
    cont_0:
      %r5 = load i64, ptr %total.0
      call void @tarn_print_int(i64 %r5)
      ret i32 0
    }

    declare void @tarn_print_int(i64)
    ");
}

#[test]
fn elseif_chains_nest_without_dead_continuations() {
    let classify = FnDef::new(
        "classify",
        &[("n", "Int")],
        Some("Int"),
        Block::new(vec![Stmt::branch(
            vec![
                Expr::binary("<", Expr::var("n"), Expr::int(0)),
                Expr::binary("==", Expr::var("n"), Expr::int(0)),
            ],
            vec![
                Block::default().with_return(Expr::int(-1)),
                Block::default().with_return(Expr::int(0)),
                Block::default().with_return(Expr::int(1)),
            ],
        )]),
    );
    insta::assert_snapshot!(ir(CompileUnit::new(vec![classify], Block::default())), @r"
    ; ModuleID = 'tarn_module'

    define i64 @classify(i64 %n.0) {
    entry:
      %r1 = icmp slt i64 %n.0, 0
      br i1 %r1, label %then_0, label %else_0
    then_0:
      ret i64 -1
    else_0:
      %r2 = icmp eq i64 %n.0, 0
      br i1 %r2, label %then_1, label %else_1
    then_1:
      ret i64 0
    else_1:
      ret i64 1
    }

    define i32 @main() {
    entry:
      ret i32 0
    }
    ");
}

#[test]
fn branch_without_else_falls_through_to_continuation() {
    let script = Block::new(vec![
        Stmt::decl("x", Expr::int(1)),
        Stmt::branch(
            vec![Expr::binary(">", Expr::var("x"), Expr::int(0))],
            vec![Block::new(vec![Stmt::assign("x", Expr::int(2))])],
        ),
        print(Expr::var("x")),
    ]);
    let out = ir(CompileUnit::new(vec![], script));
    assert_contains(
        &out,
        "then_0:\n  store i64 2, ptr %x.0\n  br label %cont_0\nelse_0:\n  br label %cont_0\ncont_0:\n",
    );
}

#[test]
fn while_loop_with_break() {
    let script = Block::new(vec![
        Stmt::decl("n", Expr::int(0)),
        Stmt::while_loop(
            Expr::bool(true),
            Block::new(vec![
                Stmt::assign("n", Expr::binary("+", Expr::var("n"), Expr::int(1))),
                Stmt::branch(
                    vec![Expr::binary("==", Expr::var("n"), Expr::int(3))],
                    vec![Block::default().with_break()],
                ),
            ]),
        ),
    ]);
    insta::assert_snapshot!(ir(CompileUnit::new(vec![], script)), @r"
    ; ModuleID = 'tarn_module'

    define i32 @main() {
    entry:
      %n.0 = alloca i64
      store i64 0, ptr %n.0
      br label %head_0
    head_0:
      br i1 true, label %body_0, label %cont_0
    body_0:
      %r1 = load i64, ptr %n.0
      %r2 = add i64 %r1, 1
      store i64 %r2, ptr %n.0
      %r3 = load i64, ptr %n.0
      %r4 = icmp eq i64 %r3, 3
      br i1 %r4, label %then_1, label %else_1
    then_1:
      br label %cont_0
    else_1:
      br label %cont_1
    cont_1:
      br label %head_0
    cont_0:
      ret i32 0
    }
    ");
}

#[test]
fn code_after_a_terminated_branch_opens_a_dead_block() {
    let script = Block::new(vec![
        Stmt::branch(
            vec![Expr::bool(true)],
            vec![
                Block::default().with_return(Expr::int(1)),
                Block::default().with_return(Expr::int(2)),
            ],
        ),
        Stmt::for_loop("i", Expr::int(1), Expr::int(2), Block::default()),
    ]);
    let out = ir(CompileUnit::new(vec![], script));
    assert!(!out.contains("cont_0"), "{}", out);
    assert_contains(&out, "dead_1:\n  br label %head_2\n");
    assert_contains(&out, "%i.0 = phi i64 [1, %dead_1], [%r3, %body_2]");
    assert_contains(&out, "cont_2:\n  ret i32 0\n");
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn type_errors_stop_compilation() {
    let mut unit = CompileUnit::new(
        vec![],
        Block::new(vec![
            Stmt::decl_typed("y", "Int", Expr::int(1)),
            Stmt::assign("y", Expr::float(3.5)),
        ]),
    );
    match compile(&mut unit, &CodegenOptions::default()) {
        Err(TypeError::TypeMismatch { expected, found, .. }) => {
            assert_eq!(expected, Ty::int());
            assert_eq!(found, Ty::float());
        }
        other => panic!("expected a type mismatch, got {:?}", other),
    }
}

#[test]
fn untyped_tree_is_an_internal_error() {
    let unit = CompileUnit::new(vec![], Block::new(vec![print(Expr::int(1))]));
    let mut checked = unit.clone();
    let typeck = tarn_typeck::check(&mut checked).unwrap();

    let err = translate(&unit, &typeck, &CodegenOptions::default()).unwrap_err();
    assert!(err.is_internal(), "{:?}", err);
    assert!(translate(&checked, &typeck, &CodegenOptions::default()).is_ok());
}

#[test]
fn storing_a_procedure_result_is_a_type_error() {
    let show = FnDef::new("show", &[("x", "Int")], None, Block::new(vec![print(Expr::var("x"))]));
    let mut unit = CompileUnit::new(
        vec![show],
        Block::new(vec![Stmt::decl("v", Expr::call("show", vec![Expr::int(1)]))]),
    );
    match compile(&mut unit, &CodegenOptions::default()) {
        Err(err @ TypeError::TypeMismatch { .. }) => assert!(!err.is_internal()),
        other => panic!("expected a type mismatch, got {:?}", other),
    }
}

#[test]
fn branch_without_conditions_is_rejected() {
    let mut unit = CompileUnit::new(
        vec![],
        Block::new(vec![Stmt::branch(vec![], vec![Block::default()])]),
    );
    let err = compile(&mut unit, &CodegenOptions::default()).unwrap_err();
    assert!(err.is_internal(), "{:?}", err);
}
