// Whole-pipeline checker scenarios: monomorphization, exhaustiveness,
// coercions, cycles, entry points, immutability.

mod common;

use common::{has_code, has_message, sp, TestUnit};
use nemesis_ast::{
    AssignOp, Decl, Expr, GenericArg, Pattern, SourceUnit, Stmt, TypeExpr, WhenArm, WorkspaceKind,
};
use nemesis_sema::Checker;

#[test]
fn test_generic_instantiation_is_deduplicated() {
    // function(T) id(x: T) T { return x }
    // main calls id!(i32)(5) and id!(i32)(7)
    let mut unit = TestUnit::new();

    let tparam = unit.ast.push_decl(Decl::GenericTypeParam {
        name: "T".to_string(),
        span: sp(),
    });
    let clause = unit.ast.push_decl(Decl::GenericClause {
        params: vec![tparam],
        constraint: None,
        span: sp(),
    });
    let t_annotation = unit.ast.type_path("T", sp());
    let x = unit.param("x", t_annotation);
    let t_result = unit.ast.type_path("T", sp());

    let x_ref = unit.ast.ident("x", sp());
    let ret = unit.ast.push_stmt(Stmt::Return {
        value: Some(x_ref),
        span: sp(),
    });
    let body = unit.block(vec![ret]);
    unit.function("id", Some(clause), vec![x], Some(t_result), body);

    let mut calls = Vec::new();
    for literal in ["5", "7"] {
        let i32_arg = unit.ast.type_path("i32", sp());
        let callee = unit
            .ast
            .ident_with_generics("id", vec![GenericArg::Type(i32_arg)], sp());
        let argument = unit.ast.lit_int(literal, sp());
        let call = unit.ast.push_expr(Expr::Call {
            callee,
            args: vec![argument],
            span: sp(),
        });
        calls.push(call);
    }
    let first_call = calls[0];
    let second_call = calls[1];
    let stmts = vec![unit.expr_stmt(first_call), unit.expr_stmt(second_call)];
    let main_body = unit.block(stmts);
    unit.function("main", None, vec![], None, main_body);

    let checker = unit.analyze_app();
    assert!(
        !checker.diagnostics().has_errors(),
        "unexpected diagnostics: {:?}",
        checker
            .diagnostics()
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect::<Vec<_>>()
    );

    // both calls resolve to the same instantiation record
    assert_eq!(checker.instantiations().len(), 1);
    let record = &checker.instantiations()[0];
    assert!(record.arguments.contains_key("T"));

    // the calls are annotated with the concrete result type
    let i32_ty = checker.types().sint(32);
    assert_eq!(checker.expr_note(first_call).ty, Some(i32_ty));
    assert_eq!(checker.expr_note(second_call).ty, Some(i32_ty));

    // both identifiers reference the same clone
    assert!(checker.entry_point().is_some());
}

#[test]
fn test_when_over_variant_must_be_exhaustive() {
    // type A/B/C; type Kind is A | B | C
    // function f(v: Kind) { when v { A => … B => … } }  → missing C
    let mut unit = TestUnit::new();
    unit.record("A", vec![]);
    unit.record("B", vec![]);
    unit.record("C", vec![]);

    let a_path = unit.ast.type_path("A", sp());
    let b_path = unit.ast.type_path("B", sp());
    let c_path = unit.ast.type_path("C", sp());
    let variant = unit.ast.push_decl(Decl::Variant {
        name: "Kind".to_string(),
        generics: None,
        members: vec![a_path, b_path, c_path],
        span: sp(),
    });
    unit.decls.push(variant);

    let kind_annotation = unit.ast.type_path("Kind", sp());
    let v = unit.param("v", kind_annotation);

    let pattern_a = unit.ast.push_pat(Pattern::Path {
        segments: vec![nemesis_ast::PathSegment::plain("A")],
        span: sp(),
    });
    let pattern_b = unit.ast.push_pat(Pattern::Path {
        segments: vec![nemesis_ast::PathSegment::plain("B")],
        span: sp(),
    });
    let arm_a_body = unit.block(vec![]);
    let arm_b_body = unit.block(vec![]);

    let scrutinee = unit.ast.ident("v", sp());
    let when = unit.ast.push_expr(Expr::When {
        scrutinee,
        arms: vec![
            WhenArm {
                pattern: pattern_a,
                guard: None,
                body: arm_a_body,
            },
            WhenArm {
                pattern: pattern_b,
                guard: None,
                body: arm_b_body,
            },
        ],
        else_arm: None,
        span: sp(),
    });
    let stmt = unit.expr_stmt(when);
    let body = unit.block(vec![stmt]);
    unit.function("f", None, vec![v], None, body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0004"));
    assert!(has_message(&checker, "missing"));
    assert!(has_message(&checker, "C"));
}

#[test]
fn test_when_with_else_is_exhaustive() {
    let mut unit = TestUnit::new();
    unit.record("A", vec![]);
    unit.record("B", vec![]);

    let a_path = unit.ast.type_path("A", sp());
    let b_path = unit.ast.type_path("B", sp());
    let variant = unit.ast.push_decl(Decl::Variant {
        name: "Kind".to_string(),
        generics: None,
        members: vec![a_path, b_path],
        span: sp(),
    });
    unit.decls.push(variant);

    let kind_annotation = unit.ast.type_path("Kind", sp());
    let v = unit.param("v", kind_annotation);

    let pattern_a = unit.ast.push_pat(Pattern::Path {
        segments: vec![nemesis_ast::PathSegment::plain("A")],
        span: sp(),
    });
    let arm_body = unit.block(vec![]);
    let else_body = unit.block(vec![]);

    let scrutinee = unit.ast.ident("v", sp());
    let when = unit.ast.push_expr(Expr::When {
        scrutinee,
        arms: vec![WhenArm {
            pattern: pattern_a,
            guard: None,
            body: arm_body,
        }],
        else_arm: Some(else_body),
        span: sp(),
    });
    let stmt = unit.expr_stmt(when);
    let body = unit.block(vec![stmt]);
    unit.function("f", None, vec![v], None, body);

    let checker = unit.analyze_lib();
    assert!(!has_code(&checker, "E0004"));
}

#[test]
fn test_when_else_participates_in_result_type() {
    // type A/B; type Kind is A | B
    // function f(v: Kind) { val x: i32 = when v { A => 1 } else { "bad"s } }
    // the branches disagree, so the when collapses to unit and the
    // initialization is a mismatch
    let mut unit = TestUnit::new();
    unit.record("A", vec![]);
    unit.record("B", vec![]);

    let a_path = unit.ast.type_path("A", sp());
    let b_path = unit.ast.type_path("B", sp());
    let variant = unit.ast.push_decl(Decl::Variant {
        name: "Kind".to_string(),
        generics: None,
        members: vec![a_path, b_path],
        span: sp(),
    });
    unit.decls.push(variant);

    let kind_annotation = unit.ast.type_path("Kind", sp());
    let v = unit.param("v", kind_annotation);

    let pattern_a = unit.ast.push_pat(Pattern::Path {
        segments: vec![nemesis_ast::PathSegment::plain("A")],
        span: sp(),
    });
    let arm_body = unit.ast.lit_int("1", sp());
    let else_body = unit.ast.lit_string("bad", sp());

    let scrutinee = unit.ast.ident("v", sp());
    let when = unit.ast.push_expr(Expr::When {
        scrutinee,
        arms: vec![WhenArm {
            pattern: pattern_a,
            guard: None,
            body: arm_body,
        }],
        else_arm: Some(else_body),
        span: sp(),
    });

    let i32_annotation = unit.ast.type_path("i32", sp());
    let x = unit.ast.push_decl(Decl::Var {
        name: "x".to_string(),
        mutable: false,
        ty: Some(i32_annotation),
        value: Some(when),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl { decl: x, span: sp() });
    let body = unit.block(vec![decl_stmt]);
    unit.function("f", None, vec![v], None, body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0308"));
}

#[test]
fn test_when_with_only_else_takes_its_type() {
    // function f(v: i32) { val y: i32 = when v { } else { 7 } }
    let mut unit = TestUnit::new();
    let i32_annotation = unit.ast.type_path("i32", sp());
    let v = unit.param("v", i32_annotation);

    let else_body = unit.ast.lit_int("7", sp());
    let scrutinee = unit.ast.ident("v", sp());
    let when = unit.ast.push_expr(Expr::When {
        scrutinee,
        arms: vec![],
        else_arm: Some(else_body),
        span: sp(),
    });

    let i32_annotation = unit.ast.type_path("i32", sp());
    let y = unit.ast.push_decl(Decl::Var {
        name: "y".to_string(),
        mutable: false,
        ty: Some(i32_annotation),
        value: Some(when),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl { decl: y, span: sp() });
    let body = unit.block(vec![decl_stmt]);
    unit.function("f", None, vec![v], None, body);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    assert_eq!(checker.expr_note(when).ty, Some(checker.types().sint(32)));
}

#[test]
fn test_array_to_slice_and_pointer_coercions() {
    // val s: [i32] = [1, 2, 3]      — accepted silently
    // val p: *i32 = [1, 2, 3]       — accepted, classified unsafe
    // val e: [i32] = []             — accepted (empty-unknown-array rule)
    let mut unit = TestUnit::new();

    let elems: Vec<_> = ["1", "2", "3"]
        .iter()
        .map(|text| unit.ast.lit_int(*text, sp()))
        .collect();
    let array = unit.ast.push_expr(Expr::Array {
        elements: elems,
        span: sp(),
    });
    let i32_elem = unit.ast.type_path("i32", sp());
    let slice_ty = unit.ast.push_type_expr(TypeExpr::Slice {
        elem: i32_elem,
        span: sp(),
    });
    unit.var("s", false, Some(slice_ty), Some(array));

    let elems: Vec<_> = ["1", "2", "3"]
        .iter()
        .map(|text| unit.ast.lit_int(*text, sp()))
        .collect();
    let array = unit.ast.push_expr(Expr::Array {
        elements: elems,
        span: sp(),
    });
    let i32_pointee = unit.ast.type_path("i32", sp());
    let pointer_ty = unit.ast.push_type_expr(TypeExpr::Pointer {
        pointee: i32_pointee,
        span: sp(),
    });
    unit.var("p", false, Some(pointer_ty), Some(array));

    let empty = unit.ast.push_expr(Expr::Array {
        elements: vec![],
        span: sp(),
    });
    let i32_elem = unit.ast.type_path("i32", sp());
    let slice_ty = unit.ast.push_type_expr(TypeExpr::Slice {
        elem: i32_elem,
        span: sp(),
    });
    unit.var("e", false, Some(slice_ty), Some(empty));

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    // exactly the pointer initialization is flagged unsafe
    assert!(has_code(&checker, "W0011"));
    assert_eq!(checker.diagnostics().warning_count(), 1);
}

#[test]
fn test_cyclic_type_gets_pointer_suggestion() {
    // type Node is Node
    let mut unit = TestUnit::new();
    let target = unit.ast.type_path("Node", sp());
    let alias = unit.ast.push_decl(Decl::Alias {
        name: "Node".to_string(),
        generics: None,
        target,
        span: sp(),
    });
    unit.decls.push(alias);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0391"));
    let cyclic = checker
        .diagnostics()
        .diagnostics()
        .iter()
        .find(|diag| diag.code == "E0391")
        .unwrap();
    assert!(cyclic
        .suggestions
        .iter()
        .any(|suggestion| suggestion.insertion == "*"));
}

#[test]
fn test_immutable_assignment_is_rejected() {
    // function f() { val x = 5  x = 6 }
    let mut unit = TestUnit::new();
    let five = unit.ast.lit_int("5", sp());
    let x = unit.ast.push_decl(Decl::Var {
        name: "x".to_string(),
        mutable: false,
        ty: None,
        value: Some(five),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl { decl: x, span: sp() });

    let target = unit.ast.ident("x", sp());
    let six = unit.ast.lit_int("6", sp());
    let assign = unit.ast.push_stmt(Stmt::Assign {
        op: AssignOp::Plain,
        target,
        value: six,
        span: sp(),
    });
    let body = unit.block(vec![decl_stmt, assign]);
    unit.function("f", None, vec![], None, body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0594"));
}

#[test]
fn test_mutable_assignment_is_accepted() {
    let mut unit = TestUnit::new();
    let five = unit.ast.lit_int("5", sp());
    let x = unit.ast.push_decl(Decl::Var {
        name: "x".to_string(),
        mutable: true,
        ty: None,
        value: Some(five),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl { decl: x, span: sp() });

    let target = unit.ast.ident("x", sp());
    let six = unit.ast.lit_int("6", sp());
    let assign = unit.ast.push_stmt(Stmt::Assign {
        op: AssignOp::Plain,
        target,
        value: six,
        span: sp(),
    });
    let body = unit.block(vec![decl_stmt, assign]);
    unit.function("f", None, vec![], None, body);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
}

#[test]
fn test_return_type_mismatch() {
    // function f() i32 { return "nope"s }
    let mut unit = TestUnit::new();
    let text = unit.ast.lit_string("nope", sp());
    let ret = unit.ast.push_stmt(Stmt::Return {
        value: Some(text),
        span: sp(),
    });
    let body = unit.block(vec![ret]);
    let i32_result = unit.ast.type_path("i32", sp());
    unit.function("f", None, vec![], Some(i32_result), body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0308"));
}

#[test]
fn test_unknown_identifier_suggests_similar_names() {
    // function f() { val count = 1  count2 … }  — `coutn` typo
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    let count = unit.ast.push_decl(Decl::Var {
        name: "count".to_string(),
        mutable: false,
        ty: None,
        value: Some(one),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl {
        decl: count,
        span: sp(),
    });

    let typo = unit.ast.ident("coutn", sp());
    let use_stmt = unit.expr_stmt(typo);
    let body = unit.block(vec![decl_stmt, use_stmt]);
    unit.function("f", None, vec![], None, body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0425"));
    let unresolved = checker
        .diagnostics()
        .diagnostics()
        .iter()
        .find(|diag| diag.code == "E0425")
        .unwrap();
    assert!(unresolved
        .help
        .as_ref()
        .map(|help| help.contains("count"))
        .unwrap_or(false));
}

#[test]
fn test_duplicate_definition_in_same_scope() {
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    unit.konst("X", None, one);
    let two = unit.ast.lit_int("2", sp());
    unit.konst("X", None, two);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0428"));
}

#[test]
fn test_entry_point_identified() {
    let mut unit = TestUnit::new();
    let body = unit.block(vec![]);
    let main = unit.function("main", None, vec![], None, body);

    let checker = unit.analyze_app();
    assert!(!checker.diagnostics().has_errors());
    assert_eq!(checker.entry_point(), Some(main));
}

#[test]
fn test_app_without_main_is_an_error() {
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    unit.konst("X", None, one);

    let checker = unit.analyze_app();
    assert!(has_code(&checker, "E0601"));
}

#[test]
fn test_main_with_parameters_is_rejected() {
    let mut unit = TestUnit::new();
    let i32_annotation = unit.ast.type_path("i32", sp());
    let arg = unit.param("arg", i32_annotation);
    let body = unit.block(vec![]);
    unit.function("main", None, vec![arg], None, body);

    let checker = unit.analyze_app();
    assert!(has_code(&checker, "E0601"));
}

#[test]
fn test_or_pattern_alternatives_must_agree_on_bindings() {
    // when v { (a | _) => … } over i32 — alternatives disagree
    let mut unit = TestUnit::new();
    let i32_annotation = unit.ast.type_path("i32", sp());
    let v = unit.param("v", i32_annotation);

    let bind = unit.ast.push_pat(Pattern::Bind {
        name: "a".to_string(),
        span: sp(),
    });
    let wildcard = unit.ast.push_pat(Pattern::Wildcard { span: sp() });
    let or_pattern = unit.ast.push_pat(Pattern::Or {
        alternatives: vec![bind, wildcard],
        span: sp(),
    });

    let arm_body = unit.block(vec![]);
    let else_body = unit.block(vec![]);
    let scrutinee = unit.ast.ident("v", sp());
    let when = unit.ast.push_expr(Expr::When {
        scrutinee,
        arms: vec![WhenArm {
            pattern: or_pattern,
            guard: None,
            body: arm_body,
        }],
        else_arm: Some(else_body),
        span: sp(),
    });
    let stmt = unit.expr_stmt(when);
    let body = unit.block(vec![stmt]);
    unit.function("f", None, vec![v], None, body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0408"));
}

#[test]
fn test_unused_import_warns_and_used_import_does_not() {
    let mut ast = nemesis_ast::Ast::new();

    // workspace util: const VALUE = 7
    let seven = ast.lit_int("7", sp());
    let value = ast.push_decl(Decl::Const {
        name: "VALUE".to_string(),
        ty: None,
        value: seven,
        span: sp(),
    });
    ast.push_unit(SourceUnit {
        path: "util.ns".to_string(),
        workspace: Some(("util".to_string(), WorkspaceKind::Lib)),
        uses: vec![],
        decls: vec![value],
        span: sp(),
    });

    // workspace demo imports util but never touches it
    let unused_use = ast.push_decl(Decl::Use {
        path: vec!["util".to_string()],
        span: sp(),
    });
    ast.push_unit(SourceUnit {
        path: "demo.ns".to_string(),
        workspace: Some(("demo".to_string(), WorkspaceKind::Lib)),
        uses: vec![unused_use],
        decls: vec![],
        span: sp(),
    });

    let mut checker = Checker::new(ast);
    checker.check();
    assert!(has_code(&checker, "W0002"));
}

#[test]
fn test_non_callable_call_is_rejected() {
    // function f() { val x = 1  x() }
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    let x = unit.ast.push_decl(Decl::Var {
        name: "x".to_string(),
        mutable: false,
        ty: None,
        value: Some(one),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl { decl: x, span: sp() });

    let callee = unit.ast.ident("x", sp());
    let call = unit.ast.push_expr(Expr::Call {
        callee,
        args: vec![],
        span: sp(),
    });
    let call_stmt = unit.expr_stmt(call);
    let body = unit.block(vec![decl_stmt, call_stmt]);
    unit.function("f", None, vec![], None, body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0618"));
}

#[test]
fn test_wrong_argument_count() {
    // function g(x: i32) {}; function f() { g() }
    let mut unit = TestUnit::new();
    let i32_annotation = unit.ast.type_path("i32", sp());
    let x = unit.param("x", i32_annotation);
    let g_body = unit.block(vec![]);
    unit.function("g", None, vec![x], None, g_body);

    let callee = unit.ast.ident("g", sp());
    let call = unit.ast.push_expr(Expr::Call {
        callee,
        args: vec![],
        span: sp(),
    });
    let call_stmt = unit.expr_stmt(call);
    let f_body = unit.block(vec![call_stmt]);
    unit.function("f", None, vec![], None, f_body);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0061"));
}

#[test]
fn test_every_checked_expression_is_annotated() {
    // a well-typed function leaves no expression without a type
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    let two = unit.ast.lit_int("2", sp());
    let sum = unit.ast.binary(nemesis_ast::BinaryOp::Add, one, two, sp());
    let x = unit.ast.push_decl(Decl::Var {
        name: "x".to_string(),
        mutable: false,
        ty: None,
        value: Some(sum),
        span: sp(),
    });
    let decl_stmt = unit.ast.push_stmt(Stmt::Decl { decl: x, span: sp() });
    let body = unit.block(vec![decl_stmt]);
    unit.function("f", None, vec![], None, body);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    for expr in [one, two, sum] {
        let note = checker.expr_note(expr);
        assert!(note.ty.is_some() || note.invalid);
    }
}
