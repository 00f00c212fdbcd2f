// Constant evaluation through the whole pipeline: literals, promotion,
// overflow tracking, metadata constants, string building.

mod common;

use common::{has_code, has_message, sp, TestUnit};
use nemesis_ast::{BinaryOp, UnaryOp};
use nemesis_sema::{Payload, TypeKind};

#[test]
fn test_integer_constant_overflow_is_fatal() {
    // const X: u8 = 255 + 1
    let mut unit = TestUnit::new();
    let a = unit.ast.lit_int("255", sp());
    let b = unit.ast.lit_int("1", sp());
    let sum = unit.ast.binary(BinaryOp::Add, a, b, sp());
    let u8_ty = unit.ast.type_path("u8", sp());
    let konst = unit.konst("X", Some(u8_ty), sum);

    let checker = unit.analyze_lib();
    assert!(checker.diagnostics().has_errors());
    assert!(has_message(&checker, "overflow"));
    assert!(has_message(&checker, "u8"));
    assert!(checker.decl_note(konst).invalid);
}

#[test]
fn test_in_range_constant_is_stored() {
    // const X: u8 = 200 + 55
    let mut unit = TestUnit::new();
    let a = unit.ast.lit_int("200", sp());
    let b = unit.ast.lit_int("55", sp());
    let sum = unit.ast.binary(BinaryOp::Add, a, b, sp());
    let u8_ty = unit.ast.type_path("u8", sp());
    let konst = unit.konst("X", Some(u8_ty), sum);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    let value = checker.decl_note(konst).value.clone().unwrap();
    assert_eq!(value.ty, checker.types().uint(8));
    match value.payload {
        Payload::Uint(u) => {
            assert_eq!(u.value(), 255);
            assert_eq!(u.bits(), 8);
        }
        other => panic!("expected an unsigned payload, got {:?}", other),
    }
}

#[test]
fn test_integer_division_produces_rational() {
    // const Y = 10 / 3  →  r64, 10/3 exactly
    let mut unit = TestUnit::new();
    let a = unit.ast.lit_int("10", sp());
    let b = unit.ast.lit_int("3", sp());
    let quotient = unit.ast.binary(BinaryOp::Div, a, b, sp());
    let konst = unit.konst("Y", None, quotient);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());

    let note = checker.decl_note(konst);
    assert_eq!(note.ty, Some(checker.types().rational(64)));
    match &note.value.as_ref().unwrap().payload {
        Payload::Rational(r) => {
            assert_eq!(r.numerator().value(), 10);
            assert_eq!(r.denominator().value(), 3);
            assert!(!r.overflow());
        }
        other => panic!("expected a rational payload, got {:?}", other),
    }
}

#[test]
fn test_division_by_zero_is_reported() {
    let mut unit = TestUnit::new();
    let a = unit.ast.lit_int("1", sp());
    let b = unit.ast.lit_int("0", sp());
    let quotient = unit.ast.binary(BinaryOp::Div, a, b, sp());
    unit.konst("D", None, quotient);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0081"));
}

#[test]
fn test_type_metadata_constants() {
    // const M = i32.MAX
    let mut unit = TestUnit::new();
    let object = unit.ast.ident("i32", sp());
    let member = unit.ast.ident("MAX", sp());
    let access = unit.ast.push_expr(nemesis_ast::Expr::Member {
        object,
        member,
        span: sp(),
    });
    let konst = unit.konst("M", None, access);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    match &checker.decl_note(konst).value.as_ref().unwrap().payload {
        Payload::Int(i) => assert_eq!(i.value(), i64::from(i32::MAX) as i128),
        other => panic!("expected an integer payload, got {:?}", other),
    }
}

#[test]
fn test_float_metadata_constants() {
    // const INF = f64.INFINITY
    let mut unit = TestUnit::new();
    let object = unit.ast.ident("f64", sp());
    let member = unit.ast.ident("INFINITY", sp());
    let access = unit.ast.push_expr(nemesis_ast::Expr::Member {
        object,
        member,
        span: sp(),
    });
    let konst = unit.konst("INF", None, access);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    match &checker.decl_note(konst).value.as_ref().unwrap().payload {
        Payload::Float(f) => assert!(f.value().is_infinite()),
        other => panic!("expected a float payload, got {:?}", other),
    }
}

#[test]
fn test_string_concatenation_promotes_to_string() {
    // const S = 'a' + "bc"
    let mut unit = TestUnit::new();
    let c = unit.ast.lit_char("a", sp());
    let tail = unit.ast.lit_chars("bc", sp());
    let joined = unit.ast.binary(BinaryOp::Add, c, tail, sp());
    let konst = unit.konst("S", None, joined);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    let value = checker.decl_note(konst).value.clone().unwrap();
    assert_eq!(value.ty, checker.types().string());
    match value.payload {
        Payload::Text(s) => assert_eq!(s, "abc"),
        other => panic!("expected a text payload, got {:?}", other),
    }
}

#[test]
fn test_mixed_signedness_equality_rejected() {
    // const B = 1i32 == 1u32
    let mut unit = TestUnit::new();
    let a = unit.ast.lit_int("1i32", sp());
    let b = unit.ast.lit_int("1u32", sp());
    let eq = unit.ast.binary(BinaryOp::Eq, a, b, sp());
    unit.konst("B", None, eq);

    let checker = unit.analyze_lib();
    assert!(checker.diagnostics().has_errors());
    assert!(has_message(&checker, "signed and unsigned"));
}

#[test]
fn test_chars_and_string_equality_interchange() {
    // const B = "abc" == "abc"s
    let mut unit = TestUnit::new();
    let view = unit.ast.lit_chars("abc", sp());
    let owned = unit.ast.lit_string("abc", sp());
    let eq = unit.ast.binary(BinaryOp::Eq, view, owned, sp());
    let konst = unit.konst("B", None, eq);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    match checker.decl_note(konst).value.as_ref().unwrap().payload {
        Payload::Bool(b) => assert!(b),
        ref other => panic!("expected a bool payload, got {:?}", other),
    }
}

#[test]
fn test_unsigned_negation_overflows_unconditionally() {
    // const N = -(0u32) — flagged even for zero
    let mut unit = TestUnit::new();
    let zero = unit.ast.lit_int("0u32", sp());
    let negated = unit.ast.unary(UnaryOp::Minus, zero, sp());
    unit.konst("N", None, negated);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0080"));
}

#[test]
fn test_power_yields_float() {
    // const P = 2 ** 10
    let mut unit = TestUnit::new();
    let base = unit.ast.lit_int("2", sp());
    let exponent = unit.ast.lit_int("10", sp());
    let power = unit.ast.binary(BinaryOp::Pow, base, exponent, sp());
    let konst = unit.konst("P", None, power);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    let value = checker.decl_note(konst).value.clone().unwrap();
    assert!(matches!(
        checker.types().kind(value.ty),
        TypeKind::Float { .. }
    ));
    match value.payload {
        Payload::Float(f) => assert_eq!(f.value(), 1024.0),
        other => panic!("expected a float payload, got {:?}", other),
    }
}

#[test]
fn test_constant_folding_through_references() {
    // const A = 2; const B = A * 3
    let mut unit = TestUnit::new();
    let two = unit.ast.lit_int("2", sp());
    unit.konst("A", None, two);

    let a_ref = unit.ast.ident("A", sp());
    let three = unit.ast.lit_int("3", sp());
    let product = unit.ast.binary(BinaryOp::Mul, a_ref, three, sp());
    let b = unit.konst("B", None, product);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    match checker.decl_note(b).value.as_ref().unwrap().payload {
        Payload::Int(i) => assert_eq!(i.value(), 6),
        ref other => panic!("expected an integer payload, got {:?}", other),
    }
}

#[test]
fn test_cyclic_constant_detected() {
    // const A = B; const B = A
    let mut unit = TestUnit::new();
    let b_ref = unit.ast.ident("B", sp());
    unit.konst("A", None, b_ref);
    let a_ref = unit.ast.ident("A", sp());
    unit.konst("B", None, a_ref);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0391"));
}

#[test]
fn test_tuple_and_index_in_constant_context() {
    // const T = (1, (2, 3)); const E = T.1[?] — use array indexing instead
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    let two = unit.ast.lit_int("2", sp());
    let three = unit.ast.lit_int("3", sp());
    let array = unit.ast.push_expr(nemesis_ast::Expr::Array {
        elements: vec![two, three],
        span: sp(),
    });
    let tuple = unit.ast.push_expr(nemesis_ast::Expr::Tuple {
        elements: vec![one, array],
        span: sp(),
    });
    unit.konst("T", None, tuple);

    let t_ref = unit.ast.ident("T", sp());
    let component = unit.ast.push_expr(nemesis_ast::Expr::TupleIndex {
        object: t_ref,
        index: 1,
        span: sp(),
    });
    let index = unit.ast.lit_int("0", sp());
    let element = unit.ast.push_expr(nemesis_ast::Expr::Index {
        object: component,
        index,
        span: sp(),
    });
    let e = unit.konst("E", None, element);

    let checker = unit.analyze_lib();
    assert!(!checker.diagnostics().has_errors());
    match checker.decl_note(e).value.as_ref().unwrap().payload {
        Payload::Int(i) => assert_eq!(i.value(), 2),
        ref other => panic!("expected an integer payload, got {:?}", other),
    }
}

#[test]
fn test_constant_index_out_of_range() {
    let mut unit = TestUnit::new();
    let one = unit.ast.lit_int("1", sp());
    let array = unit.ast.push_expr(nemesis_ast::Expr::Array {
        elements: vec![one],
        span: sp(),
    });
    unit.konst("A", None, array);

    let a_ref = unit.ast.ident("A", sp());
    let index = unit.ast.lit_int("5", sp());
    let element = unit.ast.push_expr(nemesis_ast::Expr::Index {
        object: a_ref,
        index,
        span: sp(),
    });
    unit.konst("E", None, element);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0084"));
}

#[test]
fn test_cast_resizes_and_checks() {
    // const C = 300 as u8 → overflow
    let mut unit = TestUnit::new();
    let value = unit.ast.lit_int("300", sp());
    let target = unit.ast.type_path("u8", sp());
    let cast = unit.ast.push_expr(nemesis_ast::Expr::Cast {
        value,
        target,
        span: sp(),
    });
    unit.konst("C", None, cast);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0080"));
}

#[test]
fn test_function_call_rejected_in_constant_context() {
    let mut unit = TestUnit::new();
    let callee = unit.ast.ident("f", sp());
    let call = unit.ast.push_expr(nemesis_ast::Expr::Call {
        callee,
        args: vec![],
        span: sp(),
    });
    unit.konst("C", None, call);

    let checker = unit.analyze_lib();
    assert!(has_code(&checker, "E0083"));
}

#[test]
fn test_evaluation_is_deterministic() {
    let build = || {
        let mut unit = TestUnit::new();
        let a = unit.ast.lit_real("1.0", sp());
        let b = unit.ast.lit_real("3.0", sp());
        let quotient = unit.ast.binary(BinaryOp::Div, a, b, sp());
        let konst = unit.konst("Q", None, quotient);
        (unit, konst)
    };

    let (first_unit, first_konst) = build();
    let (second_unit, second_konst) = build();
    let first = first_unit.analyze_lib();
    let second = second_unit.analyze_lib();

    let first_value = first.decl_note(first_konst).value.clone().unwrap();
    let second_value = second.decl_note(second_konst).value.clone().unwrap();
    assert_eq!(first_value, second_value);
    assert_eq!(
        first.diagnostics().warning_count(),
        second.diagnostics().warning_count()
    );
}
