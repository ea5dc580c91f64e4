// Numeric semantics of snippets: integer overflow, float rendering, builtins

use snipbox::{DiagnosticKind, Engine, ExecutionOutcome, Value};

fn eval(code: &str) -> ExecutionOutcome {
    Engine::default().run(code)
}

fn text(code: &str) -> String {
    eval(code).text()
}

fn exception(code: &str) -> String {
    match eval(code) {
        ExecutionOutcome::Error(diagnostic) => {
            assert_eq!(diagnostic.kind, DiagnosticKind::Runtime, "{}", diagnostic.report);
            diagnostic.exception
        }
        other => panic!("expected an error for {:?}, got {:?}", code, other),
    }
}

#[test]
fn test_integer_arithmetic() {
    assert!(matches!(eval("2 ** 10"), ExecutionOutcome::Value(Value::Int(1024))));
    assert_eq!(text("(3 + 4) * 5 - 6"), "29");
    assert_eq!(text("17 % 5, -17 % 5"), "(2, 3)");
    assert_eq!(text("divmod(17, 5)"), "(3, 2)");
    assert_eq!(text("pow(3, 4, 5)"), "1");
}

#[test]
fn test_bitwise_operators() {
    assert_eq!(text("6 & 3, 6 | 3, 6 ^ 3, ~6"), "(2, 7, 5, -7)");
    assert_eq!(text("1 << 10, 1024 >> 3"), "(1024, 128)");
}

#[test]
fn test_integer_overflow_raises() {
    assert_eq!(exception("9223372036854775807 + 1"), "OverflowError");
    assert_eq!(exception("2 ** 64"), "OverflowError");
}

#[test]
fn test_division_errors() {
    assert_eq!(exception("1 // 0"), "ZeroDivisionError");
    assert_eq!(exception("5 % 0"), "ZeroDivisionError");
    assert_eq!(exception("1.5 / 0"), "ZeroDivisionError");
}

#[test]
fn test_float_rendering() {
    assert_eq!(text("1 / 4"), "0.25");
    assert_eq!(text("10 / 2"), "5.0");
    assert_eq!(text("float('inf')"), "inf");
    assert_eq!(text("1e20"), "1e+20");
}

#[test]
fn test_mixed_comparisons() {
    assert_eq!(text("1 == 1.0, 1 < 2.5 < 3, 2 != 2"), "(True, True, False)");
    assert_eq!(text("True + True"), "2");
}

#[test]
fn test_conversions() {
    assert_eq!(text("int('42') + int(3.9) + int('ff', 16)"), "300");
    assert_eq!(text("str(12) + repr('a')"), "\"12'a'\"");
    assert_eq!(text("round(2.675, 2), round(7.5), round(8.5)"), "(2.67, 8, 8)");
    assert_eq!(text("abs(-3), abs(-2.5)"), "(3, 2.5)");
    assert_eq!(exception("int('seven')"), "ValueError");
}

#[test]
fn test_type_errors() {
    assert_eq!(exception("1 + 'a'"), "TypeError");
    assert_eq!(exception("len(5)"), "TypeError");
    assert_eq!(exception("[1] < 'a'"), "TypeError");
}

#[test]
fn test_sequence_arithmetic() {
    assert_eq!(text("[1, 2] * 2 + [3]"), "[1, 2, 1, 2, 3]");
    assert_eq!(text("'ab' * 3"), "'ababab'");
    assert_eq!(text("sum([0.5, 0.25], 1)"), "1.75");
}

#[test]
fn test_most_negative_integer_literal() {
    assert!(matches!(
        eval("-9223372036854775808"),
        ExecutionOutcome::Value(Value::Int(i64::MIN))
    ));
    assert_eq!(text("x = -9223372036854775808\nx + 1"), "-9223372036854775807");
    assert_eq!(exception("-9223372036854775808 - 1"), "OverflowError");

    match eval("9223372036854775808") {
        ExecutionOutcome::Error(diagnostic) => {
            assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
            assert!(diagnostic.message.contains("does not fit in 64 bits"));
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_reductions_over_large_ranges() {
    assert_eq!(text("any(range(10 ** 12)), all(range(10 ** 12))"), "(True, False)");
    assert_eq!(text("max(range(10 ** 5)), min(range(10 ** 5, 0, -1))"), "(99999, 1)");
}
