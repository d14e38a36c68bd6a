mod common;

use common::*;
use rask::Value;

#[test]
fn if_else_expressions() {
    let cases: [(&str, Option<i64>); 6] = [
        ("if (true) {10}", Some(10)),
        ("if (false) {10}", None),
        ("if (2 > 10) {10}", None),
        ("if (2 < 10) {10}", Some(10)),
        ("if (2 != 10) {10}", Some(10)),
        ("if (2 == 10) {10} else {20}", Some(20)),
    ];
    for (input, expected) in cases {
        let result = eval_source(input);
        match expected {
            Some(value) => assert_integer(&result, value),
            None => assert_null(&result),
        }
    }
}

#[test]
fn zero_is_truthy() {
    assert_integer(&eval_source("if (0) {1} else {2}"), 1);
    assert_integer(&eval_source("if (\"\") {1} else {2}"), 1);
}

#[test]
fn nested_if_returns_propagate() {
    let source = "if (true) {
        if (true) {
            return 10;
        }
        return 1;
    }";
    assert_integer(&eval_source(source), 10);
}

#[test]
fn return_statements() {
    let cases = [
        ("return 10;", 10),
        ("return 10; 9;", 10),
        ("9; return 10; 9;", 10),
        ("9; return 2 * 5; 9;", 10),
    ];
    for (input, expected) in cases {
        assert_integer(&eval_source(input), expected);
    }
}

#[test]
fn bare_return_yields_null() {
    assert_null(&eval_source("return;"));
    assert_null(&eval_source("let f = fn() { return; }; f();"));
}

#[test]
fn let_bindings() {
    let cases = [
        ("let a = 5; a;", 5),
        ("let a = 5 * 5; a;", 25),
        ("let a = 5; let b = a * 5; b;", 25),
        ("let a = 5; let b = 2 * a; let c = a + b * 2; c;", 25),
    ];
    for (input, expected) in cases {
        assert_integer(&eval_source(input), expected);
    }
}

#[test]
fn let_evaluates_to_null() {
    assert_null(&eval_source("let a = 5;"));
}

#[test]
fn three_clause_for_loop() {
    let source = "let sum = 0; for (let i = 0; i < 10; i = i + 1) { sum = sum + i; } sum;";
    assert_integer(&eval_source(source), 45);
}

#[test]
fn condition_only_for_loop() {
    let source = "let i = 0; for (i < 5) { i = i + 1; } i;";
    assert_integer(&eval_source(source), 5);
}

#[test]
fn condition_and_complete_for_loop() {
    // The loop yields its last body value when the condition turns falsy.
    let source = "let i = 0; for (i < 3; i = i + 1) { i }";
    assert_integer(&eval_source(source), 2);
}

#[test]
fn infinite_loop_exits_via_return() {
    let source = "let i = 0; for () { i = i + 1; if (i == 4) { return i * 10; } }";
    assert_integer(&eval_source(source), 40);
}

#[test]
fn for_loop_as_expression_value() {
    let source = "let last = for (let i = 0; i < 3; i = i + 1) { i * 2 }; last;";
    assert_integer(&eval_source(source), 4);
}

#[test]
fn for_loop_with_null_body_yields_null() {
    let source = "let i = 0; for (i < 2; i = i + 1) { let x = i; }";
    assert_null(&eval_source(source));
}

#[test]
fn return_inside_function_loop_stops_at_function() {
    let source = "let firstOver = fn(limit) {
        let i = 0;
        for () {
            i = i + 1;
            if (i > limit) { return i; }
        }
    };
    firstOver(3) + firstOver(5);";
    assert_integer(&eval_source(source), 10);
}

#[test]
fn loop_counter_does_not_leak() {
    // The for loop runs in its own enclosed scope.
    let result = eval_source("for (let i = 0; i < 2; i = i + 1) { i; } i;");
    match result {
        Value::Error(err) => assert_eq!(err.message, "identifier not found: i"),
        other => panic!("expected lookup error, got {:?}", other),
    }
}

#[test]
fn loop_mutates_enclosing_bindings() {
    let source = "let total = 0; for (let i = 0; i < 4; i = i + 1) { total = total + 2; } total;";
    assert_integer(&eval_source(source), 8);
}
