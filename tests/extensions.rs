mod common;

use common::{assert_integer, assert_null, assert_string};
use rask::extensions::{Callback, ExtensionError, HostValue, Plugin, Registry};
use rask::interpreter::{Environment, Evaluator};
use rask::Value;
use serde_json::json;
use std::rc::Rc;

/// Minimal system plugin mirroring the host side of the bridge.
struct SysPlugin;

impl Plugin for SysPlugin {
    fn package(&self) -> &str {
        "sys"
    }

    fn version(&self) -> &str {
        "0.0.1"
    }

    fn description(&self) -> &str {
        "system functions for bridge tests"
    }

    fn eval(&self, function: &str, args: &[HostValue]) -> Result<Vec<HostValue>, ExtensionError> {
        match function {
            "len" => {
                let length = match args.first() {
                    Some(HostValue::String(s)) => s.len(),
                    Some(HostValue::Array(items)) => items.len(),
                    Some(HostValue::Object(map)) => map.len(),
                    other => {
                        return Err(ExtensionError::failure(format!(
                            "unexpected value {:?} to `len` function",
                            other
                        )))
                    }
                };
                Ok(vec![json!(length)])
            }
            "echo" => Ok(args.to_vec()),
            "maxu" => Ok(vec![HostValue::from(u64::MAX)]),
            "none" => Ok(Vec::new()),
            _ => Err(ExtensionError::unknown_function("sys", function)),
        }
    }

    fn call(
        &self,
        function: &str,
        callback: Callback<'_>,
        args: &[HostValue],
    ) -> Result<Vec<HostValue>, ExtensionError> {
        match function {
            "apply" => callback(args),
            "repeat" => {
                let count = match args.first() {
                    Some(HostValue::Number(n)) => n.as_i64().unwrap_or(0),
                    _ => 0,
                };
                let mut last = Vec::new();
                for i in 0..count {
                    last = callback(&[json!(i)])?;
                }
                Ok(last)
            }
            _ => Err(ExtensionError::unknown_function("sys", function)),
        }
    }
}

fn eval_with_registry(source: &str) -> Value {
    let mut registry = Registry::new();
    registry.add(Box::new(SysPlugin));

    let evaluator = Evaluator::new().with_registry(Rc::new(registry));
    let env = Environment::new();
    evaluator
        .run(source, "test.rs", &env)
        .expect("program should parse")
}

fn assert_error(value: &Value, expected: &str) {
    match value {
        Value::Error(err) => assert_eq!(err.message, expected),
        other => panic!("expected ERROR {:?}, got {:?}", expected, other),
    }
}

#[test]
fn eval_forwards_and_marshals_back() {
    assert_integer(&eval_with_registry("eval(\"sys\", \"len\", \"hello\");"), 5);
    assert_integer(&eval_with_registry("eval(\"sys\", \"len\", [1, 2, 3]);"), 3);
    assert_integer(
        &eval_with_registry("eval(\"sys\", \"len\", {\"a\": 1, \"b\": 2});"),
        2,
    );
}

#[test]
fn eval_round_trips_aggregates() {
    assert_integer(
        &eval_with_registry("eval(\"sys\", \"echo\", [1, [2, 3]])[1][0];"),
        2,
    );
    assert_string(
        &eval_with_registry("eval(\"sys\", \"echo\", {\"name\": \"rask\"})[\"name\"];"),
        "rask",
    );
}

#[test]
fn unsigned_host_values_reinterpret_as_signed() {
    assert_integer(&eval_with_registry("eval(\"sys\", \"maxu\");"), -1);
}

#[test]
fn empty_plugin_result_is_null() {
    assert_null(&eval_with_registry("eval(\"sys\", \"none\");"));
}

#[test]
fn eval_argument_validation() {
    assert_error(
        &eval_with_registry("eval(\"sys\");"),
        "wrong number of arguments to `eval`; got=1, expected>=2",
    );
    assert_error(
        &eval_with_registry("eval(1, \"len\");"),
        "`eval` expects string as first argument, but got INTEGER",
    );
    assert_error(
        &eval_with_registry("eval(\"sys\", true);"),
        "`eval` expects string as second argument, but got BOOLEAN",
    );
}

#[test]
fn unknown_package_and_function() {
    assert_error(
        &eval_with_registry("eval(\"nope\", \"x\");"),
        "plugin `nope` err: package nope not found in extensions",
    );
    assert_error(
        &eval_with_registry("eval(\"sys\", \"missing\");"),
        "plugin `sys` err: function missing not found in sys extension",
    );
}

#[test]
fn call_invokes_the_script_callback() {
    assert_integer(
        &eval_with_registry("call(\"sys\", \"apply\", fn(x) { return x * 2; }, 21);"),
        42,
    );
}

#[test]
fn callback_closes_over_the_script_environment() {
    let source = "let base = 10; call(\"sys\", \"apply\", fn(x) { return x + base; }, 5);";
    assert_integer(&eval_with_registry(source), 15);
}

#[test]
fn callback_invoked_repeatedly() {
    assert_integer(
        &eval_with_registry("call(\"sys\", \"repeat\", fn(i) { return i * i; }, 3);"),
        4,
    );
}

#[test]
fn callback_may_mutate_script_state() {
    let source = "let total = 0;
    call(\"sys\", \"repeat\", fn(i) { total = total + i; return i; }, 4);
    total;";
    assert_integer(&eval_with_registry(source), 6);
}

#[test]
fn callback_null_result_is_an_empty_host_result() {
    assert_null(&eval_with_registry(
        "call(\"sys\", \"apply\", fn(x) { let unused = x; }, 1);",
    ));
}

#[test]
fn callback_arity_mismatch_surfaces_as_plugin_error() {
    assert_error(
        &eval_with_registry("call(\"sys\", \"apply\", fn() { return 1; }, 1);"),
        "plugin `sys` err: unexpected number of arguments",
    );
}

#[test]
fn call_argument_validation() {
    assert_error(
        &eval_with_registry("call(\"sys\", \"apply\");"),
        "wrong number of arguments to `call`; got=2, expected>=3",
    );
    assert_error(
        &eval_with_registry("call(\"sys\", \"apply\", 5);"),
        "`call` expects function as third argument, but got INTEGER",
    );
}

#[test]
fn builtins_resolve_after_locals() {
    // A local binding shadows the builtin table.
    let source = "let eval = fn(x) { return x; }; eval(9);";
    assert_integer(&eval_with_registry(source), 9);
}

#[test]
fn missing_registry_is_reported() {
    let evaluator = Evaluator::new();
    let env = Environment::new();
    let result = evaluator
        .run("eval(\"sys\", \"len\", \"x\");", "test.rs", &env)
        .expect("program should parse");
    assert_error(&result, "extensions registry is not defined");
}

#[test]
fn script_error_inside_callback_propagates_to_the_plugin() {
    assert_error(
        &eval_with_registry("call(\"sys\", \"apply\", fn(x) { return x + missing; }, 1);"),
        "plugin `sys` err: identifier not found: missing",
    );
}
