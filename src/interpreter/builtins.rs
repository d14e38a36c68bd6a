use crate::convert::{host_to_value, value_to_host};
use crate::error::ExtensionError;
use crate::extensions::HostValue;
use crate::value::{Builtin, Value, NULL};

use super::evaluator::{unwrap_return, Evaluator};

/// Builtin table. Consulted after the environment chain and the external
/// alias table miss.
pub(crate) fn lookup(name: &str) -> Option<Value> {
    let builtin = match name {
        "eval" => Builtin {
            name: "eval",
            func: builtin_eval,
        },
        "call" => Builtin {
            name: "call",
            func: builtin_call,
        },
        _ => return None,
    };
    Some(Value::Builtin(builtin))
}

/// `eval(pkg, fn, args...)`: marshal the arguments out to the plugin
/// registry and the first returned host value back in.
fn builtin_eval(evaluator: &Evaluator, args: &[Value]) -> Value {
    if args.len() < 2 {
        return Value::error(format!(
            "wrong number of arguments to `eval`; got={}, expected>={}",
            args.len(),
            2
        ));
    }
    let package = match &args[0] {
        Value::Str(s) => s.clone(),
        other => {
            return Value::error(format!(
                "`eval` expects string as first argument, but got {}",
                other.kind()
            ))
        }
    };
    let function = match &args[1] {
        Value::Str(s) => s.clone(),
        other => {
            return Value::error(format!(
                "`eval` expects string as second argument, but got {}",
                other.kind()
            ))
        }
    };

    let registry = match evaluator.registry() {
        Some(registry) => registry,
        None => return Value::error("extensions registry is not defined"),
    };

    let host_args: Vec<HostValue> = args[2..].iter().map(value_to_host).collect();
    match registry.eval(&package, &function, &host_args) {
        Ok(values) => values.first().map(host_to_value).unwrap_or(NULL),
        Err(err) => Value::error(format!("plugin `{}` err: {}", package, err)),
    }
}

/// `call(pkg, fn, script-fn, args...)`: like `eval`, plus a host-invokable
/// callback that re-enters the evaluator with the given function.
fn builtin_call(evaluator: &Evaluator, args: &[Value]) -> Value {
    if args.len() < 3 {
        return Value::error(format!(
            "wrong number of arguments to `call`; got={}, expected>={}",
            args.len(),
            3
        ));
    }
    let package = match &args[0] {
        Value::Str(s) => s.clone(),
        other => {
            return Value::error(format!(
                "`call` expects string as first argument, but got {}",
                other.kind()
            ))
        }
    };
    let function = match &args[1] {
        Value::Str(s) => s.clone(),
        other => {
            return Value::error(format!(
                "`call` expects string as second argument, but got {}",
                other.kind()
            ))
        }
    };
    let script_fn = match &args[2] {
        Value::Function(f) => f.clone(),
        other => {
            return Value::error(format!(
                "`call` expects function as third argument, but got {}",
                other.kind()
            ))
        }
    };

    let registry = match evaluator.registry() {
        Some(registry) => registry,
        None => return Value::error("extensions registry is not defined"),
    };

    let host_args: Vec<HostValue> = args[3..].iter().map(value_to_host).collect();

    let mut callback = |cb_args: &[HostValue]| -> Result<Vec<HostValue>, ExtensionError> {
        let script_args: Vec<Value> = cb_args.iter().map(host_to_value).collect();
        if script_args.len() != script_fn.parameters.len() {
            return Err(ExtensionError::failure("unexpected number of arguments"));
        }

        let scope = Evaluator::extend_function_env(&script_fn, script_args);
        match unwrap_return(evaluator.eval_block(&script_fn.body, &scope)) {
            Value::Error(err) => Err(ExtensionError::failure(err.message)),
            Value::Null => Ok(Vec::new()),
            value => Ok(vec![value_to_host(&value)]),
        }
    };

    match registry.call(&package, &function, &mut callback, &host_args) {
        Ok(values) => values.first().map(host_to_value).unwrap_or(NULL),
        Err(err) => Value::error(format!("plugin `{}` err: {}", package, err)),
    }
}
