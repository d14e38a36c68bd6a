use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::extensions::HostValue;
use crate::value::{HashPair, Value, NULL};

/// Marshal a host value into a script value. Signed and unsigned integer
/// widths both land in `Integer` (unsigned reinterpreted as 64-bit signed);
/// sequences and mappings recurse.
pub fn host_to_value(host: &HostValue) -> Value {
    match host {
        HostValue::Null => NULL,
        HostValue::Bool(b) => Value::from_native_bool(*b),
        HostValue::Number(number) => {
            if let Some(signed) = number.as_i64() {
                Value::Integer(signed)
            } else if let Some(unsigned) = number.as_u64() {
                Value::Integer(unsigned as i64)
            } else {
                Value::Double(number.as_f64().unwrap_or(0.0))
            }
        }
        HostValue::String(s) => Value::Str(Rc::from(s.as_str())),
        HostValue::Array(items) => {
            let elements: Vec<Value> = items.iter().map(host_to_value).collect();
            Value::Array(Rc::new(RefCell::new(elements)))
        }
        HostValue::Object(map) => {
            let mut pairs = IndexMap::new();
            for (name, item) in map {
                let key = Value::Str(Rc::from(name.as_str()));
                if let Some(hash_key) = key.hash_key() {
                    pairs.insert(
                        hash_key,
                        HashPair {
                            key,
                            value: host_to_value(item),
                        },
                    );
                }
            }
            Value::Hash(Rc::new(RefCell::new(pairs)))
        }
    }
}

/// Marshal a script value out to the host. Hash keys are rendered by their
/// display form; kinds the host cannot represent become null.
pub fn value_to_host(value: &Value) -> HostValue {
    match value {
        Value::Integer(v) => HostValue::from(*v),
        Value::Double(v) => serde_json::Number::from_f64(*v)
            .map(HostValue::Number)
            .unwrap_or(HostValue::Null),
        Value::Str(v) => HostValue::String(v.to_string()),
        Value::Boolean(v) => HostValue::Bool(*v),
        Value::Array(elements) => {
            HostValue::Array(elements.borrow().iter().map(value_to_host).collect())
        }
        Value::Hash(pairs) => {
            let mut map = serde_json::Map::new();
            for pair in pairs.borrow().values() {
                map.insert(pair.key.to_string(), value_to_host(&pair.value));
            }
            HostValue::Object(map)
        }
        _ => HostValue::Null,
    }
}
