use std::fmt;
use std::cell::RefCell;
use std::hash::Hasher;
use std::rc::Rc;

use fnv::FnvHasher;
use indexmap::IndexMap;

use crate::ast::{Block, Ident};
use crate::interpreter::environment::Environment;
use crate::interpreter::evaluator::Evaluator;

/// Tolerance for the integer-snapping rules of `div` and `mul`.
const EPSILON: f64 = 1e-6;

pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

pub type BuiltinFunction = fn(&Evaluator, &[Value]) -> Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Double,
    Str,
    Boolean,
    Null,
    ReturnValue,
    Error,
    Function,
    Builtin,
    Array,
    Hash,
    External,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "INTEGER",
            ValueKind::Double => "DOUBLE",
            ValueKind::Str => "STRING",
            ValueKind::Boolean => "BOOLEAN",
            ValueKind::Null => "NULL",
            ValueKind::ReturnValue => "RETURN_VALUE",
            ValueKind::Error => "ERROR",
            ValueKind::Function => "FUNCTION",
            ValueKind::Builtin => "BUILTIN",
            ValueKind::Array => "ARRAY",
            ValueKind::Hash => "HASH",
            ValueKind::External => "EXTERNAL",
        };
        f.write_str(name)
    }
}

/// Key derived from a hashable value: integers by identity, booleans by
/// 0/1, strings and doubles by a 64-bit FNV digest of their display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: ValueKind,
    pub digest: u64,
}

/// Original key alongside the stored value, so hashes can be inspected and
/// marshaled with their real keys.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Str(Rc<str>),
    Boolean(bool),
    Null,
    Return(Box<Value>),
    Error(Box<RuntimeError>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Array(Rc<RefCell<Vec<Value>>>),
    Hash(Rc<RefCell<IndexMap<HashKey, HashPair>>>),
    External(Rc<Environment>),
}

/// An in-language error. Bubbles through evaluation like a return value,
/// collecting one stack frame per statement it rises through.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub stack: Vec<String>,
}

impl RuntimeError {
    pub fn push_frame(&mut self, frame: String) {
        self.stack.insert(0, frame);
    }
}

/// A function literal closed over the environment it was created in. The
/// environment lives at least as long as the function.
pub struct Function {
    pub parameters: Rc<Vec<Ident>>,
    pub body: Rc<Block>,
    pub env: Rc<Environment>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured environment may transitively contain this function;
        // printing it would never terminate.
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFunction,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "Integer({})", v),
            Value::Double(v) => write!(f, "Double({})", v),
            Value::Str(v) => write!(f, "Str({:?})", v),
            Value::Boolean(v) => write!(f, "Boolean({})", v),
            Value::Null => f.write_str("Null"),
            Value::Return(v) => write!(f, "Return({:?})", v),
            Value::Error(e) => write!(f, "Error({:?})", e),
            Value::Function(func) => write!(f, "{:?}", func),
            Value::Builtin(b) => write!(f, "{:?}", b),
            Value::Array(elements) => write!(f, "Array({:?})", elements.borrow()),
            Value::Hash(_) => f.write_str("Hash(..)"),
            Value::External(_) => f.write_str("External(..)"),
        }
    }
}

impl Value {
    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(Box::new(RuntimeError {
            message: message.into(),
            stack: Vec::new(),
        }))
    }

    pub fn from_native_bool(value: bool) -> Value {
        if value {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::Str,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
            Value::Return(_) => ValueKind::ReturnValue,
            Value::Error(_) => ValueKind::Error,
            Value::Function(_) => ValueKind::Function,
            Value::Builtin(_) => ValueKind::Builtin,
            Value::Array(_) => ValueKind::Array,
            Value::Hash(_) => ValueKind::Hash,
            Value::External(_) => ValueKind::External,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Only `NULL` and `FALSE` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Boolean(false))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }

    /// Key derivation for the hashable kinds; `None` for everything else.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(v) => Some(HashKey {
                kind: ValueKind::Integer,
                digest: *v as u64,
            }),
            Value::Boolean(v) => Some(HashKey {
                kind: ValueKind::Boolean,
                digest: u64::from(*v),
            }),
            Value::Str(v) => Some(HashKey {
                kind: ValueKind::Str,
                digest: fnv64(v.as_bytes()),
            }),
            Value::Double(v) => Some(HashKey {
                kind: ValueKind::Double,
                digest: fnv64(format!("{:.6}", v).as_bytes()),
            }),
            _ => None,
        }
    }

    // Arithmetic capability of the numeric kinds. Callers check
    // `is_numeric` on both sides first; non-numeric operands yield NULL.

    pub(crate) fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_add(*b)),
            (Value::Integer(a), Value::Double(b)) => Value::Double(*a as f64 + b),
            (Value::Double(a), Value::Integer(b)) => Value::Double(a + *b as f64),
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            _ => NULL,
        }
    }

    pub(crate) fn sub(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_sub(*b)),
            (Value::Integer(a), Value::Double(b)) => Value::Double(*a as f64 - b),
            (Value::Double(a), Value::Integer(b)) => Value::Double(a - *b as f64),
            (Value::Double(a), Value::Double(b)) => Value::Double(a - b),
            _ => NULL,
        }
    }

    /// Double times integer snaps to an integer when the product lands
    /// within 1e-6 of a round value. Integer times double does not.
    pub(crate) fn mul(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a.wrapping_mul(*b)),
            (Value::Integer(a), Value::Double(b)) => Value::Double(*a as f64 * b),
            (Value::Double(a), Value::Integer(b)) => {
                let product = a * *b as f64;
                let rounded = product.round();
                if (rounded - product).abs() < EPSILON {
                    Value::Integer(rounded as i64)
                } else {
                    Value::Double(product)
                }
            }
            (Value::Double(a), Value::Double(b)) => Value::Double(a * b),
            _ => NULL,
        }
    }

    /// Integer over integer stays an integer only when the quotient is an
    /// integer multiple within 1e-6; otherwise the division is carried out
    /// in doubles. Any double operand keeps IEEE semantics.
    pub(crate) fn div(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                if *b == 0 {
                    return Value::error("division by zero");
                }
                let int_quotient = a.wrapping_div(*b);
                let float_quotient = *a as f64 / *b as f64;
                if (int_quotient as f64 - float_quotient).abs() < EPSILON {
                    Value::Integer(int_quotient)
                } else {
                    Value::Double(float_quotient)
                }
            }
            (Value::Integer(a), Value::Double(b)) => Value::Double(*a as f64 / b),
            (Value::Double(a), Value::Integer(b)) => Value::Double(a / *b as f64),
            (Value::Double(a), Value::Double(b)) => Value::Double(a / b),
            _ => NULL,
        }
    }

    // Comparison capability, cross-kind by promoting integers to doubles.

    pub(crate) fn gt(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a > b,
            (Value::Integer(a), Value::Double(b)) => (*a as f64) > *b,
            (Value::Double(a), Value::Integer(b)) => *a > *b as f64,
            (Value::Double(a), Value::Double(b)) => a > b,
            _ => false,
        }
    }

    pub(crate) fn lt(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a < b,
            (Value::Integer(a), Value::Double(b)) => (*a as f64) < *b,
            (Value::Double(a), Value::Integer(b)) => *a < *b as f64,
            (Value::Double(a), Value::Double(b)) => a < b,
            _ => false,
        }
    }

    pub(crate) fn num_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(a), Value::Double(b)) => (*a as f64) == *b,
            (Value::Double(a), Value::Integer(b)) => *a == *b as f64,
            (Value::Double(a), Value::Double(b)) => a == b,
            _ => false,
        }
    }

    /// Identity equality: the fallback for `==`/`!=` on operands that are
    /// neither both numeric nor both strings. Canonical scalars compare by
    /// value, aggregates by pointer, different kinds are never equal.
    pub(crate) fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::External(a), Value::External(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Return(a), Value::Return(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::External(a), Value::External(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{:.6}", v),
            Value::Str(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Null => f.write_str("null"),
            Value::Return(inner) => write!(f, "{}", inner),
            Value::Error(e) => write!(f, "ERROR: {}", e.message),
            Value::Function(func) => {
                f.write_str("fn(")?;
                for (i, param) in func.parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") {}", func.body)
            }
            Value::Builtin(_) => f.write_str("builtin function"),
            Value::Array(elements) => {
                let rendered: Vec<String> =
                    elements.borrow().iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Hash(pairs) => {
                let rendered: Vec<String> = pairs
                    .borrow()
                    .values()
                    .map(|pair| format!("{}:{}", pair.key, pair.value))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::External(_) => f.write_str("external environment"),
        }
    }
}

fn fnv64(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    hasher.finish()
}
