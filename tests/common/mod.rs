#![allow(dead_code)]

use rask::interpreter::{Environment, Evaluator};
use rask::loader::FileLoader;
use rask::Value;
use std::fs::{self, File};
use std::io::Write;
use std::rc::Rc;

/// Parse and evaluate a source buffer with a file loader attached, in a
/// fresh top-level environment.
pub fn eval_source(source: &str) -> Value {
    let evaluator = Evaluator::new().with_loader(Rc::new(FileLoader::new()));
    let env = Environment::new();
    evaluator
        .run(source, "test.rs", &env)
        .expect("program should parse")
}

pub fn assert_integer(value: &Value, expected: i64) {
    match value {
        Value::Integer(v) => assert_eq!(*v, expected),
        other => panic!("expected INTEGER {}, got {:?}", expected, other),
    }
}

pub fn assert_double_near(value: &Value, expected: f64) {
    match value {
        Value::Double(v) => assert!(
            (v - expected).abs() < 1e-6,
            "expected DOUBLE near {}, got {}",
            expected,
            v
        ),
        other => panic!("expected DOUBLE {}, got {:?}", expected, other),
    }
}

pub fn assert_boolean(value: &Value, expected: bool) {
    match value {
        Value::Boolean(v) => assert_eq!(*v, expected),
        other => panic!("expected BOOLEAN {}, got {:?}", expected, other),
    }
}

pub fn assert_string(value: &Value, expected: &str) {
    match value {
        Value::Str(v) => assert_eq!(&**v, expected),
        other => panic!("expected STRING {:?}, got {:?}", expected, other),
    }
}

pub fn assert_null(value: &Value) {
    assert!(matches!(value, Value::Null), "expected NULL, got {:?}", value);
}

pub fn assert_error(value: &Value, expected: &str) {
    match value {
        Value::Error(err) => assert_eq!(err.message, expected),
        other => panic!("expected ERROR {:?}, got {:?}", expected, other),
    }
}

/// Temporary script file, removed when dropped.
pub struct TempScript {
    path: String,
    escaped_path: String,
}

impl TempScript {
    pub fn new(name: &str, content: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("rask_test_{}.rs", name));
        let path_str = path.to_string_lossy().to_string();
        let mut file = File::create(&path)?;
        file.write_all(content.as_bytes())?;
        let escaped_path = path_str.replace('\\', "\\\\");
        Ok(Self {
            path: path_str,
            escaped_path,
        })
    }

    pub fn path(&self) -> &str {
        &self.escaped_path
    }
}

impl Drop for TempScript {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
