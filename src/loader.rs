use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;

use crate::error::LoadError;
use crate::interpreter::environment::Environment;
use crate::interpreter::evaluator::Evaluator;
use crate::interpreter::parser;
use crate::value::Value;

/// Resolves an include path into a fully evaluated top-level environment.
/// Nothing here assumes a filesystem; any resolver with this shape works.
pub trait ScriptLoader {
    fn load(&self, path: &str, evaluator: &Evaluator) -> Result<Rc<Environment>, LoadError>;
}

/// Filesystem loader. Loaded environments are memoized per path, so every
/// include of the same script observes one environment instance and side
/// effects run once.
pub struct FileLoader {
    cache: RefCell<HashMap<String, Rc<Environment>>>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self {
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLoader for FileLoader {
    fn load(&self, path: &str, evaluator: &Evaluator) -> Result<Rc<Environment>, LoadError> {
        if let Some(env) = self.cache.borrow().get(path) {
            return Ok(env.clone());
        }

        let source = fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.to_string(),
            detail: e.to_string(),
        })?;

        let program = parser::parse(&source, path).map_err(|errors| LoadError::Parse {
            path: path.to_string(),
            errors,
        })?;

        let env = Environment::new();
        if let Value::Error(err) = evaluator.eval_program(&program, &env) {
            return Err(LoadError::Eval {
                path: path.to_string(),
                message: err.message,
                stack: err.stack,
            });
        }

        self.cache.borrow_mut().insert(path.to_string(), env.clone());
        Ok(env)
    }
}
