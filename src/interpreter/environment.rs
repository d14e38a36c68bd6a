use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// A lexical scope: name bindings plus an optional link to the enclosing
/// scope, and a side table of aliased external environments. The side table
/// is shared by reference across the whole chain so an include made inside
/// a nested block stays visible to the enclosing scopes.
pub struct Environment {
    store: RefCell<HashMap<String, Value>>,
    externals: Rc<RefCell<HashMap<String, Rc<Environment>>>>,
    outer: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            store: RefCell::new(HashMap::new()),
            externals: Rc::new(RefCell::new(HashMap::new())),
            outer: None,
        })
    }

    pub fn new_enclosed(outer: &Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            store: RefCell::new(HashMap::new()),
            externals: outer.externals.clone(),
            outer: Some(outer.clone()),
        })
    }

    /// Resolve a name, walking outward through the chain on miss.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.store.borrow().get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.get(name))
    }

    /// Insert or overwrite in the current scope.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.store.borrow_mut().insert(name.into(), value);
    }

    /// Mutate the nearest enclosing binding of `name`. Returns the stored
    /// value, or `None` when the name is bound nowhere in the chain.
    pub fn update(&self, name: &str, value: Value) -> Option<Value> {
        if self.store.borrow().contains_key(name) {
            self.store.borrow_mut().insert(name.to_string(), value.clone());
            return Some(value);
        }
        self.outer.as_ref().and_then(|outer| outer.update(name, value))
    }

    pub fn add_external(&self, alias: impl Into<String>, env: Rc<Environment>) {
        self.externals.borrow_mut().insert(alias.into(), env);
    }

    pub fn external(&self, alias: &str) -> Option<Rc<Environment>> {
        self.externals.borrow().get(alias).cloned()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bindings may refer back to this environment through closures;
        // print names only.
        let names: Vec<String> = self.store.borrow().keys().cloned().collect();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let env = Environment::new();
        env.set("x", Value::Integer(42));
        assert_eq!(env.get("x"), Some(Value::Integer(42)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn get_walks_the_chain() {
        let outer = Environment::new();
        outer.set("x", Value::Integer(1));

        let inner = Environment::new_enclosed(&outer);
        assert_eq!(inner.get("x"), Some(Value::Integer(1)));

        // A local binding shadows without touching the outer scope.
        inner.set("x", Value::Integer(2));
        assert_eq!(inner.get("x"), Some(Value::Integer(2)));
        assert_eq!(outer.get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn update_mutates_nearest_binding() {
        let outer = Environment::new();
        outer.set("x", Value::Integer(1));

        let inner = Environment::new_enclosed(&outer);
        assert!(inner.update("x", Value::Integer(5)).is_some());
        assert_eq!(outer.get("x"), Some(Value::Integer(5)));

        assert!(inner.update("missing", Value::Null).is_none());
    }

    #[test]
    fn externals_are_shared_down_the_chain() {
        let outer = Environment::new();
        let inner = Environment::new_enclosed(&outer);

        let module = Environment::new();
        module.set("answer", Value::Integer(100));

        // Registered through the child, visible from the parent.
        inner.add_external("mod", module);
        let seen = outer.external("mod").expect("alias should be shared");
        assert_eq!(seen.get("answer"), Some(Value::Integer(100)));
    }
}
