use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{
    Block, Declaration, Expr, ExprKind, InfixOp, LetBinding, PrefixOp, Program, Stmt, StmtKind,
};
use crate::error::LoadError;
use crate::extensions::Registry;
use crate::loader::ScriptLoader;
use crate::value::{Function, HashPair, Value, ValueKind, NULL, TRUE};

use super::builtins;
use super::environment::Environment;
use super::parser;

/// Tree-walking evaluator. Carries the injected script loader and plugin
/// registry; all evaluation state lives in environments.
#[derive(Default)]
pub struct Evaluator {
    loader: Option<Rc<dyn ScriptLoader>>,
    registry: Option<Rc<Registry>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            loader: None,
            registry: None,
        }
    }

    pub fn with_loader(mut self, loader: Rc<dyn ScriptLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_registry(mut self, registry: Rc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_deref()
    }

    /// Parse and evaluate a source buffer in the given environment. `Err`
    /// carries parser errors; runtime failures come back as an error value.
    pub fn run(&self, source: &str, file: &str, env: &Rc<Environment>) -> Result<Value, Vec<String>> {
        let program = parser::parse(source, file)?;
        Ok(self.eval_program(&program, env))
    }

    /// Evaluate top-level statements. A top-level `return` unwraps; an
    /// error gains the failing statement's stack frame and surfaces.
    pub fn eval_program(&self, program: &Program, env: &Rc<Environment>) -> Value {
        let mut result = NULL;
        for stmt in &program.statements {
            match self.eval_stmt(stmt, env) {
                Value::Return(inner) => return *inner,
                Value::Error(mut err) => {
                    err.push_frame(stmt.stack_line());
                    return Value::Error(err);
                }
                other => result = other,
            }
        }
        result
    }

    /// Like `eval_program` but keeps `Return` wrapped so it propagates to
    /// the nearest function boundary.
    pub(crate) fn eval_block(&self, block: &Block, env: &Rc<Environment>) -> Value {
        let mut result = NULL;
        for stmt in &block.statements {
            match self.eval_stmt(stmt, env) {
                ret @ Value::Return(_) => return ret,
                Value::Error(mut err) => {
                    err.push_frame(stmt.stack_line());
                    return Value::Error(err);
                }
                other => result = other,
            }
        }
        result
    }

    fn eval_stmt(&self, stmt: &Stmt, env: &Rc<Environment>) -> Value {
        match &stmt.kind {
            StmtKind::Let(binding) => self.eval_let(binding, env),
            StmtKind::Return(None) => Value::Return(Box::new(NULL)),
            StmtKind::Return(Some(expr)) => {
                let result = self.eval_expr(expr, env);
                if result.is_error() {
                    return result;
                }
                Value::Return(Box::new(result))
            }
            StmtKind::Expr(expr) => self.eval_expr(expr, env),
            StmtKind::Declaration(decl) => self.eval_declaration(decl, env),
        }
    }

    fn eval_let(&self, binding: &LetBinding, env: &Rc<Environment>) -> Value {
        let value = self.eval_expr(&binding.value, env);
        if value.is_error() {
            return value;
        }
        env.set(binding.name.name.to_string(), value);
        NULL
    }

    /// Resolve an include through the loader, register the environment
    /// under its alias, and yield it as a value for expression-position use.
    fn eval_declaration(&self, decl: &Declaration, env: &Rc<Environment>) -> Value {
        match decl {
            Declaration::Include { alias, path } => {
                let loaded = match &self.loader {
                    Some(loader) => loader.load(path.as_ref(), self),
                    None => Err(LoadError::NotConfigured),
                };
                match loaded {
                    Ok(external) => {
                        env.add_external(alias.name.to_string(), external.clone());
                        Value::External(external)
                    }
                    Err(err) => {
                        Value::error(format!("unable preload external script:\n{}", err))
                    }
                }
            }
        }
    }

    fn eval_expr(&self, expr: &Expr, env: &Rc<Environment>) -> Value {
        match &expr.kind {
            ExprKind::Identifier(name) => self.eval_identifier(name, env),
            ExprKind::IntegerLit(value) => Value::Integer(*value),
            ExprKind::DoubleLit(value) => Value::Double(*value),
            ExprKind::StringLit(value) => Value::Str(value.clone()),
            ExprKind::BooleanLit(value) => Value::from_native_bool(*value),
            ExprKind::ArrayLit(elements) => match self.eval_expressions(elements, env) {
                Ok(values) => Value::Array(Rc::new(RefCell::new(values))),
                Err(err) => err,
            },
            ExprKind::HashLit(pairs) => self.eval_hash_literal(pairs, env),
            ExprKind::Prefix { op, right } => {
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_prefix(*op, right)
            }
            ExprKind::Infix { op, left, right } => self.eval_infix(*op, left, right, env),
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => self.eval_if(condition, consequence, alternative.as_ref(), env),
            ExprKind::For {
                initial,
                condition,
                complete,
                body,
            } => self.eval_for(
                initial.as_deref(),
                condition.as_deref(),
                complete.as_deref(),
                body,
                env,
            ),
            ExprKind::FunctionLit { parameters, body } => Value::Function(Rc::new(Function {
                parameters: parameters.clone(),
                body: body.clone(),
                env: env.clone(),
            })),
            ExprKind::Call {
                function,
                arguments,
            } => {
                let callee = self.eval_expr(function, env);
                if callee.is_error() {
                    return callee;
                }
                let args = match self.eval_expressions(arguments, env) {
                    Ok(args) => args,
                    Err(err) => return err,
                };
                self.apply_function(callee, args)
            }
            ExprKind::Index { left, index } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                eval_index(&left, &index)
            }
            ExprKind::Let(binding) => self.eval_let(binding, env),
        }
    }

    /// Lookup order: local chain, external alias table, builtin table.
    fn eval_identifier(&self, name: &str, env: &Rc<Environment>) -> Value {
        if let Some(value) = env.get(name) {
            return value;
        }
        if let Some(external) = env.external(name) {
            return Value::External(external);
        }
        if let Some(builtin) = builtins::lookup(name) {
            return builtin;
        }
        Value::error(format!("identifier not found: {}", name))
    }

    fn eval_expressions(
        &self,
        exprs: &[Expr],
        env: &Rc<Environment>,
    ) -> Result<Vec<Value>, Value> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let value = self.eval_expr(expr, env);
            if value.is_error() {
                return Err(value);
            }
            values.push(value);
        }
        Ok(values)
    }

    fn eval_hash_literal(&self, pairs: &[(Expr, Expr)], env: &Rc<Environment>) -> Value {
        let mut map = IndexMap::new();
        for (key_expr, value_expr) in pairs {
            let key = self.eval_expr(key_expr, env);
            if key.is_error() {
                return key;
            }
            let hash_key = match key.hash_key() {
                Some(hash_key) => hash_key,
                None => return Value::error(format!("unusable as hash key: {}", key.kind())),
            };

            let value = self.eval_expr(value_expr, env);
            if value.is_error() {
                return value;
            }
            map.insert(hash_key, HashPair { key, value });
        }
        Value::Hash(Rc::new(RefCell::new(map)))
    }

    fn eval_infix(&self, op: InfixOp, left: &Expr, right: &Expr, env: &Rc<Environment>) -> Value {
        match op {
            InfixOp::Dot => {
                let target = self.eval_expr(left, env);
                if target.is_error() {
                    return target;
                }
                self.eval_dotted(target, right, env)
            }
            InfixOp::Assign => self.eval_assign(left, right, env),
            _ => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                eval_native_infix(op, left, right)
            }
        }
    }

    /// Dotted access into an aliased environment. The member resolves in
    /// the external environment; call arguments and index expressions
    /// evaluate in the caller's environment.
    fn eval_dotted(&self, target: Value, right: &Expr, env: &Rc<Environment>) -> Value {
        let external = match target {
            Value::External(external) => external,
            other => {
                return Value::error(format!("unsupported reference call on :{}", other.kind()))
            }
        };

        match &right.kind {
            ExprKind::Identifier(name) => self.eval_identifier(name, &external),
            ExprKind::Call {
                function,
                arguments,
            } => {
                let callee = self.eval_expr(function, &external);
                if callee.is_error() {
                    return callee;
                }
                let args = match self.eval_expressions(arguments, env) {
                    Ok(args) => args,
                    Err(err) => return err,
                };
                self.apply_function(callee, args)
            }
            ExprKind::Index { left, index } => {
                let target = self.eval_expr(left, &external);
                if target.is_error() {
                    return target;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                eval_index(&target, &index)
            }
            _ => Value::error(format!("unsupported reference call {}", right.token.literal)),
        }
    }

    fn eval_assign(&self, left: &Expr, right: &Expr, env: &Rc<Environment>) -> Value {
        let value = self.eval_expr(right, env);
        if value.is_error() {
            return value;
        }

        match &left.kind {
            ExprKind::Identifier(name) => match env.update(name, value) {
                Some(stored) => stored,
                None => Value::error(format!("identifier not defined: {}", name)),
            },
            ExprKind::Index {
                left: target,
                index,
            } => {
                let target = self.eval_expr(target, env);
                if target.is_error() {
                    return target;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                eval_assign_index(&target, &index, value)
            }
            // Cross-package assignment parses but is deliberately rejected.
            ExprKind::Infix { .. } => Value::error(format!(
                "unsupported multiple/inner/crosspackage assignments: {}",
                right.token.literal
            )),
            _ => Value::error(format!(
                "unsupported assignment type receiver: {}",
                right.token.literal
            )),
        }
    }

    /// Condition and taken branch share one fresh enclosed scope.
    fn eval_if(
        &self,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
        env: &Rc<Environment>,
    ) -> Value {
        let scope = Environment::new_enclosed(env);
        let condition = self.eval_expr(condition, &scope);
        if condition.is_error() {
            return condition;
        }

        if condition.is_truthy() {
            self.eval_block(consequence, &scope)
        } else if let Some(alternative) = alternative {
            self.eval_block(alternative, &scope)
        } else {
            NULL
        }
    }

    /// Yields the last body value once the condition turns falsy. `return`
    /// and errors bubble out; there is no break or continue.
    fn eval_for(
        &self,
        initial: Option<&Expr>,
        condition: Option<&Expr>,
        complete: Option<&Expr>,
        body: &Block,
        env: &Rc<Environment>,
    ) -> Value {
        let scope = Environment::new_enclosed(env);

        if let Some(initial) = initial {
            let value = self.eval_expr(initial, &scope);
            if value.is_error() {
                return value;
            }
        }

        let mut last = NULL;
        loop {
            if let Some(condition) = condition {
                let cond = self.eval_expr(condition, &scope);
                if cond.is_error() {
                    return cond;
                }
                if !cond.is_truthy() {
                    return last;
                }
            }

            last = self.eval_block(body, &scope);
            if matches!(last, Value::Return(_) | Value::Error(_)) {
                return last;
            }

            if let Some(complete) = complete {
                let step = self.eval_expr(complete, &scope);
                if step.is_error() {
                    return step;
                }
            }
        }
    }

    pub(crate) fn apply_function(&self, callee: Value, args: Vec<Value>) -> Value {
        match callee {
            Value::Function(function) => {
                if args.len() != function.parameters.len() {
                    return Value::error(format!(
                        "number of function parameters mismatch: expected={}, got={}",
                        function.parameters.len(),
                        args.len()
                    ));
                }
                let scope = Self::extend_function_env(&function, args);
                unwrap_return(self.eval_block(&function.body, &scope))
            }
            Value::Builtin(builtin) => (builtin.func)(self, &args),
            other => Value::error(format!("not a function: {}", other.kind())),
        }
    }

    /// Fresh scope enclosing the function's captured environment, with the
    /// parameters bound positionally.
    pub(crate) fn extend_function_env(function: &Function, args: Vec<Value>) -> Rc<Environment> {
        let scope = Environment::new_enclosed(&function.env);
        for (param, arg) in function.parameters.iter().zip(args) {
            scope.set(param.name.to_string(), arg);
        }
        scope
    }
}

pub(crate) fn unwrap_return(value: Value) -> Value {
    match value {
        Value::Return(inner) => *inner,
        other => other,
    }
}

fn eval_prefix(op: PrefixOp, right: Value) -> Value {
    match op {
        PrefixOp::Bang => match right {
            Value::Boolean(value) => Value::from_native_bool(!value),
            Value::Null => TRUE,
            _ => Value::from_native_bool(false),
        },
        PrefixOp::Minus => match right {
            Value::Integer(value) => Value::Integer(value.wrapping_neg()),
            Value::Double(value) => Value::Double(-value),
            other => Value::error(format!("unknown operator: -{}", other.kind())),
        },
    }
}

fn eval_native_infix(op: InfixOp, left: Value, right: Value) -> Value {
    if left.is_numeric() && right.is_numeric() {
        return eval_numeric_infix(op, &left, &right);
    }
    if let (Value::Str(l), Value::Str(r)) = (&left, &right) {
        return eval_string_infix(op, l, r);
    }
    match op {
        InfixOp::Eq => Value::from_native_bool(left.same_identity(&right)),
        InfixOp::NotEq => Value::from_native_bool(!left.same_identity(&right)),
        _ if left.kind() != right.kind() => Value::error(format!(
            "type mismatch: {} {} {}",
            left.kind(),
            op,
            right.kind()
        )),
        _ => Value::error(format!(
            "unknown operator: {} {} {}",
            left.kind(),
            op,
            right.kind()
        )),
    }
}

fn eval_numeric_infix(op: InfixOp, left: &Value, right: &Value) -> Value {
    match op {
        InfixOp::Plus => left.add(right),
        InfixOp::Minus => left.sub(right),
        InfixOp::Slash => left.div(right),
        InfixOp::Asterisk => left.mul(right),
        InfixOp::Gt => Value::from_native_bool(left.gt(right)),
        InfixOp::Lt => Value::from_native_bool(left.lt(right)),
        InfixOp::Eq => Value::from_native_bool(left.num_eq(right)),
        InfixOp::NotEq => Value::from_native_bool(!left.num_eq(right)),
        _ => Value::error(format!(
            "unknown operator: {} {} {}",
            left.kind(),
            op,
            right.kind()
        )),
    }
}

fn eval_string_infix(op: InfixOp, left: &str, right: &str) -> Value {
    match op {
        InfixOp::Plus => Value::Str(format!("{}{}", left, right).into()),
        InfixOp::Eq => Value::from_native_bool(left == right),
        InfixOp::NotEq => Value::from_native_bool(left != right),
        _ => Value::error(format!(
            "unknown operator: {} {} {}",
            ValueKind::Str,
            op,
            ValueKind::Str
        )),
    }
}

fn eval_index(left: &Value, index: &Value) -> Value {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            let elements = elements.borrow();
            if *i < 0 || *i as usize >= elements.len() {
                NULL
            } else {
                elements[*i as usize].clone()
            }
        }
        (Value::Hash(pairs), index) => match index.hash_key() {
            Some(key) => pairs
                .borrow()
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(NULL),
            None => Value::error(format!("unusable as a hash key: {}", index.kind())),
        },
        (other, _) => Value::error(format!("index operator not supported for: {}", other.kind())),
    }
}

/// Indexed writes are stricter than reads: an out-of-range array write is
/// an error, a hash write inserts.
fn eval_assign_index(target: &Value, index: &Value, value: Value) -> Value {
    match (target, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            let mut elements = elements.borrow_mut();
            let len = elements.len() as i64;
            if *i < 0 || *i >= len {
                return Value::error(format!("index outbound: len={}, ind={}", len, i));
            }
            elements[*i as usize] = value.clone();
            value
        }
        (Value::Hash(pairs), index) => match index.hash_key() {
            Some(key) => {
                pairs.borrow_mut().insert(
                    key,
                    HashPair {
                        key: index.clone(),
                        value: value.clone(),
                    },
                );
                value
            }
            None => Value::error(format!("unusable as a hash key: {}", index.kind())),
        },
        (other, _) => Value::error(format!("index operator not supported for: {}", other.kind())),
    }
}
