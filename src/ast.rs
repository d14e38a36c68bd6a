use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// Root of a parsed script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub token: Token,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let(LetBinding),
    Return(Option<Expr>),
    Expr(Expr),
    Declaration(Declaration),
}

/// One `let name = value` binding. Shared between statement position and
/// expression position (the initial clause of a `for` loop).
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Include { alias: Ident, path: Rc<str> },
}

/// Brace-delimited statement list; the body form of functions, branches and
/// loops. Blocks do not open a scope of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub token: Token,
    pub name: Rc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub token: Token,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(Rc<str>),
    IntegerLit(i64),
    DoubleLit(f64),
    StringLit(Rc<str>),
    BooleanLit(bool),
    ArrayLit(Vec<Expr>),
    HashLit(Vec<(Expr, Expr)>),
    Prefix {
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    For {
        initial: Option<Box<Expr>>,
        condition: Option<Box<Expr>>,
        complete: Option<Box<Expr>>,
        body: Block,
    },
    FunctionLit {
        parameters: Rc<Vec<Ident>>,
        body: Rc<Block>,
    },
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
    Let(Box<LetBinding>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Lt,
    Gt,
    Eq,
    NotEq,
    Assign,
    Dot,
}

impl Stmt {
    /// Trace frame for runtime error stacks.
    pub fn stack_line(&self) -> String {
        format!("file: {}; line: {}", self.token.file, self.token.line)
    }
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Bang => f.write_str("!"),
            PrefixOp::Minus => f.write_str("-"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Asterisk => "*",
            InfixOp::Slash => "/",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Assign => "=",
            InfixOp::Dot => ".",
        };
        f.write_str(op)
    }
}

// Display renders valid source: re-parsing the output of a program with no
// parser errors yields a semantically equivalent tree.

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Let(binding) => write!(f, "{};", binding),
            StmtKind::Return(None) => f.write_str("return;"),
            StmtKind::Return(Some(value)) => write!(f, "return {};", value),
            StmtKind::Expr(expr) => write!(f, "{};", expr),
            StmtKind::Declaration(decl) => write!(f, "{}", decl),
        }
    }
}

impl fmt::Display for LetBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "let {} = {}", self.name, self.value)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Include { alias, path } => write!(f, "# {} \"{}\";", alias, path),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => f.write_str(name),
            ExprKind::IntegerLit(_) | ExprKind::DoubleLit(_) => f.write_str(&self.token.literal),
            ExprKind::StringLit(value) => write!(f, "\"{}\"", escape_string(value)),
            ExprKind::BooleanLit(value) => write!(f, "{}", value),
            ExprKind::ArrayLit(elements) => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            ExprKind::HashLit(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            ExprKind::Prefix { op, right } => write!(f, "({}{})", op, right),
            ExprKind::Infix { op, left, right } => match op {
                InfixOp::Dot => write!(f, "({}.{})", left, right),
                _ => write!(f, "({} {} {})", left, op, right),
            },
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if ({}) {}", condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, " else {}", alt)?;
                }
                Ok(())
            }
            ExprKind::For {
                initial,
                condition,
                complete,
                body,
            } => {
                let clauses: Vec<String> = [initial, condition, complete]
                    .iter()
                    .filter_map(|clause| clause.as_ref().map(|e| e.to_string()))
                    .collect();
                write!(f, "for ({}) {}", clauses.join("; "), body)
            }
            ExprKind::FunctionLit { parameters, body } => {
                f.write_str("fn(")?;
                for (i, param) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") {}", body)
            }
            ExprKind::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            ExprKind::Index { left, index } => write!(f, "({}[{}])", left, index),
            ExprKind::Let(binding) => write!(f, "{}", binding),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn escape_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}
