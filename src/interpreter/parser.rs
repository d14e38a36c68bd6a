use std::rc::Rc;

use crate::ast::{
    Block, Declaration, Expr, ExprKind, Ident, InfixOp, LetBinding, PrefixOp, Program, Stmt,
    StmtKind,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Binding powers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assign,      // =
    Equal,       // == !=
    LessGreater, // < >
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Dot,         // pkg.member
    Call,        // fn(args)
    Index,       // array[index]
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Assign => Precedence::Assign,
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equal,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::Dot => Precedence::Dot,
        TokenKind::LParen => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

fn infix_op(kind: TokenKind) -> Option<InfixOp> {
    match kind {
        TokenKind::Plus => Some(InfixOp::Plus),
        TokenKind::Minus => Some(InfixOp::Minus),
        TokenKind::Asterisk => Some(InfixOp::Asterisk),
        TokenKind::Slash => Some(InfixOp::Slash),
        TokenKind::Lt => Some(InfixOp::Lt),
        TokenKind::Gt => Some(InfixOp::Gt),
        TokenKind::Eq => Some(InfixOp::Eq),
        TokenKind::NotEq => Some(InfixOp::NotEq),
        TokenKind::Assign => Some(InfixOp::Assign),
        TokenKind::Dot => Some(InfixOp::Dot),
        _ => None,
    }
}

/// Pratt parser over the token stream. Parse errors are collected while the
/// parser keeps making progress; callers reject the program when the error
/// list is non-empty.
pub struct Parser {
    lexer: Lexer,
    curr: Token,
    peek: Token,
    errors: Vec<String>,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let curr = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            curr,
            peek,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.curr_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }
        Program { statements }
    }

    fn next_token(&mut self) {
        self.curr = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.curr.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Hash => self.parse_include_declaration(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let token = self.curr.clone();
        let binding = self.parse_let_binding()?;
        Some(Stmt {
            token,
            kind: StmtKind::Let(binding),
        })
    }

    /// `let <ident> = <expr> [;]`, shared by statement position and the
    /// expression position used in a for loop's initial clause.
    fn parse_let_binding(&mut self) -> Option<LetBinding> {
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = Ident {
            token: self.curr.clone(),
            name: Rc::from(self.curr.literal.as_str()),
        };

        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }

        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(LetBinding { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let token = self.curr.clone();
        self.next_token();

        if self.curr_is(TokenKind::Semicolon) {
            return Some(Stmt {
                token,
                kind: StmtKind::Return(None),
            });
        }

        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt {
            token,
            kind: StmtKind::Return(Some(value)),
        })
    }

    /// `# <alias> "<path>" [;]`
    fn parse_include_declaration(&mut self) -> Option<Stmt> {
        let token = self.curr.clone();

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let alias = Ident {
            token: self.curr.clone(),
            name: Rc::from(self.curr.literal.as_str()),
        };

        if !self.expect_peek(TokenKind::Str) {
            return None;
        }
        let path: Rc<str> = Rc::from(self.curr.literal.as_str());

        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt {
            token,
            kind: StmtKind::Declaration(Declaration::Include { alias, path }),
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let token = self.curr.clone();
        let expr = self.parse_expression(Precedence::Lowest)?;

        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt {
            token,
            kind: StmtKind::Expr(expr),
        })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            left = match self.peek.kind {
                TokenKind::LParen => {
                    self.next_token();
                    self.parse_call_expression(left)?
                }
                TokenKind::LBracket => {
                    self.next_token();
                    self.parse_index_expression(left)?
                }
                kind if infix_op(kind).is_some() => {
                    self.next_token();
                    self.parse_infix_expression(left)?
                }
                _ => return Some(left),
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.curr.kind {
            TokenKind::Ident => Some(Expr {
                token: self.curr.clone(),
                kind: ExprKind::Identifier(Rc::from(self.curr.literal.as_str())),
            }),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::Double => self.parse_double_literal(),
            TokenKind::Str => Some(Expr {
                token: self.curr.clone(),
                kind: ExprKind::StringLit(Rc::from(self.curr.literal.as_str())),
            }),
            TokenKind::True | TokenKind::False => Some(Expr {
                token: self.curr.clone(),
                kind: ExprKind::BooleanLit(self.curr_is(TokenKind::True)),
            }),
            TokenKind::Bang | TokenKind::Minus => self.parse_prefix_expression(),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::For => self.parse_for_expression(),
            TokenKind::Let => self.parse_let_expression(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            kind => {
                self.errors.push(format!(
                    "no prefix parse functions found for {} on line {}",
                    kind, self.curr.line
                ));
                None
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        let token = self.curr.clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Some(Expr {
                token,
                kind: ExprKind::IntegerLit(value),
            }),
            Err(_) => {
                self.errors.push(format!(
                    "expected integer literal on line {} instead of {}",
                    token.line, token.literal
                ));
                None
            }
        }
    }

    fn parse_double_literal(&mut self) -> Option<Expr> {
        let token = self.curr.clone();
        match token.literal.parse::<f64>() {
            Ok(value) => Some(Expr {
                token,
                kind: ExprKind::DoubleLit(value),
            }),
            Err(_) => {
                self.errors.push(format!(
                    "expected double literal on line {} instead of {}",
                    token.line, token.literal
                ));
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let token = self.curr.clone();
        let op = match token.kind {
            TokenKind::Bang => PrefixOp::Bang,
            _ => PrefixOp::Minus,
        };

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expr {
            token,
            kind: ExprKind::Prefix {
                op,
                right: Box::new(right),
            },
        })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.curr.clone();
        let op = infix_op(token.kind)?;
        let precedence = self.curr_precedence();

        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expr {
            token,
            kind: ExprKind::Infix {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        let token = self.curr.clone();

        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block();

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block())
        } else {
            None
        };

        Some(Expr {
            token,
            kind: ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
        })
    }

    /// `for (a; b; c) { body }` where zero to three clauses select the
    /// infinite / condition / condition+complete / initial+condition+complete
    /// forms.
    fn parse_for_expression(&mut self) -> Option<Expr> {
        let token = self.curr.clone();

        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let mut clauses = self.parse_for_clauses()?;

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block();

        let (initial, condition, complete) = match clauses.len() {
            0 => (None, None, None),
            1 => (None, Some(clauses.remove(0)), None),
            2 => (None, Some(clauses.remove(0)), Some(clauses.remove(0))),
            _ => (
                Some(clauses.remove(0)),
                Some(clauses.remove(0)),
                Some(clauses.remove(0)),
            ),
        };

        Some(Expr {
            token,
            kind: ExprKind::For {
                initial: initial.map(Box::new),
                condition: condition.map(Box::new),
                complete: complete.map(Box::new),
                body,
            },
        })
    }

    fn parse_for_clauses(&mut self) -> Option<Vec<Expr>> {
        let mut clauses = Vec::new();
        for _ in 0..3 {
            if self.peek_is(TokenKind::RParen) {
                return Some(clauses);
            }
            self.next_token();
            clauses.push(self.parse_for_clause()?);
        }
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(clauses)
    }

    fn parse_for_clause(&mut self) -> Option<Expr> {
        let clause = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(clause)
    }

    fn parse_let_expression(&mut self) -> Option<Expr> {
        let token = self.curr.clone();
        let binding = self.parse_let_binding()?;
        Some(Expr {
            token,
            kind: ExprKind::Let(Box::new(binding)),
        })
    }

    fn parse_block(&mut self) -> Block {
        let token = self.curr.clone();
        let mut statements = Vec::new();

        self.next_token();
        while !self.curr_is(TokenKind::RBrace) && !self.curr_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }

        Block { token, statements }
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        let token = self.curr.clone();

        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block();

        Some(Expr {
            token,
            kind: ExprKind::FunctionLit {
                parameters: Rc::new(parameters),
                body: Rc::new(body),
            },
        })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Ident>> {
        let mut parameters = Vec::new();
        self.next_token();

        if self.curr_is(TokenKind::RParen) {
            return Some(parameters);
        }

        parameters.push(Ident {
            token: self.curr.clone(),
            name: Rc::from(self.curr.literal.as_str()),
        });

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            parameters.push(Ident {
                token: self.curr.clone(),
                name: Rc::from(self.curr.literal.as_str()),
            });
        }

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(parameters)
    }

    fn parse_call_expression(&mut self, function: Expr) -> Option<Expr> {
        let token = self.curr.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr {
            token,
            kind: ExprKind::Call {
                function: Box::new(function),
                arguments,
            },
        })
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.curr.clone();
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expr {
            token,
            kind: ExprKind::Index {
                left: Box::new(left),
                index: Box::new(index),
            },
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let token = self.curr.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expr {
            token,
            kind: ExprKind::ArrayLit(elements),
        })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut expressions = Vec::new();
        self.next_token();
        if self.curr_is(end) {
            return Some(expressions);
        }

        expressions.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            expressions.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(expressions)
    }

    /// `{ key: value, ... }`, allowing `{}` and a trailing comma after the
    /// last pair.
    fn parse_hash_literal(&mut self) -> Option<Expr> {
        let token = self.curr.clone();
        let mut pairs = Vec::new();

        while !self.peek_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }

        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expr {
            token,
            kind: ExprKind::HashLit(pairs),
        })
    }

    fn curr_is(&self, kind: TokenKind) -> bool {
        self.curr.kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.next_token();
            true
        } else {
            self.errors.push(format!(
                "expected token {} on line {}; instead got {}",
                kind, self.peek.line, self.peek.kind
            ));
            false
        }
    }

    fn curr_precedence(&self) -> Precedence {
        precedence_of(self.curr.kind)
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek.kind)
    }
}

/// Parse a full source buffer, rejecting the program when any parse error
/// was recorded.
pub fn parse(source: &str, file: &str) -> Result<Program, Vec<String>> {
    let mut parser = Parser::new(Lexer::new(source, file));
    let program = parser.parse_program();
    if parser.errors().is_empty() {
        Ok(program)
    } else {
        Err(parser.into_errors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source, "test.rs").expect("program should parse")
    }

    #[test]
    fn operator_precedence_display() {
        let cases = [
            ("-a * b", "((-a) * b);"),
            ("!-a", "(!(-a));"),
            ("a + b + c", "((a + b) + c);"),
            ("a + b * c", "(a + (b * c));"),
            ("a * b / c", "((a * b) / c);"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)));"),
            ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4));"),
            ("(5 + 5) * 2", "((5 + 5) * 2);"),
            ("-(5 + 5)", "(-(5 + 5));"),
            ("a + add(b * c) + d", "((a + add((b * c))) + d);"),
            ("a * [1, 2, 3][1]", "(a * ([1, 2, 3][1]));"),
            ("pkg.run(1 + 2)", "(pkg.run((1 + 2)));"),
            ("x = y + 1", "(x = (y + 1));"),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_ok(input).to_string(), expected, "input: {}", input);
        }
    }

    #[test]
    fn let_statements() {
        let program = parse_ok("let x = 5; let y = true; let name = \"rask\";");
        assert_eq!(program.statements.len(), 3);
        assert_eq!(program.to_string(), "let x = 5;let y = true;let name = \"rask\";");
    }

    #[test]
    fn return_statements() {
        let program = parse_ok("return; return 10; return 2 * 3;");
        assert_eq!(program.statements.len(), 3);
        assert_eq!(program.to_string(), "return;return 10;return (2 * 3);");
    }

    #[test]
    fn include_declaration() {
        let program = parse_ok("# sys \"scripts/sys.rs\";");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StmtKind::Declaration(Declaration::Include { alias, path }) => {
                assert_eq!(&*alias.name, "sys");
                assert_eq!(&**path, "scripts/sys.rs");
            }
            other => panic!("expected include declaration, got {:?}", other),
        }
    }

    #[test]
    fn if_else_expression() {
        let program = parse_ok("if (x < y) { x } else { y }");
        assert_eq!(program.to_string(), "if ((x < y)) { x; } else { y; };");
    }

    #[test]
    fn for_clause_counts() {
        let cases = [
            ("for () { 1; }", (false, false, false)),
            ("for (i < 10) { 1; }", (false, true, false)),
            ("for (i < 10; i = i + 1) { 1; }", (false, true, true)),
            ("for (let i = 0; i < 10; i = i + 1) { 1; }", (true, true, true)),
        ];
        for (input, (has_initial, has_condition, has_complete)) in cases {
            let program = parse_ok(input);
            match &program.statements[0].kind {
                StmtKind::Expr(Expr {
                    kind:
                        ExprKind::For {
                            initial,
                            condition,
                            complete,
                            ..
                        },
                    ..
                }) => {
                    assert_eq!(initial.is_some(), has_initial, "input: {}", input);
                    assert_eq!(condition.is_some(), has_condition, "input: {}", input);
                    assert_eq!(complete.is_some(), has_complete, "input: {}", input);
                }
                other => panic!("expected for expression, got {:?}", other),
            }
        }
    }

    #[test]
    fn for_initial_is_let_expression() {
        let program = parse_ok("for (let i = 0; i < 2; i = i + 1) { i; }");
        match &program.statements[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::For { initial, .. },
                ..
            }) => {
                let initial = initial.as_ref().expect("initial clause");
                assert!(matches!(initial.kind, ExprKind::Let(_)));
            }
            other => panic!("expected for expression, got {:?}", other),
        }
    }

    #[test]
    fn function_literal_parameters() {
        let cases = [
            ("fn() {};", 0),
            ("fn(x) {};", 1),
            ("fn(x, y, z) {};", 3),
        ];
        for (input, arity) in cases {
            let program = parse_ok(input);
            match &program.statements[0].kind {
                StmtKind::Expr(Expr {
                    kind: ExprKind::FunctionLit { parameters, .. },
                    ..
                }) => assert_eq!(parameters.len(), arity, "input: {}", input),
                other => panic!("expected function literal, got {:?}", other),
            }
        }
    }

    #[test]
    fn hash_literals() {
        let program = parse_ok("{\"one\": 1, 2: \"two\", true: 3,};");
        match &program.statements[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::HashLit(pairs),
                ..
            }) => assert_eq!(pairs.len(), 3),
            other => panic!("expected hash literal, got {:?}", other),
        }

        let empty = parse_ok("{};");
        match &empty.statements[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::HashLit(pairs),
                ..
            }) => assert!(pairs.is_empty()),
            other => panic!("expected hash literal, got {:?}", other),
        }
    }

    #[test]
    fn dotted_call_binds_tighter_than_dot_left() {
        let program = parse_ok("test.testFn();");
        // The call is the right-hand side of the dot, not the other way
        // around.
        match &program.statements[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Infix { op, right, .. },
                ..
            }) => {
                assert_eq!(*op, InfixOp::Dot);
                assert!(matches!(right.kind, ExprKind::Call { .. }));
            }
            other => panic!("expected dotted expression, got {:?}", other),
        }
    }

    #[test]
    fn display_round_trips() {
        let sources = [
            "let add = fn(x, y) { return x + y; }; add(1, 2);",
            "let sum = 0; for (let i = 0; i < 10; i = i + 1) { sum = sum + i; } sum;",
            "{\"one\": 10 - 9, true: 5}[true];",
            "if (1 < 2) { \"a\" } else { \"b\" };",
            "# test \"t.rs\"; test.testFn();",
            "let a = [1, 2.5, \"three\"]; a[0];",
        ];
        for source in sources {
            let first = parse_ok(source).to_string();
            let second = parse_ok(&first).to_string();
            assert_eq!(first, second, "source: {}", source);
        }
    }

    #[test]
    fn errors_are_collected() {
        let mut parser = Parser::new(Lexer::new("let = 5; let x 5;", "bad.rs"));
        parser.parse_program();
        assert!(!parser.errors().is_empty());
        assert!(parser.errors()[0].contains("expected token IDENT"));
    }

    #[test]
    fn missing_prefix_reports_position() {
        let err = parse("let x = * 5;", "bad.rs").unwrap_err();
        assert!(err[0].contains("no prefix parse functions found for *"));
        assert!(err[0].contains("line 1"));
    }
}
