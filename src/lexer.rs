use std::rc::Rc;

use crate::token::{lookup_ident, Token, TokenKind};

/// Byte-oriented scanner producing tokens until `Eof`. Maintains a single
/// character of lookahead to split `=`/`==` and `!`/`!=`.
pub struct Lexer {
    input: Vec<u8>,
    position: usize,
    read_position: usize,
    ch: u8,

    file: Rc<str>,
    line: usize,
}

impl Lexer {
    pub fn new(input: &str, file: &str) -> Self {
        let mut lexer = Self {
            input: input.as_bytes().to_vec(),
            position: 0,
            read_position: 0,
            ch: 0,
            file: Rc::from(file),
            line: 1,
        };
        // ch == 0 marks end of input, so prime the first character.
        lexer.read_char();
        lexer
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let token = match self.ch {
            b'=' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    self.token(TokenKind::Eq, "==")
                } else {
                    self.token(TokenKind::Assign, "=")
                }
            }
            b'!' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    self.token(TokenKind::NotEq, "!=")
                } else {
                    self.token(TokenKind::Bang, "!")
                }
            }
            b'+' => self.token(TokenKind::Plus, "+"),
            b'-' => self.token(TokenKind::Minus, "-"),
            b'*' => self.token(TokenKind::Asterisk, "*"),
            b'/' => self.token(TokenKind::Slash, "/"),
            b'<' => self.token(TokenKind::Lt, "<"),
            b'>' => self.token(TokenKind::Gt, ">"),
            b'.' => self.token(TokenKind::Dot, "."),
            b',' => self.token(TokenKind::Comma, ","),
            b';' => self.token(TokenKind::Semicolon, ";"),
            b':' => self.token(TokenKind::Colon, ":"),
            b'#' => self.token(TokenKind::Hash, "#"),
            b'(' => self.token(TokenKind::LParen, "("),
            b')' => self.token(TokenKind::RParen, ")"),
            b'{' => self.token(TokenKind::LBrace, "{"),
            b'}' => self.token(TokenKind::RBrace, "}"),
            b'[' => self.token(TokenKind::LBracket, "["),
            b']' => self.token(TokenKind::RBracket, "]"),
            b'"' => {
                let literal = self.read_string();
                self.token(TokenKind::Str, literal)
            }
            0 => return self.token(TokenKind::Eof, ""),
            ch if is_digit(ch) => return self.read_number(),
            ch if is_letter(ch) => {
                let literal = self.read_identifier();
                return self.token(lookup_ident(&literal), literal);
            }
            ch => self.token(TokenKind::Illegal, (ch as char).to_string()),
        };

        self.read_char();
        token
    }

    fn token(&self, kind: TokenKind, literal: impl Into<String>) -> Token {
        Token::new(kind, literal, self.file.clone(), self.line)
    }

    fn read_char(&mut self) {
        self.ch = self.input.get(self.read_position).copied().unwrap_or(0);
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> u8 {
        self.input.get(self.read_position).copied().unwrap_or(0)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, b' ' | b'\t' | b'\n' | b'\r') {
            if self.ch == b'\n' {
                self.line += 1;
            }
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while is_letter(self.ch) {
            self.read_char();
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }

    /// A digit run is an INT; a `.` followed by another digit continues the
    /// run into a DOUBLE. A trailing `.` is left for the dot operator.
    fn read_number(&mut self) -> Token {
        let start = self.position;
        while is_digit(self.ch) {
            self.read_char();
        }

        let mut kind = TokenKind::Int;
        if self.ch == b'.' && is_digit(self.peek_char()) {
            kind = TokenKind::Double;
            self.read_char();
            while is_digit(self.ch) {
                self.read_char();
            }
        }

        let literal = String::from_utf8_lossy(&self.input[start..self.position]).into_owned();
        self.token(kind, literal)
    }

    fn read_string(&mut self) -> String {
        let mut out = String::new();
        loop {
            self.read_char();
            match self.ch {
                b'\\' => {
                    match self.peek_char() {
                        b'"' => out.push('"'),
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        _ => {}
                    }
                    self.read_char();
                }
                b'"' => break,
                // Unterminated string: end the literal, the parser will
                // report the structural damage.
                0 => break,
                ch => out.push(ch as char),
            }
        }
        out
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}
