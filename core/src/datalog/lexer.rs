//! Single-pass tokenizer for Datalog source text (component E).

use super::diagnostics::Span;
use crate::error::SonobatError;
use std::fmt;

/// A lexical token, paired with the span it covers in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's kind and payload.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

/// Lexical token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier starting with a lowercase letter: a predicate name.
    Ident(String),
    /// Identifier starting with an uppercase letter, or `_name`: a variable.
    Variable(String),
    /// A bare `_`: the anonymous variable marker.
    Anonymous,
    /// `not`.
    Not,
    /// Double-quoted string literal (already unescaped).
    StringLit(String),
    /// Numeric literal, integer or with a fractional part.
    NumberLit(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:-`
    ImpliedBy,
    /// `?-`
    Query,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// End of input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier `{}`", s),
            TokenKind::Variable(s) => write!(f, "variable `{}`", s),
            TokenKind::Anonymous => write!(f, "`_`"),
            TokenKind::Not => write!(f, "`not`"),
            TokenKind::StringLit(s) => write!(f, "string \"{}\"", s),
            TokenKind::NumberLit(s) => write!(f, "number {}", s),
            TokenKind::LParen => write!(f, "`(`"),
            TokenKind::RParen => write!(f, "`)`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Dot => write!(f, "`.`"),
            TokenKind::ImpliedBy => write!(f, "`:-`"),
            TokenKind::Query => write!(f, "`?-`"),
            TokenKind::Eq => write!(f, "`=`"),
            TokenKind::Ne => write!(f, "`!=`"),
            TokenKind::Lt => write!(f, "`<`"),
            TokenKind::Le => write!(f, "`<=`"),
            TokenKind::Gt => write!(f, "`>`"),
            TokenKind::Ge => write!(f, "`>=`"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Scans Datalog source text into a token stream.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the given source text.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input, including a trailing `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SonobatError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn syntax_error(&self, line: usize, column: usize, message: impl Into<String>) -> SonobatError {
        SonobatError::DatalogSyntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'%') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SonobatError> {
        self.skip_whitespace_and_comments();

        let start_line = self.line;
        let start_col = self.column;
        let start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start, start_line, start_col),
            });
        };

        let kind = match c {
            b'(' => {
                self.advance();
                TokenKind::LParen
            }
            b')' => {
                self.advance();
                TokenKind::RParen
            }
            b',' => {
                self.advance();
                TokenKind::Comma
            }
            b'.' => {
                self.advance();
                TokenKind::Dot
            }
            b'"' => self.scan_string(start_line, start_col)?,
            b'0'..=b'9' => self.scan_number(),
            b'a'..=b'z' => self.scan_ident_or_keyword(),
            b'A'..=b'Z' => self.scan_variable(),
            b'_' => self.scan_underscore(),
            b':' => {
                self.advance();
                if self.peek() == Some(b'-') {
                    self.advance();
                    TokenKind::ImpliedBy
                } else {
                    return Err(self.syntax_error(start_line, start_col, "expected `:-`"));
                }
            }
            b'?' => {
                self.advance();
                if self.peek() == Some(b'-') {
                    self.advance();
                    TokenKind::Query
                } else {
                    return Err(self.syntax_error(start_line, start_col, "expected `?-`"));
                }
            }
            b'=' => {
                self.advance();
                TokenKind::Eq
            }
            b'!' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    return Err(self.syntax_error(start_line, start_col, "expected `!=`"));
                }
            }
            b'<' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            other => {
                self.advance();
                return Err(self.syntax_error(
                    start_line,
                    start_col,
                    format!("unexpected character '{}'", other as char),
                ));
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos, start_line, start_col),
        })
    }

    fn scan_string(&mut self, start_line: usize, start_col: usize) -> Result<TokenKind, SonobatError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.syntax_error(start_line, start_col, "unterminated string literal"));
                }
                Some(b'\n') => {
                    return Err(self.syntax_error(self.line, self.column, "unterminated string literal"));
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    let esc_line = self.line;
                    let esc_col = self.column;
                    self.advance();
                    match self.advance() {
                        Some(b'"') => value.push('"'),
                        Some(b'\\') => value.push('\\'),
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        _ => {
                            return Err(self.syntax_error(
                                esc_line,
                                esc_col,
                                "invalid escape sequence in string literal",
                            ));
                        }
                    }
                }
                Some(c) => {
                    value.push(c as char);
                    self.advance();
                }
            }
        }
        Ok(TokenKind::StringLit(value))
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .expect("scanned digits are valid UTF-8")
            .to_string();
        TokenKind::NumberLit(text)
    }

    fn scan_ident_or_keyword(&mut self) -> TokenKind {
        let text = self.scan_ident_chars();
        if text == "not" {
            TokenKind::Not
        } else {
            TokenKind::Ident(text)
        }
    }

    fn scan_variable(&mut self) -> TokenKind {
        let text = self.scan_ident_chars();
        TokenKind::Variable(text)
    }

    fn scan_underscore(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance(); // consume `_`
        if matches!(self.peek(), Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_')) {
            while matches!(
                self.peek(),
                Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_')
            ) {
                self.advance();
            }
            let text = std::str::from_utf8(&self.source[start..self.pos])
                .expect("scanned identifier is valid UTF-8")
                .to_string();
            TokenKind::Variable(text)
        } else {
            TokenKind::Anonymous
        }
    }

    fn scan_ident_chars(&mut self) -> String {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_')
        ) {
            self.advance();
        }
        std::str::from_utf8(&self.source[start..self.pos])
            .expect("scanned identifier is valid UTF-8")
            .to_string()
    }
}
