//! Recursive-descent parser and safety checker for Datalog programs.
//!
//! Grammar:
//! ```text
//! program     = (rule | query)*
//! query       = "?-" atom "."
//! rule        = atom (":-" body)? "."
//! body        = bodyLiteral ("," bodyLiteral)*
//! bodyLiteral = "not" atom | comparison | atom
//! comparison  = term compOp term
//! atom        = IDENT "(" term ("," term)* ")"
//! term        = VARIABLE | STRING | NUMBER | "_"
//! ```

use super::lexer::{Lexer, Token, TokenKind};
use super::types::{Atom, BodyLiteral, CompOp, Program, Rule, Term};
use crate::error::SonobatError;
use crate::types::Value;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse Datalog source text into a checked [`Program`].
///
/// Runs the safety check on every non-fact rule as it is parsed.
pub fn parse_program(source: &str) -> Result<Program, SonobatError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    anon_counter: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            anon_counter: 0,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> SonobatError {
        let span = &self.current().span;
        SonobatError::DatalogSyntax {
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), SonobatError> {
        if &self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                kind, self.current().kind
            )))
        }
    }

    fn parse_program(&mut self) -> Result<Program, SonobatError> {
        let mut program = Program::default();

        while self.current().kind != TokenKind::Eof {
            if self.current().kind == TokenKind::Query {
                let goal = self.parse_query()?;
                program.queries.push(goal);
            } else {
                let rule = self.parse_rule()?;
                if !rule.is_safe() {
                    let var = rule.unsafe_variable().unwrap_or("?").to_string();
                    return Err(SonobatError::DatalogSafety {
                        variable: var,
                        predicate: rule.head.predicate.to_string(),
                    });
                }
                program.rules.push(rule);
            }
        }

        Ok(program)
    }

    fn parse_query(&mut self) -> Result<Atom, SonobatError> {
        self.expect(&TokenKind::Query)?;
        let atom = self.parse_atom()?;
        self.expect(&TokenKind::Dot)?;
        Ok(atom)
    }

    fn parse_rule(&mut self) -> Result<Rule, SonobatError> {
        let head = self.parse_atom()?;

        let body = if self.current().kind == TokenKind::ImpliedBy {
            self.advance();
            self.parse_body()?
        } else {
            Vec::new()
        };

        self.expect(&TokenKind::Dot)?;
        Ok(Rule::new(head, body))
    }

    fn parse_body(&mut self) -> Result<Vec<BodyLiteral>, SonobatError> {
        let mut literals = vec![self.parse_body_literal()?];
        while self.current().kind == TokenKind::Comma {
            self.advance();
            literals.push(self.parse_body_literal()?);
        }
        Ok(literals)
    }

    fn parse_body_literal(&mut self) -> Result<BodyLiteral, SonobatError> {
        if self.current().kind == TokenKind::Not {
            self.advance();
            let atom = self.parse_atom()?;
            return Ok(BodyLiteral::Negative(atom));
        }

        if self.is_term_starter() && self.peek_is_comp_op() {
            let left = self.parse_term()?;
            let op = self.parse_comp_op()?;
            let right = self.parse_term()?;
            return Ok(BodyLiteral::Comparison(left, op, right));
        }

        let atom = self.parse_atom()?;
        Ok(BodyLiteral::Positive(atom))
    }

    fn is_term_starter(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Variable(_) | TokenKind::StringLit(_) | TokenKind::NumberLit(_) | TokenKind::Anonymous
        )
    }

    fn peek_is_comp_op(&self) -> bool {
        let next = self.tokens.get(self.pos + 1).map(|t| &t.kind);
        matches!(
            next,
            Some(TokenKind::Eq)
                | Some(TokenKind::Ne)
                | Some(TokenKind::Lt)
                | Some(TokenKind::Le)
                | Some(TokenKind::Gt)
                | Some(TokenKind::Ge)
        )
    }

    fn parse_comp_op(&mut self) -> Result<CompOp, SonobatError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Eq => Ok(CompOp::Eq),
            TokenKind::Ne => Ok(CompOp::Ne),
            TokenKind::Lt => Ok(CompOp::Lt),
            TokenKind::Le => Ok(CompOp::Le),
            TokenKind::Gt => Ok(CompOp::Gt),
            TokenKind::Ge => Ok(CompOp::Ge),
            other => Err(self.error(format!("expected comparison operator, found {}", other))),
        }
    }

    fn parse_atom(&mut self) -> Result<Atom, SonobatError> {
        let predicate = match self.advance().kind {
            TokenKind::Ident(name) => name,
            other => return Err(self.error(format!("expected predicate name, found {}", other))),
        };

        self.expect(&TokenKind::LParen)?;
        let mut terms = vec![self.parse_term()?];
        while self.current().kind == TokenKind::Comma {
            self.advance();
            terms.push(self.parse_term()?);
        }
        self.expect(&TokenKind::RParen)?;

        Ok(Atom::new(predicate, terms))
    }

    fn parse_term(&mut self) -> Result<Term, SonobatError> {
        match self.advance().kind {
            TokenKind::Variable(name) => Ok(Term::Variable(name)),
            TokenKind::Anonymous => {
                let name = format!("_anon_{}", self.anon_counter);
                self.anon_counter += 1;
                Ok(Term::Variable(name))
            }
            TokenKind::StringLit(s) => Ok(Term::Constant(Value::string(s))),
            TokenKind::NumberLit(s) => {
                let n = Decimal::from_str(&s)
                    .map_err(|_| self.error(format!("invalid number literal `{}`", s)))?;
                Ok(Term::Constant(Value::Number(n)))
            }
            other => Err(self.error(format!("expected term, found {}", other))),
        }
    }
}
