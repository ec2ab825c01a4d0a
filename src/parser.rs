//! Hand-written recursive-descent parser: turns the flat token sequence
//! into a `Source`. A cursor over tokens with two lookahead helpers,
//! `peek` and `match_tok`.
use std::cell::RefCell;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::ast::{
    declaration::{Function, Global, Param},
    expression::{Expr, ExprKind, Literal},
    statement::{Case, Stmt, StmtKind},
    Source,
};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

const GLOBAL_KEYWORDS: &[&str] = &["LIST", "VAR", "VAL"];

/// A single lookahead criterion: match by token kind, by literal text, or
/// both. `peek`/`match_tok` accept a slice of these as alternatives (`OR`).
#[derive(Clone, Copy)]
pub enum Pattern {
    Kind(TokenKind),
    Lit(&'static str),
    KindLit(TokenKind, &'static str),
}

pub fn kind(k: TokenKind) -> Pattern {
    Pattern::Kind(k)
}
pub fn lit(s: &'static str) -> Pattern {
    Pattern::Lit(s)
}
pub fn op(s: &'static str) -> Pattern {
    Pattern::KindLit(TokenKind::Operator, s)
}
pub fn kw(s: &'static str) -> Pattern {
    Pattern::KindLit(TokenKind::Identifier, s)
}

fn matches_pattern(token: &Token, pattern: Pattern) -> bool {
    match pattern {
        Pattern::Kind(k) => token.kind == k,
        Pattern::Lit(s) => token.literal == s,
        Pattern::KindLit(k, s) => token.kind == k && token.literal == s,
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Source, ParseError> {
    Parser::new(tokens).parse_source()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn offset_here(&self) -> usize {
        match self.current() {
            Some(t) => t.offset,
            None => self
                .tokens
                .last()
                .map(|t| t.offset + t.literal.chars().count())
                .unwrap_or(0),
        }
    }

    /// Non-consuming lookahead: true if the current token matches any of
    /// the given patterns.
    fn peek(&self, patterns: &[Pattern]) -> bool {
        match self.current() {
            Some(t) => patterns.iter().any(|p| matches_pattern(t, *p)),
            None => false,
        }
    }

    /// `peek` + advance on success.
    fn match_tok(&mut self, patterns: &[Pattern]) -> Option<Token> {
        if self.peek(patterns) {
            let t = self.tokens[self.pos].clone();
            self.pos += 1;
            Some(t)
        } else {
            None
        }
    }

    fn expect(&mut self, patterns: &[Pattern], what: &str) -> Result<Token, ParseError> {
        self.match_tok(patterns)
            .ok_or_else(|| ParseError::new(format!("expected {what}"), self.offset_here()))
    }

    fn expect_identifier(&mut self, what: &str) -> Result<Token, ParseError> {
        self.expect(&[kind(TokenKind::Identifier)], what)
    }

    fn parse_source(&mut self) -> Result<Source, ParseError> {
        let mut globals = vec![];
        while self.peek(&[kw("LIST"), kw("VAR"), kw("VAL")]) {
            globals.push(self.parse_global()?);
        }

        let mut functions = vec![];
        while self.peek(&[kw("FUN")]) {
            functions.push(self.parse_function()?);
        }

        if self.current().is_some() {
            return Err(ParseError::new(
                "expected a global or function declaration",
                self.offset_here(),
            ));
        }

        Ok(Source { globals, functions })
    }

    fn parse_global(&mut self) -> Result<Global, ParseError> {
        let head = self
            .match_tok(&[kw("LIST"), kw("VAR"), kw("VAL")])
            .expect("caller verified leading keyword");
        let offset = head.offset;
        let is_list = head.literal == "LIST";

        let name = self.expect_identifier("a global name")?.literal;
        self.expect(&[op(":")], "':'")?;
        let type_name = self.expect_identifier("a type name")?.literal;

        let value = if self.match_tok(&[op("=")]).is_some() {
            Some(if is_list {
                self.parse_list_initializer()?
            } else {
                self.parse_expression()?
            })
        } else if is_list {
            return Err(ParseError::new(
                "LIST globals require an initializer",
                self.offset_here(),
            ));
        } else {
            None
        };

        self.expect(&[op(";")], "';'")?;

        Ok(Global {
            name,
            type_name,
            mutable: head.literal != "VAL",
            is_list,
            value,
            variable: RefCell::new(None),
            offset,
        })
    }

    fn parse_list_initializer(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset_here();
        self.expect(&[op("[")], "'['")?;
        let mut values = vec![self.parse_expression()?];
        while self.match_tok(&[op(",")]).is_some() {
            values.push(self.parse_expression()?);
        }
        self.expect(&[op("]")], "']'")?;
        Ok(Expr::new(ExprKind::ListLiteral(values), offset))
    }

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        let head = self.expect(&[kw("FUN")], "'FUN'")?;
        let name = self.expect_identifier("a function name")?.literal;

        self.expect(&[op("(")], "'('")?;
        let mut params = vec![];
        if !self.peek(&[op(")")]) {
            params.push(self.parse_param()?);
            while self.match_tok(&[op(",")]).is_some() {
                params.push(self.parse_param()?);
            }
        }
        self.expect(&[op(")")], "')'")?;

        let return_type_name = if self.match_tok(&[op(":")]).is_some() {
            Some(self.expect_identifier("a return type name")?.literal)
        } else {
            None
        };

        self.expect(&[kw("DO")], "'DO'")?;
        let body = self.parse_block()?;
        self.expect(&[kw("END")], "'END'")?;

        Ok(Function {
            name,
            params,
            return_type_name,
            body: std::rc::Rc::new(body),
            function: RefCell::new(None),
            offset: head.offset,
        })
    }

    fn parse_param(&mut self) -> Result<Param, ParseError> {
        let name = self.expect_identifier("a parameter name")?.literal;
        self.expect(&[op(":")], "':'")?;
        let type_name = self.expect_identifier("a parameter type")?.literal;
        Ok(Param { name, type_name })
    }

    /// Statements until a block terminator. The dispatcher matches each
    /// leading keyword itself; every `parse_*` helper below is entered
    /// already past its keyword.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![];
        while !self.peek(&[kw("END"), kw("ELSE"), kw("CASE"), kw("DEFAULT")]) && self.current().is_some() {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if let Some(t) = self.match_tok(&[kw("LET")]) {
            return self.parse_declaration(t.offset);
        }
        if let Some(t) = self.match_tok(&[kw("IF")]) {
            return self.parse_if(t.offset);
        }
        if let Some(t) = self.match_tok(&[kw("SWITCH")]) {
            return self.parse_switch(t.offset);
        }
        if let Some(t) = self.match_tok(&[kw("WHILE")]) {
            return self.parse_while(t.offset);
        }
        if let Some(t) = self.match_tok(&[kw("RETURN")]) {
            let value = self.parse_expression()?;
            self.expect(&[op(";")], "';'")?;
            return Ok(Stmt::new(StmtKind::Return(value), t.offset));
        }

        let offset = self.offset_here();
        let receiver = self.parse_expression()?;
        if self.match_tok(&[op("=")]).is_some() {
            let value = self.parse_expression()?;
            self.expect(&[op(";")], "';'")?;
            return Ok(Stmt::new(StmtKind::Assignment { receiver, value }, offset));
        }
        self.expect(&[op(";")], "';'")?;
        Ok(Stmt::new(StmtKind::Expression(receiver), offset))
    }

    fn parse_declaration(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier("a variable name")?.literal;
        let type_name = if self.match_tok(&[op(":")]).is_some() {
            Some(self.expect_identifier("a type name")?.literal)
        } else {
            None
        };
        let value = if self.match_tok(&[op("=")]).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&[op(";")], "';'")?;
        Ok(Stmt::new(
            StmtKind::Declaration {
                name,
                type_name,
                value,
                variable: RefCell::new(None),
            },
            offset,
        ))
    }

    fn parse_if(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let cond = self.parse_expression()?;
        self.expect(&[kw("DO")], "'DO'")?;
        let then_block = self.parse_block()?;
        let else_block = if self.match_tok(&[kw("ELSE")]).is_some() {
            Some(self.parse_block()?)
        } else {
            None
        };
        self.expect(&[kw("END")], "'END'")?;
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_block,
                else_block,
            },
            offset,
        ))
    }

    fn parse_switch(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let cond = self.parse_expression()?;
        let mut cases = vec![];
        while self.match_tok(&[kw("CASE")]).is_some() {
            let value = self.parse_expression()?;
            self.expect(&[op(":")], "':'")?;
            let block = self.parse_block()?;
            cases.push(Case {
                value: Some(value),
                block,
            });
        }
        self.expect(&[kw("DEFAULT")], "'DEFAULT'")?;
        let default_block = self.parse_block()?;
        cases.push(Case {
            value: None,
            block: default_block,
        });
        self.expect(&[kw("END")], "'END'")?;
        Ok(Stmt::new(StmtKind::Switch { cond, cases }, offset))
    }

    fn parse_while(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let cond = self.parse_expression()?;
        self.expect(&[kw("DO")], "'DO'")?;
        let block = self.parse_block()?;
        self.expect(&[kw("END")], "'END'")?;
        Ok(Stmt::new(StmtKind::While { cond, block }, offset))
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        while let Some(t) = self.match_tok(&[op("&&"), op("||")]) {
            let right = self.parse_comparison()?;
            let offset = left.offset;
            left = Expr::new(
                ExprKind::Binary {
                    op: t.literal,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                offset,
            );
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while let Some(t) = self.match_tok(&[op("<"), op(">"), op("=="), op("!=")]) {
            let right = self.parse_additive()?;
            let offset = left.offset;
            left = Expr::new(
                ExprKind::Binary {
                    op: t.literal,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                offset,
            );
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(t) = self.match_tok(&[op("+"), op("-")]) {
            let right = self.parse_multiplicative()?;
            let offset = left.offset;
            left = Expr::new(
                ExprKind::Binary {
                    op: t.literal,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                offset,
            );
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;
        while let Some(t) = self.match_tok(&[op("*"), op("/"), op("^")]) {
            let right = self.parse_primary()?;
            let offset = left.offset;
            left = Expr::new(
                ExprKind::Binary {
                    op: t.literal,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                offset,
            );
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset_here();

        if let Some(t) = self.match_tok(&[kw("NIL")]) {
            return Ok(Expr::new(ExprKind::Literal(Literal::Nil), t.offset));
        }
        if let Some(t) = self.match_tok(&[kw("TRUE")]) {
            return Ok(Expr::new(ExprKind::Literal(Literal::Boolean(true)), t.offset));
        }
        if let Some(t) = self.match_tok(&[kw("FALSE")]) {
            return Ok(Expr::new(ExprKind::Literal(Literal::Boolean(false)), t.offset));
        }
        if let Some(t) = self.match_tok(&[kind(TokenKind::Integer)]) {
            let value: BigInt = t
                .literal
                .parse()
                .map_err(|_| ParseError::new("malformed integer literal", t.offset))?;
            return Ok(Expr::new(ExprKind::Literal(Literal::Integer(value)), t.offset));
        }
        if let Some(t) = self.match_tok(&[kind(TokenKind::Decimal)]) {
            let value: BigDecimal = t
                .literal
                .parse()
                .map_err(|_| ParseError::new("malformed decimal literal", t.offset))?;
            return Ok(Expr::new(ExprKind::Literal(Literal::Decimal(value)), t.offset));
        }
        if let Some(t) = self.match_tok(&[kind(TokenKind::Character)]) {
            let c = decode_character(&t)?;
            return Ok(Expr::new(ExprKind::Literal(Literal::Character(c)), t.offset));
        }
        if let Some(t) = self.match_tok(&[kind(TokenKind::String)]) {
            let s = decode_string(&t)?;
            return Ok(Expr::new(ExprKind::Literal(Literal::String(s)), t.offset));
        }
        if self.match_tok(&[op("(")]).is_some() {
            let inner = self.parse_expression()?;
            self.expect(&[op(")")], "')'")?;
            return Ok(Expr::new(ExprKind::Group(Box::new(inner)), offset));
        }
        if let Some(t) = self.match_tok(&[kind(TokenKind::Identifier)]) {
            let name = t.literal;
            if self.match_tok(&[op("(")]).is_some() {
                let mut args = vec![];
                if !self.peek(&[op(")")]) {
                    args.push(self.parse_expression()?);
                    while self.match_tok(&[op(",")]).is_some() {
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect(&[op(")")], "')'")?;
                return Ok(Expr::new(
                    ExprKind::Call {
                        name,
                        args,
                        function: RefCell::new(None),
                    },
                    t.offset,
                ));
            }
            if self.match_tok(&[op("[")]).is_some() {
                let index = self.parse_expression()?;
                self.expect(&[op("]")], "']'")?;
                return Ok(Expr::new(
                    ExprKind::Access {
                        name,
                        index: Some(Box::new(index)),
                        variable: RefCell::new(None),
                    },
                    t.offset,
                ));
            }
            return Ok(Expr::new(
                ExprKind::Access {
                    name,
                    index: None,
                    variable: RefCell::new(None),
                },
                t.offset,
            ));
        }

        Err(ParseError::new("expected an expression", offset))
    }
}

/// Strips the surrounding quotes and translates `\b \n \r \t \' \" \\`.
fn decode_string(t: &Token) -> Result<String, ParseError> {
    let inner = &t.literal[1..t.literal.len() - 1];
    unescape::unescape(inner).ok_or_else(|| ParseError::new("invalid string escape", t.offset))
}

fn decode_character(t: &Token) -> Result<char, ParseError> {
    let inner = &t.literal[1..t.literal.len() - 1];
    let decoded =
        unescape::unescape(inner).ok_or_else(|| ParseError::new("invalid character escape", t.offset))?;
    decoded
        .chars()
        .next()
        .ok_or_else(|| ParseError::new("empty character literal", t.offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(src: &str) -> Source {
        parse(lex(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_hello_world_call_statement() {
        let source = parse(lex(r#"print("Hello, World!");"#).unwrap());
        // A bare call statement at source level is not inside a function,
        // so this is only meaningful via parse_statement in isolation;
        // parse_source rejects it because it isn't a global/function.
        assert!(source.is_err());
    }

    #[test]
    fn parses_s4_run_main() {
        let source = parse_source(
            "VAR x: Integer = 1; FUN main(): Integer DO RETURN x + 2; END",
        );
        assert_eq!(source.globals.len(), 1);
        assert_eq!(source.functions.len(), 1);
        assert_eq!(source.functions[0].name, "main");
    }

    #[test]
    fn list_global_requires_bracket_initializer() {
        let source = parse_source("LIST xs: Integer = [1, 2, 3]; FUN main(): Integer DO RETURN 0; END");
        match &source.globals[0].value {
            Some(Expr {
                kind: ExprKind::ListLiteral(values),
                ..
            }) => assert_eq!(values.len(), 3),
            _ => panic!("expected a list literal"),
        }
    }

    #[test]
    fn list_global_without_initializer_is_rejected() {
        assert!(parse(lex("LIST xs: Integer;").unwrap()).is_err());
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let source = parse_source("FUN main(): Integer DO RETURN 1 - 2 - 3; END");
        let StmtKind::Return(expr) = &source.functions[0].body[0].kind else {
            panic!("expected return statement")
        };
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!("expected binary expression")
        };
        assert_eq!(op, "-");
        assert!(matches!(left.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn switch_default_must_be_last_and_is_always_added() {
        let source = parse_source(
            "FUN main(): Integer DO SWITCH 1 CASE 1: RETURN 1; DEFAULT RETURN 0; END RETURN 2; END",
        );
        let StmtKind::Switch { cases, .. } = &source.functions[0].body[0].kind else {
            panic!("expected switch statement")
        };
        assert!(cases.last().unwrap().value.is_none());
    }

    #[test]
    fn call_and_index_suffixes_do_not_chain() {
        // `f()[0]` is not in the grammar: only one suffix may follow an
        // identifier, so this must fail to parse as a single primary.
        let err = parse(lex("FUN main(): Integer DO RETURN f()[0]; END").unwrap());
        assert!(err.is_err());
    }

    #[test]
    fn string_literal_unescapes_and_strips_quotes() {
        let source = parse_source(r#"FUN main(): Integer DO print("a\nb"); RETURN 0; END"#);
        let StmtKind::Expression(expr) = &source.functions[0].body[0].kind else {
            panic!("expected expression statement")
        };
        let ExprKind::Call { args, .. } = &expr.kind else {
            panic!("expected call")
        };
        let ExprKind::Literal(Literal::String(s)) = &args[0].kind else {
            panic!("expected string literal")
        };
        assert_eq!(s, "a\nb");
    }
}
