//! Turns a character stream into a flat sequence of [`Token`]s.
//!
//! A cursor over the input with `peek`/`advance` helpers and a driving
//! loop, tracking a single character offset rather than a `(line, col)`
//! pair.
use crate::{
    error::ParseError,
    token::{Token, TokenKind},
};

const TWO_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||"];

fn is_valid_escape(c: char) -> bool {
    matches!(c, 'b' | 'n' | 'r' | 't' | '\'' | '"' | '\\')
}

pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn slice_from(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = vec![];

        loop {
            self.skip_whitespace();

            let Some(c) = self.peek() else { break };
            let start = self.pos;

            let token = if c == '@' || c.is_ascii_alphabetic() {
                self.lex_identifier(start)
            } else if c.is_ascii_digit() || (c == '-' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.lex_number(start)
            } else if c == '\'' {
                self.lex_character(start)
            } else if c == '"' {
                self.lex_string(start)
            } else {
                self.lex_operator(start)
            }?;

            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Skips runs of literal whitespace and the escape-like leaders `\b \n \r \t`.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    self.advance();
                }
                Some('\\') if matches!(self.peek_at(1), Some('b') | Some('n') | Some('r') | Some('t')) =>
                {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn lex_identifier(&mut self, start: usize) -> Result<Token, ParseError> {
        self.advance();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token::new(TokenKind::Identifier, self.slice_from(start), start))
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, ParseError> {
        let negative = self.peek() == Some('-');
        if negative {
            self.advance();
        }

        let int_start = self.pos;
        let first = self
            .advance()
            .ok_or_else(|| ParseError::new("expected a digit", self.pos))?;

        if first == '0' {
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ParseError::new(
                    "leading zero is only allowed for the literal 0",
                    start,
                ));
            }
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let mut is_decimal = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            is_decimal = true;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if negative && !is_decimal && self.slice_from(int_start) == "0" {
            return Err(ParseError::new("'-0' is not a valid integer literal", start));
        }

        let kind = if is_decimal {
            TokenKind::Decimal
        } else {
            TokenKind::Integer
        };
        Ok(Token::new(kind, self.slice_from(start), start))
    }

    fn lex_character(&mut self, start: usize) -> Result<Token, ParseError> {
        self.advance();
        let mut content_len = 0usize;

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(ParseError::new("unterminated character literal", self.pos))
                }
                Some('\'') => break,
                Some('\\') => {
                    let esc_start = self.pos;
                    self.advance();
                    match self.peek() {
                        Some(e) if is_valid_escape(e) => self.advance(),
                        Some(_) => return Err(ParseError::new("invalid escape sequence", esc_start)),
                        None => return Err(ParseError::new("unterminated character literal", self.pos)),
                    };
                    content_len += 1;
                }
                Some(_) => {
                    self.advance();
                    content_len += 1;
                }
            }

            if content_len > 1 {
                return Err(ParseError::new(
                    "character literal must contain exactly one character",
                    start,
                ));
            }
        }

        self.advance();
        if content_len == 0 {
            return Err(ParseError::new("empty character literal", start));
        }

        Ok(Token::new(TokenKind::Character, self.slice_from(start), start))
    }

    fn lex_string(&mut self, start: usize) -> Result<Token, ParseError> {
        self.advance();

        loop {
            match self.peek() {
                None | Some('\n') => return Err(ParseError::new("unterminated string literal", self.pos)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    let esc_start = self.pos;
                    self.advance();
                    match self.peek() {
                        Some(e) if is_valid_escape(e) => self.advance(),
                        Some(_) => return Err(ParseError::new("invalid escape sequence", esc_start)),
                        None => return Err(ParseError::new("unterminated string literal", self.pos)),
                    };
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        Ok(Token::new(TokenKind::String, self.slice_from(start), start))
    }

    fn lex_operator(&mut self, start: usize) -> Result<Token, ParseError> {
        let c = self.advance().unwrap();

        if c.is_control() {
            return Err(ParseError::new(format!("stray unrecognized byte {c:?}"), start));
        }

        if let Some(next) = self.peek() {
            let two: String = [c, next].iter().collect();
            if TWO_CHAR_OPERATORS.contains(&two.as_str()) {
                self.advance();
                return Ok(Token::new(TokenKind::Operator, two, start));
            }
        }

        Ok(Token::new(TokenKind::Operator, c.to_string(), start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(tokens: &[Token]) -> Vec<(TokenKind, &str, usize)> {
        tokens.iter().map(|t| (t.kind, t.literal.as_str(), t.offset)).collect()
    }

    #[test]
    fn lexes_hello_world_call() {
        let tokens = lex(r#"print("Hello, World!");"#).unwrap();
        assert_eq!(
            lit(&tokens),
            vec![
                (TokenKind::Identifier, "print", 0),
                (TokenKind::Operator, "(", 5),
                (TokenKind::String, "\"Hello, World!\"", 6),
                (TokenKind::Operator, ")", 21),
                (TokenKind::Operator, ";", 22),
            ]
        );
    }

    #[test]
    fn lexes_arithmetic_mix() {
        let tokens = lex("x + 1 == y / 2.0 - 3").unwrap();
        assert_eq!(
            lit(&tokens),
            vec![
                (TokenKind::Identifier, "x", 0),
                (TokenKind::Operator, "+", 2),
                (TokenKind::Integer, "1", 4),
                (TokenKind::Operator, "==", 6),
                (TokenKind::Identifier, "y", 9),
                (TokenKind::Operator, "/", 11),
                (TokenKind::Decimal, "2.0", 13),
                (TokenKind::Operator, "-", 17),
                (TokenKind::Integer, "3", 19),
            ]
        );
    }

    #[test]
    fn round_trips_every_token_literal() {
        let source = r#"LET @x: Integer = -5; VAR y = 'a'; print("ok\n");"#;
        for token in lex(source).unwrap() {
            let slice: String = source
                .chars()
                .skip(token.offset)
                .take(token.literal.chars().count())
                .collect();
            assert_eq!(slice, token.literal);
        }
    }

    #[test]
    fn identifier_may_start_with_at() {
        let tokens = lex("@foo").unwrap();
        assert_eq!(lit(&tokens), vec![(TokenKind::Identifier, "@foo", 0)]);
    }

    #[test]
    fn negative_literal_is_one_integer_token() {
        assert_eq!(lit(&lex("-1").unwrap()), vec![(TokenKind::Integer, "-1", 0)]);
        assert_eq!(
            lit(&lex("- 1").unwrap()),
            vec![(TokenKind::Operator, "-", 0), (TokenKind::Integer, "1", 2)]
        );
    }

    #[test]
    fn leading_zero_is_rejected() {
        assert!(lex("007").is_err());
    }

    #[test]
    fn trailing_dot_is_not_consumed() {
        let tokens = lex("1.").unwrap();
        assert_eq!(
            lit(&tokens),
            vec![(TokenKind::Integer, "1", 0), (TokenKind::Operator, ".", 1)]
        );
    }

    #[test]
    fn unterminated_string_fails_at_input_length() {
        let source = "\"unterminated";
        let err = lex(source).unwrap_err();
        assert_eq!(err.offset, source.chars().count());
    }

    #[test]
    fn bang_equal_equal_equal_decomposes_greedily() {
        let tokens = lex("!===").unwrap();
        assert_eq!(
            lit(&tokens),
            vec![
                (TokenKind::Operator, "!=", 0),
                (TokenKind::Operator, "==", 2),
            ]
        );
    }

    #[test]
    fn negative_zero_without_fraction_is_rejected() {
        assert!(lex("-0").is_err());
        assert!(lex("-0.5").is_ok());
    }

    #[test]
    fn empty_and_multi_char_character_literals_are_rejected() {
        assert!(lex("''").is_err());
        assert!(lex("'ab'").is_err());
        assert!(lex("'\\n'").is_ok());
    }
}
