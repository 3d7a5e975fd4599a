//! # Lexer
//!
//! On-demand token producer. The parser pulls one token at a time via
//! [`Lexer::next_token`]; after the end of the source every further call
//! yields an EOS token. Positions are tracked as 1-based line/column pairs
//! tagged with the `medium` label (file name, "stdin", "2nd argument", ...)
//! so that errors can point at their origin.

mod token;

pub use token::*;

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{Error, Location};

pub struct Lexer<'a> {
    iterator: Peekable<Chars<'a>>,
    medium: String,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, medium: &str) -> Self {
        Self {
            iterator: source.chars().peekable(),
            medium: medium.to_string(),
            line: 1,
            column: 1,
        }
    }

    /// Produce the next token. Lexical problems (unknown character,
    /// unterminated string or comment, malformed number) surface here.
    pub fn next_token(&mut self) -> Result<Token, Error> {
        self.skip_blanks()?;

        let location = self.location();

        let Some(&next) = self.peek() else {
            return Ok(Token::new(TokenKind::Eos, "", Some(location)));
        };

        match next {
            '\n' | '\r' => {
                self.advance();
                if next == '\r' {
                    // \r\n collapses into a single newline token
                    self.advance_if(|c| c == '\n');
                }
                Ok(Token::new(TokenKind::NewLine, "\n", Some(location)))
            }
            '"' | '\'' => self.lex_string(next),
            '0'..='9' => self.lex_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.lex_identifier()),
            _ => self.lex_operator(),
        }
    }

    fn peek(&mut self) -> Option<&char> {
        self.iterator.peek()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.iterator.clone().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let next = self.iterator.next();
        match next {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        next
    }

    fn advance_if(&mut self, accept: impl FnOnce(char) -> bool) -> Option<char> {
        match self.peek() {
            Some(&c) if accept(c) => self.advance(),
            _ => None,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.medium.clone(), self.line, self.column)
    }

    /// Discard whitespace (except newlines), `#` line comments, and
    /// `/* ... */` block comments.
    fn skip_blanks(&mut self) -> Result<(), Error> {
        loop {
            match self.peek().copied() {
                Some(c) if c.is_whitespace() && c != '\n' && c != '\r' => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek().copied() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.location();
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') => {
                                if self.advance_if(|c| c == '/').is_some() {
                                    break;
                                }
                            }
                            Some(_) => {}
                            None => {
                                return Err(Error::lex("unterminated comment", Some(start)));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let location = self.location();
        let mut lexeme = String::new();

        while let Some(c) = self.advance_if(|c| c.is_alphanumeric() || c == '_') {
            lexeme.push(c);
        }

        // reclassify keywords after the fact
        let kind = KEYWORDS
            .get(lexeme.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);

        Token::new(kind, lexeme, Some(location))
    }

    /// digits [ '.' digits ] [ ('e'|'E') [sign] digits ], lexeme verbatim.
    /// A trailing `.` is not part of the number; a sign-only exponent is a
    /// malformed number.
    fn lex_number(&mut self) -> Result<Token, Error> {
        let location = self.location();
        let mut lexeme = String::new();

        while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
            lexeme.push(c);
        }

        if self.peek() == Some(&'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            lexeme.push(self.advance().unwrap_or('.'));
            while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
                lexeme.push(c);
            }
        }

        if let Some(&e) = self.peek() {
            if e == 'e' || e == 'E' {
                let after = self.peek_at(1);
                if after.is_some_and(|c| c.is_ascii_digit()) {
                    lexeme.push(self.advance().unwrap_or(e));
                    while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
                        lexeme.push(c);
                    }
                } else if after == Some('+') || after == Some('-') {
                    if !self.peek_at(2).is_some_and(|c| c.is_ascii_digit()) {
                        return Err(Error::lex(
                            format!("malformed number '{}{}{}'", lexeme, e, after.unwrap_or(' ')),
                            Some(location),
                        ));
                    }
                    lexeme.push(self.advance().unwrap_or(e));
                    lexeme.push(self.advance().unwrap_or('+'));
                    while let Some(c) = self.advance_if(|c| c.is_ascii_digit()) {
                        lexeme.push(c);
                    }
                }
            }
        }

        Ok(Token::new(TokenKind::Number, lexeme, Some(location)))
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, Error> {
        let location = self.location();
        self.advance();

        let mut text = String::new();

        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(Error::lex("unterminated string", Some(location)));
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    None => return Err(Error::lex("unterminated string", Some(location))),
                    Some('"') => text.push('"'),
                    Some('\'') => text.push('\''),
                    Some('\\') => text.push('\\'),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('u') => text.push(self.lex_unicode_escape()?),
                    // unrecognized escapes pass through verbatim
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                },
                Some(c) => text.push(c),
            }
        }

        Ok(Token::new(TokenKind::String, text, Some(location)))
    }

    /// Decode the four hex digits after `\u`, combining UTF-16 surrogate
    /// pairs written as two escapes.
    fn lex_unicode_escape(&mut self) -> Result<char, Error> {
        let location = self.location();

        let first = self.lex_hex4(&location)?;
        let code = if (0xD800..=0xDBFF).contains(&first) {
            if self.advance() != Some('\\') || self.advance() != Some('u') {
                return Err(Error::lex(
                    "missing low surrogate in unicode escape",
                    Some(location),
                ));
            }
            let second = self.lex_hex4(&location)?;
            if !(0xDC00..=0xDFFF).contains(&second) {
                return Err(Error::lex(
                    "invalid low surrogate in unicode escape",
                    Some(location),
                ));
            }
            0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
        } else if (0xDC00..=0xDFFF).contains(&first) {
            return Err(Error::lex(
                "lone low surrogate in unicode escape",
                Some(location),
            ));
        } else {
            first
        };

        char::from_u32(code).ok_or_else(|| Error::lex("invalid unicode escape", Some(location)))
    }

    fn lex_hex4(&mut self, location: &Location) -> Result<u32, Error> {
        let mut value = 0;
        for _ in 0..4 {
            let digit = self
                .advance()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| Error::lex("invalid unicode escape", Some(location.clone())))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn lex_operator(&mut self) -> Result<Token, Error> {
        let location = self.location();

        let Some(first) = self.advance() else {
            return Ok(Token::new(TokenKind::Eos, "", Some(location)));
        };

        let followed_by_eq = |lexer: &mut Self| lexer.advance_if(|c| c == '=').is_some();

        let (kind, lexeme) = match first {
            '+' => {
                if followed_by_eq(self) {
                    (TokenKind::PlusAssign, "+=")
                } else {
                    (TokenKind::Plus, "+")
                }
            }
            '-' => {
                if followed_by_eq(self) {
                    (TokenKind::MinusAssign, "-=")
                } else {
                    (TokenKind::Minus, "-")
                }
            }
            '*' => {
                if followed_by_eq(self) {
                    (TokenKind::TimesAssign, "*=")
                } else {
                    (TokenKind::Times, "*")
                }
            }
            '/' => {
                if followed_by_eq(self) {
                    (TokenKind::DivideAssign, "/=")
                } else {
                    (TokenKind::Divide, "/")
                }
            }
            '%' => {
                if followed_by_eq(self) {
                    (TokenKind::ModuloAssign, "%=")
                } else {
                    (TokenKind::Modulo, "%")
                }
            }
            '=' => {
                if followed_by_eq(self) {
                    (TokenKind::Equal, "==")
                } else {
                    (TokenKind::Assign, "=")
                }
            }
            ':' => {
                if followed_by_eq(self) {
                    (TokenKind::Result, ":=")
                } else {
                    (TokenKind::Colon, ":")
                }
            }
            '<' => {
                if followed_by_eq(self) {
                    (TokenKind::LessOrEqual, "<=")
                } else {
                    (TokenKind::LessThan, "<")
                }
            }
            '>' => {
                if followed_by_eq(self) {
                    (TokenKind::GreaterOrEqual, ">=")
                } else {
                    (TokenKind::GreaterThan, ">")
                }
            }
            '!' => {
                if followed_by_eq(self) {
                    (TokenKind::NotEqual, "!=")
                } else {
                    return Err(Error::lex("unknown character '!'", Some(location)));
                }
            }
            '.' => (TokenKind::Dot, "."),
            '(' => (TokenKind::LeftParen, "("),
            ')' => (TokenKind::RightParen, ")"),
            '[' => (TokenKind::LeftBracket, "["),
            ']' => (TokenKind::RightBracket, "]"),
            '{' => (TokenKind::LeftBrace, "{"),
            '}' => (TokenKind::RightBrace, "}"),
            ';' => (TokenKind::Semicolon, ";"),
            ',' => (TokenKind::Comma, ","),
            c => {
                return Err(Error::lex(
                    format!("unknown character '{c}'"),
                    Some(location),
                ));
            }
        };

        Ok(Token::new(kind, lexeme, Some(location)))
    }
}
