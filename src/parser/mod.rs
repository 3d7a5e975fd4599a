//! # Parser
//!
//! Recursive descent over a buffer of tokens pulled on demand from the
//! lexer. Speculative productions save the integer index into the buffer
//! and restore it on failure; the consumed prefix is trimmed away after
//! each completed top-level statement so memory stays bounded.
//!
//! A program is a block whose outer braces may be omitted. When the top
//! level does not form a block at all, the source is re-parsed as a
//! sequence of directly-represented JSON values which the caller binds to
//! the implicit variable `_`.

pub mod ast;

use std::rc::Rc;

use crate::config::Config;
use crate::error::Error;
use crate::lexer::{Lexer, Token, TokenKind};

use ast::{BlockKind, Callee, Parameter, Statement};

/// What one source parses into. A directly-represented JSON source fills
/// `direct_values` instead of `statements`; the loader folds the values of
/// all inputs into the implicit `_` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseUnit {
    pub statements: Vec<Statement>,
    pub direct_values: Vec<Statement>,
}

pub struct Parser<'a> {
    source: &'a str,
    medium: String,
    lexer: Lexer<'a>,
    tokens: Vec<Token>,
    index: usize,
    lex_error: Option<Error>,
    json_mode: bool,
    implicit_assign: bool,
    infinity: Option<String>,
    nan: Option<String>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, medium: &str, config: &Config) -> Self {
        Self {
            source,
            medium: medium.to_string(),
            lexer: Lexer::new(source, medium),
            tokens: vec![],
            index: 0,
            lex_error: None,
            json_mode: config.enable_only_json,
            implicit_assign: false,
            infinity: config.infinity.clone(),
            nan: config.nan.clone(),
        }
    }

    /// A parser locked to strict JSON regardless of the config flag
    /// (`.json` files and `Json` inputs).
    pub fn new_json(source: &'a str, medium: &str, config: &Config) -> Self {
        let mut parser = Self::new(source, medium, config);
        parser.json_mode = true;
        parser
    }

    pub fn parse(&mut self) -> Result<ParseUnit, Error> {
        if self.json_mode {
            return self.parse_json_root();
        }

        match self.parse_program() {
            Ok(statements) => Ok(ParseUnit {
                statements,
                direct_values: vec![],
            }),
            Err(error) => {
                // not a block; re-parse as directly-represented JSON.
                // When that fails too, the block error is the useful one.
                self.reset();
                self.parse_direct_values().map_err(|_| error)
            }
        }
    }

    fn reset(&mut self) {
        self.lexer = Lexer::new(self.source, &self.medium);
        self.tokens.clear();
        self.index = 0;
        self.lex_error = None;
    }

    // ---- token plumbing -------------------------------------------------

    fn fill(&mut self, offset: usize) -> Result<(), Error> {
        while self.tokens.len() <= self.index + offset {
            if let Some(error) = &self.lex_error {
                return Err(error.clone());
            }
            match self.lexer.next_token() {
                Ok(token) => self.tokens.push(token),
                Err(error) => {
                    // remember it so backtracking re-encounters the same
                    // error instead of a shifted character stream
                    self.lex_error = Some(error.clone());
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    fn token_at(&mut self, offset: usize) -> Result<Token, Error> {
        self.fill(offset)?;
        Ok(self.tokens[self.index + offset].clone())
    }

    fn peek_kind(&mut self, offset: usize) -> Result<TokenKind, Error> {
        self.fill(offset)?;
        Ok(self.tokens[self.index + offset].kind)
    }

    fn advance(&mut self) -> Result<Token, Error> {
        let token = self.token_at(0)?;
        if token.kind != TokenKind::Eos {
            self.index += 1;
        }
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Error> {
        let token = self.token_at(0)?;
        if token.kind == kind {
            self.advance()
        } else {
            Err(self.unexpected(&token, what))
        }
    }

    fn unexpected(&self, token: &Token, what: &str) -> Error {
        Error::parse(
            format!("expected {what}, found '{token}'"),
            token.location.clone(),
        )
    }

    fn skip_newlines(&mut self) -> Result<(), Error> {
        while self.peek_kind(0)? == TokenKind::NewLine {
            self.index += 1;
        }
        Ok(())
    }

    /// Drop the consumed prefix. Only called between top-level statements,
    /// where no save point is outstanding.
    fn trim(&mut self) {
        self.tokens.drain(..self.index);
        self.index = 0;
    }

    /// A canonical placeholder for an empty slot. The token is synthesized
    /// so that trees stay equal however the slot was written.
    fn blank(origin: &Token) -> Statement {
        Statement::Blank {
            token: Token::new(TokenKind::Semicolon, ";", origin.location.clone()),
        }
    }

    // ---- program structure ----------------------------------------------

    fn parse_program(&mut self) -> Result<Vec<Statement>, Error> {
        self.skip_newlines()?;

        if self.peek_kind(0)? == TokenKind::LeftBrace {
            let saved = self.index;
            match self.parse_braced_program() {
                Ok(statements) => return Ok(statements),
                Err(_) => self.index = saved,
            }
        }

        self.parse_statements(TokenKind::Eos, false, true)
    }

    fn parse_braced_program(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let statements = self.parse_statements(TokenKind::RightBrace, false, false)?;
        self.expect(TokenKind::RightBrace, "'}'")?;

        loop {
            let token = self.token_at(0)?;
            if token.is_terminator() {
                self.advance()?;
            } else if token.kind == TokenKind::Eos {
                return Ok(statements);
            } else {
                return Err(self.unexpected(&token, "end of input"));
            }
        }
    }

    /// The statement-list workhorse shared by blocks and argument lists.
    /// `;` and `,` separate slots and empty slots become `Blank`
    /// placeholders; newline runs terminate statements without creating
    /// slots.
    fn parse_statements(
        &mut self,
        closer: TokenKind,
        args: bool,
        top: bool,
    ) -> Result<Vec<Statement>, Error> {
        let mut statements = vec![];
        let mut slot_filled = false;
        let mut pending_separator: Option<Token> = None;

        loop {
            let token = self.token_at(0)?;

            if token.kind == closer {
                if let Some(separator) = &pending_separator {
                    if !slot_filled {
                        statements.push(Self::blank(separator));
                    }
                }
                return Ok(statements);
            }

            match token.kind {
                TokenKind::Eos => {
                    return Err(Error::parse(
                        "missing closing bracket",
                        token.location.clone(),
                    ));
                }
                TokenKind::NewLine => {
                    self.advance()?;
                    slot_filled = false;
                }
                TokenKind::Semicolon | TokenKind::Comma => {
                    self.advance()?;
                    if !slot_filled && (pending_separator.is_some() || statements.is_empty()) {
                        statements.push(Self::blank(&token));
                    }
                    pending_separator = Some(token);
                    slot_filled = false;
                    if top {
                        self.trim();
                    }
                }
                _ => {
                    if slot_filled {
                        return Err(self.unexpected(&token, "';', ',' or a newline"));
                    }
                    let statement = self.parse_statement(args)?;
                    statements.push(statement);
                    slot_filled = true;
                    if top {
                        self.trim();
                    }
                }
            }
        }
    }

    // ---- statements -----------------------------------------------------

    fn parse_statement(&mut self, args: bool) -> Result<Statement, Error> {
        let token = self.token_at(0)?;

        match token.kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::Break | TokenKind::Continue => {
                self.advance()?;
                Ok(Statement::Keyword { token })
            }
            TokenKind::Remove => self.parse_remove(),
            TokenKind::Function | TokenKind::Reference => self.parse_callee(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Result => {
                let operator = self.advance()?;
                self.skip_newlines()?;
                let value = self.parse_or()?;
                Ok(Statement::Set {
                    members: vec![],
                    operator,
                    value: Box::new(value),
                })
            }
            TokenKind::Class | TokenKind::Include | TokenKind::Import | TokenKind::Super => {
                Err(Error::parse(
                    format!("'{}' is a reserved word", token.lexeme),
                    token.location.clone(),
                ))
            }
            TokenKind::Identifier | TokenKind::String => self.statement_from_element(args),
            _ if args => self.parse_or(),
            _ => Err(self.unexpected(&token, "a statement")),
        }
    }

    /// A statement opening with a name: assignment first, then a call,
    /// then (in argument lists only) a bare expression.
    fn statement_from_element(&mut self, args: bool) -> Result<Statement, Error> {
        let saved = self.index;

        let assignment_error = match self.parse_assignment() {
            Ok(statement) => return Ok(statement),
            Err(error) => {
                self.index = saved;
                error
            }
        };

        let call_error = match self.parse_call_statement() {
            Ok(statement) => return Ok(statement),
            Err(error) => {
                self.index = saved;
                error
            }
        };

        if args {
            return self.parse_or();
        }

        // report the attempt that got further
        let looked_like_call = self.peek_kind(0)? == TokenKind::Identifier
            && matches!(
                self.peek_kind(1)?,
                TokenKind::LeftParen | TokenKind::LeftBrace
            );
        Err(if looked_like_call {
            call_error
        } else {
            assignment_error
        })
    }

    fn parse_assignment(&mut self) -> Result<Statement, Error> {
        let members = self.parse_element()?;
        let operator = self.token_at(0)?;

        match operator.kind {
            TokenKind::Assign
            | TokenKind::Colon
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::TimesAssign
            | TokenKind::DivideAssign
            | TokenKind::ModuloAssign => {
                self.advance()?;
                self.skip_newlines()?;
                let value = self.parse_or()?;
                Ok(Statement::Set {
                    members,
                    operator,
                    value: Box::new(value),
                })
            }
            _ => Err(self.unexpected(&operator, "an assignment operator")),
        }
    }

    /// `name(arguments)` with an optional trailing block, or `name {...}`
    /// alone. The block is transplanted into the argument list as its last
    /// element.
    fn parse_call_statement(&mut self) -> Result<Statement, Error> {
        let name = self.expect(TokenKind::Identifier, "a function name")?;

        let mut arguments = vec![];
        let mut had_parens = false;

        if self.peek_kind(0)? == TokenKind::LeftParen {
            had_parens = true;
            self.advance()?;
            arguments = self.parse_statements(TokenKind::RightParen, true, false)?;
            self.expect(TokenKind::RightParen, "')'")?;
        }

        if self.peek_kind(0)? == TokenKind::LeftBrace {
            arguments.push(self.parse_block(BlockKind::Anonymous)?);
        } else if !had_parens {
            let token = self.token_at(0)?;
            return Err(self.unexpected(&token, "'(' or '{'"));
        }

        Ok(Statement::Call {
            name: Box::new(Statement::Identifier { token: name }),
            arguments,
        })
    }

    fn parse_return(&mut self) -> Result<Statement, Error> {
        let token = self.advance()?;
        let mut value = None;

        if self.peek_kind(0)? == TokenKind::LeftParen {
            self.advance()?;
            self.skip_newlines()?;
            if self.peek_kind(0)? == TokenKind::RightParen {
                self.advance()?;
            } else {
                value = Some(Box::new(self.parse_or()?));
                self.skip_newlines()?;
                self.expect(TokenKind::RightParen, "')'")?;
            }
        }

        Ok(Statement::Return { token, value })
    }

    fn parse_remove(&mut self) -> Result<Statement, Error> {
        let token = self.advance()?;
        self.expect(TokenKind::LeftParen, "'('")?;
        self.skip_newlines()?;
        let members = self.parse_element()?;
        self.skip_newlines()?;
        self.expect(TokenKind::RightParen, "')'")?;

        Ok(Statement::Remove { token, members })
    }

    fn parse_callee(&mut self) -> Result<Statement, Error> {
        let modifier = self.advance()?;

        let name = self.token_at(0)?;
        if name.kind != TokenKind::Identifier {
            return Err(Error::parse(
                format!("expected a function name after '{}'", modifier.lexeme),
                name.location.clone().or_else(|| modifier.location.clone()),
            ));
        }
        self.advance()?;

        let mut parameters = vec![];
        if self.peek_kind(0)? == TokenKind::LeftParen {
            self.advance()?;
            loop {
                self.skip_newlines()?;
                let token = self.token_at(0)?;
                match token.kind {
                    TokenKind::RightParen => {
                        self.advance()?;
                        break;
                    }
                    TokenKind::Comma | TokenKind::Semicolon => {
                        self.advance()?;
                    }
                    TokenKind::Function | TokenKind::Reference => {
                        self.advance()?;
                        let parameter_name = self.token_at(0)?;
                        if parameter_name.kind != TokenKind::Identifier {
                            return Err(Error::parse(
                                format!("expected a parameter name after '{}'", token.lexeme),
                                parameter_name.location.clone(),
                            ));
                        }
                        self.advance()?;
                        parameters.push(Parameter {
                            modifier: Some(token),
                            name: parameter_name,
                        });
                    }
                    TokenKind::Identifier => {
                        self.advance()?;
                        parameters.push(Parameter {
                            modifier: None,
                            name: token,
                        });
                    }
                    TokenKind::Eos => {
                        return Err(Error::parse(
                            "missing closing bracket",
                            token.location.clone(),
                        ));
                    }
                    _ => return Err(self.unexpected(&token, "a parameter")),
                }
            }
        }

        self.skip_newlines()?;
        let body = self.parse_block(BlockKind::Anonymous)?;

        Ok(Statement::Callee(Rc::new(Callee {
            name: Parameter {
                modifier: Some(modifier),
                name,
            },
            parameters,
            body,
        })))
    }

    /// `if (...) {...} elseif (...) {...} else {...}` lowered to
    /// `Call(if, [cond, block, cond, block, ..., true, else_block])`.
    fn parse_if(&mut self) -> Result<Statement, Error> {
        let if_token = self.advance()?;
        let mut arguments = vec![];

        self.parse_condition_and_block(&mut arguments)?;

        loop {
            let saved = self.index;
            self.skip_newlines()?;
            match self.peek_kind(0)? {
                TokenKind::Elseif => {
                    self.advance()?;
                    self.parse_condition_and_block(&mut arguments)?;
                }
                TokenKind::Else => {
                    let else_token = self.advance()?;
                    let block = self.parse_block(BlockKind::Limited)?;
                    arguments.push(Statement::Literal {
                        token: Token::synthetic(TokenKind::True, "true", &else_token),
                    });
                    arguments.push(block);
                    break;
                }
                _ => {
                    self.index = saved;
                    break;
                }
            }
        }

        Ok(Statement::Call {
            name: Box::new(Statement::Identifier { token: if_token }),
            arguments,
        })
    }

    fn parse_condition_and_block(&mut self, arguments: &mut Vec<Statement>) -> Result<(), Error> {
        self.expect(TokenKind::LeftParen, "'('")?;
        self.skip_newlines()?;
        let condition = self.parse_or()?;
        self.skip_newlines()?;
        self.expect(TokenKind::RightParen, "')'")?;
        let block = self.parse_block(BlockKind::Limited)?;

        arguments.push(condition);
        arguments.push(block);
        Ok(())
    }

    /// `for (init; cond; update) {...}`, `for (cond) {...}`,
    /// `for (x in iterable) {...}`, or `for {...}`, all lowered to a call
    /// whose last argument is the body block.
    fn parse_for(&mut self) -> Result<Statement, Error> {
        let for_token = self.advance()?;

        let mut arguments = match self.peek_kind(0)? {
            TokenKind::LeftParen => {
                self.advance()?;
                let arguments = self.parse_statements(TokenKind::RightParen, true, false)?;
                self.expect(TokenKind::RightParen, "')'")?;
                arguments
            }
            TokenKind::LeftBrace => vec![],
            _ => {
                let token = self.token_at(0)?;
                return Err(self.unexpected(&token, "'(' or '{'"));
            }
        };

        arguments.push(self.parse_block(BlockKind::Limited)?);

        Ok(Statement::Call {
            name: Box::new(Statement::Identifier { token: for_token }),
            arguments,
        })
    }

    fn parse_block(&mut self, kind: BlockKind) -> Result<Statement, Error> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        let values = self.parse_statements(TokenKind::RightBrace, false, false)?;
        self.expect(TokenKind::RightBrace, "'}'")?;

        Ok(Statement::Block { values, kind })
    }

    // ---- elements -------------------------------------------------------

    /// An access chain: a name or a primitive call, followed by dot
    /// members and subscripts. Returns the member list for `Get`/`Set`.
    fn parse_element(&mut self) -> Result<Vec<Statement>, Error> {
        let first = self.token_at(0)?;

        let mut members = match first.kind {
            TokenKind::Identifier => {
                self.advance()?;
                if self.peek_kind(0)? == TokenKind::LeftParen {
                    vec![self.parse_primitive_call(first)?]
                } else {
                    vec![Statement::Identifier { token: first }]
                }
            }
            // quoted keys, as in `"a": 3`
            TokenKind::String => {
                self.advance()?;
                vec![Statement::Identifier { token: first }]
            }
            _ => return Err(self.unexpected(&first, "a name")),
        };

        loop {
            match self.peek_kind(0)? {
                TokenKind::Dot => {
                    self.advance()?;
                    let member = self.token_at(0)?;
                    match member.kind {
                        TokenKind::Identifier => {
                            self.advance()?;
                            members.push(Statement::Literal {
                                token: Token::new(
                                    TokenKind::String,
                                    member.lexeme,
                                    member.location,
                                ),
                            });
                        }
                        TokenKind::Number => {
                            self.advance()?;
                            self.push_numeric_members(member, &mut members)?;
                        }
                        _ => return Err(self.unexpected(&member, "a member name")),
                    }
                }
                TokenKind::LeftBracket => {
                    self.advance()?;
                    self.skip_newlines()?;
                    let member = self.parse_or()?;
                    self.skip_newlines()?;
                    self.expect(TokenKind::RightBracket, "']'")?;
                    members.push(member);
                }
                _ => return Ok(members),
            }
        }
    }

    /// A numeric dot member. The lexer cannot know whether `0.2` after a
    /// dot is one number or two members, so the lexeme is inspected here:
    /// a single interior dot with digit-only halves splits in two.
    fn push_numeric_members(
        &mut self,
        token: Token,
        members: &mut Vec<Statement>,
    ) -> Result<(), Error> {
        let lexeme = token.lexeme.clone();

        let Some(position) = lexeme.find('.') else {
            members.push(Statement::Literal { token });
            return Ok(());
        };

        let head = &lexeme[..position];
        let tail = &lexeme[position + 1..];
        let digits = |text: &str| !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());

        if !digits(head) || !digits(tail) {
            return Err(Error::parse(
                format!("malformed member '{lexeme}'"),
                token.location.clone(),
            ));
        }

        members.push(Statement::Literal {
            token: Token::new(TokenKind::Number, head, token.location.clone()),
        });
        members.push(Statement::Literal {
            token: Token::new(TokenKind::Number, tail, token.location),
        });
        Ok(())
    }

    /// `name(arguments)`, the call form that requires parentheses.
    fn parse_primitive_call(&mut self, name: Token) -> Result<Statement, Error> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let arguments = self.parse_statements(TokenKind::RightParen, true, false)?;
        self.expect(TokenKind::RightParen, "')'")?;

        Ok(Statement::Call {
            name: Box::new(Statement::Identifier { token: name }),
            arguments,
        })
    }

    // ---- expressions ----------------------------------------------------

    fn parse_or(&mut self) -> Result<Statement, Error> {
        let mut left = self.parse_and()?;
        while self.peek_kind(0)? == TokenKind::Or {
            let operator = self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_and()?;
            left = Statement::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Statement, Error> {
        let mut left = self.parse_not()?;
        while self.peek_kind(0)? == TokenKind::And {
            let operator = self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_not()?;
            left = Statement::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// `not` is unary; the tree keeps a null literal on the left so every
    /// operation stays binary.
    fn parse_not(&mut self) -> Result<Statement, Error> {
        if self.peek_kind(0)? == TokenKind::Not {
            let operator = self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_not()?;
            let null = Statement::Literal {
                token: Token::synthetic(TokenKind::Null, "null", &operator),
            };
            return Ok(Statement::Binary {
                left: Box::new(null),
                operator,
                right: Box::new(right),
            });
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Statement, Error> {
        let mut left = self.parse_comparison()?;
        while matches!(
            self.peek_kind(0)?,
            TokenKind::Equal | TokenKind::NotEqual
        ) {
            let operator = self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_comparison()?;
            left = Statement::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Statement, Error> {
        let mut left = self.parse_additive()?;
        while matches!(
            self.peek_kind(0)?,
            TokenKind::LessThan
                | TokenKind::LessOrEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterOrEqual
                | TokenKind::In
        ) {
            let operator = self.advance()?;
            self.skip_newlines()?;
            // `x in .` asks whether x holds anything at all
            let right = if operator.kind == TokenKind::In
                && self.peek_kind(0)? == TokenKind::Dot
            {
                let dot = self.advance()?;
                Statement::Literal { token: dot }
            } else {
                self.parse_additive()?
            };
            left = Statement::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Statement, Error> {
        let mut left = self.parse_multiplicative()?;
        while matches!(self.peek_kind(0)?, TokenKind::Plus | TokenKind::Minus) {
            let operator = self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_multiplicative()?;
            left = Statement::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Statement, Error> {
        let mut left = self.parse_unary()?;
        while matches!(
            self.peek_kind(0)?,
            TokenKind::Times | TokenKind::Divide | TokenKind::Modulo
        ) {
            let operator = self.advance()?;
            self.skip_newlines()?;
            let right = self.parse_unary()?;
            left = Statement::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Statement, Error> {
        match self.peek_kind(0)? {
            // unary plus is identity
            TokenKind::Plus => {
                self.advance()?;
                self.parse_unary()
            }
            TokenKind::Minus => {
                let minus = self.advance()?;
                if self.peek_kind(0)? == TokenKind::Number {
                    let number = self.advance()?;
                    return Ok(Statement::Literal {
                        token: Token::new(
                            TokenKind::Number,
                            format!("-{}", number.lexeme),
                            minus.location.clone(),
                        ),
                    });
                }
                // lowered to (-1) * x
                let right = self.parse_unary()?;
                Ok(Statement::Binary {
                    left: Box::new(Statement::Literal {
                        token: Token::synthetic(TokenKind::Number, "-1", &minus),
                    }),
                    operator: Token::synthetic(TokenKind::Times, "*", &minus),
                    right: Box::new(right),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Statement, Error> {
        let token = self.token_at(0)?;

        match token.kind {
            TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => {
                self.advance()?;
                Ok(Statement::Literal { token })
            }
            TokenKind::LeftParen => {
                self.advance()?;
                self.skip_newlines()?;
                let group = self.parse_or()?;
                self.skip_newlines()?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(group)
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let values = self.parse_statements(TokenKind::RightBracket, true, false)?;
                self.expect(TokenKind::RightBracket, "']'")?;
                Ok(Statement::Array { values })
            }
            TokenKind::LeftBrace => self.parse_block(BlockKind::Pure),
            TokenKind::Identifier => {
                if self.matches_nonfinite_name(&token.lexeme) {
                    self.advance()?;
                    return Ok(Statement::Literal { token });
                }
                if self.implicit_assign {
                    // directly-represented JSON promotes bare names to strings
                    self.advance()?;
                    return Ok(Statement::Literal {
                        token: Token::new(TokenKind::String, token.lexeme, token.location),
                    });
                }
                let mut members = self.parse_element()?;
                if members.len() == 1 {
                    let Some(single) = members.pop() else {
                        return Err(self.unexpected(&token, "a value"));
                    };
                    Ok(single)
                } else {
                    Ok(Statement::Get { members })
                }
            }
            _ => Err(self.unexpected(&token, "a value")),
        }
    }

    fn matches_nonfinite_name(&self, lexeme: &str) -> bool {
        self.infinity.as_deref() == Some(lexeme) || self.nan.as_deref() == Some(lexeme)
    }

    // ---- directly-represented JSON ---------------------------------------

    fn parse_direct_values(&mut self) -> Result<ParseUnit, Error> {
        self.implicit_assign = true;
        let mut direct_values = vec![];

        loop {
            while self.token_at(0)?.is_terminator() {
                self.advance()?;
            }
            if self.peek_kind(0)? == TokenKind::Eos {
                break;
            }

            direct_values.push(self.parse_or()?);

            let token = self.token_at(0)?;
            if !token.is_terminator() && token.kind != TokenKind::Eos {
                return Err(self.unexpected(&token, "';', ',' or a newline"));
            }
            self.trim();
        }

        Ok(ParseUnit {
            statements: vec![],
            direct_values,
        })
    }

    // ---- JSON-only mode -------------------------------------------------

    fn parse_json_root(&mut self) -> Result<ParseUnit, Error> {
        self.skip_newlines()?;

        if self.peek_kind(0)? == TokenKind::LeftBrace {
            // a top-level object merges its members into the outer frame
            self.advance()?;
            let statements = self.parse_json_members(TokenKind::RightBrace)?;
            self.expect(TokenKind::RightBrace, "'}'")?;
            self.expect_json_end()?;
            return Ok(ParseUnit {
                statements,
                direct_values: vec![],
            });
        }

        self.implicit_assign = true;
        let value = self.parse_json_value()?;
        self.expect_json_end()?;

        Ok(ParseUnit {
            statements: vec![],
            direct_values: vec![value],
        })
    }

    fn expect_json_end(&mut self) -> Result<(), Error> {
        self.skip_newlines()?;
        let token = self.token_at(0)?;
        if token.kind == TokenKind::Eos {
            Ok(())
        } else {
            Err(self.unexpected(&token, "end of input"))
        }
    }

    fn parse_json_members(&mut self, closer: TokenKind) -> Result<Vec<Statement>, Error> {
        let mut statements = vec![];

        self.skip_newlines()?;
        if self.peek_kind(0)? == closer {
            return Ok(statements);
        }

        loop {
            self.skip_newlines()?;
            let key = self.token_at(0)?;
            match key.kind {
                TokenKind::String | TokenKind::Identifier => {
                    self.advance()?;
                }
                _ => return Err(self.unexpected(&key, "a member name")),
            }

            self.skip_newlines()?;
            let operator = self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_json_value()?;

            statements.push(Statement::Set {
                members: vec![Statement::Identifier { token: key }],
                operator,
                value: Box::new(value),
            });

            self.skip_newlines()?;
            let token = self.token_at(0)?;
            if token.kind == TokenKind::Comma {
                self.advance()?;
                self.skip_newlines()?;
                if self.peek_kind(0)? == closer {
                    return Ok(statements);
                }
            } else if token.kind == closer {
                return Ok(statements);
            } else {
                return Err(self.unexpected(&token, "',' or '}'"));
            }
        }
    }

    fn parse_json_value(&mut self) -> Result<Statement, Error> {
        self.skip_newlines()?;
        let token = self.token_at(0)?;

        match token.kind {
            TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => {
                self.advance()?;
                Ok(Statement::Literal { token })
            }
            TokenKind::Minus => {
                let minus = self.advance()?;
                let next = self.token_at(0)?;
                if next.kind == TokenKind::Number {
                    self.advance()?;
                    return Ok(Statement::Literal {
                        token: Token::new(
                            TokenKind::Number,
                            format!("-{}", next.lexeme),
                            minus.location.clone(),
                        ),
                    });
                }
                if next.kind == TokenKind::Identifier && self.matches_nonfinite_name(&next.lexeme)
                {
                    self.advance()?;
                    return Ok(Statement::Binary {
                        left: Box::new(Statement::Literal {
                            token: Token::synthetic(TokenKind::Number, "-1", &minus),
                        }),
                        operator: Token::synthetic(TokenKind::Times, "*", &minus),
                        right: Box::new(Statement::Literal { token: next }),
                    });
                }
                Err(self.unexpected(&next, "a number"))
            }
            TokenKind::Identifier if self.matches_nonfinite_name(&token.lexeme) => {
                self.advance()?;
                Ok(Statement::Literal { token })
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let mut values = vec![];
                self.skip_newlines()?;
                if self.peek_kind(0)? == TokenKind::RightBracket {
                    self.advance()?;
                    return Ok(Statement::Array { values });
                }
                loop {
                    values.push(self.parse_json_value()?);
                    self.skip_newlines()?;
                    let next = self.token_at(0)?;
                    match next.kind {
                        TokenKind::Comma => {
                            self.advance()?;
                            self.skip_newlines()?;
                            if self.peek_kind(0)? == TokenKind::RightBracket {
                                self.advance()?;
                                return Ok(Statement::Array { values });
                            }
                        }
                        TokenKind::RightBracket => {
                            self.advance()?;
                            return Ok(Statement::Array { values });
                        }
                        _ => return Err(self.unexpected(&next, "',' or ']'")),
                    }
                }
            }
            TokenKind::LeftBrace => {
                self.advance()?;
                let values = self.parse_json_members(TokenKind::RightBrace)?;
                self.expect(TokenKind::RightBrace, "'}'")?;
                Ok(Statement::Block {
                    values,
                    kind: BlockKind::Pure,
                })
            }
            _ => Err(self.unexpected(&token, "a JSON value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseUnit {
        Parser::new(source, "test", &Config::default())
            .parse()
            .expect("parse failed")
    }

    fn parse_error(source: &str) -> Error {
        Parser::new(source, "test", &Config::default())
            .parse()
            .expect_err("parse should fail")
    }

    fn token(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None)
    }

    fn identifier(name: &str) -> Statement {
        Statement::Identifier {
            token: token(TokenKind::Identifier, name),
        }
    }

    fn number(lexeme: &str) -> Statement {
        Statement::Literal {
            token: token(TokenKind::Number, lexeme),
        }
    }

    #[test]
    fn test_parse_assignment() {
        let unit = parse("a = 3");

        assert_eq!(
            unit.statements,
            vec![Statement::Set {
                members: vec![identifier("a")],
                operator: token(TokenKind::Assign, "="),
                value: Box::new(number("3")),
            }]
        );
    }

    #[test]
    fn test_parse_colon_assignment_with_expression() {
        let unit = parse("a: 3, b: a + 1");

        assert_eq!(unit.statements.len(), 2);
        let Statement::Set { value, .. } = &unit.statements[1] else {
            panic!("expected a set statement");
        };
        assert_eq!(
            value.as_ref(),
            &Statement::Binary {
                left: Box::new(identifier("a")),
                operator: token(TokenKind::Plus, "+"),
                right: Box::new(number("1")),
            }
        );
    }

    #[test]
    fn test_outer_braces_are_optional() {
        assert_eq!(parse("{a: 1}").statements, parse("a: 1").statements);
    }

    #[test]
    fn test_blank_slots_are_preserved() {
        let unit = parse("for(;;) {}");

        let Statement::Call { arguments, .. } = &unit.statements[0] else {
            panic!("expected a call");
        };
        assert_eq!(arguments.len(), 4);
        assert!(matches!(arguments[0], Statement::Blank { .. }));
        assert!(matches!(arguments[1], Statement::Blank { .. }));
        assert!(matches!(arguments[2], Statement::Blank { .. }));
        assert!(matches!(
            arguments[3],
            Statement::Block {
                kind: BlockKind::Limited,
                ..
            }
        ));
    }

    #[test]
    fn test_if_lowering_inserts_true_before_else() {
        let unit = parse("if (a < 1) {b: 1} else {b: 2}");

        let Statement::Call { name, arguments } = &unit.statements[0] else {
            panic!("expected a call");
        };
        assert_eq!(name.as_ref(), &identifier("if"));
        assert_eq!(arguments.len(), 4);
        assert_eq!(
            arguments[2],
            Statement::Literal {
                token: token(TokenKind::True, "true")
            }
        );
    }

    #[test]
    fn test_for_in_keeps_binary_form() {
        let unit = parse("for (v in [1, 2]) {}");

        let Statement::Call { arguments, .. } = &unit.statements[0] else {
            panic!("expected a call");
        };
        assert_eq!(arguments.len(), 2);
        let Statement::Binary { operator, .. } = &arguments[0] else {
            panic!("expected the in-binary");
        };
        assert_eq!(operator.kind, TokenKind::In);
    }

    #[test]
    fn test_element_chain() {
        let unit = parse("x = a.b[2]");

        let Statement::Set { value, .. } = &unit.statements[0] else {
            panic!("expected a set statement");
        };
        assert_eq!(
            value.as_ref(),
            &Statement::Get {
                members: vec![
                    identifier("a"),
                    Statement::Literal {
                        token: token(TokenKind::String, "b")
                    },
                    number("2"),
                ],
            }
        );
    }

    #[test]
    fn test_numeric_dot_member_splits() {
        let unit = parse("x = f.0.2");

        let Statement::Set { value, .. } = &unit.statements[0] else {
            panic!("expected a set statement");
        };
        assert_eq!(
            value.as_ref(),
            &Statement::Get {
                members: vec![identifier("f"), number("0"), number("2")],
            }
        );
    }

    #[test]
    fn test_malformed_numeric_member() {
        let error = parse_error("x = f.0.2e3 =");
        assert!(error.message().contains("malformed member"));
    }

    #[test]
    fn test_unary_minus_lowers_to_multiplication() {
        let unit = parse("a = -b");

        let Statement::Set { value, .. } = &unit.statements[0] else {
            panic!("expected a set statement");
        };
        assert_eq!(
            value.as_ref(),
            &Statement::Binary {
                left: Box::new(number("-1")),
                operator: token(TokenKind::Times, "*"),
                right: Box::new(identifier("b")),
            }
        );
    }

    #[test]
    fn test_direct_value_fallback() {
        let unit = parse("3");

        assert!(unit.statements.is_empty());
        assert_eq!(unit.direct_values, vec![number("3")]);
    }

    #[test]
    fn test_direct_values_promote_identifiers() {
        let unit = parse("dog, cat");

        assert_eq!(
            unit.direct_values,
            vec![
                Statement::Literal {
                    token: token(TokenKind::String, "dog")
                },
                Statement::Literal {
                    token: token(TokenKind::String, "cat")
                },
            ]
        );
    }

    #[test]
    fn test_callee_with_modified_parameter() {
        let unit = parse("function f(a, reference b) { return(a) }");

        let Statement::Callee(callee) = &unit.statements[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(callee.name.name.lexeme, "f");
        assert_eq!(callee.parameters.len(), 2);
        assert_eq!(callee.parameters[0].modifier, None);
        assert_eq!(
            callee.parameters[1].modifier,
            Some(token(TokenKind::Reference, "reference"))
        );
    }

    #[test]
    fn test_trailing_block_becomes_last_argument() {
        let unit = parse("foo(1) { a: 2 }");

        let Statement::Call { arguments, .. } = &unit.statements[0] else {
            panic!("expected a call");
        };
        assert_eq!(arguments.len(), 2);
        assert!(matches!(
            arguments[1],
            Statement::Block {
                kind: BlockKind::Anonymous,
                ..
            }
        ));
    }

    #[test]
    fn test_reserved_words_rejected() {
        let error = parse_error("class Foo {}");
        assert!(error.message().contains("reserved"));
    }

    #[test]
    fn test_missing_bracket() {
        let error = parse_error("a = [1, 2");
        assert!(error.message().contains("missing closing bracket"));
    }

    #[test]
    fn test_json_mode_rejects_script() {
        let config = Config::new().with_only_json(true);
        let error = Parser::new("{\"a\": 1 + 2}", "test", &config)
            .parse()
            .expect_err("script features must fail in JSON mode");
        assert!(matches!(error, Error::Parse { .. }));
    }

    #[test]
    fn test_json_mode_object() {
        let config = Config::new().with_only_json(true);
        let unit = Parser::new("{\"a\": [1, 2], \"b\": {\"c\": null}}", "test", &config)
            .parse()
            .expect("valid json");

        assert_eq!(unit.statements.len(), 2);
        assert!(unit.direct_values.is_empty());
    }

    #[test]
    fn test_json_mode_direct_scalar() {
        let config = Config::new().with_only_json(true);
        let unit = Parser::new("-12.5", "test", &config)
            .parse()
            .expect("valid json");

        assert_eq!(unit.direct_values, vec![number("-12.5")]);
    }

    #[test]
    fn test_nonfinite_names_need_config() {
        let config = Config::new().with_infinity("Infinity");
        let unit = Parser::new("a = Infinity", "test", &config)
            .parse()
            .expect("spelled infinity should parse");
        let Statement::Set { value, .. } = &unit.statements[0] else {
            panic!("expected a set statement");
        };
        assert_eq!(
            value.as_ref(),
            &Statement::Literal {
                token: token(TokenKind::Identifier, "Infinity")
            }
        );
    }

    #[test]
    fn test_lex_errors_propagate() {
        let error = parse_error("a = 'unterminated");
        assert!(matches!(error, Error::Lex { .. }));
    }

    #[test]
    fn test_print_then_reparse_keeps_tree() {
        let sources = [
            "a = 3",
            "a: [1, 2, {b: 'x'}]",
            "if (a < 1) {b: 1} elseif (a < 2) {b: 2} else {b: 3}",
            "for (i = 0; i < 5; i += 1) {total += i}",
            "for (v in z) {out += v}",
            "for (;;) {break}",
            "function f(a, reference b) { return(a + b.0) }",
            "x = not a or b and c",
            "y = -z",
            "remove(a.b[1])",
            ":= a.b",
        ];

        for source in sources {
            let first = parse(source);
            let printed = first
                .statements
                .iter()
                .map(|statement| statement.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            let second = parse(&printed);
            assert_eq!(first.statements, second.statements, "source: {source}");
        }
    }
}
