//! # Ast
//!
//! The closed set of statement variants produced by the parser (plus the
//! `Loop` form the evaluator lowers `for` calls into). Nodes are immutable
//! after parse; the evaluator walks them by reference.
//!
//! `Display` prints source text that parses back into an equal tree, which
//! is what makes printed programs round-trip.

use std::fmt;
use std::rc::Rc;

use crate::error::Location;
use crate::lexer::{Token, TokenKind, KEYWORDS};
use crate::value::{write_json_escaped, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// number / string / bool / null literal
    Literal { token: Token },
    /// variable reference
    Identifier { token: Token },
    /// `break` / `continue` marker
    Keyword { token: Token },
    /// placeholder for an empty `;`/`,` slot
    Blank { token: Token },
    /// infix operation; for `not`, `left` is a null literal
    Binary {
        left: Box<Statement>,
        operator: Token,
        right: Box<Statement>,
    },
    /// `[ ... ]` literal or argument list
    Array { values: Vec<Statement> },
    /// `{ ... }`
    Block {
        values: Vec<Statement>,
        kind: BlockKind,
    },
    /// function definition
    Callee(Rc<Callee>),
    /// function invocation (`if`/`for` arrive here lowered to calls)
    Call {
        name: Box<Statement>,
        arguments: Vec<Statement>,
    },
    /// lowered `for` form, produced by the evaluator
    Loop(Box<Loop>),
    /// read access chain
    Get { members: Vec<Statement> },
    /// write to a chain; empty `members` targets the result-value (`:=`)
    Set {
        members: Vec<Statement>,
        operator: Token,
        value: Box<Statement>,
    },
    /// deletion of a name or chain element
    Remove {
        token: Token,
        members: Vec<Statement>,
    },
    /// function return with optional value
    Return {
        token: Token,
        value: Option<Box<Statement>>,
    },
    /// host-supplied binding fed as if by assignment
    Injection {
        variable: String,
        value: Value,
        location: Option<Location>,
    },
    /// literal host value, already evaluated
    Value {
        value: Value,
        location: Option<Location>,
    },
}

/// Scope behavior of a block. `limited` bodies (the `if` family and `for`)
/// share the enclosing frame; `class` exists in the model but the grammar
/// never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Anonymous,
    Pure,
    Limited,
    Class,
}

/// A formal parameter, optionally modified with `function` or `reference`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub modifier: Option<Token>,
    pub name: Token,
}

/// A function definition: `function name(parameters) { body }`.
/// `name.modifier` holds the defining keyword (`function` or `reference`).
#[derive(Debug, Clone, PartialEq)]
pub struct Callee {
    pub name: Parameter,
    pub parameters: Vec<Parameter>,
    pub body: Statement,
}

/// The executable shape of a loop. `continuous` holds the guard first and
/// the update statements after it; `each`/`iterator` carry the
/// `for (x in ...)` form.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub call: Statement,
    pub initial: Vec<Statement>,
    pub continuous: Vec<Statement>,
    pub statements: Vec<Statement>,
    pub each: Option<Token>,
    pub iterator: Option<Statement>,
}

impl Statement {
    /// The most specific location available for error reporting.
    pub fn location(&self) -> Option<Location> {
        match self {
            Statement::Literal { token }
            | Statement::Identifier { token }
            | Statement::Keyword { token }
            | Statement::Blank { token } => token.location.clone(),
            Statement::Binary { left, operator, .. } => {
                operator.location.clone().or_else(|| left.location())
            }
            Statement::Array { values } => values.first().and_then(Statement::location),
            Statement::Block { values, .. } => values.first().and_then(Statement::location),
            Statement::Callee(callee) => callee.name.name.location.clone(),
            Statement::Call { name, .. } => name.location(),
            Statement::Loop(lowered) => lowered.call.location(),
            Statement::Get { members } => members.first().and_then(Statement::location),
            Statement::Set {
                members, operator, ..
            } => members
                .first()
                .and_then(Statement::location)
                .or_else(|| operator.location.clone()),
            Statement::Remove { token, .. } => token.location.clone(),
            Statement::Return { token, .. } => token.location.clone(),
            Statement::Injection { location, .. } | Statement::Value { location, .. } => {
                location.clone()
            }
        }
    }
}

/// A dot is printable for a member that looks like a plain name; anything
/// else goes through subscript syntax.
fn is_identifier_shaped(lexeme: &str) -> bool {
    let mut chars = lexeme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !KEYWORDS.contains_key(lexeme)
}

fn write_members(f: &mut fmt::Formatter<'_>, members: &[Statement]) -> fmt::Result {
    for (i, member) in members.iter().enumerate() {
        if i == 0 {
            write!(f, "{member}")?;
            continue;
        }
        match member {
            Statement::Literal { token }
                if token.kind == TokenKind::String && is_identifier_shaped(&token.lexeme) =>
            {
                write!(f, ".{}", token.lexeme)?;
            }
            _ => write!(f, "[{member}]")?,
        }
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let mut out = String::new();
    write_json_escaped(&mut out, text);
    f.write_str(&out)
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(modifier) = &self.modifier {
            write!(f, "{} ", modifier.lexeme)?;
        }
        f.write_str(&self.name.lexeme)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Literal { token } => match token.kind {
                TokenKind::String => write_quoted(f, &token.lexeme),
                _ => f.write_str(&token.lexeme),
            },
            Statement::Identifier { token } => match token.kind {
                TokenKind::String => write_quoted(f, &token.lexeme),
                _ => f.write_str(&token.lexeme),
            },
            Statement::Keyword { token } => f.write_str(&token.lexeme),
            Statement::Blank { .. } => Ok(()),
            Statement::Binary {
                left,
                operator,
                right,
            } => {
                if operator.kind == TokenKind::Not {
                    return write!(f, "not {right}");
                }
                // the parse-time lowering of unary minus
                if operator.kind == TokenKind::Times {
                    if let Statement::Literal { token } = left.as_ref() {
                        if token.lexeme == "-1" {
                            return write!(f, "-{right}");
                        }
                    }
                }
                write!(f, "({left} {} {right})", operator.lexeme)
            }
            Statement::Array { values } => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Statement::Block { values, .. } => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("}")
            }
            Statement::Callee(callee) => {
                write!(f, "{}(", callee.name)?;
                for (i, parameter) in callee.parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{parameter}")?;
                }
                write!(f, ") {}", callee.body)
            }
            Statement::Call { name, arguments } => {
                if let Statement::Identifier { token } = name.as_ref() {
                    match token.kind {
                        TokenKind::If => return write_if(f, arguments),
                        TokenKind::For => return write_for(f, arguments),
                        _ => {}
                    }
                }
                let trailing_block = matches!(
                    arguments.last(),
                    Some(Statement::Block {
                        kind: BlockKind::Anonymous,
                        ..
                    })
                );
                let inline = if trailing_block {
                    &arguments[..arguments.len() - 1]
                } else {
                    &arguments[..]
                };
                write!(f, "{name}(")?;
                for (i, argument) in inline.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(")")?;
                if trailing_block {
                    if let Some(block) = arguments.last() {
                        write!(f, " {block}")?;
                    }
                }
                Ok(())
            }
            Statement::Loop(lowered) => write!(f, "{}", lowered.call),
            Statement::Get { members } => write_members(f, members),
            Statement::Set {
                members,
                operator,
                value,
            } => {
                if members.is_empty() {
                    return write!(f, ":= {value}");
                }
                write_members(f, members)?;
                write!(f, " {} {value}", operator.lexeme)
            }
            Statement::Remove { members, .. } => {
                f.write_str("remove(")?;
                write_members(f, members)?;
                f.write_str(")")
            }
            Statement::Return { value, .. } => match value {
                Some(value) => write!(f, "return({value})"),
                None => f.write_str("return"),
            },
            Statement::Injection {
                variable, value, ..
            } => write!(f, "{variable} = {value}"),
            Statement::Value { value, .. } => write!(f, "{value}"),
        }
    }
}

/// Re-sugar a lowered `if` call: condition/block pairs, with a final
/// `true` condition printed as `else`.
fn write_if(f: &mut fmt::Formatter<'_>, arguments: &[Statement]) -> fmt::Result {
    let mut pairs = arguments.chunks_exact(2).peekable();
    let mut first = true;
    while let Some(pair) = pairs.next() {
        let condition = &pair[0];
        let block = &pair[1];
        if first {
            write!(f, "if ({condition}) {block}")?;
            first = false;
            continue;
        }
        let is_else = pairs.peek().is_none()
            && matches!(
                condition,
                Statement::Literal { token } if token.kind == TokenKind::True
            );
        if is_else {
            write!(f, " else {block}")?;
        } else {
            write!(f, " elseif ({condition}) {block}")?;
        }
    }
    Ok(())
}

fn write_for(f: &mut fmt::Formatter<'_>, arguments: &[Statement]) -> fmt::Result {
    let Some((body, rest)) = arguments.split_last() else {
        return f.write_str("for ()");
    };
    match rest.len() {
        0 => write!(f, "for () {body}"),
        1 => write!(f, "for ({}) {body}", rest[0]),
        3 => write!(f, "for ({}; {}; {}) {body}", rest[0], rest[1], rest[2]),
        _ => {
            f.write_str("for (")?;
            for (i, argument) in rest.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{argument}")?;
            }
            write!(f, ") {body}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None)
    }

    #[test]
    fn test_display_literal() {
        let number = Statement::Literal {
            token: token(TokenKind::Number, "3.25"),
        };
        assert_eq!(number.to_string(), "3.25");

        let text = Statement::Literal {
            token: token(TokenKind::String, "a\"b"),
        };
        assert_eq!(text.to_string(), r#""a\"b""#);
    }

    #[test]
    fn test_display_binary() {
        let sum = Statement::Binary {
            left: Box::new(Statement::Identifier {
                token: token(TokenKind::Identifier, "a"),
            }),
            operator: token(TokenKind::Plus, "+"),
            right: Box::new(Statement::Literal {
                token: token(TokenKind::Number, "2"),
            }),
        };
        assert_eq!(sum.to_string(), "(a + 2)");
    }

    #[test]
    fn test_display_negation_lowering() {
        let negated = Statement::Binary {
            left: Box::new(Statement::Literal {
                token: token(TokenKind::Number, "-1"),
            }),
            operator: token(TokenKind::Times, "*"),
            right: Box::new(Statement::Identifier {
                token: token(TokenKind::Identifier, "x"),
            }),
        };
        assert_eq!(negated.to_string(), "-x");
    }

    #[test]
    fn test_display_members() {
        let chain = Statement::Get {
            members: vec![
                Statement::Identifier {
                    token: token(TokenKind::Identifier, "a"),
                },
                Statement::Literal {
                    token: token(TokenKind::String, "b"),
                },
                Statement::Literal {
                    token: token(TokenKind::Number, "0"),
                },
            ],
        };
        assert_eq!(chain.to_string(), "a.b[0]");
    }

    #[test]
    fn test_display_set() {
        let set = Statement::Set {
            members: vec![Statement::Identifier {
                token: token(TokenKind::Identifier, "a"),
            }],
            operator: token(TokenKind::Colon, ":"),
            value: Box::new(Statement::Literal {
                token: token(TokenKind::Number, "3"),
            }),
        };
        assert_eq!(set.to_string(), "a : 3");
    }

    #[test]
    fn test_display_result_set() {
        let set = Statement::Set {
            members: vec![],
            operator: token(TokenKind::Result, ":="),
            value: Box::new(Statement::Literal {
                token: token(TokenKind::Number, "3"),
            }),
        };
        assert_eq!(set.to_string(), ":= 3");
    }
}
