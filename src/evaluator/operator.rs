//! Binary operator application and coercions.
//!
//! `+` is the only polymorphic operator: numbers add, strings and
//! sequences concatenate, mappings merge with the right side winning.
//! The rest are numeric (or string for ordering comparisons). Integer
//! arithmetic that overflows falls back to the float result.

use crate::config::Config;
use crate::error::{Error, Location};
use crate::lexer::{Token, TokenKind};
use crate::value::Value;

pub(crate) fn apply(
    operator: &Token,
    left: Value,
    right: Value,
    config: &Config,
    location: Option<Location>,
) -> Result<Value, Error> {
    match operator.kind {
        TokenKind::Plus => add(left, right, config, location),
        TokenKind::Minus => subtract(left, right, location),
        TokenKind::Times => multiply(left, right, location),
        TokenKind::Divide => divide(left, right, location),
        TokenKind::Modulo => modulo(left, right, location),
        TokenKind::Equal => Ok(Value::Bool(left == right)),
        TokenKind::NotEqual => Ok(Value::Bool(left != right)),
        TokenKind::LessThan
        | TokenKind::LessOrEqual
        | TokenKind::GreaterThan
        | TokenKind::GreaterOrEqual => compare(operator.kind, left, right, location),
        _ => Err(Error::evaluate(
            format!("unsupported operator '{}'", operator.lexeme),
            location,
        )),
    }
}

/// The arithmetic behind a compound assignment operator.
pub(crate) fn apply_compound(
    operator: &Token,
    left: Value,
    right: Value,
    config: &Config,
    location: Option<Location>,
) -> Result<Value, Error> {
    match operator.kind {
        TokenKind::PlusAssign => add(left, right, config, location),
        TokenKind::MinusAssign => subtract(left, right, location),
        TokenKind::TimesAssign => multiply(left, right, location),
        TokenKind::DivideAssign => divide(left, right, location),
        TokenKind::ModuloAssign => modulo(left, right, location),
        _ => Err(Error::evaluate(
            format!("unsupported operator '{}'", operator.lexeme),
            location,
        )),
    }
}

fn type_error(
    verb: &str,
    left: &Value,
    right: &Value,
    location: Option<Location>,
) -> Error {
    Error::evaluate(
        format!(
            "cannot {} {} and {}",
            verb,
            left.type_name(),
            right.type_name()
        ),
        location,
    )
}

fn ensure_size(length: usize, config: &Config, location: Option<Location>) -> Result<(), Error> {
    if length > config.max_array_size {
        return Err(Error::evaluate(
            format!(
                "size of array or object exceeds the limit {}",
                config.max_array_size
            ),
            location,
        ));
    }
    Ok(())
}

fn add(
    left: Value,
    right: Value,
    config: &Config,
    location: Option<Location>,
) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(l
            .checked_add(r)
            .map(Value::Int)
            .unwrap_or(Value::Float(l as f64 + r as f64))),
        (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 + r)),
        (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l + r as f64)),
        (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l + r)),
        (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
        (Value::Array(mut l), Value::Array(r)) => {
            l.extend(r);
            ensure_size(l.len(), config, location)?;
            Ok(Value::Array(l))
        }
        (Value::Object(mut l), Value::Object(r)) => {
            // the right side wins on key collisions
            for (key, value) in r {
                l.insert(key, value);
            }
            ensure_size(l.len(), config, location)?;
            Ok(Value::Object(l))
        }
        (l, r) => Err(type_error("add", &l, &r, location)),
    }
}

fn subtract(left: Value, right: Value, location: Option<Location>) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(l
            .checked_sub(r)
            .map(Value::Int)
            .unwrap_or(Value::Float(l as f64 - r as f64))),
        (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 - r)),
        (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l - r as f64)),
        (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l - r)),
        (l, r) => Err(type_error("subtract", &l, &r, location)),
    }
}

fn multiply(left: Value, right: Value, location: Option<Location>) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(l
            .checked_mul(r)
            .map(Value::Int)
            .unwrap_or(Value::Float(l as f64 * r as f64))),
        (Value::Int(l), Value::Float(r)) => Ok(Value::Float(l as f64 * r)),
        (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l * r as f64)),
        (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l * r)),
        (l, r) => Err(type_error("multiply", &l, &r, location)),
    }
}

/// Integer division with a non-zero remainder promotes to float.
fn divide(left: Value, right: Value, location: Option<Location>) -> Result<Value, Error> {
    let zero_division = || Error::evaluate("division by zero", location.clone());

    match (left, right) {
        (Value::Int(l), Value::Int(r)) => {
            if r == 0 {
                return Err(zero_division());
            }
            match (l.checked_div(r), l.checked_rem(r)) {
                (Some(quotient), Some(0)) => Ok(Value::Int(quotient)),
                _ => Ok(Value::Float(l as f64 / r as f64)),
            }
        }
        (Value::Int(l), Value::Float(r)) => {
            if r == 0.0 {
                return Err(zero_division());
            }
            Ok(Value::Float(l as f64 / r))
        }
        (Value::Float(l), Value::Int(r)) => {
            if r == 0 {
                return Err(zero_division());
            }
            Ok(Value::Float(l / r as f64))
        }
        (Value::Float(l), Value::Float(r)) => {
            if r == 0.0 {
                return Err(zero_division());
            }
            Ok(Value::Float(l / r))
        }
        (l, r) => Err(type_error("divide", &l, &r, location)),
    }
}

fn modulo(left: Value, right: Value, location: Option<Location>) -> Result<Value, Error> {
    let zero_division = || Error::evaluate("division by zero", location.clone());

    match (left, right) {
        (Value::Int(l), Value::Int(r)) => {
            if r == 0 {
                return Err(zero_division());
            }
            Ok(l.checked_rem(r).map(Value::Int).unwrap_or(Value::Int(0)))
        }
        (Value::Int(l), Value::Float(r)) => {
            if r == 0.0 {
                return Err(zero_division());
            }
            Ok(Value::Float(l as f64 % r))
        }
        (Value::Float(l), Value::Int(r)) => {
            if r == 0 {
                return Err(zero_division());
            }
            Ok(Value::Float(l % r as f64))
        }
        (Value::Float(l), Value::Float(r)) => {
            if r == 0.0 {
                return Err(zero_division());
            }
            Ok(Value::Float(l % r))
        }
        (l, r) => Err(type_error("divide", &l, &r, location)),
    }
}

fn compare(
    kind: TokenKind,
    left: Value,
    right: Value,
    location: Option<Location>,
) -> Result<Value, Error> {
    let ordering = match (&left, &right) {
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        _ => match (left.as_number(), right.as_number()) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => return Err(type_error("compare", &left, &right, location)),
        },
    };

    // an unordered comparison (NaN) is simply false
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };

    let result = match kind {
        TokenKind::LessThan => ordering.is_lt(),
        TokenKind::LessOrEqual => ordering.is_le(),
        TokenKind::GreaterThan => ordering.is_gt(),
        TokenKind::GreaterOrEqual => ordering.is_ge(),
        _ => false,
    };
    Ok(Value::Bool(result))
}

/// `left in right` membership: element of a sequence, key of a mapping,
/// substring of a string.
pub(crate) fn membership(
    left: Value,
    right: Value,
    location: Option<Location>,
) -> Result<Value, Error> {
    match right {
        Value::Array(values) => Ok(Value::Bool(values.iter().any(|value| *value == left))),
        Value::Object(members) => {
            let found = match left {
                Value::Str(key) => members.contains_key(&key),
                _ => false,
            };
            Ok(Value::Bool(found))
        }
        Value::Str(text) => match left {
            Value::Str(needle) => Ok(Value::Bool(text.contains(&needle))),
            l => Err(Error::evaluate(
                format!("cannot search for {} in a string", l.type_name()),
                location,
            )),
        },
        r => Err(Error::evaluate(
            format!("'in' needs a container or string, not {}", r.type_name()),
            location,
        )),
    }
}

/// `left in .`: does the value hold anything at all.
pub(crate) fn any_member(value: Value, location: Option<Location>) -> Result<Value, Error> {
    match value {
        Value::Str(s) => Ok(Value::Bool(!s.is_empty())),
        Value::Array(values) => Ok(Value::Bool(!values.is_empty())),
        Value::Object(members) => Ok(Value::Bool(!members.is_empty())),
        v => Err(Error::evaluate(
            format!("'in .' needs a container or string, not {}", v.type_name()),
            location,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None)
    }

    fn apply_default(kind: TokenKind, lexeme: &str, left: Value, right: Value) -> Result<Value, Error> {
        apply(&token(kind, lexeme), left, right, &Config::default(), None)
    }

    #[test]
    fn test_add_promotes_mixed_numbers() {
        assert_eq!(
            apply_default(TokenKind::Plus, "+", Value::Int(1), Value::Int(2)),
            Ok(Value::Int(3))
        );
        assert_eq!(
            apply_default(TokenKind::Plus, "+", Value::Int(1), Value::Float(0.5)),
            Ok(Value::Float(1.5))
        );
    }

    #[test]
    fn test_add_concatenates_and_merges() {
        assert_eq!(
            apply_default(
                TokenKind::Plus,
                "+",
                Value::Str("ab".into()),
                Value::Str("c".into())
            ),
            Ok(Value::Str("abc".into()))
        );

        let merged = apply_default(
            TokenKind::Plus,
            "+",
            Value::Object([("a".to_string(), Value::Int(1))].into_iter().collect()),
            Value::Object([("a".to_string(), Value::Int(9))].into_iter().collect()),
        );
        assert_eq!(
            merged,
            Ok(Value::Object(
                [("a".to_string(), Value::Int(9))].into_iter().collect()
            ))
        );
    }

    #[test]
    fn test_add_rejects_mixed_domains() {
        assert!(apply_default(
            TokenKind::Plus,
            "+",
            Value::Str("a".into()),
            Value::Int(3)
        )
        .is_err());
    }

    #[test]
    fn test_integer_division_promotes_on_remainder() {
        assert_eq!(
            apply_default(TokenKind::Divide, "/", Value::Int(6), Value::Int(3)),
            Ok(Value::Int(2))
        );
        assert_eq!(
            apply_default(TokenKind::Divide, "/", Value::Int(7), Value::Int(2)),
            Ok(Value::Float(3.5))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert!(apply_default(TokenKind::Divide, "/", Value::Int(1), Value::Int(0)).is_err());
        assert!(
            apply_default(TokenKind::Divide, "/", Value::Float(1.0), Value::Float(0.0)).is_err()
        );
        assert!(apply_default(TokenKind::Modulo, "%", Value::Int(1), Value::Int(0)).is_err());
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        assert_eq!(
            apply_default(TokenKind::Plus, "+", Value::Int(i64::MAX), Value::Int(1)),
            Ok(Value::Float(i64::MAX as f64 + 1.0))
        );
    }

    #[test]
    fn test_compare_strings_and_numbers() {
        assert_eq!(
            apply_default(
                TokenKind::LessThan,
                "<",
                Value::Str("abc".into()),
                Value::Str("abd".into())
            ),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply_default(TokenKind::GreaterOrEqual, ">=", Value::Int(2), Value::Float(2.0)),
            Ok(Value::Bool(true))
        );
        assert!(apply_default(TokenKind::LessThan, "<", Value::Int(1), Value::Str("a".into()))
            .is_err());
    }

    #[test]
    fn test_membership() {
        assert_eq!(
            membership(
                Value::Int(2),
                Value::Array(vec![Value::Int(1), Value::Int(2)]),
                None
            ),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            membership(
                Value::Str("a".into()),
                Value::Object([("a".to_string(), Value::Int(1))].into_iter().collect()),
                None
            ),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            membership(Value::Str("bc".into()), Value::Str("abcd".into()), None),
            Ok(Value::Bool(true))
        );
        assert!(membership(Value::Int(1), Value::Int(2), None).is_err());
    }

    #[test]
    fn test_any_member() {
        assert_eq!(
            any_member(Value::Array(vec![Value::Int(1)]), None),
            Ok(Value::Bool(true))
        );
        assert_eq!(any_member(Value::Str(String::new()), None), Ok(Value::Bool(false)));
        assert!(any_member(Value::Int(1), None).is_err());
    }
}
