//! # Value
//!
//! The dynamic, JSON-compatible value model. Numbers are kept as `i64`
//! when the literal has no fractional or exponent part and fits, otherwise
//! as `f64`; mappings preserve insertion order. Callables are values too,
//! carrying an optional captured frame (closure) and a reference flag.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::Config;
use crate::environment::EnvRef;
use crate::parser::ast::Callee;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Function(FunctionValue),
}

/// A callable value: a scripted function definition or a standard-library
/// builtin. `environment` is the defining frame when the definition was
/// captured as a closure. `is_reference` marks values that were bound to a
/// further name (or defined with the `reference` modifier); only those
/// survive the public projection of a scope.
#[derive(Clone)]
pub struct FunctionValue {
    pub kind: FunctionKind,
    pub environment: Option<EnvRef>,
    pub is_reference: bool,
}

// The captured frame is skipped: a closure stored inside the frame it
// captured would make the derived impl recurse forever.
impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("kind", &self.kind)
            .field("captures", &self.environment.is_some())
            .field("is_reference", &self.is_reference)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum FunctionKind {
    Script(Rc<Callee>),
    Builtin(&'static str),
}

impl FunctionValue {
    /// The same callable, marked as a reference. Used when a callable is
    /// assigned to a new name or bound to a `function` parameter.
    pub fn as_reference(&self) -> FunctionValue {
        FunctionValue {
            kind: self.kind.clone(),
            environment: self.environment.clone(),
            is_reference: true,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            FunctionKind::Script(callee) => &callee.name.name.lexeme,
            FunctionKind::Builtin(name) => name,
        }
    }
}

impl Value {
    /// null, false, zero, the empty string, and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(values) => !values.is_empty(),
            Value::Object(members) => !members.is_empty(),
            Value::Function(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// JSON text for this value, honoring the configured Infinity/NaN
    /// spellings. Without a spelling a non-finite number becomes `null`.
    pub fn to_json_string(&self, config: &Config) -> String {
        let mut text = String::new();
        self.write_json(&mut text, config);
        text
    }

    fn write_json(&self, out: &mut String, config: &Config) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(n) => {
                if n.is_nan() {
                    match &config.nan {
                        Some(spelling) => out.push_str(spelling),
                        None => out.push_str("null"),
                    }
                } else if n.is_infinite() {
                    match &config.infinity {
                        Some(spelling) => {
                            if *n < 0.0 {
                                out.push('-');
                            }
                            out.push_str(spelling);
                        }
                        None => out.push_str("null"),
                    }
                } else {
                    out.push_str(&format!("{n:?}"));
                }
            }
            Value::Str(s) => write_json_escaped(out, s),
            Value::Array(values) => {
                out.push('[');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    value.write_json(out, config);
                }
                out.push(']');
            }
            Value::Object(members) => {
                out.push('{');
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_json_escaped(out, key);
                    out.push_str(": ");
                    value.write_json(out, config);
                }
                out.push('}');
            }
            Value::Function(function) => {
                write_json_escaped(out, &format!("function {}", function.name()));
            }
        }
    }
}

pub(crate) fn write_json_escaped(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string(&Config::default()))
    }
}

// Deep structural equality; int and float compare by numeric value,
// callables by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Float(l), Value::Float(r)) => l == r,
            (Value::Int(l), Value::Float(r)) | (Value::Float(r), Value::Int(l)) => {
                *l as f64 == *r
            }
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Array(l), Value::Array(r)) => l == r,
            // key order is a representation detail, not part of the value
            (Value::Object(l), Value::Object(r)) => {
                l.len() == r.len() && l.iter().all(|(key, value)| r.get(key) == Some(value))
            }
            (Value::Function(l), Value::Function(r)) => match (&l.kind, &r.kind) {
                (FunctionKind::Script(lc), FunctionKind::Script(rc)) => Rc::ptr_eq(lc, rc),
                (FunctionKind::Builtin(ln), FunctionKind::Builtin(rn)) => ln == rn,
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(values) => {
                Value::Array(values.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(members) => Value::Object(
                members
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

// Callables and non-finite numbers have no JSON counterpart; they map to
// null on the way out.
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::from(n),
            Value::Float(n) => {
                serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, Into::into)
            }
            Value::Str(s) => serde_json::Value::String(s),
            Value::Array(values) => {
                serde_json::Value::Array(values.into_iter().map(Into::into).collect())
            }
            Value::Object(members) => serde_json::Value::Object(
                members
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
            Value::Function(_) => serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::Float(3.5));
    }

    #[test]
    fn test_deep_equality() {
        let left = Value::Array(vec![Value::Int(1), Value::Str("a".into())]);
        let right = Value::Array(vec![Value::Float(1.0), Value::Str("a".into())]);

        assert_eq!(left, right);
    }

    #[test]
    fn test_object_equality_ignores_order() {
        let mut first = IndexMap::new();
        first.insert("a".to_string(), Value::Int(1));
        first.insert("b".to_string(), Value::Int(2));

        let mut second = IndexMap::new();
        second.insert("b".to_string(), Value::Int(2));
        second.insert("a".to_string(), Value::Int(1));

        assert_eq!(Value::Object(first), Value::Object(second));

        let mut third = IndexMap::new();
        third.insert("a".to_string(), Value::Int(1));
        third.insert("b".to_string(), Value::Int(9));
        assert_ne!(
            Value::Object(third),
            Value::Object([("a".to_string(), Value::Int(1))].into_iter().collect())
        );
    }

    #[test]
    fn test_json_text() {
        let mut members = IndexMap::new();
        members.insert("a".to_string(), Value::Int(3));
        members.insert("b".to_string(), Value::Array(vec![Value::Null, Value::Bool(true)]));
        let value = Value::Object(members);

        assert_eq!(
            value.to_json_string(&Config::default()),
            r#"{"a": 3, "b": [null, true]}"#
        );
    }

    #[test]
    fn test_json_text_escapes() {
        let value = Value::Str("a\"b\n".into());
        assert_eq!(value.to_json_string(&Config::default()), r#""a\"b\n""#);
    }

    #[test]
    fn test_non_finite_without_spelling() {
        assert_eq!(
            Value::Float(f64::INFINITY).to_json_string(&Config::default()),
            "null"
        );
    }

    #[test]
    fn test_non_finite_with_spelling() {
        let config = Config::new().with_infinity("Infinity").with_nan("NaN");

        assert_eq!(
            Value::Float(f64::NEG_INFINITY).to_json_string(&config),
            "-Infinity"
        );
        assert_eq!(Value::Float(f64::NAN).to_json_string(&config), "NaN");
    }

    #[test]
    fn test_serde_round_trip() {
        let parsed: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": [2.5, "x"]}"#).expect("valid json");
        let value = Value::from(parsed.clone());
        let back: serde_json::Value = value.into();

        assert_eq!(parsed, back);
    }
}
