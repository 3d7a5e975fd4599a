//! # Standard
//!
//! Dispatch for the standard-library builtins. The evaluator consults
//! this table when a name misses every frame of the environment chain;
//! builtins referenced as values travel as callables carrying their name.

use crate::config::Config;
use crate::error::{Error, Location};
use crate::value::Value;

/// The canonical name of a builtin, or None when the name is not one.
pub fn lookup(name: &str) -> Option<&'static str> {
    match name {
        "len" => Some("len"),
        "type" => Some("type"),
        "str" => Some("str"),
        "print" => Some("print"),
        _ => None,
    }
}

pub fn call(
    name: &str,
    arguments: &[Value],
    config: &Config,
    location: Option<Location>,
) -> Result<Value, Error> {
    match name {
        "len" => {
            let value = single(name, arguments, &location)?;
            let length = match value {
                Value::Str(s) => s.chars().count(),
                Value::Array(values) => values.len(),
                Value::Object(members) => members.len(),
                v => {
                    return Err(Error::evaluate(
                        format!("len() needs a container or string, not {}", v.type_name()),
                        location,
                    ));
                }
            };
            Ok(Value::Int(length as i64))
        }
        "type" => {
            let value = single(name, arguments, &location)?;
            Ok(Value::Str(value.type_name().to_string()))
        }
        "str" => {
            let value = single(name, arguments, &location)?;
            Ok(Value::Str(display(value, config)))
        }
        "print" => {
            let line = arguments
                .iter()
                .map(|value| display(value, config))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
            Ok(Value::Null)
        }
        _ => Err(Error::evaluate(format!("'{name}' is not defined"), location)),
    }
}

/// Strings render bare; everything else as JSON text.
fn display(value: &Value, config: &Config) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_json_string(config),
    }
}

fn single<'a>(
    name: &str,
    arguments: &'a [Value],
    location: &Option<Location>,
) -> Result<&'a Value, Error> {
    match arguments {
        [value] => Ok(value),
        _ => Err(Error::evaluate(
            format!("{name}() takes one argument"),
            location.clone(),
        )),
    }
}
