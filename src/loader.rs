//! # Loader
//!
//! Classifies the inputs of a run and turns each into statements. The
//! statement lists of all inputs concatenate into one implicit outer
//! block; directly-represented values pool across inputs and end up in
//! the implicit `_` binding (one value directly, several as an array).

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::config::Config;
use crate::error::Error;
use crate::lexer::{Token, TokenKind};
use crate::parser::ast::Statement;
use crate::parser::Parser;
use crate::value::Value;

/// One input of a run.
#[derive(Debug, Clone)]
pub enum Input {
    /// Source code; errors name it by its argument position.
    Code(String),
    /// Source code with an explicit medium label (e.g. stdin).
    Labeled { medium: String, code: String },
    /// A string that must be strict JSON regardless of the config.
    Json(String),
    /// A `.viv` or `.json` file.
    File(PathBuf),
    /// A pre-evaluated host value; pools into the implicit `_` binding.
    Value(Value),
    /// Host bindings injected into the outer frame.
    Bindings(IndexMap<String, Value>),
}

pub(crate) fn load(inputs: &[Input], config: &Config) -> Result<Vec<Statement>, Error> {
    let mut statements = vec![];
    let mut direct_values = vec![];
    // the implicit assignment goes where the first direct value appeared,
    // so later inputs can already read `_`
    let mut implicit_position = None;

    for (position, input) in inputs.iter().enumerate() {
        let argument = ordinal(position + 1);
        let unit = match input {
            Input::Code(code) => Some(Parser::new(code, &argument, config).parse()?),
            Input::Labeled { medium, code } => Some(Parser::new(code, medium, config).parse()?),
            Input::Json(text) => Some(Parser::new_json(text, &argument, config).parse()?),
            Input::File(path) => Some(load_file(path, config)?),
            Input::Value(value) => {
                implicit_position.get_or_insert(statements.len());
                direct_values.push(Statement::Value {
                    value: value.clone(),
                    location: None,
                });
                None
            }
            Input::Bindings(bindings) => {
                for (name, value) in bindings {
                    statements.push(Statement::Injection {
                        variable: name.clone(),
                        value: value.clone(),
                        location: None,
                    });
                }
                None
            }
        };

        if let Some(unit) = unit {
            if !unit.direct_values.is_empty() {
                implicit_position.get_or_insert(statements.len());
            }
            statements.extend(unit.statements);
            direct_values.extend(unit.direct_values);
        }
    }

    if !direct_values.is_empty() {
        let position = implicit_position.unwrap_or(statements.len());
        statements.insert(position, implicit_assignment(direct_values));
    }
    Ok(statements)
}

fn load_file(path: &PathBuf, config: &Config) -> Result<crate::parser::ParseUnit, Error> {
    let medium = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let json = match path.extension().and_then(|extension| extension.to_str()) {
        Some("viv") => false,
        Some("json") => true,
        _ => {
            return Err(Error::io(format!(
                "unsupported file extension '{}'",
                path.display()
            )));
        }
    };

    let text = std::fs::read_to_string(path)
        .map_err(|error| Error::io(format!("cannot read '{}': {}", path.display(), error)))?;

    if json {
        Parser::new_json(&text, &medium, config).parse()
    } else {
        Parser::new(&text, &medium, config).parse()
    }
}

/// The assignment the parser implies for directly-represented JSON:
/// `_ = value`, or `_ = [values...]` for several.
pub fn implicit_assignment(mut values: Vec<Statement>) -> Statement {
    let value = if values.len() == 1 {
        values.remove(0)
    } else {
        Statement::Array { values }
    };

    Statement::Set {
        members: vec![Statement::Identifier {
            token: Token::new(TokenKind::Identifier, "_", None),
        }],
        operator: Token::new(TokenKind::Assign, "=", None),
        value: Box::new(value),
    }
}

fn ordinal(position: usize) -> String {
    let suffix = match position % 100 {
        11..=13 => "th",
        _ => match position % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{position}{suffix} argument")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st argument");
        assert_eq!(ordinal(2), "2nd argument");
        assert_eq!(ordinal(3), "3rd argument");
        assert_eq!(ordinal(4), "4th argument");
        assert_eq!(ordinal(11), "11th argument");
        assert_eq!(ordinal(21), "21st argument");
    }

    #[test]
    fn test_error_location_names_the_argument() {
        let inputs = [
            Input::Code("a: 1".to_string()),
            Input::Code("a = = 1".to_string()),
        ];
        let error = load(&inputs, &Config::default()).expect_err("must fail");
        let location = error.location().expect("location expected");
        assert_eq!(location.medium, "2nd argument");
    }

    #[test]
    fn test_direct_values_pool_across_inputs() {
        let inputs = [
            Input::Code("3".to_string()),
            Input::Code("2".to_string()),
        ];
        let statements = load(&inputs, &Config::default()).expect("load failed");

        assert_eq!(statements.len(), 1);
        let Statement::Set { members, value, .. } = &statements[0] else {
            panic!("expected the implicit assignment");
        };
        assert_eq!(
            members[0],
            Statement::Identifier {
                token: Token::new(TokenKind::Identifier, "_", None)
            }
        );
        assert!(matches!(value.as_ref(), Statement::Array { values } if values.len() == 2));
    }

    #[test]
    fn test_missing_file() {
        let inputs = [Input::File(PathBuf::from("no/such/file.viv"))];
        let error = load(&inputs, &Config::default()).expect_err("must fail");
        assert!(matches!(error, Error::Io { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let inputs = [Input::File(PathBuf::from("script.sh"))];
        let error = load(&inputs, &Config::default()).expect_err("must fail");
        assert!(matches!(error, Error::Io { .. }));
    }
}
