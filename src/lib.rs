//! # VivJson
//!
//! An embeddable scripting language that is a superset of JSON: every
//! JSON document is a valid program, and scripts add variables, control
//! flow, and first-class functions with lexical closure on top of
//! JSON-shaped values.
//!
//! ```
//! use vivjson::{run, Input, Value};
//!
//! let value = run(&[Input::Code("a: 3, b: 2, return(a + b)".to_string())]);
//! assert_eq!(value, Ok(Value::Int(5)));
//! ```
//!
//! Inputs concatenate into one program, so data and code can arrive
//! separately:
//!
//! ```
//! use vivjson::{run, Input, Value};
//!
//! let value = run(&[
//!     Input::Json("{\"a\": 3}".to_string()),
//!     Input::Code("return(a * 2)".to_string()),
//! ]);
//! assert_eq!(value, Ok(Value::Int(6)));
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod standard;
pub mod value;

pub use config::Config;
pub use error::{Error, Location};
pub use evaluator::Evaluator;
pub use loader::Input;
pub use value::Value;

use log::debug;
use parser::ast::Statement;
use parser::Parser;

/// Run inputs with the default configuration.
pub fn run(inputs: &[Input]) -> Result<Value, Error> {
    run_with_config(inputs, &Config::default())
}

/// Run inputs: load and parse each, concatenate the statements into one
/// outer block, and evaluate. The error of a failing run is mirrored to
/// stderr when the config asks for it.
pub fn run_with_config(inputs: &[Input], config: &Config) -> Result<Value, Error> {
    let result = evaluate_inputs(inputs, config);
    if config.enable_stderr {
        if let Err(error) = &result {
            eprintln!("{}", error.render(config));
        }
    }
    result
}

/// Run a single piece of source code with the default configuration.
pub fn run_text(code: &str) -> Result<Value, Error> {
    run(&[Input::Code(code.to_string())])
}

/// Parse one source into statements without evaluating. A
/// directly-represented JSON source shows up as its implicit `_`
/// assignment.
pub fn parse_text(code: &str, config: &Config) -> Result<Vec<Statement>, Error> {
    let unit = Parser::new(code, "text", config).parse()?;
    let mut statements = unit.statements;
    if !unit.direct_values.is_empty() {
        statements.push(loader::implicit_assignment(unit.direct_values));
    }
    Ok(statements)
}

fn evaluate_inputs(inputs: &[Input], config: &Config) -> Result<Value, Error> {
    debug!("loading {} input(s)", inputs.len());
    let statements = loader::load(inputs, config)?;
    debug!("evaluating {} statement(s)", statements.len());
    Evaluator::new(config).run(&statements)
}
