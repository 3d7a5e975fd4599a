//! # VivJson CLI
//!
//! Runs scripts and JSON documents from arguments, files, and stdin.
//! The stringified result goes to stdout, errors to stderr; the exit
//! code is zero only when the whole run succeeded.

mod cli;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{debug, error};
use vivjson::{run_with_config, Config, Input};

fn main() -> ExitCode {
    // no logger yet, so this one reports directly
    let args = match cli::Cli::init() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = simple_logger::init_with_level(args.verbosity.into()) {
        eprintln!("cannot initialize the logger: {error}");
        return ExitCode::FAILURE;
    }

    let config = Config::default();

    let inputs = match build_inputs(&args) {
        Ok(inputs) => inputs,
        Err(message) => {
            error!("{message}");
            return ExitCode::FAILURE;
        }
    };

    if inputs.is_empty() {
        error!("no sources given");
        return ExitCode::FAILURE;
    }

    debug!("running {} input(s)", inputs.len());

    match run_with_config(&inputs, &config) {
        Ok(value) => {
            println!("{}", value.to_json_string(&config));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e.render(&config));
            ExitCode::FAILURE
        }
    }
}

/// Sort the positional sources into inputs. A bare `+` joins its two
/// neighbouring code fragments into one source; file paths are
/// recognized by their extension.
fn build_inputs(args: &cli::Cli) -> Result<Vec<Input>, String> {
    let mut inputs: Vec<Input> = vec![];
    let mut join_next = false;

    for source in &args.sources {
        if source == "+" {
            if !matches!(inputs.last(), Some(Input::Code(_) | Input::Json(_))) {
                return Err("'+' must join two code arguments".to_string());
            }
            join_next = true;
            continue;
        }

        let is_file = source.ends_with(".viv") || source.ends_with(".json");

        if join_next {
            join_next = false;
            if is_file {
                return Err("'+' must join two code arguments".to_string());
            }
            match inputs.last_mut() {
                Some(Input::Code(code)) | Some(Input::Json(code)) => {
                    code.push('\n');
                    code.push_str(source);
                }
                _ => return Err("'+' must join two code arguments".to_string()),
            }
            continue;
        }

        if is_file {
            inputs.push(Input::File(PathBuf::from(source)));
        } else if args.json {
            inputs.push(Input::Json(source.clone()));
        } else {
            inputs.push(Input::Code(source.clone()));
        }
    }

    if join_next {
        return Err("'+' must join two code arguments".to_string());
    }

    if let Some(name) = &args.stdin {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|error| format!("cannot read stdin: {error}"))?;
        if args.json {
            inputs.push(Input::Json(text));
        } else {
            inputs.push(Input::Labeled {
                medium: name.clone(),
                code: text,
            });
        }
    }

    Ok(inputs)
}
