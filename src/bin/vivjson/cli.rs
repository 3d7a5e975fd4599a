//! # Cli
//!
//! Argument parsing for the `vivjson` binary.

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, about, disable_version_flag = true)]
pub struct Cli {
    /// Treat code arguments as JSON without any script extension.
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Read one more source from standard input, optionally labelled NAME.
    #[arg(
        short = 'i',
        long = "stdin",
        value_name = "NAME",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "stdin"
    )]
    pub stdin: Option<String>,

    /// Print the version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Log level for internal diagnostics.
    #[arg(value_enum, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,

    /// Code fragments or .viv/.json file paths; `+` joins the
    /// neighbouring code fragments into one source.
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<String>,
}

impl Cli {
    /// Parse the command line. Combined short flags (`-ji`) are not
    /// allowed; each flag must be given on its own.
    pub fn init() -> Result<Self, String> {
        if let Some(cluster) = combined_shorts() {
            return Err(format!(
                "combined flags ('{cluster}') are not allowed; write them separately"
            ));
        }
        Ok(Cli::parse())
    }
}

/// The first argument that clusters several short flags into one token,
/// if any. `-i=NAME` and long flags pass.
fn combined_shorts() -> Option<String> {
    for argument in std::env::args().skip(1) {
        if argument == "--" {
            break;
        }
        let Some(rest) = argument.strip_prefix('-') else {
            continue;
        };
        if rest.starts_with('-') {
            continue;
        }
        let shorts = rest.split('=').next().unwrap_or(rest);
        if shorts.chars().count() > 1 {
            return Some(argument);
        }
    }
    None
}

/// Log level of the CLI.
#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum LogLevel {
    /// Only critical errors.
    #[default]
    Error,

    /// Also warnings.
    Warn,

    /// General progress of the pipeline.
    Info,

    /// Everything, including per-stage details.
    Debug,
}

impl From<LogLevel> for log::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}
