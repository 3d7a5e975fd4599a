//! # Config
//!
//! Runtime options shared by the parser and the evaluator.

use serde::{Deserialize, Serialize};

/// Default cap on the element count of any array or object.
pub const DEFAULT_MAX_ARRAY_SIZE: usize = 1000;
/// Default cap on recursive evaluation depth.
pub const DEFAULT_MAX_DEPTH: usize = 200;
/// Default cap on the iteration count of a single loop.
pub const DEFAULT_MAX_LOOP_TIMES: usize = 1000;

/// Options controlling how sources are parsed and evaluated.
///
/// All fields have defaults; hosts usually tweak one or two:
///
/// ```
/// use vivjson::Config;
///
/// let config = Config::new().with_max_loop_times(10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Mirror the message of a failing run to stderr.
    pub enable_stderr: bool,

    /// Prefix error messages with the reporting stage ("Lexer", "Parser", ...).
    pub enable_tag_detail: bool,

    /// Accept only strict JSON; every script extension becomes a parse error.
    pub enable_only_json: bool,

    /// Spelling used for positive infinity when reading and writing JSON.
    /// Without it, a non-finite number is written as `null` and the spelling
    /// is not recognized while parsing.
    pub infinity: Option<String>,

    /// Spelling used for NaN when reading and writing JSON. Same rules as
    /// [`Config::infinity`].
    pub nan: Option<String>,

    /// Cap on the element count of any array or object.
    pub max_array_size: usize,

    /// Cap on recursive evaluation depth.
    pub max_depth: usize,

    /// Cap on the iteration count of a single loop.
    pub max_loop_times: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_stderr: false,
            enable_tag_detail: false,
            enable_only_json: false,
            infinity: None,
            nan: None,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            max_loop_times: DEFAULT_MAX_LOOP_TIMES,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stderr(mut self, enable: bool) -> Self {
        self.enable_stderr = enable;
        self
    }

    pub fn with_tag_detail(mut self, enable: bool) -> Self {
        self.enable_tag_detail = enable;
        self
    }

    pub fn with_only_json(mut self, enable: bool) -> Self {
        self.enable_only_json = enable;
        self
    }

    pub fn with_infinity(mut self, spelling: impl Into<String>) -> Self {
        self.infinity = Some(spelling.into());
        self
    }

    pub fn with_nan(mut self, spelling: impl Into<String>) -> Self {
        self.nan = Some(spelling.into());
        self
    }

    pub fn with_max_array_size(mut self, limit: usize) -> Self {
        self.max_array_size = limit;
        self
    }

    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn with_max_loop_times(mut self, limit: usize) -> Self {
        self.max_loop_times = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(!config.enable_stderr);
        assert!(!config.enable_only_json);
        assert_eq!(config.max_array_size, 1000);
        assert_eq!(config.max_depth, 200);
        assert_eq!(config.max_loop_times, 1000);
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .with_infinity("Infinity")
            .with_nan("NaN")
            .with_max_depth(10);

        assert_eq!(config.infinity.as_deref(), Some("Infinity"));
        assert_eq!(config.nan.as_deref(), Some("NaN"));
        assert_eq!(config.max_depth, 10);
    }
}
