use std::io;
use thiserror::Error;

/// Custom error types for the production-rule generator
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed grammar source or a dangling nonterminal reference.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A builtin was given arguments it cannot work with.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Unknown non-terminal: {0}")]
    UnknownNonTerminal(String),

    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    #[error("Recursion limit of {limit} exceeded while expanding `{symbol}`")]
    RecursionLimit { symbol: String, limit: usize },

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl GrammarError {
    pub(crate) fn parse_at(line: usize, message: impl AsRef<str>) -> Self {
        GrammarError::Parse(format!("line {}: {}", line, message.as_ref()))
    }

    /// Prefix a bare parse message with the line it was raised on.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            GrammarError::Parse(msg) if !msg.starts_with("line ") => {
                GrammarError::parse_at(line, msg)
            }
            other => other,
        }
    }

    /// Whether this error came out of parsing or reference resolution.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, GrammarError::Parse(_))
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Trait extension for Option<T> to convert to GrammarError
pub trait OptionExt<T> {
    fn ok_or_parse_err<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse_err<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| GrammarError::Parse(f()))
    }
}
