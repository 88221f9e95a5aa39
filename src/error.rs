//! Error types for schema construction and parsing.
//!
//! Every failure aborts the current parse call. Control-flow exits requested
//! from option callbacks travel through the same channel as
//! [`ParseError::Exit`] so the caller can tell them apart from user errors.

use std::fmt;

use thiserror::Error;

/// A non-error termination requested from inside an option callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyExit {
    /// Stop here and report success (e.g. `--version`).
    Success,
    /// Stop here and let the caller print usage.
    Help,
}

impl fmt::Display for EarlyExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarlyExit::Success => f.write_str("successfully completed, should be caught and quit"),
            EarlyExit::Help => f.write_str("this should be caught in your main function, see examples"),
        }
    }
}

/// Errors raised while declaring a schema or parsing a token stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Wrong number of tokens for an option or positional.
    #[error("{option}: {message}")]
    ArgumentMismatch { option: String, message: String },

    /// Raw text could not become the destination type, or is not a member
    /// of the allowed set.
    #[error("{option}: {message}")]
    Conversion { option: String, message: String },

    /// A transform or validator rejected the value.
    #[error("{option}: {message}")]
    Validation { option: String, message: String },

    /// A required option, positional or subcommand never matched.
    #[error("{name} is required")]
    Required { name: String },

    /// An option was given without one of the options it needs.
    #[error("{option} requires {requires}")]
    Requires { option: String, requires: String },

    /// Two mutually exclusive options were both given.
    #[error("{option} excludes {excludes}")]
    Excludes { option: String, excludes: String },

    /// Tokens were left over and the command does not allow extras.
    #[error("The following arguments were not expected: {}", .extras.join(" "))]
    Extras { extras: Vec<String> },

    /// Lookup of a name that was never declared.
    #[error("{name} not found")]
    OptionNotFound { name: String },

    /// The schema was declared in a way that cannot work.
    #[error("{name}: {message}")]
    IncorrectConstruction { name: String, message: String },

    /// Classifier state that well-formed input cannot reach.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A callback asked to stop parsing without failing.
    #[error("{0}")]
    Exit(EarlyExit),
}

impl ParseError {
    /// Shortcut for callbacks that want to end the parse successfully.
    pub fn success() -> Self {
        ParseError::Exit(EarlyExit::Success)
    }

    /// Shortcut for callbacks that want the caller to print usage.
    pub fn call_for_help() -> Self {
        ParseError::Exit(EarlyExit::Help)
    }

    pub(crate) fn construction(name: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::IncorrectConstruction {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(option: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::ArgumentMismatch {
            option: option.into(),
            message: message.into(),
        }
    }

    pub(crate) fn conversion(option: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::Conversion {
            option: option.into(),
            message: message.into(),
        }
    }

    /// True for early exits requested by callbacks, which are not failures.
    pub fn is_exit(&self) -> bool {
        matches!(self, ParseError::Exit(_))
    }

    /// Process exit code conventionally associated with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParseError::Exit(_) => 0,
            ParseError::IncorrectConstruction { .. } => 100,
            ParseError::Conversion { .. } => 104,
            ParseError::Validation { .. } => 105,
            ParseError::Required { .. } => 106,
            ParseError::Requires { .. } => 107,
            ParseError::Excludes { .. } => 108,
            ParseError::Extras { .. } => 109,
            ParseError::Internal(_) => 112,
            ParseError::OptionNotFound { .. } => 113,
            ParseError::ArgumentMismatch { .. } => 114,
        }
    }

    /// Stable identifier for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::ArgumentMismatch { .. } => "argument_mismatch",
            ParseError::Conversion { .. } => "conversion_error",
            ParseError::Validation { .. } => "validation_error",
            ParseError::Required { .. } => "required_error",
            ParseError::Requires { .. } => "requires_error",
            ParseError::Excludes { .. } => "excludes_error",
            ParseError::Extras { .. } => "extras_error",
            ParseError::OptionNotFound { .. } => "option_not_found",
            ParseError::IncorrectConstruction { .. } => "incorrect_construction",
            ParseError::Internal(_) => "internal_error",
            ParseError::Exit(EarlyExit::Success) => "success",
            ParseError::Exit(EarlyExit::Help) => "call_for_help",
        }
    }
}
