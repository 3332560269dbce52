use std::path::PathBuf;

use thiserror::Error;

/// Structural problems found while declaring commands.
///
/// These surface immediately from the declaration call that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclareError {
    #[error("variadic arguments must be last {0}")]
    VariadicNotLast(String),

    #[error("command declaration has no name")]
    EmptyCommandName,

    #[error("invalid pattern for option {flags}: {message}")]
    InvalidPattern { flags: String, message: String },
}

/// Problems found while parsing one input line.
///
/// Parse errors are collected rather than returned early; all of them for a
/// single line are rendered together and sent once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing required argument {0}")]
    MissingArgument(String),

    #[error("option {0} argument missing")]
    OptionMissingArgument(String),

    #[error("unknown option {0}")]
    UnknownOption(String),
}

impl ParseError {
    /// The line sent to the user for this error.
    pub fn render(&self) -> String {
        format!("  error: {self}")
    }
}

/// Failures while loading command modules from the filesystem.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("command module not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("command module loads itself: {}", .0.display())]
    Cycle(PathBuf),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse command module {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: unknown action '{action}' for command '{command}'", path.display())]
    UnknownHandler {
        path: PathBuf,
        command: String,
        action: String,
    },

    #[error("{}: unknown coercion '{coerce}' for option {flags}", path.display())]
    UnknownCoercion {
        path: PathBuf,
        flags: String,
        coerce: String,
    },

    #[error("{}: {source}", path.display())]
    Declare {
        path: PathBuf,
        #[source]
        source: DeclareError,
    },
}
