//! Error types shared across the console.
//!
//! User mistakes (a macro without a body, an unknown macro name) are never
//! errors here; they are reported through the message sink and execution
//! continues.  Only evaluation failures escape [`Console::dispatch`].
//!
//! [`Console::dispatch`]: crate::console::Console::dispatch

use std::path::PathBuf;

use thiserror::Error;

/// Failure raised by an [`Evaluator`](crate::console::Evaluator).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The source text could not be parsed.
    #[error("SyntaxError: {0}")]
    Syntax(String),
    /// The source parsed but failed while running.
    #[error("Error: {0}")]
    Runtime(String),
}

impl EvalError {
    pub fn runtime(msg: impl Into<String>) -> Self {
        EvalError::Runtime(msg.into())
    }
}

/// Failure reading or writing a settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings file {}: top level is not an object", .0.display())]
    NotAnObject(PathBuf),
}

/// Failure loading the TOML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Error propagated out of the console dispatcher to the host.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;
