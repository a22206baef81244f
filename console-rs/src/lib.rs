//! `ooconsole`: a line-oriented debug console with persistent macros.
//!
//! The interpreter core lives in [`console`]; [`script`] provides the
//! built-in evaluator, and [`lua`] an optional Lua one.  The remaining
//! modules support the interactive binary.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod lua;
pub mod script;
pub mod terminal;

pub use console::Console;
pub use error::{ConsoleError, EvalError, Result};
