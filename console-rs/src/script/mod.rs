//! Built-in console script language.
//!
//! A small JavaScript-flavoured language that is enough to drive the console:
//! arithmetic and string expressions, session variables, `if`/`else`, and the
//! console functions (`consoleMessage`, `setMacro`, `performMacro`, …).
//!
//! # Quick start
//!
//! ```rust
//! use ooconsole::console::{Console, MemorySettings, MemorySink};
//! use ooconsole::script::ScriptEvaluator;
//!
//! let mut console = Console::new(ScriptEvaluator::new(), MemorySink::new(), MemorySettings::new());
//! console.dispatch("x = 6").unwrap();
//! let v = console.evaluate("x * 7").unwrap();
//! assert_eq!(v.to_string(), "42");
//! ```

pub mod builtins;
pub mod expr;
pub mod interp;
pub mod value;

pub use expr::{is_complete, parse_program, ParseError};
pub use interp::ScriptEvaluator;
pub use value::Value;
