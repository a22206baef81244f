//! The console command interpreter.
//!
//! [`Console`] is one console session.  It owns the macro table, the pending
//! multi-line input, the output sink, the settings store and the evaluator,
//! and routes each line the user types:
//!
//! * `:name params` runs the macro `name`;
//! * anything else is script, appended to the input buffer and evaluated once
//!   the buffer holds a complete unit.
//!
//! A macro line typed while a multi-line unit is pending runs immediately and
//! leaves the pending text untouched; the unit resumes with the next script
//! line.
//!
//! ```
//! use ooconsole::console::{Category, Console, MemorySettings, MemorySink};
//! use ooconsole::script::ScriptEvaluator;
//!
//! let mut console = Console::new(ScriptEvaluator::new(), MemorySink::new(), MemorySettings::new());
//! console.dispatch("1 +").unwrap();
//! console.dispatch("  2").unwrap();
//! assert_eq!(console.sink().texts(&Category::CommandResult), vec!["3"]);
//! ```

pub mod buffer;
pub mod escape;
pub mod eval;
pub mod macros;
pub mod settings;
pub mod sink;
pub mod token;

use tracing::debug;

pub use buffer::{BufferState, InputBuffer, Submission};
pub use escape::{substitute_escape_codes, unescape};
pub use eval::{evaluate_and_show, perform_macro, EvalKind, Evaluator, Scope};
pub use macros::{display_expansion, MacroTable};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use sink::{Category, Emphasis, MemorySink, Message, MessageSink};
pub use token::get_one_token;

use crate::error::Result;
use crate::script::Value;

/// Prefix marking a macro invocation.
pub const MACRO_PREFIX: char = ':';

/// Length of the `"> "` echo prefix, where the emphasised command text starts.
const ECHO_PREFIX_LEN: usize = 2;

/// A console session.
pub struct Console<E, K, S> {
    evaluator: E,
    macros: MacroTable,
    buffer: InputBuffer,
    sink: K,
    settings: S,
}

impl<E, K, S> Console<E, K, S>
where
    E: Evaluator,
    K: MessageSink,
    S: SettingsStore,
{
    /// Start a session, loading macros from `settings`.
    pub fn new(evaluator: E, sink: K, settings: S) -> Self {
        let macros = MacroTable::load(&settings);
        Self {
            evaluator,
            macros,
            buffer: InputBuffer::new(),
            sink,
            settings,
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Handle one line of console input.
    ///
    /// Evaluation errors are returned to the caller; by then the input buffer
    /// has already been cleared.
    pub fn dispatch(&mut self, line: &str) -> Result<()> {
        let command = line.trim_start_matches(' ');
        self.sink.emit(
            Category::Command,
            &format!("> {command}"),
            Some(Emphasis::new(ECHO_PREFIX_LEN, command.chars().count())),
        );

        if command.starts_with(MACRO_PREFIX) {
            debug!(pending = !self.buffer.as_str().is_empty(), "routing to macro");
            return self.perform_macro(command);
        }

        let Self {
            evaluator, buffer, ..
        } = self;
        match buffer.submit(line, |text| evaluator.is_complete(text)) {
            Submission::Complete(source) => {
                self.evaluate(&source)?;
            }
            Submission::Pending => debug!("input incomplete, accumulating"),
        }
        Ok(())
    }

    /// Evaluate `source` as console input and print its result.
    pub fn evaluate(&mut self, source: &str) -> Result<Value> {
        let Self {
            evaluator,
            macros,
            sink,
            settings,
            ..
        } = self;
        let mut scope = Scope::new(EvalKind::Command, None, macros, sink, settings);
        Ok(evaluate_and_show(evaluator, source, &mut scope)?)
    }

    // ── Macros ────────────────────────────────────────────────────────────────

    /// Run a `:name params` line.
    pub fn perform_macro(&mut self, command: &str) -> Result<()> {
        let Self {
            evaluator,
            macros,
            sink,
            settings,
            ..
        } = self;
        let mut scope = Scope::new(EvalKind::Command, None, macros, sink, settings);
        perform_macro(evaluator, &mut scope, command)?;
        Ok(())
    }

    /// Define a macro from `"name body"`, as `setMacro()` does.
    pub fn set_macro(&mut self, params: Option<&str>) {
        self.macros
            .set_macro(params, &mut self.settings, &mut self.sink);
    }

    /// Remove the named macro, as `deleteMacro()` does.
    pub fn delete_macro(&mut self, params: Option<&str>) {
        self.macros
            .delete_macro(params, &mut self.settings, &mut self.sink);
    }

    /// Print the named macro's body, as `showMacro()` does.
    pub fn show_macro(&mut self, params: Option<&str>) {
        self.macros.show_macro(params, &mut self.sink);
    }

    /// The session's macro table.
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    // ── Input buffer ──────────────────────────────────────────────────────────

    /// `true` while a multi-line unit is waiting for more input.
    pub fn is_accumulating(&self) -> bool {
        self.buffer.state() == BufferState::Accumulating
    }

    /// Text of the pending multi-line unit.
    pub fn pending_input(&self) -> &str {
        self.buffer.as_str()
    }

    /// Discard the pending multi-line unit, returning it.
    pub fn reset_buffer(&mut self) -> String {
        self.buffer.take()
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
