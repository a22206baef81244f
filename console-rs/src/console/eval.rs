//! The evaluator seam.
//!
//! The console does not know what language its input is written in.  It hands
//! complete units of text to an [`Evaluator`] together with a [`Scope`], which
//! lets the evaluated code reach back into the console: read the macro
//! parameter, print messages, and edit the macro table.

use tracing::debug;

use super::macros::{display_expansion, not_defined, MacroTable};
use super::settings::SettingsStore;
use super::sink::{Category, Emphasis, MessageSink};
use super::token::get_one_token;
use crate::error::EvalError;
use crate::script::Value;

/// Maximum macro nesting before evaluation is aborted.
pub const MAX_DEPTH: usize = 32;

/// Language backend for console input.
pub trait Evaluator {
    /// Run `source` and return its value.
    fn evaluate(&mut self, source: &str, scope: &mut Scope<'_>) -> Result<Value, EvalError>;

    /// `true` unless `source` is a prefix of a unit that needs more input.
    fn is_complete(&self, source: &str) -> bool;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&mut self, source: &str, scope: &mut Scope<'_>) -> Result<Value, EvalError> {
        (**self).evaluate(source, scope)
    }

    fn is_complete(&self, source: &str) -> bool {
        (**self).is_complete(source)
    }
}

/// What triggered an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    /// Text typed at the console.
    Command,
    /// The body of a macro invocation.
    Macro,
}

// ── Scope ─────────────────────────────────────────────────────────────────────

/// The console state an evaluation may touch.
pub struct Scope<'a> {
    pub kind: EvalKind,
    /// Parameter string of a macro invocation.
    pub param: Option<&'a str>,
    pub macros: &'a mut MacroTable,
    pub sink: &'a mut dyn MessageSink,
    pub settings: &'a mut dyn SettingsStore,
    depth: usize,
}

impl<'a> Scope<'a> {
    pub fn new(
        kind: EvalKind,
        param: Option<&'a str>,
        macros: &'a mut MacroTable,
        sink: &'a mut dyn MessageSink,
        settings: &'a mut dyn SettingsStore,
    ) -> Self {
        Self {
            kind,
            param,
            macros,
            sink,
            settings,
            depth: 0,
        }
    }

    /// A scope for a nested evaluation sharing this one's console state.
    pub fn nested<'b>(
        &'b mut self,
        kind: EvalKind,
        param: Option<&'b str>,
    ) -> Result<Scope<'b>, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::runtime("too much recursion"));
        }
        Ok(Scope {
            kind,
            param,
            macros: &mut *self.macros,
            sink: &mut *self.sink,
            settings: &mut *self.settings,
            depth: self.depth + 1,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The value scripts see as `PARAM`.
    ///
    /// Macro bodies get the parameter string, or null when none was given;
    /// plain commands have no parameter at all.
    pub fn param_value(&self) -> Value {
        match (self.param, self.kind) {
            (Some(p), _) => Value::Str(p.to_owned()),
            (None, EvalKind::Macro) => Value::Null,
            (None, EvalKind::Command) => Value::Undefined,
        }
    }

    pub fn emit(&mut self, category: Category, text: &str, emphasis: Option<Emphasis>) {
        self.sink.emit(category, text, emphasis);
    }

    pub fn set_macro(&mut self, params: Option<&str>) {
        self.macros.set_macro(params, &mut *self.settings, &mut *self.sink);
    }

    pub fn delete_macro(&mut self, params: Option<&str>) {
        self.macros
            .delete_macro(params, &mut *self.settings, &mut *self.sink);
    }

    pub fn show_macro(&mut self, params: Option<&str>) {
        self.macros.show_macro(params, &mut *self.sink);
    }
}

// ── Shared evaluation paths ───────────────────────────────────────────────────

/// Evaluate `source` and print its result.
///
/// `undefined` prints nothing; `null` prints as `null`.
pub fn evaluate_and_show<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    source: &str,
    scope: &mut Scope<'_>,
) -> Result<Value, EvalError> {
    debug!(kind = ?scope.kind, depth = scope.depth, "evaluating");
    let result = evaluator.evaluate(source, scope)?;
    match &result {
        Value::Undefined => {}
        Value::Null => scope.emit(Category::CommandResult, "null", None),
        other => scope.emit(Category::CommandResult, &other.to_string(), None),
    }
    Ok(result)
}

/// Run a `:name params` macro invocation.
///
/// The first character of `command` is the macro marker and is dropped.  The
/// expansion is echoed with the parameters substituted for display, then the
/// unsubstituted body is evaluated with the parameters as `PARAM`.
pub fn perform_macro<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    scope: &mut Scope<'_>,
    command: &str,
) -> Result<(), EvalError> {
    let mut chars = command.chars();
    if chars.next().is_none() {
        return Ok(());
    }
    let (name, params) = get_one_token(chars.as_str());

    let Some(body) = scope.macros.get(name).map(str::to_owned) else {
        scope.emit(Category::UnknownMacro, &not_defined(name), None);
        return Ok(());
    };
    if body.is_empty() {
        return Ok(());
    }

    debug!(macro_name = name, params = ?params, "performing macro");
    let display = display_expansion(&body, params);
    scope.emit(Category::MacroExpansion, &format!("> {display}"), None);

    let mut inner = scope.nested(EvalKind::Macro, params)?;
    evaluate_and_show(evaluator, &body, &mut inner)?;
    Ok(())
}
