//! Optional Lua 5.4 evaluator via the `mlua` crate.
//!
//! Enabled with the `lua` Cargo feature:
//! ```text
//! cargo build --features lua
//! cargo test  --features lua
//! ```
//!
//! Console input is compiled as `return <input>` first so bare expressions
//! print their value, then as a statement chunk.
//!
//! # Lua API
//!
//! The following globals are registered in every Lua state:
//!
//! | Lua global                                   | Effect                          |
//! |----------------------------------------------|---------------------------------|
//! | `consoleMessage(code, text [, start, len])`  | Print `text` under colour `code` |
//! | `clearConsole()`                             | Clear the console               |
//! | `setMacro(def)` / `deleteMacro(name)`        | Edit the macro table            |
//! | `showMacro(name)`                            | Print a macro's body            |
//! | `performMacro(":name params")`               | Run a macro                     |
//! | `PARAM`                                      | Macro parameters, or `nil`      |
//! | `macros`                                     | Snapshot of the macro table     |
//!
//! The functions queue [`LuaCommand`]s; the queue is applied to the console
//! once the chunk returns.

#[cfg(feature = "lua")]
pub use lua_impl::{LuaCommand, LuaEvaluator};

#[cfg(feature = "lua")]
mod lua_impl {
    use std::collections::BTreeMap;
    use std::sync::mpsc::{channel, Receiver, Sender};

    use mlua::prelude::*;
    use tracing::debug;

    use crate::console::eval::{perform_macro, Evaluator, Scope};
    use crate::console::macros::PLACEHOLDER;
    use crate::console::sink::{Category, Emphasis};
    use crate::error::EvalError;
    use crate::script::Value;

    const CHUNK_NAME: &str = "=console";

    // ── LuaCommand ────────────────────────────────────────────────────────

    /// Console effect requested from Lua.
    #[derive(Debug, Clone, PartialEq)]
    pub enum LuaCommand {
        Message {
            /// `None` (a `nil` code) means `general`.
            code: Option<String>,
            text: String,
            emphasis: Option<(usize, usize)>,
        },
        Clear,
        SetMacro(Option<String>),
        DeleteMacro(Option<String>),
        ShowMacro(Option<String>),
        PerformMacro(String),
    }

    // ── LuaEvaluator ──────────────────────────────────────────────────────

    /// A Lua 5.4 interpreter with the console API pre-registered.
    pub struct LuaEvaluator {
        lua: Lua,
        rx: Receiver<LuaCommand>,
    }

    impl LuaEvaluator {
        pub fn new() -> LuaResult<Self> {
            let lua = Lua::new();
            let (tx, rx) = channel();
            Self::register_api(&lua, tx)?;
            Ok(Self { lua, rx })
        }

        fn register_api(lua: &Lua, tx: Sender<LuaCommand>) -> LuaResult<()> {
            let globals = lua.globals();

            {
                let tx = tx.clone();
                globals.set(
                    "consoleMessage",
                    lua.create_function(
                        move |_,
                              (code, text, start, length): (
                            Option<String>,
                            LuaValue,
                            Option<usize>,
                            Option<usize>,
                        )| {
                            let text = display(&text);
                            let emphasis = start.zip(length);
                            let _ = tx.send(LuaCommand::Message {
                                code,
                                text,
                                emphasis,
                            });
                            Ok(())
                        },
                    )?,
                )?;
            }

            {
                let tx = tx.clone();
                globals.set(
                    "clearConsole",
                    lua.create_function(move |_, ()| {
                        let _ = tx.send(LuaCommand::Clear);
                        Ok(())
                    })?,
                )?;
            }

            for (name, make) in [
                ("setMacro", LuaCommand::SetMacro as fn(Option<String>) -> LuaCommand),
                ("deleteMacro", LuaCommand::DeleteMacro),
                ("showMacro", LuaCommand::ShowMacro),
            ] {
                let tx = tx.clone();
                globals.set(
                    name,
                    lua.create_function(move |_, params: Option<String>| {
                        let _ = tx.send(make(params));
                        Ok(())
                    })?,
                )?;
            }

            globals.set(
                "performMacro",
                lua.create_function(move |_, command: String| {
                    let _ = tx.send(LuaCommand::PerformMacro(command));
                    Ok(())
                })?,
            )?;

            Ok(())
        }

        /// Expose `PARAM` and the macro table to the next chunk.
        fn prepare(&self, scope: &Scope<'_>) -> LuaResult<()> {
            let globals = self.lua.globals();
            globals.set(PLACEHOLDER, scope.param)?;
            globals.set("macros", self.lua.create_table_from(scope.macros.iter())?)?;
            Ok(())
        }

        fn run(&self, source: &str) -> LuaResult<LuaMultiValue> {
            match self
                .lua
                .load(format!("return {source}"))
                .set_name(CHUNK_NAME)
                .eval::<LuaMultiValue>()
            {
                Err(LuaError::SyntaxError { .. }) => {
                    self.lua.load(source).set_name(CHUNK_NAME).eval()
                }
                other => other,
            }
        }

        /// Apply queued commands in the order they were issued.
        fn apply(&mut self, scope: &mut Scope<'_>) -> Result<(), EvalError> {
            let pending: Vec<LuaCommand> = self.rx.try_iter().collect();
            for cmd in pending {
                debug!(?cmd, "applying lua command");
                match cmd {
                    LuaCommand::Message {
                        code,
                        text,
                        emphasis,
                    } => scope.emit(
                        code.as_deref().map_or(Category::General, Category::from),
                        &text,
                        emphasis.map(|(s, l)| Emphasis::new(s, l)),
                    ),
                    LuaCommand::Clear => scope.sink.clear(),
                    LuaCommand::SetMacro(p) => scope.set_macro(p.as_deref()),
                    LuaCommand::DeleteMacro(p) => scope.delete_macro(p.as_deref()),
                    LuaCommand::ShowMacro(p) => scope.show_macro(p.as_deref()),
                    LuaCommand::PerformMacro(command) => perform_macro(self, scope, &command)?,
                }
            }
            Ok(())
        }
    }

    impl Evaluator for LuaEvaluator {
        fn evaluate(&mut self, source: &str, scope: &mut Scope<'_>) -> Result<Value, EvalError> {
            self.prepare(scope).map_err(to_eval_error)?;
            let result = self.run(source);
            self.apply(scope)?;
            let values = result.map_err(to_eval_error)?;
            Ok(values.into_iter().next().map_or(Value::Undefined, |v| to_value(&v)))
        }

        fn is_complete(&self, source: &str) -> bool {
            let as_expr = self
                .lua
                .load(format!("return {source}"))
                .set_name(CHUNK_NAME)
                .into_function();
            let as_chunk = self.lua.load(source).set_name(CHUNK_NAME).into_function();
            match (as_expr, as_chunk) {
                (Ok(_), _) | (_, Ok(_)) => true,
                (Err(a), Err(b)) => !(is_incomplete(&a) || is_incomplete(&b)),
            }
        }
    }

    fn is_incomplete(e: &LuaError) -> bool {
        matches!(
            e,
            LuaError::SyntaxError {
                incomplete_input: true,
                ..
            }
        )
    }

    fn to_eval_error(e: LuaError) -> EvalError {
        match e {
            LuaError::SyntaxError { message, .. } => EvalError::Syntax(message),
            other => EvalError::Runtime(other.to_string()),
        }
    }

    fn display(v: &LuaValue) -> String {
        to_value(v).to_string()
    }

    /// Convert a Lua value to a console value.  Sequences become lists,
    /// other tables become maps.
    fn to_value(v: &LuaValue) -> Value {
        match v {
            LuaValue::Nil => Value::Undefined,
            LuaValue::Boolean(b) => Value::Bool(*b),
            LuaValue::Integer(i) => Value::Number(*i as f64),
            LuaValue::Number(n) => Value::Number(*n),
            LuaValue::String(s) => Value::Str(String::from(s.to_string_lossy())),
            LuaValue::Table(t) => {
                let pairs: Vec<(LuaValue, LuaValue)> =
                    t.clone().pairs().filter_map(Result::ok).collect();
                if !pairs.is_empty() && t.raw_len() == pairs.len() {
                    Value::List(
                        t.clone()
                            .sequence_values::<LuaValue>()
                            .filter_map(Result::ok)
                            .map(|v| to_value(&v))
                            .collect(),
                    )
                } else {
                    Value::Map(
                        pairs
                            .iter()
                            .map(|(k, v)| (to_value(k).to_string(), to_value(v)))
                            .collect::<BTreeMap<_, _>>(),
                    )
                }
            }
            other => Value::Str(other.type_name().to_owned()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
