//! Tree-walking interpreter for console script.
//!
//! [`ScriptEvaluator`] keeps session globals between evaluations and reaches
//! the console through the [`Scope`] it is handed: `PARAM`, printing, the
//! macro table and settings.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::builtins::{call_builtin, call_method};
use super::expr::{self, AssignOp, BinOp, Expr, Stmt, UnaryOp};
use super::value::Value;
use crate::console::eval::{perform_macro, Evaluator, Scope};
use crate::console::macros::PLACEHOLDER;
use crate::console::sink::{Category, Emphasis};
use crate::console::token::get_one_token;
use crate::error::EvalError;

/// Name under which scripts see a snapshot of the macro table.
pub const MACROS_GLOBAL: &str = "macros";

const DEPRECATED_CONSOLE_MESSAGE: &str =
    "Warning: ConsoleMessage() is deprecated. Use consoleMessage() instead.";

/// The built-in console script evaluator.
#[derive(Debug, Default)]
pub struct ScriptEvaluator {
    globals: HashMap<String, Value>,
}

impl ScriptEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    // ── Statements ────────────────────────────────────────────────────────────

    /// Run `stmts`, leaving the value of the last expression statement in
    /// `completion`.
    fn exec_block(
        &mut self,
        stmts: &[Stmt],
        scope: &mut Scope<'_>,
        completion: &mut Value,
    ) -> Result<(), EvalError> {
        for stmt in stmts {
            self.exec_stmt(stmt, scope, completion)?;
        }
        Ok(())
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
        scope: &mut Scope<'_>,
        completion: &mut Value,
    ) -> Result<(), EvalError> {
        match stmt {
            Stmt::Expr(e) => *completion = self.eval(e, scope)?,
            Stmt::Let(decls) => {
                for (name, init) in decls {
                    check_assignable(name)?;
                    match init {
                        Some(e) => {
                            let v = self.eval(e, scope)?;
                            self.globals.insert(name.clone(), v);
                        }
                        None => {
                            self.globals.entry(name.clone()).or_default();
                        }
                    }
                }
            }
            Stmt::Block(body) => self.exec_block(body, scope, completion)?,
            Stmt::If(cond, then, otherwise) => {
                if self.eval(cond, scope)?.is_truthy() {
                    self.exec_stmt(then, scope, completion)?;
                } else if let Some(otherwise) = otherwise {
                    self.exec_stmt(otherwise, scope, completion)?;
                }
            }
            Stmt::Empty => {}
        }
        Ok(())
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn lookup(&self, name: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        match name {
            PLACEHOLDER => Ok(scope.param_value()),
            MACROS_GLOBAL => Ok(Value::from(&scope.macros.to_json())),
            _ => self
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::runtime(format!("{name} is not defined"))),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &mut Scope<'_>) -> Result<Value, EvalError> {
        Ok(match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Var(name) => self.lookup(name, scope)?,
            Expr::List(items) => Value::List(self.eval_all(items, scope)?),
            Expr::Object(fields) => {
                let mut map = std::collections::BTreeMap::new();
                for (k, e) in fields {
                    map.insert(k.clone(), self.eval(e, scope)?);
                }
                Value::Map(map)
            }
            // `typeof` an undeclared name is not an error.
            Expr::Unary(UnaryOp::TypeOf, operand) if matches!(operand.as_ref(), Expr::Var(_)) => {
                let v = match operand.as_ref() {
                    Expr::Var(name) => self.lookup(name, scope).unwrap_or_default(),
                    _ => Value::Undefined,
                };
                Value::Str(v.type_name().to_owned())
            }
            Expr::Unary(op, operand) => {
                let v = self.eval(operand, scope)?;
                match op {
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                    UnaryOp::Plus => Value::Number(v.to_number()),
                    UnaryOp::Not => Value::Bool(!v.is_truthy()),
                    UnaryOp::BitNot => Value::Number(f64::from(!v.to_i32())),
                    UnaryOp::TypeOf => Value::Str(v.type_name().to_owned()),
                }
            }
            Expr::Binary(BinOp::And, lhs, rhs) => {
                let l = self.eval(lhs, scope)?;
                if l.is_truthy() {
                    self.eval(rhs, scope)?
                } else {
                    l
                }
            }
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                let l = self.eval(lhs, scope)?;
                if l.is_truthy() {
                    l
                } else {
                    self.eval(rhs, scope)?
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs, scope)?;
                let r = self.eval(rhs, scope)?;
                binary(*op, &l, &r)
            }
            Expr::Ternary(cond, then, otherwise) => {
                if self.eval(cond, scope)?.is_truthy() {
                    self.eval(then, scope)?
                } else {
                    self.eval(otherwise, scope)?
                }
            }
            Expr::Assign(name, op, rhs) => {
                check_assignable(name)?;
                let rhs = self.eval(rhs, scope)?;
                let value = match assign_op(*op) {
                    None => rhs,
                    Some(bin) => binary(bin, &self.lookup(name, scope)?, &rhs),
                };
                self.globals.insert(name.clone(), value.clone());
                value
            }
            Expr::Call(name, args) => {
                let args = self.eval_all(args, scope)?;
                self.call(name, &args, scope)?
            }
            Expr::Method(receiver, name, args) => {
                let receiver = self.eval(receiver, scope)?;
                let args = self.eval_all(args, scope)?;
                call_method(&receiver, name, &args)?
            }
            Expr::Index(object, key) => {
                let object = self.eval(object, scope)?;
                let key = self.eval(key, scope)?;
                if matches!(object, Value::Undefined | Value::Null) {
                    return Err(EvalError::runtime(format!("{object} has no properties")));
                }
                object.property(&key)
            }
        })
    }

    fn eval_all(&mut self, exprs: &[Expr], scope: &mut Scope<'_>) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|e| self.eval(e, scope)).collect()
    }

    // ── Console functions ─────────────────────────────────────────────────────

    fn call(&mut self, name: &str, args: &[Value], scope: &mut Scope<'_>) -> Result<Value, EvalError> {
        match name {
            "consoleMessage" => console_message(args, scope),
            "ConsoleMessage" => {
                scope.emit(
                    Category::Warning,
                    DEPRECATED_CONSOLE_MESSAGE,
                    Some(Emphasis::new(0, 8)),
                );
                console_message(args, scope);
            }
            "clearConsole" => scope.sink.clear(),
            "setMacro" => scope.set_macro(macro_params(args).as_deref()),
            "deleteMacro" => scope.delete_macro(macro_params(args).as_deref()),
            "showMacro" => scope.show_macro(macro_params(args).as_deref()),
            "performMacro" => {
                if let Some(command) = macro_params(args) {
                    perform_macro(self, scope, &command)?;
                }
            }
            "dumpObjectShort" | "dumpObjectLong" => {
                let x = args.first().cloned().unwrap_or_default();
                if matches!(x, Value::Undefined | Value::Null) {
                    return Err(EvalError::runtime(format!("{x} has no properties")));
                }
                scope.emit(Category::DumpObject, &format!("{x}:"), None);
                for key in x.keys() {
                    let line = if name == "dumpObjectLong" {
                        format!("    {key} = {}", x.property(&Value::Str(key.clone())))
                    } else {
                        format!("    {key}")
                    };
                    scope.emit(Category::DumpObject, &line, None);
                }
            }
            "printList" => {
                let list = args.first().cloned().unwrap_or_default();
                let length = list.property(&Value::from("length")).to_number();
                // A script-supplied `length` never exceeds what is stored.
                let stored = list
                    .keys()
                    .iter()
                    .filter(|k| k.parse::<usize>().is_ok())
                    .count();
                let length = if length.is_finite() && length > 0.0 {
                    (length as usize).min(stored)
                } else {
                    0
                };
                scope.emit(Category::PrintList, &format!("{length} items:"), None);
                for i in 0..length {
                    let item = list.property(&Value::Number(i as f64));
                    scope.emit(Category::PrintList, &format!("  {item}"), None);
                }
            }
            "setColorFromString" => self.set_color_from_string(args, scope)?,
            _ => {
                return call_builtin(name, args)
                    .unwrap_or_else(|| Err(EvalError::runtime(format!("{name} is not defined"))))
            }
        }
        Ok(Value::Undefined)
    }

    /// `setColorFromString("key value-expression", typeName)`.
    fn set_color_from_string(
        &mut self,
        args: &[Value],
        scope: &mut Scope<'_>,
    ) -> Result<(), EvalError> {
        let spec = args.first().cloned().unwrap_or_default().to_string();
        let type_name = args.get(1).cloned().unwrap_or_default().to_string();
        let (key, value_src) = get_one_token(&spec);
        let value_src = value_src.unwrap_or_default();

        let value_expr = expr::parse_expr(value_src)?;
        let value = self.eval(&value_expr, scope)?;
        let full_key = format!("{key}-{type_name}-color");
        debug!(key = %full_key, value = %value, "setting colour");

        if let Err(e) = scope.settings.set(&full_key, value.to_json()) {
            warn!(key = %full_key, error = %e, "failed to persist colour setting");
        }
        scope.sink.set_color(key, &type_name, &value.to_string());
        scope.emit(
            Category::CommandResult,
            &format!("Set {type_name} colour “{key}” to {value_src}."),
            None,
        );
        Ok(())
    }
}

impl Evaluator for ScriptEvaluator {
    fn evaluate(&mut self, source: &str, scope: &mut Scope<'_>) -> Result<Value, EvalError> {
        let program = expr::parse_program(source)?;
        let mut completion = Value::Undefined;
        self.exec_block(&program, scope, &mut completion)?;
        Ok(completion)
    }

    fn is_complete(&self, source: &str) -> bool {
        expr::is_complete(source)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn check_assignable(name: &str) -> Result<(), EvalError> {
    if name == PLACEHOLDER || name == MACROS_GLOBAL {
        Err(EvalError::runtime(format!("{name} is read-only")))
    } else {
        Ok(())
    }
}

/// `consoleMessage(colorCode, text[, emphasisStart, emphasisLength])`.
///
/// A `null` or missing colour code means `general`.
fn console_message(args: &[Value], scope: &mut Scope<'_>) {
    let category = match args.first() {
        None | Some(Value::Undefined | Value::Null) => Category::General,
        Some(code) => Category::from(code.to_string().as_str()),
    };
    let text = args.get(1).cloned().unwrap_or_default().to_string();
    let emphasis = match (args.get(2), args.get(3)) {
        (Some(start), Some(length)) => {
            let clamp = |v: &Value| {
                let n = v.to_number();
                if n.is_finite() && n > 0.0 {
                    n as usize
                } else {
                    0
                }
            };
            Some(Emphasis::new(clamp(start), clamp(length)))
        }
        _ => None,
    };
    scope.emit(category, &text, emphasis);
}

/// Macro built-ins take a string, or nothing for a no-op.
fn macro_params(args: &[Value]) -> Option<String> {
    match args.first() {
        None | Some(Value::Undefined | Value::Null) => None,
        Some(v) => Some(v.to_string()),
    }
}

fn assign_op(op: AssignOp) -> Option<BinOp> {
    match op {
        AssignOp::Set => None,
        AssignOp::Add => Some(BinOp::Add),
        AssignOp::Sub => Some(BinOp::Sub),
        AssignOp::Mul => Some(BinOp::Mul),
        AssignOp::Div => Some(BinOp::Div),
        AssignOp::Rem => Some(BinOp::Rem),
        AssignOp::BitXor => Some(BinOp::BitXor),
    }
}

/// Apply a non-short-circuiting binary operator.
fn binary(op: BinOp, l: &Value, r: &Value) -> Value {
    use std::cmp::Ordering::*;
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(l.to_number(), r.to_number()));
    let int = |f: fn(i32, i32) -> i32| Value::Number(f64::from(f(l.to_i32(), r.to_i32())));
    match op {
        BinOp::Add => l.add(r),
        BinOp::Sub => num(|a, b| a - b),
        BinOp::Mul => num(|a, b| a * b),
        BinOp::Div => num(|a, b| a / b),
        BinOp::Rem => num(|a, b| a % b),
        BinOp::Eq => Value::Bool(l.loose_eq(r)),
        BinOp::Ne => Value::Bool(!l.loose_eq(r)),
        BinOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinOp::StrictNe => Value::Bool(!l.strict_eq(r)),
        BinOp::Lt => Value::Bool(l.compare(r) == Some(Less)),
        BinOp::Le => Value::Bool(matches!(l.compare(r), Some(Less | Equal))),
        BinOp::Gt => Value::Bool(l.compare(r) == Some(Greater)),
        BinOp::Ge => Value::Bool(matches!(l.compare(r), Some(Greater | Equal))),
        BinOp::BitAnd => int(|a, b| a & b),
        BinOp::BitOr => int(|a, b| a | b),
        BinOp::BitXor => int(|a, b| a ^ b),
        BinOp::Shl => int(|a, b| a.wrapping_shl(b as u32 & 31)),
        BinOp::Shr => int(|a, b| a.wrapping_shr(b as u32 & 31)),
        // Short-circuit operators are evaluated by the caller.
        BinOp::And | BinOp::Or => Value::Undefined,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::eval::EvalKind;
    use crate::console::macros::MacroTable;
    use crate::console::settings::{MemorySettings, SettingsStore};
    use crate::console::sink::MemorySink;

    struct Harness {
        eval: ScriptEvaluator,
        macros: MacroTable,
        sink: MemorySink,
        settings: MemorySettings,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                eval: ScriptEvaluator::new(),
                macros: MacroTable::with_defaults(),
                sink: MemorySink::new(),
                settings: MemorySettings::new(),
            }
        }

        fn run_with(&mut self, kind: EvalKind, param: Option<&str>, src: &str) -> Result<Value, EvalError> {
            let mut scope = Scope::new(kind, param, &mut self.macros, &mut self.sink, &mut self.settings);
            self.eval.evaluate(src, &mut scope)
        }

        fn run(&mut self, src: &str) -> Result<Value, EvalError> {
            self.run_with(EvalKind::Command, None, src)
        }

        fn ok(&mut self, src: &str) -> Value {
            self.run(src).unwrap_or_else(|e| panic!("{src:?} failed: {e}"))
        }

        fn ok_err(&mut self, src: &str) -> EvalError {
            self.run(src).expect_err("expected failure")
        }
    }

    #[test]
    fn arithmetic_and_strings() {
        let mut h = Harness::new();
        assert_eq!(h.ok("\n1 +\n1"), Value::Number(2.0));
        assert_eq!(h.ok("'a' + 1 + 2"), Value::from("a12"));
        assert_eq!(h.ok("7 % 4 * 2"), Value::Number(6.0));
        assert_eq!(h.ok("1 / 0"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn completion_value_is_last_expression() {
        let mut h = Harness::new();
        assert_eq!(h.ok("let x = 2; x * 3"), Value::Number(6.0));
        assert_eq!(h.ok("let y = 1"), Value::Undefined);
        assert_eq!(h.ok(""), Value::Undefined);
    }

    #[test]
    fn globals_persist_across_evaluations() {
        let mut h = Harness::new();
        h.ok("counter = 1");
        h.ok("counter += 4");
        assert_eq!(h.ok("counter"), Value::Number(5.0));
        assert_eq!(h.eval.global("counter"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn xor_assign_toggles_flags() {
        let mut h = Harness::new();
        h.ok("debugFlags = 0x41");
        assert_eq!(h.ok("debugFlags ^= 0x40"), Value::Number(1.0));
    }

    #[test]
    fn undefined_variable_is_reference_error() {
        let mut h = Harness::new();
        assert_eq!(
            h.run("nope"),
            Err(EvalError::runtime("nope is not defined"))
        );
        assert_eq!(h.ok("typeof nope"), Value::from("undefined"));
    }

    #[test]
    fn syntax_error_surfaces() {
        let mut h = Harness::new();
        assert!(matches!(h.run("1 +"), Err(EvalError::Syntax(_))));
        assert!(matches!(h.run("1 2"), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn short_circuit_and_ternary() {
        let mut h = Harness::new();
        assert_eq!(h.ok("0 || 'x'"), Value::from("x"));
        assert_eq!(h.ok("0 && nope"), Value::Number(0.0));
        assert_eq!(h.ok("1 < 2 ? 'yes' : 'no'"), Value::from("yes"));
        assert_eq!(h.ok("'10' == 10"), Value::Bool(true));
        assert_eq!(h.ok("'10' === 10"), Value::Bool(false));
    }

    #[test]
    fn if_else_statement() {
        let mut h = Harness::new();
        assert_eq!(h.ok("if (0) { 'a' } else { 'b' }"), Value::from("b"));
    }

    #[test]
    fn param_depends_on_kind() {
        let mut h = Harness::new();
        assert_eq!(h.ok("typeof PARAM"), Value::from("undefined"));
        assert_eq!(
            h.run_with(EvalKind::Macro, None, "PARAM").unwrap(),
            Value::Null
        );
        assert_eq!(
            h.run_with(EvalKind::Macro, Some("x y"), "PARAM.length").unwrap(),
            Value::Number(3.0)
        );
        assert!(h.run("PARAM = 1").is_err());
    }

    #[test]
    fn console_message_null_code_is_general() {
        let mut h = Harness::new();
        h.ok("consoleMessage(null, 'a')");
        h.ok("consoleMessage(undefined, 'b')");
        h.ok("consoleMessage('null', 'c')");
        let categories: Vec<_> = h.sink.messages.iter().map(|m| m.category.clone()).collect();
        assert_eq!(
            categories,
            vec![
                Category::General,
                Category::General,
                Category::Custom("null".to_owned())
            ]
        );
    }

    #[test]
    fn print_list_length_bounded_by_contents() {
        let mut h = Harness::new();
        h.ok("printList({ length: 1e12 })");
        h.ok("printList({ 0: 'x', length: 3 })");
        assert_eq!(
            h.sink.texts(&Category::PrintList),
            vec!["0 items:", "1 items:", "  x"]
        );
    }

    #[test]
    fn console_message_with_emphasis() {
        let mut h = Harness::new();
        h.ok("consoleMessage('command-result', 'hello world', 6, 5)");
        let m = &h.sink.messages[0];
        assert_eq!(m.category, Category::CommandResult);
        assert_eq!(m.text, "hello world");
        assert_eq!(m.emphasis, Some(Emphasis::new(6, 5)));
    }

    #[test]
    fn deprecated_console_message_warns_first() {
        let mut h = Harness::new();
        h.ok("ConsoleMessage('general', 'x')");
        assert_eq!(h.sink.messages[0].category, Category::Warning);
        assert_eq!(h.sink.messages[0].text, DEPRECATED_CONSOLE_MESSAGE);
        assert_eq!(h.sink.messages[0].emphasis, Some(Emphasis::new(0, 8)));
        assert_eq!(h.sink.messages[1].text, "x");
    }

    #[test]
    fn clear_console_reaches_sink() {
        let mut h = Harness::new();
        h.ok("clearConsole()");
        assert_eq!(h.sink.clears, 1);
    }

    #[test]
    fn macro_builtins_edit_table() {
        let mut h = Harness::new();
        h.ok("setMacro('hi consoleMessage(\"general\", \"hi\")')");
        assert!(h.macros.is_defined("hi"));
        assert!(h.settings.get("macros").is_some());
        h.ok("showMacro(':hi')");
        assert_eq!(
            h.sink.texts(&Category::MacroInfo).last().copied(),
            Some(":hi = consoleMessage(\"general\", \"hi\")")
        );
        h.ok("deleteMacro('hi')");
        assert!(!h.macros.is_defined("hi"));
        h.ok("setMacro()");
        assert!(h.sink.texts(&Category::MacroError).is_empty());
    }

    #[test]
    fn macros_global_is_snapshot() {
        let mut h = Harness::new();
        assert_eq!(h.ok("macros.setM"), Value::from("setMacro(PARAM)"));
        assert!(h.run("macros = 1").is_err());
    }

    #[test]
    fn perform_macro_builtin_recurses_through_console() {
        let mut h = Harness::new();
        h.macros.insert("sq", "PARAM * PARAM");
        h.ok("performMacro(':sq 4')");
        assert_eq!(h.sink.texts(&Category::MacroExpansion), vec!["> \"4\" * \"4\""]);
        assert_eq!(h.sink.texts(&Category::CommandResult), vec!["16"]);
    }

    #[test]
    fn runaway_macro_recursion_is_stopped() {
        let mut h = Harness::new();
        h.macros.insert("loop", "performMacro(':loop')");
        let err = h.ok_err("performMacro(':loop')");
        assert_eq!(err, EvalError::runtime("too much recursion"));
    }

    #[test]
    fn dump_object_and_print_list() {
        let mut h = Harness::new();
        h.ok("dumpObjectLong({ a: 1, b: 'x' })");
        assert_eq!(
            h.sink.texts(&Category::DumpObject),
            vec!["[object Object]:", "    a = 1", "    b = x"]
        );
        h.ok("dumpObjectShort([7])");
        assert_eq!(h.sink.texts(&Category::DumpObject)[3..].to_vec(), vec!["7:", "    0"]);
        h.ok("printList(['a', 2])");
        assert_eq!(
            h.sink.texts(&Category::PrintList),
            vec!["2 items:", "  a", "  2"]
        );
        assert!(h.run("dumpObjectShort(null)").is_err());
    }

    #[test]
    fn set_color_from_string_stores_setting() {
        let mut h = Harness::new();
        h.ok("setColorFromString('macro-error { hue: 0 }', 'foreground')");
        assert_eq!(
            h.settings.get("macro-error-foreground-color"),
            Some(serde_json::json!({ "hue": 0 }))
        );
        assert_eq!(
            h.sink.colors,
            vec![(
                "macro-error".to_owned(),
                "foreground".to_owned(),
                "[object Object]".to_owned()
            )]
        );
        assert_eq!(
            h.sink.texts(&Category::CommandResult),
            vec!["Set foreground colour “macro-error” to { hue: 0 }."]
        );
    }

    #[test]
    fn set_color_without_value_is_syntax_error() {
        let mut h = Harness::new();
        assert!(matches!(
            h.run("setColorFromString('command', 'background')"),
            Err(EvalError::Syntax(_))
        ));
    }

    #[test]
    fn string_helpers_available() {
        let mut h = Harness::new();
        assert_eq!(
            h.ok("getOneToken('a b c')[1]"),
            Value::from("b c")
        );
        assert_eq!(h.ok("'x y'.getOneToken()[0]"), Value::from("x"));
        assert_eq!(h.ok("substituteEscapeCodes('\\'')"), Value::from("\\'"));
    }

    #[test]
    fn unknown_function_fails() {
        let mut h = Harness::new();
        assert_eq!(
            h.run("frobnicate()"),
            Err(EvalError::runtime("frobnicate is not defined"))
        );
    }

    #[test]
    fn completeness_oracle() {
        let e = ScriptEvaluator::new();
        assert!(!e.is_complete("\nfoo("));
        assert!(e.is_complete("\nfoo()"));
    }
}
