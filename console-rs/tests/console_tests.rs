//! End-to-end console sessions driven through the public API with the
//! built-in script evaluator.

use ooconsole::console::{
    Category, Console, Emphasis, JsonFileSettings, MemorySettings, MemorySink, SettingsStore,
};
use ooconsole::error::{ConsoleError, EvalError};
use ooconsole::script::{ScriptEvaluator, Value};

type Session = Console<ScriptEvaluator, MemorySink, MemorySettings>;

fn session() -> Session {
    Console::new(ScriptEvaluator::new(), MemorySink::new(), MemorySettings::new())
}

/// Every line the sink received, in order.
fn transcript(c: &Session) -> Vec<(String, String)> {
    c.sink()
        .messages
        .iter()
        .map(|m| (m.category.name().to_owned(), m.text.clone()))
        .collect()
}

fn line(category: &str, text: &str) -> (String, String) {
    (category.to_owned(), text.to_owned())
}

// ── Dispatch and buffering ────────────────────────────────────────────────────

#[test]
fn multi_line_expression_evaluates_once() {
    let mut c = session();
    c.dispatch("1 +").unwrap();
    assert!(c.is_accumulating());
    assert_eq!(c.pending_input(), "\n1 +");
    c.dispatch("1").unwrap();
    assert!(!c.is_accumulating());
    assert_eq!(
        transcript(&c),
        vec![
            line("command", "> 1 +"),
            line("command", "> 1"),
            line("command-result", "2"),
        ]
    );
}

#[test]
fn echo_emphasis_covers_command_text() {
    let mut c = session();
    c.dispatch("   'héllo'").unwrap();
    let echo = &c.sink().messages[0];
    assert_eq!(echo.text, "> 'héllo'");
    assert_eq!(echo.emphasis, Some(Emphasis::new(2, 7)));
}

#[test]
fn blank_line_forces_evaluation_of_incomplete_input() {
    let mut c = session();
    c.dispatch("f(").unwrap();
    let err = c.dispatch("").unwrap_err();
    assert!(matches!(err, ConsoleError::Eval(EvalError::Syntax(_))));
    assert!(!c.is_accumulating());
}

#[test]
fn deeply_nested_line_is_a_syntax_error() {
    let mut c = session();
    for line in ["(".repeat(100_000), "-".repeat(100_000) + "1", "[".repeat(100_000)] {
        let err = c.dispatch(&line).unwrap_err();
        assert!(matches!(err, ConsoleError::Eval(EvalError::Syntax(_))), "{err}");
        assert!(!c.is_accumulating());
    }
    c.dispatch("x = 1").unwrap();
    c.dispatch("x + 1").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["1", "2"]);
}

#[test]
fn undefined_prints_nothing_and_null_prints_null() {
    let mut c = session();
    c.dispatch("x = undefined").unwrap();
    c.dispatch("null").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["null"]);
}

#[test]
fn runtime_error_leaves_session_usable() {
    let mut c = session();
    let err = c.dispatch("nosuch + 1").unwrap_err();
    assert_eq!(err.to_string(), "Error: nosuch is not defined");
    c.dispatch("2 * 21").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["42"]);
}

#[test]
fn macro_during_accumulation_keeps_buffer() {
    let mut c = session();
    c.dispatch("[1,").unwrap();
    c.dispatch(":showM setM").unwrap();
    assert_eq!(c.pending_input(), "\n[1,");
    c.dispatch("2].length").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["2"]);
    assert_eq!(
        c.sink().texts(&Category::MacroInfo),
        vec![":setM = setMacro(PARAM)"]
    );
}

// ── Macros ────────────────────────────────────────────────────────────────────

#[test]
fn greet_macro_end_to_end() {
    let mut c = session();
    c.dispatch(r#"  :setM greet consoleMessage("command-result","hi PARAM")"#)
        .unwrap();
    assert_eq!(
        c.macros().get("greet"),
        Some(r#"consoleMessage("command-result","hi PARAM")"#)
    );
    c.sink_mut().take();

    c.dispatch(":greet world").unwrap();
    assert_eq!(
        transcript(&c),
        vec![
            line("command", "> :greet world"),
            line(
                "macro-expansion",
                r#"> consoleMessage("command-result","hi "world"")"#
            ),
            // The body runs unsubstituted; PARAM inside a string stays literal.
            line("command-result", "hi PARAM"),
        ]
    );
}

#[test]
fn macro_body_sees_param_value() {
    let mut c = session();
    c.dispatch(":setM greet consoleMessage('command-result', 'hi ' + PARAM)")
        .unwrap();
    c.dispatch(":greet big world").unwrap();
    assert_eq!(
        c.sink().texts(&Category::CommandResult),
        vec!["hi big world"]
    );
    assert_eq!(
        c.sink().texts(&Category::MacroExpansion).last().copied(),
        Some(r#"> consoleMessage('command-result', 'hi ' + "big world")"#)
    );
}

#[test]
fn macro_without_params_sees_null() {
    let mut c = session();
    c.dispatch(":setM what PARAM === null").unwrap();
    c.dispatch(":what").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["true"]);
    assert_eq!(
        c.sink().texts(&Category::MacroExpansion).last().copied(),
        Some("> PARAM === null")
    );
}

#[test]
fn macro_value_result_is_printed() {
    let mut c = session();
    c.dispatch(":setM double PARAM * 2").unwrap();
    c.dispatch(":double 21").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["42"]);
}

#[test]
fn set_macro_without_body_is_rejected() {
    let mut c = session();
    c.dispatch(":setM lonely").unwrap();
    assert_eq!(
        c.sink().texts(&Category::MacroError),
        vec!["setMacro(): a macro definition must have a name and a body."]
    );
    assert_eq!(c.macros().len(), 3);
}

#[test]
fn redefinition_replaces_body() {
    let mut c = session();
    c.dispatch(":setM m 1").unwrap();
    c.dispatch(":setM m 2").unwrap();
    assert_eq!(c.macros().get("m"), Some("2"));
    assert_eq!(c.macros().len(), 4);
}

#[test]
fn delete_and_show() {
    let mut c = session();
    c.dispatch(":setM m 1").unwrap();
    c.dispatch(":delM :m").unwrap();
    c.dispatch(":showM m").unwrap();
    c.dispatch(":m").unwrap();
    assert_eq!(
        c.sink().texts(&Category::MacroInfo),
        vec!["Set macro :m.", "Deleted macro :m.", "Macro :m is not defined."]
    );
    assert_eq!(
        c.sink().texts(&Category::UnknownMacro),
        vec!["Macro :m is not defined."]
    );
}

#[test]
fn unknown_macro_does_not_evaluate() {
    let mut c = session();
    c.dispatch(":nothing here").unwrap();
    assert_eq!(
        transcript(&c),
        vec![
            line("command", "> :nothing here"),
            line("unknown-macro", "Macro :nothing is not defined."),
        ]
    );
}

#[test]
fn macros_persist_to_settings() {
    let mut c = session();
    c.dispatch(":setM hello consoleMessage('general', 'hello')").unwrap();
    let stored = c.settings().get("macros").unwrap();
    assert_eq!(
        stored["hello"],
        serde_json::json!("consoleMessage('general', 'hello')")
    );
    assert_eq!(stored["setM"], serde_json::json!("setMacro(PARAM)"));
}

#[test]
fn macros_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    {
        let settings = JsonFileSettings::open(&path).unwrap();
        let mut c = Console::new(ScriptEvaluator::new(), MemorySink::new(), settings);
        c.dispatch(":setM sq PARAM * PARAM").unwrap();
        c.dispatch(":delM showM").unwrap();
    }

    let settings = JsonFileSettings::open(&path).unwrap();
    let mut c = Console::new(ScriptEvaluator::new(), MemorySink::new(), settings);
    assert!(c.macros().is_defined("sq"));
    assert!(!c.macros().is_defined("showM"));
    c.dispatch(":sq 9").unwrap();
    assert_eq!(c.sink().texts(&Category::CommandResult), vec!["81"]);
}

#[test]
fn nested_macros_through_perform_macro() {
    let mut c = session();
    c.dispatch(":setM inner consoleMessage('general', 'inner ' + PARAM)").unwrap();
    c.dispatch(":setM outer performMacro(':inner ' + PARAM)").unwrap();
    c.dispatch(":outer x").unwrap();
    assert_eq!(c.sink().texts(&Category::General), vec!["inner x"]);
    assert_eq!(c.sink().texts(&Category::MacroExpansion).len(), 2);
}

#[test]
fn recursive_macro_is_stopped() {
    let mut c = session();
    c.dispatch(":setM again performMacro(':again')").unwrap();
    let err = c.dispatch(":again").unwrap_err();
    assert_eq!(err.to_string(), "Error: too much recursion");
}

// ── Script built-ins ──────────────────────────────────────────────────────────

#[test]
fn session_globals_carry_over() {
    let mut c = session();
    c.dispatch("let ships = ['cobra', 'viper']").unwrap();
    c.dispatch("printList(ships)").unwrap();
    assert_eq!(
        c.sink().texts(&Category::PrintList),
        vec!["2 items:", "  cobra", "  viper"]
    );
    assert_eq!(
        c.evaluator().global("ships"),
        Some(&Value::List(vec!["cobra".into(), "viper".into()]))
    );
}

#[test]
fn set_color_from_string_reaches_sink_and_settings() {
    let mut c = session();
    c.dispatch(r#"setColorFromString("command-result 'green'", "foreground")"#)
        .unwrap();
    assert_eq!(
        c.settings().get("command-result-foreground-color"),
        Some(serde_json::json!("green"))
    );
    assert_eq!(
        c.sink().colors,
        vec![(
            "command-result".to_owned(),
            "foreground".to_owned(),
            "green".to_owned()
        )]
    );
    assert_eq!(
        c.sink().texts(&Category::CommandResult),
        vec!["Set foreground colour “command-result” to 'green'."]
    );
}

#[test]
fn clear_console_and_custom_categories() {
    let mut c = session();
    c.dispatch("clearConsole()").unwrap();
    c.dispatch("consoleMessage('my-colour', 'text')").unwrap();
    assert_eq!(c.sink().clears, 1);
    assert_eq!(
        c.sink().texts(&Category::Custom("my-colour".to_owned())),
        vec!["text"]
    );
}
