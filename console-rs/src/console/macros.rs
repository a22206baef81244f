//! Console macro table.
//!
//! A macro is a named script body, invoked from the console as `:name params`.
//! The body may mention the placeholder [`PLACEHOLDER`]; when the macro is
//! echoed, each occurrence is shown replaced by the quoted parameter string,
//! but the body itself is evaluated unchanged with the parameters available to
//! it as the side value `PARAM`.
//!
//! The whole table is written to the settings store under [`SETTINGS_KEY`]
//! after every change, and read back from there when a session starts.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};
use tracing::{info, warn};

use super::escape::substitute_escape_codes;
use super::settings::SettingsStore;
use super::sink::{Category, MessageSink};
use super::token::get_one_token;

/// Settings key holding the persisted table.
pub const SETTINGS_KEY: &str = "macros";

/// Placeholder replaced by the quoted parameters in the expansion echo.
pub const PLACEHOLDER: &str = "PARAM";

/// Macros installed when the settings store has none.
pub const DEFAULT_MACROS: &[(&str, &str)] = &[
    ("setM", "setMacro(PARAM)"),
    ("delM", "deleteMacro(PARAM)"),
    ("showM", "showMacro(PARAM)"),
];

// ── MacroTable ────────────────────────────────────────────────────────────────

/// Name → body mapping.  Names never carry the call-site colon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    macros: BTreeMap<String, String>,
}

impl MacroTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding only [`DEFAULT_MACROS`].
    pub fn with_defaults() -> Self {
        Self {
            macros: DEFAULT_MACROS
                .iter()
                .map(|&(name, body)| (name.to_owned(), body.to_owned()))
                .collect(),
        }
    }

    /// Load the table persisted in `settings`, or the defaults if none is.
    ///
    /// A stored object replaces the defaults even when it is empty.  Entries
    /// whose value is not a string are skipped.
    pub fn load(settings: &dyn SettingsStore) -> Self {
        let Some(stored) = settings.get(SETTINGS_KEY) else {
            info!("no stored macros, using defaults");
            return Self::with_defaults();
        };
        let Json::Object(map) = stored else {
            warn!("stored macros are not an object, using defaults");
            return Self::with_defaults();
        };

        let mut table = Self::new();
        for (name, body) in map {
            match body {
                Json::String(body) => {
                    table.macros.insert(name, body);
                }
                other => warn!(macro_name = %name, value = %other, "skipping non-string macro body"),
            }
        }
        info!(count = table.len(), "loaded stored macros");
        table
    }

    /// Body of `name`, if defined.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    /// `true` when `name` is defined with a non-empty body.
    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some_and(|body| !body.is_empty())
    }

    /// Insert or overwrite a macro.  Returns the previous body.
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) -> Option<String> {
        self.macros.insert(name.into(), body.into())
    }

    /// Remove a macro.  Returns its body if it existed.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.macros.remove(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Iterate over `(name, body)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The table as a JSON object.
    pub fn to_json(&self) -> Json {
        let map: Map<String, Json> = self
            .macros
            .iter()
            .map(|(k, v)| (k.clone(), Json::String(v.clone())))
            .collect();
        Json::Object(map)
    }

    /// Write the whole table to `settings`.
    ///
    /// A failed write is logged; the in-memory table stays authoritative.
    pub fn persist(&self, settings: &mut dyn SettingsStore) {
        if let Err(e) = settings.set(SETTINGS_KEY, self.to_json()) {
            warn!(error = %e, "failed to persist macros");
        }
    }

    // ── Console commands ──────────────────────────────────────────────────────

    /// `setMacro("name body")`: define or redefine a macro.
    pub fn set_macro(
        &mut self,
        params: Option<&str>,
        settings: &mut dyn SettingsStore,
        sink: &mut dyn MessageSink,
    ) {
        let Some(params) = params.filter(|p| !p.is_empty()) else {
            return;
        };

        let (name, body) = get_one_token(params);
        match body.filter(|b| !b.is_empty()) {
            Some(body) => {
                self.insert(name, body);
                self.persist(settings);
                sink.emit(Category::MacroInfo, &format!("Set macro :{name}."), None);
            }
            None => sink.emit(
                Category::MacroError,
                "setMacro(): a macro definition must have a name and a body.",
                None,
            ),
        }
    }

    /// `deleteMacro("name")`: remove a macro.  A leading colon is accepted.
    pub fn delete_macro(
        &mut self,
        params: Option<&str>,
        settings: &mut dyn SettingsStore,
        sink: &mut dyn MessageSink,
    ) {
        let Some(name) = macro_name_arg(params) else {
            return;
        };

        if self.is_defined(name) {
            self.remove(name);
            self.persist(settings);
            sink.emit(Category::MacroInfo, &format!("Deleted macro :{name}."), None);
        } else {
            sink.emit(Category::MacroInfo, &not_defined(name), None);
        }
    }

    /// `showMacro("name")`: print a macro's body.  A leading colon is accepted.
    pub fn show_macro(&self, params: Option<&str>, sink: &mut dyn MessageSink) {
        let Some(name) = macro_name_arg(params) else {
            return;
        };

        match self.get(name).filter(|body| !body.is_empty()) {
            Some(body) => sink.emit(Category::MacroInfo, &format!(":{name} = {body}"), None),
            None => sink.emit(Category::MacroInfo, &not_defined(name), None),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Resolve the macro name argument of delete/show.
///
/// Takes the first token and strips one leading colon, except from the name
/// `":"` itself, which would otherwise become empty.
fn macro_name_arg(params: Option<&str>) -> Option<&str> {
    let params = params.filter(|p| !p.is_empty())?;
    let (name, _) = get_one_token(params);
    Some(match name.strip_prefix(':') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    })
}

pub(crate) fn not_defined(name: &str) -> String {
    format!("Macro :{name} is not defined.")
}

/// The echo form of a macro body: every [`PLACEHOLDER`] replaced by the
/// parameters as a double-quoted, escaped literal.
///
/// Without parameters (or with empty ones) the body is shown as-is.
pub fn display_expansion(body: &str, params: Option<&str>) -> String {
    match params.filter(|p| !p.is_empty()) {
        Some(p) => body.replace(PLACEHOLDER, &format!("\"{}\"", substitute_escape_codes(p))),
        None => body.to_owned(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
