//! Message categories and the output side of the console.
//!
//! Every line the console produces goes through a [`MessageSink`] together
//! with a [`Category`] (the "colour code" a front end uses to style it) and an
//! optional emphasised character range.

use std::fmt;
use std::str::FromStr;

// ── Category ──────────────────────────────────────────────────────────────────

/// Classification of a console line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    General,
    /// Echo of the line the user typed.
    Command,
    CommandResult,
    MacroInfo,
    MacroError,
    MacroExpansion,
    UnknownMacro,
    DumpObject,
    PrintList,
    Warning,
    /// Any other code chosen by a script through `consoleMessage()`.
    Custom(String),
}

impl Category {
    /// Every named category, in display-config order.
    pub const NAMED: &'static [Category] = &[
        Category::General,
        Category::Command,
        Category::CommandResult,
        Category::MacroInfo,
        Category::MacroError,
        Category::MacroExpansion,
        Category::UnknownMacro,
        Category::DumpObject,
        Category::PrintList,
        Category::Warning,
    ];

    /// The wire name of this category, as used in settings and config keys.
    pub fn name(&self) -> &str {
        match self {
            Category::General => "general",
            Category::Command => "command",
            Category::CommandResult => "command-result",
            Category::MacroInfo => "macro-info",
            Category::MacroError => "macro-error",
            Category::MacroExpansion => "macro-expansion",
            Category::UnknownMacro => "unknown-macro",
            Category::DumpObject => "dumpObject",
            Category::PrintList => "printList",
            Category::Warning => "warning",
            Category::Custom(s) => s,
        }
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::NAMED
            .iter()
            .find(|c| c.name() == s)
            .cloned()
            .unwrap_or_else(|| Category::Custom(s.to_owned())))
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(c) => c,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Emphasis ──────────────────────────────────────────────────────────────────

/// A highlighted range of a message, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emphasis {
    pub start: usize,
    pub length: usize,
}

impl Emphasis {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Split `text` into (before, emphasised, after), clamped to its length.
    pub fn split<'a>(&self, text: &'a str) -> (&'a str, &'a str, &'a str) {
        let byte_at = |n: usize| {
            text.char_indices()
                .nth(n)
                .map(|(i, _)| i)
                .unwrap_or(text.len())
        };
        let start = byte_at(self.start);
        let end = byte_at(self.start.saturating_add(self.length));
        (&text[..start], &text[start..end], &text[end..])
    }
}

// ── MessageSink ───────────────────────────────────────────────────────────────

/// Destination for console output.
pub trait MessageSink {
    /// Write one categorised line.
    fn emit(&mut self, category: Category, text: &str, emphasis: Option<Emphasis>);

    /// Clear whatever the sink displays.
    fn clear(&mut self) {}

    /// A script changed the colour used for `key` (a category name);
    /// `kind` is e.g. `"foreground"` or `"background"`.
    fn set_color(&mut self, _key: &str, _kind: &str, _value: &str) {}
}

/// One recorded line of a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub category: Category,
    pub text: String,
    pub emphasis: Option<Emphasis>,
}

/// Sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<Message>,
    pub clears: usize,
    pub colors: Vec<(String, String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts of every recorded line in `category`, oldest first.
    pub fn texts(&self, category: &Category) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| &m.category == category)
            .map(|m| m.text.as_str())
            .collect()
    }

    /// Remove and return all recorded lines.
    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }
}

impl MessageSink for MemorySink {
    fn emit(&mut self, category: Category, text: &str, emphasis: Option<Emphasis>) {
        self.messages.push(Message {
            category,
            text: text.to_owned(),
            emphasis,
        });
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.clears += 1;
    }

    fn set_color(&mut self, key: &str, kind: &str, value: &str) {
        self.colors
            .push((key.to_owned(), kind.to_owned(), value.to_owned()));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for c in Category::NAMED {
            assert_eq!(&Category::from(c.name()), c);
        }
    }

    #[test]
    fn unknown_category_is_custom() {
        assert_eq!(
            Category::from("shiny"),
            Category::Custom("shiny".to_owned())
        );
        assert_eq!(Category::from("shiny").name(), "shiny");
    }

    #[test]
    fn emphasis_split_counts_chars() {
        let e = Emphasis::new(2, 3);
        assert_eq!(e.split("> héllo"), ("> ", "hél", "lo"));
    }

    #[test]
    fn emphasis_split_clamps() {
        let e = Emphasis::new(2, 100);
        assert_eq!(e.split("> ab"), ("> ", "ab", ""));
        assert_eq!(Emphasis::new(10, 1).split("ab"), ("ab", "", ""));
    }

    #[test]
    fn memory_sink_records_and_filters() {
        let mut sink = MemorySink::new();
        sink.emit(Category::Command, "> x", Some(Emphasis::new(2, 1)));
        sink.emit(Category::CommandResult, "1", None);
        assert_eq!(sink.texts(&Category::CommandResult), vec!["1"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.messages.is_empty());
    }
}
