//! Terminal output for console messages.
//!
//! [`TerminalSink`] is the [`MessageSink`] used by the interactive binary.
//! Each message category has a foreground/background colour pair; the
//! emphasised range of a message is drawn bold on top of that style.
//! Colours can be changed at runtime through `setColorFromString`, which
//! arrives here as [`MessageSink::set_color`].

use std::collections::HashMap;
use std::io::{self, Write};

use crossterm::{
    cursor, queue,
    style::{Attribute, Color, ContentStyle, Print, ResetColor, SetStyle},
    terminal::{self, ClearType},
};
use tracing::{debug, warn};

use crate::console::sink::{Category, Emphasis, MessageSink};

// ── Colours ───────────────────────────────────────────────────────────────────

/// Foreground and background for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl CategoryStyle {
    fn content_style(self) -> ContentStyle {
        let mut style = ContentStyle::new();
        style.foreground_color = self.fg;
        style.background_color = self.bg;
        style
    }
}

/// Built-in foreground colours, keyed by category name.
const DEFAULT_PALETTE: &[(&str, Color)] = &[
    ("command", Color::Cyan),
    ("command-result", Color::Green),
    ("macro-info", Color::DarkYellow),
    ("macro-error", Color::Red),
    ("macro-expansion", Color::DarkCyan),
    ("unknown-macro", Color::Red),
    ("dumpObject", Color::Grey),
    ("printList", Color::Grey),
    ("warning", Color::Yellow),
    ("error", Color::Red),
    ("exception", Color::Red),
];

/// Parse a colour name (`red`, `dark_grey`, …) or `#rrggbb`.
pub fn parse_color(name: &str) -> Option<Color> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(Color::Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    Color::try_from(name.to_lowercase().replace('-', "_").as_str()).ok()
}

// ── TerminalSink ──────────────────────────────────────────────────────────────

/// Writes console messages to a terminal, one per line.
pub struct TerminalSink<W: Write = io::Stdout> {
    out: W,
    color: bool,
    palette: HashMap<String, CategoryStyle>,
}

impl TerminalSink<io::Stdout> {
    /// A sink on standard output.
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> TerminalSink<W> {
    /// Create a sink writing to `out`.  With `color` off, messages are plain
    /// text and [`clear`](MessageSink::clear) does nothing.
    pub fn new(out: W, color: bool) -> Self {
        let palette = DEFAULT_PALETTE
            .iter()
            .map(|&(name, fg)| {
                (
                    name.to_owned(),
                    CategoryStyle {
                        fg: Some(fg),
                        bg: None,
                    },
                )
            })
            .collect();
        Self {
            out,
            color,
            palette,
        }
    }

    /// Override the foreground colour of a category.
    pub fn set_foreground(&mut self, category: &str, color: Color) {
        self.palette.entry(category.to_owned()).or_default().fg = Some(color);
    }

    pub fn style_for(&self, category: &Category) -> CategoryStyle {
        self.palette
            .get(category.name())
            .copied()
            .unwrap_or_default()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write_message(
        &mut self,
        category: &Category,
        text: &str,
        emphasis: Option<Emphasis>,
    ) -> io::Result<()> {
        if !self.color {
            writeln!(self.out, "{text}")?;
            return self.out.flush();
        }

        let base = self.style_for(category).content_style();
        let (before, emph, after) = match emphasis {
            Some(e) => e.split(text),
            None => (text, "", ""),
        };
        let mut bold = base;
        bold.attributes.set(Attribute::Bold);

        queue!(self.out, SetStyle(base), Print(before))?;
        if !emph.is_empty() {
            queue!(self.out, SetStyle(bold), Print(emph), ResetColor, SetStyle(base))?;
        }
        queue!(self.out, Print(after), ResetColor, Print("\n"))?;
        self.out.flush()
    }
}

impl<W: Write> MessageSink for TerminalSink<W> {
    fn emit(&mut self, category: Category, text: &str, emphasis: Option<Emphasis>) {
        if let Err(e) = self.write_message(&category, text, emphasis) {
            warn!(error = %e, "failed to write console message");
        }
    }

    fn clear(&mut self) {
        if !self.color {
            return;
        }
        let result = queue!(
            self.out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )
        .and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "failed to clear terminal");
        }
    }

    /// `kind` is `foreground` or `background`; `key` is a category name.
    fn set_color(&mut self, key: &str, kind: &str, value: &str) {
        let Some(color) = parse_color(value) else {
            debug!(key, kind, value, "unrecognised colour");
            return;
        };
        let entry = self.palette.entry(key.to_owned()).or_default();
        match kind {
            "background" => entry.bg = Some(color),
            _ => entry.fg = Some(color),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
