//! Runtime value type for console scripts.
//!
//! Values follow script conventions: numbers are doubles, `+` concatenates
//! when either side is a string, and every value has a display form used when
//! a result is printed to the console.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as Json;

/// A console script value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // Holes print as nothing inside a joined list.
                    if !matches!(item, Value::Undefined | Value::Null) {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Map(_) => f.write_str("[object Object]"),
        }
    }
}

/// Format a number the way scripts print it: integral values without a
/// fractional part, and the non-finite values by name.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if n == 0.0 {
        "0".to_owned()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl Value {
    /// Truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are
    /// falsy; everything else, including empty lists, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) => true,
        }
    }

    /// Numeric conversion.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => parse_number(s),
            Value::List(items) => match items.as_slice() {
                [] => 0.0,
                [one] => one.to_number(),
                _ => f64::NAN,
            },
            Value::Map(_) => f64::NAN,
        }
    }

    /// 32-bit integer conversion used by the bitwise operators.
    pub fn to_i32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
    }

    /// Name reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Null | Value::List(_) | Value::Map(_) => "object",
        }
    }

    /// `true` for values that `+` treats as text.
    fn is_textual(&self) -> bool {
        matches!(self, Value::Str(_) | Value::List(_) | Value::Map(_))
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    pub fn add(&self, rhs: &Value) -> Value {
        if self.is_textual() || rhs.is_textual() {
            Value::Str(format!("{self}{rhs}"))
        } else {
            Value::Number(self.to_number() + rhs.to_number())
        }
    }

    /// `===`.  Lists and maps compare by content.
    pub fn strict_eq(&self, rhs: &Value) -> bool {
        self == rhs
    }

    /// `==`: `null` equals `undefined`, and mixed primitive types compare
    /// numerically.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        use Value::*;
        match (self, rhs) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (Str(a), Str(b)) => a == b,
            (Number(_) | Bool(_) | Str(_), Number(_) | Bool(_) | Str(_)) => {
                self.to_number() == rhs.to_number()
            }
            _ => self == rhs,
        }
    }

    /// Relational comparison: strings compare as text, everything else as
    /// numbers.  `None` when either side is `NaN`.
    pub fn compare(&self, rhs: &Value) -> Option<std::cmp::Ordering> {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&rhs.to_number()),
        }
    }

    // ── Property access ───────────────────────────────────────────────────────

    /// `value[key]` / `value.key`.
    pub fn property(&self, key: &Value) -> Value {
        match (self, key) {
            (Value::List(items), Value::Number(n)) => index(*n)
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default(),
            (Value::Str(s), Value::Number(n)) => index(*n)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or_default(),
            (Value::List(items), Value::Str(k)) if k == "length" => {
                Value::Number(items.len() as f64)
            }
            (Value::Str(s), Value::Str(k)) if k == "length" => {
                Value::Number(s.chars().count() as f64)
            }
            (Value::Map(map), k) => map.get(&k.to_string()).cloned().unwrap_or_default(),
            (Value::List(_) | Value::Str(_), Value::Str(k)) => match k.parse::<f64>() {
                Ok(n) => self.property(&Value::Number(n)),
                Err(_) => Value::Undefined,
            },
            _ => Value::Undefined,
        }
    }

    /// Enumerable keys, as `for (k in value)` would visit them.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Map(map) => map.keys().cloned().collect(),
            Value::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            Value::Str(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    // ── JSON ──────────────────────────────────────────────────────────────────

    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

/// Parse script numeric text: surrounding whitespace is ignored, empty text is
/// zero, `0x` introduces hex, and anything unparsable is `NaN`.
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings that scripts do not.
        _ if t.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => f64::NAN,
        _ => t.parse().unwrap_or(f64::NAN),
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
