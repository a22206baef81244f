//! Pure built-in functions and string/list methods.
//!
//! These need nothing from the console; the functions that print or touch
//! the macro table live with the interpreter.

use super::value::{format_number, parse_number, Value};
use crate::console::escape::substitute_escape_codes;
use crate::console::token::get_one_token;
use crate::error::EvalError;

/// Dispatch a built-in function call.
///
/// Returns `None` if `name` is not a built-in.
pub fn call_builtin(name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    fn inner(name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        Ok(Some(match name {
            "String" => Value::Str(args.first().map(Value::to_string).unwrap_or_default()),
            "Number" => Value::Number(args.first().map_or(0.0, Value::to_number)),
            "Boolean" => Value::Bool(args.first().is_some_and(Value::is_truthy)),
            "isNaN" => Value::Bool(arg(args, 0).to_number().is_nan()),
            "parseInt" => {
                let radix = match args.get(1).map_or(0, |r| r.to_number() as u32) {
                    0 => 10,
                    r => r,
                };
                Value::Number(parse_int(&arg(args, 0).to_string(), radix))
            }
            "parseFloat" => Value::Number(parse_float(&arg(args, 0).to_string())),
            "getOneToken" => token_pair(&get_str(args, 0, name)?),
            "substituteEscapeCodes" => {
                Value::Str(substitute_escape_codes(&get_str(args, 0, name)?))
            }
            _ => return Ok(None),
        }))
    }
    inner(name, args).transpose()
}

/// Call method `name` on `receiver`.
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    if matches!(receiver, Value::Undefined | Value::Null) {
        return Err(EvalError::runtime(format!("{receiver} has no properties")));
    }

    // Methods every value has.
    if name == "toString" {
        return Ok(Value::Str(match (receiver, args.first()) {
            (Value::Number(n), Some(radix)) => to_radix(*n, radix.to_number() as u32)?,
            _ => receiver.to_string(),
        }));
    }

    match receiver {
        Value::Str(s) => string_method(s, name, args),
        Value::List(items) => match name {
            "join" => {
                let sep = args
                    .first()
                    .filter(|v| !matches!(v, Value::Undefined))
                    .map_or_else(|| ",".to_owned(), Value::to_string);
                let parts: Vec<String> = items
                    .iter()
                    .map(|v| match v {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect();
                Ok(Value::Str(parts.join(&sep)))
            }
            "indexOf" => {
                let needle = arg(args, 0);
                Ok(Value::Number(
                    items
                        .iter()
                        .position(|v| v.strict_eq(&needle))
                        .map_or(-1.0, |i| i as f64),
                ))
            }
            _ => Err(not_a_function(receiver, name)),
        },
        _ => Err(not_a_function(receiver, name)),
    }
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    Ok(match name {
        "toUpperCase" => Value::Str(s.to_uppercase()),
        "toLowerCase" => Value::Str(s.to_lowercase()),
        "trim" => Value::Str(s.trim().to_owned()),
        "charAt" => {
            let i = arg(args, 0).to_number();
            let c = (i >= 0.0).then(|| chars.get(i as usize)).flatten();
            Value::Str(c.map(char::to_string).unwrap_or_default())
        }
        "substring" => {
            let clamp = |v: Value| {
                let n = v.to_number();
                if n.is_nan() {
                    0
                } else {
                    (n.max(0.0) as usize).min(chars.len())
                }
            };
            let a = clamp(arg(args, 0));
            let b = match args.get(1) {
                None | Some(Value::Undefined) => chars.len(),
                Some(v) => clamp(v.clone()),
            };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Value::Str(chars[lo..hi].iter().collect())
        }
        "indexOf" => {
            let needle = arg(args, 0).to_string();
            Value::Number(match s.find(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            })
        }
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::List(vec![Value::Str(s.to_owned())]),
            Some(sep) => {
                let sep = sep.to_string();
                if sep.is_empty() {
                    Value::List(chars.iter().map(|c| Value::Str(c.to_string())).collect())
                } else {
                    Value::List(s.split(sep.as_str()).map(Value::from).collect())
                }
            }
        },
        "getOneToken" => token_pair(s),
        "substituteEscapeCodes" => Value::Str(substitute_escape_codes(s)),
        _ => return Err(not_a_function(&Value::Str(s.to_owned()), name)),
    })
}

/// `[first, rest]`, with `rest` null when `s` holds no whitespace.
fn token_pair(s: &str) -> Value {
    let (first, rest) = get_one_token(s);
    Value::List(vec![
        Value::Str(first.to_owned()),
        rest.map_or(Value::Null, Value::from),
    ])
}

fn not_a_function(receiver: &Value, name: &str) -> EvalError {
    EvalError::runtime(format!(
        "{name} is not a function on {}",
        receiver.type_name()
    ))
}

fn arg(args: &[Value], idx: usize) -> Value {
    args.get(idx).cloned().unwrap_or_default()
}

fn get_str(args: &[Value], idx: usize, name: &str) -> Result<String, EvalError> {
    match args.get(idx) {
        None | Some(Value::Undefined) => {
            Err(EvalError::runtime(format!("{name}: argument {idx} missing")))
        }
        Some(v) => Ok(v.to_string()),
    }
}

/// Leading integer in `radix`; `NaN` when there are no digits.
fn parse_int(s: &str, radix: u32) -> f64 {
    let t = s.trim_start();
    let (neg, t) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let (radix, t) = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(rest) if radix == 16 || radix == 10 => (16, rest),
        _ => (radix, t),
    };
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = t.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let n = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    if neg {
        -n
    } else {
        n
    }
}

/// Longest numeric prefix of `s`.
fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    if t.starts_with("Infinity") || t.starts_with("+Infinity") {
        return f64::INFINITY;
    }
    if t.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = t.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => end = i + 1,
            b'+' | b'-' if i == 0 || matches!(bytes[i - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if !seen_exp && end > 0 => seen_exp = true,
            _ => break,
        }
        i += 1;
    }
    if end == 0 {
        return f64::NAN;
    }
    // Back off a dangling exponent ("1e", "1e+").
    let mut candidate = &t[..end];
    while !candidate.is_empty() {
        if let Ok(n) = candidate.parse::<f64>() {
            return n;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    parse_number(&t[..end])
}

fn to_radix(n: f64, radix: u32) -> Result<String, EvalError> {
    if !(2..=36).contains(&radix) {
        return Err(EvalError::runtime("toString() radix must be between 2 and 36"));
    }
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 {
        return Ok(format_number(n));
    }
    let neg = n < 0.0;
    let mut m = n.abs() as u64;
    let mut digits = Vec::new();
    loop {
        let d = (m % u64::from(radix)) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('?'));
        m /= u64::from(radix);
        if m == 0 {
            break;
        }
    }
    if neg {
        digits.push('-');
    }
    Ok(digits.iter().rev().collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
