//!
//! Export Module - PHP Source Re-creation of Values
//!
//! Turns a `Value` into PHP source text that evaluates back to an equal
//! value:
//!
//! - scalars become literals (`null`, `true`, `42`, `1.5`, `'text'`)
//! - arrays become short array syntax, keys omitted for lists
//! - objects are serialized (see `serialize`) and wrapped in
//!   `unserialize('...')`; graphs that cannot be serialized fall back to the
//!   human-readable descriptor (see `describe`) exported as a string
//! - closures are recovered from their declaration site
//! - resources, which cannot be re-created, become `NULL`
//!
//! Export never fails. Anything that cannot be represented degrades to a
//! placeholder and is logged.
//!

mod describe;
mod serialize;

pub use serialize::GrammarTarget;

use crate::closure::{ClosureExporter, closure_exporter};
use crate::value::{ArrayKey, Closure, ObjectRef, Value};

pub const DEFAULT_DEPTH: i32 = 10;

/// Placeholder for closures whose source cannot be recovered.
pub const CLOSURE_FALLBACK: &str = "function() {/* Error: unable to determine Closure source */}";

/// Exports a value. `depth` bounds array nesting; `pretty` puts each array
/// entry on its own line.
pub fn export(value: &Value, depth: i32, pretty: bool) -> String {
    VarDumper::create(value).export_with_depth(depth, pretty)
}

pub struct VarDumper<'a> {
    value: &'a Value,
    grammar: GrammarTarget,
}

impl<'a> VarDumper<'a> {
    pub fn create(value: &'a Value) -> Self {
        Self {
            value,
            grammar: GrammarTarget::default(),
        }
    }

    pub fn with_grammar(mut self, grammar: GrammarTarget) -> Self {
        self.grammar = grammar;
        self
    }

    /// The shared closure exporter used for every closure.
    pub fn closure_exporter() -> &'static ClosureExporter {
        closure_exporter()
    }

    pub fn export(&self, pretty: bool) -> String {
        self.export_with_depth(DEFAULT_DEPTH, pretty)
    }

    pub fn export_with_depth(&self, depth: i32, pretty: bool) -> String {
        let exporter = Exporter {
            pretty,
            grammar: self.grammar,
        };
        let mut out = String::new();
        exporter.value(self.value, depth, 0, &mut out);
        out
    }

    /// Human-readable descriptor of the value.
    pub fn as_string(&self, depth: i32) -> String {
        describe::describe(self.value, depth)
    }
}

struct Exporter {
    pretty: bool,
    grammar: GrammarTarget,
}

impl Exporter {
    fn value(&self, value: &Value, depth: i32, level: usize, out: &mut String) {
        match value {
            Value::Array(array) => {
                if depth <= 0 {
                    out.push_str("[...]");
                    return;
                }
                if array.is_empty() {
                    out.push_str("[]");
                    return;
                }

                let with_keys = !array.is_list();
                out.push('[');
                for (i, (key, item)) in array.iter().enumerate() {
                    if self.pretty {
                        out.push('\n');
                        indent(out, level + 1);
                    } else if i > 0 {
                        out.push(',');
                    }
                    if with_keys {
                        export_key(key, out);
                        out.push_str(" => ");
                    }
                    self.value(item, depth - 1, level + 1, out);
                    if self.pretty {
                        out.push(',');
                    }
                }
                if self.pretty {
                    out.push('\n');
                    indent(out, level);
                }
                out.push(']');
            }
            Value::Object(object) => self.object(object, value, out),
            Value::Closure(closure) => out.push_str(&closure_source(closure)),
            Value::Resource(_) => out.push_str("NULL"),
            scalar => export_scalar(scalar, out),
        }
    }

    fn object(&self, object: &ObjectRef, value: &Value, out: &mut String) {
        match serialize::serialize(value, self.grammar) {
            Ok(grammar_text) => {
                out.push_str("unserialize(");
                out.push_str(&quote_string(&grammar_text));
                out.push(')');
            }
            Err(e) => {
                tracing::debug!(
                    "Falling back to descriptor for {:?}: {}",
                    object,
                    e
                );
                let descriptor = describe::describe(value, DEFAULT_DEPTH);
                out.push_str(&quote_string(&descriptor));
            }
        }
    }
}

/// Closure source, or the placeholder when it cannot be recovered.
pub(crate) fn closure_source(closure: &Closure) -> String {
    match closure_exporter().export(closure) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!("Unable to determine closure source: {}", e);
            CLOSURE_FALLBACK.to_string()
        }
    }
}

pub(crate) fn export_scalar(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) => out.push_str(&format_float(*f, true)),
        Value::String(s) => out.push_str(&quote_string(s)),
        _ => {}
    }
}

pub(crate) fn export_key(key: &ArrayKey, out: &mut String) {
    match key {
        ArrayKey::Int(i) => out.push_str(&i.to_string()),
        ArrayKey::Str(s) => out.push_str(&quote_string(s)),
    }
}

pub(crate) fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

/// Single-quoted PHP string literal. Only `'` and `\` need escaping.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Shortest round-trip decimal text of a float.
///
/// Exponent notation (`1.0E+25`, `1.5E-7`) is used when the decimal point
/// would sit more than 17 digits to the right or more than 3 zeros to the
/// left. With `zero_fraction`, integral values in plain notation get a
/// `.0` suffix.
pub fn format_float(value: f64, zero_fraction: bool) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. `-1.5e-7`
    let sci = format!("{:e}", value);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let decimal_point = exponent + 1;

    let mut out = String::new();
    if mantissa.starts_with('-') {
        out.push('-');
    }

    if decimal_point < -3 || decimal_point > 17 {
        out.push_str(&digits[..1]);
        out.push('.');
        if digits.len() > 1 {
            out.push_str(&digits[1..]);
        } else {
            out.push('0');
        }
        out.push('E');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&exponent.abs().to_string());
    } else if decimal_point <= 0 {
        out.push_str("0.");
        for _ in 0..-decimal_point {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        let point = decimal_point as usize;
        if digits.len() <= point {
            out.push_str(&digits);
            for _ in digits.len()..point {
                out.push('0');
            }
            if zero_fraction {
                out.push_str(".0");
            }
        } else {
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        }
    }

    out
}
