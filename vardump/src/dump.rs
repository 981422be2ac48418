//!
//! Dump helpers: print exported values to the current output.
//!
//! `d!` prints each argument and keeps going; `dd!` prints and then ends
//! the process with status 0.
//!

use std::io::{self, Write};

use crate::config::Highlight;
use crate::export::{DEFAULT_DEPTH, export};
use crate::highlight::highlight;
use crate::value::Value;

/// Writes the export of a value, with no terminator.
pub fn dump_to<W: Write>(writer: &mut W, value: &Value, depth: i32, highlight: bool) -> io::Result<()> {
    let text = export(value, depth, true);
    if highlight {
        writer.write_all(self::highlight(&text).as_bytes())
    } else {
        writer.write_all(text.as_bytes())
    }
}

pub fn dump(value: &Value, depth: i32, highlight: bool) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = dump_to(&mut out, value, depth, highlight).and_then(|_| out.flush()) {
        tracing::warn!("Failed to write dump: {}", e);
    }
}

/// Writes each value followed by `<br>` when highlighting, else a newline.
pub fn dump_values_to<W: Write>(writer: &mut W, values: &[Value], highlight: bool) -> io::Result<()> {
    let terminator: &[u8] = if highlight { b"<br>" } else { b"\n" };
    for value in values {
        dump_to(writer, value, DEFAULT_DEPTH, highlight)?;
        writer.write_all(terminator)?;
    }
    writer.flush()
}

/// Backs `d!`.
pub fn dump_values(values: &[Value]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = dump_values_to(&mut out, values, Highlight::Auto.resolve()) {
        tracing::warn!("Failed to write dump: {}", e);
    }
}

/// Prints each value's export on its own line.
///
/// ```no_run
/// use vardump::d;
/// d!("content", 123, true);
/// ```
#[macro_export]
macro_rules! d {
    ($($value:expr),* $(,)?) => {{
        let values: ::std::vec::Vec<$crate::Value> = ::std::vec![$($crate::Value::from($value)),*];
        $crate::dump::dump_values(&values);
    }};
}

/// Prints like `d!`, then exits the process with status 0.
#[macro_export]
macro_rules! dd {
    ($($value:expr),* $(,)?) => {{
        $crate::d!($($value),*);
        ::std::process::exit(0)
    }};
}
