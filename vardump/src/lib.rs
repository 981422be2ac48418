///
/// vardump - Export Values as PHP Source
///
/// Turns runtime values into PHP source text that re-creates them. It
/// includes:
///
/// - source: Spans and line/column mapping
/// - lexer: Tokenization of PHP source text
/// - parser: Header parsing (namespace, declare, use imports)
/// - uses: Import alias tables
/// - closure: Closure source recovery from declaration sites
/// - value: The exportable value model
/// - export: The exporter, object serializer and descriptor dump
/// - highlight / dump: HTML highlighting and the `d!` / `dd!` macros
/// - config: `vardump.toml` settings
///
/// Entry points:
/// - `export`: Export a value with a depth limit
/// - `VarDumper::create`: Builder-style export, `as_string` descriptor
/// - `UseStatementParser::from_file`: Alias table of a file
/// - `closure_exporter`: The shared closure source extractor
///

pub mod closure;
pub mod config;
pub mod diagnostic;
pub mod dump;
pub mod errors;
pub mod export;
pub mod highlight;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod uses;
pub mod value;

pub use closure::{ClosureExporter, closure_exporter};
pub use config::{DumperConfig, Highlight};
pub use diagnostic::DiagnosticReporter;
pub use dump::{dump, dump_to};
pub use errors::{ClosureError, ConfigError, UseError};
pub use export::{DEFAULT_DEPTH, GrammarTarget, VarDumper, export};
pub use lexer::tokenize;
pub use source::SourceFile;
pub use uses::{AliasTable, UseStatementParser};
pub use value::{Array, ArrayKey, Closure, Object, ObjectRef, Resource, Value, Visibility};
