//!
//! Uses Module - Import Alias Resolution
//!
//! Builds the short-name to fully-qualified-name table of a PHP file from
//! the `use` imports in its header. Closure sources are rewritten against
//! this table so that an exported closure keeps meaning the same classes,
//! functions and constants once it is pasted somewhere else.
//!
//! Class and function names are looked up ASCII case-insensitively, the
//! way the host runtime resolves them. Constant names are case-sensitive.
//!

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::errors::UseError;
use crate::lexer::{Token, tokenize};
use crate::parser::{Header, ParseError, parse_header};

pub use crate::parser::{Import, ImportKind};

/// Type names that are never class references.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "int", "float", "bool", "string", "array", "callable", "iterable", "object", "mixed", "void",
    "null", "never", "false", "true", "self", "parent", "static",
];

pub fn is_reserved_type_name(name: &str) -> bool {
    RESERVED_TYPE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// The alias as written in the import.
    pub name: String,
    /// Fully-qualified target without the leading separator.
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    pub namespace: Option<String>,
    classes: IndexMap<String, Alias>,
    functions: IndexMap<String, Alias>,
    constants: IndexMap<String, Alias>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_header(header: Header) -> Self {
        let mut table = AliasTable {
            namespace: header.namespace,
            ..Default::default()
        };
        for import in &header.imports {
            table.insert(import.kind, import.short_name(), &import.name);
        }
        table
    }

    /// Adds an alias. A later import of the same short name replaces the
    /// earlier one.
    pub fn insert(&mut self, kind: ImportKind, alias: &str, target: &str) {
        let entry = Alias {
            name: alias.to_string(),
            target: target.trim_start_matches('\\').to_string(),
        };
        match kind {
            ImportKind::Class => self.classes.insert(alias.to_ascii_lowercase(), entry),
            ImportKind::Function => self.functions.insert(alias.to_ascii_lowercase(), entry),
            ImportKind::Constant => self.constants.insert(alias.to_string(), entry),
        };
    }

    pub fn class(&self, alias: &str) -> Option<&str> {
        self.classes
            .get(&alias.to_ascii_lowercase())
            .map(|a| a.target.as_str())
    }

    pub fn function(&self, alias: &str) -> Option<&str> {
        self.functions
            .get(&alias.to_ascii_lowercase())
            .map(|a| a.target.as_str())
    }

    pub fn constant(&self, alias: &str) -> Option<&str> {
        self.constants.get(alias).map(|a| a.target.as_str())
    }

    /// Fully-qualified form (leading `\` included) of a class name written
    /// in source, or `None` when the name is not covered by an import.
    ///
    /// For a qualified name only the first segment is looked up, so with
    /// `use Vendor\Pkg;` the name `Pkg\Thing` becomes `\Vendor\Pkg\Thing`.
    pub fn resolve_class_name(&self, name: &str) -> Option<String> {
        if name.starts_with('\\') || is_reserved_type_name(name) {
            return None;
        }
        match name.split_once('\\') {
            Some((first, rest)) => self
                .class(first)
                .map(|target| format!("\\{}\\{}", target, rest)),
            None => self.class(name).map(|target| format!("\\{}", target)),
        }
    }

    pub fn resolve_function_name(&self, name: &str) -> Option<String> {
        if name.contains('\\') {
            return None;
        }
        self.function(name).map(|target| format!("\\{}", target))
    }

    pub fn resolve_constant_name(&self, name: &str) -> Option<String> {
        if name.contains('\\') {
            return None;
        }
        self.constant(name).map(|target| format!("\\{}", target))
    }

    pub fn iter(&self, kind: ImportKind) -> impl Iterator<Item = (&str, &str)> {
        let map = match kind {
            ImportKind::Class => &self.classes,
            ImportKind::Function => &self.functions,
            ImportKind::Constant => &self.constants,
        };
        map.values().map(|a| (a.name.as_str(), a.target.as_str()))
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.functions.len() + self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct UseStatementParser;

impl UseStatementParser {
    /// Reads a file and returns its alias table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<AliasTable, UseError> {
        let path = path.as_ref();
        let source = read_source(path)?;
        let table = Self::from_source(&source);
        tracing::debug!(
            "Resolved {} aliases in {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_source(source: &str) -> AliasTable {
        let (tokens, _interner) = tokenize(source);
        Self::from_tokens(&tokens, source)
    }

    /// Alias table of an already tokenized file.
    pub(crate) fn from_tokens(tokens: &[Token], source: &str) -> AliasTable {
        let result = parse_header(tokens, source);
        for err in &result.errors {
            tracing::debug!(
                "Stopped scanning imports at {:?}: {}",
                err.span,
                err.message
            );
        }
        AliasTable::from_header(result.header)
    }

    /// Like `from_source`, also returning the error that ended the scan
    /// early, if any.
    pub fn parse(source: &str) -> (AliasTable, Vec<ParseError>) {
        let (tokens, _interner) = tokenize(source);
        let result = parse_header(&tokens, source);
        (AliasTable::from_header(result.header), result.errors)
    }
}

/// Reads a PHP source file. Bytes that are not UTF-8 (Latin-1 literals and
/// the like) are replaced rather than failing the read.
pub(crate) fn read_source(path: &Path) -> Result<String, UseError> {
    if !path.is_file() {
        return Err(UseError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|_| UseError::FileUnreadable {
        path: path.to_path_buf(),
    })?;
    match String::from_utf8(bytes) {
        Ok(source) => Ok(source),
        Err(e) => {
            tracing::debug!("{} is not valid UTF-8, decoding lossily", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_beats_trailing_segment() {
        let table = UseStatementParser::from_source("<?php use Foo\\Bar as Baz;");
        assert_eq!(table.class("Baz"), Some("Foo\\Bar"));
        assert_eq!(table.class("Bar"), None);
    }

    #[test]
    fn test_class_lookup_is_case_insensitive() {
        let table = UseStatementParser::from_source("<?php use App\\Models\\User;");
        assert_eq!(table.class("user"), Some("App\\Models\\User"));
        assert_eq!(table.class("USER"), Some("App\\Models\\User"));
    }

    #[test]
    fn test_constant_lookup_is_case_sensitive() {
        let table = UseStatementParser::from_source("<?php use const App\\LIMIT;");
        assert_eq!(table.constant("LIMIT"), Some("App\\LIMIT"));
        assert_eq!(table.constant("limit"), None);
    }

    #[test]
    fn test_resolve_class_name() {
        let table = UseStatementParser::from_source("<?php use Vendor\\Pkg; use Other\\Thing as T;");
        assert_eq!(table.resolve_class_name("T").as_deref(), Some("\\Other\\Thing"));
        assert_eq!(
            table.resolve_class_name("Pkg\\Sub\\Item").as_deref(),
            Some("\\Vendor\\Pkg\\Sub\\Item")
        );
        assert_eq!(table.resolve_class_name("\\T"), None);
        assert_eq!(table.resolve_class_name("Unknown"), None);
    }

    #[test]
    fn test_reserved_type_names_never_resolve() {
        let mut table = AliasTable::new();
        table.insert(ImportKind::Class, "string", "Foo\\String");
        assert_eq!(table.resolve_class_name("string"), None);
        assert!(is_reserved_type_name("Self"));
        assert!(!is_reserved_type_name("Stringable"));
    }

    #[test]
    fn test_parse_reports_malformed_statement() {
        let (table, errors) = UseStatementParser::parse("<?php use A\\B; use function ;");
        assert_eq!(table.class("B"), Some("A\\B"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_iter_preserves_insertion_order() {
        let table = UseStatementParser::from_source(
            "<?php use Z\\Last; use A\\First; use function f\\helper;",
        );
        let classes: Vec<_> = table.iter(ImportKind::Class).collect();
        assert_eq!(classes, vec![("Last", "Z\\Last"), ("First", "A\\First")]);
        assert_eq!(table.iter(ImportKind::Function).count(), 1);
        assert_eq!(table.len(), 3);
    }
}
