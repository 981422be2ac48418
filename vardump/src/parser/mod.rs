///
/// Parser Module - nom-based Header Parsing
///
/// This module parses the header region of a PHP file: everything before
/// the first construct that is not an open tag, inline HTML, a `declare`,
/// a namespace declaration or a `use` import. Nothing past that point is
/// parsed; imports are only ever declared ahead of other code.
///
/// The parser is structured as follows:
/// - input: TokenStream type for nom integration
/// - combinators: Reusable token-matching combinators
/// - items: declare / namespace / use parsers
///
/// Entry point: parse_header() takes tokens and returns the Header.
///

mod combinators;
mod input;
mod items;

pub use combinators::{PError, PErrorKind};
pub use input::TokenStream;

use crate::lexer::{Keyword, Token, TokenKind};
use crate::source::Span;

use combinators::{is_eof, peek_token};
use items::{parse_declare, parse_namespace, parse_use};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Class,
    Function,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    /// Fully-qualified name without the leading separator.
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl Import {
    /// The name this import introduces: the alias, or the last segment.
    pub fn short_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.name.rsplit('\\').next().unwrap_or(&self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub namespace: Option<String>,
    pub imports: Vec<Import>,
}

pub(crate) enum HeaderItem {
    Skip,
    Declare,
    Namespace(Option<String>),
    Use(Vec<Import>),
}

pub struct ParseResult {
    pub header: Header,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

pub fn parse_header(tokens: &[Token], source: &str) -> ParseResult {
    let mut header = Header::default();
    let mut errors = Vec::new();
    let mut input = TokenStream::new(tokens, source);

    while !is_eof(input) {
        let step = match peek_token(input) {
            Some(
                TokenKind::OpenTag
                | TokenKind::InlineHtml
                | TokenKind::CloseTag
                | TokenKind::Semicolon
                | TokenKind::RBrace,
            ) => Ok((input.advance(1), HeaderItem::Skip)),
            Some(TokenKind::Keyword(Keyword::Declare)) => parse_declare(input),
            // `namespace\foo()` is a relative name in code, not a declaration
            Some(TokenKind::Keyword(Keyword::Namespace))
                if input.tokens.get(1).map(|t| t.kind) != Some(TokenKind::Backslash) =>
            {
                parse_namespace(input)
            }
            Some(TokenKind::Keyword(Keyword::Use)) => parse_use(input),
            _ => break,
        };

        match step {
            Ok((rest, item)) => {
                match item {
                    HeaderItem::Skip | HeaderItem::Declare => {}
                    HeaderItem::Namespace(ns) => header.namespace = ns,
                    HeaderItem::Use(mut imports) => header.imports.append(&mut imports),
                }
                input = rest;
            }
            Err(e) => {
                let (span, message) = match &e {
                    nom::Err::Error(pe) | nom::Err::Failure(pe) => {
                        (pe.input.current_span(), format!("{:?}", pe.kind))
                    }
                    nom::Err::Incomplete(_) => {
                        (input.current_span(), "Incomplete input".to_string())
                    }
                };
                errors.push(ParseError::new(message, span));
                break;
            }
        }
    }

    ParseResult { header, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> ParseResult {
        let (tokens, _interner) = tokenize(source);
        parse_header(&tokens, source)
    }

    fn pairs(result: &ParseResult) -> Vec<(ImportKind, String, String)> {
        result
            .header
            .imports
            .iter()
            .map(|i| (i.kind, i.short_name().to_string(), i.name.clone()))
            .collect()
    }

    #[test]
    fn test_parse_empty() {
        let result = parse_str("");
        assert!(result.errors.is_empty());
        assert!(result.header.imports.is_empty());
    }

    #[test]
    fn test_parse_simple_use() {
        let result = parse_str("<?php\nuse Foo\\Bar\\Baz;\nuse \\Qux as Q;");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(
            pairs(&result),
            vec![
                (ImportKind::Class, "Baz".to_string(), "Foo\\Bar\\Baz".to_string()),
                (ImportKind::Class, "Q".to_string(), "Qux".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_namespace_and_declare() {
        let result = parse_str("<?php\ndeclare(strict_types=1);\n\nnamespace App\\Http;\n\nuse DateTimeZone;\n");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(result.header.namespace.as_deref(), Some("App\\Http"));
        assert_eq!(result.header.imports.len(), 1);
    }

    #[test]
    fn test_parse_multiple_clauses() {
        let result = parse_str("<?php use A\\B, C\\D as E;");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(
            pairs(&result),
            vec![
                (ImportKind::Class, "B".to_string(), "A\\B".to_string()),
                (ImportKind::Class, "E".to_string(), "C\\D".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_group_use() {
        let result = parse_str("<?php use Vendor\\Pkg\\{Formatter, Sub\\Parser as TokenParser, function helper, const LIMIT,};");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(
            pairs(&result),
            vec![
                (ImportKind::Class, "Formatter".to_string(), "Vendor\\Pkg\\Formatter".to_string()),
                (ImportKind::Class, "TokenParser".to_string(), "Vendor\\Pkg\\Sub\\Parser".to_string()),
                (ImportKind::Function, "helper".to_string(), "Vendor\\Pkg\\helper".to_string()),
                (ImportKind::Constant, "LIMIT".to_string(), "Vendor\\Pkg\\LIMIT".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_function_and_const_imports() {
        let result = parse_str("<?php use function Foo\\bar; use const Foo\\BAZ as QUX;");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(
            pairs(&result),
            vec![
                (ImportKind::Function, "bar".to_string(), "Foo\\bar".to_string()),
                (ImportKind::Constant, "QUX".to_string(), "Foo\\BAZ".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_stops_at_first_code() {
        let result = parse_str("<?php use A; class X { use TraitY; } use B;");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(result.header.imports.len(), 1);
    }

    #[test]
    fn test_parse_braced_namespace() {
        let result = parse_str("<?php namespace Foo { use A\\B; }\nnamespace Bar { use C; }");
        assert!(result.errors.is_empty(), "Errors: {:?}", result.errors);
        assert_eq!(result.header.namespace.as_deref(), Some("Bar"));
        assert_eq!(result.header.imports.len(), 2);
    }

    #[test]
    fn test_parse_malformed_use_keeps_earlier_imports() {
        let result = parse_str("<?php use A; use ;");
        assert_eq!(result.header.imports.len(), 1);
        assert_eq!(result.errors.len(), 1);
    }
}
