//!
//! Closure Module - Closure Source Recovery
//!
//! Recovers the literal source text of a closure from the file it is
//! declared in. The file is tokenized once; starting at the declaration's
//! (line, column) the first closure literal on that line is located and its
//! extent determined from the token stream:
//!
//! - block bodies (`function`) end at the brace matching the first `{`
//!   after the signature
//! - expression bodies (`fn ... =>`) end before the first `,`, `;` or
//!   closing delimiter at nesting depth zero
//!
//! Strings, heredocs and comments are single tokens, so braces inside them
//! never affect the scan. Names imported through `use` statements are
//! rewritten to their fully-qualified form so the recovered source means
//! the same thing anywhere it is pasted.
//!

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use lasso::{Rodeo, Spur};

use crate::errors::ClosureError;
use crate::lexer::{Keyword, Token, TokenKind, tokenize};
use crate::source::{SourceFile, Span};
use crate::uses::{AliasTable, UseStatementParser, is_reserved_type_name, read_source};
use crate::value::{Closure, ClosureKind};

/// Stateless closure source extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosureExporter;

const _: () = assert!(std::mem::size_of::<ClosureExporter>() == 0);

static CLOSURE_EXPORTER: OnceLock<ClosureExporter> = OnceLock::new();

/// The process-wide exporter instance.
pub fn closure_exporter() -> &'static ClosureExporter {
    CLOSURE_EXPORTER.get_or_init(ClosureExporter::default)
}

impl ClosureExporter {
    pub fn export(&self, closure: &Closure) -> Result<String, ClosureError> {
        match &closure.location {
            Some(location) => self.extract(&location.file, location.line, location.column),
            None => Ok(synthesize(closure)),
        }
    }

    /// Extracts the closure declared at a 1-based (line, column) of a file.
    pub fn extract(
        &self,
        path: impl AsRef<Path>,
        line: u32,
        column: u32,
    ) -> Result<String, ClosureError> {
        let path = path.as_ref();
        let source = read_source(path)?;
        let file = SourceFile::new(path.display().to_string(), source);
        let (tokens, interner) = tokenize(&file.source);
        let aliases = UseStatementParser::from_tokens(&tokens, &file.source);
        self.extract_tokens(&file, &tokens, &interner, &aliases, line, column)
    }

    pub fn extract_from_source(
        &self,
        file: &SourceFile,
        aliases: &AliasTable,
        line: u32,
        column: u32,
    ) -> Result<String, ClosureError> {
        let (tokens, interner) = tokenize(&file.source);
        self.extract_tokens(file, &tokens, &interner, aliases, line, column)
    }

    fn extract_tokens(
        &self,
        file: &SourceFile,
        tokens: &[Token],
        interner: &Rodeo,
        aliases: &AliasTable,
        line: u32,
        column: u32,
    ) -> Result<String, ClosureError> {
        let path = Path::new(&file.name);
        let offset = file
            .offset_of(line, column)
            .ok_or_else(|| ClosureError::PositionOutOfRange {
                path: path.to_path_buf(),
                line,
                column,
            })?;
        let line_end = file
            .offset_of(line + 1, 1)
            .unwrap_or(file.source.len() as u32);

        let literal = find_literal(tokens, offset, line_end).ok_or_else(|| {
            ClosureError::NotFound {
                path: path.to_path_buf(),
                line,
                span: Span::new(offset, line_end),
            }
        })?;

        let end = match literal.kind {
            ClosureKind::Regular => scan_block_body(tokens, literal.keyword),
            ClosureKind::Arrow => scan_expression_body(tokens, literal.keyword),
        }
        .ok_or_else(|| ClosureError::Unterminated {
            path: path.to_path_buf(),
            span: Span::new(tokens[literal.start].span.start, file.source.len() as u32),
        })?;

        let span = tokens[literal.start].span.merge(tokens[end].span);
        tracing::debug!(
            "Found {:?} closure at {}:{} spanning {:?}",
            literal.kind,
            file.name,
            line,
            span
        );

        let mut rewriter = AliasRewriter::new(aliases, interner);
        Ok(rewriter.rewrite(&file.source, &tokens[literal.start..=end]))
    }
}

/// Source for a closure with no known declaration site.
pub fn synthesize(closure: &Closure) -> String {
    let modifier = if closure.is_static { "static " } else { "" };
    let signature = if closure.signature.trim().is_empty() {
        "()"
    } else {
        closure.signature.trim()
    };
    match closure.kind {
        ClosureKind::Regular => format!("{}function {} {{{}}}", modifier, signature, closure.body),
        ClosureKind::Arrow => format!("{}fn {} => {}", modifier, signature, closure.body.trim()),
    }
}

struct Literal {
    /// Index of the first token (`static` or the introducing keyword).
    start: usize,
    /// Index of the `function` / `fn` keyword.
    keyword: usize,
    kind: ClosureKind,
}

fn find_literal(tokens: &[Token], offset: u32, line_end: u32) -> Option<Literal> {
    let mut i = tokens.iter().position(|t| t.span.start >= offset)?;

    while i < tokens.len() && tokens[i].span.start < line_end && !tokens[i].is_eof() {
        let tok = &tokens[i];
        let next = tokens.get(i + 1).map(|t| t.kind);

        match tok.kind {
            TokenKind::AttributeStart => {
                i = skip_attribute(tokens, i)?;
                continue;
            }
            TokenKind::Keyword(Keyword::Static) => {
                let after = tokens.get(i + 2).map(|t| t.kind);
                if let Some(TokenKind::Keyword(kw @ (Keyword::Function | Keyword::Fn))) = next {
                    if matches!(after, Some(TokenKind::LParen | TokenKind::Ampersand)) {
                        return Some(Literal {
                            start: i,
                            keyword: i + 1,
                            kind: closure_kind(kw),
                        });
                    }
                }
            }
            TokenKind::Keyword(kw @ (Keyword::Function | Keyword::Fn))
                if matches!(next, Some(TokenKind::LParen | TokenKind::Ampersand)) =>
            {
                return Some(Literal {
                    start: i,
                    keyword: i,
                    kind: closure_kind(kw),
                });
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn closure_kind(kw: Keyword) -> ClosureKind {
    if kw == Keyword::Fn {
        ClosureKind::Arrow
    } else {
        ClosureKind::Regular
    }
}

/// Index just past the `]` closing the attribute group opened at `start`.
fn skip_attribute(tokens: &[Token], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(start) {
        match tok.kind {
            TokenKind::AttributeStart | TokenKind::LBracket => depth += 1,
            TokenKind::RBracket => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            TokenKind::Eof => return None,
            _ => {}
        }
    }
    None
}

/// Index of the brace closing a `function` literal's body.
fn scan_block_body(tokens: &[Token], keyword: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = keyword + 1;

    // Signature: parameters, `use (...)` list, return type
    let open = loop {
        let tok = tokens.get(i)?;
        match tok.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::AttributeStart => depth += 1,
            TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
            TokenKind::LBrace if depth == 0 => break i,
            TokenKind::Eof => return None,
            _ => {}
        }
        i += 1;
    };

    let mut braces = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        match tok.kind {
            TokenKind::LBrace => braces += 1,
            TokenKind::RBrace => {
                braces -= 1;
                if braces == 0 {
                    return Some(i);
                }
            }
            TokenKind::Eof => return None,
            _ => {}
        }
    }
    None
}

/// Index of the last token of an `fn` literal's expression body.
fn scan_expression_body(tokens: &[Token], keyword: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = keyword + 1;

    let arrow = loop {
        let tok = tokens.get(i)?;
        match tok.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::AttributeStart => depth += 1,
            TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
            TokenKind::FatArrow if depth == 0 => break i,
            TokenKind::Eof => return None,
            _ => {}
        }
        i += 1;
    };

    let mut depth = 0usize;
    let mut last = None;
    for (i, tok) in tokens.iter().enumerate().skip(arrow + 1) {
        if tok.is_opener() {
            depth += 1;
        } else if tok.is_closer() {
            if depth == 0 {
                break;
            }
            depth -= 1;
        } else {
            match tok.kind {
                TokenKind::Comma | TokenKind::Semicolon if depth == 0 => break,
                TokenKind::CloseTag | TokenKind::Eof if depth == 0 => break,
                TokenKind::CloseTag | TokenKind::Eof => return None,
                _ => {}
            }
        }
        tracing::trace!("Arrow body token {:?} at depth {}", tok.kind, depth);
        last = Some(i);
    }

    last
}

/// Rewrites imported short names inside a token range.
struct AliasRewriter<'a> {
    aliases: &'a AliasTable,
    interner: &'a Rodeo,
    classes: HashMap<Spur, Option<String>>,
    functions: HashMap<Spur, Option<String>>,
    constants: HashMap<Spur, Option<String>>,
}

impl<'a> AliasRewriter<'a> {
    fn new(aliases: &'a AliasTable, interner: &'a Rodeo) -> Self {
        Self {
            aliases,
            interner,
            classes: HashMap::new(),
            functions: HashMap::new(),
            constants: HashMap::new(),
        }
    }

    fn rewrite(&mut self, source: &str, tokens: &[Token]) -> String {
        let Some(first) = tokens.first() else {
            return String::new();
        };
        let mut out = String::new();
        let mut cursor = first.span.start as usize;

        for (i, tok) in tokens.iter().enumerate() {
            let start = tok.span.start as usize;
            out.push_str(&source[cursor..start]);
            cursor = tok.span.end as usize;

            match self.replacement(source, tokens, i) {
                Some(fqn) => out.push_str(&fqn),
                None => out.push_str(&source[tok.span.range()]),
            }
        }

        out
    }

    fn replacement(&mut self, source: &str, tokens: &[Token], i: usize) -> Option<String> {
        let tok = &tokens[i];
        if !matches!(tok.kind, TokenKind::Ident | TokenKind::QualifiedName) {
            return None;
        }
        let symbol = tok.symbol?;
        let prev = i.checked_sub(1).map(|p| tokens[p].kind);
        let next = tokens.get(i + 1).map(|t| t.kind);

        let member = matches!(
            prev,
            Some(TokenKind::Arrow | TokenKind::NullsafeArrow | TokenKind::DoubleColon)
        );
        let label = next == Some(TokenKind::Colon)
            && matches!(prev, Some(TokenKind::LParen | TokenKind::Comma));
        if member || label {
            return None;
        }

        // A qualified name resolves through the import of its first segment
        // whatever it names.
        if tok.kind == TokenKind::QualifiedName {
            return self.lookup_class(symbol);
        }
        if next == Some(TokenKind::LParen) && prev != Some(TokenKind::Keyword(Keyword::New)) {
            return self.lookup_function(symbol);
        }
        if is_class_position(source, tokens, i) {
            return self.lookup_class(symbol);
        }
        self.lookup_constant(symbol)
    }

    fn lookup_class(&mut self, symbol: Spur) -> Option<String> {
        let (aliases, interner) = (self.aliases, self.interner);
        self.classes
            .entry(symbol)
            .or_insert_with(|| {
                let name = interner.resolve(&symbol);
                if is_reserved_type_name(name) {
                    None
                } else {
                    aliases.resolve_class_name(name)
                }
            })
            .clone()
    }

    fn lookup_function(&mut self, symbol: Spur) -> Option<String> {
        let (aliases, interner) = (self.aliases, self.interner);
        self.functions
            .entry(symbol)
            .or_insert_with(|| aliases.resolve_function_name(interner.resolve(&symbol)))
            .clone()
    }

    fn lookup_constant(&mut self, symbol: Spur) -> Option<String> {
        let (aliases, interner) = (self.aliases, self.interner);
        self.constants
            .entry(symbol)
            .or_insert_with(|| aliases.resolve_constant_name(interner.resolve(&symbol)))
            .clone()
    }
}

/// Whether the unqualified name at `i` can only name a class: a static
/// access, `new` / `instanceof` operand, attribute, or a parameter, catch
/// or return type.
fn is_class_position(source: &str, tokens: &[Token], i: usize) -> bool {
    let prev = i.checked_sub(1).map(|p| tokens[p].kind);
    if tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::DoubleColon) {
        return true;
    }
    if matches!(
        prev,
        Some(
            TokenKind::AttributeStart
                | TokenKind::Keyword(
                    Keyword::New | Keyword::InstanceOf | Keyword::Extends | Keyword::Implements
                )
        )
    ) {
        return true;
    }

    let mut end = i + 1;
    while tokens.get(end).is_some_and(|t| is_type_part(source, t)) {
        end += 1;
    }
    let typed_variable = matches!(
        tokens.get(end).map(|t| t.kind),
        Some(TokenKind::Variable | TokenKind::Ellipsis)
    );
    if typed_variable {
        if let Some(open) = enclosing_paren(tokens, i) {
            let catch = open > 0 && tokens[open - 1].kind == TokenKind::Keyword(Keyword::Catch);
            if catch || opens_parameter_list(tokens, open) {
                return true;
            }
        }
    }

    let mut start = i;
    while start > 0 && is_type_part(source, &tokens[start - 1]) {
        start -= 1;
    }
    start >= 2
        && tokens[start - 1].kind == TokenKind::Colon
        && tokens[start - 2].kind == TokenKind::RParen
        && enclosing_paren(tokens, start - 2).is_some_and(|open| opens_parameter_list(tokens, open))
}

/// Tokens that may appear inside a type declaration around a name.
fn is_type_part(source: &str, tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Ident
        | TokenKind::QualifiedName
        | TokenKind::FullyQualifiedName
        | TokenKind::Question
        | TokenKind::Ampersand
        | TokenKind::Keyword(Keyword::Array | Keyword::Static) => true,
        TokenKind::Operator => &source[tok.span.range()] == "|",
        _ => false,
    }
}

/// Index of the innermost unclosed `(` before `i`.
fn enclosing_paren(tokens: &[Token], i: usize) -> Option<usize> {
    let mut depth = 0usize;
    for j in (0..i).rev() {
        let tok = &tokens[j];
        if tok.is_closer() {
            depth += 1;
        } else if tok.is_opener() {
            if depth == 0 {
                return (tok.kind == TokenKind::LParen).then_some(j);
            }
            depth -= 1;
        }
    }
    None
}

/// Whether the `(` at `open` starts the parameters or `use` list of a
/// function declaration.
fn opens_parameter_list(tokens: &[Token], open: usize) -> bool {
    let kind = |k: usize| k.checked_sub(1).map(|p| tokens[p].kind);
    let mut before = open;
    if kind(before) == Some(TokenKind::Ident) {
        before -= 1;
    }
    if kind(before) == Some(TokenKind::Ampersand) {
        before -= 1;
    }
    match kind(before) {
        Some(TokenKind::Keyword(Keyword::Function | Keyword::Fn)) => true,
        Some(TokenKind::Keyword(Keyword::Use)) => kind(before - 1) == Some(TokenKind::RParen),
        _ => false,
    }
}
