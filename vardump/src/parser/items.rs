///
/// Header Item Parsers
///
/// Parsers for the constructs that may appear before the first line of real
/// code in a PHP file: `declare(...)`, namespace declarations and `use`
/// imports (single, multiple, grouped, `function` and `const` forms).
///

use nom::combinator::opt;
use nom::sequence::preceded;

use crate::lexer::{Keyword, TokenKind};
use crate::source::Span;

use super::combinators::{PResult, balanced, check, check_keyword, keyword, name, token};
use super::input::TokenStream;
use super::{HeaderItem, Import, ImportKind};

pub(super) fn parse_declare(input: TokenStream) -> PResult<HeaderItem> {
    let (input, _) = keyword(Keyword::Declare)(input)?;
    let (input, _) = balanced(TokenKind::LParen, TokenKind::RParen)(input)?;
    let (input, _) = opt(token(TokenKind::Semicolon))(input)?;
    Ok((input, HeaderItem::Declare))
}

pub(super) fn parse_namespace(input: TokenStream) -> PResult<HeaderItem> {
    let (input, _) = keyword(Keyword::Namespace)(input)?;
    let (input, ns) = opt(name)(input)?;

    let input = if check(TokenKind::LBrace)(input) {
        token(TokenKind::LBrace)(input)?.0
    } else {
        token(TokenKind::Semicolon)(input)?.0
    };

    let namespace = ns.map(|(text, _)| text.trim_start_matches('\\').to_string());
    Ok((input, HeaderItem::Namespace(namespace)))
}

pub(super) fn parse_use(input: TokenStream) -> PResult<HeaderItem> {
    let (input, start) = keyword(Keyword::Use)(input)?;
    let (mut input, kind) = import_kind(input)?;
    let mut imports = Vec::new();

    loop {
        let (rest, mut clause) = parse_use_clause(input, kind.unwrap_or(ImportKind::Class))?;
        imports.append(&mut clause);
        input = rest;

        if check(TokenKind::Comma)(input) {
            input = token(TokenKind::Comma)(input)?.0;
        } else {
            break;
        }
    }

    let (input, end) = token(TokenKind::Semicolon)(input)?;
    let span = start.span.merge(end.span);
    for import in &mut imports {
        import.span = span;
    }

    Ok((input, HeaderItem::Use(imports)))
}

fn import_kind(input: TokenStream) -> PResult<Option<ImportKind>> {
    if check_keyword(Keyword::Function)(input) {
        let (input, _) = keyword(Keyword::Function)(input)?;
        Ok((input, Some(ImportKind::Function)))
    } else if check_keyword(Keyword::Const)(input) {
        let (input, _) = keyword(Keyword::Const)(input)?;
        Ok((input, Some(ImportKind::Constant)))
    } else {
        Ok((input, None))
    }
}

fn alias(input: TokenStream) -> PResult<Option<(&str, Span)>> {
    opt(preceded(keyword(Keyword::As), name))(input)
}

fn parse_use_clause(input: TokenStream, kind: ImportKind) -> PResult<Vec<Import>> {
    let (input, (prefix, prefix_span)) = name(input)?;
    let prefix = prefix.trim_start_matches('\\');

    let opens_group = check(TokenKind::Backslash)(input)
        && input.tokens.get(1).is_some_and(|t| t.kind == TokenKind::LBrace);

    if !opens_group {
        let (input, alias) = alias(input)?;
        let import = Import {
            kind,
            name: prefix.to_string(),
            alias: alias.map(|(text, _)| text.to_string()),
            span: prefix_span,
        };
        return Ok((input, vec![import]));
    }

    let (input, _) = token(TokenKind::Backslash)(input)?;
    let (mut input, _) = token(TokenKind::LBrace)(input)?;
    let mut imports = Vec::new();

    while !check(TokenKind::RBrace)(input) {
        let (rest, entry_kind) = import_kind(input)?;
        let (rest, (suffix, span)) = name(rest)?;
        let (rest, alias) = alias(rest)?;

        imports.push(Import {
            kind: entry_kind.unwrap_or(kind),
            name: format!("{}\\{}", prefix, suffix),
            alias: alias.map(|(text, _)| text.to_string()),
            span,
        });

        input = rest;
        if check(TokenKind::Comma)(input) {
            input = token(TokenKind::Comma)(input)?.0;
        } else {
            break;
        }
    }

    let (input, _) = token(TokenKind::RBrace)(input)?;
    Ok((input, imports))
}
