//!
//! Base Combinators for Token Parsing
//!
//! Reusable nom combinators for matching tokens, keywords and names.
//!

use nom::error::{ErrorKind, ParseError};
use nom::{IResult, InputTake};

use crate::lexer::{Keyword, Token, TokenKind};
use crate::source::Span;

use super::input::TokenStream;

pub type PResult<'a, O> = IResult<TokenStream<'a>, O, PError<'a>>;

#[derive(Debug, Clone)]
pub struct PError<'a> {
    pub input: TokenStream<'a>,
    pub kind: PErrorKind,
}

#[derive(Debug, Clone)]
pub enum PErrorKind {
    Expected(TokenKind),
    ExpectedKeyword(Keyword),
    ExpectedName,
    UnbalancedDelimiter,
    Nom(ErrorKind),
}

impl<'a> ParseError<TokenStream<'a>> for PError<'a> {
    fn from_error_kind(input: TokenStream<'a>, kind: ErrorKind) -> Self {
        PError {
            input,
            kind: PErrorKind::Nom(kind),
        }
    }

    fn append(_input: TokenStream<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn fail<O>(input: TokenStream, kind: PErrorKind) -> PResult<O> {
    Err(nom::Err::Error(PError { input, kind }))
}

pub fn token(kind: TokenKind) -> impl Fn(TokenStream) -> PResult<Token> {
    move |input: TokenStream| match input.first() {
        Some(tok) if tok.kind == kind => {
            let (rest, _) = input.take_split(1);
            Ok((rest, *tok))
        }
        _ => fail(input, PErrorKind::Expected(kind)),
    }
}

pub fn keyword(kw: Keyword) -> impl Fn(TokenStream) -> PResult<Token> {
    move |input: TokenStream| match input.first() {
        Some(tok) if tok.kind == TokenKind::Keyword(kw) => {
            let (rest, _) = input.take_split(1);
            Ok((rest, *tok))
        }
        _ => fail(input, PErrorKind::ExpectedKeyword(kw)),
    }
}

/// A name in import position. Reserved words are accepted because a name
/// segment such as `Match` or `List` is legal there.
pub fn name(input: TokenStream) -> PResult<(&str, Span)> {
    match input.first() {
        Some(tok) if tok.is_name() || matches!(tok.kind, TokenKind::Keyword(_)) => {
            let (rest, _) = input.take_split(1);
            Ok((rest, (input.span_text(tok.span), tok.span)))
        }
        _ => fail(input, PErrorKind::ExpectedName),
    }
}

/// Skips a balanced `open ... close` group, the opener included.
pub fn balanced(open: TokenKind, close: TokenKind) -> impl Fn(TokenStream) -> PResult<Span> {
    move |input: TokenStream| {
        let (mut rest, first) = token(open)(input)?;
        let mut depth = 1usize;
        while let Some(tok) = rest.first() {
            rest = rest.advance(1);
            if tok.kind == open {
                depth += 1;
            } else if tok.kind == close {
                depth -= 1;
                if depth == 0 {
                    return Ok((rest, first.span.merge(tok.span)));
                }
            } else if tok.is_eof() {
                break;
            }
        }
        fail(input, PErrorKind::UnbalancedDelimiter)
    }
}

pub fn peek_token(input: TokenStream) -> Option<TokenKind> {
    input.first().map(|t| t.kind)
}

pub fn check(kind: TokenKind) -> impl Fn(TokenStream) -> bool {
    move |input: TokenStream| input.first().map(|t| t.kind == kind).unwrap_or(false)
}

pub fn check_keyword(kw: Keyword) -> impl Fn(TokenStream) -> bool {
    move |input: TokenStream| {
        input
            .first()
            .map(|t| t.kind == TokenKind::Keyword(kw))
            .unwrap_or(false)
    }
}

pub fn is_eof(input: TokenStream) -> bool {
    input.is_empty() || input.first().map(|t| t.kind == TokenKind::Eof).unwrap_or(true)
}
