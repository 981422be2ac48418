///
/// TokenStream Input Type for nom
///
/// Wraps a slice of significant tokens together with the source text they
/// point into, so combinators can both match on kinds and read names.
///

use nom::{InputLength, InputTake};

use crate::lexer::Token;
use crate::source::Span;

#[derive(Debug, Clone, Copy)]
pub struct TokenStream<'a> {
    pub tokens: &'a [Token],
    pub source: &'a str,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token], source: &'a str) -> Self {
        Self { tokens, source }
    }

    pub fn span_text(&self, span: Span) -> &'a str {
        &self.source[span.range()]
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn first(&self) -> Option<&'a Token> {
        self.tokens.first()
    }

    pub fn current_span(&self) -> Span {
        self.tokens.first().map(|t| t.span).unwrap_or(Span::dummy())
    }

    pub fn advance(&self, count: usize) -> Self {
        let count = count.min(self.tokens.len());
        TokenStream {
            tokens: &self.tokens[count..],
            source: self.source,
        }
    }
}

impl<'a> InputLength for TokenStream<'a> {
    fn input_len(&self) -> usize {
        self.tokens.len()
    }
}

impl<'a> InputTake for TokenStream<'a> {
    fn take(&self, count: usize) -> Self {
        TokenStream {
            tokens: &self.tokens[..count],
            source: self.source,
        }
    }

    fn take_split(&self, count: usize) -> (Self, Self) {
        let (prefix, suffix) = self.tokens.split_at(count);
        (
            TokenStream {
                tokens: suffix,
                source: self.source,
            },
            TokenStream {
                tokens: prefix,
                source: self.source,
            },
        )
    }
}
