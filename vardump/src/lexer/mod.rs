//!
//! Lexer Module - Zero-Copy PHP Tokenization
//!
//! This module tokenizes PHP source text. Tokens only carry spans into the
//! original text, so scanners working on top of the token stream can slice
//! the exact source back out (whitespace and line breaks included).
//!
//! Key design decisions:
//! - Zero-copy: Tokens reference the source string by span
//! - String interning: Names and variables stored via lasso::Spur
//! - Strings, heredocs and comments are single tokens, so delimiters inside
//!   them never reach brace/paren counting
//! - Files start in inline-HTML mode like the host runtime; fragments can
//!   start directly in code mode
//!
//! Token categories:
//! - Tags and inline HTML: <?php, ?>, text outside tags
//! - Keywords: function, fn, static, use, namespace, as, ... (case-insensitive)
//! - Names: identifiers, qualified (A\B) and fully qualified (\A\B) names
//! - Variables: $name
//! - Literals: numbers, strings, heredoc/nowdoc
//! - Punctuation: delimiters, arrows, separators
//! - Trivia: whitespace, comments (dropped unless requested)
//!

use crate::source::Span;
use lasso::{Rodeo, Spur};
use memchr::{memchr, memchr2, memchr3, memmem};
use smallvec::SmallVec;

#[inline]
fn is_ident_start(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_') || b >= 0x80
}

#[inline]
fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit() || b == b'_'
}

fn is_binary_digit(b: u8) -> bool {
    matches!(b, b'0' | b'1' | b'_')
}

fn is_octal_digit(b: u8) -> bool {
    matches!(b, b'0'..=b'7' | b'_')
}

#[inline]
fn skip_whitespace(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|&b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .unwrap_or(bytes.len())
}

#[inline]
fn find_ident_end(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|&b| !is_ident_char(b))
        .unwrap_or(bytes.len())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub symbol: Option<Spur>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            symbol: None,
        }
    }

    pub fn with_symbol(kind: TokenKind, span: Span, symbol: Spur) -> Self {
        Self {
            kind,
            span,
            symbol: Some(symbol),
        }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Ident | TokenKind::QualifiedName | TokenKind::FullyQualifiedName
        )
    }

    /// Tokens that open a bracketed region in expression position.
    pub fn is_opener(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace | TokenKind::AttributeStart
        )
    }

    pub fn is_closer(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    InlineHtml,
    OpenTag,
    OpenTagWithEcho,
    CloseTag,

    Ident,
    QualifiedName,
    FullyQualifiedName,
    Variable,

    IntLit,
    FloatLit,
    StringLit,
    InterpolatedString,
    Heredoc,
    Nowdoc,

    Keyword(Keyword),

    Comma,
    Semicolon,
    Colon,
    DoubleColon,
    Question,
    Backslash,
    Dollar,
    Ampersand,
    Ellipsis,
    Eq,

    Arrow,
    NullsafeArrow,
    FatArrow,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    AttributeStart,

    Operator,

    Whitespace,
    Comment,
    DocComment,

    Error,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Abstract,
    And,
    Array,
    As,
    Break,
    Case,
    Catch,
    Class,
    Clone,
    Const,
    Continue,
    Declare,
    Default,
    Do,
    Echo,
    Else,
    ElseIf,
    Extends,
    Final,
    Finally,
    Fn,
    For,
    Foreach,
    Function,
    Global,
    If,
    Implements,
    Include,
    IncludeOnce,
    InstanceOf,
    Insteadof,
    Interface,
    Isset,
    List,
    Match,
    Namespace,
    New,
    Or,
    Print,
    Private,
    Protected,
    Public,
    Readonly,
    Require,
    RequireOnce,
    Return,
    Static,
    Switch,
    Throw,
    Trait,
    Try,
    Unset,
    Use,
    Var,
    While,
    Xor,
    Yield,
}

/// Tokenizes a whole file, starting in inline-HTML mode. Trivia is dropped.
pub fn tokenize(source: &str) -> (Vec<Token>, Rodeo) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize_all();
    (tokens, lexer.into_interner())
}

/// Tokenizes a code fragment (no open tag needed), keeping trivia.
pub fn tokenize_fragment(source: &str) -> (Vec<Token>, Rodeo) {
    let mut lexer = Lexer::new(source).in_code().with_trivia();
    let tokens = lexer.tokenize_all();
    (tokens, lexer.into_interner())
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    in_code: bool,
    keep_trivia: bool,
    last_significant: Option<TokenKind>,
    interner: Rodeo,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            in_code: false,
            keep_trivia: false,
            last_significant: None,
            interner: Rodeo::default(),
        }
    }

    pub fn in_code(mut self) -> Self {
        self.in_code = true;
        self
    }

    pub fn with_trivia(mut self) -> Self {
        self.keep_trivia = true;
        self
    }

    pub fn into_interner(self) -> Rodeo {
        self.interner
    }

    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_eof() {
            let token = self.next_token();
            if !token.is_trivia() {
                self.last_significant = Some(token.kind);
            }
            if self.keep_trivia || !token.is_trivia() {
                tokens.push(token);
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.pos as u32, self.pos as u32),
        ));

        tokens
    }

    #[inline(always)]
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline(always)]
    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline(always)]
    fn peek_byte2(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    #[inline(always)]
    fn advance_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Some(b)
    }

    fn starts_with_ignore_case(&self, needle: &[u8]) -> bool {
        self.bytes
            .get(self.pos..self.pos + needle.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(needle))
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos as u32;

        let kind = if self.in_code {
            self.scan_code()
        } else {
            self.scan_inline_html()
        };

        let end = self.pos as u32;
        let span = Span::new(start, end);

        match kind {
            TokenKind::Ident
            | TokenKind::QualifiedName
            | TokenKind::FullyQualifiedName
            | TokenKind::Variable => {
                let text = &self.source[start as usize..end as usize];
                let symbol = self.interner.get_or_intern(text);
                Token::with_symbol(kind, span, symbol)
            }
            _ => Token::new(kind, span),
        }
    }

    fn scan_inline_html(&mut self) -> TokenKind {
        if self.bytes[self.pos..].starts_with(b"<?") {
            return self.scan_open_tag();
        }

        match memmem::find(&self.bytes[self.pos..], b"<?") {
            Some(offset) => self.pos += offset,
            None => self.pos = self.bytes.len(),
        }
        TokenKind::InlineHtml
    }

    fn scan_open_tag(&mut self) -> TokenKind {
        self.in_code = true;

        if self.bytes[self.pos..].starts_with(b"<?=") {
            self.pos += 3;
            return TokenKind::OpenTagWithEcho;
        }

        self.pos += 2;
        if self.starts_with_ignore_case(b"php") {
            self.pos += 3;
        }
        // The open tag owns a single trailing newline or space
        match (self.peek_byte(), self.peek_byte2()) {
            (Some(b'\r'), Some(b'\n')) => self.pos += 2,
            (Some(b'\n' | b' ' | b'\t' | b'\r'), _) => self.pos += 1,
            _ => {}
        }
        TokenKind::OpenTag
    }

    fn scan_code(&mut self) -> TokenKind {
        let start = self.pos;

        let Some(b) = self.advance_byte() else {
            return TokenKind::Eof;
        };

        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                self.pos += skip_whitespace(&self.bytes[self.pos..]);
                TokenKind::Whitespace
            }

            b'?' if self.peek_byte() == Some(b'>') => {
                self.pos += 1;
                match (self.peek_byte(), self.peek_byte2()) {
                    (Some(b'\r'), Some(b'\n')) => self.pos += 2,
                    (Some(b'\n'), _) => self.pos += 1,
                    _ => {}
                }
                self.in_code = false;
                TokenKind::CloseTag
            }

            b'#' if self.peek_byte() == Some(b'[') => {
                self.pos += 1;
                TokenKind::AttributeStart
            }
            b'#' => self.scan_line_comment(),
            b'/' if self.peek_byte() == Some(b'/') => self.scan_line_comment(),
            b'/' if self.peek_byte() == Some(b'*') => self.scan_block_comment(),

            b'$' if self.peek_byte().is_some_and(is_ident_start) => {
                self.pos += find_ident_end(&self.bytes[self.pos..]);
                TokenKind::Variable
            }
            b'$' => TokenKind::Dollar,

            b'\'' => self.scan_single_quoted(),
            b'"' => self.scan_double_quoted(b'"'),
            b'`' => self.scan_double_quoted(b'`'),
            b'<' if self.bytes[self.pos..].starts_with(b"<<") => self.scan_heredoc(start),

            b'0'..=b'9' => self.scan_number(b),
            b'.' if self.peek_byte().is_some_and(|c| c.is_ascii_digit()) => {
                self.pos -= 1;
                self.scan_decimal()
            }

            b'\\' if self.peek_byte().is_some_and(is_ident_start) => {
                self.pos += find_ident_end(&self.bytes[self.pos..]);
                self.scan_name();
                TokenKind::FullyQualifiedName
            }
            b'\\' => TokenKind::Backslash,

            _ if is_ident_start(b) => {
                self.pos += find_ident_end(&self.bytes[self.pos..]);
                if self.scan_name() {
                    TokenKind::QualifiedName
                } else {
                    self.match_keyword(start)
                }
            }

            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' if self.peek_byte() == Some(b':') => {
                self.pos += 1;
                TokenKind::DoubleColon
            }
            b':' => TokenKind::Colon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            b'-' if self.peek_byte() == Some(b'>') => {
                self.pos += 1;
                TokenKind::Arrow
            }
            b'=' if self.peek_byte() == Some(b'>') => {
                self.pos += 1;
                TokenKind::FatArrow
            }
            b'?' if self.bytes[self.pos..].starts_with(b"->") => {
                self.pos += 2;
                TokenKind::NullsafeArrow
            }
            b'?' if self.peek_byte() == Some(b'?') => {
                self.pos += 1;
                if self.peek_byte() == Some(b'=') {
                    self.pos += 1;
                }
                TokenKind::Operator
            }
            b'?' => TokenKind::Question,
            b'.' if self.bytes[self.pos..].starts_with(b"..") => {
                self.pos += 2;
                TokenKind::Ellipsis
            }
            b'&' if matches!(self.peek_byte(), Some(b'&' | b'=')) => {
                self.pos += 1;
                TokenKind::Operator
            }
            b'&' => TokenKind::Ampersand,
            b'=' if self.peek_byte() != Some(b'=') => TokenKind::Eq,

            b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'^' | b'|'
            | b'~' | b'.' | b'@' => {
                self.scan_operator_tail();
                TokenKind::Operator
            }

            _ => TokenKind::Error,
        }
    }

    /// Greedily consumes the rest of a multi-character operator.
    fn scan_operator_tail(&mut self) {
        while matches!(
            self.peek_byte(),
            Some(b'=' | b'<' | b'>' | b'+' | b'-' | b'*' | b'|' | b'.')
        ) {
            if self.bytes[self.pos..].starts_with(b"->") {
                break;
            }
            self.pos += 1;
        }
    }

    /// Extends an identifier with `\segment` parts. Returns true when at
    /// least one separator was consumed.
    fn scan_name(&mut self) -> bool {
        let mut qualified = false;
        while self.peek_byte() == Some(b'\\') && self.peek_byte2().is_some_and(is_ident_start) {
            self.pos += 1;
            self.pos += find_ident_end(&self.bytes[self.pos..]);
            qualified = true;
        }
        qualified
    }

    fn scan_line_comment(&mut self) -> TokenKind {
        // Line comments end at the newline or at a close tag
        loop {
            match memchr2(b'\n', b'?', &self.bytes[self.pos..]) {
                Some(offset) => {
                    self.pos += offset;
                    if self.bytes[self.pos] == b'\n' {
                        return TokenKind::Comment;
                    }
                    if self.peek_byte2() == Some(b'>') {
                        return TokenKind::Comment;
                    }
                    self.pos += 1;
                }
                None => {
                    self.pos = self.bytes.len();
                    return TokenKind::Comment;
                }
            }
        }
    }

    fn scan_block_comment(&mut self) -> TokenKind {
        let doc = self.bytes[self.pos..].starts_with(b"**")
            && self.bytes.get(self.pos + 2) != Some(&b'/');
        self.pos += 1;
        match memmem::find(&self.bytes[self.pos..], b"*/") {
            Some(offset) => self.pos += offset + 2,
            None => {
                self.pos = self.bytes.len();
                return TokenKind::Error;
            }
        }
        if doc {
            TokenKind::DocComment
        } else {
            TokenKind::Comment
        }
    }

    fn scan_single_quoted(&mut self) -> TokenKind {
        loop {
            match memchr2(b'\'', b'\\', &self.bytes[self.pos..]) {
                Some(offset) => {
                    self.pos += offset;
                    match self.bytes[self.pos] {
                        b'\'' => {
                            self.pos += 1;
                            return TokenKind::StringLit;
                        }
                        _ => {
                            self.pos = (self.pos + 2).min(self.bytes.len());
                        }
                    }
                }
                None => {
                    self.pos = self.bytes.len();
                    return TokenKind::Error;
                }
            }
        }
    }

    fn scan_double_quoted(&mut self, quote: u8) -> TokenKind {
        loop {
            match memchr3(quote, b'\\', b'{', &self.bytes[self.pos..]) {
                Some(offset) => {
                    self.pos += offset;
                    let b = self.bytes[self.pos];
                    if b == quote {
                        self.pos += 1;
                        return TokenKind::InterpolatedString;
                    } else if b == b'\\' {
                        self.pos = (self.pos + 2).min(self.bytes.len());
                    } else {
                        let complex = self.peek_byte2() == Some(b'$')
                            || (self.pos > 0 && self.bytes[self.pos - 1] == b'$');
                        self.pos += 1;
                        if complex && !self.skip_interpolation() {
                            return TokenKind::Error;
                        }
                    }
                }
                None => {
                    self.pos = self.bytes.len();
                    return TokenKind::Error;
                }
            }
        }
    }

    /// Skips a `{$...}` interpolation body, the opening brace already
    /// consumed. Quoted strings inside the expression are skipped whole.
    fn skip_interpolation(&mut self) -> bool {
        let mut depth = 1usize;
        while let Some(b) = self.advance_byte() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                b'\'' | b'"' => {
                    let quote = b;
                    loop {
                        match memchr2(quote, b'\\', &self.bytes[self.pos..]) {
                            Some(offset) => {
                                self.pos += offset;
                                if self.bytes[self.pos] == quote {
                                    self.pos += 1;
                                    break;
                                }
                                self.pos = (self.pos + 2).min(self.bytes.len());
                            }
                            None => {
                                self.pos = self.bytes.len();
                                return false;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn scan_heredoc(&mut self, start: usize) -> TokenKind {
        let mut cursor = self.pos + 2;
        while matches!(self.bytes.get(cursor), Some(b' ' | b'\t')) {
            cursor += 1;
        }

        let quote = match self.bytes.get(cursor) {
            Some(&q) if q == b'\'' || q == b'"' => {
                cursor += 1;
                Some(q)
            }
            _ => None,
        };

        let label_start = cursor;
        if !self.bytes.get(cursor).copied().is_some_and(is_ident_start) {
            self.pos = start + 3;
            return TokenKind::Error;
        }
        cursor += find_ident_end(&self.bytes[cursor..]);
        let label = &self.bytes[label_start..cursor];

        if let Some(q) = quote {
            if self.bytes.get(cursor) != Some(&q) {
                self.pos = cursor;
                return TokenKind::Error;
            }
            cursor += 1;
        }

        match self.bytes.get(cursor) {
            Some(b'\n') => cursor += 1,
            Some(b'\r') if self.bytes.get(cursor + 1) == Some(&b'\n') => cursor += 2,
            _ => {
                self.pos = cursor;
                return TokenKind::Error;
            }
        }

        let kind = if quote == Some(b'\'') {
            TokenKind::Nowdoc
        } else {
            TokenKind::Heredoc
        };

        // Each body line may be the (possibly indented) closing label
        loop {
            let mut line = cursor;
            while matches!(self.bytes.get(line), Some(b' ' | b'\t')) {
                line += 1;
            }
            if self.bytes[line..].starts_with(label)
                && !self.bytes.get(line + label.len()).copied().is_some_and(is_ident_char)
            {
                self.pos = line + label.len();
                return kind;
            }
            match memchr(b'\n', &self.bytes[cursor..]) {
                Some(offset) => cursor += offset + 1,
                None => {
                    self.pos = self.bytes.len();
                    return TokenKind::Error;
                }
            }
        }
    }

    fn scan_number(&mut self, first: u8) -> TokenKind {
        let is_digit: fn(u8) -> bool = match (first, self.peek_byte()) {
            (b'0', Some(b'x' | b'X')) => is_hex_digit,
            (b'0', Some(b'b' | b'B')) => is_binary_digit,
            (b'0', Some(b'o' | b'O')) => is_octal_digit,
            _ => {
                self.pos -= 1;
                return self.scan_decimal();
            }
        };

        self.pos += 1;
        while self.peek_byte().is_some_and(is_digit) {
            self.pos += 1;
        }
        TokenKind::IntLit
    }

    fn scan_decimal(&mut self) -> TokenKind {
        let mut kind = TokenKind::IntLit;

        while matches!(self.peek_byte(), Some(b'0'..=b'9' | b'_')) {
            self.pos += 1;
        }

        if self.peek_byte() == Some(b'.') && self.peek_byte2() != Some(b'.') {
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b'0'..=b'9' | b'_')) {
                self.pos += 1;
            }
            kind = TokenKind::FloatLit;
        }

        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_byte2(), Some(b'+' | b'-')));
            if self
                .bytes
                .get(self.pos + 1 + sign)
                .is_some_and(|c| c.is_ascii_digit())
            {
                self.pos += 1 + sign;
                while matches!(self.peek_byte(), Some(b'0'..=b'9' | b'_')) {
                    self.pos += 1;
                }
                kind = TokenKind::FloatLit;
            }
        }

        kind
    }

    fn match_keyword(&self, start: usize) -> TokenKind {
        // Member names after `->` and `::` are never keywords
        if matches!(
            self.last_significant,
            Some(TokenKind::Arrow | TokenKind::NullsafeArrow | TokenKind::DoubleColon)
        ) {
            return TokenKind::Ident;
        }

        let text = &self.bytes[start..self.pos];
        if text.len() > 12 {
            return TokenKind::Ident;
        }
        let lower: SmallVec<[u8; 12]> = text.iter().map(|b| b.to_ascii_lowercase()).collect();

        match keyword_from_lowercase(&lower) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident,
        }
    }
}

fn keyword_from_lowercase(word: &[u8]) -> Option<Keyword> {
    let kw = match word {
        b"abstract" => Keyword::Abstract,
        b"and" => Keyword::And,
        b"array" => Keyword::Array,
        b"as" => Keyword::As,
        b"break" => Keyword::Break,
        b"case" => Keyword::Case,
        b"catch" => Keyword::Catch,
        b"class" => Keyword::Class,
        b"clone" => Keyword::Clone,
        b"const" => Keyword::Const,
        b"continue" => Keyword::Continue,
        b"declare" => Keyword::Declare,
        b"default" => Keyword::Default,
        b"do" => Keyword::Do,
        b"echo" => Keyword::Echo,
        b"else" => Keyword::Else,
        b"elseif" => Keyword::ElseIf,
        b"extends" => Keyword::Extends,
        b"final" => Keyword::Final,
        b"finally" => Keyword::Finally,
        b"fn" => Keyword::Fn,
        b"for" => Keyword::For,
        b"foreach" => Keyword::Foreach,
        b"function" => Keyword::Function,
        b"global" => Keyword::Global,
        b"if" => Keyword::If,
        b"implements" => Keyword::Implements,
        b"include" => Keyword::Include,
        b"include_once" => Keyword::IncludeOnce,
        b"instanceof" => Keyword::InstanceOf,
        b"insteadof" => Keyword::Insteadof,
        b"interface" => Keyword::Interface,
        b"isset" => Keyword::Isset,
        b"list" => Keyword::List,
        b"match" => Keyword::Match,
        b"namespace" => Keyword::Namespace,
        b"new" => Keyword::New,
        b"or" => Keyword::Or,
        b"print" => Keyword::Print,
        b"private" => Keyword::Private,
        b"protected" => Keyword::Protected,
        b"public" => Keyword::Public,
        b"readonly" => Keyword::Readonly,
        b"require" => Keyword::Require,
        b"require_once" => Keyword::RequireOnce,
        b"return" => Keyword::Return,
        b"static" => Keyword::Static,
        b"switch" => Keyword::Switch,
        b"throw" => Keyword::Throw,
        b"trait" => Keyword::Trait,
        b"try" => Keyword::Try,
        b"unset" => Keyword::Unset,
        b"use" => Keyword::Use,
        b"var" => Keyword::Var,
        b"while" => Keyword::While,
        b"xor" => Keyword::Xor,
        b"yield" => Keyword::Yield,
        _ => return None,
    };
    Some(kw)
}
