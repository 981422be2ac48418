//!
//! Highlight Module - HTML Syntax Highlighting
//!
//! Colors exported PHP text for display in a browser, using the host
//! runtime's default palette. Adjacent tokens of the same color share one
//! `<span>`.
//!

use crate::lexer::{Token, TokenKind, tokenize_fragment};

const COLOR_HTML: &str = "#000000";
const COLOR_STRING: &str = "#DD0000";
const COLOR_COMMENT: &str = "#FF8000";
const COLOR_KEYWORD: &str = "#007700";
const COLOR_DEFAULT: &str = "#0000BB";

fn color_of(token: &Token) -> Option<&'static str> {
    match token.kind {
        TokenKind::Whitespace | TokenKind::Eof => None,
        TokenKind::StringLit
        | TokenKind::InterpolatedString
        | TokenKind::Heredoc
        | TokenKind::Nowdoc => Some(COLOR_STRING),
        TokenKind::Comment | TokenKind::DocComment => Some(COLOR_COMMENT),
        TokenKind::InlineHtml => Some(COLOR_HTML),
        TokenKind::Keyword(_)
        | TokenKind::Comma
        | TokenKind::Semicolon
        | TokenKind::Colon
        | TokenKind::DoubleColon
        | TokenKind::Question
        | TokenKind::Ampersand
        | TokenKind::Ellipsis
        | TokenKind::Eq
        | TokenKind::Arrow
        | TokenKind::NullsafeArrow
        | TokenKind::FatArrow
        | TokenKind::LParen
        | TokenKind::RParen
        | TokenKind::LBrace
        | TokenKind::RBrace
        | TokenKind::LBracket
        | TokenKind::RBracket
        | TokenKind::AttributeStart
        | TokenKind::Operator => Some(COLOR_KEYWORD),
        _ => Some(COLOR_DEFAULT),
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("<br />"),
            '\r' => {}
            _ => out.push(c),
        }
    }
}

/// Highlights a PHP code fragment (no open tag needed).
pub fn highlight(code: &str) -> String {
    let (tokens, _interner) = tokenize_fragment(code);
    let mut out = String::new();
    out.push_str("<code><span style=\"color: ");
    out.push_str(COLOR_HTML);
    out.push_str("\">\n");

    let mut current: Option<&str> = None;
    for token in &tokens {
        let text = &code[token.span.range()];
        match color_of(token) {
            None => push_escaped(&mut out, text),
            Some(color) => {
                if current != Some(color) {
                    if current.is_some() {
                        out.push_str("</span>");
                    }
                    out.push_str("<span style=\"color: ");
                    out.push_str(color);
                    out.push_str("\">");
                    current = Some(color);
                }
                push_escaped(&mut out, text);
            }
        }
    }
    if current.is_some() {
        out.push_str("</span>");
    }

    out.push_str("\n</span>\n</code>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_string() {
        assert_eq!(
            highlight("'content'"),
            "<code><span style=\"color: #000000\">\n<span style=\"color: #DD0000\">'content'</span>\n</span>\n</code>"
        );
    }

    #[test]
    fn test_highlight_merges_adjacent_colors() {
        let html = highlight("[1 => 'a']");
        assert_eq!(
            html,
            "<code><span style=\"color: #000000\">\n\
             <span style=\"color: #007700\">[</span>\
             <span style=\"color: #0000BB\">1 </span>\
             <span style=\"color: #007700\">=&gt; </span>\
             <span style=\"color: #DD0000\">'a'</span>\
             <span style=\"color: #007700\">]</span>\
             \n</span>\n</code>"
        );
    }

    #[test]
    fn test_highlight_escapes_html_and_newlines() {
        let html = highlight("'<b>&'");
        assert!(html.contains("'&lt;b&gt;&amp;'"));

        let html = highlight("[\n    1,\n]");
        assert!(html.contains("<br />"));
        assert!(!html.contains("[\n"));
    }
}
