//! Syntax Highlighting for Kotlin Scripts
//!
//! Splits the editor buffer into classified spans for the backdrop layer.
//! Tokenization is a single combined pattern scanned left to right, so a
//! string literal always wins over a `//` inside it and a comment always
//! wins over the keywords it contains.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::{Captures, Match, Regex};
use std::ops::Range;
use std::sync::LazyLock;

/// A token type for syntax highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// String literals: "hello", including unterminated ones
    String,
    /// Line comments: // ...
    Comment,
    /// Reserved words: fun, val, if, ...
    Keyword,
    /// Integer literals: 42
    Number,
    /// Everything between the classified spans
    Plain,
    /// Zero-width marker closing the last line
    LineBreak,
}

/// A highlighted token with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            span: start..end,
            text: text.into(),
        }
    }
}

/// Reserved words recognized as keywords
pub const KEYWORDS: &[&str] = &[
    "fun", "val", "var", "class", "when", "if", "else", "return", "true", "false", "null",
];

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        concat!(
            // A string runs to the next unescaped quote, or to end of input
            r#"(?P<string>"(?:[^"\\]|\\(?s:.))*(?:"|\\?\z))"#,
            r"|(?P<comment>//[^\n]*)",
            r"|(?P<keyword>\b(?:{})\b)",
            r"|(?P<number>\b[0-9]+\b)",
        ),
        KEYWORDS.join("|")
    );
    Regex::new(&pattern).expect("token pattern is a valid regex")
});

/// Pick the alternative that matched, in pattern order
fn classify<'t>(caps: &Captures<'t>) -> Option<(TokenKind, Match<'t>)> {
    [
        ("string", TokenKind::String),
        ("comment", TokenKind::Comment),
        ("keyword", TokenKind::Keyword),
        ("number", TokenKind::Number),
    ]
    .into_iter()
    .find_map(|(group, kind)| caps.name(group).map(|m| (kind, m)))
}

/// Tokenize source text for the backdrop.
///
/// Every byte of `source` is covered by exactly one token, in order. The
/// returned list always ends with a [`TokenKind::LineBreak`] marker so that
/// a buffer ending in `\n` still produces its final empty line.
pub fn highlight(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    for caps in TOKEN_PATTERN.captures_iter(source) {
        let Some((kind, m)) = classify(&caps) else {
            continue;
        };
        if m.start() > pos {
            tokens.push(Token::new(
                TokenKind::Plain,
                pos,
                m.start(),
                &source[pos..m.start()],
            ));
        }
        tokens.push(Token::new(kind, m.start(), m.end(), m.as_str()));
        pos = m.end();
    }

    if pos < source.len() {
        tokens.push(Token::new(
            TokenKind::Plain,
            pos,
            source.len(),
            &source[pos..],
        ));
    }

    tokens.push(Token::new(
        TokenKind::LineBreak,
        source.len(),
        source.len(),
        "",
    ));
    tokens
}

/// Colors for each token kind
#[derive(Debug, Clone)]
pub struct Theme {
    pub string: Style,
    pub comment: Style,
    pub keyword: Style,
    pub number: Style,
    pub plain: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            string: Style::default().fg(Color::Green),
            comment: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            keyword: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            number: Style::default().fg(Color::Blue),
            plain: Style::default().fg(Color::White),
        }
    }
}

impl Theme {
    pub fn style(&self, kind: TokenKind) -> Style {
        match kind {
            TokenKind::String => self.string,
            TokenKind::Comment => self.comment,
            TokenKind::Keyword => self.keyword,
            TokenKind::Number => self.number,
            TokenKind::Plain | TokenKind::LineBreak => self.plain,
        }
    }
}

/// Lay tokens out as display lines.
///
/// Tokens spanning a newline (plain runs, multi-line strings) are split so
/// each piece lands on its own line. The result has exactly one line per
/// `\n`-separated line of the source.
pub fn to_lines(tokens: &[Token], theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for token in tokens {
        if token.kind == TokenKind::LineBreak {
            lines.push(Line::from(std::mem::take(&mut current)));
            continue;
        }

        let style = theme.style(token.kind);
        for (i, piece) in token.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
            if !piece.is_empty() {
                current.push(Span::styled(piece.to_string(), style));
            }
        }
    }

    lines
}
