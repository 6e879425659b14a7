use std::hash::{Hash, Hasher};

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `#if`
    If,
    /// `#else`
    Else,
    /// `#fi`
    EndIf,
    /// `#switch`
    Switch,
    /// `#case`
    Case,
    /// `#default`
    Default,
    /// `#break`
    Break,
    /// `#end`, closes `#switch` and `#choose`.
    End,
    /// `#choose`
    Choose,
    /// `#when`
    When,
    /// `#for`
    For,
    /// `#done`, closes `#for`.
    EndFor,
    /// Soft keyword `of` inside a `#for` line.
    Of,
    /// Soft keyword `delimiter`.
    Delimiter,
    /// Soft keyword `open`.
    Open,
    /// Soft keyword `close`.
    Close,
    /// Bare word.
    Identifier,
    /// Quoted string (`'...'` or `"..."`).
    String,
    /// Numeric literal.
    Number,
    /// Variable reference `:name`, colon retained.
    NamedParameter,
    /// `,` (revised dialect only).
    Comma,
    /// `|` (revised dialect only).
    LogicOr,
    /// `&` (revised dialect only).
    LogicAnd,
    /// `!` (revised dialect only).
    LogicNot,
    /// End of one directive line.
    Newline,
    /// End of input.
    Eof,
    /// Text the lexer could not classify.
    Unknown,
    /// One whole non-directive line, terminator included.
    PlainText,
}

impl TokenKind {
    /// Look up a directive keyword (without `#`), case-insensitively.
    #[must_use]
    pub fn directive(name: &str) -> Option<Self> {
        DIRECTIVES
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(name))
            .map(|&(_, kind)| kind)
    }

    /// Look up a soft keyword of the `#for` line, case-insensitively.
    #[must_use]
    pub fn soft_keyword(word: &str) -> Option<Self> {
        SOFT_KEYWORDS
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
            .map(|&(_, kind)| kind)
    }

    /// Canonical spelling of a directive kind, `#` included.
    #[must_use]
    pub fn directive_name(self) -> Option<&'static str> {
        DIRECTIVE_SPELLINGS
            .iter()
            .find(|&&(kind, _)| kind == self)
            .map(|&(_, name)| name)
    }

    /// Whether this kind opens a block.
    #[must_use]
    pub const fn is_opener(self) -> bool {
        matches!(self, Self::If | Self::Switch | Self::Choose | Self::For)
    }

    /// Whether this kind is a line-leading directive keyword.
    #[must_use]
    pub const fn is_directive(self) -> bool {
        matches!(
            self,
            Self::If
                | Self::Else
                | Self::EndIf
                | Self::Switch
                | Self::Case
                | Self::Default
                | Self::Break
                | Self::End
                | Self::Choose
                | Self::When
                | Self::For
                | Self::EndFor
        )
    }
}

/// Directive keywords accepted after `#`.
pub const DIRECTIVES: &[(&str, TokenKind)] = &[
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("fi", TokenKind::EndIf),
    ("switch", TokenKind::Switch),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("break", TokenKind::Break),
    ("end", TokenKind::End),
    ("choose", TokenKind::Choose),
    ("when", TokenKind::When),
    ("for", TokenKind::For),
    ("done", TokenKind::EndFor),
];

const DIRECTIVE_SPELLINGS: &[(TokenKind, &str)] = &[
    (TokenKind::If, "#if"),
    (TokenKind::Else, "#else"),
    (TokenKind::EndIf, "#fi"),
    (TokenKind::Switch, "#switch"),
    (TokenKind::Case, "#case"),
    (TokenKind::Default, "#default"),
    (TokenKind::Break, "#break"),
    (TokenKind::End, "#end"),
    (TokenKind::Choose, "#choose"),
    (TokenKind::When, "#when"),
    (TokenKind::For, "#for"),
    (TokenKind::EndFor, "#done"),
];

/// Soft keywords recognized on `#for` lines.
pub const SOFT_KEYWORDS: &[(&str, TokenKind)] = &[
    ("of", TokenKind::Of),
    ("delimiter", TokenKind::Delimiter),
    ("open", TokenKind::Open),
    ("close", TokenKind::Close),
];

/// A single token with its kind, text, and source location.
///
/// Equality and hashing consider only `kind` and `text`; the span
/// is metadata.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            span: Span { line, column },
        }
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.span.line
    }

    #[must_use]
    pub const fn column(&self) -> usize {
        self.span.column
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.text.hash(state);
    }
}
