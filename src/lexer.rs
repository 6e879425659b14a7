use tracing::{debug, trace};

use crate::token::{Token, TokenKind};

/// Dialect switches for the directive-line sub-lexer.
///
/// The legacy dialect strips quotes from string tokens and lets bare
/// words run up to the next whitespace; the revised dialect keeps the
/// quotes and splits `,` `|` `&` `!` into tokens of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectConfig {
    /// Keep the surrounding quote characters in `String` tokens.
    pub retain_quotes: bool,
    /// Emit `Comma`, `LogicOr`, `LogicAnd`, `LogicNot` tokens.
    pub punctuation_tokens: bool,
}

impl DialectConfig {
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            retain_quotes: false,
            punctuation_tokens: false,
        }
    }

    #[must_use]
    pub const fn revised() -> Self {
        Self {
            retain_quotes: true,
            punctuation_tokens: true,
        }
    }
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::revised()
    }
}

/// Tokenize template text with the revised dialect.
///
/// Never fails: text the lexer cannot classify becomes `Unknown`.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(DialectConfig::default()).tokenize(input)
}

/// Tokenize template text with an explicit dialect.
#[must_use]
pub fn tokenize_with(input: &str, dialect: DialectConfig) -> Vec<Token> {
    Lexer::new(dialect).tokenize(input)
}

/// Whether a physical line (terminator optional) is a directive line:
/// optional leading whitespace, `#`, a known directive keyword, then
/// whitespace or end of line.
#[must_use]
pub fn is_directive_line(line: &str) -> bool {
    let rest = line.trim_start();
    let Some(rest) = rest.strip_prefix('#') else {
        return false;
    };
    let word_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if TokenKind::directive(&rest[..word_len]).is_none() {
        return false;
    }
    rest[word_len..]
        .chars()
        .next()
        .is_none_or(char::is_whitespace)
}

/// Split input into `(content, terminator)` pairs, one per physical line.
pub(crate) fn split_lines(input: &str) -> impl Iterator<Item = (&str, &str)> {
    input.split_inclusive('\n').map(|line| {
        if let Some(content) = line.strip_suffix("\r\n") {
            (content, "\r\n")
        } else if let Some(content) = line.strip_suffix('\n') {
            (content, "\n")
        } else {
            (line, "")
        }
    })
}

/// Two-level lexer: classifies lines, then tokenizes directive lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexer {
    dialect: DialectConfig,
}

impl Lexer {
    #[must_use]
    pub const fn new(dialect: DialectConfig) -> Self {
        Self { dialect }
    }

    #[must_use]
    pub const fn dialect(&self) -> DialectConfig {
        self.dialect
    }

    #[must_use]
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        let mut tokens = Vec::new();
        let mut line_no = 0;
        let mut directive_lines = 0;

        for (content, terminator) in split_lines(input) {
            line_no += 1;
            if is_directive_line(content) {
                directive_lines += 1;
                LineLexer::new(content, line_no, self.dialect).run(&mut tokens);
                let column = content.chars().count() + 1;
                tokens.push(Token::new(TokenKind::Newline, terminator, line_no, column));
            } else {
                let mut text = String::with_capacity(content.len() + terminator.len());
                text.push_str(content);
                text.push_str(terminator);
                tokens.push(Token::new(TokenKind::PlainText, text, line_no, 1));
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", line_no + 1, 1));
        debug!(
            lines = line_no,
            directive_lines,
            tokens = tokens.len(),
            "tokenized template"
        );
        tokens
    }
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

const fn is_punctuation(c: char) -> bool {
    matches!(c, ',' | '|' | '&' | '!')
}

/// Sub-lexer over a single directive line.
struct LineLexer<'a> {
    line: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line_no: usize,
    dialect: DialectConfig,
}

impl<'a> LineLexer<'a> {
    fn new(line: &'a str, line_no: usize, dialect: DialectConfig) -> Self {
        Self {
            line,
            chars: line.char_indices().collect(),
            pos: 0,
            line_no,
            dialect,
        }
    }

    fn run(mut self, tokens: &mut Vec<Token>) {
        while let Some(ch) = self.peek() {
            let start = self.pos;
            let token = match ch {
                c if c.is_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                '#' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) => {
                    self.read_keyword()
                }
                '\'' | '"' => self.read_string(ch),
                c if self.dialect.punctuation_tokens && is_punctuation(c) => {
                    self.pos += 1;
                    let kind = match c {
                        ',' => TokenKind::Comma,
                        '|' => TokenKind::LogicOr,
                        '&' => TokenKind::LogicAnd,
                        _ => TokenKind::LogicNot,
                    };
                    self.make_token(kind, start)
                }
                ':' if self.peek_at(1).is_some_and(is_word_char) => {
                    self.pos += 1;
                    self.eat_while(is_word_char);
                    self.make_token(TokenKind::NamedParameter, start)
                }
                c if c.is_ascii_alphabetic() => self.read_word(),
                _ => self.read_other(),
            };
            trace!(line = self.line_no, kind = ?token.kind, text = %token.text, "token");
            tokens.push(token);
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|&(_, c)| c)
    }

    fn offset(&self, pos: usize) -> usize {
        self.chars.get(pos).map_or(self.line.len(), |&(i, _)| i)
    }

    fn slice(&self, start: usize) -> &'a str {
        &self.line[self.offset(start)..self.offset(self.pos)]
    }

    fn make_token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, self.slice(start), self.line_no, start + 1)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn read_keyword(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1; // skip #
        self.eat_while(|c| c.is_ascii_alphabetic());
        let word = &self.slice(start)[1..];
        let kind = TokenKind::directive(word).unwrap_or(TokenKind::Unknown);
        self.make_token(kind, start)
    }

    fn read_string(&mut self, quote: char) -> Token {
        let start = self.pos;
        self.pos += 1; // skip opening quote
        self.eat_while(|c| c != quote);

        if self.peek().is_none() {
            // unterminated, keep the raw remainder for the parser to report
            return self.make_token(TokenKind::Unknown, start);
        }

        self.pos += 1; // skip closing quote
        let raw = self.slice(start);
        let text = if self.dialect.retain_quotes {
            raw
        } else {
            &raw[1..raw.len() - 1]
        };
        Token::new(TokenKind::String, text, self.line_no, start + 1)
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        if self.dialect.punctuation_tokens {
            self.eat_while(is_word_char);
        } else {
            self.eat_while(|c| !c.is_whitespace());
        }
        let word = self.slice(start);
        let kind = TokenKind::soft_keyword(word).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    fn read_other(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1;
        let punctuation = self.dialect.punctuation_tokens;
        self.eat_while(|c| !c.is_whitespace() && !(punctuation && is_punctuation(c)));
        let kind = if is_number(self.slice(start)) {
            TokenKind::Number
        } else {
            TokenKind::Unknown
        };
        self.make_token(kind, start)
    }
}

/// `-?digits(.digits)?`
pub(crate) fn is_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn plain_lines_pass_through() {
        let tokens = tokenize("select *\nfrom users\n");
        assert_eq!(
            kinds(&tokens),
            [TokenKind::PlainText, TokenKind::PlainText, TokenKind::Eof]
        );
        assert_eq!(tokens[0].text, "select *\n");
        assert_eq!(tokens[1].text, "from users\n");
    }

    #[test]
    fn if_line() {
        let tokens = tokenize("#if :id >= 0\n");
        assert_eq!(
            kinds(&tokens),
            [
                TokenKind::If,
                TokenKind::NamedParameter,
                TokenKind::Unknown,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, ":id");
        assert_eq!(tokens[2].text, ">=");
    }

    #[test]
    fn directive_detection() {
        assert!(is_directive_line("#if :a"));
        assert!(is_directive_line("   #FI"));
        assert!(is_directive_line("\t#done"));
        assert!(!is_directive_line("#iffy"));
        assert!(!is_directive_line("# if"));
        assert!(!is_directive_line("#comment here"));
        assert!(!is_directive_line("select # from"));
    }

    #[test]
    fn for_line_soft_keywords() {
        let tokens = tokenize("#for item of :list delimiter ',' open '(' close ')'");
        assert_eq!(
            kinds(&tokens),
            [
                TokenKind::For,
                TokenKind::Identifier,
                TokenKind::Of,
                TokenKind::NamedParameter,
                TokenKind::Delimiter,
                TokenKind::String,
                TokenKind::Open,
                TokenKind::String,
                TokenKind::Close,
                TokenKind::String,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[5].text, "','");
    }

    #[test]
    fn legacy_strips_quotes() {
        let tokens = tokenize_with("#case 'a'", DialectConfig::legacy());
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].text, "a");
    }

    #[test]
    fn revised_punctuation() {
        let tokens = tokenize("#when !:a|upper");
        assert_eq!(
            kinds(&tokens)[..5],
            [
                TokenKind::When,
                TokenKind::LogicNot,
                TokenKind::NamedParameter,
                TokenKind::LogicOr,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn unknown_keyword_inside_line() {
        let tokens = tokenize("#if #nope");
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].text, "#nope");
    }

    #[test]
    fn unterminated_string_is_unknown() {
        let tokens = tokenize("#case 'abc");
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[1].text, "'abc");
    }

    #[test]
    fn numbers() {
        assert!(is_number("12"));
        assert!(is_number("-3.5"));
        assert!(!is_number("-"));
        assert!(!is_number("1."));
        assert!(!is_number("1e3"));
    }

    #[test]
    fn span_tracking() {
        let tokens = tokenize("a\n  #if :x\n");
        assert_eq!(tokens[1].line(), 2);
        assert_eq!(tokens[1].column(), 3);
        assert_eq!(tokens[2].column(), 7);
        assert_eq!(tokens[3].kind, TokenKind::Newline);
        assert_eq!(tokens[3].text, "\n");
    }

    #[test]
    fn bom_stripping() {
        let tokens = tokenize("\u{FEFF}#fi");
        assert_eq!(tokens[0].kind, TokenKind::EndIf);
    }
}
