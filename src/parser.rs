use std::fmt;

use tracing::{debug, trace};

use crate::ast::{
    Block, Case, ChooseBlock, DEFAULT_DELIMITER, ForBlock, IfBlock, SwitchBlock, When,
};
use crate::lexer::{DialectConfig, Lexer, split_lines};
use crate::token::{Span, Token, TokenKind};

/// Classifies a structural error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralErrorKind {
    /// A closing directive with no open block, or the wrong one.
    UnexpectedCloser {
        found: &'static str,
        expected: Option<&'static str>,
    },
    /// Input ended inside a block; the span is its opening line.
    Unclosed { directive: &'static str },
    /// A branch directive outside the block it belongs to.
    MisplacedDirective {
        directive: &'static str,
        context: &'static str,
    },
    /// A second `#else` or `#default` in the same block.
    DuplicateBranch { directive: &'static str },
    /// `#if`, `#switch`, `#case` or `#when` with nothing after it.
    MissingExpression { directive: &'static str },
    /// Text or a block inside a `#switch` or `#choose` before its
    /// first arm.
    StrayText { context: &'static str },
    /// A `#for` header that does not read `var[, idx] of expr [opts]`.
    MalformedFor { reason: String },
}

impl fmt::Display for StructuralErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedCloser {
                found,
                expected: None,
            } => {
                write!(f, "unexpected '{found}' with no open block")
            }
            Self::UnexpectedCloser {
                found,
                expected: Some(expected),
            } => {
                write!(f, "expected '{expected}', got '{found}'")
            }
            Self::Unclosed { directive } => {
                write!(f, "unclosed '{directive}'")
            }
            Self::MisplacedDirective { directive, context } => {
                write!(f, "'{directive}' is only allowed inside '{context}'")
            }
            Self::DuplicateBranch { directive } => {
                write!(f, "duplicate '{directive}' branch")
            }
            Self::MissingExpression { directive } => {
                write!(f, "'{directive}' needs an expression")
            }
            Self::StrayText { context } => {
                write!(f, "text before the first branch of '{context}'")
            }
            Self::MalformedFor { reason } => {
                write!(f, "malformed '#for': {reason}")
            }
        }
    }
}

/// Error produced while building the block tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct StructuralError {
    pub kind: StructuralErrorKind,
    pub span: Span,
}

/// Parse template text into its top-level block sequence.
///
/// # Errors
///
/// Returns `StructuralError` on unbalanced or misordered directives.
pub fn parse_blocks(text: &str) -> Result<Vec<Block>, StructuralError> {
    parse_blocks_with(text, DialectConfig::default())
}

/// Parse template text with an explicit lexer dialect.
pub fn parse_blocks_with(
    text: &str,
    dialect: DialectConfig,
) -> Result<Vec<Block>, StructuralError> {
    let tokens = Lexer::new(dialect).tokenize(text);
    parse_tokens(&tokens, text, dialect)
}

/// Build the block tree from tokens produced for `source`.
///
/// Conditions are cut verbatim from `source`, so `tokens` must come
/// from the same text and dialect.
pub fn parse_tokens(
    tokens: &[Token],
    source: &str,
    dialect: DialectConfig,
) -> Result<Vec<Block>, StructuralError> {
    Parser::new(tokens, source, dialect).parse()
}

/// Which arm of a `#switch`/`#choose` receives lines; `None` until the
/// first `#case`, `#when` or `#default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    None,
    Branch,
    Default,
}

#[derive(Debug)]
enum Frame {
    If(IfBlock),
    Switch(SwitchBlock, Arm),
    Choose(ChooseBlock, Arm),
    For(ForBlock),
}

impl Frame {
    const fn opener(&self) -> &'static str {
        match self {
            Self::If(_) => "#if",
            Self::Switch(..) => "#switch",
            Self::Choose(..) => "#choose",
            Self::For(_) => "#for",
        }
    }

    const fn closer(&self) -> TokenKind {
        match self {
            Self::If(_) => TokenKind::EndIf,
            Self::Switch(..) | Self::Choose(..) => TokenKind::End,
            Self::For(_) => TokenKind::EndFor,
        }
    }

    fn target(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Self::If(b) => Some(b.else_branch.as_mut().unwrap_or(&mut b.then_branch)),
            Self::Switch(b, Arm::Branch) => b.cases.last_mut().map(|c| &mut c.body),
            Self::Choose(b, Arm::Branch) => b.whens.last_mut().map(|w| &mut w.body),
            Self::Switch(b, Arm::Default) => b.default.as_mut(),
            Self::Choose(b, Arm::Default) => b.default.as_mut(),
            Self::Switch(_, Arm::None) | Self::Choose(_, Arm::None) => None,
            Self::For(b) => Some(&mut b.body),
        }
    }

    fn finish(self) -> Block {
        match self {
            Self::If(b) => Block::If(b),
            Self::Switch(b, _) => Block::Switch(b),
            Self::Choose(b, _) => Block::Choose(b),
            Self::For(b) => Block::For(b),
        }
    }
}

fn append(target: &mut Vec<Block>, block: Block) {
    if let (Block::PlainText(text), Some(Block::PlainText(prev))) = (&block, target.last_mut()) {
        prev.push_str(text);
        return;
    }
    target.push(block);
}

fn kind_name(kind: TokenKind) -> &'static str {
    kind.directive_name().unwrap_or("?")
}

struct Parser<'a> {
    tokens: &'a [Token],
    lines: Vec<&'a str>,
    dialect: DialectConfig,
    pos: usize,
    root: Vec<Block>,
    stack: Vec<(Frame, Span)>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], source: &'a str, dialect: DialectConfig) -> Self {
        let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        Self {
            tokens,
            lines: split_lines(source).map(|(content, _)| content).collect(),
            dialect,
            pos: 0,
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Block>, StructuralError> {
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::PlainText => {
                    self.pos += 1;
                    self.push_text(&token.text, token.span)?;
                }
                kind if kind.is_directive() => {
                    let end = self.line_end();
                    let args = &self.tokens[self.pos + 1..end];
                    self.pos = (end + 1).min(self.tokens.len());
                    self.directive(token, args)?;
                }
                _ => {
                    // stray token outside a directive line
                    self.pos += 1;
                }
            }
        }

        if let Some((frame, span)) = self.stack.pop() {
            return Err(StructuralError {
                kind: StructuralErrorKind::Unclosed {
                    directive: frame.opener(),
                },
                span,
            });
        }

        debug!(blocks = self.root.len(), "parsed template");
        Ok(self.root)
    }

    /// Index of the `Newline` ending the current directive line.
    fn line_end(&self) -> usize {
        self.tokens[self.pos..]
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
            .map_or(self.tokens.len(), |i| self.pos + i)
    }

    fn directive(&mut self, keyword: &Token, args: &[Token]) -> Result<(), StructuralError> {
        let span = keyword.span;
        trace!(
            line = span.line,
            directive = kind_name(keyword.kind),
            depth = self.stack.len(),
            "directive"
        );

        match keyword.kind {
            TokenKind::If => {
                let condition = self.expression(keyword)?;
                self.open(
                    Frame::If(IfBlock {
                        condition,
                        then_branch: Vec::new(),
                        else_branch: None,
                    }),
                    span,
                )
            }
            TokenKind::Switch => {
                let subject = self.expression(keyword)?;
                self.open(
                    Frame::Switch(
                        SwitchBlock {
                            subject,
                            cases: Vec::new(),
                            default: None,
                        },
                        Arm::None,
                    ),
                    span,
                )
            }
            TokenKind::Choose => self.open(
                Frame::Choose(
                    ChooseBlock {
                        whens: Vec::new(),
                        default: None,
                    },
                    Arm::None,
                ),
                span,
            ),
            TokenKind::For => {
                let header = self.for_header(keyword, args)?;
                self.open(Frame::For(header), span)
            }
            TokenKind::Else => self.else_branch(span),
            TokenKind::Case => {
                let match_value = self.expression(keyword)?;
                self.arm(keyword, |frame| match frame {
                    Frame::Switch(b, arm) if b.default.is_none() => {
                        b.cases.push(Case {
                            match_value,
                            body: Vec::new(),
                        });
                        *arm = Arm::Branch;
                        true
                    }
                    _ => false,
                })
            }
            TokenKind::When => {
                let condition = self.expression(keyword)?;
                self.arm(keyword, |frame| match frame {
                    Frame::Choose(b, arm) if b.default.is_none() => {
                        b.whens.push(When {
                            condition,
                            body: Vec::new(),
                        });
                        *arm = Arm::Branch;
                        true
                    }
                    _ => false,
                })
            }
            TokenKind::Default => self.default_branch(span),
            // end-of-arm marker only; the arm stays the target
            TokenKind::Break => self.arm(keyword, |frame| {
                matches!(frame, Frame::Switch(..) | Frame::Choose(..))
            }),
            closer => self.close(closer, span),
        }
    }

    /// Text after the keyword, trimmed; empty is an error.
    fn expression(&self, keyword: &Token) -> Result<String, StructuralError> {
        let text = self.rest_of_line(keyword);
        if text.is_empty() {
            return Err(StructuralError {
                kind: StructuralErrorKind::MissingExpression {
                    directive: kind_name(keyword.kind),
                },
                span: keyword.span,
            });
        }
        Ok(text.to_string())
    }

    fn rest_of_line(&self, token: &Token) -> &'a str {
        let start = token.column() - 1 + token.text.chars().count();
        self.line_slice(token.line(), start, None).trim()
    }

    /// Slice one source line by 0-based char columns.
    fn line_slice(&self, line: usize, from: usize, to: Option<usize>) -> &'a str {
        let Some(text) = line
            .checked_sub(1)
            .and_then(|i| self.lines.get(i).copied())
        else {
            return "";
        };
        let byte = |col: usize| text.char_indices().nth(col).map_or(text.len(), |(i, _)| i);
        let start = byte(from);
        let end = to.map_or(text.len(), byte).max(start);
        &text[start..end]
    }

    fn open(&mut self, frame: Frame, span: Span) -> Result<(), StructuralError> {
        if let Some((top, _)) = self.stack.last_mut() {
            if top.target().is_none() {
                return Err(StructuralError {
                    kind: StructuralErrorKind::StrayText {
                        context: top.opener(),
                    },
                    span,
                });
            }
        }
        self.stack.push((frame, span));
        Ok(())
    }

    fn close(&mut self, closer: TokenKind, span: Span) -> Result<(), StructuralError> {
        let found = kind_name(closer);
        let Some((frame, _)) = self.stack.pop() else {
            return Err(StructuralError {
                kind: StructuralErrorKind::UnexpectedCloser {
                    found,
                    expected: None,
                },
                span,
            });
        };
        if frame.closer() != closer {
            return Err(StructuralError {
                kind: StructuralErrorKind::UnexpectedCloser {
                    found,
                    expected: Some(kind_name(frame.closer())),
                },
                span,
            });
        }

        let block = frame.finish();
        match self.stack.last_mut() {
            None => append(&mut self.root, block),
            Some((parent, _)) => {
                if let Some(target) = parent.target() {
                    append(target, block);
                }
            }
        }
        Ok(())
    }

    fn else_branch(&mut self, span: Span) -> Result<(), StructuralError> {
        match self.stack.last_mut() {
            Some((Frame::If(b), _)) if b.else_branch.is_none() => {
                b.else_branch = Some(Vec::new());
                Ok(())
            }
            Some((Frame::If(_), _)) => Err(StructuralError {
                kind: StructuralErrorKind::DuplicateBranch { directive: "#else" },
                span,
            }),
            _ => Err(StructuralError {
                kind: StructuralErrorKind::MisplacedDirective {
                    directive: "#else",
                    context: "#if",
                },
                span,
            }),
        }
    }

    fn default_branch(&mut self, span: Span) -> Result<(), StructuralError> {
        let (default, arm) = match self.stack.last_mut() {
            Some((Frame::Switch(b, arm), _)) => (&mut b.default, arm),
            Some((Frame::Choose(b, arm), _)) => (&mut b.default, arm),
            _ => {
                return Err(StructuralError {
                    kind: StructuralErrorKind::MisplacedDirective {
                        directive: "#default",
                        context: "#switch' or '#choose",
                    },
                    span,
                });
            }
        };
        if default.is_some() {
            return Err(StructuralError {
                kind: StructuralErrorKind::DuplicateBranch {
                    directive: "#default",
                },
                span,
            });
        }
        *default = Some(Vec::new());
        *arm = Arm::Default;
        Ok(())
    }

    /// Apply `update` to the top frame; `false` means the keyword is
    /// misplaced there.
    fn arm(
        &mut self,
        keyword: &Token,
        update: impl FnOnce(&mut Frame) -> bool,
    ) -> Result<(), StructuralError> {
        let applied = self
            .stack
            .last_mut()
            .is_some_and(|(frame, _)| update(frame));
        if applied {
            return Ok(());
        }
        let context = match keyword.kind {
            TokenKind::Case => "#switch",
            TokenKind::When => "#choose",
            _ => "#switch' or '#choose",
        };
        Err(StructuralError {
            kind: StructuralErrorKind::MisplacedDirective {
                directive: kind_name(keyword.kind),
                context,
            },
            span: keyword.span,
        })
    }

    fn push_text(&mut self, text: &str, span: Span) -> Result<(), StructuralError> {
        let block = Block::PlainText(text.to_string());
        let Some((top, _)) = self.stack.last_mut() else {
            append(&mut self.root, block);
            return Ok(());
        };
        let context = top.opener();
        let Some(target) = top.target() else {
            return Err(StructuralError {
                kind: StructuralErrorKind::StrayText { context },
                span,
            });
        };
        append(target, block);
        Ok(())
    }

    /// `var[, idx] of expr [delimiter 'd'] [open 'o'] [close 'c']`
    fn for_header(&self, keyword: &Token, args: &[Token]) -> Result<ForBlock, StructuralError> {
        let malformed = |reason: &str| StructuralError {
            kind: StructuralErrorKind::MalformedFor {
                reason: reason.to_string(),
            },
            span: keyword.span,
        };

        let of = args
            .iter()
            .position(|t| t.kind == TokenKind::Of)
            .ok_or_else(|| malformed("expected 'of'"))?;

        let names: String = args[..of].iter().map(|t| t.text.as_str()).collect();
        let names: Vec<&str> = names.split(',').map(str::trim).collect();
        let valid = |name: &&str| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        let (var_name, index_name) = match names.as_slice() {
            [var] if valid(var) => ((*var).to_string(), None),
            [var, idx] if valid(var) && valid(idx) => {
                ((*var).to_string(), Some((*idx).to_string()))
            }
            _ => return Err(malformed("expected a loop variable before 'of'")),
        };

        let options_at = args[of + 1..]
            .iter()
            .position(|t| {
                matches!(
                    t.kind,
                    TokenKind::Delimiter | TokenKind::Open | TokenKind::Close
                )
            })
            .map(|i| of + 1 + i);

        let of_token = &args[of];
        let expr_from = of_token.column() - 1 + of_token.text.chars().count();
        let expr_to = options_at.map(|i| args[i].column() - 1);
        let iterable_expr = self
            .line_slice(keyword.line(), expr_from, expr_to)
            .trim()
            .to_string();
        if iterable_expr.is_empty() {
            return Err(malformed("expected an expression after 'of'"));
        }

        let mut header = ForBlock {
            var_name,
            index_name,
            iterable_expr,
            delimiter: DEFAULT_DELIMITER.to_string(),
            open: String::new(),
            close: String::new(),
            body: Vec::new(),
        };

        let mut seen = Vec::new();
        let mut rest = options_at.map_or(&[][..], |i| &args[i..]);
        while let [option, tail @ ..] = rest {
            let name = option.text.to_ascii_lowercase();
            let slot = match option.kind {
                TokenKind::Delimiter => &mut header.delimiter,
                TokenKind::Open => &mut header.open,
                TokenKind::Close => &mut header.close,
                _ => return Err(malformed(&format!("unexpected '{}'", option.text))),
            };
            if seen.contains(&option.kind) {
                return Err(malformed(&format!("'{name}' given twice")));
            }
            seen.push(option.kind);
            let [value, tail @ ..] = tail else {
                return Err(malformed(&format!("missing value after '{name}'")));
            };
            *slot = self.unquote(value);
            rest = tail;
        }

        Ok(header)
    }

    fn unquote(&self, token: &Token) -> String {
        let text = token.text.as_str();
        if token.kind == TokenKind::String && self.dialect.retain_quotes && text.len() >= 2 {
            text[1..text.len() - 1].to_string()
        } else {
            text.to_string()
        }
    }
}
