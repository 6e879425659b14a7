use crate::value::{self, Value};

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Verbatim line(s), terminators included.
    PlainText(String),
    /// `#if cond ... [#else ...] #fi`
    If(IfBlock),
    /// `#switch subject ... #end`
    Switch(SwitchBlock),
    /// `#choose ... #end`
    Choose(ChooseBlock),
    /// `#for item of expr ... #done`
    For(ForBlock),
}

/// Conditional block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfBlock {
    pub condition: String,
    pub then_branch: Vec<Block>,
    pub else_branch: Option<Vec<Block>>,
}

/// Switch on a subject expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchBlock {
    pub subject: String,
    pub cases: Vec<Case>,
    pub default: Option<Vec<Block>>,
}

/// One `#case` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    /// Raw text after `#case`, e.g. `'a', 'b'`.
    pub match_value: String,
    pub body: Vec<Block>,
}

/// First-match conditional chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChooseBlock {
    pub whens: Vec<When>,
    pub default: Option<Vec<Block>>,
}

/// One `#when` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct When {
    pub condition: String,
    pub body: Vec<Block>,
}

/// Loop over a collection expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForBlock {
    pub var_name: String,
    /// Optional second loop variable, `#for item, idx of ...`.
    pub index_name: Option<String>,
    pub iterable_expr: String,
    pub delimiter: String,
    pub open: String,
    pub close: String,
    pub body: Vec<Block>,
}

/// Default `delimiter` of a `#for` block.
pub const DEFAULT_DELIMITER: &str = ",";

impl Case {
    /// Coerce each comma-separated literal of the match text.
    ///
    /// Commas inside quotes do not split.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        split_top_level(&self.match_value, ',')
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(value::coerce)
            .collect()
    }
}

impl Block {
    /// Child sequences of this node in document order.
    #[must_use]
    pub fn children(&self) -> Vec<&[Self]> {
        match self {
            Self::PlainText(_) => Vec::new(),
            Self::If(b) => std::iter::once(b.then_branch.as_slice())
                .chain(b.else_branch.as_deref())
                .collect(),
            Self::Switch(b) => b
                .cases
                .iter()
                .map(|c| c.body.as_slice())
                .chain(b.default.as_deref())
                .collect(),
            Self::Choose(b) => b
                .whens
                .iter()
                .map(|w| w.body.as_slice())
                .chain(b.default.as_deref())
                .collect(),
            Self::For(b) => vec![b.body.as_slice()],
        }
    }

    /// Mutable child sequences of this node in document order.
    #[must_use]
    pub fn children_mut(&mut self) -> Vec<&mut Vec<Self>> {
        match self {
            Self::PlainText(_) => Vec::new(),
            Self::If(b) => std::iter::once(&mut b.then_branch)
                .chain(b.else_branch.as_mut())
                .collect(),
            Self::Switch(b) => b
                .cases
                .iter_mut()
                .map(|c| &mut c.body)
                .chain(b.default.as_mut())
                .collect(),
            Self::Choose(b) => b
                .whens
                .iter_mut()
                .map(|w| &mut w.body)
                .chain(b.default.as_mut())
                .collect(),
            Self::For(b) => vec![&mut b.body],
        }
    }
}

// Nested children are moved onto a worklist so dropping a deep tree
// does not recurse once per level.
impl Drop for Block {
    fn drop(&mut self) {
        if matches!(self, Self::PlainText(_)) {
            return;
        }
        let mut pending: Vec<Self> = Vec::new();
        for body in self.children_mut() {
            pending.append(body);
        }
        while let Some(mut block) = pending.pop() {
            for body in block.children_mut() {
                pending.append(body);
            }
        }
    }
}

/// Split on `sep` outside of `'...'` / `"..."` and parentheses.
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
