use crate::ast::{
    Block, Case, ChooseBlock, DEFAULT_DELIMITER, ForBlock, IfBlock, SwitchBlock, When,
};

impl Block {
    /// Verbatim text.
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self::PlainText(content.to_string())
    }

    /// Text line with a `\n` terminator appended.
    #[must_use]
    pub fn line(content: &str) -> Self {
        Self::PlainText(format!("{content}\n"))
    }
}

impl IfBlock {
    /// Create an `#if` with an empty then-branch.
    #[must_use]
    pub fn new(condition: &str) -> Self {
        Self {
            condition: condition.to_string(),
            then_branch: Vec::new(),
            else_branch: None,
        }
    }

    /// Add a block to the then-branch.
    #[must_use]
    pub fn then(mut self, block: Block) -> Self {
        self.then_branch.push(block);
        self
    }

    /// Add a block to the else-branch, creating it if needed.
    #[must_use]
    pub fn otherwise(mut self, block: Block) -> Self {
        self.else_branch.get_or_insert_with(Vec::new).push(block);
        self
    }
}

impl SwitchBlock {
    #[must_use]
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            cases: Vec::new(),
            default: None,
        }
    }

    /// Add a `#case` arm.
    #[must_use]
    pub fn case(mut self, match_value: &str, body: Vec<Block>) -> Self {
        self.cases.push(Case {
            match_value: match_value.to_string(),
            body,
        });
        self
    }

    /// Set the `#default` arm.
    #[must_use]
    pub fn default_arm(mut self, body: Vec<Block>) -> Self {
        self.default = Some(body);
        self
    }
}

impl ChooseBlock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            whens: Vec::new(),
            default: None,
        }
    }

    /// Add a `#when` arm.
    #[must_use]
    pub fn when(mut self, condition: &str, body: Vec<Block>) -> Self {
        self.whens.push(When {
            condition: condition.to_string(),
            body,
        });
        self
    }

    /// Set the `#default` arm.
    #[must_use]
    pub fn default_arm(mut self, body: Vec<Block>) -> Self {
        self.default = Some(body);
        self
    }
}

impl Default for ChooseBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl ForBlock {
    /// `#for var of iterable` with default options.
    #[must_use]
    pub fn new(var_name: &str, iterable_expr: &str) -> Self {
        Self {
            var_name: var_name.to_string(),
            index_name: None,
            iterable_expr: iterable_expr.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            open: String::new(),
            close: String::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn index(mut self, name: &str) -> Self {
        self.index_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    /// Set the text written before and after the joined items.
    #[must_use]
    pub fn wrap(mut self, open: &str, close: &str) -> Self {
        self.open = open.to_string();
        self.close = close.to_string();
        self
    }

    #[must_use]
    pub fn body(mut self, block: Block) -> Self {
        self.body.push(block);
        self
    }
}

impl From<IfBlock> for Block {
    fn from(b: IfBlock) -> Self {
        Self::If(b)
    }
}

impl From<SwitchBlock> for Block {
    fn from(b: SwitchBlock) -> Self {
        Self::Switch(b)
    }
}

impl From<ChooseBlock> for Block {
    fn from(b: ChooseBlock) -> Self {
        Self::Choose(b)
    }
}

impl From<ForBlock> for Block {
    fn from(b: ForBlock) -> Self {
        Self::For(b)
    }
}
