//! Serializes a block tree back into canonical template text.
//!
//! Directives are written flush left with single spaces, `#for` options
//! only when they differ from the defaults. Plain text is copied
//! verbatim, so a template already in canonical form survives a
//! parse/format round trip byte for byte.

use std::fmt::Write as _;

use crate::ast::{Block, DEFAULT_DELIMITER, ForBlock};

/// Format blocks into template text.
#[must_use]
pub fn format(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut pending = vec![Step::Blocks(blocks)];

    while let Some(step) = pending.pop() {
        match step {
            Step::Text(text) => out.push_str(text),
            Step::Directive(keyword, argument) => directive(&mut out, keyword, argument),
            Step::ForHeader(b) => directive(&mut out, "#for", &for_header(b)),
            Step::Blocks(seq) => {
                let Some((first, rest)) = seq.split_first() else {
                    continue;
                };
                pending.push(Step::Blocks(rest));
                pending.extend(steps(first).into_iter().rev());
            }
        }
    }

    out
}

/// Concatenate every `PlainText` leaf in document order, across all
/// branches.
#[must_use]
pub fn plain_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut pending: Vec<&[Block]> = vec![blocks];

    // depth-first, children pushed in reverse to keep document order
    while let Some(seq) = pending.pop() {
        let Some((first, rest)) = seq.split_first() else {
            continue;
        };
        pending.push(rest);
        match first {
            Block::PlainText(text) => out.push_str(text),
            other => pending.extend(other.children().into_iter().rev()),
        }
    }

    out
}

/// One unit of formatter output.
enum Step<'a> {
    Blocks(&'a [Block]),
    Text(&'a str),
    Directive(&'static str, &'a str),
    ForHeader(&'a ForBlock),
}

/// Output of one block in document order; child sequences stay unexpanded.
fn steps(block: &Block) -> Vec<Step<'_>> {
    let mut steps = Vec::new();
    match block {
        Block::PlainText(text) => steps.push(Step::Text(text)),
        Block::If(b) => {
            steps.push(Step::Directive("#if", &b.condition));
            steps.push(Step::Blocks(&b.then_branch));
            if let Some(else_branch) = &b.else_branch {
                steps.push(Step::Directive("#else", ""));
                steps.push(Step::Blocks(else_branch));
            }
            steps.push(Step::Directive("#fi", ""));
        }
        Block::Switch(b) => {
            steps.push(Step::Directive("#switch", &b.subject));
            for case in &b.cases {
                arm(&mut steps, "#case", &case.match_value, &case.body);
            }
            if let Some(default) = &b.default {
                arm(&mut steps, "#default", "", default);
            }
            steps.push(Step::Directive("#end", ""));
        }
        Block::Choose(b) => {
            steps.push(Step::Directive("#choose", ""));
            for when in &b.whens {
                arm(&mut steps, "#when", &when.condition, &when.body);
            }
            if let Some(default) = &b.default {
                arm(&mut steps, "#default", "", default);
            }
            steps.push(Step::Directive("#end", ""));
        }
        Block::For(b) => {
            steps.push(Step::ForHeader(b));
            steps.push(Step::Blocks(&b.body));
            steps.push(Step::Directive("#done", ""));
        }
    }
    steps
}

fn arm<'a>(
    steps: &mut Vec<Step<'a>>,
    keyword: &'static str,
    argument: &'a str,
    body: &'a [Block],
) {
    steps.push(Step::Directive(keyword, argument));
    steps.push(Step::Blocks(body));
    steps.push(Step::Directive("#break", ""));
}

/// Start a directive on a fresh line.
fn directive(out: &mut String, keyword: &str, argument: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(keyword);
    if !argument.is_empty() {
        out.push(' ');
        out.push_str(argument);
    }
    out.push('\n');
}

fn for_header(b: &ForBlock) -> String {
    let mut header = b.var_name.clone();
    if let Some(index) = &b.index_name {
        let _ = write!(header, ", {index}");
    }
    let _ = write!(header, " of {}", b.iterable_expr);
    if b.delimiter != DEFAULT_DELIMITER {
        let _ = write!(header, " delimiter {}", quote(&b.delimiter));
    }
    if !b.open.is_empty() {
        let _ = write!(header, " open {}", quote(&b.open));
    }
    if !b.close.is_empty() {
        let _ = write!(header, " close {}", quote(&b.close));
    }
    header
}

/// Single quotes unless the value holds one.
fn quote(value: &str) -> String {
    if value.contains('\'') {
        format!("\"{value}\"")
    } else {
        format!("'{value}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Case, ChooseBlock, IfBlock, SwitchBlock, When};

    fn text(s: &str) -> Block {
        Block::PlainText(s.to_string())
    }

    #[test]
    fn if_else() {
        let blocks = vec![Block::If(IfBlock {
            condition: ":a == 1".to_string(),
            then_branch: vec![text("x\n")],
            else_branch: Some(vec![text("y\n")]),
        })];
        assert_eq!(format(&blocks), "#if :a == 1\nx\n#else\ny\n#fi\n");
    }

    #[test]
    fn switch_with_default() {
        let blocks = vec![Block::Switch(SwitchBlock {
            subject: ":k".to_string(),
            cases: vec![Case {
                match_value: "'a'".to_string(),
                body: vec![text("A\n")],
            }],
            default: Some(Vec::new()),
        })];
        let expected = "\
#switch :k
#case 'a'
A
#break
#default
#break
#end
";
        assert_eq!(format(&blocks), expected);
    }

    #[test]
    fn choose() {
        let blocks = vec![Block::Choose(ChooseBlock {
            whens: vec![When {
                condition: ":a > 1".to_string(),
                body: vec![text("big\n")],
            }],
            default: None,
        })];
        assert_eq!(format(&blocks), "#choose\n#when :a > 1\nbig\n#break\n#end\n");
    }

    #[test]
    fn for_options_only_when_set() {
        let mut f = ForBlock {
            var_name: "x".to_string(),
            index_name: None,
            iterable_expr: ":xs".to_string(),
            delimiter: ",".to_string(),
            open: String::new(),
            close: String::new(),
            body: vec![text(":x\n")],
        };
        assert_eq!(
            format(&[Block::For(f.clone())]),
            "#for x of :xs\n:x\n#done\n"
        );

        f.index_name = Some("i".to_string());
        f.delimiter = " and ".to_string();
        f.open = "(".to_string();
        f.close = "'".to_string();
        assert_eq!(
            format(&[Block::For(f)]),
            "#for x, i of :xs delimiter ' and ' open '(' close \"'\"\n:x\n#done\n"
        );
    }

    #[test]
    fn directive_after_unterminated_text() {
        let blocks = vec![
            text("tail"),
            Block::If(IfBlock {
                condition: "true".to_string(),
                then_branch: Vec::new(),
                else_branch: None,
            }),
        ];
        assert_eq!(format(&blocks), "tail\n#if true\n#fi\n");
    }

    #[test]
    fn plain_text_walks_every_branch() {
        let blocks = vec![
            text("a\n"),
            Block::If(IfBlock {
                condition: ":x".to_string(),
                then_branch: vec![text("b\n")],
                else_branch: Some(vec![text("c\n")]),
            }),
            text("d\n"),
        ];
        assert_eq!(plain_text(&blocks), "a\nb\nc\nd\n");
    }
}
