//! Boolean condition evaluation.
//!
//! A condition such as `:age >= 21 && :name|upper == 'JOHN'` is decided
//! in two phases:
//!
//! 1. Every comparison `operand [|pipe...] op operand [|pipe...]` is
//!    evaluated, leftmost first, and replaced by `true` or `false`.
//!    Every other occurrence of the identical comparison text (at token
//!    boundaries) is replaced in the same step.
//! 2. The remaining text holds only `true`, `false`, `(`, `)`, `!`, `&&`
//!    and `||`. The innermost parenthesized group is folded strictly left
//!    to right, negated when an odd run of `!` precedes it, and every
//!    occurrence of the group text is replaced by its literal. This
//!    repeats until one literal is left.
//!
//! `&&` and `||` share one precedence level. The only exception is the
//! leading short circuit: a group starting `true || ...` is `true`, and
//! one starting `false && ...` is `false`, without looking further.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::ast::split_top_level;
use crate::comparator::{self, Operator};
use crate::pipe::{self, Names, Pipe, PipeRef, PipeRegistry};
use crate::value::{self, Value, Variables};

/// Error produced while evaluating a condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A pipe name that is neither registered nor built in.
    #[error("pipe '{pipe}' not found in expression '{expression}'")]
    PipeNotFound { pipe: String, expression: String },
    /// Wrong pipe arity or operand types an operator cannot take.
    #[error("{message}")]
    Argument { message: String },
    /// Text that does not reduce to a boolean.
    #[error("{message}: '{fragment}'")]
    Syntax { message: String, fragment: String },
}

const OPERAND: &str = r#":[\w.]+|'[^']*'|"[^"]*"|[\w.]+|-\d+(?:\.\d+)?"#;
const PIPES: &str = r#"(?:\s*\|\s*\w+(?:\s*\((?:[^()'"]|'[^']*'|"[^"]*")*\))?)*"#;
const OPERATOR: &str = r"==|!=|>=|<=|!~|!@|>|<|~|@";

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<lhs>{OPERAND})(?P<lpipes>{PIPES})\s*(?P<op>{OPERATOR})\s*(?P<rhs>{OPERAND})(?P<rpipes>{PIPES})"
    ))
    .expect("comparison pattern is valid")
});

/// Evaluate a condition with the built-in pipes only.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub fn evaluate<V: Variables + ?Sized>(condition: &str, vars: &V) -> Result<bool, EvalError> {
    Evaluator::new().evaluate(condition, vars)
}

/// Condition evaluator with its own pipe registrations.
///
/// Pipes registered here shadow built-ins of the same name.
#[derive(Clone, Default)]
pub struct Evaluator {
    pipes: PipeRegistry,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("pipes", &Names(&self.pipes))
            .finish()
    }
}

impl Evaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom pipe, replacing any previous one of that name.
    pub fn register_pipe(&mut self, name: impl Into<String>, pipe: impl Pipe + 'static) {
        let name = name.into();
        debug!(pipe = %name, "registered pipe");
        self.pipes.insert(name, std::sync::Arc::new(pipe));
    }

    /// Builder form of [`register_pipe`](Self::register_pipe).
    #[must_use]
    pub fn with_pipe(mut self, name: impl Into<String>, pipe: impl Pipe + 'static) -> Self {
        self.register_pipe(name, pipe);
        self
    }

    /// Pipes registered on this evaluator (built-ins excluded).
    #[must_use]
    pub const fn custom_pipes(&self) -> &PipeRegistry {
        &self.pipes
    }

    /// Resolve a pipe: custom registrations first, then built-ins.
    #[must_use]
    pub fn pipe(&self, name: &str) -> Option<&PipeRef> {
        self.pipes.get(name).or_else(|| pipe::builtin(name))
    }

    /// Decide `condition` against `vars`.
    ///
    /// # Errors
    ///
    /// - `EvalError::PipeNotFound` for an unknown pipe name.
    /// - `EvalError::Argument` for wrong pipe arity or incomparable
    ///   operands.
    /// - `EvalError::Syntax` when the condition does not reduce to a
    ///   single boolean.
    pub fn evaluate<V: Variables + ?Sized>(
        &self,
        condition: &str,
        vars: &V,
    ) -> Result<bool, EvalError> {
        let resolved = self.resolve_comparisons(condition, vars)?;
        let result = reduce(&resolved)?;
        debug!(condition, resolved = %resolved, result, "evaluated condition");
        Ok(result)
    }

    /// Phase one: replace every comparison with its boolean literal.
    ///
    /// # Errors
    ///
    /// Pipe lookup, pipe argument and comparison errors.
    pub fn resolve_comparisons<V: Variables + ?Sized>(
        &self,
        condition: &str,
        vars: &V,
    ) -> Result<String, EvalError> {
        let mut expr = condition.to_string();

        while let Some(caps) = COMPARISON.captures(&expr) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let text = &expr[whole.clone()];
            let outcome = self.compare(&caps, text, vars)?;
            trace!(comparison = text, outcome, "resolved comparison");

            expr = replace_occurrences(&expr, text, whole.start, literal(outcome));
        }

        Ok(expr)
    }

    fn compare<V: Variables + ?Sized>(
        &self,
        caps: &Captures<'_>,
        text: &str,
        vars: &V,
    ) -> Result<bool, EvalError> {
        let group = |name: &str| caps.name(name).map_or("", |m| m.as_str());
        let lhs = self.operand(group("lhs"), group("lpipes"), text, vars)?;
        let op: Operator = group("op").parse()?;
        let rhs = self.operand(group("rhs"), group("rpipes"), text, vars)?;
        comparator::compare(&lhs, op, &rhs)
    }

    fn operand<V: Variables + ?Sized>(
        &self,
        raw: &str,
        pipes: &str,
        expression: &str,
        vars: &V,
    ) -> Result<Value, EvalError> {
        let mut value = resolve(raw, vars);

        for call in split_top_level(pipes, '|').into_iter().skip(1) {
            let (name, params) = parse_pipe_call(call.trim(), vars);
            let pipe = self.pipe(name).ok_or_else(|| EvalError::PipeNotFound {
                pipe: name.to_string(),
                expression: expression.to_string(),
            })?;
            value = pipe.transform(value, &params)?;
        }

        Ok(value)
    }
}

/// `:name` is a deep variable lookup; anything else is a literal.
fn resolve<V: Variables + ?Sized>(raw: &str, vars: &V) -> Value {
    raw.strip_prefix(':').map_or_else(
        || value::coerce(raw),
        |name| vars.get_deep(name).unwrap_or_default(),
    )
}

/// Split `name(arg, ...)` into the pipe name and resolved arguments.
fn parse_pipe_call<'a, V: Variables + ?Sized>(
    call: &'a str,
    vars: &V,
) -> (&'a str, Vec<Value>) {
    let Some((name, rest)) = call.split_once('(') else {
        return (call, Vec::new());
    };
    let args = rest.trim_end().strip_suffix(')').unwrap_or(rest);
    let params = if args.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(args, ',')
            .into_iter()
            .map(|arg| resolve(arg.trim(), vars))
            .collect()
    };
    (name.trim(), params)
}

const fn literal(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

const fn is_operand_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '\'' | '"')
}

/// Replace `needle` at `primary` and wherever else it stands on its own,
/// i.e. not glued to a neighbouring operand.
fn replace_occurrences(haystack: &str, needle: &str, primary: usize, with: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;

    for (start, _) in haystack.match_indices(needle) {
        if start < last {
            continue;
        }
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        let bounded =
            !before.is_some_and(is_operand_char) && !after.is_some_and(is_operand_char);
        if start == primary || bounded {
            out.push_str(&haystack[last..start]);
            out.push_str(with);
            last = end;
        }
    }

    out.push_str(&haystack[last..]);
    out
}

/// Phase two: reduce a pure boolean expression to one literal.
///
/// # Errors
///
/// `EvalError::Syntax` for unbalanced parentheses, empty groups, or
/// operands that are not `true`/`false`.
pub fn reduce(expression: &str) -> Result<bool, EvalError> {
    let mut expr = expression.trim().to_string();

    loop {
        match expr.as_str() {
            "true" => return Ok(true),
            "false" => return Ok(false),
            _ => {}
        }

        let Some(group) = innermost_group(&expr)? else {
            // no parentheses left, the whole text is the last group
            return fold(&expr, &expr);
        };

        let value = fold(group.inner, group.text)? != group.negated;
        trace!(group = group.text, value, "reduced group");
        let next = expr.replace(group.text, literal(value)).trim().to_string();
        expr = next;
    }
}

struct Group<'a> {
    /// Leading `!`s, parentheses and contents.
    text: &'a str,
    inner: &'a str,
    negated: bool,
}

fn innermost_group(expr: &str) -> Result<Option<Group<'_>>, EvalError> {
    let Some(open) = expr.rfind('(') else {
        if expr.contains(')') {
            return Err(syntax("unbalanced ')'", expr));
        }
        return Ok(None);
    };
    let close = expr[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| syntax("unclosed '('", &expr[open..]))?;

    let bangs = expr[..open]
        .chars()
        .rev()
        .take_while(|&c| c == '!')
        .count();
    let start = open - bangs;

    Ok(Some(Group {
        text: &expr[start..=close],
        inner: &expr[open + 1..close],
        negated: bangs % 2 == 1,
    }))
}

#[derive(Clone, Copy)]
enum Logic {
    And,
    Or,
}

/// Fold `a op b op c ...` left to right.
fn fold(inner: &str, group: &str) -> Result<bool, EvalError> {
    let (operands, ops) = split_logic(inner);
    if operands.iter().all(|o| o.trim().is_empty()) {
        return Err(syntax("empty boolean group", group));
    }

    let mut result = parse_literal(operands[0])?;
    match ops.first() {
        Some(Logic::Or) if result => return Ok(true),
        Some(Logic::And) if !result => return Ok(false),
        _ => {}
    }

    for (op, operand) in ops.iter().zip(&operands[1..]) {
        result = match op {
            Logic::Or => result || parse_literal(operand)?,
            Logic::And => result && parse_literal(operand)?,
        };
    }

    Ok(result)
}

fn split_logic(text: &str) -> (Vec<&str>, Vec<Logic>) {
    let mut operands = Vec::new();
    let mut ops = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let bytes = text.as_bytes();

    while i + 1 < bytes.len() {
        let op = match &bytes[i..i + 2] {
            b"&&" => Some(Logic::And),
            b"||" => Some(Logic::Or),
            _ => None,
        };
        if let Some(op) = op {
            operands.push(&text[start..i]);
            ops.push(op);
            i += 2;
            start = i;
        } else {
            i += 1;
        }
    }
    operands.push(&text[start..]);
    (operands, ops)
}

/// `true`, `false`, optionally behind a run of `!`.
fn parse_literal(operand: &str) -> Result<bool, EvalError> {
    let mut text = operand.trim();
    let mut negated = false;
    while let Some(rest) = text.strip_prefix('!') {
        negated = !negated;
        text = rest.trim_start();
    }
    match text {
        "true" => Ok(!negated),
        "false" => Ok(negated),
        _ => Err(syntax("expected 'true' or 'false'", operand.trim())),
    }
}

fn syntax(message: &str, fragment: &str) -> EvalError {
    EvalError::Syntax {
        message: message.to_string(),
        fragment: fragment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn literals() {
        assert!(reduce("true").unwrap());
        assert!(!reduce(" false ").unwrap());
    }

    #[test]
    fn negation_counting() {
        assert!(reduce("!(!(true))").unwrap());
        assert!(!reduce("!!!true").unwrap());
        assert!(reduce("!!(true)").unwrap());
        assert!(!reduce("!(true && true)").unwrap());
    }

    #[test]
    fn left_to_right_fold() {
        // leading `false &&` decides the whole group
        assert!(!reduce("false && true || true").unwrap());
        // (true && false) || true
        assert!(reduce("true && false || true").unwrap());
        assert!(reduce("true || false && false").unwrap());
        assert!(!reduce("false || true && false").unwrap());
    }

    #[test]
    fn leading_short_circuit_skips_the_rest() {
        assert!(reduce("true || not a boolean").unwrap());
        assert!(!reduce("false && garbage").unwrap());
        assert!(reduce("false || garbage").is_err());
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(reduce("()"), Err(EvalError::Syntax { .. })));
        assert!(matches!(reduce("(true"), Err(EvalError::Syntax { .. })));
        assert!(matches!(reduce("true)"), Err(EvalError::Syntax { .. })));
        assert!(matches!(reduce(""), Err(EvalError::Syntax { .. })));
        assert!(matches!(reduce("true &&"), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn repeated_groups_replaced_together() {
        assert!(reduce("(true || false) && (true || false)").unwrap());
        assert!(!reduce("(true) && !(true)").unwrap());
    }

    #[test]
    fn comparisons() {
        let v = vars(&[("age", Value::from(25))]);
        assert!(evaluate(":age >= 21 && :age < 30", &v).unwrap());
        let v = vars(&[("age", Value::from(35))]);
        assert!(!evaluate(":age >= 21 && :age < 30", &v).unwrap());
    }

    #[test]
    fn piped_operands() {
        let v = vars(&[("name", Value::from("john"))]);
        assert!(evaluate(":name|upper == 'JOHN'", &v).unwrap());
        assert!(evaluate(":name | length == 4", &v).unwrap());
        assert!(evaluate("'abc'|upper == 'ABC'", &()).unwrap());
    }

    #[test]
    fn nvl_fallback() {
        assert!(evaluate(":missing|nvl('fallback') == 'fallback'", &()).unwrap());
    }

    #[test]
    fn unknown_pipe() {
        let err = evaluate(":x|frobnicate == 1", &()).unwrap_err();
        assert_eq!(
            err,
            EvalError::PipeNotFound {
                pipe: "frobnicate".to_string(),
                expression: ":x|frobnicate == 1".to_string(),
            }
        );
    }

    #[test]
    fn custom_pipe_shadows_builtin() {
        let evaluator = Evaluator::new().with_pipe("upper", |_: Value, _: &[Value]| {
            Ok::<_, EvalError>(Value::from("shadowed"))
        });
        let v = vars(&[("a", Value::from("x"))]);
        assert!(evaluator.evaluate(":a|upper == 'shadowed'", &v).unwrap());
        assert!(evaluate(":a|upper == 'X'", &v).unwrap());
    }

    #[test]
    fn occurrences_glued_to_operands_are_kept() {
        let out = replace_occurrences("a == 1 && :a == 1", "a == 1", 0, "true");
        assert_eq!(out, "true && :a == 1");
        let out = replace_occurrences("x == 1 || (x == 1)", "x == 1", 0, "false");
        assert_eq!(out, "false || (false)");
    }

    #[test]
    fn pipe_call_parsing() {
        let v = vars(&[("d", Value::from("-"))]);
        let (name, params) = parse_pipe_call("split(:d)", &v);
        assert_eq!(name, "split");
        assert_eq!(params, [Value::from("-")]);
        let (name, params) = parse_pipe_call("upper", &v);
        assert_eq!(name, "upper");
        assert!(params.is_empty());
    }
}
