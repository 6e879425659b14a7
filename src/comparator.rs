//! Type-aware comparison of two condition operands.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::expression::EvalError;
use crate::value::Value;

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// `~`: left operand's string form matches the right as a regex.
    Matches,
    /// `!~`
    NotMatches,
    /// `@`: left operand is a member of the right.
    In,
    /// `!@`
    NotIn,
}

impl Operator {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Matches => "~",
            Self::NotMatches => "!~",
            Self::In => "@",
            Self::NotIn => "!@",
        }
    }
}

impl FromStr for Operator {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "~" => Self::Matches,
            "!~" => Self::NotMatches,
            "@" => Self::In,
            "!@" => Self::NotIn,
            _ => {
                return Err(EvalError::Syntax {
                    message: "unknown comparison operator".to_string(),
                    fragment: s.to_string(),
                });
            }
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The bare literal that matches null and empty strings under `==`/`!=`.
pub const BLANK: &str = "blank";

/// Compare `a` against `b`.
///
/// # Errors
///
/// `EvalError::Argument` when an ordering operator sees a side that
/// is not numeric, when `@` gets a right side that is not a list, map
/// or string, or when `~` gets an invalid pattern.
pub fn compare(a: &Value, op: Operator, b: &Value) -> Result<bool, EvalError> {
    match op {
        Operator::Eq => Ok(equals(a, b)),
        Operator::Ne => Ok(!equals(a, b)),
        Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => order(a, op, b),
        Operator::Matches => matches(a, b),
        Operator::NotMatches => matches(a, b).map(|m| !m),
        Operator::In => contains(b, a),
        Operator::NotIn => contains(b, a).map(|m| !m),
    }
}

/// `blank` on either side matches null and whitespace-only strings.
fn equals(a: &Value, b: &Value) -> bool {
    let is_blank_word = |v: &Value| matches!(v, Value::String(s) if s == BLANK);
    if (is_blank_word(b) && a.is_blank()) || (is_blank_word(a) && b.is_blank()) {
        return true;
    }
    loose_eq(a, b)
}

/// Equality with numeric widening and string-form fallback.
#[allow(clippy::float_cmp)]
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::List(_), Value::List(_)) | (Value::Map(_), Value::Map(_)) => a == b,
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x == y,
            _ => a.to_string() == b.to_string(),
        },
    }
}

fn order(a: &Value, op: Operator, b: &Value) -> Result<bool, EvalError> {
    let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
        return Err(EvalError::Argument {
            message: format!(
                "cannot order {} '{a}' against {} '{b}' with '{op}'",
                a.type_name(),
                b.type_name()
            ),
        });
    };
    Ok(match op {
        Operator::Gt => x > y,
        Operator::Lt => x < y,
        Operator::Ge => x >= y,
        _ => x <= y,
    })
}

fn matches(a: &Value, b: &Value) -> Result<bool, EvalError> {
    if a.is_null() {
        return Ok(false);
    }
    let pattern = b.to_string();
    let re = Regex::new(&pattern).map_err(|e| EvalError::Argument {
        message: format!("invalid pattern '{pattern}': {e}"),
    })?;
    Ok(re.is_match(&a.to_string()))
}

fn contains(collection: &Value, item: &Value) -> Result<bool, EvalError> {
    match collection {
        Value::List(items) => Ok(items.iter().any(|v| loose_eq(item, v))),
        Value::Map(map) => Ok(map.contains_key(&item.to_string())),
        Value::String(s) => Ok(!item.is_null() && s.contains(&item.to_string())),
        Value::Null => Ok(false),
        other => Err(EvalError::Argument {
            message: format!("'@' needs a list, map or string, got {}", other.type_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn numeric_equality_across_types() {
        assert!(compare(&s("5"), Operator::Eq, &Value::Number(5.0)).unwrap());
        assert!(compare(&Value::Number(5.0), Operator::Ne, &Value::Number(6.0)).unwrap());
    }

    #[test]
    fn string_form_fallback() {
        assert!(compare(&Value::Bool(true), Operator::Eq, &s("true")).unwrap());
        assert!(!compare(&Value::Null, Operator::Eq, &s("null")).unwrap());
    }

    #[test]
    fn blank_matches_null_and_empty() {
        let blank = s(BLANK);
        assert!(compare(&Value::Null, Operator::Eq, &blank).unwrap());
        assert!(compare(&s(""), Operator::Eq, &blank).unwrap());
        assert!(compare(&s("  "), Operator::Eq, &blank).unwrap());
        assert!(compare(&s("x"), Operator::Ne, &blank).unwrap());
    }

    #[test]
    fn blank_on_the_left() {
        let blank = s(BLANK);
        assert!(compare(&blank, Operator::Eq, &s("")).unwrap());
        assert!(compare(&blank, Operator::Eq, &Value::Null).unwrap());
        assert!(compare(&blank, Operator::Ne, &s("x")).unwrap());
    }

    #[test]
    fn numbers_compare_exactly() {
        let tiny = Value::Number(1e-17);
        assert!(!compare(&tiny, Operator::Eq, &Value::Number(0.0)).unwrap());
        assert!(compare(&tiny, Operator::Ne, &s("0")).unwrap());
        assert!(compare(&Value::Number(0.0), Operator::Eq, &Value::Number(-0.0)).unwrap());
    }

    #[test]
    fn ordering_requires_numbers() {
        assert!(compare(&Value::Number(3.0), Operator::Ge, &Value::Number(3.0)).unwrap());
        assert!(compare(&s("10"), Operator::Gt, &Value::Number(9.0)).unwrap());
        let err = compare(&s("abc"), Operator::Lt, &Value::Number(1.0)).unwrap_err();
        assert!(matches!(err, EvalError::Argument { .. }));
        assert!(compare(&Value::Null, Operator::Gt, &Value::Number(1.0)).is_err());
    }

    #[test]
    fn regex_match() {
        assert!(compare(&s("hello world"), Operator::Matches, &s("wor")).unwrap());
        assert!(compare(&s("abc123"), Operator::Matches, &s("^[a-z]+\\d+$")).unwrap());
        assert!(!compare(&s("ABC"), Operator::Matches, &s("abc")).unwrap());
        assert!(compare(&s("ABC"), Operator::NotMatches, &s("abc")).unwrap());
        assert!(compare(&s("x"), Operator::Matches, &s("(")).is_err());
    }

    #[test]
    fn membership() {
        let list = Value::from(vec![1, 2, 3]);
        assert!(compare(&Value::Number(2.0), Operator::In, &list).unwrap());
        assert!(compare(&s("2"), Operator::In, &list).unwrap());
        assert!(compare(&Value::Number(7.0), Operator::NotIn, &list).unwrap());
        assert!(compare(&s("ell"), Operator::In, &s("hello")).unwrap());
        assert!(compare(&s("x"), Operator::In, &Value::Bool(true)).is_err());
    }

    #[test]
    fn operator_parsing() {
        assert_eq!("!@".parse::<Operator>().unwrap(), Operator::NotIn);
        assert!("=>".parse::<Operator>().is_err());
    }
}
