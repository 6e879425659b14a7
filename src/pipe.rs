//! Named value transforms applied to condition operands (`:name|upper`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::expression::EvalError;
use crate::value::Value;

/// A named, chainable value transform.
pub trait Pipe: Send + Sync {
    /// Transform `value`; `params` are the pipe's call arguments.
    ///
    /// # Errors
    ///
    /// `EvalError::Argument` when the parameters do not fit the pipe.
    fn transform(&self, value: Value, params: &[Value]) -> Result<Value, EvalError>;
}

impl<F> Pipe for F
where
    F: Fn(Value, &[Value]) -> Result<Value, EvalError> + Send + Sync,
{
    fn transform(&self, value: Value, params: &[Value]) -> Result<Value, EvalError> {
        self(value, params)
    }
}

/// Shared handle to a registered pipe.
pub type PipeRef = Arc<dyn Pipe>;

/// Name-to-pipe table.
pub type PipeRegistry = BTreeMap<String, PipeRef>;

static BUILTINS: LazyLock<PipeRegistry> = LazyLock::new(|| {
    PipeRegistry::from([
        entry("length", length),
        entry("upper", upper),
        entry("lower", lower),
        entry("kv", kv),
        entry("type", type_name),
        entry("split", split),
        entry("nvl", nvl),
    ])
});

fn entry(name: &str, pipe: impl Pipe + 'static) -> (String, PipeRef) {
    (name.to_string(), Arc::new(pipe))
}

/// The process-wide built-in pipes, read-only.
#[must_use]
pub fn list_builtin_pipes() -> &'static PipeRegistry {
    &BUILTINS
}

/// Look up a built-in pipe by name.
#[must_use]
pub fn builtin(name: &str) -> Option<&'static PipeRef> {
    BUILTINS.get(name)
}

/// Debug wrapper listing registry keys.
pub(crate) struct Names<'a>(pub &'a PipeRegistry);

impl fmt::Debug for Names<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

fn expect_params(pipe: &str, params: &[Value], count: usize) -> Result<(), EvalError> {
    if params.len() == count {
        Ok(())
    } else {
        Err(EvalError::Argument {
            message: format!(
                "pipe '{pipe}' takes {count} parameter(s), got {}",
                params.len()
            ),
        })
    }
}

#[allow(clippy::unnecessary_wraps, clippy::cast_precision_loss)]
fn length(value: Value, _params: &[Value]) -> Result<Value, EvalError> {
    let len = match &value {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        other => other.to_string().chars().count(),
    };
    Ok(Value::Number(len as f64))
}

#[allow(clippy::unnecessary_wraps)]
fn upper(value: Value, _params: &[Value]) -> Result<Value, EvalError> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.to_uppercase()),
        other => Value::String(other.to_string().to_uppercase()),
    })
}

#[allow(clippy::unnecessary_wraps)]
fn lower(value: Value, _params: &[Value]) -> Result<Value, EvalError> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.to_lowercase()),
        other => Value::String(other.to_string().to_lowercase()),
    })
}

/// Map entries as `[{key, value}, ...]` in key order.
#[allow(clippy::unnecessary_wraps)]
fn kv(value: Value, _params: &[Value]) -> Result<Value, EvalError> {
    let Value::Map(map) = value else {
        return Ok(Value::List(Vec::new()));
    };
    Ok(Value::List(
        map.into_iter()
            .map(|(k, v)| {
                Value::Map(BTreeMap::from([
                    ("key".to_string(), Value::String(k)),
                    ("value".to_string(), v),
                ]))
            })
            .collect(),
    ))
}

#[allow(clippy::unnecessary_wraps)]
fn type_name(value: Value, _params: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::from(value.type_name()))
}

fn split(value: Value, params: &[Value]) -> Result<Value, EvalError> {
    expect_params("split", params, 1)?;
    let delimiter = params[0].to_string();
    if delimiter.is_empty() {
        return Err(EvalError::Argument {
            message: "pipe 'split' needs a non-empty delimiter".to_string(),
        });
    }
    Ok(match value {
        Value::Null => Value::List(Vec::new()),
        other => Value::List(
            other
                .to_string()
                .split(delimiter.as_str())
                .map(Value::from)
                .collect(),
        ),
    })
}

fn nvl(value: Value, params: &[Value]) -> Result<Value, EvalError> {
    expect_params("nvl", params, 1)?;
    Ok(if value.is_null() {
        params[0].clone()
    } else {
        value
    })
}
