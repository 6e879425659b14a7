//! Front end for conditional SQL templates.
//!
//! Templates are plain text with directive lines that decide which
//! text is kept:
//!
//! ```text
//! select * from users where 1 = 1
//! #if :name != blank
//!   and name = :name
//! #fi
//! #for id of :ids delimiter ', ' open 'and id in (' close ')'
//!   :id
//! #done
//! ```
//!
//! This crate tokenizes such text, builds the directive block tree,
//! and evaluates the boolean conditions of `#if`/`#when` against a set
//! of variables.
//!
//! # Quick start
//!
//! ## Parse a template
//!
//! ```
//! use sqlflow_rs::{Block, format, parse_blocks};
//!
//! let input = "select *\n#if :id >= 0\nwhere id = :id\n#fi\n";
//! let blocks = parse_blocks(input).unwrap();
//! assert!(matches!(blocks[1], Block::If(_)));
//! assert_eq!(format(&blocks), input);
//! ```
//!
//! ## Evaluate a condition
//!
//! ```
//! use std::collections::HashMap;
//! use sqlflow_rs::{Value, evaluate};
//!
//! let vars = HashMap::from([("name".to_string(), Value::from("john"))]);
//! assert!(evaluate(":name|upper == 'JOHN' && :name|length < 5", &vars).unwrap());
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod builder;
pub mod comparator;
pub mod expression;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod pipe;
pub mod token;
pub mod value;

pub use ast::{Block, Case, ChooseBlock, ForBlock, IfBlock, SwitchBlock, When};
pub use comparator::{Operator, compare};
pub use expression::{EvalError, Evaluator, evaluate, reduce};
pub use formatter::{format, plain_text};
pub use lexer::{DialectConfig, Lexer, tokenize, tokenize_with};
pub use parser::{
    StructuralError, StructuralErrorKind, parse_blocks, parse_blocks_with, parse_tokens,
};
pub use pipe::{Pipe, PipeRef, PipeRegistry, list_builtin_pipes};
pub use token::{Span, Token, TokenKind};
pub use value::{Value, Variables, coerce};

/// Unified error type covering parsing and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Unbalanced or misplaced directives.
    #[error("{0}")]
    Structural(#[from] StructuralError),
    /// A condition that could not be decided.
    #[error("{0}")]
    Eval(#[from] EvalError),
}

/// Parse template text in one step, with the unified error type.
pub fn parse_str(input: &str) -> Result<Vec<Block>, Error> {
    Ok(parse_blocks(input)?)
}
