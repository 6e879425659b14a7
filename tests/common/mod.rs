#![allow(dead_code)]

use std::collections::HashMap;

use sqlflow_rs::{Block, Value, format, parse_blocks, plain_text};

/// Parse then format must give back the input byte for byte.
pub fn roundtrip(input: &str) {
    let blocks = parse_blocks(input).expect("parse failed");
    let output = format(&blocks);
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
}

/// Format a block tree, parse it back, assert structural equality.
pub fn assert_tree_roundtrip(original: &[Block]) {
    let formatted = format(original);
    let parsed = parse_blocks(&formatted).unwrap_or_else(|e| {
        panic!(
            "failed to re-parse formatted output: {e}\n\
             --- formatted ---\n{formatted}"
        )
    });

    assert_eq!(
        plain_text(original),
        plain_text(&parsed),
        "plain text mismatch\n--- formatted ---\n{formatted}"
    );
    assert_eq!(
        original, parsed,
        "tree mismatch\n--- formatted ---\n{formatted}"
    );
}

/// Variables from `(name, value)` pairs.
pub fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
