//! Lexer integration tests: line classification, directive-line tokens,
//! and the two dialects.

use sqlflow_rs::{DialectConfig, Lexer, Token, TokenKind, tokenize, tokenize_with};

fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
    tokens.iter().map(|t| t.kind).collect()
}

fn tok(kind: TokenKind, text: &str) -> Token {
    // position is metadata, so any span compares equal
    Token::new(kind, text, 0, 0)
}

// -----------------------------------------------------------
// Line classification.
// -----------------------------------------------------------

#[test]
fn empty_input_is_only_eof() {
    assert_eq!(tokenize(""), [tok(TokenKind::Eof, "")]);
}

#[test]
fn plain_text_keeps_terminators() {
    let tokens = tokenize("a\r\nb\nc");
    assert_eq!(
        tokens,
        [
            tok(TokenKind::PlainText, "a\r\n"),
            tok(TokenKind::PlainText, "b\n"),
            tok(TokenKind::PlainText, "c"),
            tok(TokenKind::Eof, ""),
        ]
    );
}

#[test]
fn hash_lines_that_are_not_directives_stay_plain() {
    let tokens = tokenize("#include foo\n-- #if in a comment\n#iff :a\n");
    assert!(
        tokens[..3].iter().all(|t| t.kind == TokenKind::PlainText),
        "{tokens:?}"
    );
}

#[test]
fn directive_keywords_are_case_insensitive() {
    let tokens = tokenize("#IF :a == 1\n#Else\n#FI\n");
    assert_eq!(
        kinds(&tokens),
        [
            TokenKind::If,
            TokenKind::NamedParameter,
            TokenKind::Unknown,
            TokenKind::Number,
            TokenKind::Newline,
            TokenKind::Else,
            TokenKind::Newline,
            TokenKind::EndIf,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
    assert_eq!(tokens[0].text, "#IF");
}

#[test]
fn indented_directive() {
    let tokens = tokenize("    #done\n");
    assert_eq!(tokens[0].kind, TokenKind::EndFor);
    assert_eq!(tokens[0].column(), 5);
}

#[test]
fn newline_token_carries_terminator() {
    let tokens = tokenize("#fi\r\n#fi");
    assert_eq!(tokens[1], tok(TokenKind::Newline, "\r\n"));
    assert_eq!(tokens[3], tok(TokenKind::Newline, ""));
    assert_eq!(tokens[4].kind, TokenKind::Eof);
}

// -----------------------------------------------------------
// Directive-line tokens.
// -----------------------------------------------------------

#[test]
fn every_directive_keyword() {
    let input = "#if x\n#else\n#fi\n#switch x\n#case 1\n#default\n#break\n#end\n\
                 #choose\n#when x\n#for a of b\n#done\n";
    let directives: Vec<TokenKind> = tokenize(input)
        .into_iter()
        .filter(|t| t.kind.is_directive())
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        directives,
        [
            TokenKind::If,
            TokenKind::Else,
            TokenKind::EndIf,
            TokenKind::Switch,
            TokenKind::Case,
            TokenKind::Default,
            TokenKind::Break,
            TokenKind::End,
            TokenKind::Choose,
            TokenKind::When,
            TokenKind::For,
            TokenKind::EndFor,
        ]
    );
}

#[test]
fn named_parameter_keeps_colon_and_dots() {
    let tokens = tokenize("#if :user.address.city != blank");
    assert_eq!(tokens[1], tok(TokenKind::NamedParameter, ":user.address.city"));
    assert_eq!(tokens[2], tok(TokenKind::LogicNot, "!"));
    assert_eq!(tokens[4], tok(TokenKind::Identifier, "blank"));
}

#[test]
fn soft_keywords_only_as_whole_words() {
    let tokens = tokenize("#for offset of :opened CLOSE ')'");
    assert_eq!(
        tokens[1..6],
        [
            tok(TokenKind::Identifier, "offset"),
            tok(TokenKind::Of, "of"),
            tok(TokenKind::NamedParameter, ":opened"),
            tok(TokenKind::Close, "CLOSE"),
            tok(TokenKind::String, "')'"),
        ]
    );
}

#[test]
fn numbers_and_unknown_runs() {
    let tokens = tokenize("#case -12.5 7 1e3 >=");
    assert_eq!(
        tokens[1..5],
        [
            tok(TokenKind::Number, "-12.5"),
            tok(TokenKind::Number, "7"),
            tok(TokenKind::Unknown, "1e3"),
            tok(TokenKind::Unknown, ">="),
        ]
    );
}

#[test]
fn double_quoted_string() {
    let tokens = tokenize("#case \"it's\"");
    assert_eq!(tokens[1], tok(TokenKind::String, "\"it's\""));
}

#[test]
fn columns_count_chars_not_bytes() {
    let tokens = tokenize("#if 'é' == :x");
    assert_eq!(tokens[1].column(), 5);
    assert_eq!(tokens[2].column(), 9);
    assert_eq!(tokens[3].column(), 12);
}

// -----------------------------------------------------------
// Dialects.
// -----------------------------------------------------------

#[test]
fn revised_splits_punctuation() {
    let tokens = tokenize("#if !:a&&:b||:c");
    assert_eq!(
        kinds(&tokens)[1..9],
        [
            TokenKind::LogicNot,
            TokenKind::NamedParameter,
            TokenKind::LogicAnd,
            TokenKind::LogicAnd,
            TokenKind::NamedParameter,
            TokenKind::LogicOr,
            TokenKind::LogicOr,
            TokenKind::NamedParameter,
        ]
    );
}

#[test]
fn legacy_words_absorb_punctuation() {
    let tokens = tokenize_with("#for a,b of :xs", DialectConfig::legacy());
    assert_eq!(tokens[1], tok(TokenKind::Identifier, "a,b"));
    assert_eq!(tokens[2].kind, TokenKind::Of);
    assert!(!tokens.iter().any(|t| t.kind == TokenKind::Comma));
}

#[test]
fn quote_retention_per_dialect() {
    let revised = tokenize_with("#case 'x'", DialectConfig::revised());
    let legacy = tokenize_with("#case 'x'", DialectConfig::legacy());
    assert_eq!(revised[1], tok(TokenKind::String, "'x'"));
    assert_eq!(legacy[1], tok(TokenKind::String, "x"));
}

#[test]
fn default_dialect_is_revised() {
    assert_eq!(DialectConfig::default(), DialectConfig::revised());
    assert_eq!(Lexer::default().dialect(), DialectConfig::revised());
}

#[test]
fn lexer_never_fails_on_garbage() {
    let tokens = tokenize("#if 'open ~~ \u{0} ::\n#bogus\n");
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Unknown));
}
