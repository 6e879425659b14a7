//! CLI tool to inspect, validate, format and evaluate SQL templates.

use std::fs;
use std::process::ExitCode;

use sqlflow_rs::{Block, DialectConfig, Lexer, Value, parse_blocks_with};
use tracing_subscriber::EnvFilter;

fn usage() -> ExitCode {
    eprintln!("Usage: sqlflow [--legacy] <command> [args...]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  tokens    Print the token stream of a template");
    eprintln!("  validate  Check if template(s) are well formed");
    eprintln!("  fmt       Format template(s) and print to stdout");
    eprintln!("  eval      Evaluate a condition against JSON variables");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  sqlflow tokens query.sql");
    eprintln!("  sqlflow validate query.sql other.sql");
    eprintln!("  sqlflow fmt query.sql");
    eprintln!("  sqlflow eval \":age >= 18\" '{{\"age\": 21}}'");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let dialect = if let Some(i) = args.iter().position(|a| a == "--legacy") {
        args.remove(i);
        DialectConfig::legacy()
    } else {
        DialectConfig::revised()
    };

    let Some(command) = args.first().map(String::as_str) else {
        return usage();
    };
    if command == "--help" || command == "-h" {
        return usage();
    }
    let rest = &args[1..];

    match command {
        "tokens" => match rest {
            [path] => tokens(path, dialect),
            _ => {
                eprintln!("Error: tokens takes exactly one file");
                ExitCode::from(2)
            }
        },
        "validate" | "fmt" => {
            if rest.is_empty() {
                eprintln!("Error: no files specified");
                return ExitCode::from(2);
            }
            files(command, rest, dialect)
        }
        "eval" => match rest {
            [condition] => eval(condition, None),
            [condition, json] => eval(condition, Some(json.as_str())),
            _ => {
                eprintln!("Error: eval takes a condition and optional JSON variables");
                ExitCode::from(2)
            }
        },
        _ => {
            eprintln!("Unknown command: {command}");
            ExitCode::from(2)
        }
    }
}

fn tokens(path: &str, dialect: DialectConfig) -> ExitCode {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    for token in Lexer::new(dialect).tokenize(&content) {
        println!(
            "{}:{}\t{:?}\t{:?}",
            token.line(),
            token.column(),
            token.kind,
            token.text
        );
    }
    ExitCode::SUCCESS
}

fn files(command: &str, paths: &[String], dialect: DialectConfig) -> ExitCode {
    let mut had_error = false;

    for path in paths {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
                continue;
            }
        };

        match parse_blocks_with(&content, dialect) {
            Ok(blocks) if command == "validate" => {
                let directives = blocks
                    .iter()
                    .filter(|b| !matches!(b, Block::PlainText(_)))
                    .count();
                eprintln!("{path}: valid ({directives} top-level block(s))");
            }
            Ok(blocks) => print!("{}", sqlflow_rs::format(&blocks)),
            Err(e) => {
                eprintln!("{path}: {e}");
                had_error = true;
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn eval(condition: &str, json: Option<&str>) -> ExitCode {
    let vars = match json.map(serde_json::from_str::<serde_json::Value>) {
        None => serde_json::Map::new(),
        Some(Ok(serde_json::Value::Object(map))) => map,
        Some(Ok(other)) => {
            eprintln!(
                "Error: variables must be a JSON object, got {}",
                Value::from(other).type_name()
            );
            return ExitCode::from(2);
        }
        Some(Err(e)) => {
            eprintln!("Error: invalid JSON variables: {e}");
            return ExitCode::from(2);
        }
    };

    match sqlflow_rs::evaluate(condition, &vars) {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{condition}: {e}");
            ExitCode::FAILURE
        }
    }
}
