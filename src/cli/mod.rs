//! CLI support for sqljson-path
//!
//! Provides programmatic access to the `sqljp` commands and the bridge
//! between `serde_json` documents and path [`Value`](crate::Value)s.

mod convert;
mod query;
mod tokens;

pub use convert::{json_to_value, parse_document, value_to_json};
pub use query::{QueryOptions, QueryResult, execute_query};
pub use tokens::describe_tokens;

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] crate::SyntaxError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid number: {0}")]
    Number(#[from] bigdecimal::ParseBigDecimalError),

    /// `--var` not in `NAME=JSON` form
    #[error("Invalid variable binding {0:?}; expected NAME=JSON")]
    InvalidVariable(String),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
