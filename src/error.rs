//! Error types shared by the compiler front end and the path entry points.
//!
//! Compilation failures are always a [`SyntaxError`] pointing at a character
//! offset in the path source. Evaluation failures are an
//! [`EvalError`](crate::EvalError) and carry no offset, since they belong to a
//! node of the compiled tree rather than to the source text.

use thiserror::Error;

use crate::evaluator::EvalError;

/// A malformed path. Compilation stops at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{}syntax error in SQL/JSON path {:?} at offset {}",
    category_prefix(.category),
    .path,
    .offset
)]
pub struct SyntaxError {
    /// The full path source being compiled
    pub path: String,
    /// Character offset of the offending token
    pub offset: usize,
    /// Literal category for malformed numbers ("Hex number", "Numeric", ...)
    pub category: Option<&'static str>,
}

impl SyntaxError {
    pub fn new(path: &str, offset: usize) -> Self {
        SyntaxError {
            path: path.to_string(),
            offset,
            category: None,
        }
    }

    pub fn with_category(path: &str, offset: usize, category: &'static str) -> Self {
        SyntaxError {
            path: path.to_string(),
            offset,
            category: Some(category),
        }
    }
}

fn category_prefix(category: &Option<&'static str>) -> String {
    match category {
        Some(name) => format!("{name}: "),
        None => String::new(),
    }
}

/// Either half of compile-then-execute.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
