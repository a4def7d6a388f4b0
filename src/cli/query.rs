//! Run SQL/JSON paths against JSON input

use std::collections::HashMap;

use super::{CliError, parse_document};
use crate::{CompiledPath, IsoDatetimeCast, Value};

/// Options for the query command
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// The path to run
    pub path: String,
    /// JSON input string
    pub input: Option<String>,
    /// `NAME=JSON` bindings for `$NAME`
    pub variables: Vec<String>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Report whether anything matched instead of the matches
    pub exists: bool,
}

/// Result of a query operation
#[derive(Debug)]
pub enum QueryResult {
    /// Syntax validation passed
    SyntaxValid,
    /// The result sequence
    Items(Vec<Value>),
    Exists(bool),
}

/// Execute a query operation
pub fn execute_query(options: &QueryOptions) -> Result<QueryResult, CliError> {
    let path = CompiledPath::compile(&options.path)?;
    if options.syntax_only {
        return Ok(QueryResult::SyntaxValid);
    }

    let variables = parse_variables(&options.variables)?;
    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let document = parse_document(json_str)?;

    let provider = IsoDatetimeCast::default();
    if options.exists {
        let found = path.exists(&provider, &document, &variables)?;
        return Ok(QueryResult::Exists(found));
    }
    Ok(QueryResult::Items(path.execute(&provider, &document, &variables)?))
}

fn parse_variables(bindings: &[String]) -> Result<HashMap<String, Value>, CliError> {
    let mut variables = HashMap::new();
    for binding in bindings {
        let (name, json) = binding
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| CliError::InvalidVariable(binding.clone()))?;
        variables.insert(name.to_string(), parse_document(json)?);
    }
    Ok(variables)
}
