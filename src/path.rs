use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;

use crate::{
    ast::Expr,
    cache::PathCache,
    datetime::{DatetimeCast, IsoDatetimeCast},
    error::{Error, SyntaxError},
    evaluator::{EvalError, Evaluator, Parameters},
    parser::Parser,
    value::Value,
};

static PATHS: Lazy<PathCache> = Lazy::new(PathCache::default);
static MEMBER_ACCESSORS: Lazy<PathCache> = Lazy::new(PathCache::default);

/// A parsed SQL/JSON path, ready to run against any number of documents.
///
/// # Examples
///
/// ```
/// use sqljson_path::{CompiledPath, Value};
///
/// let path = CompiledPath::compile("$.price * 2").unwrap();
/// let document = Value::Object(vec![("price".to_string(), Value::from(21))]);
/// assert_eq!(path.query(&document).unwrap(), vec![Value::from(42)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    expr: Expr,
    strict: bool,
}

impl CompiledPath {
    pub fn compile(path: &str) -> Result<Self, SyntaxError> {
        let (expr, strict) = Parser::parse(path)?;
        debug!("compiled path {path:?} (strict: {strict})");
        Ok(CompiledPath { expr, strict })
    }

    /// `$."name"` built directly, without tokenizing.
    pub fn member_accessor(name: &str) -> Self {
        CompiledPath {
            expr: Expr::root_member(name),
            strict: false,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn expression(&self) -> &Expr {
        &self.expr
    }

    /// Runs the path against `document` with `$name` bound from `variables`.
    pub fn execute(
        &self,
        provider: &dyn DatetimeCast,
        document: &Value,
        variables: &HashMap<String, Value>,
    ) -> Result<Vec<Value>, EvalError> {
        let evaluator = Evaluator::new(Parameters {
            strict: self.strict,
            context: document,
            variables,
            datetime: provider,
        });
        evaluator.run(&self.expr)
    }

    /// Runs the path with no variables and the ISO datetime cast.
    pub fn query(&self, document: &Value) -> Result<Vec<Value>, EvalError> {
        self.execute(&IsoDatetimeCast::default(), document, &HashMap::new())
    }

    /// True when the path selects at least one item.
    pub fn exists(
        &self,
        provider: &dyn DatetimeCast,
        document: &Value,
        variables: &HashMap<String, Value>,
    ) -> Result<bool, EvalError> {
        Ok(!self.execute(provider, document, variables)?.is_empty())
    }
}

/// Compiles `path`, reusing an earlier compilation when one is cached.
pub fn get(path: &str) -> Result<Arc<CompiledPath>, SyntaxError> {
    PATHS.get_or_insert_with(path, || CompiledPath::compile(path))
}

/// The cached fast path for `$."name"`.
pub fn get_member_accessor(name: &str) -> Arc<CompiledPath> {
    let compiled: Result<_, std::convert::Infallible> =
        MEMBER_ACCESSORS.get_or_insert_with(name, || Ok(CompiledPath::member_accessor(name)));
    match compiled {
        Ok(path) => path,
        Err(never) => match never {},
    }
}

/// Compiles (through the cache) and runs `path` in one step.
pub fn evaluate(
    path: &str,
    document: &Value,
    variables: &HashMap<String, Value>,
) -> Result<Vec<Value>, Error> {
    Ok(get(path)?.execute(&IsoDatetimeCast::default(), document, variables)?)
}

/// The process-wide cache behind [`get`].
pub fn path_cache() -> &'static PathCache {
    &PATHS
}
