pub mod ast;
pub mod cache;
pub mod cli;
pub mod datetime;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod path;
pub mod value;

pub use ast::{Expr, Predicate, Token, TokenKind};
pub use cache::{CacheConfig, CacheStats, PathCache};
pub use datetime::{Datetime, DatetimeCast, DatetimeTemplate, IsoDatetimeCast};
pub use error::{Error, SyntaxError};
pub use evaluator::{EvalContext, EvalError, Evaluator, Parameters, Truth};
pub use lexer::Lexer;
pub use output::{to_json, to_json_pretty};
pub use parser::Parser;
pub use path::{CompiledPath, evaluate, get, get_member_accessor, path_cache};
pub use value::Value;
