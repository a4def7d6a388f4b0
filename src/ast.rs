//! # SQL/JSON Path - Abstract Syntax Tree
//!
//! This module defines the tree a path compiles to. Compilation happens once;
//! the resulting tree is immutable and is evaluated any number of times, from
//! any number of threads.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (primaries, accessors, arithmetic, methods)
//! - **[predicates]** - Predicate nodes used inside filters
//! - **[operators]** - Arithmetic, comparison and logical operators
//!
//! ## Two Tree Shapes
//!
//! An [`Expr`] evaluates to an ordered sequence of items. A [`Predicate`]
//! evaluates to one of true, false or unknown and only appears inside a filter:
//!
//! ```text
//! $.orders[*] ? (@.total > 100 && @.status starts with "ship")
//! \_________/     \_______________________________________/
//!  expression                     predicate
//! ```
//!
//! ## Modes
//!
//! A path may begin with `strict` or `lax` (the default). The mode is not part
//! of the tree; it is carried next to it and decides, at evaluation time,
//! whether structural mismatches are errors or are silently tolerated.
//!
//! ```text
//! lax $.a.b        -- arrays along the way are unwrapped, missing keys skipped
//! strict $.a.b     -- the same situations raise an error
//! ```
//!
//! ## Precedence
//!
//! From loosest to tightest:
//!
//! ```text
//! + -                 additive
//! * / %               multiplicative
//! + - (prefix)        unary
//! . [] ?()            accessor chain
//! literals $ @ last   primary
//! ```
//!
//! Inside a predicate, `||` binds looser than `&&`, which binds looser than `!`.

pub mod expressions;
pub mod operators;
pub mod predicates;
pub mod tokens;

pub use expressions::*;
pub use operators::*;
pub use predicates::*;
pub use tokens::*;
