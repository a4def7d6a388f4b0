use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::ast::{ComparisonOp, Expr, LogicalOp, UnaryPredicateOp};

/// Predicate node, evaluated to true, false or unknown.
///
/// Predicates only occur inside a filter, `?( ... )`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Comparison between two expressions
    ///
    /// # Example
    /// ```text
    /// @.price >= $min
    /// ```
    Comparison {
        op: ComparisonOp,
        left: Expr,
        right: Expr,
    },

    /// `exists( expr )`
    Exists(Expr),

    /// `expr starts with "prefix"` or `expr starts with $var`
    StartsWith {
        subject: Expr,
        prefix: StartsWithPrefix,
    },

    /// `expr like_regex "pattern" [flag "flags"]`
    LikeRegex {
        subject: Expr,
        pattern: RegexPattern,
    },

    /// Negation or `is unknown`
    Unary {
        op: UnaryPredicateOp,
        operand: Box<Predicate>,
    },

    /// `&&` or `||`
    Binary {
        op: LogicalOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
}

/// Right-hand side of `starts with`.
#[derive(Debug, Clone, PartialEq)]
pub enum StartsWithPrefix {
    Literal(String),
    /// Named parameter, resolved per evaluation
    Variable(String),
}

/// Which half of a `like_regex` clause failed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexFault {
    Pattern,
    Flags,
}

/// A `like_regex` pattern compiled once at parse time.
#[derive(Clone)]
pub struct RegexPattern {
    pattern: String,
    flags: Option<String>,
    regex: Regex,
}

impl RegexPattern {
    /// Compiles `pattern` with the XQuery-style flags `s m i x q`.
    pub fn new(pattern: &str, flags: Option<&str>) -> Result<Self, RegexFault> {
        let (mut dot_all, mut multi_line, mut ignore_case, mut extended, mut literal) =
            (false, false, false, false, false);
        for flag in flags.unwrap_or_default().chars() {
            match flag {
                's' => dot_all = true,
                'm' => multi_line = true,
                'i' => ignore_case = true,
                'x' => extended = true,
                'q' => literal = true,
                _ => return Err(RegexFault::Flags),
            }
        }

        let source = if literal {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };
        let regex = RegexBuilder::new(&source)
            .dot_matches_new_line(dot_all)
            .multi_line(multi_line)
            .case_insensitive(ignore_case)
            .ignore_whitespace(extended && !literal)
            .build()
            .map_err(|_| RegexFault::Pattern)?;

        Ok(RegexPattern {
            pattern: pattern.to_string(),
            flags: flags.map(str::to_string),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> Option<&str> {
        self.flags.as_deref()
    }

    /// True when the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.flags == other.flags
    }
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexPattern")
            .field("pattern", &self.pattern)
            .field("flags", &self.flags)
            .finish()
    }
}
