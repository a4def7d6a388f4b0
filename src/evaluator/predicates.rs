use std::cmp::Ordering;

use log::trace;

use crate::{
    ast::{ComparisonOp, LogicalOp, Predicate, StartsWithPrefix, UnaryPredicateOp},
    evaluator::{EvalContext, EvalError, Evaluator},
    value::Value,
};

/// Result of testing a predicate: Kleene three-valued logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }
}

impl Evaluator<'_> {
    /// Tests a predicate. Every predicate node is tested through here.
    ///
    /// Evaluation errors inside the predicate become [`Truth::Unknown`];
    /// only structural errors propagate.
    pub fn test(&self, predicate: &Predicate, ctx: EvalContext<'_>) -> Result<Truth, EvalError> {
        match self.test_predicate(predicate, ctx) {
            Err(err) if !err.is_structural() => {
                trace!("predicate is unknown: {err}");
                Ok(Truth::Unknown)
            }
            result => result,
        }
    }

    fn test_predicate(&self, predicate: &Predicate, ctx: EvalContext<'_>) -> Result<Truth, EvalError> {
        match predicate {
            Predicate::Comparison { op, left, right } => {
                let left = self.unwrap_arrays(self.evaluate(left, ctx)?);
                let right = self.unwrap_arrays(self.evaluate(right, ctx)?);
                let mut result = Truth::False;
                for l in &left {
                    for r in &right {
                        match self.compare(*op, l, r) {
                            Truth::True => return Ok(Truth::True),
                            Truth::Unknown => result = Truth::Unknown,
                            Truth::False => {}
                        }
                    }
                }
                Ok(result)
            }
            Predicate::Exists(expr) => Ok(Truth::from(!self.evaluate(expr, ctx)?.is_empty())),
            Predicate::StartsWith { subject, prefix } => {
                let prefix = match prefix {
                    StartsWithPrefix::Literal(s) => s.as_str(),
                    StartsWithPrefix::Variable(name) => match self.params.variables.get(name) {
                        Some(Value::String(s)) => s.as_str(),
                        Some(_) => return Err(EvalError::StartsWithPrefixNotString),
                        None => return Err(EvalError::UnknownVariable(name.clone())),
                    },
                };
                let candidates = self.unwrap_arrays(self.evaluate(subject, ctx)?);
                Ok(self.aggregate(&candidates, |s| s.starts_with(prefix)))
            }
            Predicate::LikeRegex { subject, pattern } => {
                let candidates = self.unwrap_arrays(self.evaluate(subject, ctx)?);
                Ok(self.aggregate(&candidates, |s| pattern.is_match(s)))
            }
            Predicate::Unary { op, operand } => {
                let truth = self.test(operand, ctx)?;
                Ok(match op {
                    UnaryPredicateOp::Not => truth.not(),
                    UnaryPredicateOp::IsUnknown => Truth::from(truth == Truth::Unknown),
                })
            }
            Predicate::Binary { op, left, right } => {
                let left = self.test(left, ctx)?;
                match (op, left) {
                    (LogicalOp::And, Truth::False) => Ok(Truth::False),
                    (LogicalOp::Or, Truth::True) => Ok(Truth::True),
                    (LogicalOp::And, _) => Ok(left.and(self.test(right, ctx)?)),
                    (LogicalOp::Or, _) => Ok(left.or(self.test(right, ctx)?)),
                }
            }
        }
    }

    /// Folds a string test over candidates.
    ///
    /// Strict mode needs every candidate to pass and stops at the first
    /// unknown; lax mode stops at the first pass. Non-strings are unknown.
    fn aggregate(&self, candidates: &[Value], matches: impl Fn(&str) -> bool) -> Truth {
        let strict = self.params.strict;
        let mut all = !candidates.is_empty();
        let mut unknown = false;

        for candidate in candidates {
            let truth = candidate.as_str().map_or(Truth::Unknown, |s| Truth::from(matches(s)));
            match truth {
                Truth::True if !strict => return Truth::True,
                Truth::True => {}
                Truth::Unknown if strict => return Truth::Unknown,
                Truth::Unknown => unknown = true,
                Truth::False => all = false,
            }
        }

        if strict {
            Truth::from(all)
        } else if unknown {
            Truth::Unknown
        } else {
            Truth::False
        }
    }

    /// Compares one left item with one right item.
    fn compare(&self, op: ComparisonOp, left: &Value, right: &Value) -> Truth {
        let ordering = match (left, right) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => {
                return Truth::from(op == ComparisonOp::NotEqual);
            }
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Datetime(a), Value::Datetime(b)) => a.compare(b),
            (Value::Datetime(a), Value::String(s)) => self
                .params
                .datetime
                .cast(s, None)
                .ok()
                .and_then(|b| a.compare(&b)),
            (Value::String(s), Value::Datetime(b)) => self
                .params
                .datetime
                .cast(s, None)
                .ok()
                .and_then(|a| a.compare(b)),
            _ => None,
        };

        let Some(ordering) = ordering else {
            return Truth::Unknown;
        };
        Truth::from(match op {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        })
    }
}
