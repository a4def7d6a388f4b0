use std::{cell::Cell, collections::HashMap};

use bigdecimal::{BigDecimal, Signed, ToPrimitive, Zero};
use thiserror::Error;

use crate::{
    ast::{BinaryOp, Expr, Subscript, UnaryOp},
    datetime::DatetimeCast,
    value::Value,
};

mod methods;
mod predicates;

pub use predicates::Truth;

/// Errors raised while evaluating a compiled path.
///
/// Inside a filter most of these are absorbed and turn the predicate into
/// [`Truth::Unknown`]; see [`EvalError::is_structural`] for the exceptions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Strict member accessor applied to something other than an object
    #[error("member accessor applied to {found}")]
    MemberAccessOnNonObject { found: &'static str },

    /// Strict member accessor naming a key the object does not have
    #[error("object has no member {0:?}")]
    NoSuchMember(String),

    /// Strict array accessor applied to something other than an array
    #[error("array accessor applied to {found}")]
    ArrayAccessOnNonArray { found: &'static str },

    #[error("array subscript must be a single integer")]
    SubscriptNotSingleInteger,

    #[error("array subscript {index} is out of bounds for an array of size {size}")]
    SubscriptOutOfBounds { index: i64, size: usize },

    #[error("invalid array range {from} to {to}")]
    InvalidRange { from: i64, to: i64 },

    #[error("left operand of {0} must be a single number")]
    LeftOperandNotNumeric(BinaryOp),

    #[error("right operand of {0} must be a single number")]
    RightOperandNotNumeric(BinaryOp),

    #[error("operand of unary {0} must be a single number")]
    UnaryOperandNotNumeric(UnaryOp),

    #[error("division by zero")]
    DivisionByZero,

    /// Item method applied to an item of the wrong type
    #[error("{method}() expects {expected}, got {found}")]
    MethodTypeMismatch {
        method: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0:?} is not a valid double")]
    InvalidDouble(String),

    #[error("cannot convert {input:?} to a datetime: {reason}")]
    InvalidDatetime { input: String, reason: String },

    /// `$name` with no binding in the parameter map
    #[error("no value bound to ${0}")]
    UnknownVariable(String),

    #[error("starts with prefix must be a string")]
    StartsWithPrefixNotString,

    #[error("last is only valid inside an array accessor")]
    LastOutsideArrayAccessor,

    #[error("@ is only valid inside a filter")]
    CurrentItemOutsideFilter,
}

impl EvalError {
    /// Errors that describe a malformed path rather than an unlucky item.
    /// Predicates propagate these instead of answering unknown.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EvalError::LastOutsideArrayAccessor | EvalError::CurrentItemOutsideFilter
        )
    }
}

/// Per-execution inputs shared by every node.
#[derive(Clone, Copy)]
pub struct Parameters<'a> {
    pub strict: bool,
    /// The document `$` refers to
    pub context: &'a Value,
    /// Bindings for `$name`
    pub variables: &'a HashMap<String, Value>,
    pub datetime: &'a dyn DatetimeCast,
}

/// State threaded down the tree during evaluation.
///
/// `current` is bound only inside a filter; `last` only while evaluating an
/// array subscript, where it holds the size of the array being indexed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'v> {
    pub current: Option<&'v Value>,
    pub last: Option<usize>,
}

impl<'v> EvalContext<'v> {
    /// Create a context with the current item bound
    pub fn with_current<'w>(self, item: &'w Value) -> EvalContext<'w>
    where
        'v: 'w,
    {
        EvalContext {
            current: Some(item),
            last: self.last,
        }
    }

    pub fn with_last(self, size: usize) -> Self {
        EvalContext {
            current: self.current,
            last: Some(size),
        }
    }
}

/// Tree-walking interpreter for compiled paths.
///
/// One evaluator serves a single execution: it owns the `keyvalue()`
/// invocation counter, so results never depend on earlier runs.
pub struct Evaluator<'a> {
    params: Parameters<'a>,
    keyvalue_ids: Cell<i64>,
}

impl<'a> Evaluator<'a> {
    pub fn new(params: Parameters<'a>) -> Self {
        Evaluator {
            params,
            keyvalue_ids: Cell::new(0),
        }
    }

    /// Evaluates a root expression with nothing bound to `@` or `last`.
    pub fn run(&self, expr: &Expr) -> Result<Vec<Value>, EvalError> {
        self.evaluate(expr, EvalContext::default())
    }

    /// Evaluates an expression to its ordered sequence of items.
    pub fn evaluate(&self, expr: &Expr, ctx: EvalContext<'_>) -> Result<Vec<Value>, EvalError> {
        match expr {
            Expr::ContextVariable => Ok(vec![self.params.context.clone()]),
            Expr::CurrentItem => match ctx.current {
                Some(item) => Ok(vec![item.clone()]),
                None => Err(EvalError::CurrentItemOutsideFilter),
            },
            Expr::NamedVariable(name) => match self.params.variables.get(name) {
                Some(value) => Ok(vec![value.clone()]),
                None => Err(EvalError::UnknownVariable(name.clone())),
            },
            Expr::Literal(value) => Ok(vec![value.clone()]),
            Expr::LastSubscript => match ctx.last {
                Some(size) => Ok(vec![Value::from(size as i64 - 1)]),
                None => Err(EvalError::LastOutsideArrayAccessor),
            },
            Expr::MemberAccessor { base, key } => {
                let items = self.evaluate(base, ctx)?;
                let mut result = Vec::new();
                for item in &items {
                    self.access_member(item, key.as_deref(), &mut result)?;
                }
                Ok(result)
            }
            Expr::ArrayAccessor { base, subscripts } => {
                let items = self.evaluate(base, ctx)?;
                let mut result = Vec::new();
                for item in &items {
                    self.access_elements(item, subscripts.as_deref(), ctx, &mut result)?;
                }
                Ok(result)
            }
            Expr::Filter { base, predicate } => {
                let items = self.unwrap_arrays(self.evaluate(base, ctx)?);
                let mut kept = Vec::new();
                for item in items {
                    if self.test(predicate, ctx.with_current(&item))? == Truth::True {
                        kept.push(item);
                    }
                }
                Ok(kept)
            }
            Expr::Unary { op, operand } => {
                let value = self
                    .single_number(operand, ctx)?
                    .ok_or(EvalError::UnaryOperandNotNumeric(*op))?;
                let result = match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                };
                Ok(vec![Value::Number(result)])
            }
            Expr::Binary { op, left, right } => {
                let left = self
                    .single_number(left, ctx)?
                    .ok_or(EvalError::LeftOperandNotNumeric(*op))?;
                let right = self
                    .single_number(right, ctx)?
                    .ok_or(EvalError::RightOperandNotNumeric(*op))?;
                Ok(vec![Value::Number(apply_binop(*op, &left, &right)?)])
            }
            Expr::SimpleMethod { base, method } => {
                let items = self.evaluate(base, ctx)?;
                self.apply_method(*method, items)
            }
            Expr::DatetimeMethod { base, template } => {
                let items = self.evaluate(base, ctx)?;
                self.apply_datetime(template.as_ref(), items)
            }
        }
    }

    /// Lax mode replaces each array in a sequence by its elements.
    fn unwrap_arrays(&self, items: Vec<Value>) -> Vec<Value> {
        if self.params.strict || !items.iter().any(Value::is_array) {
            return items;
        }
        items
            .into_iter()
            .flat_map(|item| match item {
                Value::Array(elements) => elements,
                other => vec![other],
            })
            .collect()
    }

    /// The one number an arithmetic operand must reduce to, or `None`.
    fn single_number(
        &self,
        expr: &Expr,
        ctx: EvalContext<'_>,
    ) -> Result<Option<BigDecimal>, EvalError> {
        let items = self.unwrap_arrays(self.evaluate(expr, ctx)?);
        Ok(match items.as_slice() {
            [item] => item.as_number().cloned(),
            _ => None,
        })
    }

    fn access_member(
        &self,
        item: &Value,
        key: Option<&str>,
        result: &mut Vec<Value>,
    ) -> Result<(), EvalError> {
        match item {
            Value::Object(members) => match key {
                None => result.extend(members.iter().map(|(_, value)| value.clone())),
                Some(key) => {
                    let before = result.len();
                    result.extend(item.members(key).cloned());
                    if self.params.strict && result.len() == before {
                        return Err(EvalError::NoSuchMember(key.to_string()));
                    }
                }
            },
            Value::Array(elements) if !self.params.strict => {
                for element in elements.iter().filter(|e| matches!(e, Value::Object(_))) {
                    self.access_member(element, key, result)?;
                }
            }
            other if self.params.strict => {
                return Err(EvalError::MemberAccessOnNonObject {
                    found: other.type_name(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn access_elements(
        &self,
        item: &Value,
        subscripts: Option<&[Subscript]>,
        ctx: EvalContext<'_>,
        result: &mut Vec<Value>,
    ) -> Result<(), EvalError> {
        let elements: &[Value] = match item {
            Value::Array(elements) => elements,
            other if self.params.strict => {
                return Err(EvalError::ArrayAccessOnNonArray {
                    found: other.type_name(),
                });
            }
            other => std::slice::from_ref(other),
        };

        let Some(subscripts) = subscripts else {
            result.extend_from_slice(elements);
            return Ok(());
        };

        let size = elements.len();
        let ctx = ctx.with_last(size);
        for subscript in subscripts {
            match subscript {
                Subscript::Index(expr) => {
                    let index = self.subscript(expr, ctx)?;
                    match position(index, size) {
                        Some(i) => result.push(elements[i].clone()),
                        None if self.params.strict => {
                            return Err(EvalError::SubscriptOutOfBounds { index, size });
                        }
                        None => {}
                    }
                }
                Subscript::Range { from, to } => {
                    let from = self.subscript(from, ctx)?;
                    let to = self.subscript(to, ctx)?;
                    if self.params.strict {
                        if from > to {
                            return Err(EvalError::InvalidRange { from, to });
                        }
                        for index in [from, to] {
                            if position(index, size).is_none() {
                                return Err(EvalError::SubscriptOutOfBounds { index, size });
                            }
                        }
                    } else if from > to {
                        continue;
                    }
                    let first = from.max(0);
                    let last = to.min(size as i64 - 1);
                    for i in first..=last {
                        result.push(elements[i as usize].clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves a subscript expression to exactly one integer.
    fn subscript(&self, expr: &Expr, ctx: EvalContext<'_>) -> Result<i64, EvalError> {
        let items = self.evaluate(expr, ctx)?;
        match items.as_slice() {
            [Value::Number(n)] if n.is_integer() => Ok(n.to_i64().unwrap_or(
                if n.is_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                },
            )),
            _ => Err(EvalError::SubscriptNotSingleInteger),
        }
    }

    pub(crate) fn next_keyvalue_id(&self) -> i64 {
        let id = self.keyvalue_ids.get();
        self.keyvalue_ids.set(id + 1);
        id
    }
}

fn position(index: i64, size: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < size)
}

fn apply_binop(
    op: BinaryOp,
    left: &BigDecimal,
    right: &BigDecimal,
) -> Result<BigDecimal, EvalError> {
    Ok(match op {
        BinaryOp::Add => left + right,
        BinaryOp::Subtract => left - right,
        BinaryOp::Multiply => left * right,
        BinaryOp::Divide | BinaryOp::Modulo if right.is_zero() => {
            return Err(EvalError::DivisionByZero);
        }
        BinaryOp::Divide => left / right,
        BinaryOp::Modulo => left % right,
    })
}
