use bigdecimal::{BigDecimal, One, Signed};

use crate::{
    ast::Method,
    datetime::DatetimeTemplate,
    evaluator::{EvalError, Evaluator},
    value::Value,
};

impl Evaluator<'_> {
    /// Applies a zero-argument item method to every item of a sequence.
    pub(super) fn apply_method(
        &self,
        method: Method,
        items: Vec<Value>,
    ) -> Result<Vec<Value>, EvalError> {
        // size() looks at arrays themselves, so it never unwraps
        let items = match method {
            Method::Size => items,
            _ => self.unwrap_arrays(items),
        };

        let mut result = Vec::with_capacity(items.len());
        for item in items {
            match method {
                Method::Type => result.push(Value::from(item.type_name())),
                Method::Size => result.push(method_size(&item)),
                Method::Double => result.push(method_double(item)?),
                Method::Ceiling => result.push(numeric(method, item, ceiling)?),
                Method::Floor => result.push(numeric(method, item, floor)?),
                Method::Abs => result.push(method_abs(item)?),
                Method::KeyValue => self.method_keyvalue(&item, &mut result)?,
            }
        }
        Ok(result)
    }

    /// .datetime() / .datetime(template) - casts strings through the provider
    pub(super) fn apply_datetime(
        &self,
        template: Option<&DatetimeTemplate>,
        items: Vec<Value>,
    ) -> Result<Vec<Value>, EvalError> {
        self.unwrap_arrays(items)
            .into_iter()
            .map(|item| match item {
                Value::String(s) => self.params.datetime.cast(&s, template).map(Value::Datetime),
                other => Err(mismatch("datetime", "string", &other)),
            })
            .collect()
    }

    /// .keyvalue() - one `{name, value, id}` object per member
    ///
    /// Every object produced by a single invocation shares the same `id`.
    fn method_keyvalue(&self, item: &Value, result: &mut Vec<Value>) -> Result<(), EvalError> {
        let Value::Object(members) = item else {
            return Err(mismatch(Method::KeyValue.name(), "object", item));
        };
        let id = Value::from(self.next_keyvalue_id());
        result.extend(members.iter().map(|(name, value)| {
            Value::Object(vec![
                ("name".to_string(), Value::from(name.as_str())),
                ("value".to_string(), value.clone()),
                ("id".to_string(), id.clone()),
            ])
        }));
        Ok(())
    }
}

fn mismatch(method: &'static str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::MethodTypeMismatch {
        method,
        expected,
        found: found.type_name(),
    }
}

/// .size() - array length, 1 for anything else
fn method_size(item: &Value) -> Value {
    Value::from(item.as_array().map_or(1, <[Value]>::len))
}

/// .double() - numbers pass through; strings must parse as a finite double
///
/// The double is converted through its shortest round-trip spelling, so
/// `"0.1"` becomes exactly `0.1`.
fn method_double(item: Value) -> Result<Value, EvalError> {
    match item {
        Value::Number(_) => Ok(item),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(|f| format!("{f:e}").parse::<BigDecimal>().ok())
            .map(Value::Number)
            .ok_or(EvalError::InvalidDouble(s)),
        other => Err(mismatch(Method::Double.name(), "number or string", &other)),
    }
}

/// .ceiling() / .floor() - values without fractional digits are returned untouched
fn numeric(
    method: Method,
    item: Value,
    round: fn(&BigDecimal) -> BigDecimal,
) -> Result<Value, EvalError> {
    match item {
        Value::Number(n) if n.as_bigint_and_exponent().1 > 0 => Ok(Value::Number(round(&n))),
        Value::Number(_) => Ok(item),
        other => Err(mismatch(method.name(), "number", &other)),
    }
}

fn ceiling(n: &BigDecimal) -> BigDecimal {
    let truncated = n.with_scale(0);
    if truncated < *n {
        truncated + BigDecimal::one()
    } else {
        truncated
    }
}

fn floor(n: &BigDecimal) -> BigDecimal {
    let truncated = n.with_scale(0);
    if truncated > *n {
        truncated - BigDecimal::one()
    } else {
        truncated
    }
}

fn method_abs(item: Value) -> Result<Value, EvalError> {
    match item {
        Value::Number(n) if n.is_negative() => Ok(Value::Number(n.abs())),
        Value::Number(_) => Ok(item),
        other => Err(mismatch(Method::Abs.name(), "number", &other)),
    }
}
