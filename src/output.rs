//! JSON text for result sequences.
//!
//! Values are written straight into one buffer rather than converted to
//! `serde_json` first. Members keep their order, repeated keys survive and
//! numbers keep their decimal scale (`1.50` stays `1.50`). Datetime items are
//! written as quoted ISO-8601 strings.

use std::fmt::Write;

use bigdecimal::{BigDecimal, num_bigint::Sign};

use crate::value::Value;

/// Zeros written out before a number switches to exponent notation.
const MAX_PADDING: usize = 32;

/// Writes [`Value`]s as JSON text, compact or indented by two spaces.
pub struct JsonPrinter {
    pretty: bool,
    out: String,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter {
            pretty,
            out: String::new(),
        }
    }

    /// Consumes the printer and returns the text for `value`.
    pub fn finish(mut self, value: &Value) -> String {
        self.write_value(value, 0);
        self.out
    }

    fn write_value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Boolean(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.out.push_str(&format_number(n)),
            Value::String(s) => self.write_string(s),
            Value::Datetime(dt) => {
                let _ = write!(self.out, "\"{dt}\"");
            }
            Value::Array(elements) => {
                self.write_container(('[', ']'), elements, depth, |p, element, depth| {
                    p.write_value(element, depth)
                })
            }
            Value::Object(members) => {
                self.write_container(('{', '}'), members, depth, |p, (key, value), depth| {
                    p.write_string(key);
                    p.out.push(':');
                    if p.pretty {
                        p.out.push(' ');
                    }
                    p.write_value(value, depth);
                })
            }
        }
    }

    fn write_container<T>(
        &mut self,
        (open, close): (char, char),
        entries: &[T],
        depth: usize,
        mut write_entry: impl FnMut(&mut Self, &T, usize),
    ) {
        self.out.push(open);
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline(depth + 1);
            write_entry(self, entry, depth + 1);
        }
        if !entries.is_empty() {
            self.newline(depth);
        }
        self.out.push(close);
    }

    fn newline(&mut self, depth: usize) {
        if self.pretty {
            self.out.push('\n');
            for _ in 0..depth {
                self.out.push_str("  ");
            }
        }
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

/// Compact JSON text.
///
/// ```
/// use sqljson_path::Value;
/// use sqljson_path::output::to_json;
///
/// let object = Value::Object(vec![
///     ("a".to_string(), Value::from(1)),
///     ("a".to_string(), Value::from("two")),
/// ]);
/// assert_eq!(to_json(&object), r#"{"a":1,"a":"two"}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).finish(value)
}

/// JSON text indented by two spaces; empty containers stay on one line.
///
/// ```
/// use sqljson_path::Value;
/// use sqljson_path::output::to_json_pretty;
///
/// let array = Value::Array(vec![Value::from(1), Value::Array(vec![])]);
/// assert_eq!(to_json_pretty(&array), "[\n  1,\n  []\n]");
/// ```
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).finish(value)
}

/// JSON spelling of a number, keeping its scale: `1.50` stays `1.50`.
///
/// Plain notation is used unless more than 32 padding zeros would be needed,
/// in which case the digits are followed by an exponent (`1E+40`, `1E-40`).
///
/// ```
/// use bigdecimal::BigDecimal;
/// use sqljson_path::output::format_number;
///
/// let n: BigDecimal = "-12.50".parse().unwrap();
/// assert_eq!(format_number(&n), "-12.50");
/// let n: BigDecimal = "1e3".parse().unwrap();
/// assert_eq!(format_number(&n), "1000");
/// ```
pub fn format_number(n: &BigDecimal) -> String {
    let (int, scale) = n.as_bigint_and_exponent();
    let sign = if int.sign() == Sign::Minus { "-" } else { "" };
    let digits = int.magnitude().to_string();

    if scale <= 0 {
        let zeros = scale.unsigned_abs() as usize;
        if zeros > MAX_PADDING {
            return format!("{sign}{digits}E+{zeros}");
        }
        return format!("{sign}{digits}{}", "0".repeat(zeros));
    }

    let scale = scale as usize;
    if scale < digits.len() {
        let (whole, fraction) = digits.split_at(digits.len() - scale);
        return format!("{sign}{whole}.{fraction}");
    }
    let leading = scale - digits.len();
    if leading > MAX_PADDING {
        format!("{sign}{digits}E-{scale}")
    } else {
        format!("{sign}0.{}{digits}", "0".repeat(leading))
    }
}
