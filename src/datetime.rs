//! Datetime items and the cast capability behind `.datetime()`.
//!
//! Paths never see text-to-datetime conversion directly. They go through a
//! [`DatetimeCast`] supplied by the caller; [`IsoDatetimeCast`] is the default
//! used by [`CompiledPath::query`](crate::CompiledPath::query).

use std::{cmp::Ordering, fmt};

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc,
};
use thiserror::Error;

use crate::evaluator::EvalError;

/// A datetime item. The variant is the SQL datetime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datetime {
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(NaiveTime, FixedOffset),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
}

impl Datetime {
    /// The tag returned by the `type()` item method.
    pub fn type_name(&self) -> &'static str {
        match self {
            Datetime::Date(_) => "date",
            Datetime::Time(_) => "time without time zone",
            Datetime::TimeTz(..) => "time with time zone",
            Datetime::Timestamp(_) => "timestamp without time zone",
            Datetime::TimestampTz(_) => "timestamp with time zone",
        }
    }

    /// Orders two datetimes of compatible types.
    ///
    /// Dates and timestamps without zone compare on the local timeline, zoned
    /// values compare as instants. Mixing zoned with unzoned values, or times
    /// with dates, has no order.
    pub fn compare(&self, other: &Datetime) -> Option<Ordering> {
        use Datetime::*;
        match (self, other) {
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Date(a), Timestamp(b)) => Some(a.and_time(NaiveTime::MIN).cmp(b)),
            (Timestamp(a), Date(b)) => Some(a.cmp(&b.and_time(NaiveTime::MIN))),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (TimestampTz(a), TimestampTz(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (TimeTz(a, za), TimeTz(b, zb)) => Some(utc_time(*a, *za).cmp(&utc_time(*b, *zb))),
            _ => None,
        }
    }
}

fn utc_time(time: NaiveTime, offset: FixedOffset) -> NaiveTime {
    let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    time.overflowing_sub_signed(shift).0
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datetime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Datetime::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Datetime::TimeTz(t, z) => write!(f, "{}{}", t.format("%H:%M:%S%.f"), z),
            Datetime::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f")),
            Datetime::TimestampTz(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.f%:z")),
        }
    }
}

/// Converts strings to datetime items for `.datetime()` and for comparisons
/// between datetimes and strings.
pub trait DatetimeCast: Send + Sync {
    fn cast(
        &self,
        input: &str,
        template: Option<&DatetimeTemplate>,
    ) -> Result<Datetime, EvalError>;
}

/// Default cast: compiled templates, or ISO-8601 text when no template is given.
///
/// Short template years (`YY`, `RR`) are completed against `reference_year`.
/// [`Default`] takes it from the current UTC date.
#[derive(Debug, Clone, Copy)]
pub struct IsoDatetimeCast {
    reference_year: i32,
}

impl IsoDatetimeCast {
    pub fn new(reference_year: i32) -> Self {
        IsoDatetimeCast { reference_year }
    }
}

impl Default for IsoDatetimeCast {
    fn default() -> Self {
        IsoDatetimeCast::new(Utc::now().year())
    }
}

impl DatetimeCast for IsoDatetimeCast {
    fn cast(
        &self,
        input: &str,
        template: Option<&DatetimeTemplate>,
    ) -> Result<Datetime, EvalError> {
        let parsed = match template {
            Some(template) => template.apply(input, self.reference_year),
            None => parse_iso(input.trim()).ok_or_else(|| "not an ISO-8601 datetime".to_string()),
        };
        parsed.map_err(|reason| EvalError::InvalidDatetime {
            input: input.to_string(),
            reason,
        })
    }
}

fn parse_iso(input: &str) -> Option<Datetime> {
    let zoned = match input.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+00:00"),
        None => input.to_string(),
    };

    for format in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(&zoned, format) {
            return Some(Datetime::TimestampTz(ts));
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Datetime::Timestamp(ts));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Datetime::Date(date));
    }
    if let Ok(ts) = DateTime::parse_from_str(&format!("1970-01-01T{zoned}"), "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Some(Datetime::TimeTz(ts.time(), *ts.offset()));
    }
    for format in ["%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(input, format) {
            return Some(Datetime::Time(time));
        }
    }
    None
}

/// A malformed datetime template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid datetime template {template:?}: {reason}")]
pub struct TemplateError {
    pub template: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    /// `YYYY`, `YYY`, `YY`, `Y`; the digit count
    Year(u32),
    /// `RRRR`, `RR`
    RoundedYear(u32),
    Month,
    Day,
    DayOfYear,
    Hour12,
    Hour24,
    Minute,
    Second,
    SecondOfDay,
    /// `FF1` to `FF9`
    Fraction(u32),
    Meridian,
    TzHour,
    TzMinute,
}

impl Field {
    /// Fields sharing a slot cannot appear together.
    fn slot(self) -> u32 {
        match self {
            Field::Year(_) | Field::RoundedYear(_) => 0,
            Field::Month => 1,
            Field::Day => 2,
            Field::DayOfYear => 3,
            Field::Hour12 => 4,
            Field::Hour24 => 5,
            Field::Minute => 6,
            Field::Second => 7,
            Field::SecondOfDay => 8,
            Field::Fraction(_) => 9,
            Field::Meridian => 10,
            Field::TzHour => 11,
            Field::TzMinute => 12,
        }
    }

    fn is_date(self) -> bool {
        matches!(
            self,
            Field::Year(_) | Field::RoundedYear(_) | Field::Month | Field::Day | Field::DayOfYear
        )
    }

    fn is_time(self) -> bool {
        matches!(
            self,
            Field::Hour12
                | Field::Hour24
                | Field::Minute
                | Field::Second
                | Field::SecondOfDay
                | Field::Fraction(_)
                | Field::Meridian
        )
    }
}

// Longest spelling first within each shared prefix.
const FIELDS: &[(&str, Field)] = &[
    ("YYYY", Field::Year(4)),
    ("YYY", Field::Year(3)),
    ("YY", Field::Year(2)),
    ("Y", Field::Year(1)),
    ("RRRR", Field::RoundedYear(4)),
    ("RR", Field::RoundedYear(2)),
    ("MM", Field::Month),
    ("MI", Field::Minute),
    ("DDD", Field::DayOfYear),
    ("DD", Field::Day),
    ("HH24", Field::Hour24),
    ("HH12", Field::Hour12),
    ("HH", Field::Hour12),
    ("SSSSS", Field::SecondOfDay),
    ("SS", Field::Second),
    ("FF1", Field::Fraction(1)),
    ("FF2", Field::Fraction(2)),
    ("FF3", Field::Fraction(3)),
    ("FF4", Field::Fraction(4)),
    ("FF5", Field::Fraction(5)),
    ("FF6", Field::Fraction(6)),
    ("FF7", Field::Fraction(7)),
    ("FF8", Field::Fraction(8)),
    ("FF9", Field::Fraction(9)),
    ("A.M.", Field::Meridian),
    ("P.M.", Field::Meridian),
    ("TZH", Field::TzHour),
    ("TZM", Field::TzMinute),
];

const DELIMITERS: &[char] = &['-', '.', '/', ',', '\'', ';', ':', ' '];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Delimiter(char),
    Field(Field),
}

/// A compiled `.datetime("...")` template such as `YYYY-MM-DD HH24:MI:SS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatetimeTemplate {
    source: String,
    items: Vec<Item>,
}

impl DatetimeTemplate {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let fail = |reason| TemplateError {
            template: source.to_string(),
            reason,
        };

        let upper = source.to_ascii_uppercase();
        let mut rest = upper.as_str();
        let mut items = Vec::new();
        let mut seen = [false; 13];

        while let Some(ch) = rest.chars().next() {
            if let Some((spelling, field)) = FIELDS.iter().find(|(s, _)| rest.starts_with(s)) {
                let slot = field.slot() as usize;
                if seen[slot] {
                    return Err(fail("duplicate field"));
                }
                seen[slot] = true;
                items.push(Item::Field(*field));
                rest = &rest[spelling.len()..];
            } else if DELIMITERS.contains(&ch) {
                items.push(Item::Delimiter(ch));
                rest = &rest[ch.len_utf8()..];
            } else {
                return Err(fail("unknown template element"));
            }
        }

        let has = |field: Field| seen[field.slot() as usize];
        if has(Field::Hour12) != has(Field::Meridian) {
            return Err(fail("12-hour clock and A.M./P.M. must be used together"));
        }
        if has(Field::Hour12) && has(Field::Hour24) {
            return Err(fail("conflicting hour fields"));
        }
        if has(Field::DayOfYear) && (has(Field::Month) || has(Field::Day)) {
            return Err(fail("day of year conflicts with month and day"));
        }
        if has(Field::SecondOfDay)
            && (has(Field::Hour12) || has(Field::Hour24) || has(Field::Minute) || has(Field::Second))
        {
            return Err(fail("seconds of day conflict with other time fields"));
        }
        if has(Field::TzMinute) && !has(Field::TzHour) {
            return Err(fail("TZM requires TZH"));
        }
        let fields = || {
            items.iter().filter_map(|item| match item {
                Item::Field(field) => Some(*field),
                Item::Delimiter(_) => None,
            })
        };
        if !fields().any(|f| f.is_date() || f.is_time()) {
            return Err(fail("no date or time fields"));
        }

        Ok(DatetimeTemplate {
            source: source.to_string(),
            items,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Field(field) => Some(*field),
            Item::Delimiter(_) => None,
        })
    }

    fn apply(&self, input: &str, reference_year: i32) -> Result<Datetime, String> {
        let mut scanner = Scanner {
            input: input.chars().collect(),
            position: 0,
            reference_year,
        };
        let mut parts = Parts::default();

        for item in &self.items {
            match *item {
                Item::Delimiter(expected) => {
                    if scanner.next() != Some(expected) {
                        return Err(format!("expected {expected:?} at position {}", scanner.position));
                    }
                }
                Item::Field(field) => scanner.read_field(field, &mut parts)?,
            }
        }
        if scanner.position < scanner.input.len() {
            return Err("trailing characters".to_string());
        }

        let has_date = self.fields().any(Field::is_date);
        let has_time = self.fields().any(Field::is_time);
        let offset = parts.offset()?;
        let date = if has_date { Some(parts.date()?) } else { None };
        let time = parts.time()?;

        Ok(match (date, offset) {
            (Some(date), None) if !has_time => Datetime::Date(date),
            (Some(date), None) => Datetime::Timestamp(date.and_time(time)),
            (Some(date), Some(offset)) => {
                let local = date.and_time(time);
                let zoned = local
                    .and_local_timezone(offset)
                    .single()
                    .ok_or_else(|| "time zone offset out of range".to_string())?;
                Datetime::TimestampTz(zoned)
            }
            (None, None) => Datetime::Time(time),
            (None, Some(offset)) => Datetime::TimeTz(time, offset),
        })
    }
}

#[derive(Default)]
struct Parts {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    day_of_year: Option<u32>,
    hour: Option<u32>,
    pm: Option<bool>,
    minute: Option<u32>,
    second: Option<u32>,
    second_of_day: Option<u32>,
    nanos: Option<u32>,
    tz_negative: bool,
    tz_hour: Option<i32>,
    tz_minute: Option<i32>,
}

impl Parts {
    fn date(&self) -> Result<NaiveDate, String> {
        let year = self.year.unwrap_or(1970);
        let date = match self.day_of_year {
            Some(ordinal) => NaiveDate::from_yo_opt(year, ordinal),
            None => NaiveDate::from_ymd_opt(year, self.month.unwrap_or(1), self.day.unwrap_or(1)),
        };
        date.ok_or_else(|| "date out of range".to_string())
    }

    fn time(&self) -> Result<NaiveTime, String> {
        let nanos = self.nanos.unwrap_or(0);
        if let Some(seconds) = self.second_of_day {
            return NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
                .ok_or_else(|| "seconds of day out of range".to_string());
        }
        let mut hour = self.hour.unwrap_or(0);
        if let Some(pm) = self.pm {
            if !(1..=12).contains(&hour) {
                return Err("hour out of range for a 12-hour clock".to_string());
            }
            hour = hour % 12 + if pm { 12 } else { 0 };
        }
        NaiveTime::from_hms_nano_opt(
            hour,
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            nanos,
        )
        .ok_or_else(|| "time out of range".to_string())
    }

    fn offset(&self) -> Result<Option<FixedOffset>, String> {
        let Some(hours) = self.tz_hour else {
            return Ok(None);
        };
        let mut seconds = hours * 3600 + self.tz_minute.unwrap_or(0) * 60;
        if self.tz_negative {
            seconds = -seconds;
        }
        FixedOffset::east_opt(seconds)
            .map(Some)
            .ok_or_else(|| "time zone offset out of range".to_string())
    }
}

struct Scanner {
    input: Vec<char>,
    position: usize,
    reference_year: i32,
}

impl Scanner {
    fn next(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        self.position += 1;
        ch
    }

    /// Reads one to `max` ASCII digits; returns the value and the digit count.
    fn digits(&mut self, max: u32) -> Result<(u32, u32), String> {
        let mut value = 0u32;
        let mut count = 0;
        while count < max {
            match self.input.get(self.position).and_then(|c| c.to_digit(10)) {
                Some(digit) => {
                    value = value * 10 + digit;
                    count += 1;
                    self.position += 1;
                }
                None => break,
            }
        }
        if count == 0 {
            return Err(format!("expected digits at position {}", self.position));
        }
        Ok((value, count))
    }

    fn read_field(&mut self, field: Field, parts: &mut Parts) -> Result<(), String> {
        match field {
            Field::Year(width) => {
                let (value, count) = self.digits(width)?;
                parts.year = Some(complete_year(value, count, self.reference_year));
            }
            Field::RoundedYear(width) => {
                let (value, count) = self.digits(width)?;
                parts.year = Some(if count <= 2 {
                    round_year(value, self.reference_year)
                } else {
                    value as i32
                });
            }
            Field::Month => parts.month = Some(self.digits(2)?.0),
            Field::Day => parts.day = Some(self.digits(2)?.0),
            Field::DayOfYear => parts.day_of_year = Some(self.digits(3)?.0),
            Field::Hour12 | Field::Hour24 => parts.hour = Some(self.digits(2)?.0),
            Field::Minute => parts.minute = Some(self.digits(2)?.0),
            Field::Second => parts.second = Some(self.digits(2)?.0),
            Field::SecondOfDay => parts.second_of_day = Some(self.digits(5)?.0),
            Field::Fraction(width) => {
                let (value, count) = self.digits(width)?;
                parts.nanos = Some(value * 10u32.pow(9 - count));
            }
            Field::Meridian => {
                let text: String = self
                    .input
                    .iter()
                    .skip(self.position)
                    .take(4)
                    .collect::<String>()
                    .to_ascii_uppercase();
                parts.pm = Some(match text.as_str() {
                    "A.M." => false,
                    "P.M." => true,
                    _ => return Err("expected A.M. or P.M.".to_string()),
                });
                self.position += 4;
            }
            Field::TzHour => {
                parts.tz_negative = match self.next() {
                    Some('-') => true,
                    Some('+') => false,
                    _ => return Err("expected time zone sign".to_string()),
                };
                parts.tz_hour = Some(self.digits(2)?.0 as i32);
            }
            Field::TzMinute => parts.tz_minute = Some(self.digits(2)?.0 as i32),
        }
        Ok(())
    }
}

/// Fills in the leading digits of a short year from the reference year.
fn complete_year(value: u32, digits: u32, current: i32) -> i32 {
    if digits >= 4 {
        return value as i32;
    }
    let scale = 10i32.pow(digits);
    current - current.rem_euclid(scale) + value as i32
}

/// Two-digit `RR` years land in the century closest to the reference year.
fn round_year(value: u32, current: i32) -> i32 {
    let century = current - current.rem_euclid(100);
    let value = value as i32;
    match (value < 50, current.rem_euclid(100) < 50) {
        (true, true) | (false, false) => century + value,
        (true, false) => century + 100 + value,
        (false, true) => century - 100 + value,
    }
}
