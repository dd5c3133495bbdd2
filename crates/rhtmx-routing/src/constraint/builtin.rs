/// Built-in constraints and transformers
///
/// Each constraint reads the text of its own key and rejects a missing
/// value. The evaluator decides whether a missing value is checked at all.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::{Regex, RegexBuilder};
use uuid::Uuid;

use super::{ParameterTransformer, RouteConstraint, RouteDirection};
use crate::values::RouteValueDictionary;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

fn text<'a>(values: &'a RouteValueDictionary, key: &str) -> Option<Cow<'a, str>> {
    values.get(key).and_then(|value| value.as_text())
}

/// Implements `RouteConstraint` for a type with `fn accepts(&self, &str) -> bool`
macro_rules! text_constraint {
    ($($t:ty),* $(,)?) => {
        $(impl RouteConstraint for $t {
            fn matches(
                &self,
                route_key: &str,
                values: &RouteValueDictionary,
                _direction: RouteDirection,
            ) -> bool {
                text(values, route_key).is_some_and(|value| self.accepts(&value))
            }
        })*
    };
}

/// 32-bit integer
#[derive(Debug, Clone, Copy, Default)]
pub struct IntConstraint;

impl IntConstraint {
    fn accepts(&self, value: &str) -> bool {
        value.parse::<i32>().is_ok()
    }
}

/// 64-bit integer
#[derive(Debug, Clone, Copy, Default)]
pub struct LongConstraint;

impl LongConstraint {
    fn accepts(&self, value: &str) -> bool {
        value.parse::<i64>().is_ok()
    }
}

/// `true` or `false`, any case
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConstraint;

impl BoolConstraint {
    fn accepts(&self, value: &str) -> bool {
        value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
    }
}

/// Finite double-precision number
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleConstraint;

impl DoubleConstraint {
    fn accepts(&self, value: &str) -> bool {
        value.parse::<f64>().is_ok_and(f64::is_finite)
    }
}

/// Finite single-precision number
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConstraint;

impl FloatConstraint {
    fn accepts(&self, value: &str) -> bool {
        value.parse::<f32>().is_ok_and(f32::is_finite)
    }
}

/// Plain decimal number without exponent
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalConstraint;

impl DecimalConstraint {
    fn accepts(&self, value: &str) -> bool {
        !value.contains(['e', 'E']) && value.parse::<f64>().is_ok_and(f64::is_finite)
    }
}

/// GUID in any of the usual textual forms
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidConstraint;

impl GuidConstraint {
    fn accepts(&self, value: &str) -> bool {
        let trimmed = value
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .unwrap_or(value);
        Uuid::parse_str(trimmed).is_ok()
    }
}

/// RFC 3339 timestamp, ISO date-time or date
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConstraint;

impl DateTimeConstraint {
    fn accepts(&self, value: &str) -> bool {
        DateTime::parse_from_rfc3339(value).is_ok()
            || DATE_TIME_FORMATS
                .iter()
                .any(|format| NaiveDateTime::parse_from_str(value, format).is_ok())
            || DATE_FORMATS
                .iter()
                .any(|format| NaiveDate::parse_from_str(value, format).is_ok())
    }
}

/// ASCII letters only
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaConstraint;

impl AlphaConstraint {
    fn accepts(&self, value: &str) -> bool {
        value.chars().all(|c| c.is_ascii_alphabetic())
    }
}

/// Integer of at least `min`
#[derive(Debug, Clone, Copy)]
pub struct MinConstraint {
    pub min: i64,
}

impl MinConstraint {
    pub fn new(min: i64) -> Self {
        Self { min }
    }

    fn accepts(&self, value: &str) -> bool {
        value.parse::<i64>().is_ok_and(|v| v >= self.min)
    }
}

/// Integer of at most `max`
#[derive(Debug, Clone, Copy)]
pub struct MaxConstraint {
    pub max: i64,
}

impl MaxConstraint {
    pub fn new(max: i64) -> Self {
        Self { max }
    }

    fn accepts(&self, value: &str) -> bool {
        value.parse::<i64>().is_ok_and(|v| v <= self.max)
    }
}

/// Integer within `min..=max`
#[derive(Debug, Clone, Copy)]
pub struct RangeConstraint {
    pub min: i64,
    pub max: i64,
}

impl RangeConstraint {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    fn accepts(&self, value: &str) -> bool {
        value
            .parse::<i64>()
            .is_ok_and(|v| (self.min..=self.max).contains(&v))
    }
}

/// Character count within `min..=max`
#[derive(Debug, Clone, Copy)]
pub struct LengthConstraint {
    pub min: usize,
    pub max: usize,
}

impl LengthConstraint {
    pub fn exact(length: usize) -> Self {
        Self {
            min: length,
            max: length,
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    fn accepts(&self, value: &str) -> bool {
        (self.min..=self.max).contains(&value.chars().count())
    }
}

/// At least `min` characters
#[derive(Debug, Clone, Copy)]
pub struct MinLengthConstraint {
    pub min: usize,
}

impl MinLengthConstraint {
    pub fn new(min: usize) -> Self {
        Self { min }
    }

    fn accepts(&self, value: &str) -> bool {
        value.chars().count() >= self.min
    }
}

/// At most `max` characters
#[derive(Debug, Clone, Copy)]
pub struct MaxLengthConstraint {
    pub max: usize,
}

impl MaxLengthConstraint {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    fn accepts(&self, value: &str) -> bool {
        value.chars().count() <= self.max
    }
}

/// Case-insensitive regular expression
#[derive(Debug, Clone)]
pub struct RegexConstraint {
    regex: Regex,
}

impl RegexConstraint {
    /// Matches wherever the expression finds a match; anchor it yourself
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Matches only when the whole value matches `pattern`
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_routing::constraint::{RegexConstraint, RouteConstraint, RouteDirection};
    /// use rhtmx_routing::RouteValueDictionary;
    ///
    /// let abc = RegexConstraint::whole("abc").unwrap();
    /// let values = RouteValueDictionary::from([("controller", "Abc")]);
    /// assert!(abc.matches("controller", &values, RouteDirection::IncomingRequest));
    ///
    /// let values = RouteValueDictionary::from([("controller", "Abcd")]);
    /// assert!(!abc.matches("controller", &values, RouteDirection::IncomingRequest));
    /// ```
    pub fn whole(pattern: &str) -> Result<Self, regex::Error> {
        Self::new(&format!("^(?:{})$", pattern))
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    fn accepts(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// A file name: last path piece has an extension
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNameConstraint;

impl FileNameConstraint {
    fn accepts(&self, value: &str) -> bool {
        has_file_extension(value)
    }
}

/// Anything that is not a file name
#[derive(Debug, Clone, Copy, Default)]
pub struct NonFileNameConstraint;

impl NonFileNameConstraint {
    fn accepts(&self, value: &str) -> bool {
        !has_file_extension(value)
    }
}

fn has_file_extension(value: &str) -> bool {
    let last = value.rsplit('/').next().unwrap_or(value);
    last.find('.').is_some() && !last.ends_with('.')
}

text_constraint!(
    IntConstraint,
    LongConstraint,
    BoolConstraint,
    DoubleConstraint,
    FloatConstraint,
    DecimalConstraint,
    GuidConstraint,
    DateTimeConstraint,
    AlphaConstraint,
    MinConstraint,
    MaxConstraint,
    RangeConstraint,
    LengthConstraint,
    MinLengthConstraint,
    MaxLengthConstraint,
    RegexConstraint,
    FileNameConstraint,
);

/// Any non-empty value; evaluated even when the key is absent
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredConstraint;

impl RouteConstraint for RequiredConstraint {
    fn matches(
        &self,
        route_key: &str,
        values: &RouteValueDictionary,
        _direction: RouteDirection,
    ) -> bool {
        text(values, route_key).is_some()
    }

    fn requires_value(&self) -> bool {
        true
    }
}

impl RouteConstraint for NonFileNameConstraint {
    fn matches(
        &self,
        route_key: &str,
        values: &RouteValueDictionary,
        _direction: RouteDirection,
    ) -> bool {
        text(values, route_key).map_or(true, |value| self.accepts(&value))
    }
}

/// `MyValue` → `my-value`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlugifyTransformer;

impl ParameterTransformer for SlugifyTransformer {
    fn transform_outbound(&self, value: &str) -> String {
        let mut slug = String::with_capacity(value.len() + 4);
        let mut previous_lower = false;
        for c in value.chars() {
            if previous_lower && c.is_ascii_uppercase() {
                slug.push('-');
            }
            previous_lower = c.is_ascii_lowercase();
            slug.extend(c.to_lowercase());
        }
        slug
    }
}
