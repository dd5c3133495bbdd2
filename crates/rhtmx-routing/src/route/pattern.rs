/// Parsed route templates
///
/// A `RoutePattern` is immutable once assembled: segments of literal and
/// parameter parts, plus the defaults, parameter policies and required
/// values that were supplied alongside the template text.

use std::fmt;

use crate::constraint::ParameterPolicy;
use crate::values::{eq_ignore_case, RouteValue, RouteValueDictionary};

/// How a parameter binds
///
/// # Examples
///
/// ```
/// use rhtmx_routing::{ParameterKind, RoutePattern};
///
/// let pattern = RoutePattern::parse("{controller=Home}/{action}/{id?}").unwrap();
/// let kinds: Vec<ParameterKind> = pattern.parameters().map(|p| p.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![ParameterKind::DefaultValued, ParameterKind::Standard, ParameterKind::Optional]
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// `{name}`: must have a value
    Standard,
    /// `{name?}`: may be omitted
    Optional,
    /// `{name=value}` or a parameter with an explicit default
    DefaultValued,
    /// `{*name}`: captures the rest of the path, encodes `/` when generating
    CatchAll,
    /// `{**name}`: captures the rest of the path, keeps `/` when generating
    GreedyCatchAll,
}

/// Where a parameter policy came from
#[derive(Debug, Clone)]
pub enum PolicyReference {
    /// Constraint clause text such as `int` or `range(1,10)`
    Text(String),
    /// Regular expression matched case-insensitively against the whole value
    Pattern(String),
    /// Pre-built policy instance, used as-is
    Instance(ParameterPolicy),
}

impl PartialEq for PolicyReference {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PolicyReference::Text(a), PolicyReference::Text(b)) => a == b,
            (PolicyReference::Pattern(a), PolicyReference::Pattern(b)) => a == b,
            (PolicyReference::Instance(a), PolicyReference::Instance(b)) => a.same_instance(b),
            _ => false,
        }
    }
}

impl fmt::Display for PolicyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyReference::Text(text) => f.write_str(text),
            PolicyReference::Pattern(pattern) => write!(f, "pattern({})", pattern),
            PolicyReference::Instance(policy) => write!(f, "{:?}", policy),
        }
    }
}

/// A `{...}` parameter inside a segment
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPart {
    pub name: String,
    pub kind: ParameterKind,
    /// Default text; `None` when there is no default or the default is null
    pub default: Option<String>,
    /// Inline constraint clauses, in template order
    pub inline_policies: Vec<String>,
}

impl ParameterPart {
    pub fn is_optional(&self) -> bool {
        self.kind == ParameterKind::Optional
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(
            self.kind,
            ParameterKind::CatchAll | ParameterKind::GreedyCatchAll
        )
    }

    /// Whether generated values have their `/` characters encoded
    pub fn encode_slashes(&self) -> bool {
        self.kind != ParameterKind::GreedyCatchAll
    }
}

/// One part of a segment
#[derive(Debug, Clone, PartialEq)]
pub enum RoutePatternPart {
    Literal(String),
    /// The literal `.` that precedes a trailing optional parameter
    Separator(String),
    Parameter(ParameterPart),
}

impl RoutePatternPart {
    pub fn as_parameter(&self) -> Option<&ParameterPart> {
        match self {
            RoutePatternPart::Parameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, RoutePatternPart::Parameter(_))
    }

    /// Literal or separator text
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            RoutePatternPart::Literal(text) | RoutePatternPart::Separator(text) => Some(text),
            RoutePatternPart::Parameter(_) => None,
        }
    }
}

/// A `/`-delimited section of a template
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub parts: Vec<RoutePatternPart>,
}

impl PathSegment {
    /// A segment made of exactly one part
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// The parameter of a one-part parameter segment
    pub fn simple_parameter(&self) -> Option<&ParameterPart> {
        match self.parts.as_slice() {
            [RoutePatternPart::Parameter(parameter)] => Some(parameter),
            _ => None,
        }
    }

    /// The literal of a one-part literal segment
    pub fn simple_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [RoutePatternPart::Literal(text)] => Some(text),
            _ => None,
        }
    }
}

/// A required value declared by an endpoint for address-based lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredValue {
    /// The value must equal this one (null and empty mean "no value")
    Exact(RouteValue),
    /// Any non-empty value satisfies the requirement
    Any,
}

impl RequiredValue {
    pub fn exact(value: impl Into<RouteValue>) -> Self {
        RequiredValue::Exact(value.into())
    }

    /// Whether `value` satisfies this requirement
    pub fn is_satisfied_by(&self, value: Option<&RouteValue>) -> bool {
        match self {
            RequiredValue::Any => value.is_some_and(|v| !v.is_empty()),
            RequiredValue::Exact(required) => crate::values::parts_equal(Some(required), value),
        }
    }
}

/// A parsed and assembled route template
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePattern {
    /// Template text as supplied
    pub raw_text: String,
    pub segments: Vec<PathSegment>,
    /// Parameter defaults plus non-parameter "filter" defaults
    pub defaults: RouteValueDictionary,
    /// Policies per key, inline clauses first then explicit ones
    pub parameter_policies: Vec<(String, Vec<PolicyReference>)>,
    pub required_values: Vec<(String, RequiredValue)>,
}

impl RoutePattern {
    /// Parses a template with no explicit defaults, policies or required values
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_routing::RoutePattern;
    ///
    /// let pattern = RoutePattern::parse("api/{id:int}").unwrap();
    /// assert_eq!(pattern.segments.len(), 2);
    /// assert!(pattern.get_parameter("ID").is_some());
    ///
    /// assert!(RoutePattern::parse("{a}/{a}").is_err());
    /// ```
    pub fn parse(template: &str) -> Result<RoutePattern, crate::error::TemplateError> {
        super::builder::RoutePatternBuilder::new(template).build()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &ParameterPart> {
        self.segments
            .iter()
            .flat_map(|segment| segment.parts.iter())
            .filter_map(RoutePatternPart::as_parameter)
    }

    pub fn get_parameter(&self, name: &str) -> Option<&ParameterPart> {
        self.parameters().find(|p| eq_ignore_case(&p.name, name))
    }

    pub fn policies_for(&self, key: &str) -> &[PolicyReference] {
        self.parameter_policies
            .iter()
            .find(|(k, _)| eq_ignore_case(k, key))
            .map_or(&[], |(_, policies)| policies.as_slice())
    }

    pub fn required_value(&self, key: &str) -> Option<&RequiredValue> {
        self.required_values
            .iter()
            .find(|(k, _)| eq_ignore_case(k, key))
            .map(|(_, value)| value)
    }

    /// Whether any parameter of the pattern is a catch-all
    pub fn has_catch_all(&self) -> bool {
        self.parameters().any(ParameterPart::is_catch_all)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_text)
    }
}
