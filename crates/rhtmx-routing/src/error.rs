/// Error types for template assembly, policy activation and link lookup
///
/// Only configuration problems are errors. A path that matches nothing or a
/// link that cannot be bound is reported as `None` by the matcher and the
/// link generator.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, RoutingError>;

/// What is wrong with a route template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateErrorKind {
    #[error("the template may not start with '~' unless it is followed by '/'")]
    InvalidTilde,

    #[error("the template contains an empty segment ('//')")]
    ConsecutiveSeparators,

    #[error("there is an incomplete parameter in the template, check for a missing '{{' or '}}'")]
    MismatchedParameter,

    #[error("a parameter may not contain an unescaped '{{'")]
    UnescapedBrace,

    #[error("the literal section '{0}' is invalid, literal sections cannot contain the '?' character")]
    InvalidLiteral(String),

    #[error("the parameter name '{0}' is invalid, names must be non-empty and cannot contain '/', '{{', '}}', '?' or '*'")]
    InvalidParameterName(String),

    #[error("the parameter '{0}' appears more than once, names must be unique (case-insensitive)")]
    RepeatedParameter(String),

    #[error("the catch-all parameter '{0}' must be the last segment of the template")]
    CatchAllMustBeLast(String),

    #[error("a segment with more than one part cannot contain the catch-all parameter '{0}'")]
    CatchAllInMultiPartSegment(String),

    #[error("the catch-all parameter '{0}' cannot be marked optional")]
    CatchAllCannotBeOptional(String),

    #[error("the optional parameter '{0}' must be the last part of its segment")]
    OptionalMustBeLast(String),

    #[error("the optional parameter '{parameter}' must be preceded by a '.', found '{preceding}'")]
    OptionalMustFollowPeriod { parameter: String, preceding: String },

    #[error("a segment cannot contain two consecutive parameters, separate them with a literal")]
    ConsecutiveParameters,

    #[error("the optional parameter '{0}' cannot have a default value")]
    OptionalWithDefault(String),

    #[error("the parameter '{0}' has an inline default and an explicit default")]
    DefaultConflict(String),

    #[error("the optional parameter '{optional}' cannot precede the required parameter '{required}'")]
    OptionalPrecedesRequired { optional: String, required: String },

    #[error("the required value '{0}' is neither a parameter nor a default with the same value")]
    InvalidRequiredValue(String),
}

/// A template that failed to parse or assemble, with the offending text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid route template '{template}': {kind}")]
pub struct TemplateError {
    pub template: String,
    pub kind: TemplateErrorKind,
}

impl TemplateError {
    pub fn new(template: impl Into<String>, kind: TemplateErrorKind) -> Self {
        Self {
            template: template.into(),
            kind,
        }
    }
}

/// Constraint clause resolution and activation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("the constraint '{text}' on parameter '{parameter}' could not be resolved: no entry named '{name}' in the constraint map")]
    UnresolvedPolicy {
        parameter: String,
        name: String,
        text: String,
    },

    #[error("the constraint '{text}' on parameter '{parameter}' resolved to '{name}', which is not a route constraint")]
    InvalidPolicyType {
        parameter: String,
        name: String,
        text: String,
    },

    #[error("the constraint '{name}' has no constructor accepting {arguments} argument(s) (clause '{text}')")]
    NoMatchingConstructor {
        name: String,
        arguments: usize,
        text: String,
    },

    #[error("the constraint '{name}' has more than one constructor accepting {arguments} argument(s) (clause '{text}')")]
    AmbiguousConstructor {
        name: String,
        arguments: usize,
        text: String,
    },

    #[error("the constraint '{name}' needs the service '{service}', which is not registered (clause '{text}')")]
    MissingService {
        name: String,
        service: String,
        text: String,
    },

    #[error("the constraint '{name}' rejected its arguments in clause '{text}': {reason}")]
    InvalidArgument {
        name: String,
        text: String,
        reason: String,
    },
}

/// One endpoint name shared by several endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName {
    pub name: String,
    pub display_names: Vec<String>,
}

/// Top-level routing error
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("endpoint '{endpoint}' with template '{template}' is invalid: {source}")]
    InvalidEndpoint {
        endpoint: String,
        template: String,
        #[source]
        source: Box<RoutingError>,
    },

    #[error("{}", describe_duplicates(.0))]
    AmbiguousName(Vec<DuplicateName>),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RoutingError {
    /// Wraps an error with the identity of the endpoint it came from
    pub fn for_endpoint(self, endpoint: impl Into<String>, template: impl Into<String>) -> Self {
        RoutingError::InvalidEndpoint {
            endpoint: endpoint.into(),
            template: template.into(),
            source: Box::new(self),
        }
    }
}

fn describe_duplicates(groups: &[DuplicateName]) -> String {
    let mut message =
        String::from("the following endpoints with a duplicate endpoint name were found.");
    for group in groups {
        message.push_str(&format!("\n\nendpoints with endpoint name '{}':", group.name));
        for display_name in &group.display_names {
            message.push('\n');
            message.push_str(display_name);
        }
    }
    message
}
