/// Route templates
///
/// Parsing of template text, pattern assembly and compile-time precedence.
/// Patterns are immutable once built and safe to share across threads.

pub mod builder;
pub mod parser;
pub mod pattern;
pub mod precedence;

// Re-export commonly used types
pub use builder::RoutePatternBuilder;
pub use parser::{parse_inline_parameter, parse_segments, InlineParameter};
pub use pattern::{
    ParameterKind, ParameterPart, PathSegment, PolicyReference, RequiredValue, RoutePattern,
    RoutePatternPart,
};
pub use precedence::Precedence;
