/// Inbound precedence of route patterns
///
/// Computed once per pattern when an endpoint is built. Lower sorts first.

use std::cmp::Ordering;

use super::pattern::{PathSegment, RoutePattern, RoutePatternPart};

/// One decimal digit per segment, compared as a decimal fraction
///
/// # Examples
///
/// ```
/// use rhtmx_routing::route::precedence::Precedence;
/// use rhtmx_routing::RoutePattern;
///
/// let literal = Precedence::of(&RoutePattern::parse("products/list").unwrap());
/// let parameter = Precedence::of(&RoutePattern::parse("products/{id}").unwrap());
/// let catch_all = Precedence::of(&RoutePattern::parse("products/{*rest}").unwrap());
///
/// assert!(literal < parameter);
/// assert!(parameter < catch_all);
/// ```
#[derive(Debug, Clone, Eq)]
pub struct Precedence(Vec<u8>);

impl Precedence {
    /// **Pure function**: pattern → precedence
    pub fn of(pattern: &RoutePattern) -> Self {
        Precedence(
            pattern
                .segments
                .iter()
                .map(|segment| segment_digit(pattern, segment))
                .collect(),
        )
    }

    pub fn digits(&self) -> &[u8] {
        &self.0
    }
}

/// Digit for one segment
///
/// # Digits
///
/// 1. literal
/// 2. multi-part segment, or constrained parameter
/// 3. parameter
/// 4. constrained catch-all
/// 5. catch-all
///
/// Optional parameters add one.
fn segment_digit(pattern: &RoutePattern, segment: &PathSegment) -> u8 {
    if segment.parts.len() > 1 {
        return 2;
    }

    match &segment.parts[0] {
        RoutePatternPart::Literal(_) | RoutePatternPart::Separator(_) => 1,
        RoutePatternPart::Parameter(parameter) => {
            let mut digit = if parameter.is_catch_all() { 5 } else { 3 };
            if !pattern.policies_for(&parameter.name).is_empty() {
                digit -= 1;
            }
            if parameter.is_optional() {
                digit += 1;
            }
            digit
        }
    }
}

impl Ord for Precedence {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Precedence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Precedence {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
