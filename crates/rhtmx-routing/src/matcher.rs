/// Incoming path matching
///
/// `EndpointMatcher` is compiled from one endpoint generation: candidates
/// sorted by (order, precedence, registration index) and a decision tree
/// over literal segment positions that prunes candidates before the full
/// per-pattern match. `Router` keeps a matcher per generation.
///
/// # Matching Rules
/// - Path segments are percent-decoded before comparison
/// - A missing trailing segment is fine for optional, defaulted and
///   catch-all parameters
/// - Extra segments fail unless the pattern ends in a catch-all
/// - The first candidate whose pattern and constraints both accept wins

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::RouteOptions;
use crate::constraint::{process_constraints, RouteDirection};
use crate::decision_tree::{Classifier, DecisionTree};
use crate::endpoint::{Endpoint, EndpointCollection, EndpointDataSource, GenerationCache};
use crate::path::{decode_segment, remainder_from, split_segments};
use crate::route::{ParameterKind, ParameterPart, RoutePattern, RoutePatternPart};
use crate::values::{eq_ignore_case, fold_case, RouteValueDictionary};

/// Result of matching a path
#[derive(Debug, Clone)]
pub struct EndpointMatch {
    pub endpoint: Arc<Endpoint>,
    pub values: RouteValueDictionary,
}

impl EndpointMatch {
    pub fn get_value(&self, key: &str) -> Option<std::borrow::Cow<'_, str>> {
        self.values.get_text(key)
    }
}

/// Criteria: segment index → literal, for one-part literal segments
struct LiteralPositions {
    case_insensitive: bool,
}

impl Classifier<Arc<Endpoint>> for LiteralPositions {
    fn criteria(&self, endpoint: &Arc<Endpoint>) -> Vec<(String, String)> {
        endpoint
            .pattern
            .segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| {
                segment
                    .simple_literal()
                    .map(|literal| (index.to_string(), literal.to_string()))
            })
            .collect()
    }

    fn normalize(&self, value: &str) -> String {
        if self.case_insensitive {
            fold_case(value)
        } else {
            value.to_string()
        }
    }
}

/// Compiled matcher for one endpoint generation
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::ParameterPolicyResolver;
/// use rhtmx_routing::endpoint::EndpointBuilder;
/// use rhtmx_routing::matcher::EndpointMatcher;
/// use std::sync::Arc;
///
/// let resolver = ParameterPolicyResolver::default();
/// let endpoints = vec![
///     Arc::new(EndpointBuilder::from_template("products/{id:int}").build(&resolver).unwrap()),
///     Arc::new(EndpointBuilder::from_template("products/{name}").build(&resolver).unwrap()),
/// ];
/// let matcher = EndpointMatcher::new(&endpoints, true);
///
/// let by_id = matcher.match_path("/products/42").unwrap();
/// assert_eq!(by_id.endpoint.display_name, "products/{id:int}");
///
/// let by_name = matcher.match_path("/Products/shoes").unwrap();
/// assert_eq!(by_name.values.get_text("name").as_deref(), Some("shoes"));
/// ```
#[derive(Debug)]
pub struct EndpointMatcher {
    tree: DecisionTree<Arc<Endpoint>>,
    case_insensitive: bool,
}

impl EndpointMatcher {
    pub fn new(endpoints: &[Arc<Endpoint>], case_insensitive: bool) -> Self {
        let mut candidates: Vec<(usize, &Arc<Endpoint>)> = endpoints
            .iter()
            .enumerate()
            .filter(|(_, endpoint)| !endpoint.metadata.suppress_matching)
            .collect();
        candidates.sort_by(|(ia, a), (ib, b)| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.precedence.cmp(&b.precedence))
                .then_with(|| ia.cmp(ib))
        });

        let classifier = LiteralPositions { case_insensitive };
        let tree = DecisionTree::build(
            candidates
                .into_iter()
                .map(|(_, endpoint)| Arc::clone(endpoint))
                .collect(),
            &classifier,
        );

        Self {
            tree,
            case_insensitive,
        }
    }

    pub fn from_collection(collection: &EndpointCollection, case_insensitive: bool) -> Self {
        Self::new(&collection.endpoints, case_insensitive)
    }

    /// Candidates in match order
    pub fn candidates(&self) -> &[Arc<Endpoint>] {
        self.tree.items()
    }

    /// Finds the endpoint for `path`, or `None`
    pub fn match_path(&self, path: &str) -> Option<EndpointMatch> {
        let segments: Vec<String> = split_segments(path)
            .into_iter()
            .map(|segment| decode_segment(segment).into_owned())
            .collect();

        let classifier = LiteralPositions {
            case_insensitive: self.case_insensitive,
        };
        let candidates = self.tree.walk(&classifier, |key| {
            key.parse::<usize>()
                .ok()
                .and_then(|index| segments.get(index))
                .map(|segment| vec![segment.clone()])
                .unwrap_or_default()
        });

        for endpoint in candidates {
            let Some(values) = match_pattern(&endpoint.pattern, path, self.case_insensitive) else {
                trace!(endpoint = %endpoint.display_name, path, "Pattern did not match");
                continue;
            };

            if !process_constraints(
                Some(&endpoint.policies.constraints),
                &values,
                RouteDirection::IncomingRequest,
            ) {
                trace!(endpoint = %endpoint.display_name, path, "Constraints rejected match");
                continue;
            }

            return Some(EndpointMatch {
                endpoint: Arc::clone(endpoint),
                values,
            });
        }

        debug!(path, "No endpoint matched request path");
        None
    }
}

/// Matches `path` against one pattern, without evaluating constraints
///
/// Returns the route values on success: every non-null pattern default,
/// overwritten by the values captured from the path.
///
/// **Pure function**
///
/// # Examples
///
/// ```
/// use rhtmx_routing::matcher::match_pattern;
/// use rhtmx_routing::RoutePattern;
///
/// let pattern = RoutePattern::parse("{controller=Home}/{action=Index}/{id?}").unwrap();
///
/// let values = match_pattern(&pattern, "/", true).unwrap();
/// assert_eq!(values.get_text("controller").as_deref(), Some("Home"));
/// assert_eq!(values.get_text("action").as_deref(), Some("Index"));
/// assert!(values.get("id").is_none());
///
/// let values = match_pattern(&pattern, "/Blog/Post/7", true).unwrap();
/// assert_eq!(values.get_text("id").as_deref(), Some("7"));
///
/// assert!(match_pattern(&pattern, "/a/b/c/d", true).is_none());
/// ```
pub fn match_pattern(
    pattern: &RoutePattern,
    path: &str,
    case_insensitive: bool,
) -> Option<RouteValueDictionary> {
    let raw_segments = split_segments(path);
    let mut values = RouteValueDictionary::new();
    for (key, value) in pattern.defaults.iter() {
        if !value.is_null() {
            values.insert(key, value.clone());
        }
    }

    for (index, segment) in pattern.segments.iter().enumerate() {
        if let Some(parameter) = segment.simple_parameter().filter(|p| p.is_catch_all()) {
            let remainder = remainder_from(path, index);
            if !remainder.is_empty() {
                values.insert(parameter.name.clone(), decode_segment(remainder).into_owned());
            }
            return Some(values);
        }

        let Some(raw) = raw_segments.get(index) else {
            if segment.simple_parameter().is_some_and(may_be_absent) {
                continue;
            }
            return None;
        };

        if raw.is_empty() {
            return None;
        }
        let decoded = decode_segment(raw);

        match segment.parts.as_slice() {
            [RoutePatternPart::Literal(literal)] => {
                if !literal_equals(literal, &decoded, case_insensitive) {
                    return None;
                }
            }
            [RoutePatternPart::Parameter(parameter)] => {
                values.insert(parameter.name.clone(), decoded.into_owned());
            }
            parts => {
                let captured = match_complex_segment(parts, &decoded, case_insensitive)?;
                for (name, value) in captured {
                    values.insert(name, value);
                }
            }
        }
    }

    if raw_segments.len() > pattern.segments.len() {
        return None;
    }

    Some(values)
}

fn may_be_absent(parameter: &ParameterPart) -> bool {
    matches!(
        parameter.kind,
        ParameterKind::Optional | ParameterKind::DefaultValued
    ) || parameter.is_catch_all()
}

fn literal_equals(literal: &str, text: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        eq_ignore_case(literal, text)
    } else {
        literal == text
    }
}

/// Matches a multi-part segment such as `{name}.{ext?}`
///
/// A trailing `.{p?}` that cannot be satisfied is retried without it.
fn match_complex_segment(
    parts: &[RoutePatternPart],
    text: &str,
    case_insensitive: bool,
) -> Option<Vec<(String, String)>> {
    if let Some(captured) = match_parts_right_to_left(parts, text, case_insensitive) {
        return Some(captured);
    }

    match parts {
        [RoutePatternPart::Separator(separator), RoutePatternPart::Parameter(last)]
            if last.is_optional() =>
        {
            literal_equals(separator, text, case_insensitive).then(Vec::new)
        }
        [rest @ .., RoutePatternPart::Separator(_), RoutePatternPart::Parameter(last)]
            if last.is_optional() =>
        {
            match_parts_right_to_left(rest, text, case_insensitive)
        }
        _ => None,
    }
}

/// Walks parts from the right, anchoring each parameter on the nearest
/// literal to its left. A parameter takes at least one character.
///
/// Literals are compared with `literal_equals` over char-aligned slices of
/// the original text, so case folding that changes byte lengths is safe.
fn match_parts_right_to_left(
    parts: &[RoutePatternPart],
    text: &str,
    case_insensitive: bool,
) -> Option<Vec<(String, String)>> {
    let mut captured = Vec::new();
    let mut end = text.len();
    let mut pending: Option<&ParameterPart> = None;

    for part in parts.iter().rev() {
        match part {
            RoutePatternPart::Parameter(parameter) => pending = Some(parameter),
            RoutePatternPart::Literal(literal) | RoutePatternPart::Separator(literal) => {
                match pending.take() {
                    None => {
                        end = suffix_start(text, literal, end, case_insensitive)?;
                    }
                    Some(parameter) => {
                        let (start, literal_end) =
                            rightmost_before(text, literal, end, case_insensitive)?;
                        captured.push((parameter.name.clone(), text[literal_end..end].to_string()));
                        end = start;
                    }
                }
            }
        }
    }

    match pending {
        Some(parameter) => {
            if end == 0 {
                return None;
            }
            captured.push((parameter.name.clone(), text[..end].to_string()));
        }
        None if end != 0 => return None,
        None => {}
    }

    captured.reverse();
    Some(captured)
}

/// Char boundaries of `text` in `from..=to`
fn boundaries(text: &str, from: usize, to: usize) -> impl DoubleEndedIterator<Item = usize> + '_ {
    (from..=to).filter(move |i| text.is_char_boundary(*i))
}

/// Start of the shortest `text[start..end]` equal to `literal`
fn suffix_start(text: &str, literal: &str, end: usize, case_insensitive: bool) -> Option<usize> {
    boundaries(text, 0, end)
        .rev()
        .find(|start| literal_equals(literal, &text[*start..end], case_insensitive))
}

/// Rightmost occurrence `(start, end)` of `literal` within `text[..end]`
/// leaving at least one character before `end`
fn rightmost_before(
    text: &str,
    literal: &str,
    end: usize,
    case_insensitive: bool,
) -> Option<(usize, usize)> {
    boundaries(text, 0, end).rev().find_map(|start| {
        boundaries(text, start, end)
            .take_while(|stop| *stop < end)
            .find(|stop| literal_equals(literal, &text[start..*stop], case_insensitive))
            .map(|stop| (start, stop))
    })
}

/// Generation-aware router over an endpoint data source
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::ParameterPolicyResolver;
/// use rhtmx_routing::endpoint::{EndpointBuilder, EndpointDataSource};
/// use rhtmx_routing::matcher::Router;
/// use rhtmx_routing::RouteOptions;
/// use std::sync::Arc;
///
/// let resolver = ParameterPolicyResolver::default();
/// let source = Arc::new(EndpointDataSource::new(vec![
///     EndpointBuilder::from_template("about").build(&resolver).unwrap(),
/// ]));
/// let router = Router::new(Arc::clone(&source), RouteOptions::default());
/// assert!(router.route("/about").is_some());
///
/// source.replace(vec![EndpointBuilder::from_template("contact").build(&resolver).unwrap()]);
/// assert!(router.route("/about").is_none());
/// assert!(router.route("/contact").is_some());
/// ```
#[derive(Debug)]
pub struct Router {
    source: Arc<EndpointDataSource>,
    options: RouteOptions,
    cache: GenerationCache<EndpointMatcher>,
}

impl Router {
    pub fn new(source: Arc<EndpointDataSource>, options: RouteOptions) -> Self {
        Self {
            source,
            options,
            cache: GenerationCache::new(),
        }
    }

    pub fn source(&self) -> &Arc<EndpointDataSource> {
        &self.source
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Matcher for the current generation
    pub fn matcher(&self) -> Arc<EndpointMatcher> {
        let case_insensitive = self.options.case_insensitive;
        self.cache.get(&self.source, |collection| {
            EndpointMatcher::from_collection(collection, case_insensitive)
        })
    }

    pub fn route(&self, path: &str) -> Option<EndpointMatch> {
        self.matcher().match_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(template: &str) -> RoutePattern {
        RoutePattern::parse(template).unwrap()
    }

    #[test]
    fn test_complex_segment_takes_last_dot() {
        let values = match_pattern(&parse("files/{name}.{ext}"), "/files/a.b.c", true).unwrap();
        assert_eq!(values.get_text("name").as_deref(), Some("a.b"));
        assert_eq!(values.get_text("ext").as_deref(), Some("c"));
    }

    #[test]
    fn test_complex_segment_optional_extension() {
        let pattern = parse("{name}.{ext?}");
        let values = match_pattern(&pattern, "/report", true).unwrap();
        assert_eq!(values.get_text("name").as_deref(), Some("report"));
        assert!(values.get("ext").is_none());

        let values = match_pattern(&pattern, "/report.pdf", true).unwrap();
        assert_eq!(values.get_text("ext").as_deref(), Some("pdf"));
    }

    #[test]
    fn test_complex_segment_literal_prefix() {
        let pattern = parse("v{version}-beta");
        let values = match_pattern(&pattern, "/V2-BETA", true).unwrap();
        assert_eq!(values.get_text("version").as_deref(), Some("2"));
        assert!(match_pattern(&pattern, "/V2-BETA", false).is_none());
        assert!(match_pattern(&pattern, "/v-beta", true).is_none());
    }

    #[test]
    fn test_rightmost_before() {
        assert_eq!(rightmost_before("aaa", "aa", 3, false), Some((0, 2)));
        assert_eq!(rightmost_before("a.b", ".", 3, false), Some((1, 2)));
        assert_eq!(rightmost_before("ab.", ".", 3, false), None);
        assert_eq!(rightmost_before("xÄy", "ä", 4, true), Some((1, 3)));
    }

    #[test]
    fn test_complex_segment_folds_unicode_literals() {
        let pattern = parse("Ünï-{x}");
        let values = match_pattern(&pattern, "/ünï-a", true).unwrap();
        assert_eq!(values.get_text("x").as_deref(), Some("a"));
        assert!(match_pattern(&pattern, "/ünï-a", false).is_none());

        let pattern = parse("{x}-ÉTÉ");
        let values = match_pattern(&pattern, "/2024-été", true).unwrap();
        assert_eq!(values.get_text("x").as_deref(), Some("2024"));
    }

    #[test]
    fn test_literal_tree_folds_final_sigma() {
        let resolver = crate::constraint::ParameterPolicyResolver::default();
        let endpoints = vec![Arc::new(
            crate::endpoint::EndpointBuilder::from_template("greek/ΟΔΟΣ")
                .build(&resolver)
                .unwrap(),
        )];
        let matcher = EndpointMatcher::new(&endpoints, true);
        assert!(matcher.match_path("/greek/οδοσ").is_some());
        assert!(matcher.match_path("/GREEK/ΟΔΟΣ").is_some());
    }

    #[test]
    fn test_empty_segment_fails() {
        assert!(match_pattern(&parse("{a}/{b}"), "/x//y", true).is_none());
        assert!(match_pattern(&parse("a/b/c"), "/a//c", true).is_none());
    }
}
