/// Template binding: route values → path and query string
///
/// Binding runs in three steps:
/// 1. `get_values` resolves each slot from explicit, ambient and default
///    values and applies the required-value and filter-default rules
/// 2. `process_constraints` runs the endpoint constraints outbound
/// 3. `bind_values` writes the path through a `UriBuildingContext` and
///    appends unconsumed explicit values as the query string
///
/// Every failure is `None`; the caller moves on to the next candidate.

use std::borrow::Cow;
use std::fmt;

use crate::constraint::{self, ResolvedPolicies, RouteDirection};
use crate::endpoint::Endpoint;
use crate::path::{encode_preserving_slashes, encode_value};
use crate::route::{ParameterKind, RoutePattern, RoutePatternPart};
use crate::values::{eq_ignore_case, parts_equal, RouteValue, RouteValueDictionary};

/// Generation flags after per-call overrides are applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindOptions {
    pub lowercase_urls: bool,
    pub lowercase_query_strings: bool,
    pub append_trailing_slash: bool,
}

impl BindOptions {
    fn lowercase_query(&self) -> bool {
        self.lowercase_urls && self.lowercase_query_strings
    }
}

impl From<&crate::config::RouteOptions> for BindOptions {
    fn from(options: &crate::config::RouteOptions) -> Self {
        Self {
            lowercase_urls: options.lowercase_urls,
            lowercase_query_strings: options.lowercase_query_strings,
            append_trailing_slash: options.append_trailing_slash,
        }
    }
}

/// A generated path and query string (`?`-prefixed, or empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundLink {
    pub path: String,
    pub query: String,
}

impl fmt::Display for BoundLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.query)
    }
}

/// Values accepted for one bind attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    /// Slot values (required keys and parameters), defaults filled in
    pub accepted: RouteValueDictionary,
    /// Accepted values plus the query extras, seen by constraints
    pub combined: RouteValueDictionary,
    /// Explicit values that end up in the query string
    pub extras: RouteValueDictionary,
}

/// Binds values into one pattern
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::{ParameterPolicyResolver, ResolvedPolicies};
/// use rhtmx_routing::generation::binder::{BindOptions, TemplateBinder};
/// use rhtmx_routing::{RoutePattern, RouteValueDictionary};
///
/// let pattern = RoutePattern::parse("{controller}/{action}/{*path}").unwrap();
/// let policies = ResolvedPolicies::resolve(&pattern, &ParameterPolicyResolver::default()).unwrap();
/// let binder = TemplateBinder::new(&pattern, &policies);
///
/// let values = RouteValueDictionary::from([
///     ("controller", "Home"),
///     ("action", "Index"),
///     ("path", "a/b b1/c c1"),
/// ]);
/// let link = binder.bind(None, &values, BindOptions::default()).unwrap();
/// assert_eq!(link.path, "/Home/Index/a%2Fb%20b1%2Fc%20c1");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TemplateBinder<'a> {
    pattern: &'a RoutePattern,
    policies: &'a ResolvedPolicies,
}

impl<'a> TemplateBinder<'a> {
    pub fn new(pattern: &'a RoutePattern, policies: &'a ResolvedPolicies) -> Self {
        Self { pattern, policies }
    }

    pub fn for_endpoint(endpoint: &'a Endpoint) -> Self {
        Self::new(&endpoint.pattern, &endpoint.policies)
    }

    /// Required keys that are not parameters, then parameters, in order
    fn slots(&self) -> Vec<&'a str> {
        let mut slots: Vec<&'a str> = Vec::new();
        for (key, _) in &self.pattern.required_values {
            if !slots.iter().any(|k| eq_ignore_case(k, key)) {
                slots.push(key);
            }
        }
        for parameter in self.pattern.parameters() {
            if !slots.iter().any(|k| eq_ignore_case(k, &parameter.name)) {
                slots.push(&parameter.name);
            }
        }
        slots
    }

    /// Resolves slot values: explicit > ambient > default
    ///
    /// Ambient values are copied until an explicit value differs from the
    /// ambient value of the same key; later slots fall back to defaults.
    pub fn get_values(
        &self,
        ambient: Option<&RouteValueDictionary>,
        explicit: &RouteValueDictionary,
    ) -> Option<TemplateValues> {
        let slots = self.slots();
        let mut accepted = RouteValueDictionary::new();
        let mut copy_ambient = ambient.is_some();

        for key in &slots {
            let ambient_value = ambient.and_then(|values| values.get(key));
            if explicit.contains_key(key) {
                let explicit_value = explicit.get(key);
                if copy_ambient && !parts_equal(explicit_value, ambient_value) {
                    copy_ambient = false;
                }
                if let Some(value) = explicit_value.filter(|v| !v.is_empty()) {
                    accepted.insert(*key, value.clone());
                }
            } else if copy_ambient {
                if let Some(value) = ambient_value.filter(|v| !v.is_empty()) {
                    accepted.insert(*key, value.clone());
                }
            }
        }

        for key in &slots {
            if accepted.contains_key(key) {
                continue;
            }
            if let Some(default) = self.pattern.defaults.get(key).filter(|v| !v.is_null()) {
                accepted.insert(*key, default.clone());
            }
        }

        for (key, required) in &self.pattern.required_values {
            if !required.is_satisfied_by(accepted.get(key)) {
                return None;
            }
        }

        for (key, default) in self.pattern.defaults.iter() {
            if self.pattern.get_parameter(key).is_some() {
                continue;
            }
            if explicit.contains_key(key) && !parts_equal(explicit.get(key), Some(default)) {
                return None;
            }
        }

        for parameter in self.pattern.parameters() {
            if parameter.kind == ParameterKind::Standard && accepted.get_text(&parameter.name).is_none()
            {
                return None;
            }
        }

        let mut extras = RouteValueDictionary::new();
        for (key, value) in explicit.iter() {
            let consumed = slots.iter().any(|k| eq_ignore_case(k, key))
                || self.pattern.defaults.contains_key(key);
            if !consumed && !value.is_null() {
                extras.insert(key, value.clone());
            }
        }

        let mut combined = accepted.clone();
        combined.merge(&extras);

        Some(TemplateValues {
            accepted,
            combined,
            extras,
        })
    }

    /// Runs the endpoint constraints in the generation direction
    pub fn process_constraints(&self, values: &TemplateValues) -> bool {
        constraint::process_constraints(
            Some(&self.policies.constraints),
            &values.combined,
            RouteDirection::UrlGeneration,
        )
    }

    /// Writes the path and query for accepted values
    pub fn bind_values(&self, values: &TemplateValues, options: BindOptions) -> Option<BoundLink> {
        let mut context = UriBuildingContext::new(options.lowercase_urls);

        for segment in &self.pattern.segments {
            for (index, part) in segment.parts.iter().enumerate() {
                match part {
                    RoutePatternPart::Literal(text) | RoutePatternPart::Separator(text) => {
                        if !context.accept(text, Encoding::Literal) {
                            return None;
                        }
                    }
                    RoutePatternPart::Parameter(parameter) => {
                        let value = values.accepted.get(&parameter.name);
                        let default = self.pattern.defaults.get(&parameter.name);
                        let same_as_default = default.is_some() && parts_equal(value, default);
                        let text = self.outbound_text(&parameter.name, value);
                        let encoding = if parameter.encode_slashes() {
                            Encoding::Value
                        } else {
                            Encoding::PreservingSlashes
                        };

                        if same_as_default {
                            if !context.buffer(&text, encoding) {
                                return None;
                            }
                        } else if !context.accept(&text, encoding) {
                            let after_separator = index > 0
                                && parameter.is_optional()
                                && matches!(segment.parts[index - 1], RoutePatternPart::Separator(_));
                            if !after_separator {
                                return None;
                            }
                            // `.{p?}` alone in its segment keeps the dot
                            if index > 1 {
                                context.remove_last_value();
                            }
                        }
                    }
                }
            }
            context.end_segment();
        }

        let mut path = context.into_path();
        if options.append_trailing_slash && !path.ends_with('/') {
            path.push('/');
        }

        Some(BoundLink {
            path,
            query: build_query(&values.extras, options.lowercase_query()),
        })
    }

    /// `get_values`, constraints and `bind_values` in one call
    pub fn bind(
        &self,
        ambient: Option<&RouteValueDictionary>,
        explicit: &RouteValueDictionary,
        options: BindOptions,
    ) -> Option<BoundLink> {
        let values = self.get_values(ambient, explicit)?;
        if !self.process_constraints(&values) {
            return None;
        }
        self.bind_values(&values, options)
    }

    fn outbound_text(&self, name: &str, value: Option<&RouteValue>) -> String {
        let text = value
            .and_then(RouteValue::as_text)
            .map(Cow::into_owned)
            .unwrap_or_default();
        match self.policies.transformer_for(name) {
            Some(transformer) if !text.is_empty() => transformer.transform_outbound(&text),
            _ => text,
        }
    }
}

fn build_query(extras: &RouteValueDictionary, lowercase: bool) -> String {
    let mut pairs: Vec<String> = Vec::new();
    for (key, value) in extras.iter() {
        let items: Vec<Cow<'_, str>> = match value {
            RouteValue::Null => Vec::new(),
            RouteValue::Text(text) => vec![Cow::Borrowed(text.as_str())],
            RouteValue::List(items) => items.iter().map(|i| Cow::Borrowed(i.as_str())).collect(),
        };
        for item in items {
            let (key, item) = if lowercase {
                (key.to_lowercase(), item.to_lowercase())
            } else {
                (key.to_string(), item.into_owned())
            };
            pairs.push(format!("{}={}", encode_value(&key), encode_value(&item)));
        }
    }

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    /// Template text, written as-is
    Literal,
    /// Percent-encoded, `/` included
    Value,
    /// Percent-encoded per `/`-separated piece
    PreservingSlashes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    Beginning,
    Inside,
}

/// Accumulates the generated path
///
/// Values equal to their default are buffered and only written once later
/// content is accepted, so trailing default segments disappear. An empty
/// value is allowed only as a whole segment, and nothing may follow it.
#[derive(Debug)]
struct UriBuildingContext {
    uri: String,
    buffer: Vec<(String, Encoding)>,
    uri_state: SegmentState,
    buffer_state: SegmentState,
    has_empty_segment: bool,
    last_value_offset: Option<usize>,
    lowercase: bool,
}

impl UriBuildingContext {
    fn new(lowercase: bool) -> Self {
        Self {
            uri: String::new(),
            buffer: Vec::new(),
            uri_state: SegmentState::Beginning,
            buffer_state: SegmentState::Beginning,
            has_empty_segment: false,
            last_value_offset: None,
            lowercase,
        }
    }

    fn accept(&mut self, value: &str, encoding: Encoding) -> bool {
        if value.is_empty() {
            if self.uri_state == SegmentState::Inside || self.buffer_state == SegmentState::Inside {
                return false;
            }
            self.has_empty_segment = true;
            return true;
        }
        if self.has_empty_segment {
            return false;
        }

        for (buffered, buffered_encoding) in std::mem::take(&mut self.buffer) {
            self.write(&buffered, buffered_encoding);
        }

        if self.uri_state == SegmentState::Beginning
            && self.buffer_state == SegmentState::Beginning
            && !self.uri.is_empty()
        {
            self.uri.push('/');
        }

        self.buffer_state = SegmentState::Inside;
        self.uri_state = SegmentState::Inside;
        self.last_value_offset = Some(self.uri.len());
        self.write(value, encoding);
        true
    }

    fn buffer(&mut self, value: &str, encoding: Encoding) -> bool {
        if value.is_empty() {
            if self.buffer_state == SegmentState::Inside {
                return false;
            }
            self.has_empty_segment = true;
            return true;
        }
        if self.has_empty_segment {
            return false;
        }

        if self.uri_state == SegmentState::Inside {
            return self.accept(value, encoding);
        }

        if self.buffer_state == SegmentState::Beginning {
            if !self.uri.is_empty() || !self.buffer.is_empty() {
                self.buffer.push(("/".to_string(), Encoding::Literal));
            }
            self.buffer_state = SegmentState::Inside;
        }
        self.buffer.push((value.to_string(), encoding));
        true
    }

    /// Drops the most recently accepted value (a separator)
    fn remove_last_value(&mut self) {
        if let Some(offset) = self.last_value_offset.take() {
            self.uri.truncate(offset);
        }
    }

    fn end_segment(&mut self) {
        self.buffer_state = SegmentState::Beginning;
        self.uri_state = SegmentState::Beginning;
    }

    fn write(&mut self, value: &str, encoding: Encoding) {
        let value: Cow<'_, str> = if self.lowercase {
            Cow::Owned(value.to_lowercase())
        } else {
            Cow::Borrowed(value)
        };
        match encoding {
            Encoding::Literal => self.uri.push_str(&value),
            Encoding::Value => self.uri.push_str(&encode_value(&value)),
            Encoding::PreservingSlashes => self.uri.push_str(&encode_preserving_slashes(&value)),
        }
    }

    fn into_path(self) -> String {
        format!("/{}", self.uri)
    }
}
