//! Link generation
//!
//! `LinkGenerator` is the outbound counterpart of `Router`: given a target
//! (an endpoint name, or a set of required values) plus explicit and
//! ambient route values, it finds candidate endpoints and binds the first
//! one that accepts the values.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use rhtmx_routing::endpoint::{EndpointBuilder, EndpointDataSource};
//! use rhtmx_routing::{LinkGenerator, RouteOptions, RouteValueDictionary};
//!
//! let options = RouteOptions::default();
//! let resolver = options.policy_resolver();
//! let source = Arc::new(EndpointDataSource::new(vec![
//!     EndpointBuilder::from_template("users/{id:int}")
//!         .with_name("user")
//!         .build(&resolver)
//!         .unwrap(),
//! ]));
//! let links = LinkGenerator::new(source, options);
//!
//! let values = RouteValueDictionary::from([("id", "42"), ("tab", "posts")]);
//! let path = links.generate_by_name("user", &values, None, None).unwrap();
//! assert_eq!(path.as_deref(), Some("/users/42?tab=posts"));
//! ```

pub mod address;
pub mod binder;

use std::sync::Arc;

use crate::config::RouteOptions;
use crate::endpoint::{Endpoint, EndpointDataSource, GenerationCache};
use crate::error::{Result, RoutingError};
use crate::path::{encode_value, normalize_path_base};
use crate::values::RouteValueDictionary;

pub use address::{usable_ambient, LinkIndex};
pub use binder::{BindOptions, BoundLink, TemplateBinder, TemplateValues};

/// Per-call overrides of the generation flags in `RouteOptions`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOptions {
    pub lowercase_urls: Option<bool>,
    pub lowercase_query_strings: Option<bool>,
    pub append_trailing_slash: Option<bool>,
}

impl LinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lowercase_urls(mut self, value: bool) -> Self {
        self.lowercase_urls = Some(value);
        self
    }

    pub fn with_lowercase_query_strings(mut self, value: bool) -> Self {
        self.lowercase_query_strings = Some(value);
        self
    }

    pub fn with_trailing_slash(mut self, value: bool) -> Self {
        self.append_trailing_slash = Some(value);
        self
    }

    /// Effective flags: each unset field falls back to `defaults`
    pub fn resolve(options: Option<&LinkOptions>, defaults: &RouteOptions) -> BindOptions {
        let base = BindOptions::from(defaults);
        let Some(options) = options else {
            return base;
        };
        BindOptions {
            lowercase_urls: options.lowercase_urls.unwrap_or(base.lowercase_urls),
            lowercase_query_strings: options
                .lowercase_query_strings
                .unwrap_or(base.lowercase_query_strings),
            append_trailing_slash: options
                .append_trailing_slash
                .unwrap_or(base.append_trailing_slash),
        }
    }
}

/// The pieces around a generated path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriComponents {
    pub scheme: String,
    pub host: String,
    pub path_base: String,
    pub fragment: String,
}

impl UriComponents {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
        self.path_base = path_base.into();
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = fragment.into();
        self
    }

    /// `path_base + link + fragment`
    fn path(&self, link: &BoundLink) -> String {
        let mut out = normalize_path_base(&self.path_base);
        out.push_str(&link.path);
        out.push_str(&link.query);
        if !self.fragment.is_empty() {
            out.push('#');
            out.push_str(&encode_value(&self.fragment));
        }
        out
    }

    /// `scheme://host + path_base + link + fragment`
    fn uri(&self, link: &BoundLink) -> Result<String> {
        if self.scheme.is_empty() {
            return Err(RoutingError::InvalidArgument(
                "scheme must not be empty".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(RoutingError::InvalidArgument(
                "host must not be empty".to_string(),
            ));
        }
        Ok(format!("{}://{}{}", self.scheme, self.host, self.path(link)))
    }
}

/// Generates links against the current endpoint generation
#[derive(Debug)]
pub struct LinkGenerator {
    source: Arc<EndpointDataSource>,
    options: RouteOptions,
    cache: GenerationCache<LinkIndex>,
}

impl LinkGenerator {
    pub fn new(source: Arc<EndpointDataSource>, options: RouteOptions) -> Self {
        Self {
            source,
            options,
            cache: GenerationCache::new(),
        }
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Link index for the current generation
    pub fn index(&self) -> Arc<LinkIndex> {
        self.cache.get(&self.source, LinkIndex::from_collection)
    }

    // ========================================================================
    // Core generation: path and query
    // ========================================================================

    /// Path and query for the endpoint named `name`
    ///
    /// `Ok(None)` when no endpoint accepts the values; an error when the
    /// name is shared by several endpoints.
    pub fn generate_by_name(
        &self,
        name: &str,
        values: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        options: Option<&LinkOptions>,
    ) -> Result<Option<String>> {
        Ok(self
            .link_by_name(name, values, ambient, options)?
            .map(|link| link.to_string()))
    }

    /// Path and query for the first endpoint whose required values agree
    /// with `required` merged over `explicit`
    pub fn generate_by_values(
        &self,
        required: &RouteValueDictionary,
        explicit: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        options: Option<&LinkOptions>,
    ) -> Option<String> {
        self.link_by_values(required, explicit, ambient, options)
            .map(|link| link.to_string())
    }

    // ========================================================================
    // Path and URI variants
    // ========================================================================

    pub fn get_path_by_name(
        &self,
        name: &str,
        values: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        path_base: &str,
        fragment: &str,
        options: Option<&LinkOptions>,
    ) -> Result<Option<String>> {
        let components = UriComponents::default()
            .with_path_base(path_base)
            .with_fragment(fragment);
        Ok(self
            .link_by_name(name, values, ambient, options)?
            .map(|link| components.path(&link)))
    }

    pub fn get_uri_by_name(
        &self,
        name: &str,
        values: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        components: &UriComponents,
        options: Option<&LinkOptions>,
    ) -> Result<Option<String>> {
        self.link_by_name(name, values, ambient, options)?
            .map(|link| components.uri(&link))
            .transpose()
    }

    pub fn get_path_by_values(
        &self,
        required: &RouteValueDictionary,
        explicit: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        path_base: &str,
        fragment: &str,
        options: Option<&LinkOptions>,
    ) -> Option<String> {
        let components = UriComponents::default()
            .with_path_base(path_base)
            .with_fragment(fragment);
        self.link_by_values(required, explicit, ambient, options)
            .map(|link| components.path(&link))
    }

    pub fn get_uri_by_values(
        &self,
        required: &RouteValueDictionary,
        explicit: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        components: &UriComponents,
        options: Option<&LinkOptions>,
    ) -> Result<Option<String>> {
        self.link_by_values(required, explicit, ambient, options)
            .map(|link| components.uri(&link))
            .transpose()
    }

    // ========================================================================
    // Candidate binding
    // ========================================================================

    fn link_by_name(
        &self,
        name: &str,
        values: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        options: Option<&LinkOptions>,
    ) -> Result<Option<BoundLink>> {
        let index = self.index();
        let candidates = index.find_by_name(name)?;
        Ok(self.bind_first(candidates, values, ambient, options))
    }

    fn link_by_values(
        &self,
        required: &RouteValueDictionary,
        explicit: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        options: Option<&LinkOptions>,
    ) -> Option<BoundLink> {
        let mut values = explicit.clone();
        values.merge(required);

        let index = self.index();
        let candidates = index.find_by_values(&values, ambient);
        self.bind_first(&candidates, &values, ambient, options)
    }

    fn bind_first(
        &self,
        candidates: &[Arc<Endpoint>],
        values: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
        options: Option<&LinkOptions>,
    ) -> Option<BoundLink> {
        let bind_options = LinkOptions::resolve(options, &self.options);
        candidates.iter().find_map(|endpoint| {
            TemplateBinder::for_endpoint(endpoint).bind(
                usable_ambient(endpoint, ambient),
                values,
                bind_options,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointBuilder;
    use pretty_assertions::assert_eq;

    fn generator(endpoints: Vec<EndpointBuilder>, options: RouteOptions) -> LinkGenerator {
        let resolver = options.policy_resolver();
        let endpoints = endpoints
            .into_iter()
            .map(|builder| builder.build(&resolver).unwrap())
            .collect();
        LinkGenerator::new(Arc::new(EndpointDataSource::new(endpoints)), options)
    }

    #[test]
    fn test_link_options_fall_back_to_route_options() {
        let defaults = RouteOptions {
            lowercase_urls: true,
            ..RouteOptions::default()
        };
        let resolved = LinkOptions::resolve(
            Some(&LinkOptions::new().with_trailing_slash(true)),
            &defaults,
        );
        assert_eq!(
            resolved,
            BindOptions {
                lowercase_urls: true,
                lowercase_query_strings: false,
                append_trailing_slash: true,
            }
        );
        assert_eq!(LinkOptions::resolve(None, &defaults), BindOptions::from(&defaults));
    }

    #[test]
    fn test_first_accepting_candidate_wins() {
        let links = generator(
            vec![
                EndpointBuilder::from_template("items/{id:int}").with_name("item"),
                EndpointBuilder::from_template("items/by-slug/{id}").with_name("item_slug"),
            ],
            RouteOptions::default(),
        );
        let values = RouteValueDictionary::from([("id", "abc")]);
        assert_eq!(links.generate_by_name("item", &values, None, None).unwrap(), None);
        assert_eq!(
            links.generate_by_name("ITEM_SLUG", &values, None, None).unwrap(),
            Some("/items/by-slug/abc".to_string())
        );
    }

    #[test]
    fn test_path_base_and_fragment() {
        let links = generator(
            vec![EndpointBuilder::from_template("docs/{page}").with_name("docs")],
            RouteOptions::default(),
        );
        let values = RouteValueDictionary::from([("page", "intro")]);
        let path = links
            .get_path_by_name("docs", &values, None, "app/", "top part", None)
            .unwrap();
        assert_eq!(path.as_deref(), Some("/app/docs/intro#top%20part"));
    }

    #[test]
    fn test_uri_requires_scheme_and_host() {
        let links = generator(
            vec![EndpointBuilder::from_template("about").with_name("about")],
            RouteOptions::default(),
        );
        let values = RouteValueDictionary::new();

        let uri = links
            .get_uri_by_name("about", &values, None, &UriComponents::new("https", "example.com"), None)
            .unwrap();
        assert_eq!(uri.as_deref(), Some("https://example.com/about"));

        let err = links
            .get_uri_by_name("about", &values, None, &UriComponents::new("", "example.com"), None)
            .unwrap_err();
        assert!(matches!(err, RoutingError::InvalidArgument(_)));
    }
}
