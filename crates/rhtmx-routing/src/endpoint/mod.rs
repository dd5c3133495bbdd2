/// Endpoints
///
/// An endpoint pairs a route pattern with an opaque handler, ordering and
/// metadata. Endpoints are compiled once (policies resolved, precedence
/// computed) and then shared read-only by the matcher and link generator.

pub mod cache;
pub mod source;

pub use cache::GenerationCache;
pub use source::{EndpointCollection, EndpointDataSource};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constraint::{ParameterPolicyResolver, ResolvedPolicies};
use crate::error::{Result, RoutingError};
use crate::route::{Precedence, RoutePattern, RoutePatternBuilder};

/// Opaque request handler attached to an endpoint
pub type Handler = Arc<dyn Any + Send + Sync>;

// ============================================================================
// Metadata
// ============================================================================

/// Per-endpoint metadata read by routing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMetadata {
    /// Name used for by-name link generation
    pub name: Option<String>,
    /// Never matched for incoming requests
    pub suppress_matching: bool,
    /// Never addressed by link generation
    pub suppress_link_generation: bool,
    /// Arbitrary application metadata (titles, permissions, ...)
    pub items: HashMap<String, String>,
}

// ============================================================================
// Endpoint
// ============================================================================

/// A compiled endpoint
#[derive(Clone)]
pub struct Endpoint {
    pub display_name: String,
    pub pattern: RoutePattern,
    /// Lower order is preferred during matching and link generation
    pub order: i32,
    pub metadata: EndpointMetadata,
    pub handler: Option<Handler>,
    pub policies: ResolvedPolicies,
    pub precedence: Precedence,
}

impl Endpoint {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    pub fn get_meta(&self, key: &str) -> Option<&String> {
        self.metadata.items.get(key)
    }

    /// Handler downcast to its concrete type
    pub fn handler_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.handler
            .clone()
            .and_then(|handler| handler.downcast::<T>().ok())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("display_name", &self.display_name)
            .field("pattern", &self.pattern.raw_text)
            .field("order", &self.order)
            .field("metadata", &self.metadata)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

// ============================================================================
// Builder
// ============================================================================

enum PatternSource {
    Built(RoutePattern),
    Template(RoutePatternBuilder, String),
}

/// Builder for `Endpoint`
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::ParameterPolicyResolver;
/// use rhtmx_routing::endpoint::EndpointBuilder;
///
/// let endpoint = EndpointBuilder::from_template("products/{id:int}")
///     .with_name("product")
///     .with_order(1)
///     .with_meta("title", "Product")
///     .build(&ParameterPolicyResolver::default())
///     .unwrap();
///
/// assert_eq!(endpoint.name(), Some("product"));
/// assert_eq!(endpoint.display_name, "products/{id:int}");
/// assert_eq!(endpoint.policies.constraints.len(), 1);
/// ```
pub struct EndpointBuilder {
    source: PatternSource,
    display_name: Option<String>,
    order: i32,
    metadata: EndpointMetadata,
    handler: Option<Handler>,
}

impl EndpointBuilder {
    /// Starts from an assembled pattern
    pub fn new(pattern: RoutePattern) -> Self {
        Self::with_source(PatternSource::Built(pattern))
    }

    /// Starts from template text; parse errors surface from `build`
    pub fn from_template(template: impl Into<String>) -> Self {
        let template = template.into();
        Self::with_source(PatternSource::Template(
            RoutePatternBuilder::new(template.clone()),
            template,
        ))
    }

    /// Starts from a pattern builder carrying defaults, policies or required values
    pub fn from_pattern_builder(builder: RoutePatternBuilder, template: impl Into<String>) -> Self {
        Self::with_source(PatternSource::Template(builder, template.into()))
    }

    fn with_source(source: PatternSource) -> Self {
        Self {
            source,
            display_name: None,
            order: 0,
            metadata: EndpointMetadata::default(),
            handler: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.items.insert(key.into(), value.into());
        self
    }

    pub fn suppress_matching(mut self) -> Self {
        self.metadata.suppress_matching = true;
        self
    }

    pub fn suppress_link_generation(mut self) -> Self {
        self.metadata.suppress_link_generation = true;
        self
    }

    pub fn with_handler<H: Any + Send + Sync>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Assembles the pattern, resolves its policies and computes precedence
    pub fn build(self, resolver: &ParameterPolicyResolver) -> Result<Endpoint> {
        let (pattern, template) = match self.source {
            PatternSource::Built(pattern) => {
                let template = pattern.raw_text.clone();
                (pattern, template)
            }
            PatternSource::Template(builder, template) => {
                let display = self.display_name.clone().unwrap_or_else(|| template.clone());
                let pattern = builder
                    .build()
                    .map_err(|e| RoutingError::from(e).for_endpoint(display, template.as_str()))?;
                (pattern, template)
            }
        };

        let display_name = self.display_name.unwrap_or_else(|| template.clone());
        let policies = ResolvedPolicies::resolve(&pattern, resolver).map_err(|e| {
            RoutingError::from(e).for_endpoint(display_name.as_str(), template.as_str())
        })?;
        let precedence = Precedence::of(&pattern);

        Ok(Endpoint {
            display_name,
            pattern,
            order: self.order,
            metadata: self.metadata,
            handler: self.handler,
            policies,
            precedence,
        })
    }
}
