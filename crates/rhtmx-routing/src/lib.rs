//! # RHTMX Routing
//!
//! A route-template engine that works in both directions:
//! - Template parsing (`{controller=Home}/{action}/{id:int?}`, `{**path}`)
//! - Constraint policies (`int`, `range(1,10)`, `regex(...)`, custom factories)
//! - Incoming path matching with compile-time precedence
//! - Link generation by endpoint name or by route values
//!
//! ## Generations
//!
//! Endpoints live in an `EndpointDataSource`. Replacing them publishes a new
//! generation; matchers and link indexes are rebuilt lazily on first use and
//! swapped atomically, so readers never see a half-built structure.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rhtmx_routing::endpoint::{EndpointBuilder, EndpointDataSource};
//! use rhtmx_routing::{LinkGenerator, RouteOptions, RouteValueDictionary, Router};
//!
//! let options = RouteOptions::default();
//! let resolver = options.policy_resolver();
//! let source = Arc::new(EndpointDataSource::new(vec![
//!     EndpointBuilder::from_template("products/{id:int}/{slug?}")
//!         .with_name("product")
//!         .build(&resolver)
//!         .unwrap(),
//! ]));
//!
//! let router = Router::new(Arc::clone(&source), options.clone());
//! let matched = router.route("/products/12").unwrap();
//! assert_eq!(matched.get_value("id").as_deref(), Some("12"));
//! assert!(router.route("/products/twelve").is_none());
//!
//! let links = LinkGenerator::new(source, options);
//! let values = RouteValueDictionary::from([("id", "12"), ("slug", "red-shoes")]);
//! assert_eq!(
//!     links.generate_by_name("product", &values, None, None).unwrap().as_deref(),
//!     Some("/products/12/red-shoes"),
//! );
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod constraint;
pub mod decision_tree;
pub mod endpoint;
pub mod error;
pub mod generation;
pub mod matcher;
pub mod path;
pub mod route;
pub mod values;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::RouteOptions;
pub use constraint::{
    ConstraintMap, ParameterPolicy, ParameterPolicyResolver, PolicyFactory, RouteConstraint,
    RouteDirection,
};
pub use endpoint::{Endpoint, EndpointBuilder, EndpointDataSource};
pub use error::{PolicyError, Result, RoutingError, TemplateError, TemplateErrorKind};
pub use generation::{LinkGenerator, LinkOptions, UriComponents};
pub use matcher::{EndpointMatch, Router};
pub use route::{
    ParameterKind, PolicyReference, RequiredValue, RoutePattern, RoutePatternBuilder,
};
pub use values::{RouteValue, RouteValueDictionary};
