/// Parameter policies
///
/// A policy attached to a template parameter has one of two capabilities:
/// a route constraint (a predicate over route values, used when matching and
/// when generating links) or an outbound transformer (rewrites a value's text
/// before it is written into a generated path).
///
/// # Design Decisions
/// - Constraints see the whole value dictionary, not only their own key
/// - Composite constraints use AND semantics and stop at the first failure
/// - An optional parameter's constraints are wrapped so absence succeeds

use std::fmt;
use std::sync::Arc;

use crate::values::RouteValueDictionary;

pub mod builtin;
pub mod evaluator;
pub mod resolver;

pub use builtin::{
    AlphaConstraint, BoolConstraint, DateTimeConstraint, DecimalConstraint, DoubleConstraint,
    FileNameConstraint, FloatConstraint, GuidConstraint, IntConstraint, LengthConstraint,
    LongConstraint, MaxConstraint, MaxLengthConstraint, MinConstraint, MinLengthConstraint,
    NonFileNameConstraint, RangeConstraint, RegexConstraint, RequiredConstraint,
    SlugifyTransformer,
};
pub use evaluator::process_constraints;
pub use resolver::{
    ConstraintBuilder, ConstraintMap, ConstraintSet, ParameterPolicyResolver, PolicyFactory,
    ResolvedPolicies, ServiceKey, Services,
};

/// Which operation is evaluating a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteDirection {
    /// Matching an incoming request path
    IncomingRequest,
    /// Generating a link
    UrlGeneration,
}

/// Predicate over route values
pub trait RouteConstraint: Send + Sync + fmt::Debug {
    /// Returns true if the value stored under `route_key` is acceptable
    fn matches(
        &self,
        route_key: &str,
        values: &RouteValueDictionary,
        direction: RouteDirection,
    ) -> bool;

    /// Whether the constraint must run even when the key has no value
    fn requires_value(&self) -> bool {
        false
    }
}

/// Rewrites parameter text on the way out
pub trait ParameterTransformer: Send + Sync + fmt::Debug {
    fn transform_outbound(&self, value: &str) -> String;
}

/// A resolved policy instance
#[derive(Clone)]
pub enum ParameterPolicy {
    Constraint(Arc<dyn RouteConstraint>),
    Transformer(Arc<dyn ParameterTransformer>),
}

impl ParameterPolicy {
    pub fn constraint(constraint: impl RouteConstraint + 'static) -> Self {
        ParameterPolicy::Constraint(Arc::new(constraint))
    }

    pub fn transformer(transformer: impl ParameterTransformer + 'static) -> Self {
        ParameterPolicy::Transformer(Arc::new(transformer))
    }

    pub fn as_constraint(&self) -> Option<&Arc<dyn RouteConstraint>> {
        match self {
            ParameterPolicy::Constraint(constraint) => Some(constraint),
            ParameterPolicy::Transformer(_) => None,
        }
    }

    /// Identity comparison of the underlying instance
    pub fn same_instance(&self, other: &ParameterPolicy) -> bool {
        match (self, other) {
            (ParameterPolicy::Constraint(a), ParameterPolicy::Constraint(b)) => {
                Arc::ptr_eq(a, b)
            }
            (ParameterPolicy::Transformer(a), ParameterPolicy::Transformer(b)) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ParameterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterPolicy::Constraint(constraint) => fmt::Debug::fmt(constraint, f),
            ParameterPolicy::Transformer(transformer) => fmt::Debug::fmt(transformer, f),
        }
    }
}

/// Several constraints on one key, all of which must pass
#[derive(Debug, Clone)]
pub struct CompositeConstraint {
    constraints: Vec<Arc<dyn RouteConstraint>>,
}

impl CompositeConstraint {
    pub fn new(constraints: Vec<Arc<dyn RouteConstraint>>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[Arc<dyn RouteConstraint>] {
        &self.constraints
    }
}

impl RouteConstraint for CompositeConstraint {
    fn matches(
        &self,
        route_key: &str,
        values: &RouteValueDictionary,
        direction: RouteDirection,
    ) -> bool {
        self.constraints
            .iter()
            .all(|c| c.matches(route_key, values, direction))
    }

    fn requires_value(&self) -> bool {
        self.constraints.iter().any(|c| c.requires_value())
    }
}

/// Succeeds when the value is absent, otherwise delegates
#[derive(Debug, Clone)]
pub struct OptionalConstraint {
    inner: Arc<dyn RouteConstraint>,
}

impl OptionalConstraint {
    pub fn new(inner: Arc<dyn RouteConstraint>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn RouteConstraint> {
        &self.inner
    }
}

impl RouteConstraint for OptionalConstraint {
    fn matches(
        &self,
        route_key: &str,
        values: &RouteValueDictionary,
        direction: RouteDirection,
    ) -> bool {
        match values.get(route_key) {
            Some(value) if !value.is_empty() => self.inner.matches(route_key, values, direction),
            _ => true,
        }
    }
}
