/// Constraint evaluation
///
/// Runs an endpoint's constraint set against a value dictionary. Used by
/// the matcher for incoming paths and by the binder for generated links.

use tracing::debug;

use super::{ConstraintSet, RouteDirection};
use crate::values::RouteValueDictionary;

/// Returns true when every applicable constraint accepts `values`
///
/// A key with no value (absent or null) is skipped unless its constraint
/// requires a value. Evaluation stops at the first rejection. Rejections of
/// incoming requests are logged; generation fails silently.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::{
///     process_constraints, ConstraintBuilder, ParameterPolicyResolver, RouteDirection,
/// };
/// use rhtmx_routing::RouteValueDictionary;
///
/// let resolver = ParameterPolicyResolver::default();
/// let set = ConstraintBuilder::new(&resolver).add_resolved("id", "int").unwrap().build();
///
/// let good = RouteValueDictionary::from([("id", "7")]);
/// let bad = RouteValueDictionary::from([("id", "seven")]);
/// let missing = RouteValueDictionary::new();
///
/// assert!(process_constraints(Some(&set), &good, RouteDirection::IncomingRequest));
/// assert!(!process_constraints(Some(&set), &bad, RouteDirection::IncomingRequest));
/// assert!(process_constraints(Some(&set), &missing, RouteDirection::UrlGeneration));
/// assert!(process_constraints(None, &bad, RouteDirection::IncomingRequest));
/// ```
pub fn process_constraints(
    constraints: Option<&ConstraintSet>,
    values: &RouteValueDictionary,
    direction: RouteDirection,
) -> bool {
    let Some(constraints) = constraints else {
        return true;
    };

    for (key, constraint) in constraints.iter() {
        let has_value = values.get(key).is_some_and(|value| !value.is_null());
        if !has_value && !constraint.requires_value() {
            continue;
        }

        if !constraint.matches(key, values, direction) {
            if direction == RouteDirection::IncomingRequest {
                debug!(
                    parameter = key,
                    value = %values.get(key).map(ToString::to_string).unwrap_or_default(),
                    constraint = ?constraint,
                    "Route value rejected by constraint"
                );
            }
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ConstraintBuilder, ParameterPolicyResolver, RequiredConstraint};
    use crate::values::RouteValue;
    use std::sync::Arc;

    #[test]
    fn test_null_value_is_skipped() {
        let resolver = ParameterPolicyResolver::default();
        let set = ConstraintBuilder::new(&resolver)
            .add_resolved("id", "int")
            .unwrap()
            .build();
        let values = RouteValueDictionary::new().with("id", RouteValue::Null);
        assert!(process_constraints(Some(&set), &values, RouteDirection::IncomingRequest));
    }

    #[test]
    fn test_required_runs_without_value() {
        let resolver = ParameterPolicyResolver::default();
        let set = ConstraintBuilder::new(&resolver)
            .add("id", Arc::new(RequiredConstraint))
            .build();
        let values = RouteValueDictionary::new();
        assert!(!process_constraints(Some(&set), &values, RouteDirection::UrlGeneration));
    }
}
