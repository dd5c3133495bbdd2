// Constraint resolution and evaluation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rhtmx_routing::constraint::{
    process_constraints, ConstraintBuilder, ConstraintMap, ParameterPolicy,
    ParameterPolicyResolver, PolicyFactory, RouteConstraint, RouteDirection, ServiceKey, Services,
};
use rhtmx_routing::{PolicyError, RouteValueDictionary};
use rstest::rstest;

#[derive(Debug)]
struct Counting {
    accept: bool,
    calls: Arc<AtomicUsize>,
}

impl RouteConstraint for Counting {
    fn matches(&self, _: &str, _: &RouteValueDictionary, _: RouteDirection) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accept
    }
}

fn check(text: &str, value: &str) -> bool {
    let resolver = ParameterPolicyResolver::default();
    let constraint = resolver.resolve_constraint("p", text).unwrap();
    let values = RouteValueDictionary::from([("p", value)]);
    constraint.matches("p", &values, RouteDirection::IncomingRequest)
}

#[test]
fn test_evaluation_stops_at_first_failure() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let resolver = ParameterPolicyResolver::default();
    let set = ConstraintBuilder::new(&resolver)
        .add(
            "a",
            Arc::new(Counting {
                accept: false,
                calls: Arc::clone(&first),
            }),
        )
        .add(
            "b",
            Arc::new(Counting {
                accept: true,
                calls: Arc::clone(&second),
            }),
        )
        .build();

    let values = RouteValueDictionary::from([("a", "1"), ("b", "2")]);
    assert!(!process_constraints(Some(&set), &values, RouteDirection::IncomingRequest));
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[test]
fn test_string_constraint_matches_whole_value_ignoring_case() {
    let resolver = ParameterPolicyResolver::default();
    let set = ConstraintBuilder::new(&resolver)
        .add_pattern("controller", "abc")
        .unwrap()
        .build();

    let matches = |value: &str| {
        let values = RouteValueDictionary::from([("controller", value)]);
        process_constraints(Some(&set), &values, RouteDirection::IncomingRequest)
    };
    assert!(matches("Abc"));
    assert!(!matches("Abcd"));
}

#[rstest]
#[case("int", "42", true)]
#[case("int", "4.2", false)]
#[case("int", "99999999999", false)]
#[case("long", "99999999999", true)]
#[case("bool", "True", true)]
#[case("bool", "yes", false)]
#[case("double", "-1.5e3", true)]
#[case("decimal", "1.5e3", false)]
#[case("guid", "{0f8fad5b-d9cb-469f-a165-70867728950e}", true)]
#[case("guid", "not-a-guid", false)]
#[case("datetime", "2024-02-29", true)]
#[case("datetime", "2023-02-29", false)]
#[case("alpha", "abcXYZ", true)]
#[case("alpha", "abc1", false)]
#[case("min(10)", "10", true)]
#[case("max(10)", "11", false)]
#[case("range(1, 5)", "3", true)]
#[case("length(3)", "abcd", false)]
#[case("length(2,4)", "abc", true)]
#[case("minlength(2)", "a", false)]
#[case("maxlength(2)", "ab", true)]
#[case("regex(^\\d{3}$)", "123", true)]
#[case("regex(^\\d{1,3}$)", "1234", false)]
#[case("regex(b)", "ABC", true)]
#[case("file", "photo.jpg", true)]
#[case("file", "photos", false)]
#[case("nonfile", "photos", true)]
fn test_builtin_constraints(#[case] text: &str, #[case] value: &str, #[case] expected: bool) {
    assert_eq!(check(text, value), expected, "{} on {:?}", text, value);
}

#[test]
fn test_required_runs_without_a_value() {
    let resolver = ParameterPolicyResolver::default();
    let set = ConstraintBuilder::new(&resolver)
        .add_resolved("id", "required")
        .unwrap()
        .build();
    let empty = RouteValueDictionary::new();
    assert!(!process_constraints(Some(&set), &empty, RouteDirection::UrlGeneration));
}

#[test]
fn test_activation_errors() {
    let resolver = ParameterPolicyResolver::default();

    assert!(matches!(
        resolver.resolve_constraint("id", "unknown").unwrap_err(),
        PolicyError::UnresolvedPolicy { name, .. } if name == "unknown"
    ));
    assert!(matches!(
        resolver.resolve_constraint("id", "int(3)").unwrap_err(),
        PolicyError::NoMatchingConstructor { arguments: 1, .. }
    ));
    assert!(matches!(
        resolver.resolve_constraint("id", "range(5,1)").unwrap_err(),
        PolicyError::InvalidArgument { .. }
    ));
    assert!(matches!(
        resolver.resolve_constraint("id", "slugify").unwrap_err(),
        PolicyError::InvalidPolicyType { .. }
    ));
}

#[test]
fn test_ambiguous_constructor() {
    let factory = PolicyFactory::new()
        .constructor(0, |_| Ok(ParameterPolicy::constraint(AlwaysTrue)))
        .constructor(0, |_| Ok(ParameterPolicy::constraint(AlwaysTrue)));
    let resolver = ParameterPolicyResolver::new(ConstraintMap::default().with("twice", factory));

    assert!(matches!(
        resolver.resolve_constraint("id", "twice").unwrap_err(),
        PolicyError::AmbiguousConstructor { arguments: 0, .. }
    ));
}

#[derive(Debug)]
struct AlwaysTrue;

impl RouteConstraint for AlwaysTrue {
    fn matches(&self, _: &str, _: &RouteValueDictionary, _: RouteDirection) -> bool {
        true
    }
}

// ============================================================================
// Service-backed constraints
// ============================================================================

#[derive(Debug)]
struct Catalog {
    names: Vec<String>,
}

#[derive(Debug)]
struct InCatalog {
    catalog: Arc<Catalog>,
}

impl RouteConstraint for InCatalog {
    fn matches(&self, key: &str, values: &RouteValueDictionary, _: RouteDirection) -> bool {
        values
            .get_text(key)
            .is_some_and(|text| self.catalog.names.iter().any(|n| n.eq_ignore_ascii_case(&text)))
    }
}

fn catalog_factory() -> PolicyFactory {
    PolicyFactory::new().constructor_with_services(
        0,
        vec![ServiceKey::of::<Catalog>()],
        |_, services| {
            let catalog = services
                .get::<Catalog>()
                .ok_or_else(|| "catalog not registered".to_string())?;
            Ok(ParameterPolicy::constraint(InCatalog { catalog }))
        },
    )
}

#[test]
fn test_service_backed_constraint() {
    let services = Services::new().with(Catalog {
        names: vec!["shoes".to_string(), "hats".to_string()],
    });
    let resolver = ParameterPolicyResolver::new(ConstraintMap::default().with("known", catalog_factory()))
        .with_services(services);

    let constraint = resolver.resolve_constraint("category", "known").unwrap();
    let hats = RouteValueDictionary::from([("category", "Hats")]);
    let socks = RouteValueDictionary::from([("category", "socks")]);
    assert!(constraint.matches("category", &hats, RouteDirection::IncomingRequest));
    assert!(!constraint.matches("category", &socks, RouteDirection::IncomingRequest));
}

#[test]
fn test_missing_service() {
    let resolver =
        ParameterPolicyResolver::new(ConstraintMap::default().with("known", catalog_factory()));
    assert!(matches!(
        resolver.resolve_constraint("category", "known").unwrap_err(),
        PolicyError::MissingService { .. }
    ));
}

#[test]
fn test_registry_names_are_case_insensitive() {
    let map = ConstraintMap::default();
    assert!(map.contains("INT"));
    assert!(map.contains("MinLength"));
    assert!(!ConstraintMap::empty().contains("int"));
}
