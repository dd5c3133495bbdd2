// Link generation by name and by values

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rhtmx_routing::{
    EndpointBuilder, EndpointDataSource, LinkGenerator, LinkOptions, RouteOptions,
    RoutePatternBuilder, RouteValueDictionary, RoutingError, UriComponents,
};

fn generator(builders: Vec<EndpointBuilder>) -> (Arc<EndpointDataSource>, LinkGenerator) {
    generator_with(builders, RouteOptions::default())
}

fn generator_with(
    builders: Vec<EndpointBuilder>,
    options: RouteOptions,
) -> (Arc<EndpointDataSource>, LinkGenerator) {
    let resolver = options.policy_resolver();
    let endpoints = builders
        .into_iter()
        .map(|builder| builder.build(&resolver).unwrap())
        .collect();
    let source = Arc::new(EndpointDataSource::new(endpoints));
    (Arc::clone(&source), LinkGenerator::new(source, options))
}

fn conventional(controller: &str, action: &str) -> EndpointBuilder {
    let template = "{controller}/{action}/{id?}";
    EndpointBuilder::from_pattern_builder(
        RoutePatternBuilder::new(template)
            .with_required_value("controller", controller)
            .with_required_value("action", action),
        template,
    )
    .with_display_name(format!("{}.{}", controller, action))
}

fn values<const N: usize>(pairs: [(&str, &str); N]) -> RouteValueDictionary {
    RouteValueDictionary::from(pairs)
}

#[test]
fn test_mismatched_ambient_values_are_discarded() {
    let (_, links) = generator(vec![
        conventional("Pets", "Update"),
        conventional("Pets", "GetById"),
    ]);

    let ambient = values([("controller", "Pets"), ("action", "Update"), ("id", "17")]);
    let required = values([("controller", "Pets"), ("action", "GetById")]);
    let path = links.generate_by_values(&required, &RouteValueDictionary::new(), Some(&ambient), None);
    assert_eq!(path.as_deref(), Some("/Pets/GetById"));
}

#[test]
fn test_matching_ambient_values_are_reused() {
    let (_, links) = generator(vec![conventional("Pets", "GetById")]);

    let ambient = values([("controller", "Pets"), ("action", "GetById"), ("id", "17")]);
    let required = values([("controller", "Pets"), ("action", "GetById")]);
    let path = links.generate_by_values(&required, &RouteValueDictionary::new(), Some(&ambient), None);
    assert_eq!(path.as_deref(), Some("/Pets/GetById/17"));
}

#[test]
fn test_discard_applies_to_named_endpoints() {
    let template = "pets/{id?}";
    let (_, links) = generator(vec![EndpointBuilder::from_pattern_builder(
        RoutePatternBuilder::new(template)
            .with_default("action", "GetById")
            .with_required_value("action", "GetById"),
        template,
    )
    .with_name("pet")]);
    let none = RouteValueDictionary::new();

    let other_action = values([("action", "Update"), ("id", "17")]);
    assert_eq!(
        links.generate_by_name("pet", &none, Some(&other_action), None).unwrap().as_deref(),
        Some("/pets")
    );

    let same_action = values([("action", "getbyid"), ("id", "17")]);
    assert_eq!(
        links.generate_by_name("pet", &none, Some(&same_action), None).unwrap().as_deref(),
        Some("/pets/17")
    );
}

#[test]
fn test_by_values_with_explicit_extras() {
    let (_, links) = generator(vec![
        conventional("Home", "Index"),
        conventional("Products", "List"),
    ]);

    let required = values([("controller", "Products"), ("action", "List")]);
    let explicit = values([("page", "2")]);
    let path = links.generate_by_values(&required, &explicit, None, None);
    assert_eq!(path.as_deref(), Some("/Products/List?page=2"));

    let unknown = values([("controller", "Orders"), ("action", "List")]);
    assert_eq!(links.generate_by_values(&unknown, &explicit, None, None), None);
}

#[test]
fn test_duplicate_names_are_a_configuration_error() {
    let (_, links) = generator(vec![
        EndpointBuilder::from_template("a").with_name("home").with_display_name("First"),
        EndpointBuilder::from_template("b").with_name("Home").with_display_name("Second"),
    ]);

    let err = links
        .generate_by_name("home", &RouteValueDictionary::new(), None, None)
        .unwrap_err();
    assert!(matches!(err, RoutingError::AmbiguousName(ref groups) if groups.len() == 1));

    let message = err.to_string();
    assert!(message.contains("First"));
    assert!(message.contains("Second"));
}

#[test]
fn test_unknown_name_yields_no_link() {
    let (_, links) = generator(vec![EndpointBuilder::from_template("a").with_name("a")]);
    let path = links
        .generate_by_name("missing", &RouteValueDictionary::new(), None, None)
        .unwrap();
    assert_eq!(path, None);
}

#[test]
fn test_link_options_override_route_options() {
    let options = RouteOptions {
        lowercase_urls: true,
        ..RouteOptions::default()
    };
    let (_, links) = generator_with(
        vec![EndpointBuilder::from_template("Users/{name}").with_name("user")],
        options,
    );
    let explicit = values([("name", "Ada"), ("Tab", "Posts")]);

    assert_eq!(
        links.generate_by_name("user", &explicit, None, None).unwrap().as_deref(),
        Some("/users/ada?Tab=Posts")
    );

    let per_call = LinkOptions::new()
        .with_lowercase_urls(false)
        .with_trailing_slash(true);
    assert_eq!(
        links
            .generate_by_name("user", &explicit, None, Some(&per_call))
            .unwrap()
            .as_deref(),
        Some("/Users/Ada/?Tab=Posts")
    );

    let lower_query = LinkOptions::new().with_lowercase_query_strings(true);
    assert_eq!(
        links
            .generate_by_name("user", &explicit, None, Some(&lower_query))
            .unwrap()
            .as_deref(),
        Some("/users/ada?tab=posts")
    );
}

#[test]
fn test_uri_variants() {
    let (_, links) = generator(vec![
        conventional("Docs", "Read").with_name("docs"),
    ]);
    let explicit = values([("id", "7")]);
    let required = values([("controller", "Docs"), ("action", "Read")]);
    let components = UriComponents::new("https", "example.com:8443")
        .with_path_base("/base")
        .with_fragment("section 2");

    let by_values = links
        .get_uri_by_values(&required, &explicit, None, &components, None)
        .unwrap();
    assert_eq!(
        by_values.as_deref(),
        Some("https://example.com:8443/base/Docs/Read/7#section%202")
    );

    let mut by_name_values = explicit.clone();
    by_name_values.merge(&required);
    let by_name = links
        .get_uri_by_name("docs", &by_name_values, None, &components, None)
        .unwrap();
    assert_eq!(by_name, by_values);

    let path = links.get_path_by_values(&required, &explicit, None, "/", "", None);
    assert_eq!(path.as_deref(), Some("/Docs/Read/7"));

    let no_host = UriComponents::new("https", "");
    assert!(matches!(
        links.get_uri_by_values(&required, &explicit, None, &no_host, None),
        Err(RoutingError::InvalidArgument(_))
    ));
}

#[test]
fn test_links_follow_new_generations() {
    let (source, links) = generator(vec![EndpointBuilder::from_template("v1/status").with_name("status")]);
    let none = RouteValueDictionary::new();
    assert_eq!(
        links.generate_by_name("status", &none, None, None).unwrap().as_deref(),
        Some("/v1/status")
    );

    let resolver = links.options().policy_resolver();
    source.replace(vec![EndpointBuilder::from_template("v2/status")
        .with_name("status")
        .build(&resolver)
        .unwrap()]);
    assert_eq!(
        links.generate_by_name("status", &none, None, None).unwrap().as_deref(),
        Some("/v2/status")
    );
}
