// Incoming path matching

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rhtmx_routing::{
    EndpointBuilder, EndpointDataSource, LinkGenerator, RouteOptions, RouteValueDictionary, Router,
};
use rstest::rstest;

fn router(builders: Vec<EndpointBuilder>) -> Router {
    router_with(builders, RouteOptions::default())
}

fn router_with(builders: Vec<EndpointBuilder>, options: RouteOptions) -> Router {
    let resolver = options.policy_resolver();
    let endpoints = builders
        .into_iter()
        .map(|builder| builder.build(&resolver).unwrap())
        .collect();
    Router::new(Arc::new(EndpointDataSource::new(endpoints)), options)
}

fn matched_name(router: &Router, path: &str) -> Option<String> {
    router
        .route(path)
        .map(|matched| matched.endpoint.display_name.clone())
}

#[test]
fn test_conventional_route_without_optional_id() {
    let router = router(vec![EndpointBuilder::from_template("{controller}/{action}/{id?}")]);
    let matched = router.route("/Home/Index").unwrap();

    assert_eq!(matched.get_value("controller").as_deref(), Some("Home"));
    assert_eq!(matched.get_value("action").as_deref(), Some("Index"));
    assert!(!matched.values.contains_key("id"));
    assert_eq!(matched.values.len(), 2);
}

#[test]
fn test_defaults_fill_missing_segments() {
    let router = router(vec![EndpointBuilder::from_template("{controller=Home}/{action=Index}")]);
    let matched = router.route("/").unwrap();
    assert_eq!(matched.get_value("controller").as_deref(), Some("Home"));
    assert_eq!(matched.get_value("action").as_deref(), Some("Index"));
}

#[test]
fn test_literal_beats_parameter_regardless_of_registration() {
    let router = router(vec![
        EndpointBuilder::from_template("products/{id}").with_display_name("by-id"),
        EndpointBuilder::from_template("products/new").with_display_name("new"),
        EndpointBuilder::from_template("products/{*rest}").with_display_name("rest"),
    ]);

    assert_eq!(matched_name(&router, "/products/new").as_deref(), Some("new"));
    assert_eq!(matched_name(&router, "/products/12").as_deref(), Some("by-id"));
    assert_eq!(matched_name(&router, "/products/12/reviews").as_deref(), Some("rest"));
}

#[test]
fn test_order_overrides_precedence() {
    let router = router(vec![
        EndpointBuilder::from_template("products/new").with_display_name("new"),
        EndpointBuilder::from_template("products/{id}")
            .with_display_name("by-id")
            .with_order(-1),
    ]);
    assert_eq!(matched_name(&router, "/products/new").as_deref(), Some("by-id"));
}

#[test]
fn test_constraint_rejection_falls_through() {
    let router = router(vec![
        EndpointBuilder::from_template("items/{id:int}").with_display_name("numeric"),
        EndpointBuilder::from_template("items/{slug:alpha}").with_display_name("alpha"),
    ]);

    assert_eq!(matched_name(&router, "/items/7").as_deref(), Some("numeric"));
    assert_eq!(matched_name(&router, "/items/abc").as_deref(), Some("alpha"));
    assert_eq!(matched_name(&router, "/items/a-1"), None);
}

#[rstest]
#[case("/docs", None)]
#[case("/docs/intro", Some("intro"))]
#[case("/docs/guide/setup%20notes", Some("guide/setup notes"))]
#[case("/docs/a/b/", Some("a/b"))]
fn test_catch_all_captures_remainder(#[case] path: &str, #[case] expected: Option<&str>) {
    let router = router(vec![EndpointBuilder::from_template("docs/{**path}")]);
    let matched = router.route(path).unwrap();
    assert_eq!(matched.get_value("path").as_deref(), expected);
}

#[test]
fn test_catch_all_default() {
    let router = router(vec![EndpointBuilder::from_template("docs/{*path=index}")]);
    let matched = router.route("/docs").unwrap();
    assert_eq!(matched.get_value("path").as_deref(), Some("index"));
}

#[rstest]
#[case("/files/report.pdf", Some("report"), Some("pdf"))]
#[case("/files/archive.tar.gz", Some("archive.tar"), Some("gz"))]
#[case("/files/report", Some("report"), None)]
fn test_optional_extension(
    #[case] path: &str,
    #[case] name: Option<&str>,
    #[case] ext: Option<&str>,
) {
    let router = router(vec![EndpointBuilder::from_template("files/{name}.{ext?}")]);
    let matched = router.route(path).unwrap();
    assert_eq!(matched.get_value("name").as_deref(), name);
    assert_eq!(matched.get_value("ext").as_deref(), ext);
}

#[test]
fn test_empty_segments_never_match() {
    let router = router(vec![EndpointBuilder::from_template("{controller}/{action}/{id?}")]);
    assert!(router.route("/Home//7").is_none());
}

#[test]
fn test_literal_case_sensitivity_is_configurable() {
    let builders = || vec![EndpointBuilder::from_template("about/team")];
    assert!(router(builders()).route("/ABOUT/Team").is_some());

    let strict = RouteOptions {
        case_insensitive: false,
        ..RouteOptions::default()
    };
    let router = router_with(builders(), strict);
    assert!(router.route("/ABOUT/Team").is_none());
    assert!(router.route("/about/team").is_some());
}

#[test]
fn test_suppressed_endpoints_are_not_matched() {
    let router = router(vec![EndpointBuilder::from_template("hidden").suppress_matching()]);
    assert!(router.route("/hidden").is_none());
}

#[test]
fn test_handler_is_returned_with_match() {
    let router = router(vec![EndpointBuilder::from_template("ping").with_handler("pong")]);
    let matched = router.route("/ping").unwrap();
    assert_eq!(matched.endpoint.handler_as::<&str>().as_deref(), Some(&"pong"));
}

#[test]
fn test_generated_links_route_back() {
    let options = RouteOptions::default();
    let resolver = options.policy_resolver();
    let source = Arc::new(EndpointDataSource::new(vec![
        EndpointBuilder::from_template("blog/{year:int}/{month:range(1,12)}/{slug}")
            .with_name("post")
            .build(&resolver)
            .unwrap(),
    ]));
    let router = Router::new(Arc::clone(&source), options.clone());
    let links = LinkGenerator::new(source, options);

    let values = RouteValueDictionary::from([("year", "2024"), ("month", "5"), ("slug", "hello world")]);
    let path = links.generate_by_name("post", &values, None, None).unwrap().unwrap();
    assert_eq!(path, "/blog/2024/5/hello%20world");

    let matched = router.route(&path).unwrap();
    assert_eq!(matched.values, values);
}

#[test]
fn test_router_follows_new_generations() {
    let options = RouteOptions::default();
    let resolver = options.policy_resolver();
    let source = Arc::new(EndpointDataSource::new(vec![
        EndpointBuilder::from_template("old").build(&resolver).unwrap(),
    ]));
    let router = Router::new(Arc::clone(&source), options);

    let before = router.matcher();
    assert!(router.route("/old").is_some());

    source.replace(vec![EndpointBuilder::from_template("new").build(&resolver).unwrap()]);
    assert!(router.route("/old").is_none());
    assert!(router.route("/new").is_some());

    // A matcher taken earlier keeps answering for its own generation.
    assert!(before.match_path("/old").is_some());
}
