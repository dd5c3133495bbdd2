// Routing options: loading and registry customization

use std::fs;
use std::sync::Arc;

use rhtmx_routing::constraint::{ParameterPolicy, PolicyFactory, RegexConstraint};
use rhtmx_routing::{EndpointBuilder, EndpointDataSource, RouteOptions, Router};
use tempfile::TempDir;

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rhtmx.toml");
    fs::write(
        &path,
        r#"
        [server]
        port = 3000

        [routing]
        lowercase_urls = true
        lowercase_query_strings = true
        case_insensitive = false
        "#,
    )
    .unwrap();

    let options = RouteOptions::load(&path).unwrap();
    assert!(options.lowercase_urls);
    assert!(options.lowercases_query());
    assert!(!options.case_insensitive);
    assert!(!options.append_trailing_slash);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let options = RouteOptions::load(dir.path().join("absent.toml")).unwrap();
    assert!(options.case_insensitive);
    assert!(!options.lowercase_urls);
}

#[test]
fn test_invalid_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[routing]\nlowercase_urls = \"yes\"\n").unwrap();

    let err = RouteOptions::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.toml"));
}

#[test]
fn test_custom_constraint_through_options() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let options = RouteOptions::default().with_constraint(
        "sku",
        PolicyFactory::new().constructor(0, |_| {
            RegexConstraint::new("^[A-Z]{3}-\\d{4}$")
                .map(ParameterPolicy::constraint)
                .map_err(|e| e.to_string())
        }),
    );
    let resolver = options.policy_resolver();
    let source = Arc::new(EndpointDataSource::new(vec![
        EndpointBuilder::from_template("stock/{code:sku}").build(&resolver).unwrap(),
    ]));
    let router = Router::new(source, options);

    assert!(router.route("/stock/ABC-1234").is_some());
    assert!(router.route("/stock/abc-1234").is_some());
    assert!(router.route("/stock/ABC-12").is_none());
}
