// File: src/config.rs
// Purpose: Routing options, loadable from a TOML file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constraint::{ConstraintMap, ParameterPolicyResolver, PolicyFactory, Services};

/// Routing options shared by the matcher and the link generator
///
/// # Examples
///
/// ```
/// use rhtmx_routing::RouteOptions;
///
/// let options = RouteOptions::from_toml_str(
///     r#"
///     [routing]
///     lowercase_urls = true
///     "#,
/// )
/// .unwrap();
/// assert!(options.lowercase_urls);
/// assert!(options.case_insensitive);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Lower-case generated paths (default: false)
    #[serde(default = "default_false")]
    pub lowercase_urls: bool,

    /// Also lower-case generated query strings; needs `lowercase_urls` (default: false)
    #[serde(default = "default_false")]
    pub lowercase_query_strings: bool,

    /// Append `/` to generated paths (default: false)
    #[serde(default = "default_false")]
    pub append_trailing_slash: bool,

    /// Compare literal path segments case-insensitively when matching (default: true)
    #[serde(default = "default_true")]
    pub case_insensitive: bool,

    /// Registry used to resolve constraint clauses
    #[serde(skip)]
    pub constraint_map: ConstraintMap,

    /// Services available to constraint factories
    #[serde(skip)]
    pub services: Services,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            lowercase_urls: false,
            lowercase_query_strings: false,
            append_trailing_slash: false,
            case_insensitive: true,
            constraint_map: ConstraintMap::default(),
            services: Services::default(),
        }
    }
}

impl RouteOptions {
    /// Load options from a TOML file
    ///
    /// A missing or empty file yields the defaults. Keys may sit in a
    /// `[routing]` table or at the top level.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let table: toml::Table = toml::from_str(content).context("Invalid TOML")?;
        let options: RouteOptions = match table.get("routing").cloned() {
            Some(routing) => routing.try_into(),
            None => toml::Value::Table(table).try_into(),
        }
        .context("Invalid routing options")?;

        Ok(options)
    }

    /// Registers a custom constraint under `name`
    pub fn with_constraint(mut self, name: impl AsRef<str>, factory: PolicyFactory) -> Self {
        self.constraint_map.register(name, factory);
        self
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Resolver over this options' registry and services
    pub fn policy_resolver(&self) -> ParameterPolicyResolver {
        ParameterPolicyResolver::new(self.constraint_map.clone())
            .with_services(self.services.clone())
    }

    /// Whether generated query strings are lower-cased
    pub fn lowercases_query(&self) -> bool {
        self.lowercase_urls && self.lowercase_query_strings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RouteOptions::default();
        assert!(!options.lowercase_urls);
        assert!(!options.append_trailing_slash);
        assert!(options.case_insensitive);
        assert!(options.constraint_map.contains("int"));
    }

    #[test]
    fn test_empty_config() {
        let options = RouteOptions::from_toml_str("").unwrap();
        assert!(options.case_insensitive);
    }

    #[test]
    fn test_top_level_keys() {
        let toml = r#"
            case_insensitive = false
            append_trailing_slash = true
        "#;
        let options = RouteOptions::from_toml_str(toml).unwrap();
        assert!(!options.case_insensitive);
        assert!(options.append_trailing_slash);
    }

    #[test]
    fn test_query_lowercasing_needs_url_lowercasing() {
        let options = RouteOptions {
            lowercase_query_strings: true,
            ..RouteOptions::default()
        };
        assert!(!options.lowercases_query());
    }
}
