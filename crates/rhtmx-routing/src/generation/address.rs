/// Address schemes: finding candidate endpoints for link generation
///
/// A `LinkIndex` is compiled per endpoint generation from the endpoints
/// that allow link generation, sorted by (order, precedence, registration
/// index). It answers two kinds of lookup:
/// - by name, case-insensitive; duplicate names are a configuration error
/// - by values, through a decision tree over each endpoint's concrete
///   required values

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::decision_tree::{Classifier, DecisionTree};
use crate::endpoint::{Endpoint, EndpointCollection};
use crate::error::{DuplicateName, Result, RoutingError};
use crate::route::RequiredValue;
use crate::values::{fold_case, parts_equal, RouteValueDictionary};

/// Criteria: the endpoint's exact required values, null as ""
struct RequiredValues;

impl Classifier<Arc<Endpoint>> for RequiredValues {
    fn criteria(&self, endpoint: &Arc<Endpoint>) -> Vec<(String, String)> {
        endpoint
            .pattern
            .required_values
            .iter()
            .filter_map(|(key, required)| match required {
                RequiredValue::Exact(value) => Some((
                    key.clone(),
                    value.as_text().map(|text| text.into_owned()).unwrap_or_default(),
                )),
                RequiredValue::Any => None,
            })
            .collect()
    }
}

/// Per-generation lookup structure for link generation
#[derive(Debug)]
pub struct LinkIndex {
    by_name: HashMap<String, Vec<Arc<Endpoint>>>,
    duplicates: Vec<DuplicateName>,
    by_values: DecisionTree<Arc<Endpoint>>,
}

impl LinkIndex {
    pub fn new(endpoints: &[Arc<Endpoint>]) -> Self {
        let mut eligible: Vec<(usize, &Arc<Endpoint>)> = endpoints
            .iter()
            .enumerate()
            .filter(|(_, endpoint)| !endpoint.metadata.suppress_link_generation)
            .collect();
        eligible.sort_by(|(ia, a), (ib, b)| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.precedence.cmp(&b.precedence))
                .then_with(|| ia.cmp(ib))
        });
        let eligible: Vec<Arc<Endpoint>> = eligible
            .into_iter()
            .map(|(_, endpoint)| Arc::clone(endpoint))
            .collect();

        let mut by_name: HashMap<String, Vec<Arc<Endpoint>>> = HashMap::new();
        let mut name_order: Vec<String> = Vec::new();
        for endpoint in &eligible {
            let Some(name) = endpoint.name() else {
                continue;
            };
            let key = fold_case(name);
            let group = by_name.entry(key.clone()).or_insert_with(|| {
                name_order.push(key);
                Vec::new()
            });
            if !group.iter().any(|existing| Arc::ptr_eq(existing, endpoint)) {
                group.push(Arc::clone(endpoint));
            }
        }

        let duplicates: Vec<DuplicateName> = name_order
            .iter()
            .filter_map(|key| {
                let group = by_name.get(key)?;
                (group.len() > 1).then(|| DuplicateName {
                    name: group[0].name().unwrap_or(key).to_string(),
                    display_names: group.iter().map(|e| e.display_name.clone()).collect(),
                })
            })
            .collect();

        for duplicate in &duplicates {
            warn!(
                name = %duplicate.name,
                endpoints = ?duplicate.display_names,
                "Duplicate endpoint name"
            );
        }

        Self {
            by_name,
            duplicates,
            by_values: DecisionTree::build(eligible, &RequiredValues),
        }
    }

    pub fn from_collection(collection: &EndpointCollection) -> Self {
        Self::new(&collection.endpoints)
    }

    pub fn duplicates(&self) -> &[DuplicateName] {
        &self.duplicates
    }

    /// Endpoints registered under `name`
    ///
    /// Fails with `AmbiguousName` while any name is shared by several
    /// endpoints.
    pub fn find_by_name(&self, name: &str) -> Result<&[Arc<Endpoint>]> {
        if !self.duplicates.is_empty() {
            return Err(RoutingError::AmbiguousName(self.duplicates.clone()));
        }
        Ok(self
            .by_name
            .get(&fold_case(name))
            .map_or(&[], Vec::as_slice))
    }

    /// Candidates whose concrete required values agree with the explicit
    /// values, or with the ambient values for keys not given explicitly
    pub fn find_by_values(
        &self,
        explicit: &RouteValueDictionary,
        ambient: Option<&RouteValueDictionary>,
    ) -> Vec<Arc<Endpoint>> {
        self.by_values
            .walk(&RequiredValues, |key| {
                if explicit.contains_key(key) {
                    return vec![explicit.get_text(key).map(|t| t.into_owned()).unwrap_or_default()];
                }
                match ambient.and_then(|values| values.get_text(key)) {
                    Some(text) => vec![text.into_owned(), String::new()],
                    None => vec![String::new()],
                }
            })
            .into_iter()
            .cloned()
            .collect()
    }
}

/// Ambient values usable for `endpoint`, or `None` when they are discarded
///
/// Every required key that also carries a non-empty ambient value is
/// compared with it case-insensitively. One mismatch discards the whole
/// ambient set. Keys requiring any value are checked by the binder.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::ParameterPolicyResolver;
/// use rhtmx_routing::endpoint::EndpointBuilder;
/// use rhtmx_routing::generation::address::usable_ambient;
/// use rhtmx_routing::{RoutePatternBuilder, RouteValueDictionary};
///
/// let endpoint = EndpointBuilder::from_pattern_builder(
///     RoutePatternBuilder::new("{controller}/{action}/{id?}")
///         .with_required_value("controller", "Pets")
///         .with_required_value("action", "GetById"),
///     "{controller}/{action}/{id?}",
/// )
/// .build(&ParameterPolicyResolver::default())
/// .unwrap();
///
/// let ambient = RouteValueDictionary::from([
///     ("controller", "Pets"),
///     ("action", "Update"),
///     ("id", "17"),
/// ]);
/// assert!(usable_ambient(&endpoint, Some(&ambient)).is_none());
///
/// let ambient = RouteValueDictionary::from([("controller", "pets"), ("action", "getbyid")]);
/// assert!(usable_ambient(&endpoint, Some(&ambient)).is_some());
/// ```
pub fn usable_ambient<'a>(
    endpoint: &Endpoint,
    ambient: Option<&'a RouteValueDictionary>,
) -> Option<&'a RouteValueDictionary> {
    let ambient = ambient?;
    let keep = endpoint
        .pattern
        .required_values
        .iter()
        .all(|(key, required)| match required {
            RequiredValue::Exact(value) => {
                ambient.get_text(key).is_none() || parts_equal(ambient.get(key), Some(value))
            }
            RequiredValue::Any => true,
        });
    keep.then_some(ambient)
}
