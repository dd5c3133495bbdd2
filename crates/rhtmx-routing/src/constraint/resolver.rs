/// Constraint clause resolution
///
/// Turns clause text such as `int`, `range(1,10)` or `regex(^\d+$)` into
/// policy instances. The registry (`ConstraintMap`) maps names to factories;
/// a factory lists constructors by argument count and required services,
/// and activation picks the one that fits the clause.
///
/// # Design Decisions
/// - Names are case-insensitive
/// - Arguments are split on `,` and trimmed
/// - When no constructor takes the split count but a one-argument
///   constructor exists, the whole argument text is passed as one argument
/// - Among candidates, the constructor using the most services wins

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::builtin::*;
use super::{
    CompositeConstraint, OptionalConstraint, ParameterPolicy, ParameterTransformer, RouteConstraint,
};
use crate::error::PolicyError;
use crate::route::{PolicyReference, RoutePattern};
use crate::values::{eq_ignore_case, fold_case};

type BuildFn = dyn Fn(&[String], &Services) -> Result<ParameterPolicy, String> + Send + Sync;

static BUILT_IN_CONSTRAINTS: Lazy<ConstraintMap> = Lazy::new(ConstraintMap::built_in);

/// Identifies a service type a constructor depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Type-keyed collection of services available to constraint factories
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, service: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(service));
    }

    pub fn with<T: Any + Send + Sync>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.contains_key(&key.id)
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[derive(Clone)]
struct Constructor {
    arity: usize,
    services: Vec<ServiceKey>,
    build: Arc<BuildFn>,
}

/// Builds policy instances for one registry name
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::{ParameterPolicy, PolicyFactory, RangeConstraint};
///
/// let percent = PolicyFactory::new().constructor(0, |_| {
///     Ok(ParameterPolicy::constraint(RangeConstraint::new(0, 100)))
/// });
/// assert_eq!(percent.arities(), vec![0]);
/// ```
#[derive(Clone, Default)]
pub struct PolicyFactory {
    constructors: Vec<Constructor>,
}

impl PolicyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with a single parameterless constructor
    pub fn simple<F>(build: F) -> Self
    where
        F: Fn() -> ParameterPolicy + Send + Sync + 'static,
    {
        Self::new().constructor(0, move |_| Ok(build()))
    }

    /// Adds a constructor taking `arity` text arguments
    pub fn constructor<F>(self, arity: usize, build: F) -> Self
    where
        F: Fn(&[String]) -> Result<ParameterPolicy, String> + Send + Sync + 'static,
    {
        self.constructor_with_services(arity, Vec::new(), move |args, _| build(args))
    }

    /// Adds a constructor that also needs services
    pub fn constructor_with_services<F>(
        mut self,
        arity: usize,
        services: Vec<ServiceKey>,
        build: F,
    ) -> Self
    where
        F: Fn(&[String], &Services) -> Result<ParameterPolicy, String> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            arity,
            services,
            build: Arc::new(build),
        });
        self
    }

    pub fn arities(&self) -> Vec<usize> {
        self.constructors.iter().map(|c| c.arity).collect()
    }

    fn activate(
        &self,
        name: &str,
        text: &str,
        arguments: Option<&str>,
        services: &Services,
    ) -> Result<ParameterPolicy, PolicyError> {
        let mut args: Vec<String> = match arguments {
            Some(arguments) => arguments.split(',').map(|a| a.trim().to_string()).collect(),
            None => Vec::new(),
        };

        let count_matches = |count: usize| self.constructors.iter().any(|c| c.arity == count);
        if let Some(whole) = arguments {
            if args.len() > 1 && !count_matches(args.len()) && count_matches(1) {
                args = vec![whole.to_string()];
            }
        }

        let same_arity: Vec<&Constructor> = self
            .constructors
            .iter()
            .filter(|c| c.arity == args.len())
            .collect();

        if same_arity.is_empty() {
            return Err(PolicyError::NoMatchingConstructor {
                name: name.to_string(),
                arguments: args.len(),
                text: text.to_string(),
            });
        }

        let candidates: Vec<&Constructor> = same_arity
            .iter()
            .copied()
            .filter(|c| c.services.iter().all(|key| services.contains(key)))
            .collect();

        let Some(most) = candidates.iter().map(|c| c.services.len()).max() else {
            let missing = same_arity
                .iter()
                .flat_map(|c| c.services.iter())
                .find(|key| !services.contains(key))
                .map_or("", |key| key.name());
            return Err(PolicyError::MissingService {
                name: name.to_string(),
                service: missing.to_string(),
                text: text.to_string(),
            });
        };

        let mut best = candidates.into_iter().filter(|c| c.services.len() == most);
        let (Some(chosen), None) = (best.next(), best.next()) else {
            return Err(PolicyError::AmbiguousConstructor {
                name: name.to_string(),
                arguments: args.len(),
                text: text.to_string(),
            });
        };

        (chosen.build)(&args, services).map_err(|reason| PolicyError::InvalidArgument {
            name: name.to_string(),
            text: text.to_string(),
            reason,
        })
    }
}

impl fmt::Debug for PolicyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyFactory")
            .field("arities", &self.arities())
            .finish()
    }
}

/// Registry of named policy factories
#[derive(Clone, Debug)]
pub struct ConstraintMap {
    factories: HashMap<String, PolicyFactory>,
}

impl ConstraintMap {
    /// A registry with no entries
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds or replaces the factory for `name`
    pub fn register(&mut self, name: impl AsRef<str>, factory: PolicyFactory) {
        self.factories
            .insert(fold_case(name.as_ref()), factory);
    }

    pub fn with(mut self, name: impl AsRef<str>, factory: PolicyFactory) -> Self {
        self.register(name, factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PolicyFactory> {
        self.factories.get(&fold_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    fn built_in() -> Self {
        let mut map = Self::empty();

        map.register("int", PolicyFactory::simple(|| ParameterPolicy::constraint(IntConstraint)));
        map.register("long", PolicyFactory::simple(|| ParameterPolicy::constraint(LongConstraint)));
        map.register("bool", PolicyFactory::simple(|| ParameterPolicy::constraint(BoolConstraint)));
        map.register(
            "double",
            PolicyFactory::simple(|| ParameterPolicy::constraint(DoubleConstraint)),
        );
        map.register(
            "float",
            PolicyFactory::simple(|| ParameterPolicy::constraint(FloatConstraint)),
        );
        map.register(
            "decimal",
            PolicyFactory::simple(|| ParameterPolicy::constraint(DecimalConstraint)),
        );
        map.register("guid", PolicyFactory::simple(|| ParameterPolicy::constraint(GuidConstraint)));
        map.register(
            "datetime",
            PolicyFactory::simple(|| ParameterPolicy::constraint(DateTimeConstraint)),
        );
        map.register(
            "alpha",
            PolicyFactory::simple(|| ParameterPolicy::constraint(AlphaConstraint)),
        );
        map.register(
            "required",
            PolicyFactory::simple(|| ParameterPolicy::constraint(RequiredConstraint)),
        );
        map.register(
            "file",
            PolicyFactory::simple(|| ParameterPolicy::constraint(FileNameConstraint)),
        );
        map.register(
            "nonfile",
            PolicyFactory::simple(|| ParameterPolicy::constraint(NonFileNameConstraint)),
        );
        map.register(
            "slugify",
            PolicyFactory::simple(|| ParameterPolicy::transformer(SlugifyTransformer)),
        );

        map.register(
            "min",
            PolicyFactory::new().constructor(1, |args| {
                Ok(ParameterPolicy::constraint(MinConstraint::new(number(&args[0])?)))
            }),
        );
        map.register(
            "max",
            PolicyFactory::new().constructor(1, |args| {
                Ok(ParameterPolicy::constraint(MaxConstraint::new(number(&args[0])?)))
            }),
        );
        map.register(
            "range",
            PolicyFactory::new().constructor(2, |args| {
                let (min, max) = (number(&args[0])?, number(&args[1])?);
                if min > max {
                    return Err(format!("min {} is greater than max {}", min, max));
                }
                Ok(ParameterPolicy::constraint(RangeConstraint::new(min, max)))
            }),
        );
        map.register(
            "length",
            PolicyFactory::new()
                .constructor(1, |args| {
                    Ok(ParameterPolicy::constraint(LengthConstraint::exact(count(&args[0])?)))
                })
                .constructor(2, |args| {
                    let (min, max) = (count(&args[0])?, count(&args[1])?);
                    if min > max {
                        return Err(format!("min {} is greater than max {}", min, max));
                    }
                    Ok(ParameterPolicy::constraint(LengthConstraint::between(min, max)))
                }),
        );
        map.register(
            "minlength",
            PolicyFactory::new().constructor(1, |args| {
                Ok(ParameterPolicy::constraint(MinLengthConstraint::new(count(&args[0])?)))
            }),
        );
        map.register(
            "maxlength",
            PolicyFactory::new().constructor(1, |args| {
                Ok(ParameterPolicy::constraint(MaxLengthConstraint::new(count(&args[0])?)))
            }),
        );
        map.register(
            "regex",
            PolicyFactory::new().constructor(1, |args| {
                RegexConstraint::new(&args[0])
                    .map(ParameterPolicy::constraint)
                    .map_err(|e| e.to_string())
            }),
        );

        map
    }
}

impl Default for ConstraintMap {
    /// The built-in constraints and the `slugify` transformer
    fn default() -> Self {
        BUILT_IN_CONSTRAINTS.clone()
    }
}

fn number(arg: &str) -> Result<i64, String> {
    arg.parse()
        .map_err(|_| format!("'{}' is not an integer", arg))
}

fn count(arg: &str) -> Result<usize, String> {
    arg.parse()
        .map_err(|_| format!("'{}' is not a non-negative integer", arg))
}

fn whole_value_pattern(pattern: &str) -> Result<RegexConstraint, PolicyError> {
    RegexConstraint::whole(pattern).map_err(|e| PolicyError::InvalidArgument {
        name: "regex".to_string(),
        text: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Splits a clause into its name and optional argument text
///
/// `range(1,10)` → `("range", Some("1,10"))`; text with an unbalanced `(`
/// is treated as a bare name.
fn split_clause(text: &str) -> (&str, Option<&str>) {
    match text.find('(') {
        Some(open) if text.ends_with(')') => (&text[..open], Some(&text[open + 1..text.len() - 1])),
        _ => (text, None),
    }
}

/// Resolves policy references against a registry and a service collection
#[derive(Debug, Clone, Default)]
pub struct ParameterPolicyResolver {
    map: ConstraintMap,
    services: Services,
}

impl ParameterPolicyResolver {
    pub fn new(map: ConstraintMap) -> Self {
        Self {
            map,
            services: Services::new(),
        }
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn map(&self) -> &ConstraintMap {
        &self.map
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Resolves one reference for `parameter` into a policy
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_routing::constraint::ParameterPolicyResolver;
    /// use rhtmx_routing::error::PolicyError;
    /// use rhtmx_routing::PolicyReference;
    ///
    /// let resolver = ParameterPolicyResolver::default();
    /// let policy = resolver.resolve("id", &PolicyReference::Text("range(1,10)".into()));
    /// assert!(policy.is_ok());
    ///
    /// let err = resolver
    ///     .resolve("id", &PolicyReference::Text("nope".into()))
    ///     .unwrap_err();
    /// assert!(matches!(err, PolicyError::UnresolvedPolicy { .. }));
    /// ```
    pub fn resolve(
        &self,
        parameter: &str,
        reference: &PolicyReference,
    ) -> Result<ParameterPolicy, PolicyError> {
        match reference {
            PolicyReference::Text(text) => self.resolve_text(parameter, text),
            PolicyReference::Pattern(pattern) => {
                whole_value_pattern(pattern).map(ParameterPolicy::constraint)
            }
            PolicyReference::Instance(policy) => Ok(policy.clone()),
        }
    }

    /// Resolves clause text and requires the constraint capability
    pub fn resolve_constraint(
        &self,
        parameter: &str,
        text: &str,
    ) -> Result<Arc<dyn RouteConstraint>, PolicyError> {
        match self.resolve_text(parameter, text)? {
            ParameterPolicy::Constraint(constraint) => Ok(constraint),
            ParameterPolicy::Transformer(_) => Err(PolicyError::InvalidPolicyType {
                parameter: parameter.to_string(),
                name: split_clause(text).0.to_string(),
                text: text.to_string(),
            }),
        }
    }

    fn resolve_text(&self, parameter: &str, text: &str) -> Result<ParameterPolicy, PolicyError> {
        let (name, arguments) = split_clause(text);
        let factory = self.map.get(name).ok_or_else(|| PolicyError::UnresolvedPolicy {
            parameter: parameter.to_string(),
            name: name.to_string(),
            text: text.to_string(),
        })?;
        factory.activate(name, text, arguments, &self.services)
    }
}

/// Constraints per key, evaluated in insertion order
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    entries: Vec<(String, Arc<dyn RouteConstraint>)>,
}

impl ConstraintSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn RouteConstraint>)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn RouteConstraint>> {
        self.entries
            .iter()
            .find(|(k, _)| eq_ignore_case(k, key))
            .map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects constraints per key and combines them into a `ConstraintSet`
///
/// # Examples
///
/// ```
/// use rhtmx_routing::constraint::{ConstraintBuilder, ParameterPolicyResolver};
///
/// let resolver = ParameterPolicyResolver::default();
/// let set = ConstraintBuilder::new(&resolver)
///     .add_resolved("id", "int").unwrap()
///     .add_resolved("id", "min(1)").unwrap()
///     .add_pattern("slug", "[a-z-]+").unwrap()
///     .set_optional("id")
///     .build();
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug)]
pub struct ConstraintBuilder<'a> {
    resolver: &'a ParameterPolicyResolver,
    entries: Vec<(String, Vec<Arc<dyn RouteConstraint>>)>,
    optional: Vec<String>,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(resolver: &'a ParameterPolicyResolver) -> Self {
        Self {
            resolver,
            entries: Vec::new(),
            optional: Vec::new(),
        }
    }

    /// Resolves clause text through the registry and adds it
    pub fn add_resolved(self, key: &str, text: &str) -> Result<Self, PolicyError> {
        let constraint = self.resolver.resolve_constraint(key, text)?;
        Ok(self.add(key, constraint))
    }

    /// Adds a whole-value regular expression constraint
    pub fn add_pattern(self, key: &str, pattern: &str) -> Result<Self, PolicyError> {
        let constraint = whole_value_pattern(pattern)?;
        Ok(self.add(key, Arc::new(constraint)))
    }

    pub fn add(mut self, key: &str, constraint: Arc<dyn RouteConstraint>) -> Self {
        match self.entries.iter_mut().find(|(k, _)| eq_ignore_case(k, key)) {
            Some((_, constraints)) => constraints.push(constraint),
            None => self.entries.push((key.to_string(), vec![constraint])),
        }
        self
    }

    /// Absent or empty values for `key` pass its constraints
    pub fn set_optional(mut self, key: &str) -> Self {
        if !self.optional.iter().any(|k| eq_ignore_case(k, key)) {
            self.optional.push(key.to_string());
        }
        self
    }

    pub fn build(self) -> ConstraintSet {
        let optional = self.optional;
        let entries = self
            .entries
            .into_iter()
            .map(|(key, mut constraints)| {
                let combined: Arc<dyn RouteConstraint> = if constraints.len() == 1 {
                    constraints.remove(0)
                } else {
                    Arc::new(CompositeConstraint::new(constraints))
                };
                let constraint: Arc<dyn RouteConstraint> =
                    if optional.iter().any(|k| eq_ignore_case(k, &key)) {
                        Arc::new(OptionalConstraint::new(combined))
                    } else {
                        combined
                    };
                (key, constraint)
            })
            .collect();
        ConstraintSet { entries }
    }
}

/// Every policy of a pattern, resolved and split by capability
#[derive(Debug, Clone, Default)]
pub struct ResolvedPolicies {
    pub constraints: ConstraintSet,
    pub transformers: Vec<(String, Arc<dyn ParameterTransformer>)>,
}

impl ResolvedPolicies {
    pub fn resolve(
        pattern: &RoutePattern,
        resolver: &ParameterPolicyResolver,
    ) -> Result<Self, PolicyError> {
        let mut builder = ConstraintBuilder::new(resolver);
        let mut transformers = Vec::new();

        for (key, references) in &pattern.parameter_policies {
            for reference in references {
                match resolver.resolve(key, reference)? {
                    ParameterPolicy::Constraint(constraint) => {
                        builder = builder.add(key, constraint);
                    }
                    ParameterPolicy::Transformer(transformer) => {
                        transformers.push((key.clone(), transformer));
                    }
                }
            }
        }

        for parameter in pattern.parameters().filter(|p| p.is_optional()) {
            builder = builder.set_optional(&parameter.name);
        }

        Ok(Self {
            constraints: builder.build(),
            transformers,
        })
    }

    /// First transformer registered for `key`
    pub fn transformer_for(&self, key: &str) -> Option<&Arc<dyn ParameterTransformer>> {
        self.transformers
            .iter()
            .find(|(k, _)| eq_ignore_case(k, key))
            .map(|(_, t)| t)
    }
}
