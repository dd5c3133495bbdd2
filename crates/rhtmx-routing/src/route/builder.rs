/// Pattern assembly
///
/// Combines parsed template text with explicit defaults, explicit policies
/// and required values, and enforces the rules that need all of them.

use super::parser::parse_segments;
use super::pattern::{
    ParameterKind, PathSegment, PolicyReference, RequiredValue, RoutePattern, RoutePatternPart,
};
use crate::constraint::ParameterPolicy;
use crate::error::{TemplateError, TemplateErrorKind};
use crate::values::{eq_ignore_case, parts_equal, RouteValue, RouteValueDictionary};

/// Builder for `RoutePattern`
///
/// Each `with_*` method consumes self and returns the updated builder.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::{RoutePatternBuilder, RouteValue};
///
/// let pattern = RoutePatternBuilder::new("{controller}/{action}/{id?}")
///     .with_default("action", "Index")
///     .with_constraint("id", "int")
///     .with_required_value("controller", "Home")
///     .build()
///     .unwrap();
///
/// assert_eq!(pattern.defaults.get("action"), Some(&RouteValue::from("Index")));
/// assert_eq!(pattern.policies_for("id").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoutePatternBuilder {
    template: String,
    defaults: RouteValueDictionary,
    policies: Vec<(String, PolicyReference)>,
    required_values: Vec<(String, RequiredValue)>,
}

impl RoutePatternBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.defaults.insert(key, value);
        self
    }

    pub fn with_defaults(mut self, defaults: &RouteValueDictionary) -> Self {
        self.defaults.merge(defaults);
        self
    }

    /// Adds a constraint clause such as `int` or `length(2,5)`
    pub fn with_constraint(mut self, key: impl Into<String>, clause: impl Into<String>) -> Self {
        self.policies
            .push((key.into(), PolicyReference::Text(clause.into())));
        self
    }

    /// Adds a regular expression the whole value must match (case-insensitive)
    pub fn with_pattern_constraint(
        mut self,
        key: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        self.policies
            .push((key.into(), PolicyReference::Pattern(pattern.into())));
        self
    }

    /// Adds a pre-built policy instance
    pub fn with_policy(mut self, key: impl Into<String>, policy: ParameterPolicy) -> Self {
        self.policies
            .push((key.into(), PolicyReference::Instance(policy)));
        self
    }

    pub fn with_required_value(
        mut self,
        key: impl Into<String>,
        value: impl Into<RouteValue>,
    ) -> Self {
        self.set_required(key.into(), RequiredValue::Exact(value.into()));
        self
    }

    /// Requires any non-empty value for `key`
    pub fn with_required_any(mut self, key: impl Into<String>) -> Self {
        self.set_required(key.into(), RequiredValue::Any);
        self
    }

    fn set_required(&mut self, key: String, value: RequiredValue) {
        match self
            .required_values
            .iter_mut()
            .find(|(k, _)| eq_ignore_case(k, &key))
        {
            Some(entry) => entry.1 = value,
            None => self.required_values.push((key, value)),
        }
    }

    /// Parses the template and assembles the pattern
    pub fn build(self) -> Result<RoutePattern, TemplateError> {
        let template = self.template;
        let fail = |kind| TemplateError::new(template.as_str(), kind);

        let mut segments = parse_segments(&template).map_err(fail)?;
        let mut defaults = RouteValueDictionary::new();

        for segment in &segments {
            for parameter in segment.parts.iter().filter_map(RoutePatternPart::as_parameter) {
                if parameter.is_optional() && parameter.default.is_some() {
                    return Err(fail(TemplateErrorKind::OptionalWithDefault(
                        parameter.name.clone(),
                    )));
                }
                if let Some(default) = &parameter.default {
                    defaults.insert(parameter.name.clone(), default.as_str());
                }
            }
        }

        for (key, value) in self.defaults.iter() {
            match find_parameter_mut(&mut segments, key) {
                Some(parameter) => {
                    if parameter.default.is_some() {
                        return Err(fail(TemplateErrorKind::DefaultConflict(
                            parameter.name.clone(),
                        )));
                    }
                    if parameter.is_optional() {
                        return Err(fail(TemplateErrorKind::OptionalWithDefault(
                            parameter.name.clone(),
                        )));
                    }
                    parameter.default = value.as_text().map(|text| text.into_owned());
                    if parameter.kind == ParameterKind::Standard {
                        parameter.kind = ParameterKind::DefaultValued;
                    }
                    defaults.insert(parameter.name.clone(), value.clone());
                }
                None => defaults.insert(key, value.clone()),
            }
        }

        validate_optional_order(&segments).map_err(fail)?;

        let mut parameter_policies: Vec<(String, Vec<PolicyReference>)> = Vec::new();
        for segment in &segments {
            for parameter in segment.parts.iter().filter_map(RoutePatternPart::as_parameter) {
                if !parameter.inline_policies.is_empty() {
                    parameter_policies.push((
                        parameter.name.clone(),
                        parameter
                            .inline_policies
                            .iter()
                            .cloned()
                            .map(PolicyReference::Text)
                            .collect(),
                    ));
                }
            }
        }
        for (key, reference) in self.policies {
            match parameter_policies
                .iter_mut()
                .find(|(k, _)| eq_ignore_case(k, &key))
            {
                Some((_, references)) => references.push(reference),
                None => parameter_policies.push((key, vec![reference])),
            }
        }

        for (key, required) in &self.required_values {
            let is_parameter = segments
                .iter()
                .flat_map(|s| s.parts.iter())
                .filter_map(RoutePatternPart::as_parameter)
                .any(|p| eq_ignore_case(&p.name, key));
            if is_parameter {
                continue;
            }

            let satisfied = match (defaults.get(key), required) {
                (Some(default), RequiredValue::Exact(value)) => {
                    parts_equal(Some(default), Some(value))
                }
                (Some(default), RequiredValue::Any) => !default.is_empty(),
                (None, RequiredValue::Exact(value)) => value.is_empty(),
                (None, RequiredValue::Any) => false,
            };
            if !satisfied {
                return Err(fail(TemplateErrorKind::InvalidRequiredValue(key.clone())));
            }
        }

        Ok(RoutePattern {
            raw_text: template.clone(),
            segments,
            defaults,
            parameter_policies,
            required_values: self.required_values,
        })
    }
}

fn find_parameter_mut<'a>(
    segments: &'a mut [PathSegment],
    name: &str,
) -> Option<&'a mut super::pattern::ParameterPart> {
    segments
        .iter_mut()
        .flat_map(|segment| segment.parts.iter_mut())
        .find_map(|part| match part {
            RoutePatternPart::Parameter(parameter) if eq_ignore_case(&parameter.name, name) => {
                Some(parameter)
            }
            _ => None,
        })
}

/// A lone optional-parameter segment may only be followed by segments
/// whose parameters can also be left out
fn validate_optional_order(segments: &[PathSegment]) -> Result<(), TemplateErrorKind> {
    let Some(first_optional) = segments
        .iter()
        .position(|s| s.simple_parameter().is_some_and(|p| p.is_optional()))
    else {
        return Ok(());
    };

    let optional = segments[first_optional]
        .simple_parameter()
        .map(|p| p.name.clone())
        .unwrap_or_default();

    segments[first_optional + 1..]
        .iter()
        .flat_map(|segment| segment.parts.iter())
        .filter_map(RoutePatternPart::as_parameter)
        .find(|p| p.kind == ParameterKind::Standard)
        .map_or(Ok(()), |required| {
            Err(TemplateErrorKind::OptionalPrecedesRequired {
                optional,
                required: required.name.clone(),
            })
        })
}
