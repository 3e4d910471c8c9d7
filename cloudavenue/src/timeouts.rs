//! Per-resource `timeouts` block
//!
//! Durations are numbers with a unit suffix, such as `"30s"`, `"5m"` or
//! `"1h30m"`.

use std::time::Duration;
use tfplug::superschema::{AttributeSpec, SingleNested, StringValue, SuperAttribute};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::Validator;

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input.trim())
        .map_err(|e| format!("invalid duration `{}`: {}", input, e))
}

/// Operation timeouts read from a resource configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeouts {
    pub create: Option<Duration>,
    pub update: Option<Duration>,
    pub delete: Option<Duration>,
}

impl Timeouts {
    pub fn from_config(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        let mut read = |operation: &str| {
            let path = AttributePath::new("timeouts").attribute(operation);
            match config.get_optional_string(&path) {
                Ok(Some(value)) => match parse_duration(&value) {
                    Ok(duration) => Some(duration),
                    Err(detail) => {
                        diagnostics.push(
                            Diagnostic::error("Invalid timeout", detail).with_attribute(path),
                        );
                        None
                    }
                },
                Ok(None) => None,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error("Invalid timeout", e.to_string()).with_attribute(path),
                    );
                    None
                }
            }
        };

        let timeouts = Self {
            create: read("create"),
            update: read("update"),
            delete: read("delete"),
        };
        if diagnostics.is_empty() {
            Ok(timeouts)
        } else {
            Err(diagnostics)
        }
    }
}

pub struct DurationValidator;

impl DurationValidator {
    pub fn create() -> std::sync::Arc<dyn Validator> {
        std::sync::Arc::new(Self)
    }
}

impl Validator for DurationValidator {
    fn description(&self) -> String {
        "value must be a duration such as `30s`, `5m` or `1h30m`".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if let Err(detail) = parse_duration(s) {
                diagnostics.push(
                    Diagnostic::error(format!("{} is not a valid duration", path), detail)
                        .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// The `timeouts` attribute, resource only, with one entry per selected
/// operation
pub fn timeouts_attribute(
    create: bool,
    update: bool,
    delete: bool,
) -> SuperAttribute<SingleNested> {
    let mut attribute = SuperAttribute::<SingleNested>::new()
        .resource(AttributeSpec::new().optional().description("Operation timeouts."));

    for (name, enabled) in [("create", create), ("update", update), ("delete", delete)] {
        if enabled {
            attribute = attribute.attribute(
                name,
                SuperAttribute::<StringValue>::new().resource(
                    AttributeSpec::new()
                        .optional()
                        .description(&format!(
                            "Time allowed for the {} operation, for example `30s` or `10m`.",
                            name
                        ))
                        .validator(DurationValidator::create()),
                ),
            );
        }
    }
    attribute
}
