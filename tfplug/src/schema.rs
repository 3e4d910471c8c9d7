//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, plus the framework side of config validation and planning that runs
//! the attribute validators, defaults and plan modifiers.

use crate::defaults::{Default, DefaultRequest};
use crate::plan_modifier::{PlanModifier, PlanModifyRequest};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// Block represents the root configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
    pub nested_type: Option<NestedType>,
    /// Non-empty when the attribute is deprecated
    pub deprecation_message: String,
}

impl Attribute {
    pub fn is_deprecated(&self) -> bool {
        !self.deprecation_message.is_empty()
    }
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &self
                    .validators
                    .iter()
                    .map(|v| v.description())
                    .collect::<Vec<_>>(),
            )
            .field(
                "plan_modifiers",
                &self
                    .plan_modifiers
                    .iter()
                    .map(|m| m.description())
                    .collect::<Vec<_>>(),
            )
            .field("default", &self.default.as_ref().map(|d| d.description()))
            .field("nested_type", &self.nested_type)
            .field("deprecation_message", &self.deprecation_message)
            .finish()
    }
}

/// NestedType for attributes with nested structures
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
}

/// ObjectNestingMode for nested attribute objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectNestingMode {
    Single,
    List,
    Set,
    Map,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                nested_type: None,
                deprecation_message: String::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self, message: &str) -> Self {
        self.attribute.deprecation_message = message.to_string();
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn default(mut self, default: Arc<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn nested_type(mut self, nested: NestedType) -> Self {
        self.attribute.nested_type = Some(nested);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    attributes: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    /// Increment when schema changes require state migration
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of planning a resource change against a schema
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Schema {
    /// Check a configuration against the schema: required attributes,
    /// read-only attributes set by the user and attribute validators.
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        validate_attributes(
            &self.block.attributes,
            &config.value,
            &AttributePath::root(),
            &mut diagnostics,
        );
        diagnostics
    }

    /// Compute the planned state for a resource from its prior state and
    /// configuration. Defaults fill absent optional values, computed values
    /// absent from the configuration become unknown, then plan modifiers run.
    /// A null prior state means the resource is being created.
    pub fn plan(&self, prior_state: &DynamicValue, config: &DynamicValue) -> PlannedChange {
        let mut planned = HashMap::new();
        let mut requires_replace = Vec::new();
        let mut diagnostics = Vec::new();

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let config_value = field(&config.value, &attr.name);
            let state_value = field(&prior_state.value, &attr.name);

            let mut plan_value = config_value.clone();
            if plan_value.is_null() {
                if let Some(default) = &attr.default {
                    plan_value = default
                        .default_value(DefaultRequest { path: path.clone() })
                        .value;
                } else if attr.computed {
                    plan_value = Dynamic::Unknown;
                }
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: state_value.clone(),
                    plan: plan_value,
                    config: config_value.clone(),
                    path: path.clone(),
                });
                plan_value = response.plan_value;
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !prior_state.is_null() {
                    tracing::debug!(attribute = %path, "{}", modifier.description());
                    requires_replace.push(path.clone());
                }
            }

            planned.insert(attr.name.clone(), plan_value);
        }

        PlannedChange {
            planned_state: DynamicValue::new(Dynamic::Map(planned)),
            requires_replace,
            diagnostics,
        }
    }
}

fn field(value: &Dynamic, name: &str) -> Dynamic {
    match value {
        Dynamic::Map(m) => m.get(name).cloned().unwrap_or(Dynamic::Null),
        _ => Dynamic::Null,
    }
}

fn validate_attributes(
    attributes: &[Attribute],
    value: &Dynamic,
    base: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in attributes {
        let path = base.clone().attribute(&attr.name);
        let attr_value = field(value, &attr.name);

        match &attr_value {
            Dynamic::Null => {
                if attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!(
                                "The argument \"{}\" is required, but no definition was found.",
                                path
                            ),
                        )
                        .with_attribute(path),
                    );
                }
            }
            Dynamic::Unknown => {}
            _ => {
                if attr.computed && !attr.optional && !attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid Configuration for Read-Only Attribute",
                            format!(
                                "Cannot set value for \"{}\": this attribute is computed by the provider.",
                                path
                            ),
                        )
                        .with_attribute(path.clone()),
                    );
                }
                if attr.is_deprecated() {
                    diagnostics.push(
                        Diagnostic::warning("Attribute Deprecated", &attr.deprecation_message)
                            .with_attribute(path.clone()),
                    );
                }
                for validator in &attr.validators {
                    validator.validate(&attr_value, &path, diagnostics);
                }
                if let Some(nested) = &attr.nested_type {
                    validate_nested(nested, &attr_value, &path, diagnostics);
                }
            }
        }
    }
}

fn validate_nested(
    nested: &NestedType,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting, value) {
        (ObjectNestingMode::Single, _) => {
            validate_attributes(&nested.attributes, value, path, diagnostics)
        }
        (ObjectNestingMode::List | ObjectNestingMode::Set, Dynamic::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = path.clone().index(i as i64);
                validate_attributes(&nested.attributes, item, &item_path, diagnostics);
            }
        }
        (ObjectNestingMode::Map, Dynamic::Map(items)) => {
            for (key, item) in items {
                let item_path = path.clone().key(key);
                validate_attributes(&nested.attributes, item, &item_path, diagnostics);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
    use crate::validator::StringLengthValidator;

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .validator(StringLengthValidator::between(2, 10))
                    .plan_modifier(RequiresReplaceIfChanged::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bandwidth", AttributeType::Number)
                    .optional()
                    .computed()
                    .default(StaticDefault::number(5.0))
                    .build(),
            )
            .build()
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn schema_builder_creates_schema_with_attributes() {
        let schema = test_schema();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 3);
        assert_eq!(schema.block.description, "Test resource schema");
        assert!(schema.block.attribute("bandwidth").is_some());
    }

    #[test]
    fn cloned_attribute_keeps_validators() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .validator(StringLengthValidator::between(1, 3))
            .build();

        let cloned = attr.clone();
        assert_eq!(cloned.validators.len(), 1);
    }

    #[test]
    fn validate_reports_missing_required_and_validator_errors() {
        let schema = test_schema();

        let diags = schema.validate(&DynamicValue::decode_json(br#"{}"#).unwrap());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Missing required argument");
        assert_eq!(diags[0].attribute, Some(AttributePath::new("name")));

        let diags = schema.validate(&DynamicValue::decode_json(br#"{"name": "x"}"#).unwrap());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length"));
    }

    #[test]
    fn validate_rejects_values_for_read_only_attributes() {
        let schema = test_schema();
        let diags = schema
            .validate(&DynamicValue::decode_json(br#"{"name": "edge", "id": "x"}"#).unwrap());

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("id")));
    }

    #[test]
    fn plan_on_create_applies_defaults_and_marks_computed_unknown() {
        let schema = test_schema();
        let config = DynamicValue::decode_json(br#"{"name": "edge"}"#).unwrap();

        let change = schema.plan(&DynamicValue::null(), &config);

        let planned = change.planned_state;
        assert!(change.requires_replace.is_empty());
        assert_eq!(
            planned.get_number(&AttributePath::new("bandwidth")).unwrap(),
            5.0
        );
        assert_eq!(
            planned.get_optional_string(&AttributePath::new("id")).unwrap(),
            None
        );
    }

    #[test]
    fn plan_on_update_keeps_state_and_flags_replacement() {
        let schema = test_schema();
        let prior =
            DynamicValue::decode_json(br#"{"id": "urn:1", "name": "edge", "bandwidth": 5}"#)
                .unwrap();
        let config = DynamicValue::decode_json(br#"{"name": "edge2"}"#).unwrap();

        let change = schema.plan(&prior, &config);

        assert_eq!(change.requires_replace, vec![AttributePath::new("name")]);
        assert_eq!(
            change
                .planned_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "urn:1"
        );
    }
}
