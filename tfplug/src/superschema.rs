//! Superschema: one attribute definition, two schemas
//!
//! A [`SuperSchema`] describes a resource and its data source counterpart at
//! once. Every attribute carries up to three [`AttributeSpec`]s: a common base,
//! a resource overlay and a data source overlay. [`SuperSchema::resource_schema`]
//! and [`SuperSchema::data_source_schema`] merge them into the concrete
//! [`Schema`] trees the framework serves.
//!
//! Merge rules, applied on top of the common base:
//! - boolean flags are OR'd
//! - markdown description and deprecation message are appended
//! - validators and plan modifiers are concatenated
//! - default and element type are replaced when the overlay sets them
//!
//! Nested attributes are merged field by field before being wrapped.

use crate::defaults;
use crate::plan_modifier::PlanModifier;
use crate::schema::{
    Attribute, AttributeType, Block, NestedType, ObjectNestingMode, Schema, StringKind,
};
use crate::types::Diagnostic;
use crate::validator::Validator;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("attribute `{0}` has no common, resource or data source definition")]
    Undefined(String),

    #[error("attribute `{name}` is invalid: {reason}")]
    ConflictingFlags { name: String, reason: String },

    #[error("attribute `{0}` must be required, optional or computed")]
    MissingPresence(String),

    #[error("attribute `{0}` is a collection without an element type")]
    MissingElementType(String),
}

impl SchemaError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error("Invalid schema definition", self.to_string())
    }
}

/// Which of the two generated schemas is being built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Resource,
    DataSource,
}

/// Marker for the value kind of a [`SuperAttribute`]
pub trait AttributeKind: Send + Sync + 'static {
    /// Nesting mode for nested object kinds, `None` for plain values
    const NESTING: Option<ObjectNestingMode> = None;

    /// Terraform type of the attribute. `element` is the merged element type
    /// and is only consulted by collection kinds.
    fn attribute_type(element: Option<&AttributeType>) -> Option<AttributeType>;
}

macro_rules! scalar_kind {
    ($name:ident, $ty:expr) => {
        pub struct $name;

        impl AttributeKind for $name {
            fn attribute_type(_element: Option<&AttributeType>) -> Option<AttributeType> {
                Some($ty)
            }
        }
    };
}

macro_rules! collection_kind {
    ($name:ident, $wrap:path) => {
        pub struct $name;

        impl AttributeKind for $name {
            fn attribute_type(element: Option<&AttributeType>) -> Option<AttributeType> {
                element.map(|e| $wrap(Box::new(e.clone())))
            }
        }
    };
}

macro_rules! nested_kind {
    ($name:ident, $mode:expr) => {
        pub struct $name;

        impl AttributeKind for $name {
            const NESTING: Option<ObjectNestingMode> = Some($mode);

            // Resolved from the nested attributes
            fn attribute_type(_element: Option<&AttributeType>) -> Option<AttributeType> {
                None
            }
        }
    };
}

scalar_kind!(StringValue, AttributeType::String);
scalar_kind!(BoolValue, AttributeType::Bool);
scalar_kind!(Int64Value, AttributeType::Number);
scalar_kind!(Float64Value, AttributeType::Number);
scalar_kind!(NumberValue, AttributeType::Number);
collection_kind!(ListValue, AttributeType::List);
collection_kind!(SetValue, AttributeType::Set);
collection_kind!(MapValue, AttributeType::Map);
nested_kind!(SingleNested, ObjectNestingMode::Single);
nested_kind!(ListNested, ObjectNestingMode::List);
nested_kind!(SetNested, ObjectNestingMode::Set);
nested_kind!(MapNested, ObjectNestingMode::Map);

/// Constraints of one attribute variant
#[derive(Clone, Default)]
pub struct AttributeSpec {
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub markdown_description: String,
    pub deprecation_message: String,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn defaults::Default>>,
    pub element_type: Option<AttributeType>,
}

impl AttributeSpec {
    pub fn new() -> Self {
        <Self as std::default::Default>::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.markdown_description = description.to_string();
        self
    }

    pub fn deprecated(mut self, message: &str) -> Self {
        self.deprecation_message = message.to_string();
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.plan_modifiers.push(modifier);
        self
    }

    pub fn default(mut self, default: Arc<dyn defaults::Default>) -> Self {
        self.default = Some(default);
        self
    }

    pub fn element_type(mut self, element_type: AttributeType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    fn overlay(&mut self, variant: &AttributeSpec) {
        self.required |= variant.required;
        self.optional |= variant.optional;
        self.computed |= variant.computed;
        self.sensitive |= variant.sensitive;
        self.markdown_description.push_str(&variant.markdown_description);
        self.deprecation_message.push_str(&variant.deprecation_message);
        self.validators.extend(variant.validators.iter().cloned());
        self.plan_modifiers.extend(variant.plan_modifiers.iter().cloned());
        if variant.default.is_some() {
            self.default.clone_from(&variant.default);
        }
        if variant.element_type.is_some() {
            self.element_type.clone_from(&variant.element_type);
        }
    }
}

/// Merge a variant overlay onto the common base
pub fn merge_specs(
    common: Option<&AttributeSpec>,
    variant: Option<&AttributeSpec>,
) -> AttributeSpec {
    let mut merged = common.cloned().unwrap_or_default();
    if let Some(variant) = variant {
        merged.overlay(variant);
    }
    merged
}

/// An attribute that can take part in a [`SuperSchema`]
pub trait SchemaAttribute: Send + Sync {
    fn is_resource(&self) -> bool;

    fn is_data_source(&self) -> bool;

    fn merge_for_resource(&self, name: &str) -> Result<Attribute, SchemaError>;

    fn merge_for_data_source(&self, name: &str) -> Result<Attribute, SchemaError>;
}

/// Ordered list of named attributes
pub type Attributes = Vec<(String, Box<dyn SchemaAttribute>)>;

/// A single logical attribute with common, resource and data source variants
pub struct SuperAttribute<K: AttributeKind> {
    pub common: Option<AttributeSpec>,
    pub resource: Option<AttributeSpec>,
    pub data_source: Option<AttributeSpec>,
    /// Child attributes, only used by nested kinds
    pub attributes: Attributes,
    kind: PhantomData<K>,
}

impl<K: AttributeKind> SuperAttribute<K> {
    pub fn new() -> Self {
        Self {
            common: None,
            resource: None,
            data_source: None,
            attributes: Vec::new(),
            kind: PhantomData,
        }
    }

    pub fn common(mut self, spec: AttributeSpec) -> Self {
        self.common = Some(spec);
        self
    }

    pub fn resource(mut self, spec: AttributeSpec) -> Self {
        self.resource = Some(spec);
        self
    }

    pub fn data_source(mut self, spec: AttributeSpec) -> Self {
        self.data_source = Some(spec);
        self
    }

    pub fn attribute(mut self, name: &str, attribute: impl SchemaAttribute + 'static) -> Self {
        self.attributes.push((name.to_string(), Box::new(attribute)));
        self
    }

    fn merge(&self, name: &str, target: Target) -> Result<Attribute, SchemaError> {
        let variant = match target {
            Target::Resource => self.resource.as_ref(),
            Target::DataSource => self.data_source.as_ref(),
        };
        let spec = merge_specs(self.common.as_ref(), variant);
        check_flags(name, &spec)?;

        let (r#type, nested_type) = match K::NESTING {
            Some(nesting) => {
                let children = merge_attributes(name, &self.attributes, target)?;
                let object = AttributeType::Object(
                    children
                        .iter()
                        .map(|c| (c.name.clone(), c.r#type.clone()))
                        .collect::<HashMap<_, _>>(),
                );
                let r#type = match nesting {
                    ObjectNestingMode::Single => object,
                    ObjectNestingMode::List => AttributeType::List(Box::new(object)),
                    ObjectNestingMode::Set => AttributeType::Set(Box::new(object)),
                    ObjectNestingMode::Map => AttributeType::Map(Box::new(object)),
                };
                (
                    r#type,
                    Some(NestedType {
                        attributes: children,
                        nesting,
                    }),
                )
            }
            None => (
                K::attribute_type(spec.element_type.as_ref())
                    .ok_or_else(|| SchemaError::MissingElementType(name.to_string()))?,
                None,
            ),
        };

        Ok(Attribute {
            name: leaf_name(name).to_string(),
            r#type,
            description: spec.markdown_description,
            required: spec.required,
            optional: spec.optional,
            computed: spec.computed,
            sensitive: spec.sensitive,
            validators: spec.validators,
            plan_modifiers: spec.plan_modifiers,
            default: spec.default,
            nested_type,
            deprecation_message: spec.deprecation_message,
        })
    }
}

impl<K: AttributeKind> std::default::Default for SuperAttribute<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AttributeKind> SchemaAttribute for SuperAttribute<K> {
    fn is_resource(&self) -> bool {
        self.resource.is_some() || self.common.is_some()
    }

    fn is_data_source(&self) -> bool {
        self.data_source.is_some() || self.common.is_some()
    }

    fn merge_for_resource(&self, name: &str) -> Result<Attribute, SchemaError> {
        self.merge(name, Target::Resource)
    }

    fn merge_for_data_source(&self, name: &str) -> Result<Attribute, SchemaError> {
        self.merge(name, Target::DataSource)
    }
}

fn leaf_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn check_flags(name: &str, spec: &AttributeSpec) -> Result<(), SchemaError> {
    if spec.required && spec.optional {
        return Err(SchemaError::ConflictingFlags {
            name: name.to_string(),
            reason: "required and optional are mutually exclusive".to_string(),
        });
    }
    if spec.required && spec.computed {
        return Err(SchemaError::ConflictingFlags {
            name: name.to_string(),
            reason: "required and computed are mutually exclusive".to_string(),
        });
    }
    if !spec.required && !spec.optional && !spec.computed {
        return Err(SchemaError::MissingPresence(name.to_string()));
    }
    Ok(())
}

/// Merge a list of attributes for one target. Attributes that only belong to
/// the other target are skipped; attributes that belong to neither are an error.
fn merge_attributes(
    parent: &str,
    attributes: &Attributes,
    target: Target,
) -> Result<Vec<Attribute>, SchemaError> {
    let mut merged = Vec::with_capacity(attributes.len());
    for (name, attribute) in attributes {
        let path = if parent.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", parent, name)
        };

        if !attribute.is_resource() && !attribute.is_data_source() {
            return Err(SchemaError::Undefined(path));
        }

        match target {
            Target::Resource if attribute.is_resource() => {
                merged.push(attribute.merge_for_resource(&path)?)
            }
            Target::DataSource if attribute.is_data_source() => {
                merged.push(attribute.merge_for_data_source(&path)?)
            }
            _ => {}
        }
    }
    Ok(merged)
}

/// Schema level description of one variant
#[derive(Debug, Clone, Default)]
pub struct SchemaDetails {
    pub markdown_description: String,
    pub deprecation_message: String,
}

/// A resource and data source schema described together
#[derive(Default)]
pub struct SuperSchema {
    pub version: i64,
    pub common: SchemaDetails,
    pub resource: SchemaDetails,
    pub data_source: SchemaDetails,
    pub attributes: Attributes,
}

impl SuperSchema {
    pub fn new(description: &str) -> Self {
        Self {
            common: SchemaDetails {
                markdown_description: description.to_string(),
                ..SchemaDetails::default()
            },
            ..Self::default()
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn resource_description(mut self, description: &str) -> Self {
        self.resource.markdown_description = description.to_string();
        self
    }

    pub fn data_source_description(mut self, description: &str) -> Self {
        self.data_source.markdown_description = description.to_string();
        self
    }

    pub fn attribute(mut self, name: &str, attribute: impl SchemaAttribute + 'static) -> Self {
        self.attributes.push((name.to_string(), Box::new(attribute)));
        self
    }

    pub fn resource_schema(&self) -> Result<Schema, SchemaError> {
        self.build(Target::Resource)
    }

    pub fn data_source_schema(&self) -> Result<Schema, SchemaError> {
        self.build(Target::DataSource)
    }

    fn build(&self, target: Target) -> Result<Schema, SchemaError> {
        let details = match target {
            Target::Resource => &self.resource,
            Target::DataSource => &self.data_source,
        };
        let description = format!(
            "{}{}",
            self.common.markdown_description, details.markdown_description
        );
        let deprecated = !self.common.deprecation_message.is_empty()
            || !details.deprecation_message.is_empty();

        Ok(Schema {
            version: self.version,
            block: Block {
                attributes: merge_attributes("", &self.attributes, target)?,
                description,
                description_kind: StringKind::Markdown,
                deprecated,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
    use crate::validator::{OneOfValidator, StringLengthValidator};

    fn descriptions<T: ?Sized>(items: &[Arc<T>], f: impl Fn(&T) -> String) -> Vec<String> {
        items.iter().map(|i| f(i.as_ref())).collect()
    }

    fn assert_same(a: &Attribute, b: &Attribute) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.r#type, b.r#type);
        assert_eq!(a.description, b.description);
        assert_eq!(
            (a.required, a.optional, a.computed, a.sensitive),
            (b.required, b.optional, b.computed, b.sensitive)
        );
        assert_eq!(a.deprecation_message, b.deprecation_message);
        assert_eq!(
            descriptions(&a.validators, |v| v.description()),
            descriptions(&b.validators, |v| v.description())
        );
        assert_eq!(
            descriptions(&a.plan_modifiers, |m| m.description()),
            descriptions(&b.plan_modifiers, |m| m.description())
        );
        assert_eq!(
            a.default.as_ref().map(|d| d.description()),
            b.default.as_ref().map(|d| d.description())
        );
        match (&a.nested_type, &b.nested_type) {
            (Some(x), Some(y)) => {
                assert_eq!(x.nesting, y.nesting);
                assert_eq!(x.attributes.len(), y.attributes.len());
                for (ca, cb) in x.attributes.iter().zip(&y.attributes) {
                    assert_same(ca, cb);
                }
            }
            (None, None) => {}
            _ => panic!("nested type mismatch on {}", a.name),
        }
    }

    fn name_attribute() -> SuperAttribute<StringValue> {
        SuperAttribute::new()
            .common(
                AttributeSpec::new()
                    .description("The name of the edge gateway.")
                    .validator(StringLengthValidator::at_least(1)),
            )
            .resource(
                AttributeSpec::new()
                    .required()
                    .description(" Changing it forces a new resource.")
                    .plan_modifier(RequiresReplaceIfChanged::create()),
            )
            .data_source(AttributeSpec::new().computed())
    }

    #[test]
    fn merge_overlays_variant_on_common() {
        let attr = name_attribute().merge_for_resource("name").unwrap();

        assert!(attr.required);
        assert!(!attr.computed);
        assert_eq!(
            attr.description,
            "The name of the edge gateway. Changing it forces a new resource."
        );
        assert_eq!(attr.validators.len(), 1);
        assert_eq!(attr.plan_modifiers.len(), 1);

        let attr = name_attribute().merge_for_data_source("name").unwrap();
        assert!(attr.computed);
        assert!(!attr.required);
        assert_eq!(attr.description, "The name of the edge gateway.");
        assert!(attr.plan_modifiers.is_empty());
    }

    #[test]
    fn merge_concatenates_validators_and_replaces_default() {
        let attr = SuperAttribute::<StringValue>::new()
            .common(
                AttributeSpec::new()
                    .optional()
                    .validator(StringLengthValidator::between(1, 10))
                    .default(StaticDefault::string("t0")),
            )
            .resource(
                AttributeSpec::new()
                    .computed()
                    .validator(OneOfValidator::new(&["t0", "t1"]))
                    .default(StaticDefault::string("t1")),
            )
            .merge_for_resource("tier")
            .unwrap();

        assert!(attr.optional && attr.computed);
        assert_eq!(attr.validators.len(), 2);
        assert_eq!(
            attr.default.map(|d| d.description()),
            Some("Value defaults to `t1`.".to_string())
        );
    }

    #[test]
    fn merge_is_deterministic() {
        let attribute = name_attribute();

        let first = attribute.merge_for_resource("name").unwrap();
        let second = attribute.merge_for_resource("name").unwrap();
        assert_same(&first, &second);

        let first = attribute.merge_for_data_source("name").unwrap();
        let second = attribute.merge_for_data_source("name").unwrap();
        assert_same(&first, &second);
    }

    #[test]
    fn collection_takes_element_type_from_overlay() {
        let attr = SuperAttribute::<SetValue>::new()
            .common(AttributeSpec::new().computed())
            .resource(AttributeSpec::new().element_type(AttributeType::String))
            .merge_for_resource("tags")
            .unwrap();
        assert_eq!(attr.r#type, AttributeType::Set(Box::new(AttributeType::String)));

        let err = SuperAttribute::<ListValue>::new()
            .common(AttributeSpec::new().computed())
            .merge_for_data_source("tags")
            .unwrap_err();
        assert_eq!(err, SchemaError::MissingElementType("tags".to_string()));
    }

    #[test]
    fn conflicting_flags_are_rejected() {
        let err = SuperAttribute::<BoolValue>::new()
            .common(AttributeSpec::new().optional())
            .resource(AttributeSpec::new().required())
            .merge_for_resource("enabled")
            .unwrap_err();
        assert!(matches!(err, SchemaError::ConflictingFlags { .. }));

        let err = SuperAttribute::<BoolValue>::new()
            .common(AttributeSpec::new().description("no flags"))
            .merge_for_resource("enabled")
            .unwrap_err();
        assert_eq!(err, SchemaError::MissingPresence("enabled".to_string()));
    }

    #[test]
    fn nested_attributes_merge_recursively() {
        let attribute = SuperAttribute::<SingleNested>::new()
            .common(AttributeSpec::new().optional())
            .attribute(
                "create",
                SuperAttribute::<StringValue>::new().resource(AttributeSpec::new().optional()),
            )
            .attribute(
                "read",
                SuperAttribute::<StringValue>::new().common(AttributeSpec::new().optional()),
            );

        let resource = attribute.merge_for_resource("timeouts").unwrap();
        let nested = resource.nested_type.unwrap();
        assert_eq!(nested.nesting, ObjectNestingMode::Single);
        assert_eq!(nested.attributes.len(), 2);
        assert!(matches!(resource.r#type, AttributeType::Object(ref fields) if fields.len() == 2));

        let data_source = attribute.merge_for_data_source("timeouts").unwrap();
        let nested = data_source.nested_type.unwrap();
        assert_eq!(nested.attributes.len(), 1);
        assert_eq!(nested.attributes[0].name, "read");
    }

    #[test]
    fn nested_error_names_full_path() {
        let err = SuperAttribute::<ListNested>::new()
            .common(AttributeSpec::new().computed())
            .attribute("ip", SuperAttribute::<StringValue>::new())
            .merge_for_resource("network")
            .unwrap_err();

        assert_eq!(err, SchemaError::Undefined("network.ip".to_string()));
    }

    #[test]
    fn super_schema_splits_resource_and_data_source() {
        let schema = SuperSchema::new("The edge gateway ")
            .resource_description("resource allows you to manage an edge gateway.")
            .data_source_description("data source allows you to read an edge gateway.")
            .attribute(
                "id",
                SuperAttribute::<StringValue>::new().common(
                    AttributeSpec::new()
                        .computed()
                        .plan_modifier(UseStateForUnknown::create()),
                ),
            )
            .attribute(
                "timeouts",
                SuperAttribute::<SingleNested>::new()
                    .resource(AttributeSpec::new().optional())
                    .attribute(
                        "create",
                        SuperAttribute::<StringValue>::new()
                            .resource(AttributeSpec::new().optional()),
                    ),
            )
            .attribute("name", name_attribute());

        let resource = schema.resource_schema().unwrap();
        let names: Vec<_> = resource
            .block
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "timeouts", "name"]);
        assert_eq!(
            resource.block.description,
            "The edge gateway resource allows you to manage an edge gateway."
        );

        let data_source = schema.data_source_schema().unwrap();
        let names: Vec<_> = data_source
            .block
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn super_schema_rejects_undefined_attribute() {
        let schema =
            SuperSchema::new("broken").attribute("ghost", SuperAttribute::<Int64Value>::new());

        assert_eq!(
            schema.resource_schema().unwrap_err(),
            SchemaError::Undefined("ghost".to_string())
        );
        assert_eq!(
            schema.data_source_schema().unwrap_err(),
            SchemaError::Undefined("ghost".to_string())
        );
    }
}
