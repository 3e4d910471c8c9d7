//! Managed resources
//!
//! [`Resource`] carries the CRUD lifecycle. Configuration and import are
//! separate traits so a resource only implements what it supports.

use crate::context::Context;
use crate::schema::{Schema, SchemaBuilder};
use crate::superschema::SchemaError;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait Resource: Send + Sync {
    /// Same key as in `Provider::resources`, e.g. "cloudavenue_edgegateway"
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse;

    async fn schema(&self, ctx: Context, request: ResourceSchemaRequest) -> ResourceSchemaResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    /// The new state holds every attribute, computed ones included
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// `new_state` is `None` when the object no longer exists
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    /// Deleting an object that is already gone succeeds
    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;
}

pub struct ResourceMetadataRequest;

pub struct ResourceMetadataResponse {
    pub type_name: String,
}

pub struct ResourceSchemaRequest;

pub struct ResourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourceSchemaResponse {
    /// Serve a superschema build result, an empty schema when it failed
    pub fn from_built(built: Result<Schema, SchemaError>) -> Self {
        match built {
            Ok(schema) => Self {
                schema,
                diagnostics: vec![],
            },
            Err(e) => Self {
                schema: SchemaBuilder::new().build(),
                diagnostics: vec![e.to_diagnostic()],
            },
        }
    }
}

pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidateResourceConfigResponse {
    pub fn against(built: Result<Schema, SchemaError>, config: &DynamicValue) -> Self {
        let diagnostics = match built {
            Ok(schema) => schema.validate(config),
            Err(e) => vec![e.to_diagnostic()],
        };
        Self { diagnostics }
    }
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
}

pub struct ReadResourceResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// All resources must implement configure to receive provider data
/// This is called immediately after factory creates the resource
#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse;
}

pub struct ConfigureResourceRequest {
    /// Data from ConfigureProviderResponse.provider_data
    /// Downcast to your provider's specific type
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Optional interface for import functionality
#[async_trait]
pub trait ResourceWithImportState: Resource {
    /// Called during "terraform import" command
    /// Parse the ID and populate enough state for a subsequent read
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;
}

pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
}

pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::superschema::{StringValue, SuperAttribute, SuperSchema};

    #[test]
    fn broken_definition_is_reported() {
        let definition =
            SuperSchema::new("Broken ").attribute("name", SuperAttribute::<StringValue>::new());

        let response = ResourceSchemaResponse::from_built(definition.resource_schema());
        assert!(response.schema.block.attributes.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid schema definition");
        assert!(response.diagnostics[0].detail.contains("name"));

        let validated = ValidateResourceConfigResponse::against(
            definition.resource_schema(),
            &DynamicValue::null(),
        );
        assert_eq!(validated.diagnostics.len(), 1);
    }
}
