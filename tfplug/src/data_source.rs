//! Read-only data sources
//!
//! A data source looks an object up from its configuration and returns the
//! full state. Most data sources share their attribute definitions with a
//! resource through a superschema, so the response types below can be built
//! straight from a superschema build result.

use crate::context::Context;
use crate::schema::{Schema, SchemaBuilder};
use crate::superschema::SchemaError;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Same key as in `Provider::data_sources`, e.g. "cloudavenue_vdc"
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse;

    async fn schema(
        &self,
        ctx: Context,
        request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse;

    /// Every schema attribute must be present in the returned state
    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

/// Receives the provider data once the provider is configured
#[async_trait]
pub trait DataSourceWithConfigure: DataSource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse;
}

pub struct DataSourceMetadataRequest;

pub struct DataSourceMetadataResponse {
    pub type_name: String,
}

pub struct DataSourceSchemaRequest;

pub struct DataSourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

impl DataSourceSchemaResponse {
    /// Serve a superschema build result. A broken definition yields an empty
    /// schema and an error diagnostic.
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

pub struct ValidateDataSourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateDataSourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidateDataSourceConfigResponse {
    /// Check `config` against a superschema build result
    pub fn against(built: Result<Schema, SchemaError>, config: &DynamicValue) -> Self {
        let diagnostics = match built {
            Ok(schema) => schema.validate(config),
            Err(e) => vec![e.to_diagnostic()],
        };
        Self { diagnostics }
    }
}

pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ReadDataSourceResponse {
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

impl From<Result<DynamicValue, Diagnostic>> for ReadDataSourceResponse {
    fn from(result: Result<DynamicValue, Diagnostic>) -> Self {
        match result {
            Ok(state) => Self {
                state,
                diagnostics: vec![],
            },
            Err(diag) => Self {
                state: DynamicValue::null(),
                diagnostics: vec![diag],
            },
        }
    }
}

pub struct ConfigureDataSourceRequest {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureDataSourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}
