//! Edge gateway data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::provider_data::CloudAvenueProviderData;
use crate::resources::edge_gateway::{edge_gateway_schema, edge_gateway_values};
use crate::resources::{configured, provider_data_from, required_string};

#[derive(Default)]
pub struct EdgeGatewayDataSource {
    provider_data: Option<CloudAvenueProviderData>,
}

impl EdgeGatewayDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let name = required_string(config, "name")?;

        let edge = data
            .client
            .edge_gateways()
            .find_by_name(&name)
            .await
            .map_err(|e| e.to_error_diagnostic("Read edge gateway"))?
            .ok_or_else(|| {
                Diagnostic::error(
                    "Edge gateway not found",
                    format!("No edge gateway named `{}` exists in this organization", name),
                )
                .with_attribute(AttributePath::new("name"))
            })?;

        tracing::debug!(edge_id = %edge.edge_id, "Found edge gateway");
        Ok(DynamicValue::new(Dynamic::Map(edge_gateway_values(&edge))))
    }
}

#[async_trait]
impl DataSource for EdgeGatewayDataSource {
    fn type_name(&self) -> &str {
        "cloudavenue_edgegateway"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse::from_built(edge_gateway_schema().data_source_schema())
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse::against(
            edge_gateway_schema().data_source_schema(),
            &request.config,
        )
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        self.lookup(&request.config).await.into()
    }
}

#[async_trait]
impl DataSourceWithConfigure for EdgeGatewayDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match provider_data_from(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::provider_data::JobPolicies;
    use mockito::Server;
    use std::any::Any;
    use std::sync::Arc;

    const EDGES: &str = r#"[{
        "edgeId": "urn:vcloud:gateway:1",
        "edgeName": "tn01e02ocb0006205spt101",
        "ownerType": "vdc",
        "ownerName": "VDC_Test",
        "tier0VrfId": "prvrf01eocb0006205allsp01",
        "description": "frontal",
        "rateLimit": 5
    }]"#;

    async fn configured_data_source(url: &str) -> EdgeGatewayDataSource {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(CloudAvenueProviderData::new(
            create_test_client(url),
            None,
            JobPolicies::default(),
        ));
        let mut data_source = EdgeGatewayDataSource::new();
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        data_source
    }

    fn by_name(name: &str) -> ReadDataSourceRequest {
        let mut config = DynamicValue::new(Dynamic::Map(Default::default()));
        config
            .set_string(&AttributePath::new("name"), name.to_string())
            .unwrap();
        ReadDataSourceRequest {
            type_name: "cloudavenue_edgegateway".to_string(),
            config,
        }
    }

    #[tokio::test]
    async fn reads_edge_gateway_by_name() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/customers/v2.0/edges")
            .with_status(200)
            .with_body(EDGES)
            .create_async()
            .await;
        let data_source = configured_data_source(&server.url()).await;

        let response = data_source
            .read(Context::new(), by_name("tn01e02ocb0006205spt101"))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "urn:vcloud:gateway:1"
        );
        assert_eq!(
            response
                .state
                .get_number(&AttributePath::new("bandwidth"))
                .unwrap(),
            5.0
        );
    }

    #[tokio::test]
    async fn unknown_name_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/customers/v2.0/edges")
            .with_status(200)
            .with_body(EDGES)
            .create_async()
            .await;
        let data_source = configured_data_source(&server.url()).await;

        let response = data_source.read(Context::new(), by_name("ghost")).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].is_error());
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("name"))
        );
    }

    #[tokio::test]
    async fn schema_has_no_timeouts() {
        let response = EdgeGatewayDataSource::new()
            .schema(Context::new(), DataSourceSchemaRequest)
            .await;
        assert!(response.diagnostics.is_empty());
        assert!(response.schema.block.attribute("timeouts").is_none());
        assert!(response.schema.block.attribute("name").unwrap().required);
    }
}
