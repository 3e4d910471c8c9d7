//! VDC data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};

use crate::provider_data::CloudAvenueProviderData;
use crate::resources::vdc::{vdc_schema, vdc_values};
use crate::resources::{configured, provider_data_from, required_string};

#[derive(Default)]
pub struct VdcDataSource {
    provider_data: Option<CloudAvenueProviderData>,
}

impl VdcDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let name = required_string(config, "name")?;

        let vdc = data.client.vdcs().get(&name).await.map_err(|e| {
            tracing::warn!(vdc = %name, error = %e, "VDC lookup failed");
            e.to_error_diagnostic("Read VDC")
        })?;
        Ok(DynamicValue::new(Dynamic::Map(vdc_values(&vdc))))
    }
}

#[async_trait]
impl DataSource for VdcDataSource {
    fn type_name(&self) -> &str {
        "cloudavenue_vdc"
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
        DataSourceSchemaResponse::from_built(vdc_schema().data_source_schema())
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse::against(
            vdc_schema().data_source_schema(),
            &request.config,
        )
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        self.lookup(&request.config).await.into()
    }
}

#[async_trait]
impl DataSourceWithConfigure for VdcDataSource {
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
    use tfplug::types::AttributePath;

    async fn configured_data_source(url: &str) -> VdcDataSource {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(CloudAvenueProviderData::new(
            create_test_client(url),
            None,
            JobPolicies::default(),
        ));
        let mut data_source = VdcDataSource::new();
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
            type_name: "cloudavenue_vdc".to_string(),
            config,
        }
    }

    #[tokio::test]
    async fn reads_vdc_with_storage_profiles() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/customers/v2.0/vdcs/VDC_Test")
            .with_status(200)
            .with_body(
                r#"{"vdc": {
                    "name": "VDC_Test",
                    "vdcServiceClass": "STD",
                    "vdcDisponibilityClass": "ONE-ROOM",
                    "vdcBillingModel": "PAYG",
                    "vcpuInMhz2": 2200,
                    "cpuAllocated": 22000,
                    "memoryAllocated": 30,
                    "vdcStorageBillingModel": "PAYG",
                    "vdcStorageProfiles": [
                        {"class": "gold", "limit": 500, "default": true},
                        {"class": "silver", "limit": 200, "default": false}
                    ]
                }}"#,
            )
            .create_async()
            .await;
        let data_source = configured_data_source(&server.url()).await;

        let response = data_source.read(Context::new(), by_name("VDC_Test")).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let profiles = response
            .state
            .get_list(&AttributePath::new("storage_profiles"))
            .unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(
            response
                .state
                .get_string(&AttributePath::new("description"))
                .unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn missing_vdc_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/customers/v2.0/vdcs/ghost")
            .with_status(404)
            .with_body(r#"{"code": "404", "reason": "Not Found", "message": "VDC ghost not found"}"#)
            .create_async()
            .await;
        let data_source = configured_data_source(&server.url()).await;

        let response = data_source.read(Context::new(), by_name("ghost")).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].is_error());
        assert!(response.diagnostics[0].detail.contains("VDC ghost not found"));
        assert!(response.state.is_null());
    }
}
