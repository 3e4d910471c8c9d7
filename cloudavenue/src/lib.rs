//! Terraform provider for Orange Cloud Avenue
//!
//! The provider opens a session against the Cloud Avenue API during
//! `configure` and hands the client to every resource and data source.
//! Mutating calls return a job which is polled to completion before the
//! resulting object is read back.

pub mod api;
pub mod config;
pub mod coverage;
pub mod data_sources;
pub mod provider_data;
pub mod resources;
pub mod timeouts;

pub use provider_data::{CloudAvenueProviderData, JobPolicies};

use api::{Client, ConnectionConfig};
use async_trait::async_trait;
use config::ProviderConfig;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::types::Diagnostic;

pub struct CloudAvenueProvider {
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    connection: ConnectionConfig,
    policies: JobPolicies,
}

impl Default for CloudAvenueProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudAvenueProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            connection: ConnectionConfig::default(),
            policies: JobPolicies::default(),
        }
    }

    /// Replace the job polling policies, mostly useful to shorten them in tests
    pub fn with_policies(mut self, policies: JobPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }
}

#[async_trait]
impl Provider for CloudAvenueProvider {
    fn type_name(&self) -> &str {
        "cloudavenue"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: ProviderConfig::schema(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::debug!(terraform_version = %request.terraform_version, "Configuring provider");

        let config = match ProviderConfig::resolve(&request.config, |var| std::env::var(var).ok()) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let client =
            match Client::connect(config.url.as_str(), &config.credentials(), &self.connection)
                .await
            {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!(
                        url = %config.url,
                        error = %e,
                        "Failed to open Cloud Avenue session"
                    );
                    return ConfigureProviderResponse {
                        diagnostics: vec![Diagnostic::error(
                            "Unable to create Cloud Avenue API client",
                            e.to_string(),
                        )],
                        provider_data: None,
                    };
                }
            };

        let data: Arc<dyn Any + Send + Sync> = Arc::new(CloudAvenueProviderData::new(
            client,
            config.vdc,
            self.policies.clone(),
        ));
        self.provider_data = Some(data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(data),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "cloudavenue_edgegateway".to_string(),
            Box::new(|| {
                Box::new(resources::EdgeGatewayResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "cloudavenue_publicip".to_string(),
            Box::new(|| {
                Box::new(resources::PublicIpResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "cloudavenue_vdc".to_string(),
            Box::new(|| Box::new(resources::VdcResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "cloudavenue_edgegateway".to_string(),
            Box::new(|| {
                Box::new(data_sources::EdgeGatewayDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories.insert(
            "cloudavenue_vdc".to_string(),
            Box::new(|| {
                Box::new(data_sources::VdcDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tfplug::types::DynamicValue;

    #[tokio::test]
    async fn factories_match_type_names() {
        let provider = CloudAvenueProvider::new();

        for (name, factory) in provider.resources() {
            assert_eq!(factory().type_name(), name);
        }
        for (name, factory) in provider.data_sources() {
            assert_eq!(factory().type_name(), name);
        }
        assert_eq!(provider.resources().len(), 3);
        assert_eq!(provider.data_sources().len(), 2);
    }

    #[tokio::test]
    async fn every_schema_builds() {
        let provider = CloudAvenueProvider::new();

        for factory in provider.resources().values() {
            let response = factory()
                .schema(Context::new(), tfplug::resource::ResourceSchemaRequest)
                .await;
            assert!(response.diagnostics.is_empty());
            assert!(response.schema.block.attribute("id").is_some());
        }
        for factory in provider.data_sources().values() {
            let response = factory()
                .schema(Context::new(), tfplug::data_source::DataSourceSchemaRequest)
                .await;
            assert!(response.diagnostics.is_empty());
        }
    }

    #[tokio::test]
    async fn configure_reports_missing_credentials() {
        let mut provider = CloudAvenueProvider::new();
        let config = DynamicValue::decode_json(
            br#"{"url": "https://console1.cloudavenue.orange-business.com", "user": "", "password": null, "org": null, "vdc": null}"#,
        )
        .unwrap();

        // Only meaningful when the environment does not provide credentials
        if std::env::var(config::ENV_PASSWORD).is_ok() {
            return;
        }

        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: "1.9.0".to_string(),
                    config,
                },
            )
            .await;

        assert!(response.provider_data.is_none());
        assert!(response.diagnostics.iter().any(|d| d.is_error()));
        assert!(!provider.is_configured());
    }
}
