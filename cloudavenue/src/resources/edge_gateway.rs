//! Edge gateway resource

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::superschema::{AttributeSpec, Int64Value, StringValue, SuperAttribute, SuperSchema};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{OneOfValidator, StringLengthValidator};

use super::{
    configured, field, first_diagnostic, optional_string, policy_for, provider_data_from,
    required_string,
};
use crate::api::edge_gateway::{CreateEdgeGatewayRequest, EdgeGateway, OwnerType};
use crate::api::{await_job, single_new_entry, ApiError, JobHandle};
use crate::provider_data::CloudAvenueProviderData;
use crate::timeouts::{timeouts_attribute, Timeouts};

pub(crate) fn edge_gateway_schema() -> SuperSchema {
    SuperSchema::new("The edge gateway ")
        .resource_description("resource allows you to create and delete an edge gateway in Cloud Avenue.")
        .data_source_description("data source allows you to retrieve information about an edge gateway.")
        .attribute(
            "id",
            SuperAttribute::<StringValue>::new()
                .common(
                    AttributeSpec::new()
                        .computed()
                        .description("The ID of the edge gateway."),
                )
                .resource(AttributeSpec::new().plan_modifier(UseStateForUnknown::create())),
        )
        .attribute(
            "name",
            SuperAttribute::<StringValue>::new()
                .common(AttributeSpec::new().description("The name of the edge gateway."))
                .resource(
                    AttributeSpec::new()
                        .computed()
                        .description(" Generated by Cloud Avenue.")
                        .plan_modifier(UseStateForUnknown::create()),
                )
                .data_source(
                    AttributeSpec::new()
                        .required()
                        .validator(StringLengthValidator::at_least(1)),
                ),
        )
        .attribute(
            "owner_type",
            SuperAttribute::<StringValue>::new()
                .common(
                    AttributeSpec::new()
                        .description("The type of the edge gateway owner, `vdc` or `vdc-group`."),
                )
                .resource(
                    AttributeSpec::new()
                        .required()
                        .description(" Changing it forces a new resource.")
                        .validator(OneOfValidator::new(&["vdc", "vdc-group"]))
                        .plan_modifier(RequiresReplaceIfChanged::create()),
                )
                .data_source(AttributeSpec::new().computed()),
        )
        .attribute(
            "owner_name",
            SuperAttribute::<StringValue>::new()
                .common(AttributeSpec::new().description("The name of the edge gateway owner."))
                .resource(
                    AttributeSpec::new()
                        .optional()
                        .computed()
                        .description(
                            " Defaults to the provider VDC when the owner is a VDC. Changing it forces a new resource.",
                        )
                        .plan_modifier(UseStateForUnknown::create())
                        .plan_modifier(RequiresReplaceIfChanged::create()),
                )
                .data_source(AttributeSpec::new().computed()),
        )
        .attribute(
            "tier0_vrf_name",
            SuperAttribute::<StringValue>::new()
                .common(
                    AttributeSpec::new()
                        .description("The name of the Tier-0 VRF the edge gateway is connected to."),
                )
                .resource(
                    AttributeSpec::new()
                        .required()
                        .description(" Changing it forces a new resource.")
                        .plan_modifier(RequiresReplaceIfChanged::create()),
                )
                .data_source(AttributeSpec::new().computed()),
        )
        .attribute(
            "description",
            SuperAttribute::<StringValue>::new().common(
                AttributeSpec::new()
                    .computed()
                    .description("The description of the edge gateway."),
            ),
        )
        .attribute(
            "bandwidth",
            SuperAttribute::<Int64Value>::new().common(
                AttributeSpec::new()
                    .computed()
                    .description("The bandwidth in Mbps of the edge gateway."),
            ),
        )
        .attribute("timeouts", timeouts_attribute(true, false, true))
}

/// State values shared by the resource and the data source
pub(crate) fn edge_gateway_values(edge: &EdgeGateway) -> HashMap<String, Dynamic> {
    HashMap::from([
        ("id".to_string(), Dynamic::String(edge.edge_id.clone())),
        ("name".to_string(), Dynamic::String(edge.edge_name.clone())),
        (
            "owner_type".to_string(),
            Dynamic::String(edge.owner_type.to_string()),
        ),
        (
            "owner_name".to_string(),
            Dynamic::String(edge.owner_name.clone()),
        ),
        (
            "tier0_vrf_name".to_string(),
            Dynamic::String(edge.tier0_vrf_id.clone()),
        ),
        (
            "description".to_string(),
            Dynamic::String(edge.description.clone()),
        ),
        (
            "bandwidth".to_string(),
            Dynamic::Number(edge.bandwidth as f64),
        ),
    ])
}

fn resource_state(edge: &EdgeGateway, prior: &DynamicValue) -> DynamicValue {
    let mut values = edge_gateway_values(edge);
    values.insert("timeouts".to_string(), field(prior, "timeouts"));
    DynamicValue::new(Dynamic::Map(values))
}

#[derive(Default)]
pub struct EdgeGatewayResource {
    provider_data: Option<CloudAvenueProviderData>,
}

impl EdgeGatewayResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_edge_gateway(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
    ) -> Result<EdgeGateway, Diagnostic> {
        const OPERATION: &str = "Create edge gateway";
        let data = configured(&self.provider_data)?;
        let plan = &request.planned_state;

        let owner_type = required_string(plan, "owner_type")?;
        let owner_type = OwnerType::parse(&owner_type).ok_or_else(|| {
            Diagnostic::error(
                "Invalid owner_type",
                format!("`{}` is not a valid owner type", owner_type),
            )
            .with_attribute(AttributePath::new("owner_type"))
        })?;
        let owner_name = match (optional_string(plan, "owner_name")?, owner_type) {
            (Some(name), _) => name,
            (None, OwnerType::Vdc) => data.default_vdc.clone().ok_or_else(|| {
                Diagnostic::error(
                    "Missing owner_name",
                    "owner_name must be set when the provider has no default VDC",
                )
                .with_attribute(AttributePath::new("owner_name"))
            })?,
            (None, OwnerType::VdcGroup) => {
                return Err(Diagnostic::error(
                    "Missing owner_name",
                    "owner_name is required when the owner is a VDC group",
                )
                .with_attribute(AttributePath::new("owner_name")))
            }
        };
        let tier0_vrf_id = required_string(plan, "tier0_vrf_name")?;

        let timeouts = Timeouts::from_config(&request.config).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.edge_gateway, timeouts.create, "create")?;

        let api = data.client.edge_gateways();
        let before = api
            .list()
            .await
            .map_err(|e| e.to_error_diagnostic(OPERATION))?;

        let job = api
            .create(
                owner_type,
                &owner_name,
                &CreateEdgeGatewayRequest { tier0_vrf_id },
            )
            .await
            .map_err(|e| e.to_error_diagnostic(OPERATION))?;
        let job = JobHandle::new(job.job_id).map_err(|e| e.to_diagnostic(OPERATION))?;

        let api = &api;
        let before = &before;
        await_job(ctx, data.client.as_ref(), &job, &policy, move || async move {
            let after = api.list().await?;
            single_new_entry(before, after, |edge: &EdgeGateway| edge.edge_id.clone())
        })
        .await
        .map_err(|e| e.to_diagnostic(OPERATION))
    }

    async fn delete_edge_gateway(
        &self,
        ctx: &Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        const OPERATION: &str = "Delete edge gateway";
        let data = configured(&self.provider_data)?;
        let id = required_string(&request.prior_state, "id")?;

        let timeouts = Timeouts::from_config(&request.prior_state).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.edge_gateway, timeouts.delete, "delete")?;

        let api = data.client.edge_gateways();
        let job = match api.delete(&id).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                tracing::info!(edge_id = %id, "Edge gateway already deleted");
                return Ok(());
            }
            Err(e) => return Err(e.to_error_diagnostic(OPERATION)),
        };
        let job = JobHandle::new(job.job_id).map_err(|e| e.to_diagnostic(OPERATION))?;

        let api = &api;
        let id = id.as_str();
        await_job(ctx, data.client.as_ref(), &job, &policy, move || async move {
            match api.get(id).await {
                Ok(_) => Err(ApiError::Unresolved(format!(
                    "edge gateway {} still exists after deletion",
                    id
                ))),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| e.to_diagnostic(OPERATION))
    }
}

#[async_trait]
impl Resource for EdgeGatewayResource {
    fn type_name(&self) -> &str {
        "cloudavenue_edgegateway"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse::from_built(edge_gateway_schema().resource_schema())
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse::against(
            edge_gateway_schema().resource_schema(),
            &request.config,
        )
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_edge_gateway(&ctx, &request).await {
            Ok(edge) => {
                tracing::info!(
                    edge_id = %edge.edge_id,
                    edge_name = %edge.edge_name,
                    "Edge gateway created"
                );
                CreateResourceResponse {
                    new_state: resource_state(&edge, &request.planned_state),
                    diagnostics: vec![],
                }
            }
            Err(diag) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let data = match configured(&self.provider_data) {
            Ok(data) => data,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };
        let id = match required_string(&request.current_state, "id") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match data.client.edge_gateways().get(&id).await {
            Ok(edge) => ReadResourceResponse {
                new_state: Some(resource_state(&edge, &request.current_state)),
                diagnostics: vec![],
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(edge_id = %id, "Edge gateway not found, removing it from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![e.to_diagnostic("Read edge gateway")],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Read edge gateway")],
            },
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        // Every backend attribute forces replacement; only timeouts can change
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let diagnostics = match self.delete_edge_gateway(&ctx, &request).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for EdgeGatewayResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match provider_data_from(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for EdgeGatewayResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}
