//! Virtual datacenter resource

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
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
use tfplug::defaults::StaticDefault;
use tfplug::superschema::{
    AttributeSpec, BoolValue, Int64Value, ListNested, StringValue, SuperAttribute, SuperSchema,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{
    ListLengthValidator, NumberRangeValidator, OneOfValidator, StringLengthValidator,
};

use super::{
    configured, field, first_diagnostic, optional_string, policy_for, provider_data_from,
    required_string,
};
use crate::api::vdc::{StorageProfile, Vdc};
use crate::api::{await_job, ApiError, JobHandle, RetryPolicy};
use crate::provider_data::CloudAvenueProviderData;
use crate::timeouts::{timeouts_attribute, Timeouts};

/// A VDC attribute the user sets on the resource and reads on the data source
fn settable<K: tfplug::superschema::AttributeKind>(
    description: &str,
    resource: AttributeSpec,
) -> SuperAttribute<K> {
    SuperAttribute::<K>::new()
        .common(AttributeSpec::new().description(description))
        .resource(resource.required())
        .data_source(AttributeSpec::new().computed())
}

pub(crate) fn vdc_schema() -> SuperSchema {
    SuperSchema::new("The VDC ")
        .resource_description("resource allows you to manage a virtual datacenter in Cloud Avenue.")
        .data_source_description("data source allows you to retrieve information about a virtual datacenter.")
        .attribute(
            "id",
            SuperAttribute::<StringValue>::new()
                .common(
                    AttributeSpec::new()
                        .computed()
                        .description("The ID of the VDC, equal to its name."),
                )
                .resource(AttributeSpec::new().plan_modifier(UseStateForUnknown::create())),
        )
        .attribute(
            "name",
            SuperAttribute::<StringValue>::new()
                .common(
                    AttributeSpec::new()
                        .required()
                        .description("The name of the VDC.")
                        .validator(StringLengthValidator::between(2, 27)),
                )
                .resource(
                    AttributeSpec::new()
                        .description(" Changing it forces a new resource.")
                        .plan_modifier(RequiresReplaceIfChanged::create()),
                ),
        )
        .attribute(
            "description",
            SuperAttribute::<StringValue>::new()
                .common(AttributeSpec::new().description("The description of the VDC."))
                .resource(
                    AttributeSpec::new()
                        .optional()
                        .computed()
                        .default(StaticDefault::string("")),
                )
                .data_source(AttributeSpec::new().computed()),
        )
        .attribute(
            "service_class",
            settable::<StringValue>(
                "The service class of the VDC.",
                AttributeSpec::new().validator(OneOfValidator::new(&["ECO", "STD", "HP", "VOIP"])),
            ),
        )
        .attribute(
            "disponibility_class",
            settable::<StringValue>(
                "The disponibility class of the VDC.",
                AttributeSpec::new()
                    .validator(OneOfValidator::new(&["ONE-ROOM", "DUAL-ROOM", "HA-DUAL-ROOM"])),
            ),
        )
        .attribute(
            "billing_model",
            settable::<StringValue>(
                "The billing model of the compute resources.",
                AttributeSpec::new().validator(OneOfValidator::new(&["PAYG", "DRAAS", "RESERVED"])),
            ),
        )
        .attribute(
            "cpu_speed_in_mhz",
            settable::<Int64Value>(
                "The speed of each vCPU in MHz.",
                AttributeSpec::new().validator(NumberRangeValidator::between(1200.0, 2200.0)),
            ),
        )
        .attribute(
            "cpu_allocated",
            settable::<Int64Value>(
                "The CPU capacity allocated to the VDC in MHz.",
                AttributeSpec::new(),
            ),
        )
        .attribute(
            "memory_allocated",
            settable::<Int64Value>(
                "The memory allocated to the VDC in GiB.",
                AttributeSpec::new(),
            ),
        )
        .attribute(
            "storage_billing_model",
            settable::<StringValue>(
                "The billing model of the storage resources.",
                AttributeSpec::new().validator(OneOfValidator::new(&["PAYG", "RESERVED"])),
            ),
        )
        .attribute(
            "storage_profiles",
            settable::<ListNested>(
                "The storage profiles of the VDC.",
                AttributeSpec::new().validator(Arc::new(ListLengthValidator {
                    min: Some(1),
                    max: None,
                })),
            )
            .attribute(
                "class",
                settable::<StringValue>("The storage class.", AttributeSpec::new()),
            )
            .attribute(
                "limit",
                settable::<Int64Value>(
                    "The storage limit in GiB.",
                    AttributeSpec::new().validator(NumberRangeValidator::between(100.0, 81920.0)),
                ),
            )
            .attribute(
                "default",
                settable::<BoolValue>(
                    "Whether this is the default storage profile.",
                    AttributeSpec::new(),
                ),
            ),
        )
        .attribute("timeouts", timeouts_attribute(true, true, true))
}

/// State values shared by the resource and the data source
pub(crate) fn vdc_values(vdc: &Vdc) -> HashMap<String, Dynamic> {
    let profiles = vdc
        .storage_profiles
        .iter()
        .map(|profile| {
            Dynamic::Map(HashMap::from([
                ("class".to_string(), Dynamic::String(profile.class.clone())),
                ("limit".to_string(), Dynamic::Number(profile.limit as f64)),
                ("default".to_string(), Dynamic::Bool(profile.default)),
            ]))
        })
        .collect();

    HashMap::from([
        ("id".to_string(), Dynamic::String(vdc.name.clone())),
        ("name".to_string(), Dynamic::String(vdc.name.clone())),
        (
            "description".to_string(),
            Dynamic::String(vdc.description.clone()),
        ),
        (
            "service_class".to_string(),
            Dynamic::String(vdc.service_class.clone()),
        ),
        (
            "disponibility_class".to_string(),
            Dynamic::String(vdc.disponibility_class.clone()),
        ),
        (
            "billing_model".to_string(),
            Dynamic::String(vdc.billing_model.clone()),
        ),
        (
            "cpu_speed_in_mhz".to_string(),
            Dynamic::Number(vdc.cpu_speed_in_mhz as f64),
        ),
        (
            "cpu_allocated".to_string(),
            Dynamic::Number(vdc.cpu_allocated as f64),
        ),
        (
            "memory_allocated".to_string(),
            Dynamic::Number(vdc.memory_allocated as f64),
        ),
        (
            "storage_billing_model".to_string(),
            Dynamic::String(vdc.storage_billing_model.clone()),
        ),
        ("storage_profiles".to_string(), Dynamic::List(profiles)),
    ])
}

fn resource_state(vdc: &Vdc, prior: &DynamicValue) -> DynamicValue {
    let mut values = vdc_values(vdc);
    values.insert("timeouts".to_string(), field(prior, "timeouts"));
    DynamicValue::new(Dynamic::Map(values))
}

fn required_i64(value: &DynamicValue, path: AttributePath) -> Result<i64, Diagnostic> {
    match value.get_optional_number(&path) {
        Ok(Some(n)) => Ok(n as i64),
        Ok(None) => Err(Diagnostic::error(
            format!("Missing {}", path),
            format!("The attribute {} has no value", path),
        )
        .with_attribute(path)),
        Err(e) => Err(Diagnostic::error(format!("Invalid {}", path), e.to_string())
            .with_attribute(path)),
    }
}

/// Build the API object from a planned state
fn vdc_from_plan(plan: &DynamicValue) -> Result<Vdc, Diagnostic> {
    let profiles = plan
        .get_list(&AttributePath::new("storage_profiles"))
        .map_err(|e| {
            Diagnostic::error("Invalid storage_profiles", e.to_string())
                .with_attribute(AttributePath::new("storage_profiles"))
        })?;

    let mut storage_profiles = Vec::with_capacity(profiles.len());
    for (i, profile) in profiles.into_iter().enumerate() {
        let path = AttributePath::new("storage_profiles").index(i as i64);
        let profile = DynamicValue::new(profile);
        let class = match profile.get_optional_string(&AttributePath::new("class")) {
            Ok(Some(class)) => class,
            Ok(None) => {
                return Err(Diagnostic::error("Missing storage profile class", "")
                    .with_attribute(path.attribute("class")))
            }
            Err(e) => {
                return Err(
                    Diagnostic::error("Invalid storage profile class", e.to_string())
                        .with_attribute(path.attribute("class")),
                )
            }
        };
        let limit = required_i64(&profile, AttributePath::new("limit"))
            .map_err(|d| d.with_attribute(path.clone().attribute("limit")))?;
        let default = profile
            .get_optional_bool(&AttributePath::new("default"))
            .map_err(|e| {
                Diagnostic::error("Invalid storage profile default", e.to_string())
                    .with_attribute(path.clone().attribute("default"))
            })?
            .unwrap_or(false);
        storage_profiles.push(StorageProfile {
            class,
            limit,
            default,
        });
    }

    Ok(Vdc {
        name: required_string(plan, "name")?,
        description: optional_string(plan, "description")?.unwrap_or_default(),
        service_class: required_string(plan, "service_class")?,
        disponibility_class: required_string(plan, "disponibility_class")?,
        billing_model: required_string(plan, "billing_model")?,
        cpu_speed_in_mhz: required_i64(plan, AttributePath::new("cpu_speed_in_mhz"))?,
        cpu_allocated: required_i64(plan, AttributePath::new("cpu_allocated"))?,
        memory_allocated: required_i64(plan, AttributePath::new("memory_allocated"))?,
        storage_billing_model: required_string(plan, "storage_billing_model")?,
        storage_profiles,
    })
}

#[derive(Default)]
pub struct VdcResource {
    provider_data: Option<CloudAvenueProviderData>,
}

impl VdcResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update `vdc`, wait for the job, then read the VDC back
    async fn apply(
        &self,
        ctx: &Context,
        operation: &str,
        vdc: &Vdc,
        policy: &RetryPolicy,
        update: bool,
    ) -> Result<Vdc, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let api = data.client.vdcs();
        let job = if update {
            api.update(vdc).await
        } else {
            api.create(vdc).await
        }
        .map_err(|e| e.to_error_diagnostic(operation))?;
        let job = JobHandle::new(job.job_id).map_err(|e| e.to_diagnostic(operation))?;

        let api = &api;
        let name = vdc.name.as_str();
        await_job(ctx, data.client.as_ref(), &job, policy, move || async move {
            api.get(name).await
        })
        .await
        .map_err(|e| e.to_diagnostic(operation))
    }

    async fn create_vdc(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
    ) -> Result<Vdc, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let vdc = vdc_from_plan(&request.planned_state)?;
        let timeouts = Timeouts::from_config(&request.config).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.vdc, timeouts.create, "create")?;
        self.apply(ctx, "Create VDC", &vdc, &policy, false).await
    }

    async fn update_vdc(
        &self,
        ctx: &Context,
        request: &UpdateResourceRequest,
    ) -> Result<Vdc, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let vdc = vdc_from_plan(&request.planned_state)?;
        let timeouts = Timeouts::from_config(&request.config).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.vdc, timeouts.update, "update")?;
        self.apply(ctx, "Update VDC", &vdc, &policy, true).await
    }

    async fn delete_vdc(
        &self,
        ctx: &Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        const OPERATION: &str = "Delete VDC";
        let data = configured(&self.provider_data)?;
        let name = required_string(&request.prior_state, "name")?;
        let timeouts = Timeouts::from_config(&request.prior_state).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.vdc, timeouts.delete, "delete")?;

        let api = data.client.vdcs();
        let job = match api.delete(&name).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                tracing::info!(vdc = %name, "VDC already deleted");
                return Ok(());
            }
            Err(e) => return Err(e.to_error_diagnostic(OPERATION)),
        };
        let job = JobHandle::new(job.job_id).map_err(|e| e.to_diagnostic(OPERATION))?;

        let api = &api;
        let name = name.as_str();
        await_job(ctx, data.client.as_ref(), &job, &policy, move || async move {
            match api.get(name).await {
                Ok(_) => Err(ApiError::Unresolved(format!(
                    "VDC {} still exists after deletion",
                    name
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
impl Resource for VdcResource {
    fn type_name(&self) -> &str {
        "cloudavenue_vdc"
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
        ResourceSchemaResponse::from_built(vdc_schema().resource_schema())
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics =
            ValidateResourceConfigResponse::against(vdc_schema().resource_schema(), &request.config)
                .diagnostics;

        // Exactly one default storage profile, once the list is known
        if let Ok(profiles) = request
            .config
            .get_list(&AttributePath::new("storage_profiles"))
        {
            let defaults: Option<usize> = profiles
                .iter()
                .map(|p| match p {
                    Dynamic::Map(m) => match m.get("default") {
                        Some(Dynamic::Bool(true)) => Some(1),
                        Some(Dynamic::Bool(false)) => Some(0),
                        _ => None,
                    },
                    _ => None,
                })
                .sum();
            if defaults.is_some_and(|n| n != 1) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid storage profiles",
                        "Exactly one storage profile must be marked as default",
                    )
                    .with_attribute(AttributePath::new("storage_profiles")),
                );
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_vdc(&ctx, &request).await {
            Ok(vdc) => {
                tracing::info!(vdc = %vdc.name, "VDC created");
                CreateResourceResponse {
                    new_state: resource_state(&vdc, &request.planned_state),
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
        let name = match required_string(&request.current_state, "name") {
            Ok(name) => name,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                }
            }
        };

        match data.client.vdcs().get(&name).await {
            Ok(vdc) => ReadResourceResponse {
                new_state: Some(resource_state(&vdc, &request.current_state)),
                diagnostics: vec![],
            },
            Err(e) if e.is_not_found() => {
                tracing::warn!(vdc = %name, "VDC not found, removing it from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![e.to_diagnostic("Read VDC")],
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![e.to_diagnostic("Read VDC")],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.update_vdc(&ctx, &request).await {
            Ok(vdc) => UpdateResourceResponse {
                new_state: resource_state(&vdc, &request.planned_state),
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let diagnostics = match self.delete_vdc(&ctx, &request).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for VdcResource {
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
impl ResourceWithImportState for VdcResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("name"), &request, &mut response);
        response
    }
}
