//! Public IP resource
//!
//! Allocation returns a job but not the address, so the new IP is found by
//! diffing the listing taken before the request against the one taken after
//! the job completes. Allocations are serialized within the process.

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
use tfplug::superschema::{AttributeSpec, StringValue, SuperAttribute, SuperSchema};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{
    configured, field, first_diagnostic, optional_string, policy_for, provider_data_from,
    required_string,
};
use crate::api::public_ip::{PublicIp, PUBLIC_IP_LOCK};
use crate::api::{await_job, single_new_entry, ApiError, JobHandle};
use crate::provider_data::CloudAvenueProviderData;
use crate::timeouts::{timeouts_attribute, Timeouts};

pub(crate) fn public_ip_schema() -> SuperSchema {
    SuperSchema::new("The public IP ")
        .resource_description("resource allows you to allocate a public IP in Cloud Avenue.")
        .attribute(
            "id",
            SuperAttribute::<StringValue>::new().resource(
                AttributeSpec::new()
                    .computed()
                    .description("The ID of the public IP, equal to the address.")
                    .plan_modifier(UseStateForUnknown::create()),
            ),
        )
        .attribute(
            "public_ip",
            SuperAttribute::<StringValue>::new().resource(
                AttributeSpec::new()
                    .computed()
                    .description("The allocated public IP address.")
                    .plan_modifier(UseStateForUnknown::create()),
            ),
        )
        .attribute(
            "edge_gateway_name",
            SuperAttribute::<StringValue>::new().resource(
                AttributeSpec::new()
                    .optional()
                    .computed()
                    .description(
                        "The name of the edge gateway the IP is attached to. Changing it forces a new resource.",
                    )
                    .plan_modifier(UseStateForUnknown::create())
                    .plan_modifier(RequiresReplaceIfChanged::create()),
            ),
        )
        .attribute("timeouts", timeouts_attribute(true, false, true))
}

fn resource_state(ip: &PublicIp, prior: &DynamicValue) -> DynamicValue {
    let edge_gateway_name = match &ip.edge_gateway_name {
        Some(name) => Dynamic::String(name.clone()),
        None => Dynamic::Null,
    };
    DynamicValue::new(Dynamic::Map(HashMap::from([
        ("id".to_string(), Dynamic::String(ip.uplink_ip.clone())),
        ("public_ip".to_string(), Dynamic::String(ip.uplink_ip.clone())),
        ("edge_gateway_name".to_string(), edge_gateway_name),
        ("timeouts".to_string(), field(prior, "timeouts")),
    ])))
}

#[derive(Default)]
pub struct PublicIpResource {
    provider_data: Option<CloudAvenueProviderData>,
}

impl PublicIpResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn allocate(
        &self,
        ctx: &Context,
        request: &CreateResourceRequest,
    ) -> Result<PublicIp, Diagnostic> {
        const OPERATION: &str = "Create public IP";
        let data = configured(&self.provider_data)?;
        let edge_gateway_name = optional_string(&request.planned_state, "edge_gateway_name")?;

        let timeouts = Timeouts::from_config(&request.config).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.public_ip, timeouts.create, "create")?;

        let _guard = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return Err(Diagnostic::error(
                    format!("{} cancelled", OPERATION),
                    "Stopped waiting for another public IP allocation to finish",
                ));
            }
            guard = PUBLIC_IP_LOCK.lock() => guard,
        };
        tracing::debug!("Acquired public IP allocation lock");

        let api = data.client.public_ips();
        let before = api
            .list()
            .await
            .map_err(|e| e.to_error_diagnostic(OPERATION))?;
        let job = api
            .create(edge_gateway_name.as_deref())
            .await
            .map_err(|e| e.to_error_diagnostic(OPERATION))?;
        let job = JobHandle::new(job.job_id).map_err(|e| e.to_diagnostic(OPERATION))?;

        let api = &api;
        let before = &before;
        await_job(ctx, data.client.as_ref(), &job, &policy, move || async move {
            let after = api.list().await?;
            single_new_entry(before, after, |ip: &PublicIp| ip.uplink_ip.clone())
        })
        .await
        .map_err(|e| e.to_diagnostic(OPERATION))
    }

    async fn release(
        &self,
        ctx: &Context,
        request: &DeleteResourceRequest,
    ) -> Result<(), Diagnostic> {
        const OPERATION: &str = "Delete public IP";
        let data = configured(&self.provider_data)?;
        let uplink_ip = required_string(&request.prior_state, "public_ip")?;

        let timeouts = Timeouts::from_config(&request.prior_state).map_err(first_diagnostic)?;
        let policy = policy_for(&data.policies.public_ip, timeouts.delete, "delete")?;

        let api = data.client.public_ips();
        let job = match api.delete(&uplink_ip).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => {
                tracing::info!(%uplink_ip, "Public IP already released");
                return Ok(());
            }
            Err(e) => return Err(e.to_error_diagnostic(OPERATION)),
        };
        let job = JobHandle::new(job.job_id).map_err(|e| e.to_diagnostic(OPERATION))?;

        let api = &api;
        let uplink_ip = uplink_ip.as_str();
        await_job(ctx, data.client.as_ref(), &job, &policy, move || async move {
            match api.find(uplink_ip).await? {
                None => Ok(()),
                Some(_) => Err(ApiError::Unresolved(format!(
                    "public IP {} is still allocated after deletion",
                    uplink_ip
                ))),
            }
        })
        .await
        .map_err(|e| e.to_diagnostic(OPERATION))
    }
}

#[async_trait]
impl Resource for PublicIpResource {
    fn type_name(&self) -> &str {
        "cloudavenue_publicip"
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
        ResourceSchemaResponse::from_built(public_ip_schema().resource_schema())
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse::against(
            public_ip_schema().resource_schema(),
            &request.config,
        )
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.allocate(&ctx, &request).await {
            Ok(ip) => {
                tracing::info!(uplink_ip = %ip.uplink_ip, "Public IP allocated");
                CreateResourceResponse {
                    new_state: resource_state(&ip, &request.planned_state),
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
        let mut diagnostics = vec![];
        let data = match configured(&self.provider_data) {
            Ok(data) => data,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };
        let uplink_ip = match required_string(&request.current_state, "public_ip") {
            Ok(ip) => ip,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let new_state = match data.client.public_ips().find(&uplink_ip).await {
            Ok(Some(ip)) => Some(resource_state(&ip, &request.current_state)),
            Ok(None) => {
                tracing::warn!(%uplink_ip, "Public IP not found, removing it from state");
                diagnostics.push(Diagnostic::warning(
                    "Public IP not found",
                    format!("{} is no longer allocated and was removed from state", uplink_ip),
                ));
                None
            }
            Err(e) if e.is_not_found() => {
                diagnostics.push(e.to_diagnostic("Read public IP"));
                None
            }
            Err(e) => {
                diagnostics.push(e.to_diagnostic("Read public IP"));
                Some(request.current_state)
            }
        };
        ReadResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let diagnostics = match self.release(&ctx, &request).await {
            Ok(()) => vec![],
            Err(diag) => vec![diag],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for PublicIpResource {
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
impl ResourceWithImportState for PublicIpResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("public_ip"), &request, &mut response);
        for imported in &mut response.imported_resources {
            if let Err(e) = imported
                .state
                .set_string(&AttributePath::new("id"), request.id.clone())
            {
                response.diagnostics.push(Diagnostic::error(
                    "Failed to set import ID",
                    e.to_string(),
                ));
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::api::RetryPolicy;
    use crate::provider_data::JobPolicies;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use serial_test::serial;
    use std::any::Any;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    async fn configured_resource(url: &str) -> PublicIpResource {
        let fast = RetryPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_secs(5),
        );
        let policies = JobPolicies {
            edge_gateway: fast.clone(),
            public_ip: fast.clone(),
            vdc: fast,
        };
        configured_resource_with(url, policies).await
    }

    async fn configured_resource_with(url: &str, policies: JobPolicies) -> PublicIpResource {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(CloudAvenueProviderData::new(
            create_test_client(url),
            None,
            policies,
        ));
        let mut resource = PublicIpResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    #[test]
    fn schema_is_resource_only() {
        let schema = public_ip_schema();
        let resource = schema.resource_schema().unwrap();
        assert!(resource.block.attribute("public_ip").unwrap().computed);
        assert!(resource.block.attribute("edge_gateway_name").unwrap().optional);
    }

    #[tokio::test]
    async fn read_removes_released_ip() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/customers/v1.0/ip")
            .with_status(200)
            .with_body(r#"{"networkConfig": [{"uplinkIp": "198.51.100.7"}]}"#)
            .create_async()
            .await;
        let resource = configured_resource(&server.url()).await;

        let state = DynamicValue::decode_json(
            br#"{"id": "203.0.113.10", "public_ip": "203.0.113.10", "edge_gateway_name": null}"#,
        )
        .unwrap();
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "cloudavenue_publicip".to_string(),
                    current_state: state,
                },
            )
            .await;

        assert!(response.new_state.is_none());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(!response.diagnostics[0].is_error());
    }

    #[tokio::test]
    async fn create_finds_the_new_address() {
        let mut server = Server::new_async().await;
        // Mocks with missing hits are served first, so the snapshot mock
        // answers the first listing and the second one every later listing
        server
            .mock("GET", "/api/customers/v1.0/ip")
            .with_status(200)
            .with_body(r#"{"networkConfig": [{"uplinkIp": "198.51.100.7"}]}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/customers/v1.0/ip")
            .with_status(200)
            .with_body(
                r#"{"networkConfig": [
                    {"uplinkIp": "198.51.100.7"},
                    {"uplinkIp": "203.0.113.10", "edgeGatewayName": "tn01e02ocb0006205spt101"}
                ]}"#,
            )
            .create_async()
            .await;
        let post = server
            .mock("POST", "/api/customers/v1.0/ip")
            .match_query(Matcher::UrlEncoded(
                "edgeGatewayName".into(),
                "tn01e02ocb0006205spt101".into(),
            ))
            .with_status(201)
            .with_body(r#"{"jobId": "job-42"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/customers/v1.0/jobs/job-42")
            .with_status(200)
            .with_body(r#"[{"status": "DONE", "description": "allocated"}]"#)
            .create_async()
            .await;
        let resource = configured_resource(&server.url()).await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "cloudavenue_publicip".to_string(),
                    planned_state: DynamicValue::decode_json(
                        br#"{"edge_gateway_name": "tn01e02ocb0006205spt101", "timeouts": null}"#,
                    )
                    .unwrap(),
                    config: DynamicValue::null(),
                },
            )
            .await;

        post.assert_async().await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "203.0.113.10");
        assert_eq!(
            state
                .get_string(&AttributePath::new("edge_gateway_name"))
                .unwrap(),
            "tn01e02ocb0006205spt101"
        );
    }

    #[tokio::test]
    async fn delete_of_released_ip_succeeds() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/api/customers/v1.0/ip/203.0.113.10")
            .with_status(404)
            .with_body(r#"{"code": "404", "reason": "Not Found", "message": "unknown ip"}"#)
            .create_async()
            .await;
        let resource = configured_resource(&server.url()).await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "cloudavenue_publicip".to_string(),
                    prior_state: DynamicValue::decode_json(
                        br#"{"id": "203.0.113.10", "public_ip": "203.0.113.10"}"#,
                    )
                    .unwrap(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_sets_id_and_address() {
        let resource = PublicIpResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "cloudavenue_publicip".to_string(),
                    id: "203.0.113.10".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "203.0.113.10");
        assert_eq!(
            state.get_string(&AttributePath::new("public_ip")).unwrap(),
            "203.0.113.10"
        );
    }

    fn create_request(planned_state: &str, config: &str) -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: "cloudavenue_publicip".to_string(),
            planned_state: DynamicValue::decode_json(planned_state.as_bytes()).unwrap(),
            config: DynamicValue::decode_json(config.as_bytes()).unwrap(),
        }
    }

    #[derive(Default)]
    struct AddressPool {
        allocated: Vec<String>,
        calls: Vec<&'static str>,
    }

    /// Serve the listing, allocation and job endpoints from `pool`. An
    /// allocation shows up in the listing as soon as it is submitted.
    async fn serve_pool(server: &mut ServerGuard, pool: &Arc<Mutex<AddressPool>>) {
        let state = pool.clone();
        server
            .mock("GET", "/api/customers/v1.0/ip")
            .with_status(200)
            .with_body_from_request(move |_| {
                let mut pool = state.lock().unwrap();
                pool.calls.push("list");
                let entries: Vec<_> = pool
                    .allocated
                    .iter()
                    .map(|ip| json!({ "uplinkIp": ip }))
                    .collect();
                json!({ "networkConfig": entries }).to_string().into_bytes()
            })
            .create_async()
            .await;

        let state = pool.clone();
        server
            .mock("POST", "/api/customers/v1.0/ip")
            .match_query(Matcher::Any)
            .with_status(201)
            .with_body_from_request(move |_| {
                let mut pool = state.lock().unwrap();
                pool.calls.push("submit");
                let next = format!("203.0.113.{}", 10 + pool.allocated.len());
                pool.allocated.push(next);
                json!({ "jobId": format!("job-{}", pool.allocated.len()) })
                    .to_string()
                    .into_bytes()
            })
            .create_async()
            .await;

        let state = pool.clone();
        server
            .mock(
                "GET",
                Matcher::Regex(r"^/api/customers/v1\.0/jobs/job-\d+$".to_string()),
            )
            .with_status(200)
            .with_body_from_request(move |_| {
                state.lock().unwrap().calls.push("poll");
                br#"[{"status": "DONE", "description": "allocated"}]"#.to_vec()
            })
            .create_async()
            .await;
    }

    #[tokio::test]
    #[serial]
    async fn concurrent_creates_take_turns() {
        let mut server = Server::new_async().await;
        let pool = Arc::new(Mutex::new(AddressPool::default()));
        serve_pool(&mut server, &pool).await;
        let resource = configured_resource(&server.url()).await;

        let plan = r#"{"edge_gateway_name": null, "timeouts": null}"#;
        let (first, second) = tokio::join!(
            resource.create(Context::new(), create_request(plan, "null")),
            resource.create(Context::new(), create_request(plan, "null")),
        );

        assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
        assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
        let path = AttributePath::new("public_ip");
        let mut addresses = vec![
            first.new_state.get_string(&path).unwrap(),
            second.new_state.get_string(&path).unwrap(),
        ];
        addresses.sort();
        assert_eq!(addresses, vec!["203.0.113.10", "203.0.113.11"]);

        // The second snapshot is only taken once the first allocation resolved
        let calls = pool.lock().unwrap().calls.clone();
        assert_eq!(
            calls,
            vec!["list", "submit", "poll", "list", "list", "submit", "poll", "list"]
        );
    }

    #[tokio::test]
    #[serial]
    async fn create_gives_up_waiting_for_the_allocation_lock() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/api/customers/v1.0/ip")
            .with_status(200)
            .with_body(r#"{"networkConfig": []}"#)
            .expect(0)
            .create_async()
            .await;
        let resource = configured_resource(&server.url()).await;

        let _held = PUBLIC_IP_LOCK.lock().await;
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let response = resource
            .create(
                ctx,
                create_request(r#"{"edge_gateway_name": null, "timeouts": null}"#, "null"),
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Create public IP cancelled");
        list.assert_async().await;
    }

    #[tokio::test]
    async fn timeout_below_first_poll_is_rejected_before_submitting() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/api/customers/v1.0/ip")
            .with_status(200)
            .with_body(r#"{"networkConfig": []}"#)
            .expect(0)
            .create_async()
            .await;
        let post = server
            .mock("POST", "/api/customers/v1.0/ip")
            .match_query(Matcher::Any)
            .with_status(201)
            .with_body(r#"{"jobId": "job-1"}"#)
            .expect(0)
            .create_async()
            .await;
        let resource = configured_resource_with(&server.url(), JobPolicies::default()).await;

        let response = resource
            .create(
                Context::new(),
                create_request(
                    r#"{"edge_gateway_name": null, "timeouts": {"create": "5s"}}"#,
                    r#"{"timeouts": {"create": "5s"}}"#,
                ),
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].is_error());
        assert_eq!(
            response.diagnostics[0].attribute,
            Some(AttributePath::new("timeouts").attribute("create"))
        );
        list.assert_async().await;
        post.assert_async().await;
    }
}
