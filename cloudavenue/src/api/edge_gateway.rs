//! Edge gateway API

use super::common::JobRef;
use super::error::ApiError;
use crate::api::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

const EDGES_PATH: &str = "/api/customers/v2.0/edges";

/// Kind of object owning an edge gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerType {
    #[serde(rename = "vdc")]
    Vdc,
    #[serde(rename = "vdc-group")]
    VdcGroup,
}

impl OwnerType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vdc" => Some(OwnerType::Vdc),
            "vdc-group" => Some(OwnerType::VdcGroup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Vdc => "vdc",
            OwnerType::VdcGroup => "vdc-group",
        }
    }

    fn collection(&self) -> &'static str {
        match self {
            OwnerType::Vdc => "vdcs",
            OwnerType::VdcGroup => "vdc-groups",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGateway {
    pub edge_id: String,
    pub edge_name: String,
    pub owner_type: OwnerType,
    pub owner_name: String,
    #[serde(rename = "tier0VrfId")]
    pub tier0_vrf_id: String,
    #[serde(default)]
    pub description: String,
    /// Allocated bandwidth in Mbps
    #[serde(default, rename = "rateLimit")]
    pub bandwidth: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEdgeGatewayRequest {
    #[serde(rename = "tier0VrfId")]
    pub tier0_vrf_id: String,
}

pub struct EdgeGatewaysApi<'a> {
    client: &'a Client,
}

impl<'a> EdgeGatewaysApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<EdgeGateway>, ApiError> {
        self.client.get(EDGES_PATH).await
    }

    pub async fn get(&self, edge_id: &str) -> Result<EdgeGateway, ApiError> {
        let path = format!("{}/{}", EDGES_PATH, edge_id);
        self.client.get(&path).await
    }

    /// Look an edge gateway up by name, `None` when no edge has that name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<EdgeGateway>, ApiError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|edge| edge.edge_name == name))
    }

    /// Start the creation of an edge gateway owned by a VDC or a VDC group
    pub async fn create(
        &self,
        owner_type: OwnerType,
        owner_name: &str,
        request: &CreateEdgeGatewayRequest,
    ) -> Result<JobRef, ApiError> {
        let path = format!(
            "/api/customers/v2.0/{}/{}/edges",
            owner_type.collection(),
            urlencoding::encode(owner_name)
        );
        tracing::info!(owner_type = %owner_type, owner_name, "Creating edge gateway");
        self.client.post(&path, request).await
    }

    pub async fn delete(&self, edge_id: &str) -> Result<JobRef, ApiError> {
        let path = format!("{}/{}", EDGES_PATH, edge_id);
        tracing::info!(edge_id, "Deleting edge gateway");
        self.client.delete(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    const EDGE_JSON: &str = r#"{
        "edgeId": "urn:vcloud:gateway:0001",
        "edgeName": "tn01e02ocb0006205spt101",
        "ownerType": "vdc",
        "ownerName": "VDC_Test",
        "tier0VrfId": "prvrf01eocb0006205allsp01",
        "description": "",
        "rateLimit": 5
    }"#;

    #[test]
    fn owner_type_strings() {
        assert_eq!(OwnerType::parse("vdc-group"), Some(OwnerType::VdcGroup));
        assert_eq!(OwnerType::parse("VDC"), None);
        assert_eq!(OwnerType::Vdc.to_string(), "vdc");
    }

    #[tokio::test]
    async fn get_decodes_edge_gateway() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/customers/v2.0/edges/urn:vcloud:gateway:0001")
            .with_body(EDGE_JSON)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let edge = client
            .edge_gateways()
            .get("urn:vcloud:gateway:0001")
            .await
            .unwrap();

        assert_eq!(edge.edge_name, "tn01e02ocb0006205spt101");
        assert_eq!(edge.owner_type, OwnerType::Vdc);
        assert_eq!(edge.tier0_vrf_id, "prvrf01eocb0006205allsp01");
        assert_eq!(edge.bandwidth, 5);
    }

    #[tokio::test]
    async fn create_posts_to_owner_collection() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/customers/v2.0/vdc-groups/group1/edges")
            .match_body(Matcher::Json(serde_json::json!({
                "tier0VrfId": "prvrf01eocb0006205allsp01"
            })))
            .with_status(202)
            .with_body(r#"{"jobId":"job-123"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let job = client
            .edge_gateways()
            .create(
                OwnerType::VdcGroup,
                "group1",
                &CreateEdgeGatewayRequest {
                    tier0_vrf_id: "prvrf01eocb0006205allsp01".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(job.job_id, "job-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn find_by_name_returns_none_when_absent() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/customers/v2.0/edges")
            .with_body(format!("[{}]", EDGE_JSON))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let api = client.edge_gateways();

        assert!(api.find_by_name("tn01e02ocb0006205spt101").await.unwrap().is_some());
        assert!(api.find_by_name("other").await.unwrap().is_none());
    }
}
