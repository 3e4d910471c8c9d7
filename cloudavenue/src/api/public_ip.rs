//! Public IP API

use super::common::{ApiQueryParams, JobRef};
use super::error::ApiError;
use crate::api::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const IP_PATH: &str = "/api/customers/v1.0/ip";

/// Serializes "allocate an IP, then find the one that appeared" across the
/// whole process. Two allocations in flight would make the listing diff
/// ambiguous.
pub static PUBLIC_IP_LOCK: Mutex<()> = Mutex::const_new(());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIp {
    pub uplink_ip: String,
    #[serde(default)]
    pub translated_ip: Option<String>,
    #[serde(default)]
    pub edge_gateway_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicIpListResponse {
    #[serde(default)]
    network_config: Vec<PublicIp>,
}

pub struct PublicIpsApi<'a> {
    client: &'a Client,
}

impl<'a> PublicIpsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<PublicIp>, ApiError> {
        let response: PublicIpListResponse = self.client.get(IP_PATH).await?;
        Ok(response.network_config)
    }

    pub async fn find(&self, uplink_ip: &str) -> Result<Option<PublicIp>, ApiError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|ip| ip.uplink_ip == uplink_ip))
    }

    /// Request a new public IP, optionally attached to an edge gateway
    pub async fn create(&self, edge_gateway_name: Option<&str>) -> Result<JobRef, ApiError> {
        let query = ApiQueryParams::new()
            .add_optional("edgeGatewayName", edge_gateway_name)
            .to_query_string();
        tracing::info!(edge_gateway = ?edge_gateway_name, "Requesting public IP");
        self.client
            .post(&format!("{}{}", IP_PATH, query), &serde_json::json!({}))
            .await
    }

    pub async fn delete(&self, uplink_ip: &str) -> Result<JobRef, ApiError> {
        tracing::info!(uplink_ip, "Releasing public IP");
        self.client
            .delete(&format!("{}/{}", IP_PATH, uplink_ip))
            .await
    }
}
