//! Virtual datacenter (VDC) API

use super::common::JobRef;
use super::error::ApiError;
use crate::api::Client;
use serde::{Deserialize, Serialize};

const VDCS_PATH: &str = "/api/customers/v2.0/vdcs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageProfile {
    pub class: String,
    /// Limit in GiB
    pub limit: i64,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vdc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "vdcServiceClass")]
    pub service_class: String,
    #[serde(rename = "vdcDisponibilityClass")]
    pub disponibility_class: String,
    #[serde(rename = "vdcBillingModel")]
    pub billing_model: String,
    #[serde(rename = "vcpuInMhz2")]
    pub cpu_speed_in_mhz: i64,
    #[serde(rename = "cpuAllocated")]
    pub cpu_allocated: i64,
    /// Memory in GiB
    #[serde(rename = "memoryAllocated")]
    pub memory_allocated: i64,
    #[serde(rename = "vdcStorageBillingModel")]
    pub storage_billing_model: String,
    #[serde(rename = "vdcStorageProfiles", default)]
    pub storage_profiles: Vec<StorageProfile>,
}

/// The VDC endpoints wrap every object in a `vdc` field
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VdcEnvelope {
    vdc: Vdc,
}

pub struct VdcsApi<'a> {
    client: &'a Client,
}

impl<'a> VdcsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Vdc>, ApiError> {
        let envelopes: Vec<VdcEnvelope> = self.client.get(VDCS_PATH).await?;
        Ok(envelopes.into_iter().map(|e| e.vdc).collect())
    }

    pub async fn get(&self, name: &str) -> Result<Vdc, ApiError> {
        let envelope: VdcEnvelope = self.client.get(&vdc_path(name)).await?;
        Ok(envelope.vdc)
    }

    pub async fn create(&self, vdc: &Vdc) -> Result<JobRef, ApiError> {
        tracing::info!(vdc = %vdc.name, "Creating VDC");
        self.client
            .post(VDCS_PATH, &VdcEnvelope { vdc: vdc.clone() })
            .await
    }

    pub async fn update(&self, vdc: &Vdc) -> Result<JobRef, ApiError> {
        tracing::info!(vdc = %vdc.name, "Updating VDC");
        self.client
            .put(&vdc_path(&vdc.name), &VdcEnvelope { vdc: vdc.clone() })
            .await
    }

    pub async fn delete(&self, name: &str) -> Result<JobRef, ApiError> {
        tracing::info!(vdc = %name, "Deleting VDC");
        self.client.delete(&vdc_path(name)).await
    }
}

fn vdc_path(name: &str) -> String {
    format!("{}/{}", VDCS_PATH, urlencoding::encode(name))
}
