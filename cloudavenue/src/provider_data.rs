//! Provider data structure passed to resources and data sources

use crate::api::{Client, RetryPolicy};
use std::sync::Arc;

/// Polling policies for each kind of asynchronous job
#[derive(Debug, Clone)]
pub struct JobPolicies {
    pub edge_gateway: RetryPolicy,
    pub public_ip: RetryPolicy,
    pub vdc: RetryPolicy,
}

impl Default for JobPolicies {
    fn default() -> Self {
        Self {
            edge_gateway: RetryPolicy::edge_gateway(),
            public_ip: RetryPolicy::public_ip(),
            vdc: RetryPolicy::vdc(),
        }
    }
}

#[derive(Clone)]
pub struct CloudAvenueProviderData {
    pub client: Arc<Client>,
    pub default_vdc: Option<String>,
    pub policies: JobPolicies,
}

impl CloudAvenueProviderData {
    pub fn new(client: Client, default_vdc: Option<String>, policies: JobPolicies) -> Self {
        Self {
            client: Arc::new(client),
            default_vdc,
            policies,
        }
    }
}
