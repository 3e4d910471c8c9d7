//! Resource implementations

pub mod edge_gateway;
pub mod public_ip;
pub mod vdc;

pub use edge_gateway::EdgeGatewayResource;
pub use public_ip::PublicIpResource;
pub use vdc::VdcResource;

use crate::api::RetryPolicy;
use crate::provider_data::CloudAvenueProviderData;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Extract the provider data handed to `configure`. `None` means the provider
/// is not configured yet, which happens during validation.
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Option<CloudAvenueProviderData>, Diagnostic> {
    match provider_data {
        None => Ok(None),
        Some(data) => data
            .downcast_ref::<CloudAvenueProviderData>()
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Unexpected Configure Type",
                    "Expected CloudAvenueProviderData. Please report this issue to the provider developers.",
                )
            }),
    }
}

pub(crate) fn configured(
    provider_data: &Option<CloudAvenueProviderData>,
) -> Result<&CloudAvenueProviderData, Diagnostic> {
    provider_data.as_ref().ok_or_else(|| {
        Diagnostic::error(
            "Provider not configured",
            "Provider data was not properly configured",
        )
    })
}

pub(crate) fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    let path = AttributePath::new(name);
    match value.get_optional_string(&path) {
        Ok(Some(s)) => Ok(s),
        Ok(None) => Err(Diagnostic::error(
            format!("Missing {}", name),
            format!("The attribute {} has no value", name),
        )
        .with_attribute(path)),
        Err(e) => Err(Diagnostic::error(format!("Invalid {}", name), e.to_string())
            .with_attribute(path)),
    }
}

pub(crate) fn optional_string(
    value: &DynamicValue,
    name: &str,
) -> Result<Option<String>, Diagnostic> {
    let path = AttributePath::new(name);
    value.get_optional_string(&path).map_err(|e| {
        Diagnostic::error(format!("Invalid {}", name), e.to_string()).with_attribute(path)
    })
}

/// Top level value of `state`, null when absent
pub(crate) fn field(state: &DynamicValue, name: &str) -> Dynamic {
    match &state.value {
        Dynamic::Map(m) => m.get(name).cloned().unwrap_or(Dynamic::Null),
        _ => Dynamic::Null,
    }
}

/// `policy`, bounded by the user's `timeouts.<operation>` value when one is
/// set. A bound the policy cannot honour is rejected before any API call.
pub(crate) fn policy_for(
    policy: &RetryPolicy,
    timeout: Option<Duration>,
    operation: &str,
) -> Result<RetryPolicy, Diagnostic> {
    let Some(timeout) = timeout else {
        return Ok(policy.clone());
    };
    let bounded = policy.clone().with_timeout(timeout);
    bounded.validate().map_err(|e| {
        Diagnostic::error("Invalid timeout", e.to_string())
            .with_attribute(AttributePath::new("timeouts").attribute(operation))
    })?;
    Ok(bounded)
}

/// Keep the first diagnostic of a failed `timeouts` read
pub(crate) fn first_diagnostic(mut diagnostics: Vec<Diagnostic>) -> Diagnostic {
    if diagnostics.is_empty() {
        Diagnostic::error("Invalid configuration", "")
    } else {
        diagnostics.swap_remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Client, ConnectionConfig};
    use crate::provider_data::JobPolicies;

    #[test]
    fn provider_data_downcasts() {
        assert!(provider_data_from(None).unwrap().is_none());

        let client =
            Client::with_token("http://localhost", "t", "org", &ConnectionConfig::default())
                .unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(CloudAvenueProviderData::new(
            client,
            Some("VDC_Test".to_string()),
            JobPolicies::default(),
        ));
        let data = provider_data_from(Some(data)).unwrap().unwrap();
        assert_eq!(data.default_vdc.as_deref(), Some("VDC_Test"));

        let wrong: Arc<dyn Any + Send + Sync> = Arc::new(42u8);
        assert!(matches!(provider_data_from(Some(wrong)), Err(d) if d.is_error()));
    }

    #[test]
    fn string_helpers() {
        let value = DynamicValue::decode_json(br#"{"name": "edge", "count": 1}"#).unwrap();

        assert_eq!(required_string(&value, "name").unwrap(), "edge");
        assert!(required_string(&value, "missing").is_err());
        assert_eq!(optional_string(&value, "missing").unwrap(), None);
        assert!(optional_string(&value, "count").is_err());
        assert_eq!(field(&value, "count"), Dynamic::Number(1.0));
        assert_eq!(field(&DynamicValue::null(), "count"), Dynamic::Null);
    }

    #[test]
    fn user_timeout_overrides_policy() {
        let policy =
            policy_for(&RetryPolicy::vdc(), Some(Duration::from_secs(60)), "create").unwrap();
        assert_eq!(policy.timeout, Duration::from_secs(60));

        let policy = policy_for(&RetryPolicy::vdc(), None, "create").unwrap();
        assert_eq!(policy.timeout, RetryPolicy::vdc().timeout);
    }

    #[test]
    fn timeout_shorter_than_first_poll_is_rejected() {
        // Presets wait 10s before the first poll
        let result = policy_for(
            &RetryPolicy::edge_gateway(),
            Some(Duration::from_secs(5)),
            "delete",
        );
        let diag = match result {
            Err(diag) => diag,
            Ok(policy) => panic!("accepted a timeout of {:?}", policy.timeout),
        };
        assert!(diag.is_error());
        assert_eq!(diag.attribute, Some(AttributePath::new("timeouts").attribute("delete")));
    }
}
