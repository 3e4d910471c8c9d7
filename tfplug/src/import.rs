//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Sets the import ID to a specific attribute in state
///
/// Example: ID "urn:vcloud:gateway:1234" -> state.id = "urn:vcloud:gateway:1234"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    if request.id.trim().is_empty() {
        response.diagnostics.push(
            Diagnostic::error(
                "Invalid import ID",
                format!("An empty ID cannot be imported into {}", request.type_name),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "cloudavenue_vdc".to_string(),
            id: id.to_string(),
        }
    }

    fn empty_response() -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn passthrough_sets_attribute() {
        let mut response = empty_response();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("name"),
            &request("vdc-prod"),
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("name")).unwrap(),
            "vdc-prod"
        );
    }

    #[test]
    fn passthrough_rejects_empty_id() {
        let mut response = empty_response();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("  "),
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].is_error());
    }
}
