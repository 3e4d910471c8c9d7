use crate::types::{AttributePath, Diagnostic, Dynamic};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run after the framework has computed a planned value and can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
/// - Add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl RequiresReplaceIfChanged {
    pub fn create() -> Arc<dyn PlanModifier> {
        Arc::new(Self)
    }
}

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "If the value of this attribute changes, Terraform will destroy and recreate the resource."
            .to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !matches!(
            (&request.state, &request.plan),
            (Dynamic::Null, _) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// Computed attributes such as backend identifiers keep their value during
/// planning instead of showing as "known after apply" on every change.
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Arc<dyn PlanModifier> {
        Arc::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, Dynamic::Null) => request.plan,
            (Dynamic::Unknown, state) => state.clone(),
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    pub fn new(predicate: F, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifyRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let mut diagnostics = Vec::new();
        let requires_replace = (self.predicate)(&request);

        if requires_replace {
            diagnostics.push(
                Diagnostic::warning(
                    format!("Attribute '{}' requires resource replacement", request.path),
                    &self.description,
                )
                .with_attribute(request.path.clone()),
            );
        }

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics,
        }
    }
}

/// Compare two Dynamic values, numbers within f64 epsilon
pub(crate) fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            config: plan.clone(),
            state,
            plan,
            path: AttributePath::new("name"),
        }
    }

    #[test]
    fn requires_replace_if_changed_does_not_trigger_on_same_value() {
        let response = RequiresReplaceIfChanged.modify_plan(request(
            Dynamic::String("hello".to_string()),
            Dynamic::String("hello".to_string()),
        ));

        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_if_changed_triggers_on_different_value() {
        let response = RequiresReplaceIfChanged.modify_plan(request(
            Dynamic::String("hello".to_string()),
            Dynamic::String("world".to_string()),
        ));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_creation() {
        let response = RequiresReplaceIfChanged
            .modify_plan(request(Dynamic::Null, Dynamic::String("new".to_string())));

        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_values() {
        let response = RequiresReplaceIfChanged
            .modify_plan(request(Dynamic::String("value".to_string()), Dynamic::Unknown));
        assert!(!response.requires_replace);
    }

    #[test]
    fn values_equal_handles_all_types() {
        assert!(values_equal(&Dynamic::Number(42.0), &Dynamic::Number(42.0)));
        assert!(!values_equal(
            &Dynamic::Number(42.0),
            &Dynamic::Number(43.0)
        ));
        assert!(!values_equal(&Dynamic::Bool(true), &Dynamic::Bool(false)));

        let list1 = Dynamic::List(vec![Dynamic::String("a".to_string()), Dynamic::Number(1.0)]);
        let list2 = Dynamic::List(vec![Dynamic::String("a".to_string()), Dynamic::Number(1.0)]);
        let list3 = Dynamic::List(vec![Dynamic::String("b".to_string()), Dynamic::Number(1.0)]);
        assert!(values_equal(&list1, &list2));
        assert!(!values_equal(&list1, &list3));

        let map1 = HashMap::from([("key".to_string(), Dynamic::String("value".to_string()))]);
        let map2 = HashMap::from([("key".to_string(), Dynamic::String("other".to_string()))]);
        assert!(values_equal(
            &Dynamic::Map(map1.clone()),
            &Dynamic::Map(map1.clone())
        ));
        assert!(!values_equal(&Dynamic::Map(map1), &Dynamic::Map(map2)));
    }

    #[test]
    fn use_state_for_unknown_preserves_state_when_unknown() {
        let response = UseStateForUnknown.modify_plan(request(
            Dynamic::String("existing-value".to_string()),
            Dynamic::Unknown,
        ));

        assert_eq!(
            response.plan_value,
            Dynamic::String("existing-value".to_string())
        );
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_unknown_on_create() {
        let response = UseStateForUnknown.modify_plan(request(Dynamic::Null, Dynamic::Unknown));

        assert_eq!(response.plan_value, Dynamic::Unknown);
    }

    #[test]
    fn requires_replace_if_triggers_on_condition() {
        let modifier = RequiresReplaceIf::new(
            |req| match (&req.state, &req.plan) {
                (Dynamic::String(old), Dynamic::String(new)) => !old.is_empty() && new.is_empty(),
                _ => false,
            },
            "Clearing the value recreates the resource",
        );

        let response = modifier.modify_plan(request(
            Dynamic::String("has-value".to_string()),
            Dynamic::String("".to_string()),
        ));
        assert!(response.requires_replace);
        assert_eq!(response.diagnostics.len(), 1);

        let response = modifier.modify_plan(request(
            Dynamic::String("".to_string()),
            Dynamic::String("new-value".to_string()),
        ));
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }
}
