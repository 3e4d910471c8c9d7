//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an optional attribute is absent
//! from the configuration. They differ from plan modifiers in that they only
//! run when the value is null.

use crate::types::{AttributePath, Dynamic};
use std::sync::Arc;

/// Default provides default values for optional attributes
pub trait Default: Send + Sync {
    fn description(&self) -> String;

    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: Dynamic,
}

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Arc<dyn Default> {
        Arc::new(Self { value })
    }

    pub fn string(value: &str) -> Arc<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Arc<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Arc<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        match &self.value {
            Dynamic::String(s) => format!("Value defaults to `{}`.", s),
            Dynamic::Number(n) => format!("Value defaults to `{}`.", n),
            Dynamic::Bool(b) => format!("Value defaults to `{}`.", b),
            other => format!("Value defaults to `{:?}`.", other),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_default_returns_value() {
        let default = StaticDefault::number(5.0);
        let response = default.default_value(DefaultRequest {
            path: AttributePath::new("bandwidth"),
        });

        assert_eq!(response.value, Dynamic::Number(5.0));
        assert_eq!(default.description(), "Value defaults to `5`.");
    }

    #[test]
    fn static_default_string_description() {
        let default = StaticDefault::string("PAYG");
        assert_eq!(default.description(), "Value defaults to `PAYG`.");
    }
}
