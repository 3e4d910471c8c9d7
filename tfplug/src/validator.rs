//! Attribute validators
//!
//! Validators run against configuration values during validation. Null and
//! unknown values are never handed to a validator.

use crate::types::{AttributePath, Diagnostic, Dynamic};
use std::sync::Arc;

pub trait Validator: Send + Sync {
    /// Human-readable description, also used in generated documentation
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

fn invalid(path: &AttributePath, summary: String, detail: String) -> Diagnostic {
    Diagnostic::error(summary, detail).with_attribute(path.clone())
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_least(min: usize) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: Some(min),
            max: None,
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "string length is unconstrained".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(s) = value.as_str() else {
            return;
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have minimum length of {}", path, min),
                    format!("Got length {}", len),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must have maximum length of {}", path, max),
                    format!("Got length {}", len),
                ));
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: &str) -> Result<Arc<dyn Validator>, regex::Error> {
        let pattern = regex::Regex::new(pattern)?;
        Ok(Arc::new(Self {
            pattern,
            description: description.to_string(),
        }))
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must match {}", self.description)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(invalid(
                    path,
                    format!("{} must match {}", path, self.description),
                    format!("Value '{}' does not match pattern", s),
                ));
            }
        }
    }
}

pub struct OneOfValidator {
    pub allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn new(allowed: &[&str]) -> Arc<dyn Validator> {
        Arc::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|allowed| allowed == s) {
                diagnostics.push(invalid(
                    path,
                    format!("Invalid value for {}", path),
                    format!("Got '{}', {}", s, self.description()),
                ));
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {} and {}", min, max),
            (Some(min), None) => format!("value must be at least {}", min),
            (None, Some(max)) => format!("value must be at most {}", max),
            (None, None) => "value is unconstrained".to_string(),
        }
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        let Some(n) = value.as_number() else {
            return;
        };
        if let Some(min) = self.min {
            if n < min {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be at least {}", path, min),
                    format!("Got {}", n),
                ));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                diagnostics.push(invalid(
                    path,
                    format!("{} must be at most {}", path, max),
                    format!("Got {}", n),
                ));
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!(
            "collection must have between {} and {} items",
            self.min.unwrap_or(0),
            self.max.map_or_else(|| "unbounded".to_string(), |m| m.to_string())
        )
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::List(items) = value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(invalid(
                        path,
                        format!("{} must have at least {} items", path, min),
                        format!("Got {} items", items.len()),
                    ));
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(invalid(
                        path,
                        format!("{} must have at most {} items", path, max),
                        format!("Got {} items", items.len()),
                    ));
                }
            }
        }
    }
}
