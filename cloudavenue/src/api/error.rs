//! API errors and HTTP failure classification

use serde::Deserialize;
use std::fmt;
use tfplug::types::{Diagnostic, DiagnosticSeverity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No HTTP response was obtained
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Http(ClassifiedError),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The job finished but its object could not be identified
    #[error("{0}")]
    Unresolved(String),
}

impl ApiError {
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            ApiError::Http(classified) => Some(classified),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.classified().is_some_and(ClassifiedError::is_not_found)
    }

    /// Diagnostic for a failed `operation`. Not-found responses become
    /// warnings, everything else is an error.
    pub fn to_diagnostic(&self, operation: &str) -> Diagnostic {
        match self {
            ApiError::Http(classified) => classified.to_diagnostic(operation),
            other => Diagnostic::error(format!("{} failed", operation), other.to_string()),
        }
    }

    /// Same as [`ApiError::to_diagnostic`] but always an error, for calls
    /// where a missing object means the operation cannot go on
    pub fn to_error_diagnostic(&self, operation: &str) -> Diagnostic {
        Diagnostic {
            severity: DiagnosticSeverity::Error,
            ..self.to_diagnostic(operation)
        }
    }
}

/// Error body returned by the Cloud Avenue API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The parts of an HTTP response needed to classify a failure
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// A failed HTTP call with status >= 400
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    status: u16,
    reason: Option<String>,
    detail: String,
}

impl ClassifiedError {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn summary(&self) -> String {
        match self.reason.as_deref() {
            Some(reason) if !reason.is_empty() => {
                format!("{} (HTTP Code => {})", reason, self.status)
            }
            _ => format!("HTTP response error: {}", self.status),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn to_diagnostic(&self, operation: &str) -> Diagnostic {
        let summary = format!("{}: {}", operation, self.summary());
        if self.is_not_found() {
            Diagnostic::warning(summary, &self.detail)
        } else {
            Diagnostic::error(summary, &self.detail)
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.summary())
        } else {
            write!(f, "{}: {}", self.summary(), self.detail)
        }
    }
}

/// Classify a failed call.
///
/// Returns `None` when there is no error, when no response was obtained or
/// when the response status is below 400. The detail is the backend message
/// when the body parses, otherwise the raw body, otherwise the error text.
pub fn classify<E: fmt::Display + ?Sized>(
    err: Option<&E>,
    response: Option<&HttpResponse>,
) -> Option<ClassifiedError> {
    let err = err?;
    let response = response?;
    if response.status < 400 {
        return None;
    }

    let body = serde_json::from_str::<ErrorBody>(&response.body).ok();
    let reason = body.as_ref().and_then(|b| b.reason.clone());
    let message = body
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());

    let detail = match message {
        Some(message) => message,
        None if !response.body.trim().is_empty() => response.body.trim().to_string(),
        None => err.to_string(),
    };

    Some(ClassifiedError {
        status: response.status,
        reason,
        detail,
    })
}
