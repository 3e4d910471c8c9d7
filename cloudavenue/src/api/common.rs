//! Common types and utilities for the Cloud Avenue API

use super::error::ApiError;
use serde::Deserialize;
use std::fmt::Display;

/// Body returned by every endpoint that starts an asynchronous job
#[derive(Debug, Clone, Deserialize)]
pub struct JobRef {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        format!(
            "?{}",
            self.params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        )
    }
}

/// Find the single entry of `after` whose key is absent from `before`.
///
/// The create endpoints only hand back a job id, so the object a job created
/// is identified by diffing a listing taken before submission with one taken
/// after the job completes. Zero or several new entries are ambiguous.
pub fn single_new_entry<T, K, F>(before: &[T], after: Vec<T>, key: F) -> Result<T, ApiError>
where
    K: PartialEq + Display,
    F: Fn(&T) -> K,
{
    let known: Vec<K> = before.iter().map(&key).collect();
    let mut created: Vec<T> = after
        .into_iter()
        .filter(|item| !known.contains(&key(item)))
        .collect();

    match created.len() {
        1 => Ok(created.remove(0)),
        0 => Err(ApiError::Unresolved(
            "the job completed but no new object was found".to_string(),
        )),
        n => Err(ApiError::Unresolved(format!(
            "the job completed but {} new objects were found: {}",
            n,
            created
                .iter()
                .map(|item| key(item).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
