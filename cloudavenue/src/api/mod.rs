//! Cloud Avenue API client

pub mod client;
pub mod common;
pub mod edge_gateway;
pub mod error;
pub mod job;
pub mod public_ip;
pub mod vdc;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{Client, ConnectionConfig, Credentials};
pub use common::{single_new_entry, ApiQueryParams, JobRef};
pub use error::{classify, ApiError, ClassifiedError, HttpResponse};
pub use job::{await_job, JobError, JobHandle, JobReport, JobStatus, JobTracker, RetryPolicy};
