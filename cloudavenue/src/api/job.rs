//! Asynchronous job tracking
//!
//! Long running Cloud Avenue operations (edge gateways, public IPs, VDCs)
//! answer with a job id instead of the object. [`await_job`] polls the job
//! until it reaches a target status, then runs a resolving query that fetches
//! the object the job worked on.
//!
//! Polling stops on the first terminal failure; nothing is retried. When the
//! deadline passes the backend job is left running and the caller gets a
//! timeout error, since the outcome of the operation is unknown.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::types::Diagnostic;
use thiserror::Error;
use tokio::time::{self, Instant};

use super::error::ApiError;

/// Identifier of a backend job, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Result<Self, JobError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(JobError::InvalidHandle);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status as reported by the jobs endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Created,
    Pending,
    InProgress,
    Done,
    Failed,
    Error,
    Unknown,
}

impl JobStatus {
    /// Map a raw backend status. Matching is exact; anything outside the
    /// known vocabulary is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CREATED" => JobStatus::Created,
            "PENDING" => JobStatus::Pending,
            "IN_PROGRESS" => JobStatus::InProgress,
            "DONE" => JobStatus::Done,
            "FAILED" => JobStatus::Failed,
            "ERROR" => JobStatus::Error,
            _ => JobStatus::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Created => "created",
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Unknown => "",
        };
        f.write_str(name)
    }
}

/// One observation of a job
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub status: JobStatus,
    /// Status string exactly as the backend sent it
    pub raw: String,
    pub description: String,
}

/// Polling schedule for one kind of job
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub min_interval: Duration,
    pub timeout: Duration,
    pub pending: Vec<JobStatus>,
    pub target: Vec<JobStatus>,
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, min_interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay,
            min_interval,
            timeout,
            pending: vec![JobStatus::Created, JobStatus::Pending, JobStatus::InProgress],
            target: vec![JobStatus::Done],
        }
    }

    pub fn edge_gateway() -> Self {
        Self::new(
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(8 * 60),
        )
    }

    pub fn public_ip() -> Self {
        Self::new(
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(5 * 60),
        )
    }

    pub fn vdc() -> Self {
        Self::new(
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(10 * 60),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.timeout <= self.initial_delay {
            return Err(JobError::InvalidPolicy(format!(
                "timeout {:?} must be longer than the initial delay {:?}",
                self.timeout, self.initial_delay
            )));
        }
        if self.min_interval.is_zero() {
            return Err(JobError::InvalidPolicy(
                "poll interval must not be zero".to_string(),
            ));
        }
        if self.pending.is_empty() || self.target.is_empty() {
            return Err(JobError::InvalidPolicy(
                "pending and target statuses must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Source of job status observations
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn job_status(&self, job: &JobHandle) -> Result<JobReport, ApiError>;
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job id must not be empty")]
    InvalidHandle,

    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),

    #[error("job {job} ended with status {status}: {description}")]
    Failed {
        job: JobHandle,
        status: JobStatus,
        description: String,
    },

    #[error("job {job} reported unexpected status `{raw}`")]
    UnexpectedStatus { job: JobHandle, raw: String },

    #[error(
        "job {job} did not complete within {timeout:?}, the outcome of the operation is unknown"
    )]
    Timeout { job: JobHandle, timeout: Duration },

    #[error("waiting for job {job} was cancelled")]
    Cancelled { job: JobHandle },

    #[error("failed to read status of job {job}: {source}")]
    Status {
        job: JobHandle,
        #[source]
        source: ApiError,
    },

    #[error("job {job} completed but its result could not be read: {source}")]
    Resolve {
        job: JobHandle,
        #[source]
        source: ApiError,
    },
}

impl JobError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Timeout { .. })
    }

    pub fn to_diagnostic(&self, operation: &str) -> Diagnostic {
        let summary = match self {
            JobError::Timeout { .. } => format!("{} timed out", operation),
            _ => format!("{} failed", operation),
        };
        Diagnostic::error(summary, self.to_string())
    }
}

/// Poll `job` until it reaches one of the policy's target statuses, then
/// return what `resolve` produces.
///
/// The deadline is the earlier of the policy timeout and the context
/// deadline. The first poll happens after the initial delay, the following
/// ones every `min_interval`.
pub async fn await_job<T, F, Fut>(
    ctx: &Context,
    tracker: &dyn JobTracker,
    job: &JobHandle,
    policy: &RetryPolicy,
    resolve: F,
) -> Result<T, JobError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    policy.validate()?;

    let started = Instant::now();
    let mut deadline = started + policy.timeout;
    if let Some(ctx_deadline) = ctx.deadline() {
        deadline = deadline.min(ctx_deadline);
    }
    let budget = deadline.saturating_duration_since(started);
    let timeout = || {
        tracing::error!(job = %job, timeout = ?budget, "job did not complete before the deadline");
        JobError::Timeout {
            job: job.clone(),
            timeout: budget,
        }
    };
    let interrupted = || {
        if ctx.deadline_exceeded() {
            timeout()
        } else {
            tracing::debug!(job = %job, "stopped waiting for job");
            JobError::Cancelled { job: job.clone() }
        }
    };

    let mut wait = policy.initial_delay;
    let mut polls = 0u32;

    loop {
        let wake = (Instant::now() + wait).min(deadline);
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(interrupted()),
            _ = time::sleep_until(wake) => {}
        }
        if Instant::now() >= deadline {
            return Err(timeout());
        }

        let report = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(interrupted()),
            _ = time::sleep_until(deadline) => return Err(timeout()),
            report = tracker.job_status(job) => report.map_err(|source| JobError::Status {
                job: job.clone(),
                source,
            })?,
        };
        polls += 1;

        tracing::debug!(job = %job, status = %report.raw, poll = polls, "job status");

        if policy.target.contains(&report.status) {
            tracing::info!(job = %job, polls, elapsed = ?started.elapsed(), "job completed");
            return tokio::select! {
                biased;
                _ = ctx.cancelled() => Err(interrupted()),
                resolved = resolve() => resolved.map_err(|source| JobError::Resolve {
                    job: job.clone(),
                    source,
                }),
            };
        }

        match report.status {
            JobStatus::Failed | JobStatus::Error => {
                tracing::warn!(
                    job = %job,
                    status = %report.raw,
                    "job failed: {}",
                    report.description
                );
                return Err(JobError::Failed {
                    job: job.clone(),
                    status: report.status,
                    description: report.description,
                });
            }
            status if policy.pending.contains(&status) => wait = policy.min_interval,
            _ => {
                tracing::error!(job = %job, status = %report.raw, "unexpected job status");
                return Err(JobError::UnexpectedStatus {
                    job: job.clone(),
                    raw: report.raw,
                });
            }
        }
    }
}
