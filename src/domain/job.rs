//! Scraping Job
//!
//! Lifecycle of one discovery-and-scoring run:
//! `Pending -> Running -> {Completed | Failed}`.
//! Terminal states are final; every transition out of one is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::token::TokenMetrics;

/// Monotonic job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobError {
    #[error("Invalid job transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: &'static str,
        to: &'static str,
    },
}

/// Observable state of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingJob {
    pub id: JobId,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_tokens: usize,
    pub processed_tokens: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TokenMetrics>>,
}

impl ScrapingJob {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            start_time: Utc::now(),
            finish_time: None,
            status: JobStatus::Pending,
            error: None,
            total_tokens: 0,
            processed_tokens: 0,
            results: None,
        }
    }

    pub fn mark_running(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Pending, JobStatus::Running)
    }

    /// Fix the number of discovered tokens
    pub fn set_total(&mut self, total: usize) -> Result<(), JobError> {
        self.require(JobStatus::Running, JobStatus::Running)?;
        self.total_tokens = total;
        Ok(())
    }

    /// Count one token pipeline attempt, successful or not
    pub fn record_processed(&mut self) -> Result<(), JobError> {
        self.require(JobStatus::Running, JobStatus::Running)?;
        self.processed_tokens += 1;
        Ok(())
    }

    pub fn complete(&mut self, results: Vec<TokenMetrics>) -> Result<(), JobError> {
        self.transition(JobStatus::Running, JobStatus::Completed)?;
        self.results = Some(results);
        self.finish_time = Some(Utc::now());
        Ok(())
    }

    /// Fail the job; allowed from pending or running
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(self.invalid(JobStatus::Failed));
        }
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        self.finish_time = Some(Utc::now());
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> Result<(), JobError> {
        self.require(from, to)?;
        self.status = to;
        Ok(())
    }

    fn require(&self, expected: JobStatus, to: JobStatus) -> Result<(), JobError> {
        if self.status != expected {
            return Err(self.invalid(to));
        }
        Ok(())
    }

    fn invalid(&self, to: JobStatus) -> JobError {
        JobError::InvalidTransition {
            id: self.id,
            from: self.status.as_str(),
            to: to.as_str(),
        }
    }
}
