// src/generation/polling.rs
//! Bounded wait loop for callers that want to block on a job (the CLI does).
//! The HTTP API never runs this; browsers poll the status route themselves.

use std::time::Duration;
use tracing::{debug, warn};

use super::reconciler::{Correlation, Reconciler, StatusOutcome};
use super::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// 60 checks, 5 seconds apart.
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(5),
        }
    }
}

/// Polls until the job settles or the policy runs out. Provider errors count
/// as a spent attempt and are retried; validation errors end the loop.
pub async fn poll_until_settled(
    reconciler: &Reconciler,
    request_id: &str,
    correlation: &Correlation,
    policy: PollPolicy,
) -> Result<StatusOutcome, GenerationError> {
    for attempt in 1..=policy.max_attempts {
        match reconciler.check_status(request_id, correlation).await {
            Ok(StatusOutcome::Pending { status }) => {
                debug!("⏳ {} is {} (attempt {}/{})", request_id, status, attempt, policy.max_attempts);
            }
            Ok(outcome) => return Ok(outcome),
            Err(e @ GenerationError::Validation(_)) => return Err(e),
            Err(e) => {
                warn!("Status check {}/{} for {} failed: {}", attempt, policy.max_attempts, request_id, e);
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(GenerationError::TimedOut {
        attempts: policy.max_attempts,
    })
}
