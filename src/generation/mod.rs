// src/generation/mod.rs
//! Video generation lifecycle: model registry, job submission, and status
//! reconciliation against the fal.ai queue.

pub mod error;
pub mod payload;
pub mod polling;
pub mod reconciler;
pub mod registry;
pub mod submitter;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, GenerationError};
pub use polling::{poll_until_settled, PollPolicy};
pub use reconciler::{Correlation, Reconciler, StatusOutcome};
pub use registry::{
    calculate_cost, validate_aspect_ratio, validate_duration, validate_resolution, AspectRatio,
    ModelProfile, VideoModel,
};
pub use submitter::{GenerationRequest, Submission, Submitter};
