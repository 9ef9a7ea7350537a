//! Fatal pipeline errors.
//!
//! Recoverable conditions are not errors here: they travel as
//! [`Degradation`](crate::report::Degradation) values and drop counts.

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The station payload does not have the expected shape at all.
    #[error("structural failure in station feed: {0}")]
    Structural(String),

    /// The configuration cannot produce a meaningful run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run exceeded its time budget. Nothing was committed.
    #[error("pipeline run timed out after {0}s")]
    Timeout(u64),
}
