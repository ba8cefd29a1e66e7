//! Workflow errors

use thiserror::Error;

/// Errors raised while starting or signalling billing periods
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// Requested period exceeds the one-year execution limit
    #[error("Billing period of {days} days exceeds the maximum of {max} days")]
    PeriodTooLong { days: u32, max: u32 },

    /// No workflow was ever started for the bill
    #[error("No billing period for bill: {0}")]
    NotFound(String),

    /// A workflow already exists for the bill
    #[error("Billing period already running for bill: {0}")]
    AlreadyRunning(String),

    /// The workflow has finished and accepts no more signals
    #[error("Billing period has stopped: {0}")]
    Stopped(String),
}
