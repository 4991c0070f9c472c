//! Fleet manager call errors.

use thiserror::Error;

pub type FleetResult<T> = Result<T, FleetError>;

/// Why a `CompleteLifecycleAction` call did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    /// The token was already completed or never existed. Success-equivalent
    /// for the promotion path.
    #[error("lifecycle action already completed or token unknown: {0}")]
    AlreadyCompletedOrUnknownToken(String),

    /// Network failure, timeout or throttling. Worth retrying.
    #[error("transient dispatch failure: {0}")]
    Transient(String),

    /// The fleet manager refused the call for a reason retrying will not fix.
    #[error("fleet manager rejected the call: {0}")]
    Rejected(String),
}

impl FleetError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FleetError::Transient(_))
    }
}
