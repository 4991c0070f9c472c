//! Reactor error types.

use thiserror::Error;

use warmpool_core::NotificationError;
use warmpool_fleet::FleetError;

/// Ways an admitted notification can end in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactorError {
    #[error("malformed notification: {0}")]
    MalformedNotification(#[from] NotificationError),

    #[error("completion dispatch failed after {attempts} attempt(s): {last}")]
    TransientDispatchFailure { attempts: u32, last: FleetError },

    #[error("completion rejected after {attempts} attempt(s): {last}")]
    DispatchRejected { attempts: u32, last: FleetError },
}

pub type ReactorResult<T> = Result<T, ReactorError>;
