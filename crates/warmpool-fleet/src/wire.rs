//! HTTP wire format shared by the client and the simulator.

use serde::{Deserialize, Serialize};

use crate::error::FleetError;

/// Header naming the API action being invoked.
pub const ACTION_HEADER: &str = "x-fleet-action";

pub const COMPLETE_LIFECYCLE_ACTION: &str = "CompleteLifecycleAction";

pub const CODE_VALIDATION: &str = "ValidationError";
pub const CODE_THROTTLING: &str = "Throttling";
pub const CODE_ACCESS_DENIED: &str = "AccessDenied";
pub const CODE_SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";

/// Message prefix the fleet manager uses for stale or unknown tokens.
pub const NO_ACTIVE_ACTION: &str = "No active Lifecycle Action found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

/// Map a response status and body onto the dispatch taxonomy.
pub fn classify(status: u16, body: &[u8]) -> Result<(), FleetError> {
    if (200..300).contains(&status) {
        return Ok(());
    }

    let detail = serde_json::from_slice::<ErrorBody>(body).ok().map(|b| b.error);
    let (code, message) = match &detail {
        Some(d) => (d.code.as_str(), d.message.clone()),
        None => ("", String::from_utf8_lossy(body).into_owned()),
    };
    let described = format!("{status} {code}: {message}");

    if status == 400
        && code == CODE_VALIDATION
        && message
            .to_ascii_lowercase()
            .contains(&NO_ACTIVE_ACTION.to_ascii_lowercase())
    {
        return Err(FleetError::AlreadyCompletedOrUnknownToken(message));
    }

    if code == CODE_THROTTLING || status == 408 || status == 429 || status >= 500 {
        return Err(FleetError::Transient(described));
    }

    Err(FleetError::Rejected(described))
}

impl FleetError {
    /// Status and body the simulator answers with for this error.
    pub fn to_wire(&self) -> (u16, ErrorBody) {
        match self {
            FleetError::AlreadyCompletedOrUnknownToken(msg) => {
                (400, ErrorBody::new(CODE_VALIDATION, msg.clone()))
            }
            FleetError::Transient(msg) => (400, ErrorBody::new(CODE_THROTTLING, msg.clone())),
            FleetError::Rejected(msg) => (403, ErrorBody::new(CODE_ACCESS_DENIED, msg.clone())),
        }
    }
}
