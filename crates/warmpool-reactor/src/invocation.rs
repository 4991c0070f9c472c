//! Per-notification invocation record.

use serde::{Deserialize, Serialize};

use warmpool_core::{FilterDecision, RejectReason};

use crate::error::ReactorError;

/// A completed dispatch. Both variants end the invocation in `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The fleet manager accepted the `CONTINUE`.
    Continued { attempts: u32 },
    /// The token was already spent; a duplicate delivery or a retry after a
    /// lost response.
    AlreadyCompleted { attempts: u32 },
}

impl Completion {
    pub fn attempts(&self) -> u32 {
        match self {
            Completion::Continued { attempts } | Completion::AlreadyCompleted { attempts } => {
                *attempts
            }
        }
    }
}

/// States an invocation passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Received,
    Filtered { decision: FilterDecision },
    Dispatching { attempt: u32 },
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedNotification,
    TransientDispatchFailure,
    DispatchRejected,
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Rejected {
        reason: RejectReason,
    },
    Completed {
        attempts: u32,
        already_completed: bool,
    },
    Failed {
        kind: FailureKind,
        attempts: u32,
        message: String,
    },
}

impl From<Completion> for Outcome {
    fn from(c: Completion) -> Self {
        Outcome::Completed {
            attempts: c.attempts(),
            already_completed: matches!(c, Completion::AlreadyCompleted { .. }),
        }
    }
}

impl From<&ReactorError> for Outcome {
    fn from(e: &ReactorError) -> Self {
        let (kind, attempts) = match e {
            ReactorError::MalformedNotification(_) => (FailureKind::MalformedNotification, 0),
            ReactorError::TransientDispatchFailure { attempts, .. } => {
                (FailureKind::TransientDispatchFailure, *attempts)
            }
            ReactorError::DispatchRejected { attempts, .. } => {
                (FailureKind::DispatchRejected, *attempts)
            }
        };
        Outcome::Failed {
            kind,
            attempts,
            message: e.to_string(),
        }
    }
}

/// Report of one notification's trip through the reactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub group: String,
    pub instance: String,
    pub outcome: Outcome,
    pub trail: Vec<Phase>,
}

impl Invocation {
    /// The last state reached.
    pub fn terminal(&self) -> Option<Phase> {
        self.trail.last().copied()
    }

    /// Number of completion calls issued.
    pub fn calls(&self) -> usize {
        self.trail
            .iter()
            .filter(|p| matches!(p, Phase::Dispatching { .. }))
            .count()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Failed {
                kind: FailureKind::MalformedNotification,
                ..
            }
        )
    }
}
