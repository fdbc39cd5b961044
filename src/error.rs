//! Error types used by the alarm scheduler.
//!
//! This module defines the error enums returned across the public API:
//!
//! - [`ValidationError`] - malformed request fields, rejected before admission.
//! - [`SubmitError`] - admission outcomes other than acceptance.
//! - [`RuntimeError`] - failures of the runtime itself (broken concurrency invariants, shutdown).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Admission outcomes map onto the four-way [`AdmissionStatus`] tag.

use std::time::Duration;
use thiserror::Error;

use crate::requests::{MessageId, MessageType};

/// Outcome tag of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionStatus {
    /// The request was linked into the registry.
    Accepted,
    /// The request conflicts with a pending one (second WATCH, second CANCEL).
    Duplicate,
    /// The request references something that does not exist.
    NotFound,
    /// The request fields are malformed or out of range.
    Invalid,
}

impl AdmissionStatus {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdmissionStatus::Accepted => "accepted",
            AdmissionStatus::Duplicate => "duplicate",
            AdmissionStatus::NotFound => "not_found",
            AdmissionStatus::Invalid => "invalid",
        }
    }
}

/// # Malformed request fields.
///
/// Produced by the [`Request`](crate::Request) constructors and by admission
/// (text length depends on [`AlarmConfig`](crate::AlarmConfig)).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A numeric field must be strictly positive.
    #[error("{field} must be positive")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
    },

    /// SCHEDULE text exceeds the configured limit.
    #[error("text is {len} bytes, limit is {max}")]
    TextTooLong {
        /// Actual length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
}

impl ValidationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ValidationError::NotPositive { .. } => "validation_not_positive",
            ValidationError::TextTooLong { .. } => "validation_text_too_long",
        }
    }
}

/// # Errors returned by [`Scheduler::submit`](crate::Scheduler::submit).
///
/// Every variant is a local rejection: no partial mutation of the registry
/// happens when one of these is returned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Request fields failed validation.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A WATCH for this type is already present.
    #[error("type {message_type} is already watched")]
    DuplicateWatch {
        /// Watched type.
        message_type: MessageType,
    },

    /// A CANCEL for this id is already pending.
    #[error("cancel for message {id} is already pending")]
    DuplicateCancel {
        /// Targeted message id.
        id: MessageId,
    },

    /// WATCH for a type without any SCHEDULE entry.
    #[error("no scheduled alarm with type {message_type}")]
    TypeNotFound {
        /// Requested type.
        message_type: MessageType,
    },

    /// CANCEL for an id without a SCHEDULE entry.
    #[error("no scheduled alarm with id {id} to cancel")]
    IdNotFound {
        /// Requested id.
        id: MessageId,
    },

    /// An underlying synchronization primitive failed (fatal).
    #[error("synchronization failure: {reason}")]
    Synchronization {
        /// What broke.
        reason: String,
    },

    /// The scheduler is shutting down and no longer admits requests.
    #[error("scheduler is shut down")]
    Closed,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use alarmvisor::SubmitError;
    ///
    /// let err = SubmitError::IdNotFound { id: 7 };
    /// assert_eq!(err.as_label(), "submit_id_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::Validation(e) => e.as_label(),
            SubmitError::DuplicateWatch { .. } => "submit_duplicate_watch",
            SubmitError::DuplicateCancel { .. } => "submit_duplicate_cancel",
            SubmitError::TypeNotFound { .. } => "submit_type_not_found",
            SubmitError::IdNotFound { .. } => "submit_id_not_found",
            SubmitError::Synchronization { .. } => "submit_synchronization",
            SubmitError::Closed => "submit_closed",
        }
    }

    /// Returns the admission tag for rejections, `None` for runtime failures.
    ///
    /// # Example
    /// ```
    /// use alarmvisor::{AdmissionStatus, SubmitError};
    ///
    /// let err = SubmitError::TypeNotFound { message_type: 2 };
    /// assert_eq!(err.status(), Some(AdmissionStatus::NotFound));
    /// assert_eq!(SubmitError::Closed.status(), None);
    /// ```
    pub fn status(&self) -> Option<AdmissionStatus> {
        match self {
            SubmitError::Validation(_) => Some(AdmissionStatus::Invalid),
            SubmitError::DuplicateWatch { .. } | SubmitError::DuplicateCancel { .. } => {
                Some(AdmissionStatus::Duplicate)
            }
            SubmitError::TypeNotFound { .. } | SubmitError::IdNotFound { .. } => {
                Some(AdmissionStatus::NotFound)
            }
            SubmitError::Synchronization { .. } | SubmitError::Closed => None,
        }
    }

    /// Returns true if the error indicates a broken runtime rather than a rejected request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SubmitError::Synchronization { .. })
    }
}

/// # Errors produced by the scheduler runtime.
///
/// These represent failures in the orchestration itself, never a rejected request.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A locking/signaling invariant was broken (poisoned state, lost dispatcher).
    #[error("synchronization failure: {reason}")]
    Synchronization {
        /// What broke.
        reason: String,
    },

    /// Shutdown grace period was exceeded; some display workers did not stop in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck worker types: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Message types whose workers did not shut down in time.
        stuck: Vec<MessageType>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use alarmvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Synchronization { .. } => "runtime_synchronization",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Synchronization { reason } => format!("synchronization: {reason}"),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck types={stuck:?}")
            }
        }
    }
}

impl From<RuntimeError> for SubmitError {
    fn from(err: RuntimeError) -> Self {
        SubmitError::Synchronization {
            reason: err.as_message(),
        }
    }
}
