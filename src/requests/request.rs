//! # Request payloads and validated constructors.
//!
//! A [`Request`] is created by the submitter and owned by the registry once
//! admitted. Constructors reject non-positive numbers; the text limit is
//! enforced at admission because it comes from [`AlarmConfig`](crate::AlarmConfig).
//!
//! ## Example
//! ```rust
//! use alarmvisor::{Request, RequestKind};
//!
//! let req = Request::schedule(1, 5, 2, "hi").unwrap();
//! assert_eq!(req.kind(), RequestKind::Schedule);
//!
//! assert!(Request::watch(0).is_err());
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::ValidationError;

/// Category tag grouping SCHEDULE entries for display.
pub type MessageType = u32;

/// Message number, unique among SCHEDULE entries.
pub type MessageId = u32;

/// Classification of requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// One-shot alarm tied to an id and a type.
    Schedule,
    /// Subscription displaying all SCHEDULE entries of a type.
    Watch,
    /// Withdrawal of a SCHEDULE entry by id.
    Cancel,
}

impl RequestKind {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RequestKind::Schedule => "schedule",
            RequestKind::Watch => "watch",
            RequestKind::Cancel => "cancel",
        }
    }
}

/// SCHEDULE payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Display category.
    pub message_type: MessageType,
    /// Message number.
    pub id: MessageId,
    /// Time until the alarm fires; also the period in periodic mode.
    pub ttl: Duration,
    /// Display text.
    pub text: Arc<str>,
}

/// WATCH payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watch {
    /// Watched category.
    pub message_type: MessageType,
}

/// CANCEL payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancel {
    /// Id of the SCHEDULE entry to withdraw.
    pub id: MessageId,
}

/// A validated request ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Schedule(Schedule),
    Watch(Watch),
    Cancel(Cancel),
}

impl Request {
    /// Builds a SCHEDULE request firing `ttl_secs` seconds after admission.
    ///
    /// ### Errors
    /// `ValidationError::NotPositive` if `message_type`, `id` or `ttl_secs` is zero.
    pub fn schedule(
        message_type: MessageType,
        id: MessageId,
        ttl_secs: u32,
        text: impl Into<Arc<str>>,
    ) -> Result<Self, ValidationError> {
        positive("type", message_type)?;
        positive("id", id)?;
        positive("ttl", ttl_secs)?;
        Ok(Request::Schedule(Schedule {
            message_type,
            id,
            ttl: Duration::from_secs(u64::from(ttl_secs)),
            text: text.into(),
        }))
    }

    /// Builds a WATCH request for `message_type`.
    pub fn watch(message_type: MessageType) -> Result<Self, ValidationError> {
        positive("type", message_type)?;
        Ok(Request::Watch(Watch { message_type }))
    }

    /// Builds a CANCEL request for SCHEDULE `id`.
    pub fn cancel(id: MessageId) -> Result<Self, ValidationError> {
        positive("id", id)?;
        Ok(Request::Cancel(Cancel { id }))
    }

    /// Returns the request category.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Schedule(_) => RequestKind::Schedule,
            Request::Watch(_) => RequestKind::Watch,
            Request::Cancel(_) => RequestKind::Cancel,
        }
    }

    /// Checks limits that depend on runtime configuration.
    pub(crate) fn check_text(&self, max: usize) -> Result<(), ValidationError> {
        match self {
            Request::Schedule(s) if s.text.len() > max => Err(ValidationError::TextTooLong {
                len: s.text.len(),
                max,
            }),
            _ => Ok(()),
        }
    }
}

fn positive(field: &'static str, value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        Err(ValidationError::NotPositive { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_converts_ttl_to_seconds() {
        let Request::Schedule(s) = Request::schedule(3, 7, 2, "wake up").unwrap() else {
            panic!("expected schedule");
        };
        assert_eq!(s.ttl, Duration::from_secs(2));
        assert_eq!(&*s.text, "wake up");
    }

    #[test]
    fn test_zero_fields_are_rejected() {
        assert_eq!(
            Request::schedule(0, 1, 1, "x"),
            Err(ValidationError::NotPositive { field: "type" })
        );
        assert_eq!(
            Request::schedule(1, 0, 1, "x"),
            Err(ValidationError::NotPositive { field: "id" })
        );
        assert_eq!(
            Request::schedule(1, 1, 0, "x"),
            Err(ValidationError::NotPositive { field: "ttl" })
        );
        assert!(Request::watch(0).is_err());
        assert!(Request::cancel(0).is_err());
    }

    #[test]
    fn test_text_limit_applies_to_schedule_only() {
        let long = "x".repeat(10);
        let req = Request::schedule(1, 1, 1, long.as_str()).unwrap();
        assert_eq!(
            req.check_text(4),
            Err(ValidationError::TextTooLong { len: 10, max: 4 })
        );
        assert!(req.check_text(10).is_ok());
        assert!(Request::watch(1).unwrap().check_text(0).is_ok());
    }
}
