//! # Alarm requests.
//!
//! This module provides the request types handed to
//! [`Scheduler::submit`](crate::Scheduler::submit):
//! - [`Request`] - one of SCHEDULE, WATCH or CANCEL
//! - [`Schedule`], [`Watch`], [`Cancel`] - the validated payloads
//! - [`RequestKind`] - the category tag
//!
//! Constructors validate field ranges; admission rules that depend on the
//! registry contents (duplicates, missing targets) are checked on submit.

mod request;

pub use request::{Cancel, MessageId, MessageType, Request, RequestKind, Schedule, Watch};
