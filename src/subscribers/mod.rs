//! # Event subscribers for the alarm scheduler.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the optional built-in `LogWriter`.
//!
//! ## Architecture
//! ```text
//!   Dispatcher / DisplayWorker / submit ── publish(Event) ──► Bus
//!                                                              │
//!                                                   subscriber_listener
//!                                                              │
//!                                                        SubscriberSet
//!                                                    ┌─────────┼─────────┐
//!                                                    ▼         ▼         ▼
//!                                                LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use alarmvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct Displays;
//!
//! #[async_trait]
//! impl Subscribe for Displays {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::AlarmDisplayed {
//!             // count displays
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
