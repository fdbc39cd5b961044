//! # Display output.
//!
//! Display workers hand every fired alarm to an [`AlarmOutput`]. The default
//! [`StdoutOutput`] prints one line per notice; tests and embedders plug in
//! their own sink.
//!
//! The output is called **outside** any registry access, so a slow sink only
//! delays its own worker. A worker observes its stop flag only after the sink
//! returns.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use alarmvisor::{AlarmOutput, Notice};
//!
//! struct Quiet;
//!
//! #[async_trait]
//! impl AlarmOutput for Quiet {
//!     async fn display(&self, _notice: &Notice) {}
//! }
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::requests::{MessageId, MessageType};

/// Data describing one fired alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Current type of the entry.
    pub message_type: MessageType,
    /// Type the entry had before its last replacement (equal to `message_type` if never changed).
    pub previous_type: MessageType,
    /// Message number.
    pub id: MessageId,
    /// Display text.
    pub text: Arc<str>,
    /// Wall-clock time of the display.
    pub at: SystemTime,
}

impl Notice {
    /// Seconds since the Unix epoch of [`Notice::at`].
    pub fn unix_secs(&self) -> u64 {
        self.at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Sink for display output.
#[async_trait]
pub trait AlarmOutput: Send + Sync + 'static {
    /// Shows a fired alarm.
    async fn display(&self, notice: &Notice);

    /// Shows the one-time notice for an entry whose type changed by replacement.
    ///
    /// Called right before [`display`](AlarmOutput::display) for the same entry.
    async fn type_changed(&self, _notice: &Notice) {}
}

/// Prints notices to stdout.
#[derive(Debug, Default)]
pub struct StdoutOutput;

#[async_trait]
impl AlarmOutput for StdoutOutput {
    async fn display(&self, n: &Notice) {
        println!(
            "Alarm With Message Type ({}) and Message Number ({}) Displayed at <{}>: \"{}\"",
            n.message_type,
            n.id,
            n.unix_secs(),
            n.text
        );
    }

    async fn type_changed(&self, n: &Notice) {
        println!(
            "Alarm With Message Number ({}) Changed Type ({} -> {}) at <{}>",
            n.id,
            n.previous_type,
            n.message_type,
            n.unix_secs()
        );
    }
}
