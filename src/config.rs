//! # Global runtime configuration.
//!
//! Provides [`AlarmConfig`] centralized settings for the scheduler runtime.
//!
//! Config is consumed once by [`Scheduler::builder`](crate::Scheduler::builder):
//! the bus is sized from it, admission validates text length against it, the
//! dispatcher uses its grace periods, and display workers follow its
//! [`DisplayMode`].
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `max_text_len = 0` → clamped to 1
//! - `retire_grace = 0s` → a worker that is not already finished becomes orphaned immediately

use std::time::Duration;

/// Maximum payload length accepted by default (bytes).
pub const DEFAULT_MAX_TEXT_LEN: usize = 128;

/// What a display worker does with a SCHEDULE entry once it fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// The entry is removed from the registry after its single display.
    #[default]
    OneShot,
    /// The entry stays; its deadline is recomputed as `now + period` after each display.
    Periodic,
}

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `retire_grace`: How long the dispatcher waits for a retired worker to exit
/// - `grace`: Maximum wait for all workers on shutdown
/// - `max_text_len`: Upper bound for SCHEDULE payload length (bytes)
/// - `display_mode`: One-shot or periodic display of SCHEDULE entries
///
/// ## Notes
/// All fields are public. Prefer the helper accessors to avoid repeating
/// sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct AlarmConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events observe `Lagged`
    /// and skip older items.
    pub bus_capacity: usize,

    /// Time a retired worker gets to honor its stop flag.
    ///
    /// A worker that does not exit within this window is marked orphaned
    /// and stays visible in snapshots.
    pub retire_grace: Duration,

    /// Maximum time to wait for all workers during shutdown.
    ///
    /// If exceeded, shutdown returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Maximum SCHEDULE text length in bytes.
    pub max_text_len: usize,

    /// Display policy for fired SCHEDULE entries.
    pub display_mode: DisplayMode,
}

impl AlarmConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the text length limit clamped to a minimum of 1.
    #[inline]
    pub fn max_text_len_clamped(&self) -> usize {
        self.max_text_len.max(1)
    }
}

impl Default for AlarmConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `retire_grace = 1s`
    /// - `grace = 5s`
    /// - `max_text_len = 128`
    /// - `display_mode = DisplayMode::OneShot`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            retire_grace: Duration::from_secs(1),
            grace: Duration::from_secs(5),
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            display_mode: DisplayMode::OneShot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AlarmConfig::default();
        assert_eq!(cfg.bus_capacity, 1024);
        assert_eq!(cfg.max_text_len, DEFAULT_MAX_TEXT_LEN);
        assert_eq!(cfg.display_mode, DisplayMode::OneShot);
        assert!(cfg.retire_grace < cfg.grace);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let cfg = AlarmConfig {
            bus_capacity: 0,
            max_text_len: 0,
            ..AlarmConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.max_text_len_clamped(), 1);
    }
}
