//! Host-side stand-ins for the node's hardware.
//!
//! A desktop node has no PWM LED, button or status LED, so these adapters
//! report through `tracing` instead. [`HostLink`] treats the host's own
//! network as always up.

use crate::traits::{ActuatorOutput, ButtonInput, Clock, Indicator, LinkDriver};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Link
// ============================================================================

/// Link driver for a host whose network is managed by the OS.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostLink;

impl LinkDriver for HostLink {
    fn associate(&mut self, ssid: &str, _password: &str) -> bool {
        tracing::debug!(ssid, "host link needs no association");
        true
    }

    fn is_up(&self) -> bool {
        true
    }
}

// ============================================================================
// Light
// ============================================================================

/// Light output that logs each channel write.
#[derive(Clone, Debug, Default)]
pub struct TracingOutput {
    levels: [u8; 8],
}

impl TracingOutput {
    /// Create an output with every channel at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to a channel.
    pub fn level(&self, channel: u8) -> u8 {
        self.levels.get(channel as usize).copied().unwrap_or(0)
    }
}

impl ActuatorOutput for TracingOutput {
    type Error = Infallible;

    fn set_level(&mut self, channel: u8, level: u8) -> Result<(), Self::Error> {
        if let Some(slot) = self.levels.get_mut(channel as usize) {
            *slot = level;
        }
        tracing::trace!(channel, level, "light");
        Ok(())
    }
}

/// Delay backed by `thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

// ============================================================================
// Button & Indicator
// ============================================================================

/// A button that is never pressed (reads high, as with a pull-up).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoButton;

impl ButtonInput for NoButton {
    fn read_level(&mut self) -> bool {
        true
    }
}

/// Status indicator that logs transitions.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingIndicator;

impl Indicator for TracingIndicator {
    fn set_indicator(&mut self, on: bool) {
        if on {
            tracing::info!("link indicator on");
        } else {
            tracing::warn!("link indicator off");
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Monotonic clock measured from construction.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_output_remembers_levels() {
        let mut out = TracingOutput::new();
        out.set_level(2, 128).unwrap();
        assert_eq!(out.level(2), 128);
        assert_eq!(out.level(0), 0);
        assert!(out.set_level(42, 1).is_ok());
    }

    #[test]
    fn host_link_is_always_up() {
        let mut link = HostLink;
        assert!(link.associate("any", "thing"));
        assert!(link.is_up());
    }

    #[test]
    fn no_button_reads_released() {
        assert!(NoButton.read_level());
    }

    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
