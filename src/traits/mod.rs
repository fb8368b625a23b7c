//! Trait definitions for hardware and network abstraction.
//!
//! This module defines the seams that allow light-node to:
//! - Run on different hardware (ESP32, desktop, mocks)
//! - Use different link and broker implementations
//!
//! # Submodules
//!
//! - `hardware`: Light output, button input, status indicator, clock
//! - `network`: Network link and MQTT broker traits
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`ActuatorOutput`]: PWM level per output channel
//! - [`ButtonInput`]: Raw level of the local push button
//! - [`Indicator`]: Link-status LED
//! - [`Clock`]: Time source for `no_std` environments
//!
//! Blocking delays (used only by the blocking fade policy) come from
//! [`embedded_hal::delay::DelayNs`].

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
