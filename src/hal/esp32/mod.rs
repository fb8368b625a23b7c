//! ESP32-C3 hardware abstraction layer for a light node.
//!
//! This module provides hardware implementations for an ESP32-C3 board
//! driving an RGB LED, reading a push-button, and showing link status on
//! the on-board LED.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 (RISC-V 160MHz)
//! - **Light**: common-cathode RGB LED on three LEDC channels
//! - **Button**: momentary switch to GND, internal pull-up
//! - **Indicator**: on-board LED
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments.

mod button;
mod clock;
mod indicator;
mod led;

pub use button::Esp32Button;
pub use clock::Esp32Clock;
pub use indicator::Esp32Indicator;
pub use led::{Esp32Led, Esp32LedError};

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Link;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::Esp32Broker;

/// Pin assignments for the ESP32-C3 light node.
pub mod pins {
    // =========================================================================
    // RGB Light (LEDC PWM)
    // =========================================================================

    /// Red channel
    pub const LED_R: i32 = 4;

    /// Green channel
    pub const LED_G: i32 = 3;

    /// Blue channel
    pub const LED_B: i32 = 2;

    // =========================================================================
    // Inputs / Status
    // =========================================================================

    /// Link-status LED
    pub const STATUS_LED: i32 = 8;

    /// Push-button (active low, also the BOOT strap; only matters while flashing)
    pub const BUTTON: i32 = 9;
}
