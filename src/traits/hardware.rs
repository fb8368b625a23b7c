//! Hardware abstraction traits for the light output, button, and indicator.
//!
//! This module defines the hardware interfaces that allow light-node to
//! work across different platforms (ESP32, desktop, mocks).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ActuatorOutput`] | PWM level per light channel |
//! | [`ButtonInput`] | Raw level of the local button |
//! | [`Indicator`] | Link-status LED |
//! | [`Clock`] | Time source for `no_std` environments |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use light_node::traits::ActuatorOutput;
//! use light_node::hal::MockOutput;
//!
//! let mut output = MockOutput::new();
//! output.set_level(0, 128).unwrap();
//! assert_eq!(output.level(0), 128);
//! ```

/// On/off state of the light.
///
/// Serialized on the wire as `"ON"` / `"OFF"`.
///
/// # Default
///
/// Defaults to [`Off`](Self::Off), the power-on state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchState {
    /// Light fully on.
    On,
    /// Light fully off.
    #[default]
    Off,
}

impl SwitchState {
    /// Returns the wire spelling (`"ON"` / `"OFF"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use light_node::SwitchState;
    ///
    /// assert_eq!(SwitchState::On.as_str(), "ON");
    /// assert_eq!(SwitchState::Off.as_str(), "OFF");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SwitchState::On => "ON",
            SwitchState::Off => "OFF",
        }
    }

    /// Parse the wire spelling. Matching is exact.
    ///
    /// # Examples
    ///
    /// ```
    /// use light_node::SwitchState;
    ///
    /// assert_eq!(SwitchState::from_wire("ON"), Some(SwitchState::On));
    /// assert_eq!(SwitchState::from_wire("OFF"), Some(SwitchState::Off));
    /// assert_eq!(SwitchState::from_wire("on"), None);
    /// ```
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ON" => Some(SwitchState::On),
            "OFF" => Some(SwitchState::Off),
            _ => None,
        }
    }

    /// Returns the opposite state.
    #[inline]
    pub const fn toggled(self) -> Self {
        match self {
            SwitchState::On => SwitchState::Off,
            SwitchState::Off => SwitchState::On,
        }
    }

    /// Returns `true` for [`On`](Self::On).
    #[inline]
    pub const fn is_on(self) -> bool {
        matches!(self, SwitchState::On)
    }

    /// PWM level this state settles at.
    #[inline]
    pub const fn level(self) -> u8 {
        match self {
            SwitchState::On => u8::MAX,
            SwitchState::Off => 0,
        }
    }
}

impl From<bool> for SwitchState {
    fn from(on: bool) -> Self {
        if on {
            SwitchState::On
        } else {
            SwitchState::Off
        }
    }
}

/// Light output trait. Abstracts a PWM-driven LED channel bank.
///
/// Implement this for your PWM peripheral. Each channel is addressed by
/// a small index; the level is an 8-bit duty value (0 = dark, 255 = full).
///
/// # Example Implementation
///
/// ```rust,ignore
/// use light_node::traits::ActuatorOutput;
///
/// struct MyLed { /* LEDC handles */ }
///
/// impl ActuatorOutput for MyLed {
///     type Error = ();
///
///     fn set_level(&mut self, channel: u8, level: u8) -> Result<(), ()> {
///         // Write duty cycle for the channel...
///         Ok(())
///     }
/// }
/// ```
pub trait ActuatorOutput {
    /// Error type for output operations.
    type Error;

    /// Set the duty level (0..=255) of one channel.
    fn set_level(&mut self, channel: u8, level: u8) -> Result<(), Self::Error>;
}

/// Local push-button input.
///
/// Returns the raw electrical level. Buttons are wired active-low with a
/// pull-up, so `false` means pressed. Debouncing is done by
/// [`InputDebouncer`](crate::InputDebouncer), not the implementor.
pub trait ButtonInput {
    /// Returns the raw pin level (`true` = high).
    fn read_level(&mut self) -> bool;
}

/// Link-status indicator (usually an on-board LED).
pub trait Indicator {
    /// Drive the indicator on or off.
    fn set_indicator(&mut self, on: bool);
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for retry scheduling,
/// fades, and debouncing. On desktop, this can wrap `std::time::Instant`.
/// On embedded, use a hardware timer.
///
/// # Example
///
/// ```rust
/// use light_node::traits::Clock;
/// use light_node::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}
