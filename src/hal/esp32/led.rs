//! RGB light output using ESP32 LEDC PWM.
//!
//! Each colour is one LEDC channel sharing a single timer. Channel index
//! `0`, `1`, `2` map to red, green, blue, matching the default
//! `ActuatorConfig::channels`.

use crate::traits::ActuatorOutput;
use esp_idf_hal::ledc::LedcDriver;
use esp_idf_hal::sys::EspError;
use thiserror::Error;

/// Errors from [`Esp32Led`].
#[derive(Debug, Error)]
pub enum Esp32LedError {
    /// Channel index has no driver.
    #[error("no LED on channel {0}")]
    Channel(u8),
    /// The LEDC driver rejected the duty update.
    #[error("LEDC error: {0}")]
    Pwm(#[from] EspError),
}

/// RGB LED on three LEDC channels.
///
/// # Example
///
/// ```ignore
/// use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
/// use light_node::hal::esp32::Esp32Led;
///
/// let timer = LedcTimerDriver::new(
///     peripherals.ledc.timer0,
///     &TimerConfig::default().frequency(5.kHz().into()).resolution(Resolution::Bits8),
/// )?;
/// let led = Esp32Led::new([
///     LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio4)?,
///     LedcDriver::new(peripherals.ledc.channel1, &timer, peripherals.pins.gpio3)?,
///     LedcDriver::new(peripherals.ledc.channel2, &timer, peripherals.pins.gpio2)?,
/// ])?;
/// ```
pub struct Esp32Led<'d> {
    channels: [LedcDriver<'d>; 3],
}

impl<'d> Esp32Led<'d> {
    /// Wrap three configured channels and switch them all off.
    pub fn new(channels: [LedcDriver<'d>; 3]) -> Result<Self, EspError> {
        let mut led = Self { channels };
        for driver in led.channels.iter_mut() {
            driver.set_duty(0)?;
        }
        Ok(led)
    }
}

impl ActuatorOutput for Esp32Led<'_> {
    type Error = Esp32LedError;

    fn set_level(&mut self, channel: u8, level: u8) -> Result<(), Self::Error> {
        let driver = self
            .channels
            .get_mut(channel as usize)
            .ok_or(Esp32LedError::Channel(channel))?;
        let duty = level as u32 * driver.get_max_duty() / u8::MAX as u32;
        driver.set_duty(duty)?;
        Ok(())
    }
}
