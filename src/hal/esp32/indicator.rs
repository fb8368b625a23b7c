//! Link-status LED for ESP32.

use crate::traits::Indicator;
use esp_idf_hal::gpio::{Output, OutputPin, PinDriver};
use esp_idf_hal::peripheral::Peripheral;

/// On-board status LED, lit while the node is online.
pub struct Esp32Indicator<'d, P: OutputPin> {
    pin: PinDriver<'d, P, Output>,
}

impl<'d, P: OutputPin> Esp32Indicator<'d, P> {
    /// Configure `pin` as an output, initially off.
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        Ok(Self { pin })
    }
}

impl<P: OutputPin> Indicator for Esp32Indicator<'_, P> {
    fn set_indicator(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(error) = result {
            tracing::warn!(%error, "status LED write failed");
        }
    }
}
