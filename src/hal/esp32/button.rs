//! Push-button input for ESP32.
//!
//! The button shorts the pin to GND; the internal pull-up keeps it high
//! when released. Debouncing happens in `InputDebouncer`.

use crate::traits::ButtonInput;
use esp_idf_hal::gpio::{Input, InputPin, OutputPin, PinDriver, Pull};
use esp_idf_hal::peripheral::Peripheral;

/// Active-low push-button.
pub struct Esp32Button<'d, P>
where
    P: InputPin + OutputPin,
{
    pin: PinDriver<'d, P, Input>,
}

impl<'d, P> Esp32Button<'d, P>
where
    P: InputPin + OutputPin,
{
    /// Configure `pin` as an input with pull-up.
    ///
    /// # Errors
    ///
    /// Returns an error if GPIO initialization fails.
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl<P> ButtonInput for Esp32Button<'_, P>
where
    P: InputPin + OutputPin,
{
    fn read_level(&mut self) -> bool {
        self.pin.is_high()
    }
}
