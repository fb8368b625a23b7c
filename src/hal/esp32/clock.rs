//! ESP32 clock implementation using the ESP-IDF timer.

use crate::traits::Clock;

/// Millisecond clock backed by `esp_timer_get_time()` (microseconds since boot).
///
/// Drives every retry, fade and debounce timer through [`Node::tick`](crate::Node::tick).
///
/// # Example
///
/// ```ignore
/// use light_node::hal::esp32::Esp32Clock;
/// use light_node::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// loop {
///     node.tick(clock.now_ms());
/// }
/// ```
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Safe: plain read of the high-resolution timer.
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
