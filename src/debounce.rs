//! Debouncer for the local push-button.
//!
//! The button is wired active-low: a raw level of `false` means pressed.
//! A level is accepted once it has been stable for `debounce_ms`. Only the
//! stable high-to-low edge is reported, so the button has to settle back
//! high before another press counts.

use crate::traits::ButtonInput;

/// Raw sampling state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonState {
    /// Level seen on the most recent poll.
    pub last_raw_level: bool,
    /// Time the raw level last changed.
    pub stable_since_ms: u64,
}

/// A debounced button event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEdge {
    /// Stable transition from released to pressed.
    Pressed,
}

/// Turns raw button samples into debounced press edges.
///
/// # Example
///
/// ```rust
/// use light_node::debounce::{ButtonEdge, InputDebouncer};
/// use light_node::hal::MockButton;
///
/// let mut button = InputDebouncer::new(MockButton::new(), 50);
/// button.input_mut().press();
///
/// assert_eq!(button.poll(0), None);
/// assert_eq!(button.poll(30), None);
/// assert_eq!(button.poll(50), Some(ButtonEdge::Pressed));
/// assert_eq!(button.poll(80), None);
/// ```
pub struct InputDebouncer<P: ButtonInput> {
    input: P,
    debounce_ms: u64,
    state: ButtonState,
    stable_level: bool,
}

impl<P: ButtonInput> InputDebouncer<P> {
    /// Create a debouncer assuming the button starts released.
    pub fn new(input: P, debounce_ms: u32) -> Self {
        Self {
            input,
            debounce_ms: debounce_ms as u64,
            state: ButtonState {
                last_raw_level: true,
                stable_since_ms: 0,
            },
            stable_level: true,
        }
    }

    /// Sample the input once.
    pub fn poll(&mut self, now_ms: u64) -> Option<ButtonEdge> {
        let raw = self.input.read_level();

        if raw != self.state.last_raw_level {
            self.state = ButtonState {
                last_raw_level: raw,
                stable_since_ms: now_ms,
            };
        }

        if raw == self.stable_level
            || now_ms.saturating_sub(self.state.stable_since_ms) < self.debounce_ms
        {
            return None;
        }

        self.stable_level = raw;
        if raw {
            None
        } else {
            tracing::debug!("button pressed");
            Some(ButtonEdge::Pressed)
        }
    }

    /// Current sampling state.
    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Whether the debounced level is "pressed".
    pub fn is_pressed(&self) -> bool {
        !self.stable_level
    }

    /// Get mutable access to the underlying input.
    pub fn input_mut(&mut self) -> &mut P {
        &mut self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockButton;

    fn debouncer() -> InputDebouncer<MockButton> {
        InputDebouncer::new(MockButton::new(), 50)
    }

    #[test]
    fn idle_button_reports_nothing() {
        let mut b = debouncer();
        for t in (0..500).step_by(10) {
            assert_eq!(b.poll(t), None);
        }
        assert!(!b.is_pressed());
    }

    #[test]
    fn bounce_shorter_than_window_is_ignored() {
        let mut b = debouncer();
        b.input_mut().press();
        assert_eq!(b.poll(0), None);
        b.input_mut().release();
        assert_eq!(b.poll(20), None);
        b.input_mut().press();
        assert_eq!(b.poll(40), None);
        assert_eq!(b.poll(80), None);
        assert_eq!(b.poll(90), Some(ButtonEdge::Pressed));
        assert_eq!(b.state().stable_since_ms, 40);
    }

    #[test]
    fn held_button_reports_once() {
        let mut b = debouncer();
        b.input_mut().press();
        b.poll(0);
        assert_eq!(b.poll(50), Some(ButtonEdge::Pressed));
        for t in (60..1000).step_by(10) {
            assert_eq!(b.poll(t), None);
        }
        assert!(b.is_pressed());
    }

    #[test]
    fn release_must_be_stable_before_next_press() {
        let mut b = debouncer();
        b.input_mut().press();
        b.poll(0);
        assert_eq!(b.poll(50), Some(ButtonEdge::Pressed));

        // Short release glitch.
        b.input_mut().release();
        b.poll(100);
        b.input_mut().press();
        b.poll(110);
        assert_eq!(b.poll(200), None);

        b.input_mut().release();
        b.poll(300);
        assert_eq!(b.poll(350), None);
        assert!(!b.is_pressed());

        b.input_mut().press();
        b.poll(400);
        assert_eq!(b.poll(450), Some(ButtonEdge::Pressed));
    }
}
