//! Actuator controller: the light's on/off state machine and fade engine.
//!
//! All state changes go through [`ActuatorController`], whether they come
//! from a remote command or the local button. A fade runs from the current
//! level to the target's extreme in `fade_steps` steps, `step_delay_ms`
//! apart, writing every configured channel at each step.
//!
//! # Fade policies
//!
//! | Policy | `transition` returns | Bus serviced during fade |
//! |--------|----------------------|--------------------------|
//! | [`FadePolicy::Blocking`] | [`TransitionResult::Completed`] | No |
//! | [`FadePolicy::Interleaved`] | [`TransitionResult::Started`] | Yes, via [`update`](ActuatorController::update) |
//!
//! Switch requests that arrive mid-fade wait in a FIFO of
//! [`PENDING_CAPACITY`] entries and run in arrival order once the running
//! fade settles. A queued request the light already satisfies when its
//! turn comes is acknowledged instead of faded; callers collect those with
//! [`take_acknowledged`](ActuatorController::take_acknowledged) and answer
//! each one as if it had been a fresh [`TransitionResult::Unchanged`].
//!
//! # Example
//!
//! ```rust
//! use light_node::actuator::{ActuatorController, TransitionResult};
//! use light_node::config::ActuatorConfig;
//! use light_node::hal::{MockDelay, MockOutput};
//! use light_node::SwitchState;
//!
//! let config = ActuatorConfig::default().with_fade_steps(4).with_step_delay_ms(10);
//! let mut light = ActuatorController::new(MockOutput::new(), MockDelay::new(), "ESP32-1", &config);
//!
//! assert_eq!(light.transition(SwitchState::On, 0), Ok(TransitionResult::Started));
//! assert_eq!(light.update(20), Ok(None));
//! assert_eq!(light.update(40), Ok(Some(SwitchState::On)));
//! assert!(light.state().is_on);
//! assert_eq!(light.level(), 255);
//! ```

use crate::config::{bounded_string, ActuatorConfig, FadePolicy, MAX_CHANNELS};
use crate::envelope::Id;
use crate::traits::{ActuatorOutput, SwitchState};
use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec as HVec};

/// Switch requests that can wait behind a running fade.
pub const PENDING_CAPACITY: usize = 8;

// ============================================================================
// State Types
// ============================================================================

/// Observable actuator state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActuatorState {
    /// Id of the device this actuator belongs to.
    pub device_id: Id,
    /// Settled on/off state. Changes only when a fade completes.
    pub is_on: bool,
    /// A fade is running.
    pub transition_in_progress: bool,
}

impl ActuatorState {
    /// Settled state as a [`SwitchState`].
    pub fn switch_state(&self) -> SwitchState {
        SwitchState::from(self.is_on)
    }
}

/// Outcome of [`ActuatorController::transition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionResult {
    /// Fade ran to completion inside the call (blocking policy).
    Completed,
    /// Fade started; [`ActuatorController::update`] drives it.
    Started,
    /// Fade already running; target appended to the pending queue.
    Queued,
    /// Fade running and the pending queue is full; the request was dropped.
    Rejected,
    /// Already at the target; nothing was written.
    Unchanged,
}

impl TransitionResult {
    /// Whether the actuator is settled at the requested target.
    pub fn is_settled(&self) -> bool {
        matches!(self, TransitionResult::Completed | TransitionResult::Unchanged)
    }
}

/// Outcome of a debounced button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonOutcome {
    /// Press dropped because a fade is running.
    Ignored,
    /// Press toggled the light.
    Toggled(TransitionResult),
}

#[derive(Clone, Copy, Debug)]
struct Fade {
    from: u8,
    target: SwitchState,
    started_ms: u64,
    step: u16,
}

// ============================================================================
// Controller
// ============================================================================

/// Owns the light output and its on/off state.
///
/// # Type Parameters
///
/// - `A`: the PWM output ([`ActuatorOutput`])
/// - `D`: blocking delay used only by [`FadePolicy::Blocking`]
pub struct ActuatorController<A: ActuatorOutput, D: DelayNs> {
    output: A,
    delay: D,
    channels: HVec<u8, MAX_CHANNELS>,
    fade_steps: u16,
    step_delay_ms: u32,
    policy: FadePolicy,
    state: ActuatorState,
    level: u8,
    fade: Option<Fade>,
    pending: Deque<SwitchState, PENDING_CAPACITY>,
    acknowledged: u8,
}

impl<A: ActuatorOutput, D: DelayNs> ActuatorController<A, D> {
    /// Create a controller. The light starts Off at level 0.
    pub fn new(output: A, delay: D, device_id: &str, config: &ActuatorConfig) -> Self {
        Self {
            output,
            delay,
            channels: config.channels.clone(),
            fade_steps: config.fade_steps.max(1),
            step_delay_ms: config.step_delay_ms,
            policy: config.policy,
            state: ActuatorState {
                device_id: bounded_string(device_id),
                is_on: false,
                transition_in_progress: false,
            },
            level: 0,
            fade: None,
            pending: Deque::new(),
            acknowledged: 0,
        }
    }

    /// Request the light to move to `target`.
    ///
    /// Idempotent: requesting the current settled state with no fade
    /// running writes nothing and returns [`TransitionResult::Unchanged`].
    pub fn transition(
        &mut self,
        target: SwitchState,
        now_ms: u64,
    ) -> Result<TransitionResult, A::Error> {
        if self.state.transition_in_progress {
            if self.pending.push_back(target).is_err() {
                tracing::warn!(to = target.as_str(), "pending queue full, request dropped");
                return Ok(TransitionResult::Rejected);
            }
            tracing::debug!(
                to = target.as_str(),
                queued = self.pending.len(),
                "fade running, request queued"
            );
            return Ok(TransitionResult::Queued);
        }

        if self.state.switch_state() == target && self.level == target.level() {
            return Ok(TransitionResult::Unchanged);
        }

        match self.policy {
            FadePolicy::Blocking => {
                self.fade_blocking(target)?;
                Ok(TransitionResult::Completed)
            }
            FadePolicy::Interleaved => {
                self.begin(target, now_ms);
                Ok(TransitionResult::Started)
            }
        }
    }

    /// Advance a running interleaved fade.
    ///
    /// Returns `Some(state)` on the call where the fade settles. Queued
    /// requests are then drained in order on that same call: the first one
    /// that differs from `state` starts the next fade, and any before it are
    /// counted for [`take_acknowledged`](Self::take_acknowledged).
    /// A write error aborts the fade and discards the queue.
    pub fn update(&mut self, now_ms: u64) -> Result<Option<SwitchState>, A::Error> {
        let Some(fade) = self.fade else {
            return Ok(None);
        };

        let step_delay = self.step_delay_ms as u64;
        let elapsed = now_ms.saturating_sub(fade.started_ms);
        let due = if step_delay == 0 {
            self.fade_steps
        } else {
            (elapsed / step_delay + 1).min(self.fade_steps as u64) as u16
        };

        if due > fade.step {
            let level = Self::level_at(fade.from, fade.target.level(), due, self.fade_steps);
            if let Err(e) = self.write_all(level) {
                self.abort();
                return Err(e);
            }
            if let Some(running) = self.fade.as_mut() {
                running.step = due;
            }
        }

        if due < self.fade_steps || elapsed < self.fade_steps as u64 * step_delay {
            return Ok(None);
        }

        self.fade = None;
        self.settle(fade.target);
        self.start_next(now_ms);

        Ok(Some(fade.target))
    }

    /// Toggle in response to a debounced button press.
    ///
    /// Presses during a fade are ignored rather than queued.
    pub fn on_button_edge(&mut self, now_ms: u64) -> Result<ButtonOutcome, A::Error> {
        if self.state.transition_in_progress {
            tracing::debug!("button press ignored during fade");
            return Ok(ButtonOutcome::Ignored);
        }
        let target = self.state.switch_state().toggled();
        self.transition(target, now_ms).map(ButtonOutcome::Toggled)
    }

    /// Current actuator state.
    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    /// Whether a fade is running.
    pub fn is_transitioning(&self) -> bool {
        self.state.transition_in_progress
    }

    /// Last level written to the channels.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Next queued target, if any.
    pub fn pending(&self) -> Option<SwitchState> {
        self.pending.front().copied()
    }

    /// Number of queued targets.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queued requests found already satisfied since the last call.
    ///
    /// Each one still deserves a state echo.
    pub fn take_acknowledged(&mut self) -> u8 {
        core::mem::take(&mut self.acknowledged)
    }

    /// Get the underlying output.
    pub fn output(&self) -> &A {
        &self.output
    }

    /// Get mutable access to the underlying output.
    pub fn output_mut(&mut self) -> &mut A {
        &mut self.output
    }

    // ------------------------------------------------------------------------

    fn begin(&mut self, target: SwitchState, now_ms: u64) {
        tracing::debug!(to = target.as_str(), "fade started");
        self.state.transition_in_progress = true;
        self.fade = Some(Fade {
            from: self.level,
            target,
            started_ms: now_ms,
            step: 0,
        });
    }

    fn fade_blocking(&mut self, target: SwitchState) -> Result<(), A::Error> {
        self.state.transition_in_progress = true;
        let from = self.level;
        for step in 1..=self.fade_steps {
            let level = Self::level_at(from, target.level(), step, self.fade_steps);
            if let Err(e) = self.write_all(level) {
                self.abort();
                return Err(e);
            }
            self.delay.delay_ms(self.step_delay_ms);
        }
        self.settle(target);
        Ok(())
    }

    fn settle(&mut self, target: SwitchState) {
        self.state.is_on = target.is_on();
        self.state.transition_in_progress = false;
        tracing::info!(state = target.as_str(), "fade settled");
    }

    fn start_next(&mut self, now_ms: u64) {
        while let Some(next) = self.pending.pop_front() {
            if next == self.state.switch_state() && self.level == next.level() {
                tracing::debug!(to = next.as_str(), "queued request already satisfied");
                self.acknowledged = self.acknowledged.saturating_add(1);
            } else {
                self.begin(next, now_ms);
                return;
            }
        }
    }

    fn abort(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(dropped = self.pending.len(), "fade aborted, queued requests dropped");
        }
        self.fade = None;
        self.pending.clear();
        self.acknowledged = 0;
        self.state.transition_in_progress = false;
    }

    fn write_all(&mut self, level: u8) -> Result<(), A::Error> {
        for &channel in self.channels.iter() {
            self.output.set_level(channel, level)?;
        }
        self.level = level;
        Ok(())
    }

    /// Level at `step` of `steps` on the way from `from` to `to`.
    fn level_at(from: u8, to: u8, step: u16, steps: u16) -> u8 {
        let from = i32::from(from);
        let span = i32::from(to) - from;
        (from + span * i32::from(step) / i32::from(steps)) as u8
    }
}
