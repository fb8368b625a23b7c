//! The node: one cooperative scheduling loop over every component.
//!
//! [`Node::tick`] is called repeatedly from the main loop with the current
//! time. Each tick runs the same fixed sequence and returns a
//! [`TickReport`] describing what happened:
//!
//! 1. keep the link associated
//! 2. keep the broker session subscribed
//! 3. route at most one inbound envelope
//! 4. advance a running fade; echo when it settles
//! 5. publish a heartbeat when one is due
//! 6. poll the button; toggle the light on a press
//! 7. drive the link-status indicator
//!
//! Nothing in a tick blocks except a fade under [`FadePolicy::Blocking`].
//!
//! [`FadePolicy::Blocking`]: crate::config::FadePolicy::Blocking

use crate::actuator::{ActuatorController, ActuatorState, ButtonOutcome, TransitionResult};
use crate::config::{Config, LongString};
use crate::debounce::{ButtonEdge, InputDebouncer};
use crate::emitter::ResponseEmitter;
use crate::link::ConnectivitySupervisor;
use crate::router::{CommandRouter, NodeIdentity, RouteDecision};
use crate::session::{BusSession, SessionState};
use crate::traits::{ActuatorOutput, BrokerClient, ButtonInput, Indicator, LinkDriver, SwitchState};
use embedded_hal::delay::DelayNs;
use heapless::Vec as HVec;

/// What a single [`Node::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Link connected after step 1.
    pub link_up: bool,
    /// Session subscribed after step 2.
    pub session_up: bool,
    /// Decision for the envelope routed this tick.
    pub routed: Option<RouteDecision>,
    /// State a fade settled at this tick.
    pub settled: Option<SwitchState>,
    /// Button press outcome this tick.
    pub button: Option<ButtonOutcome>,
    /// A heartbeat was published.
    pub heartbeat_sent: bool,
    /// State-changed echoes published by the node itself this tick.
    pub echoes_sent: u8,
    /// Indicator level after step 7.
    pub indicator_on: bool,
}

/// A complete light node.
///
/// # Type Parameters
///
/// | Param | Trait | Role |
/// |-------|-------|------|
/// | `L` | [`LinkDriver`] | network link |
/// | `B` | [`BrokerClient`] | MQTT transport |
/// | `A` | [`ActuatorOutput`] | light PWM |
/// | `D` | [`DelayNs`] | blocking fade delay |
/// | `P` | [`ButtonInput`] | local button |
/// | `I` | [`Indicator`] | link-status LED |
///
/// # Example
///
/// ```rust
/// use light_node::{Config, Node};
/// use light_node::hal::{MockBroker, MockButton, MockDelay, MockIndicator, MockLink, MockOutput};
///
/// let mut node = Node::new(
///     &Config::default(),
///     MockLink::up_after(0),
///     MockBroker::new(),
///     MockOutput::new(),
///     MockDelay::new(),
///     MockButton::new(),
///     MockIndicator::new(),
/// );
///
/// let report = node.tick(0);
/// assert!(report.link_up && report.session_up);
/// assert!(report.indicator_on);
/// ```
pub struct Node<L, B, A, D, P, I>
where
    L: LinkDriver,
    B: BrokerClient,
    A: ActuatorOutput,
    D: DelayNs,
    P: ButtonInput,
    I: Indicator,
{
    link: ConnectivitySupervisor<L>,
    session: BusSession<B>,
    router: CommandRouter,
    emitter: ResponseEmitter,
    actuator: ActuatorController<A, D>,
    button: Option<InputDebouncer<P>>,
    indicator: I,
    indicator_on: Option<bool>,
    topics: HVec<LongString, 1>,
    heartbeat_ms: u64,
    next_heartbeat_ms: u64,
}

impl<L, B, A, D, P, I> Node<L, B, A, D, P, I>
where
    L: LinkDriver,
    B: BrokerClient,
    A: ActuatorOutput,
    D: DelayNs,
    P: ButtonInput,
    I: Indicator,
{
    /// Assemble a node from configuration and platform parts.
    pub fn new(
        config: &Config,
        link: L,
        broker: B,
        output: A,
        delay: D,
        button: P,
        indicator: I,
    ) -> Self {
        let identity = NodeIdentity::from(&config.device);
        let device_id = config.device.id.as_str();
        let heartbeat_ms = config.mqtt.heartbeat_ms as u64;

        Self {
            link: ConnectivitySupervisor::new(link, &config.wifi),
            session: BusSession::new(broker, device_id, config.mqtt.retry_ms),
            router: CommandRouter::new(identity.clone()),
            emitter: ResponseEmitter::new(identity, config.mqtt.publish_topic.as_str()),
            actuator: ActuatorController::new(output, delay, device_id, &config.actuator),
            button: config
                .button
                .enabled
                .then(|| InputDebouncer::new(button, config.button.debounce_ms)),
            indicator,
            indicator_on: None,
            topics: config.mqtt.topics(),
            heartbeat_ms,
            next_heartbeat_ms: heartbeat_ms,
        }
    }

    /// Run one pass of the scheduling loop.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        // 1. Link
        report.link_up = self.link.ensure_connected(now_ms).is_ok();

        // 2. Session
        report.session_up = self
            .session
            .ensure_session(self.topics.as_slice(), report.link_up, now_ms)
            .is_ok();

        // 3. Inbound
        if report.session_up {
            if let Some(envelope) = self.session.pump_incoming() {
                report.routed = Some(self.router.route(
                    &envelope,
                    &mut self.actuator,
                    &self.emitter,
                    &mut self.session,
                    now_ms,
                ));
            }
        }

        // 4. Fade
        match self.actuator.update(now_ms) {
            Ok(Some(state)) => {
                report.settled = Some(state);
                for _ in 0..=self.actuator.take_acknowledged() {
                    if self.echo() {
                        report.echoes_sent += 1;
                    }
                }
            }
            Ok(None) => {}
            Err(_) => tracing::error!("actuator write failed, fade aborted"),
        }

        // 5. Heartbeat
        if self.heartbeat_ms > 0 && report.session_up && now_ms >= self.next_heartbeat_ms {
            report.heartbeat_sent = self
                .emitter
                .emit_heartbeat(&mut self.session, self.actuator.state());
            self.next_heartbeat_ms = now_ms + self.heartbeat_ms;
        }

        // 6. Button
        let pressed = self
            .button
            .as_mut()
            .and_then(|button| button.poll(now_ms))
            .is_some_and(|edge| edge == ButtonEdge::Pressed);
        if pressed {
            match self.actuator.on_button_edge(now_ms) {
                Ok(outcome) => {
                    report.button = Some(outcome);
                    if let ButtonOutcome::Toggled(result) = outcome {
                        if matches!(result, TransitionResult::Completed) && self.echo() {
                            report.echoes_sent += 1;
                        }
                    }
                }
                Err(_) => tracing::error!("actuator write failed on button toggle"),
            }
        }

        // 7. Indicator
        report.indicator_on = self.sync_indicator();

        report
    }

    fn echo(&mut self) -> bool {
        self.emitter
            .emit_state_changed(&mut self.session, self.actuator.state())
    }

    fn sync_indicator(&mut self) -> bool {
        let on = self.link.is_connected() && self.session.state() == SessionState::Subscribed;
        if self.indicator_on != Some(on) {
            tracing::debug!(on, "indicator");
            self.indicator.set_indicator(on);
            self.indicator_on = Some(on);
        }
        on
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Current actuator state.
    pub fn actuator_state(&self) -> &ActuatorState {
        self.actuator.state()
    }

    /// The actuator controller.
    pub fn actuator(&self) -> &ActuatorController<A, D> {
        &self.actuator
    }

    /// Mutable access to the actuator controller.
    pub fn actuator_mut(&mut self) -> &mut ActuatorController<A, D> {
        &mut self.actuator
    }

    /// The link supervisor.
    pub fn link(&self) -> &ConnectivitySupervisor<L> {
        &self.link
    }

    /// Mutable access to the link supervisor.
    pub fn link_mut(&mut self) -> &mut ConnectivitySupervisor<L> {
        &mut self.link
    }

    /// The broker session.
    pub fn session(&self) -> &BusSession<B> {
        &self.session
    }

    /// Mutable access to the broker session.
    pub fn session_mut(&mut self) -> &mut BusSession<B> {
        &mut self.session
    }

    /// The button debouncer, if the button is enabled.
    pub fn button_mut(&mut self) -> Option<&mut InputDebouncer<P>> {
        self.button.as_mut()
    }

    /// The status indicator.
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// The identity this node routes against.
    pub fn identity(&self) -> &NodeIdentity {
        self.router.identity()
    }
}
