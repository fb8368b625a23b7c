//! Command router: decides what an inbound envelope means for this node.
//!
//! Classification is a pure function of the envelope and the node's
//! identity. Rules are checked in order, first match wins:
//!
//! 1. `com` envelopes are echoes ([`RouteDecision::SelfEcho`])
//! 2. a foreign controller is dropped ([`RouteDecision::Unauthorized`])
//! 3. `status` addressed to `ALL` or this node ([`RouteDecision::StatusQuery`])
//! 4. `ON` / `OFF` addressed to `ALL` or this node ([`RouteDecision::Switch`])
//! 5. anything else is [`RouteDecision::WrongTarget`] or [`RouteDecision::Ignored`]

use crate::actuator::ActuatorController;
use crate::config::{bounded_string, DeviceConfig};
use crate::emitter::ResponseEmitter;
use crate::envelope::{Envelope, Id, MessageKind, Verb};
use crate::session::BusSession;
use crate::traits::{ActuatorOutput, BrokerClient, SwitchState};
use embedded_hal::delay::DelayNs;

/// Who this node is on the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeIdentity {
    /// This node's device id.
    pub device_id: Id,
    /// The only controller this node obeys.
    pub controller_id: Id,
    /// Liveness status reported in outbound envelopes.
    pub status: Id,
}

impl NodeIdentity {
    /// Create an identity.
    pub fn new(device_id: &str, controller_id: &str, status: &str) -> Self {
        Self {
            device_id: bounded_string(device_id),
            controller_id: bounded_string(controller_id),
            status: bounded_string(status),
        }
    }
}

impl From<&DeviceConfig> for NodeIdentity {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            device_id: config.id.clone(),
            controller_id: config.controller_id.clone(),
            status: config.status.clone(),
        }
    }
}

/// What the router did with an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// A `com` envelope (our own echo or a peer's); no effect.
    SelfEcho,
    /// Issued by a controller other than ours; dropped.
    Unauthorized,
    /// Status query for this node; a status response was emitted.
    StatusQuery,
    /// Switch command for this node.
    Switch(SwitchState),
    /// Command addressed to another device.
    WrongTarget,
    /// Not a command (a note such as another node's status response).
    Ignored,
}

/// Applies the routing rules against one node identity.
#[derive(Clone, Debug)]
pub struct CommandRouter {
    identity: NodeIdentity,
}

impl CommandRouter {
    /// Create a router for `identity`.
    pub fn new(identity: NodeIdentity) -> Self {
        Self { identity }
    }

    /// The identity routed against.
    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Classify an envelope without side effects.
    ///
    /// # Example
    ///
    /// ```rust
    /// use light_node::{CommandRouter, Envelope, NodeIdentity, RouteDecision, SwitchState, Target, Verb};
    ///
    /// let me = NodeIdentity::new("ESP32-1", "MQTT_master", "Connected");
    ///
    /// let on = Envelope::command("MQTT_master", Target::All, Verb::On);
    /// assert_eq!(CommandRouter::classify(&on, &me), RouteDecision::Switch(SwitchState::On));
    ///
    /// let rogue = Envelope::command("intruder", Target::All, Verb::On);
    /// assert_eq!(CommandRouter::classify(&rogue, &me), RouteDecision::Unauthorized);
    /// ```
    pub fn classify(envelope: &Envelope, identity: &NodeIdentity) -> RouteDecision {
        if envelope.kind == MessageKind::Com {
            return RouteDecision::SelfEcho;
        }
        if !envelope.is_from(identity.controller_id.as_str()) {
            return RouteDecision::Unauthorized;
        }
        let Some(verb) = envelope.message.verb() else {
            return RouteDecision::Ignored;
        };
        if !envelope.device.addresses(identity.device_id.as_str()) {
            return RouteDecision::WrongTarget;
        }
        match verb {
            Verb::Status => RouteDecision::StatusQuery,
            Verb::On => RouteDecision::Switch(SwitchState::On),
            Verb::Off => RouteDecision::Switch(SwitchState::Off),
        }
    }

    /// Classify an envelope and carry out its effect.
    ///
    /// A switch that settles inside the call (blocking fade, or already
    /// at the target) is echoed here. A fade that is started or queued is
    /// echoed by whoever drives [`ActuatorController::update`].
    pub fn route<A, D, B>(
        &self,
        envelope: &Envelope,
        actuator: &mut ActuatorController<A, D>,
        emitter: &ResponseEmitter,
        session: &mut BusSession<B>,
        now_ms: u64,
    ) -> RouteDecision
    where
        A: ActuatorOutput,
        D: DelayNs,
        B: BrokerClient,
    {
        let decision = Self::classify(envelope, &self.identity);
        match decision {
            RouteDecision::SelfEcho => {
                tracing::debug!(device = envelope.device.as_str(), "echo ignored");
            }
            RouteDecision::Unauthorized => {
                tracing::debug!(
                    controller = envelope.controller.as_deref().unwrap_or(""),
                    "unauthorized controller"
                );
            }
            RouteDecision::WrongTarget => {
                tracing::debug!(device = envelope.device.as_str(), "addressed elsewhere");
            }
            RouteDecision::Ignored => {
                tracing::trace!(message = envelope.message.as_str(), "not a command");
            }
            RouteDecision::StatusQuery => {
                emitter.emit_status_response(session, actuator.state());
            }
            RouteDecision::Switch(target) => match actuator.transition(target, now_ms) {
                Ok(result) if result.is_settled() => {
                    tracing::debug!(?result, "switch settled");
                    emitter.emit_state_changed(session, actuator.state());
                }
                Ok(result) => {
                    tracing::debug!(?result, to = target.as_str(), "switch in progress");
                }
                Err(_) => {
                    tracing::error!(to = target.as_str(), "actuator write failed");
                }
            },
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::config::{ActuatorConfig, FadePolicy};
    use crate::envelope::{Target, STATE_CHANGED, STATUS_RESPONSE};
    use crate::hal::{MockBroker, MockDelay, MockOutput};

    fn me() -> NodeIdentity {
        NodeIdentity::new("ESP32-1", "MQTT_master", "Connected")
    }

    struct Rig {
        router: CommandRouter,
        actuator: ActuatorController<MockOutput, MockDelay>,
        emitter: ResponseEmitter,
        session: BusSession<MockBroker>,
    }

    impl Rig {
        fn new(policy: FadePolicy) -> Self {
            let mut session = BusSession::new(MockBroker::new(), "ESP32-1", 5000);
            session
                .ensure_session(&["ESP32bootcamp_control"], true, 0)
                .unwrap();
            let config = ActuatorConfig::default().with_policy(policy);
            Self {
                router: CommandRouter::new(me()),
                actuator: ActuatorController::new(
                    MockOutput::new(),
                    MockDelay::new(),
                    "ESP32-1",
                    &config,
                ),
                emitter: ResponseEmitter::new(me(), "ESP32bootcamp"),
                session,
            }
        }

        fn route(&mut self, env: &Envelope) -> RouteDecision {
            self.router.route(
                env,
                &mut self.actuator,
                &self.emitter,
                &mut self.session,
                0,
            )
        }

        fn sent(&self) -> Vec<Envelope> {
            self.session
                .broker()
                .published
                .iter()
                .map(|(_, payload)| codec::decode(payload).unwrap())
                .collect()
        }
    }

    #[test]
    fn com_envelopes_are_echoes_even_with_commands() {
        let mut env = Envelope::command("MQTT_master", Target::All, Verb::On);
        env.kind = MessageKind::Com;
        assert_eq!(CommandRouter::classify(&env, &me()), RouteDecision::SelfEcho);
    }

    #[test]
    fn missing_or_foreign_controller_is_unauthorized() {
        let mut env = Envelope::command("MQTT_master", Target::All, Verb::Status);
        env.controller = None;
        assert_eq!(CommandRouter::classify(&env, &me()), RouteDecision::Unauthorized);

        let env = Envelope::command("mqtt_master", Target::All, Verb::Status);
        assert_eq!(CommandRouter::classify(&env, &me()), RouteDecision::Unauthorized);
    }

    #[test]
    fn status_accepts_wildcard_and_own_id() {
        for target in [Target::All, Target::from_wire("ESP32-1")] {
            let env = Envelope::command("MQTT_master", target, Verb::Status);
            assert_eq!(CommandRouter::classify(&env, &me()), RouteDecision::StatusQuery);
        }
    }

    #[test]
    fn commands_for_other_devices_are_wrong_target() {
        for verb in [Verb::On, Verb::Off, Verb::Status] {
            let env = Envelope::command("MQTT_master", Target::from_wire("ESP32-2"), verb);
            assert_eq!(CommandRouter::classify(&env, &me()), RouteDecision::WrongTarget);
        }
    }

    #[test]
    fn notes_are_ignored() {
        let env = Envelope::from_device(MessageKind::Control, "ESP32-2", STATUS_RESPONSE)
            .with_controller("MQTT_master");
        assert_eq!(CommandRouter::classify(&env, &me()), RouteDecision::Ignored);
    }

    #[test]
    fn status_query_emits_response() {
        let mut rig = Rig::new(FadePolicy::Interleaved);
        let env = Envelope::command("MQTT_master", Target::All, Verb::Status);
        assert_eq!(rig.route(&env), RouteDecision::StatusQuery);

        let sent = rig.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.as_str(), STATUS_RESPONSE);
        assert_eq!(sent[0].state, Some(SwitchState::Off));
    }

    #[test]
    fn blocking_switch_echoes_immediately() {
        let mut rig = Rig::new(FadePolicy::Blocking);
        let env = Envelope::command("MQTT_master", Target::All, Verb::On);
        assert_eq!(rig.route(&env), RouteDecision::Switch(SwitchState::On));
        assert!(rig.actuator.state().is_on);

        let sent = rig.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.as_str(), STATE_CHANGED);
        assert_eq!(sent[0].state, Some(SwitchState::On));
    }

    #[test]
    fn interleaved_switch_defers_echo() {
        let mut rig = Rig::new(FadePolicy::Interleaved);
        let env = Envelope::command("MQTT_master", Target::from_wire("ESP32-1"), Verb::On);
        assert_eq!(rig.route(&env), RouteDecision::Switch(SwitchState::On));
        assert!(rig.actuator.is_transitioning());
        assert!(rig.sent().is_empty());
    }

    #[test]
    fn queued_switch_is_not_echoed_by_the_router() {
        let mut rig = Rig::new(FadePolicy::Interleaved);
        let on = Envelope::command("MQTT_master", Target::All, Verb::On);
        let off = Envelope::command("MQTT_master", Target::All, Verb::Off);
        rig.route(&on);
        assert_eq!(rig.route(&off), RouteDecision::Switch(SwitchState::Off));
        assert_eq!(rig.actuator.pending(), Some(SwitchState::Off));
        assert!(rig.sent().is_empty());
    }

    #[test]
    fn repeated_switch_is_idempotent_but_echoed() {
        let mut rig = Rig::new(FadePolicy::Blocking);
        let env = Envelope::command("MQTT_master", Target::All, Verb::Off);
        rig.route(&env);
        assert!(rig.actuator.output().writes.is_empty());
        assert_eq!(rig.sent().len(), 1);
    }

    #[test]
    fn dropped_envelopes_have_no_side_effects() {
        let mut rig = Rig::new(FadePolicy::Blocking);
        rig.route(&Envelope::command("intruder", Target::All, Verb::On));
        rig.route(&Envelope::command("MQTT_master", Target::from_wire("ESP32-9"), Verb::On));
        rig.route(&Envelope::from_device(MessageKind::Com, "ESP32-1", STATE_CHANGED));

        assert!(!rig.actuator.state().is_on);
        assert!(rig.actuator.output().writes.is_empty());
        assert!(rig.sent().is_empty());
    }
}
