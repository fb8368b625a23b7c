//! Response emitter: builds and publishes this node's outbound envelopes.
//!
//! Every emission carries the node's own device id and goes to the
//! configured publish topic. A failed publish is logged and reported as
//! `false`; nothing is retried synchronously.

use crate::actuator::ActuatorState;
use crate::config::{bounded_string, LongString};
use crate::envelope::{Envelope, MessageKind, HEARTBEAT, STATE_CHANGED, STATUS_RESPONSE};
use crate::router::NodeIdentity;
use crate::session::BusSession;
use crate::traits::BrokerClient;

/// Publishes status responses, state-changed echoes and heartbeats.
#[derive(Clone, Debug)]
pub struct ResponseEmitter {
    identity: NodeIdentity,
    publish_topic: LongString,
}

impl ResponseEmitter {
    /// Create an emitter for `identity` publishing to `publish_topic`.
    pub fn new(identity: NodeIdentity, publish_topic: &str) -> Self {
        Self {
            identity,
            publish_topic: bounded_string(publish_topic),
        }
    }

    /// Topic all emissions go to.
    pub fn publish_topic(&self) -> &str {
        self.publish_topic.as_str()
    }

    /// Envelope answering a status query.
    ///
    /// ```rust
    /// use light_node::{ResponseEmitter, NodeIdentity, MessageKind, SwitchState};
    /// use light_node::actuator::ActuatorState;
    ///
    /// let emitter = ResponseEmitter::new(NodeIdentity::new("ESP32-1", "MQTT_master", "Connected"), "ESP32bootcamp");
    /// let state = ActuatorState { device_id: "ESP32-1".try_into().unwrap(), is_on: true, transition_in_progress: false };
    ///
    /// let env = emitter.status_response(&state);
    /// assert_eq!(env.kind, MessageKind::Control);
    /// assert_eq!(env.state, Some(SwitchState::On));
    /// assert_eq!(env.message.as_str(), "status_response");
    /// ```
    pub fn status_response(&self, state: &ActuatorState) -> Envelope {
        self.node_envelope(MessageKind::Control, STATUS_RESPONSE, state)
            .with_controller(self.identity.controller_id.as_str())
    }

    /// Envelope announcing a settled state change.
    pub fn state_changed(&self, state: &ActuatorState) -> Envelope {
        self.node_envelope(MessageKind::Com, STATE_CHANGED, state)
    }

    /// Periodic liveness envelope.
    pub fn heartbeat(&self, state: &ActuatorState) -> Envelope {
        self.node_envelope(MessageKind::Com, HEARTBEAT, state)
    }

    /// Publish a status response.
    pub fn emit_status_response<B: BrokerClient>(
        &self,
        session: &mut BusSession<B>,
        state: &ActuatorState,
    ) -> bool {
        self.emit(session, &self.status_response(state))
    }

    /// Publish a state-changed echo.
    pub fn emit_state_changed<B: BrokerClient>(
        &self,
        session: &mut BusSession<B>,
        state: &ActuatorState,
    ) -> bool {
        self.emit(session, &self.state_changed(state))
    }

    /// Publish a heartbeat.
    pub fn emit_heartbeat<B: BrokerClient>(
        &self,
        session: &mut BusSession<B>,
        state: &ActuatorState,
    ) -> bool {
        self.emit(session, &self.heartbeat(state))
    }

    fn node_envelope(&self, kind: MessageKind, message: &str, state: &ActuatorState) -> Envelope {
        Envelope::from_device(kind, self.identity.device_id.as_str(), message)
            .with_status(self.identity.status.as_str())
            .with_state(state.switch_state())
    }

    fn emit<B: BrokerClient>(&self, session: &mut BusSession<B>, envelope: &Envelope) -> bool {
        match session.publish(self.publish_topic.as_str(), envelope) {
            Ok(()) => {
                tracing::debug!(message = envelope.message.as_str(), "emitted");
                true
            }
            Err(error) => {
                tracing::warn!(message = envelope.message.as_str(), %error, "emit failed");
                false
            }
        }
    }
}
