//! Broker session manager.
//!
//! [`BusSession`] owns a [`BrokerClient`] and keeps a subscribed session
//! alive on top of a connected link. Reconnection uses a fixed retry delay
//! with no backoff growth. Outbound envelopes are encoded here; inbound
//! payloads are decoded here and anything undecodable is dropped.

use crate::codec;
use crate::config::{bounded_string, ShortString};
use crate::envelope::Envelope;
use crate::error::Error;
use crate::link::ConnectionState;
use crate::traits::BrokerClient;

/// Broker session state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No session; a connect attempt is due or scheduled.
    #[default]
    Disconnected,
    /// Session open, subscriptions not yet confirmed.
    Connected,
    /// Session open and subscribed to every control topic.
    Subscribed,
}

impl SessionState {
    /// Map onto the shared [`ConnectionState`].
    pub fn connection_state(self) -> ConnectionState {
        match self {
            SessionState::Disconnected => ConnectionState::Disconnected,
            SessionState::Connected => ConnectionState::Connecting,
            SessionState::Subscribed => ConnectionState::Connected,
        }
    }
}

/// Keeps one broker session established and subscribed.
///
/// # Example
///
/// ```rust
/// use light_node::hal::MockBroker;
/// use light_node::session::{BusSession, SessionState};
///
/// let mut session = BusSession::new(MockBroker::new(), "ESP32-1", 5000);
/// session.ensure_session(&["ESP32bootcamp_control"], true, 0).unwrap();
///
/// assert_eq!(session.state(), SessionState::Subscribed);
/// assert!(session.broker().is_subscribed("ESP32bootcamp_control"));
/// ```
pub struct BusSession<B: BrokerClient> {
    broker: B,
    client_id: ShortString,
    retry_ms: u64,
    state: SessionState,
    next_attempt_ms: u64,
    reconnect_count: u32,
}

impl<B: BrokerClient> BusSession<B> {
    /// Create a session manager. `client_id` is normally the device id.
    pub fn new(broker: B, client_id: &str, retry_ms: u32) -> Self {
        Self {
            broker,
            client_id: bounded_string(client_id),
            retry_ms: retry_ms as u64,
            state: SessionState::Disconnected,
            next_attempt_ms: 0,
            reconnect_count: 0,
        }
    }

    /// Advance the session state machine.
    ///
    /// Never connects while `link_up` is false. On a failed connect or
    /// subscribe the next attempt becomes eligible `retry_ms` later.
    /// Returns [`Error::SessionUnavailable`] unless the session is
    /// subscribed after this call.
    pub fn ensure_session<S: AsRef<str>>(
        &mut self,
        topics: &[S],
        link_up: bool,
        now_ms: u64,
    ) -> Result<(), Error> {
        if !link_up {
            if self.state != SessionState::Disconnected {
                tracing::warn!("link down, broker session dropped");
                self.state = SessionState::Disconnected;
                self.next_attempt_ms = now_ms;
            }
            return Err(Error::SessionUnavailable);
        }

        if self.state != SessionState::Disconnected && !self.broker.is_connected() {
            tracing::warn!("broker session lost");
            self.state = SessionState::Disconnected;
            self.next_attempt_ms = now_ms;
        }

        match self.state {
            SessionState::Subscribed => return Ok(()),
            _ if now_ms < self.next_attempt_ms => return Err(Error::SessionUnavailable),
            SessionState::Disconnected => {
                tracing::info!(client_id = self.client_id.as_str(), "connecting to broker");
                if !self.broker.connect(self.client_id.as_str()) {
                    tracing::warn!(retry_ms = self.retry_ms, "broker connect failed");
                    self.next_attempt_ms = now_ms + self.retry_ms;
                    return Err(Error::SessionUnavailable);
                }
                self.state = SessionState::Connected;
            }
            SessionState::Connected => {}
        }

        for topic in topics {
            let topic = topic.as_ref();
            if !self.broker.subscribe(topic) {
                tracing::warn!(topic, retry_ms = self.retry_ms, "subscribe failed");
                self.next_attempt_ms = now_ms + self.retry_ms;
                return Err(Error::SessionUnavailable);
            }
            tracing::debug!(topic, "subscribed");
        }

        self.state = SessionState::Subscribed;
        self.reconnect_count += 1;
        tracing::info!(sessions = self.reconnect_count, "broker session ready");
        Ok(())
    }

    /// Encode and publish an envelope.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionUnavailable`] when no session is open
    /// - [`Error::PayloadTooLarge`] when the envelope does not fit; nothing is sent
    /// - [`Error::PublishFailed`] when the broker refuses the message
    pub fn publish(&mut self, topic: &str, envelope: &Envelope) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::SessionUnavailable);
        }
        let payload = codec::encode(envelope)?;
        if self.broker.publish(topic, &payload) {
            tracing::trace!(topic, bytes = payload.len(), "published");
            Ok(())
        } else {
            Err(Error::PublishFailed)
        }
    }

    /// Take the next valid inbound envelope, if any.
    ///
    /// Undecodable payloads ahead of it are logged and discarded. At most
    /// one envelope is returned per call.
    pub fn pump_incoming(&mut self) -> Option<Envelope> {
        while let Some(msg) = self.broker.try_recv() {
            match codec::decode(&msg.payload) {
                Ok(envelope) => return Some(envelope),
                Err(error) => {
                    tracing::warn!(topic = msg.topic.as_str(), %error, "dropping inbound payload");
                }
            }
        }
        None
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session state expressed as a [`ConnectionState`].
    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection_state()
    }

    /// Whether a session is open (publishing is possible).
    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    /// Number of times a subscribed session has been established.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count
    }

    /// Get the underlying broker client.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Get mutable access to the underlying broker client.
    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{MessageKind, Target, Verb};
    use crate::hal::MockBroker;

    const CONTROL: &str = "ESP32bootcamp_control";

    fn session() -> BusSession<MockBroker> {
        BusSession::new(MockBroker::new(), "ESP32-1", 5000)
    }

    #[test]
    fn never_connects_without_link() {
        let mut s = session();
        assert_eq!(
            s.ensure_session(&[CONTROL], false, 0),
            Err(Error::SessionUnavailable)
        );
        assert_eq!(s.broker().connect_calls, 0);
        assert_eq!(s.state(), SessionState::Disconnected);
    }

    #[test]
    fn connects_with_device_id_and_subscribes() {
        let mut s = session();
        s.ensure_session(&[CONTROL], true, 0).unwrap();
        assert_eq!(s.broker().client_id.as_deref(), Some("ESP32-1"));
        assert!(s.broker().is_subscribed(CONTROL));
        assert_eq!(s.connection_state(), ConnectionState::Connected);
        assert_eq!(s.reconnect_count(), 1);
    }

    #[test]
    fn connect_failure_waits_retry_delay() {
        let mut s = session();
        s.broker_mut().accept_connect = false;

        assert!(s.ensure_session(&[CONTROL], true, 0).is_err());
        assert!(s.ensure_session(&[CONTROL], true, 4999).is_err());
        assert_eq!(s.broker().connect_calls, 1);

        s.broker_mut().accept_connect = true;
        s.ensure_session(&[CONTROL], true, 5000).unwrap();
        assert_eq!(s.broker().connect_calls, 2);
    }

    #[test]
    fn retry_delay_does_not_grow() {
        let mut s = session();
        s.broker_mut().accept_connect = false;
        for attempt in 0..4u64 {
            let _ = s.ensure_session(&[CONTROL], true, attempt * 5000);
        }
        assert_eq!(s.broker().connect_calls, 4);
    }

    #[test]
    fn subscribe_failure_retries_without_reconnecting() {
        let mut s = session();
        s.broker_mut().accept_subscribe = false;

        assert!(s.ensure_session(&[CONTROL], true, 0).is_err());
        assert_eq!(s.state(), SessionState::Connected);

        s.broker_mut().accept_subscribe = true;
        assert!(s.ensure_session(&[CONTROL], true, 1000).is_err());
        s.ensure_session(&[CONTROL], true, 5000).unwrap();
        assert_eq!(s.broker().connect_calls, 1);
        assert_eq!(s.state(), SessionState::Subscribed);
    }

    #[test]
    fn broker_drop_reconnects_immediately() {
        let mut s = session();
        s.ensure_session(&[CONTROL], true, 0).unwrap();

        s.broker_mut().drop_connection();
        s.ensure_session(&[CONTROL], true, 100).unwrap();
        assert_eq!(s.broker().connect_calls, 2);
        assert_eq!(s.reconnect_count(), 2);
    }

    #[test]
    fn link_loss_drops_session() {
        let mut s = session();
        s.ensure_session(&[CONTROL], true, 0).unwrap();
        assert!(s.ensure_session(&[CONTROL], false, 10).is_err());
        assert_eq!(s.state(), SessionState::Disconnected);
    }

    #[test]
    fn publish_requires_session() {
        let mut s = session();
        let env = Envelope::from_device(MessageKind::Com, "ESP32-1", "heartbeat");
        assert_eq!(s.publish("ESP32bootcamp", &env), Err(Error::SessionUnavailable));
        assert!(s.broker().published.is_empty());
    }

    #[test]
    fn publish_encodes_envelope() {
        let mut s = session();
        s.ensure_session(&[CONTROL], true, 0).unwrap();
        let env = Envelope::from_device(MessageKind::Com, "ESP32-1", "heartbeat");
        s.publish("ESP32bootcamp", &env).unwrap();

        let sent = s.broker().published_to("ESP32bootcamp");
        assert_eq!(sent.len(), 1);
        assert_eq!(codec::decode(&sent[0].1).unwrap(), env);
    }

    #[test]
    fn publish_rejection_is_reported() {
        let mut s = session();
        s.ensure_session(&[CONTROL], true, 0).unwrap();
        s.broker_mut().accept_publish = false;
        let env = Envelope::from_device(MessageKind::Com, "ESP32-1", "heartbeat");
        assert_eq!(s.publish("ESP32bootcamp", &env), Err(Error::PublishFailed));
    }

    #[test]
    fn pump_skips_garbage_and_returns_one_envelope() {
        let mut s = session();
        s.ensure_session(&[CONTROL], true, 0).unwrap();
        let on = Envelope::command("MQTT_master", Target::All, Verb::On);
        let off = Envelope::command("MQTT_master", Target::All, Verb::Off);

        s.broker_mut().queue_raw(CONTROL, b"{not json".to_vec());
        s.broker_mut().queue_envelope(CONTROL, &on);
        s.broker_mut().queue_envelope(CONTROL, &off);

        assert_eq!(s.pump_incoming(), Some(on));
        assert_eq!(s.pump_incoming(), Some(off));
        assert_eq!(s.pump_incoming(), None);
    }
}
