//! Network abstraction traits for the link layer and the MQTT broker.
//!
//! These traits are what the connection-recovery state machines drive.
//! Both are sync-first: every call must return promptly so the single
//! scheduling loop never stalls on I/O.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`LinkDriver`] | WiFi (or other) link association |
//! | [`BrokerClient`] | MQTT connect / subscribe / publish / receive |
//!
//! # Topics
//!
//! Topics are configuration-supplied. The default deployment uses:
//!
//! ```text
//! ESP32bootcamp          - status / echo channel (published)
//! ESP32bootcamp_control  - control channel (subscribed)
//! ```

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// Link Driver
// ============================================================================

/// Link-layer connectivity (WiFi station, Ethernet, ...).
///
/// # Implementation Notes
///
/// - `associate` starts an association attempt and must not block until
///   the link is up. Return `false` if the attempt could not be started.
/// - `is_up` reports whether the link currently has connectivity
///   (associated and addressed).
pub trait LinkDriver {
    /// Begin associating with the given network.
    fn associate(&mut self, ssid: &str, password: &str) -> bool;

    /// Check whether the link is currently up.
    fn is_up(&self) -> bool;
}

// ============================================================================
// MQTT Broker Client (Sync-First Design)
// ============================================================================

/// MQTT broker client trait.
///
/// Works on both ESP32 (esp-idf MQTT) and desktop (rumqttc). Implementations
/// typically run the transport event loop on a helper thread and queue
/// inbound publishes for [`try_recv`](Self::try_recv).
///
/// # Implementation Notes
///
/// - `connect` may wait a bounded time for the broker handshake, but must
///   not retry internally; retry pacing belongs to [`BusSession`].
/// - `try_recv` is non-blocking and returns one message per call
/// - `is_connected` reflects the latest transport event
///
/// # Example
///
/// ```rust,ignore
/// use light_node::traits::BrokerClient;
///
/// fn announce<B: BrokerClient>(client: &mut B) {
///     if client.connect("ESP32-1") {
///         client.subscribe("ESP32bootcamp_control");
///         client.publish("ESP32bootcamp", br#"{"type":"com"}"#);
///     }
/// }
/// ```
///
/// [`BusSession`]: crate::BusSession
pub trait BrokerClient {
    /// Open a session with the broker using a stable client identifier.
    fn connect(&mut self, client_id: &str) -> bool;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str) -> bool;

    /// Publish a payload to a topic.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    /// Try to receive the next inbound message (non-blocking).
    ///
    /// Returns `None` if no message is available. This should never block.
    fn try_recv(&mut self) -> Option<BusMessage>;

    /// Check if the broker session is alive.
    fn is_connected(&self) -> bool;
}

/// A message delivered by the broker.
///
/// Contains the topic and payload of a published message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Create a new bus message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}
