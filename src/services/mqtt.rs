//! MQTT broker client for desktop builds.
//!
//! Uses the synchronous `rumqttc` client. Its connection is driven on a
//! helper thread that tracks the session flag and forwards inbound
//! publishes to [`BrokerClient::try_recv`] over a channel.
//!
//! # Example
//!
//! ```ignore
//! use light_node::config::MqttConfig;
//! use light_node::services::RumqttBroker;
//! use light_node::traits::BrokerClient;
//!
//! let mut broker = RumqttBroker::new(&MqttConfig::default().with_host("localhost"));
//! if broker.connect("ESP32-1") {
//!     broker.subscribe("ESP32bootcamp_control");
//! }
//! ```

use crate::config::MqttConfig;
use crate::traits::{BrokerClient, BusMessage};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long `connect` waits for the broker's CONNACK.
const CONNECT_WAIT: Duration = Duration::from_secs(3);

/// Pause between reconnect attempts inside the event thread.
const EVENT_BACKOFF: Duration = Duration::from_millis(500);

/// Request queue depth for the rumqttc client.
const REQUEST_CAPACITY: usize = 16;

/// Runtime MQTT client configuration for `rumqttc`.
#[derive(Clone, Debug)]
pub struct MqttRuntimeConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
}

impl MqttRuntimeConfig {
    /// Create a runtime config for a broker address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            keep_alive_secs: 30,
        }
    }

    /// Builder: set the keep-alive interval.
    pub fn keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }
}

impl From<&MqttConfig> for MqttRuntimeConfig {
    fn from(config: &MqttConfig) -> Self {
        Self::new(config.host.as_str(), config.port).keep_alive_secs(config.keep_alive_secs)
    }
}

/// [`BrokerClient`] backed by `rumqttc`.
///
/// The client is created on the first `connect`. rumqttc reconnects on its
/// own as long as the event thread keeps polling, so later `connect` calls
/// only wait for the next CONNACK.
pub struct RumqttBroker {
    config: MqttRuntimeConfig,
    client: Option<Client>,
    message_rx: Option<Receiver<BusMessage>>,
    connected: Arc<AtomicBool>,
}

impl RumqttBroker {
    /// Create an unconnected client for the broker in `config`.
    pub fn new(config: &MqttConfig) -> Self {
        Self::with_runtime_config(MqttRuntimeConfig::from(config))
    }

    /// Create an unconnected client from a runtime config.
    pub fn with_runtime_config(config: MqttRuntimeConfig) -> Self {
        Self {
            config,
            client: None,
            message_rx: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start(&mut self, client_id: &str) -> std::io::Result<()> {
        let mut options = MqttOptions::new(client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs as u64));

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let (message_tx, message_rx) = channel::<BusMessage>();
        let connected = Arc::clone(&self.connected);

        thread::Builder::new()
            .name("mqtt-events".into())
            .spawn(move || handle_mqtt_events(connection, message_tx, connected))?;

        tracing::info!(
            host = self.config.host.as_str(),
            port = self.config.port,
            "MQTT client started"
        );
        self.client = Some(client);
        self.message_rx = Some(message_rx);
        Ok(())
    }

    fn wait_for_session(&self) -> bool {
        let deadline = Instant::now() + CONNECT_WAIT;
        while Instant::now() < deadline {
            if self.connected.load(Ordering::Acquire) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        self.connected.load(Ordering::Acquire)
    }
}

impl BrokerClient for RumqttBroker {
    fn connect(&mut self, client_id: &str) -> bool {
        if self.client.is_none() {
            if let Err(error) = self.start(client_id) {
                tracing::warn!(%error, "MQTT event thread could not start");
                return false;
            }
        }
        self.wait_for_session()
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        let Some(client) = self.client.as_mut() else {
            return false;
        };
        match client.try_subscribe(topic, QoS::AtMostOnce) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(topic, %error, "MQTT subscribe failed");
                false
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let Some(client) = self.client.as_mut() else {
            return false;
        };
        client
            .try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .is_ok()
    }

    fn try_recv(&mut self) -> Option<BusMessage> {
        let rx = self.message_rx.as_ref()?;
        match rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.connected.store(false, Ordering::Release);
                None
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn handle_mqtt_events(
    mut connection: Connection,
    message_tx: Sender<BusMessage>,
    connected: Arc<AtomicBool>,
) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Release);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Release);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = BusMessage::new(publish.topic, publish.payload.to_vec());
                if message_tx.send(msg).is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(error) => {
                if connected.swap(false, Ordering::AcqRel) {
                    tracing::warn!(%error, "MQTT connection lost");
                }
                thread::sleep(EVENT_BACKOFF);
            }
        }
    }
}
