//! MQTT broker client for ESP32-C3.
//!
//! Wraps the esp-idf MQTT client. A helper thread drains the connection's
//! event stream, tracks the session flag and forwards inbound publishes
//! over a channel polled by [`BrokerClient::try_recv`].
//!
//! # Example
//!
//! ```ignore
//! use light_node::config::MqttConfig;
//! use light_node::hal::esp32::Esp32Broker;
//! use light_node::traits::BrokerClient;
//!
//! let config = MqttConfig::default().with_host("192.168.1.100");
//! let mut broker = Esp32Broker::new(&config);
//!
//! if broker.connect("ESP32-1") {
//!     broker.subscribe("ESP32bootcamp_control");
//! }
//! ```

use crate::config::MqttConfig;
use crate::traits::{BrokerClient, BusMessage};
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long `connect` waits for the broker handshake.
const CONNECT_WAIT: Duration = Duration::from_secs(3);

/// MQTT client over esp-idf.
///
/// The underlying client is created on the first `connect` and reused
/// afterwards; esp-mqtt reconnects on its own, so later `connect` calls
/// just wait for the session flag.
pub struct Esp32Broker {
    url: String,
    keep_alive: Duration,
    client: Option<EspMqttClient<'static>>,
    message_rx: Option<Receiver<BusMessage>>,
    connected: Arc<AtomicBool>,
}

impl Esp32Broker {
    /// Create an unconnected client for the broker in `config`.
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            url: format!("mqtt://{}:{}", config.host.as_str(), config.port),
            keep_alive: Duration::from_secs(config.keep_alive_secs as u64),
            client: None,
            message_rx: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start(&mut self, client_id: &str) -> anyhow::Result<()> {
        let mqtt_config = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(self.keep_alive),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&self.url, &mqtt_config)?;
        let (message_tx, message_rx) = channel::<BusMessage>();
        let connected = Arc::clone(&self.connected);

        thread::Builder::new()
            .name("mqtt-events".into())
            .stack_size(6 * 1024)
            .spawn(move || handle_mqtt_events(&mut connection, message_tx, connected))?;

        self.client = Some(client);
        self.message_rx = Some(message_rx);
        tracing::info!(url = self.url.as_str(), "MQTT client started");
        Ok(())
    }

    fn wait_for_session(&self) -> bool {
        let deadline = Instant::now() + CONNECT_WAIT;
        while Instant::now() < deadline {
            if self.connected.load(Ordering::Acquire) {
                return true;
            }
            thread::sleep(Duration::from_millis(50));
        }
        self.connected.load(Ordering::Acquire)
    }
}

impl BrokerClient for Esp32Broker {
    fn connect(&mut self, client_id: &str) -> bool {
        if self.client.is_none() {
            if let Err(error) = self.start(client_id) {
                tracing::warn!(%error, "MQTT client could not start");
                return false;
            }
        }
        self.wait_for_session()
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        let Some(client) = self.client.as_mut() else {
            return false;
        };
        match client.subscribe(topic, QoS::AtMostOnce) {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(topic, ?error, "MQTT subscribe failed");
                false
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let Some(client) = self.client.as_mut() else {
            return false;
        };
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
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
    connection: &mut EspMqttConnection,
    message_tx: Sender<BusMessage>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match connection.next() {
            Err(error) => {
                tracing::warn!(?error, "MQTT connection closed");
                connected.store(false, Ordering::Release);
                return;
            }
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    connected.store(true, Ordering::Release);
                }
                EventPayload::Disconnected => {
                    connected.store(false, Ordering::Release);
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    let msg = BusMessage::new(topic.to_string(), data.to_vec());
                    if message_tx.send(msg).is_err() {
                        return;
                    }
                }
                _ => {}
            },
        }
    }
}
