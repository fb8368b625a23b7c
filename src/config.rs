//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use light_node::config::{Config, DeviceConfig, MqttConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_device(DeviceConfig::default().with_id("ESP32-4"));
//! ```

use heapless::String as HString;
use heapless::Vec as HVec;
use serde::{Deserialize, Serialize};

/// Maximum length for short config strings (hostnames, ids, credentials)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics)
pub const MAX_LONG_STRING: usize = 128;

/// Maximum number of PWM channels driven by one node
pub const MAX_CHANNELS: usize = 4;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Copy as much of `s` as fits into a `heapless::String<N>`, cutting on a
/// UTF-8 boundary.
pub fn bounded_string<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    bounded_string(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    bounded_string(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete node configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT session configuration
    pub mqtt: MqttConfig,
    /// Device identification
    pub device: DeviceConfig,
    /// Light output configuration
    pub actuator: ActuatorConfig,
    /// Local button configuration
    pub button: ButtonConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Set actuator configuration
    pub fn with_actuator(mut self, actuator: ActuatorConfig) -> Self {
        self.actuator = actuator;
        self
    }

    /// Set button configuration
    pub fn with_button(mut self, button: ButtonConfig) -> Self {
        self.button = button;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT session configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Topic for status, echo, and heartbeat envelopes
    pub publish_topic: LongString,
    /// Topic carrying control envelopes
    pub subscribe_topic: LongString,
    /// Fixed delay between failed connect/subscribe attempts, in milliseconds
    pub retry_ms: u32,
    /// Heartbeat publish interval in milliseconds
    pub heartbeat_ms: u32,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            publish_topic: long_string("ESP32bootcamp"),
            subscribe_topic: long_string("ESP32bootcamp_control"),
            retry_ms: 5000,
            heartbeat_ms: 10_000,
            keep_alive_secs: 60,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the publish (status/echo) topic
    pub fn with_publish_topic(mut self, topic: &str) -> Self {
        self.publish_topic = long_string(topic);
        self
    }

    /// Set the subscribe (control) topic
    pub fn with_subscribe_topic(mut self, topic: &str) -> Self {
        self.subscribe_topic = long_string(topic);
        self
    }

    /// Use one topic for both directions (loopback echo deployment)
    pub fn with_shared_topic(self, topic: &str) -> Self {
        self.with_publish_topic(topic).with_subscribe_topic(topic)
    }

    /// Set the reconnect retry delay
    pub fn with_retry_ms(mut self, ms: u32) -> Self {
        self.retry_ms = ms;
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_ms(mut self, ms: u32) -> Self {
        self.heartbeat_ms = ms;
        self
    }

    /// Set the keep-alive interval
    pub fn with_keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Topics the session subscribes to: the control topic.
    pub fn topics(&self) -> HVec<LongString, 1> {
        let mut topics = HVec::new();
        let _ = topics.push(self.subscribe_topic.clone());
        topics
    }

    /// Whether inbound traffic will include this node's own publications
    pub fn is_loopback(&self) -> bool {
        self.publish_topic == self.subscribe_topic
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Interval between link status polls while associating, in milliseconds
    pub poll_interval_ms: u32,
    /// Give up on one association attempt after this long, in milliseconds
    pub connect_timeout_ms: u32,
    /// Whether link supervision is enabled (disable where the OS owns the network)
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            poll_interval_ms: 500,
            connect_timeout_ms: 10_000,
            enabled: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the status poll interval
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the per-attempt connection timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Enable or disable link supervision
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// This node's device id (also the MQTT client id)
    pub id: ShortString,
    /// The only controller whose commands are obeyed
    pub controller_id: ShortString,
    /// Liveness status reported in every outbound envelope
    pub status: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: short_string("ESP32-1"),
            controller_id: short_string("MQTT_master"),
            status: short_string("Connected"),
        }
    }
}

impl DeviceConfig {
    /// Set the device ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = short_string(id);
        self
    }

    /// Set the authorized controller ID
    pub fn with_controller_id(mut self, id: &str) -> Self {
        self.controller_id = short_string(id);
        self
    }

    /// Set the reported liveness status
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = short_string(status);
        self
    }
}

// ============================================================================
// Actuator Config
// ============================================================================

/// How the bus is serviced while a fade runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadePolicy {
    /// Run the whole fade inside `transition`; nothing else is serviced.
    Blocking,
    /// Advance the fade one step per due tick; the loop keeps running.
    #[default]
    Interleaved,
}

/// Light output configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Output channels driven together (e.g. R, G, B)
    pub channels: HVec<u8, MAX_CHANNELS>,
    /// Number of discrete steps in one fade
    pub fade_steps: u16,
    /// Delay between fade steps in milliseconds
    pub step_delay_ms: u32,
    /// Fade scheduling policy
    pub policy: FadePolicy,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        let mut channels = HVec::new();
        for ch in [0, 1, 2] {
            let _ = channels.push(ch);
        }
        Self {
            channels,
            fade_steps: 255,
            step_delay_ms: 5,
            policy: FadePolicy::Interleaved,
        }
    }
}

impl ActuatorConfig {
    /// Set the driven channels (extra channels beyond capacity are dropped)
    pub fn with_channels(mut self, channels: &[u8]) -> Self {
        self.channels.clear();
        for &ch in channels.iter().take(MAX_CHANNELS) {
            let _ = self.channels.push(ch);
        }
        self
    }

    /// Set the number of fade steps (at least one)
    pub fn with_fade_steps(mut self, steps: u16) -> Self {
        self.fade_steps = steps.max(1);
        self
    }

    /// Set the delay between fade steps
    pub fn with_step_delay_ms(mut self, ms: u32) -> Self {
        self.step_delay_ms = ms;
        self
    }

    /// Set the fade policy
    pub fn with_policy(mut self, policy: FadePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Total duration of one fade in milliseconds
    pub fn fade_duration_ms(&self) -> u64 {
        self.fade_steps as u64 * self.step_delay_ms as u64
    }
}

// ============================================================================
// Button Config
// ============================================================================

/// Local button configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    /// How long a level must hold before it is accepted, in milliseconds
    pub debounce_ms: u32,
    /// Whether the button is polled at all
    pub enabled: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            enabled: true,
        }
    }
}

impl ButtonConfig {
    /// Set the debounce window
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Enable or disable the button
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.device.id.as_str(), "ESP32-1");
        assert_eq!(config.device.controller_id.as_str(), "MQTT_master");
        assert_eq!(config.actuator.policy, FadePolicy::Interleaved);
    }

    #[test]
    fn mqtt_topics_default_to_control_channel() {
        let mqtt = MqttConfig::default();
        let topics = mqtt.topics();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].as_str(), "ESP32bootcamp_control");
        assert!(!mqtt.is_loopback());
    }

    #[test]
    fn mqtt_shared_topic_is_loopback() {
        let mqtt = MqttConfig::default().with_shared_topic("IoT_project");
        assert!(mqtt.is_loopback());
        assert_eq!(mqtt.publish_topic.as_str(), "IoT_project");
        assert_eq!(mqtt.topics()[0].as_str(), "IoT_project");
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 17 four-byte characters = 68 bytes; the cut must land on a boundary
        let input = "💡".repeat(17);
        let s = short_string(&input);
        assert_eq!(s.len(), 64);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());

        let input = format!("a{}", "💡".repeat(16));
        let s = short_string(&input);
        assert_eq!(s.len(), 61);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(
                MqttConfig::default()
                    .with_host("broker.local")
                    .with_port(8883)
                    .with_retry_ms(1000),
            )
            .with_device(DeviceConfig::default().with_id("ESP32-3"))
            .with_button(ButtonConfig::default().with_debounce_ms(20));

        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.retry_ms, 1000);
        assert_eq!(config.device.id.as_str(), "ESP32-3");
        assert_eq!(config.button.debounce_ms, 20);
    }

    #[test]
    fn wifi_config_default() {
        let wifi = WifiConfig::default();
        assert!(wifi.ssid.is_empty());
        assert_eq!(wifi.poll_interval_ms, 500);
        assert_eq!(wifi.connect_timeout_ms, 10_000);
        assert!(wifi.enabled);
        assert!(!wifi.is_configured());
    }

    #[test]
    fn wifi_config_builder() {
        let wifi = WifiConfig::default()
            .with_ssid("TestNetwork")
            .with_password("secret123")
            .with_poll_interval_ms(250)
            .with_connect_timeout_ms(5_000)
            .with_enabled(false);

        assert_eq!(wifi.ssid.as_str(), "TestNetwork");
        assert_eq!(wifi.password.as_str(), "secret123");
        assert_eq!(wifi.poll_interval_ms, 250);
        assert_eq!(wifi.connect_timeout_ms, 5_000);
        assert!(!wifi.enabled);
        assert!(wifi.is_configured());
    }

    #[test]
    fn actuator_config_defaults() {
        let actuator = ActuatorConfig::default();
        assert_eq!(actuator.channels.as_slice(), &[0, 1, 2]);
        assert_eq!(actuator.fade_steps, 255);
        assert_eq!(actuator.step_delay_ms, 5);
        assert_eq!(actuator.fade_duration_ms(), 1275);
    }

    #[test]
    fn actuator_channels_capped() {
        let actuator = ActuatorConfig::default().with_channels(&[9, 8, 7, 6, 5, 4]);
        assert_eq!(actuator.channels.as_slice(), &[9, 8, 7, 6]);
    }

    #[test]
    fn actuator_fade_steps_never_zero() {
        let actuator = ActuatorConfig::default().with_fade_steps(0);
        assert_eq!(actuator.fade_steps, 1);
    }

    #[test]
    fn config_serde_round_trip() {
        let config = Config::default()
            .with_actuator(ActuatorConfig::default().with_policy(FadePolicy::Blocking));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"policy\":\"blocking\""));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
