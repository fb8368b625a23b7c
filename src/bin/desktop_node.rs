//! Desktop light node.
//!
//! Runs the full node loop against a real broker with the light, button
//! and status LED replaced by log output. Useful for exercising a
//! controller without hardware.
//!
//! # Usage
//!
//! ```bash
//! LIGHT_NODE_HOST=localhost LIGHT_NODE_DEVICE_ID=ESP32-7 \
//!     RUST_LOG=light_node=debug cargo run --bin desktop_node --features mqtt
//! ```
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LIGHT_NODE_HOST` | `localhost` |
//! | `LIGHT_NODE_PORT` | `1883` |
//! | `LIGHT_NODE_DEVICE_ID` | `ESP32-1` |
//! | `LIGHT_NODE_CONTROLLER` | `MQTT_master` |
//! | `LIGHT_NODE_PUBLISH_TOPIC` | `ESP32bootcamp` |
//! | `LIGHT_NODE_SUBSCRIBE_TOPIC` | `ESP32bootcamp_control` |
//! | `LIGHT_NODE_HEARTBEAT_MS` | `0` (off) |

use anyhow::Context;
use light_node::config::{ButtonConfig, DeviceConfig, MqttConfig, WifiConfig};
use light_node::services::{
    HostLink, NoButton, RumqttBroker, StdClock, StdDelay, TracingIndicator, TracingOutput,
};
use light_node::traits::Clock;
use light_node::{Config, Node};
use std::env;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u64 = 10;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn load_config() -> anyhow::Result<Config> {
    let mqtt_defaults = MqttConfig::default();
    let port: u16 = env_or("LIGHT_NODE_PORT", "1883")
        .parse()
        .context("LIGHT_NODE_PORT is not a port number")?;
    let heartbeat_ms: u32 = env_or("LIGHT_NODE_HEARTBEAT_MS", "0")
        .parse()
        .context("LIGHT_NODE_HEARTBEAT_MS is not a number")?;

    Ok(Config::default()
        .with_wifi(WifiConfig::default().with_enabled(false))
        .with_mqtt(
            mqtt_defaults
                .clone()
                .with_host(&env_or("LIGHT_NODE_HOST", "localhost"))
                .with_port(port)
                .with_publish_topic(&env_or(
                    "LIGHT_NODE_PUBLISH_TOPIC",
                    mqtt_defaults.publish_topic.as_str(),
                ))
                .with_subscribe_topic(&env_or(
                    "LIGHT_NODE_SUBSCRIBE_TOPIC",
                    mqtt_defaults.subscribe_topic.as_str(),
                ))
                .with_heartbeat_ms(heartbeat_ms),
        )
        .with_device(
            DeviceConfig::default()
                .with_id(&env_or("LIGHT_NODE_DEVICE_ID", "ESP32-1"))
                .with_controller_id(&env_or("LIGHT_NODE_CONTROLLER", "MQTT_master")),
        )
        .with_button(ButtonConfig::default().with_enabled(false)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    tracing::info!(
        device = config.device.id.as_str(),
        host = config.mqtt.host.as_str(),
        port = config.mqtt.port,
        "starting desktop light node"
    );

    let clock = StdClock::new();
    let mut node = Node::new(
        &config,
        HostLink,
        RumqttBroker::new(&config.mqtt),
        TracingOutput::new(),
        StdDelay,
        NoButton,
        TracingIndicator,
    );

    loop {
        let report = node.tick(clock.now_ms());
        if let Some(state) = report.settled {
            tracing::info!(state = state.as_str(), "light settled");
        }
        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
