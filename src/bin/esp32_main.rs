//! ESP32-C3 light node.
//!
//! This is the main entry point for the physical node. It wires the RGB
//! LED, push-button, status LED, WiFi link and esp-mqtt client into a
//! [`Node`] and ticks it forever. The node:
//! - Associates with WiFi and re-associates after drops
//! - Keeps an MQTT session subscribed to the control topic
//! - Fades the light on addressed `ON`/`OFF` commands
//! - Toggles the light on a button press and echoes every change
//!
//! # Build
//!
//! ```bash
//! WIFI_SSID=... WIFI_PASSWORD=... MQTT_HOST=192.168.1.100 \
//!     cargo build --release --bin esp32_main --features esp32-mqtt
//! ```

use esp_idf_hal::delay::Ets;
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use light_node::config::{DeviceConfig, MqttConfig, WifiConfig};
use light_node::hal::esp32::{
    Esp32Broker, Esp32Button, Esp32Clock, Esp32Indicator, Esp32Led, Esp32Link,
};
use light_node::traits::Clock;
use light_node::{Config, Node};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u64 = 5;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(option_env!("LIGHT_NODE_LOG").unwrap_or("info")))
        .init();

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(
            MqttConfig::default().with_host(option_env!("MQTT_HOST").unwrap_or("192.168.1.100")),
        )
        .with_device(DeviceConfig::default().with_id(option_env!("DEVICE_ID").unwrap_or("ESP32-1")));

    if !config.wifi.is_configured() {
        tracing::warn!("WiFi not configured (set WIFI_SSID/WIFI_PASSWORD)");
    }

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // RGB LED (LEDC on GPIO4/3/2)
    // =========================================================================
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(5.kHz().into())
            .resolution(Resolution::Bits8),
    )?;
    let led = Esp32Led::new([
        LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio4)?,
        LedcDriver::new(peripherals.ledc.channel1, &timer, peripherals.pins.gpio3)?,
        LedcDriver::new(peripherals.ledc.channel2, &timer, peripherals.pins.gpio2)?,
    ])?;
    tracing::info!("RGB LED initialized (GPIO4/3/2)");

    // =========================================================================
    // Button (GPIO9) and status LED (GPIO8)
    // =========================================================================
    let button = Esp32Button::new(peripherals.pins.gpio9)?;
    let indicator = Esp32Indicator::new(peripherals.pins.gpio8)?;

    // =========================================================================
    // Network
    // =========================================================================
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let link = Esp32Link::new(peripherals.modem, sysloop, Some(nvs))?;
    let broker = Esp32Broker::new(&config.mqtt);

    // =========================================================================
    // Node
    // =========================================================================
    let clock = Esp32Clock::new();
    let mut node = Node::new(&config, link, broker, led, Ets, button, indicator);

    tracing::info!(
        device = config.device.id.as_str(),
        host = config.mqtt.host.as_str(),
        "starting light node"
    );

    let mut was_up = false;
    loop {
        let report = node.tick(clock.now_ms());

        if report.session_up != was_up {
            if report.session_up {
                if let Some(ip) = node.link().driver().ip_addr() {
                    tracing::info!(%ip, "online");
                }
            }
            was_up = report.session_up;
        }

        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
