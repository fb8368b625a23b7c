//! Desktop services: host-side adapters and the rumqttc broker client.
//!
//! These let a light node run as an ordinary process against a real
//! broker, with the light, button and indicator replaced by log output.
//!
//! - `host`: link, light, delay, button, indicator and clock for a desktop
//! - `mqtt` feature: [`RumqttBroker`], a [`BrokerClient`] over `rumqttc`
//!
//! [`BrokerClient`]: crate::traits::BrokerClient

pub mod host;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use host::*;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
