//! # light-node
//!
//! Control plane for a fleet of networked light nodes that coordinate over
//! an MQTT bus. A node reports its status, executes addressed commands that
//! fade its light on or off, and recovers from link and broker outages on
//! its own.
//!
//! ## Features
//!
//! - **Connection recovery**: link association and broker session state
//!   machines with fixed retry pacing
//! - **Addressed protocol**: JSON envelopes with controller authorization
//!   and device/broadcast targeting
//! - **Consistent actuator state**: remote commands, the local button and
//!   echoes all go through one fade engine
//! - **Platform neutral**: the core is `no_std`; ESP32 and desktop adapters
//!   sit behind features
//!
//! ## Architecture
//!
//! - `traits` - Hardware and network abstractions
//! - `link` / `session` - Connection recovery for link and broker
//! - `envelope` / `codec` - Message model and wire format
//! - `router` / `emitter` - Inbound command handling and outbound responses
//! - `actuator` / `debounce` - Light state machine and button input
//! - `node` - The scheduling loop tying everything together
//! - `fleet` - Controller-side device registry
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use light_node::{Config, Envelope, Node, Target, Verb};
//! use light_node::codec::encode;
//! use light_node::hal::{MockBroker, MockButton, MockDelay, MockIndicator, MockLink, MockOutput};
//!
//! let mut node = Node::new(
//!     &Config::default(),
//!     MockLink::up_after(0),
//!     MockBroker::new(),
//!     MockOutput::new(),
//!     MockDelay::new(),
//!     MockButton::new(),
//!     MockIndicator::new(),
//! );
//! node.tick(0);
//!
//! // The controller broadcasts "ON".
//! let on = Envelope::command("MQTT_master", Target::All, Verb::On);
//! node.session_mut()
//!     .broker_mut()
//!     .queue_raw("ESP32bootcamp_control", encode(&on).unwrap().to_vec());
//!
//! node.tick(10);          // routed, fade started
//! node.tick(10 + 1275);   // fade settled, echo published
//! assert!(node.actuator_state().is_on);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Light state machine and fade engine.
pub mod actuator;
/// Wire encoding and decoding of envelopes.
pub mod codec;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Button debouncing.
pub mod debounce;
/// Outbound status responses, echoes and heartbeats.
pub mod emitter;
/// Envelope data model.
pub mod envelope;
/// Error types.
pub mod error;
/// Controller-side registry of devices seen on the bus.
pub mod fleet;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Network link supervision.
pub mod link;
/// The per-node scheduling loop.
pub mod node;
/// Inbound command classification and dispatch.
pub mod router;
/// Broker session management.
pub mod session;
/// Core traits for hardware and network abstraction.
pub mod traits;

/// Desktop adapters and the rumqttc broker client (feature-gated).
#[cfg(feature = "std")]
pub mod services;

// Re-exports for convenience
pub use actuator::{ActuatorController, ActuatorState, ButtonOutcome, TransitionResult};
pub use config::{Config, FadePolicy};
pub use debounce::{ButtonEdge, InputDebouncer};
pub use emitter::ResponseEmitter;
pub use envelope::{Envelope, Message, MessageKind, Target, Verb};
pub use error::{DecodeError, Error};
pub use fleet::{DeviceRecord, DeviceRegistry};
pub use link::{ConnectionState, ConnectivitySupervisor};
pub use node::{Node, TickReport};
pub use router::{CommandRouter, NodeIdentity, RouteDecision};
pub use session::{BusSession, SessionState};
pub use traits::{
    // Hardware
    ActuatorOutput,
    ButtonInput,
    Clock,
    Indicator,
    // Network
    BrokerClient,
    BusMessage,
    LinkDriver,
    SwitchState,
};
