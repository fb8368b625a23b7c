//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without physical hardware.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockOutput`] | [`ActuatorOutput`] | Records level writes per channel |
//! | [`MockButton`] | [`ButtonInput`] | Settable raw pin level |
//! | [`MockIndicator`] | [`Indicator`] | Records indicator writes |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockDelay`] | [`DelayNs`] | Accumulates requested delay |
//! | [`MockLink`] | [`LinkDriver`] | Scripted association |
//! | [`MockBroker`] | [`BrokerClient`] | Captures pub/sub operations |
//!
//! # Example
//!
//! ```rust
//! use light_node::hal::MockBroker;
//! use light_node::traits::BrokerClient;
//!
//! let mut broker = MockBroker::new();
//! assert!(broker.connect("ESP32-1"));
//! assert!(broker.publish("ESP32bootcamp", b"{}"));
//! assert_eq!(broker.published_to("ESP32bootcamp").len(), 1);
//! ```
//!
//! [`ActuatorOutput`]: crate::traits::ActuatorOutput
//! [`ButtonInput`]: crate::traits::ButtonInput
//! [`Indicator`]: crate::traits::Indicator
//! [`Clock`]: crate::traits::Clock
//! [`DelayNs`]: embedded_hal::delay::DelayNs
//! [`LinkDriver`]: crate::traits::LinkDriver
//! [`BrokerClient`]: crate::traits::BrokerClient

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;

use crate::codec;
use crate::envelope::Envelope;
use crate::traits::{
    ActuatorOutput, BrokerClient, BusMessage, ButtonInput, Clock, Indicator, LinkDriver,
};
use embedded_hal::delay::DelayNs;

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Highest channel index tracked by [`MockOutput::level`].
pub const MOCK_CHANNELS: usize = 8;

/// Mock light output for testing.
///
/// Records every write for verification. Set `fail` to make writes error.
///
/// # Example
///
/// ```rust
/// use light_node::hal::MockOutput;
/// use light_node::traits::ActuatorOutput;
///
/// let mut output = MockOutput::new();
/// output.set_level(2, 200).unwrap();
///
/// assert_eq!(output.level(2), 200);
/// assert_eq!(output.writes, vec![(2, 200)]);
///
/// output.fail = true;
/// assert!(output.set_level(2, 0).is_err());
/// ```
#[derive(Debug, Default)]
pub struct MockOutput {
    /// Every successful write as `(channel, level)`.
    pub writes: Vec<(u8, u8)>,
    /// When set, writes fail and are not recorded.
    pub fail: bool,
    levels: [u8; MOCK_CHANNELS],
}

impl MockOutput {
    /// Creates a mock output with every channel at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to `channel`.
    pub fn level(&self, channel: u8) -> u8 {
        self.levels.get(channel as usize).copied().unwrap_or(0)
    }
}

impl ActuatorOutput for MockOutput {
    type Error = ();

    fn set_level(&mut self, channel: u8, level: u8) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        if let Some(slot) = self.levels.get_mut(channel as usize) {
            *slot = level;
        }
        self.writes.push((channel, level));
        Ok(())
    }
}

/// Mock push-button.
///
/// Starts released (pin high). Use [`press`](Self::press) and
/// [`release`](Self::release) to drive it.
#[derive(Debug)]
pub struct MockButton {
    /// Raw pin level returned by `read_level`.
    pub level: bool,
    /// Number of samples taken.
    pub reads: usize,
}

impl MockButton {
    /// Creates a released button.
    pub fn new() -> Self {
        Self {
            level: true,
            reads: 0,
        }
    }

    /// Pull the pin low.
    pub fn press(&mut self) {
        self.level = false;
    }

    /// Let the pin float back high.
    pub fn release(&mut self) {
        self.level = true;
    }
}

impl Default for MockButton {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonInput for MockButton {
    fn read_level(&mut self) -> bool {
        self.reads += 1;
        self.level
    }
}

/// Mock status indicator. Records every write.
#[derive(Debug, Default)]
pub struct MockIndicator {
    /// Every value written, in order.
    pub history: Vec<bool>,
}

impl MockIndicator {
    /// Creates an indicator with no writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written, if any.
    pub fn is_on(&self) -> Option<bool> {
        self.history.last().copied()
    }
}

impl Indicator for MockIndicator {
    fn set_indicator(&mut self, on: bool) {
        self.history.push(on);
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use light_node::hal::MockClock;
/// use light_node::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.set(1000);
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// Mock blocking delay. Returns immediately and records the total.
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    /// Creates a delay with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total delay requested, in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock network link.
///
/// After a successful `associate`, the link reports up once it has been
/// polled the configured number of times.
///
/// # Example
///
/// ```rust
/// use light_node::hal::MockLink;
/// use light_node::traits::LinkDriver;
///
/// let mut link = MockLink::up_after(1);
/// assert!(link.associate("shop", "secret"));
/// assert!(!link.is_up());
/// assert!(link.is_up());
/// ```
#[derive(Debug)]
pub struct MockLink {
    /// Whether `associate` succeeds.
    pub accept_associate: bool,
    /// Number of `associate` calls.
    pub associate_calls: usize,
    /// SSID passed to the last `associate`.
    pub last_ssid: Option<String>,
    up_after: Option<u32>,
    associated: bool,
    polls_since_associate: Cell<u32>,
    polls: Cell<u32>,
}

impl MockLink {
    /// A link that never comes up.
    pub fn new() -> Self {
        Self {
            accept_associate: true,
            associate_calls: 0,
            last_ssid: None,
            up_after: None,
            associated: false,
            polls_since_associate: Cell::new(0),
            polls: Cell::new(0),
        }
    }

    /// A link that comes up after `polls` unsuccessful polls.
    pub fn up_after(polls: u32) -> Self {
        Self {
            up_after: Some(polls),
            ..Self::new()
        }
    }

    /// Simulate losing the link. The next `associate` restarts the count.
    pub fn drop_link(&mut self) {
        self.associated = false;
    }

    /// Total number of `is_up` calls.
    pub fn polls(&self) -> u32 {
        self.polls.get()
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkDriver for MockLink {
    fn associate(&mut self, ssid: &str, _password: &str) -> bool {
        self.associate_calls += 1;
        self.last_ssid = Some(ssid.to_string());
        if self.accept_associate {
            self.associated = true;
            self.polls_since_associate.set(0);
        }
        self.accept_associate
    }

    fn is_up(&self) -> bool {
        self.polls.set(self.polls.get() + 1);
        let seen = self.polls_since_associate.get();
        self.polls_since_associate.set(seen + 1);
        self.associated && self.up_after.is_some_and(|n| seen >= n)
    }
}

/// Mock MQTT broker client for testing.
///
/// Records connect, subscribe and publish calls and allows injecting
/// incoming messages. Each operation can be made to fail through its
/// `accept_*` flag.
///
/// # Example
///
/// ```rust
/// use light_node::hal::MockBroker;
/// use light_node::traits::BrokerClient;
///
/// let mut broker = MockBroker::new();
/// broker.queue_raw("ESP32bootcamp_control", b"{}".to_vec());
///
/// let msg = broker.try_recv().unwrap();
/// assert_eq!(msg.topic, "ESP32bootcamp_control");
/// assert!(broker.try_recv().is_none());
/// ```
#[derive(Debug)]
pub struct MockBroker {
    /// Whether `connect` succeeds.
    pub accept_connect: bool,
    /// Whether `subscribe` succeeds.
    pub accept_subscribe: bool,
    /// Whether `publish` succeeds.
    pub accept_publish: bool,
    /// Whether the session is up.
    pub connected: bool,
    /// Number of `connect` calls.
    pub connect_calls: usize,
    /// Client id of the last successful `connect`.
    pub client_id: Option<String>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Messages that have been published (topic, payload).
    pub published: Vec<(String, Vec<u8>)>,
    /// Queue of incoming messages returned by `try_recv`.
    pub incoming: VecDeque<BusMessage>,
}

impl MockBroker {
    /// Creates a mock broker that accepts everything but is not yet connected.
    pub fn new() -> Self {
        Self {
            accept_connect: true,
            accept_subscribe: true,
            accept_publish: true,
            connected: false,
            connect_calls: 0,
            client_id: None,
            subscriptions: Vec::new(),
            published: Vec::new(),
            incoming: VecDeque::new(),
        }
    }

    /// Queue a raw incoming payload.
    pub fn queue_raw(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push_back(BusMessage::new(topic, payload));
    }

    /// Queue an incoming envelope, encoded as it would be on the wire.
    pub fn queue_envelope(&mut self, topic: impl Into<String>, envelope: &Envelope) {
        if let Ok(payload) = codec::encode(envelope) {
            self.queue_raw(topic, payload.to_vec());
        }
    }

    /// Simulate the broker dropping the session.
    pub fn drop_connection(&mut self) {
        self.connected = false;
    }

    /// Check if a topic was subscribed to.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic.
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>)> {
        self.published.iter().filter(|(t, _)| t == topic).collect()
    }

    /// Decode every published payload, skipping anything undecodable.
    pub fn published_envelopes(&self) -> Vec<Envelope> {
        self.published
            .iter()
            .filter_map(|(_, payload)| codec::decode(payload).ok())
            .collect()
    }

    /// Clear recorded publishes.
    pub fn clear_published(&mut self) {
        self.published.clear();
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerClient for MockBroker {
    fn connect(&mut self, client_id: &str) -> bool {
        self.connect_calls += 1;
        self.connected = self.accept_connect;
        if self.accept_connect {
            self.client_id = Some(client_id.to_string());
        }
        self.accept_connect
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        if self.accept_subscribe && self.connected {
            if !self.is_subscribed(topic) {
                self.subscriptions.push(topic.to_string());
            }
            true
        } else {
            false
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        if self.accept_publish && self.connected {
            self.published.push((topic.to_string(), payload.to_vec()));
            true
        } else {
            false
        }
    }

    fn try_recv(&mut self) -> Option<BusMessage> {
        self.incoming.pop_front()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
