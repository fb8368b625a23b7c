//! Envelope: the structured message unit exchanged over the bus.
//!
//! Envelopes are `no_std` compatible (fixed-capacity strings) and map
//! one-to-one onto the JSON wire object handled by [`crate::codec`].
//!
//! # Wire examples
//!
//! Controller command (broadcast):
//! ```json
//! {"type":"control","controller":"MQTT_master","device":"ALL","status":"connected","message":"ON"}
//! ```
//!
//! Node echo after a state change:
//! ```json
//! {"type":"com","device":"ESP32-1","status":"Connected","state":"ON","message":"state has changed"}
//! ```

use crate::config::{bounded_string, ShortString};
use crate::traits::SwitchState;
use heapless::String as HString;

/// Identifier type for device and controller ids.
pub type Id = ShortString;

/// Maximum length of a free-text `message`.
pub const MAX_NOTE: usize = 256;

/// Free-text `message` content.
pub type Note = HString<MAX_NOTE>;

/// Wire value addressing every device on a shared control topic.
pub const WILDCARD: &str = "ALL";

/// Message tag of a status response.
pub const STATUS_RESPONSE: &str = "status_response";

/// Message tag of a state-changed echo.
pub const STATE_CHANGED: &str = "state has changed";

/// Message tag of a periodic heartbeat.
pub const HEARTBEAT: &str = "heartbeat";

/// Envelope `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Self-originated heartbeat or echo (`"com"`).
    Com,
    /// Command or response (`"control"`).
    Control,
}

impl MessageKind {
    /// Returns the wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Com => "com",
            MessageKind::Control => "control",
        }
    }

    /// Parse the wire spelling.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "com" => Some(MessageKind::Com),
            "control" => Some(MessageKind::Control),
            _ => None,
        }
    }
}

/// Envelope `device` field: a concrete device or the wildcard.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every device on the topic (`"ALL"`).
    All,
    /// One device by id.
    Device(Id),
}

impl Target {
    /// Build a target from its wire spelling.
    pub fn from_wire(s: &str) -> Self {
        if s == WILDCARD {
            Target::All
        } else {
            Target::Device(bounded_string(s))
        }
    }

    /// Returns the wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Target::All => WILDCARD,
            Target::Device(id) => id.as_str(),
        }
    }

    /// Whether this target addresses the device with the given id.
    pub fn addresses(&self, device_id: &str) -> bool {
        match self {
            Target::All => true,
            Target::Device(id) => id.as_str() == device_id,
        }
    }

    /// The concrete device id, if not the wildcard.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Target::All => None,
            Target::Device(id) => Some(id.as_str()),
        }
    }
}

/// Command verbs understood by a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Fade the light on (`"ON"`).
    On,
    /// Fade the light off (`"OFF"`).
    Off,
    /// Report current state (`"status"`).
    Status,
}

impl Verb {
    /// Returns the wire spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Verb::On => "ON",
            Verb::Off => "OFF",
            Verb::Status => "status",
        }
    }

    /// Parse the wire spelling. Matching is exact, like the firmware it talks to.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ON" => Some(Verb::On),
            "OFF" => Some(Verb::Off),
            "status" => Some(Verb::Status),
            _ => None,
        }
    }
}

/// Envelope `message` field: a command verb or a free-text note.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Message {
    /// A recognised command verb.
    Command(Verb),
    /// Anything else (response tags, greetings).
    Note(Note),
}

impl Message {
    /// Classify wire text. Verb spellings always become [`Message::Command`].
    pub fn from_wire(s: &str) -> Self {
        match Verb::from_wire(s) {
            Some(verb) => Message::Command(verb),
            None => Message::Note(bounded_string(s)),
        }
    }

    /// Build a note message.
    pub fn note(s: &str) -> Self {
        Message::from_wire(s)
    }

    /// Returns the wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Message::Command(verb) => verb.as_str(),
            Message::Note(text) => text.as_str(),
        }
    }

    /// The verb, if this message is a command.
    pub fn verb(&self) -> Option<Verb> {
        match self {
            Message::Command(verb) => Some(*verb),
            Message::Note(_) => None,
        }
    }
}

/// The unit of bus communication.
///
/// Construct with [`Envelope::command`] (controller side) or
/// [`Envelope::from_device`] (node side); decode with [`crate::codec::decode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Envelope type.
    pub kind: MessageKind,
    /// Issuing controller (required on control envelopes).
    pub controller: Option<Id>,
    /// Target or originating device.
    pub device: Target,
    /// Liveness status of the sender.
    pub status: Option<Id>,
    /// Light state of the sender (status and echo envelopes).
    pub state: Option<SwitchState>,
    /// Command verb or note.
    pub message: Message,
}

impl Envelope {
    /// Build a controller command.
    ///
    /// # Example
    ///
    /// ```
    /// use light_node::{Envelope, Target, Verb, MessageKind};
    ///
    /// let cmd = Envelope::command("MQTT_master", Target::All, Verb::On);
    /// assert_eq!(cmd.kind, MessageKind::Control);
    /// assert_eq!(cmd.message.verb(), Some(Verb::On));
    /// ```
    pub fn command(controller: &str, target: Target, verb: Verb) -> Self {
        Self {
            kind: MessageKind::Control,
            controller: Some(bounded_string(controller)),
            device: target,
            status: Some(bounded_string("connected")),
            state: None,
            message: Message::Command(verb),
        }
    }

    /// Build a node-originated envelope carrying its own device id.
    pub fn from_device(kind: MessageKind, device_id: &str, message: &str) -> Self {
        Self {
            kind,
            controller: None,
            device: Target::Device(bounded_string(device_id)),
            status: None,
            state: None,
            message: Message::note(message),
        }
    }

    /// Set the controller id.
    pub fn with_controller(mut self, controller: &str) -> Self {
        self.controller = Some(bounded_string(controller));
        self
    }

    /// Set the liveness status.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(bounded_string(status));
        self
    }

    /// Set the light state.
    pub fn with_state(mut self, state: SwitchState) -> Self {
        self.state = Some(state);
        self
    }

    /// Whether the `controller` field equals the given id.
    pub fn is_from(&self, controller_id: &str) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|c| c.as_str() == controller_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_wildcard() {
        assert_eq!(Target::from_wire("ALL"), Target::All);
        assert!(Target::All.addresses("ESP32-1"));
        assert_eq!(Target::All.device_id(), None);
        assert_eq!(Target::All.as_str(), "ALL");
    }

    #[test]
    fn target_specific_device() {
        let t = Target::from_wire("ESP32-2");
        assert!(t.addresses("ESP32-2"));
        assert!(!t.addresses("ESP32-1"));
        assert_eq!(t.device_id(), Some("ESP32-2"));
    }

    #[test]
    fn wildcard_is_case_sensitive() {
        let t = Target::from_wire("all");
        assert_eq!(t, Target::Device(bounded_string("all")));
        assert!(!t.addresses("ESP32-1"));
    }

    #[test]
    fn message_classifies_verbs() {
        assert_eq!(Message::from_wire("ON"), Message::Command(Verb::On));
        assert_eq!(Message::from_wire("OFF"), Message::Command(Verb::Off));
        assert_eq!(Message::from_wire("status"), Message::Command(Verb::Status));
        assert_eq!(Message::from_wire("on").verb(), None);
        assert_eq!(Message::from_wire(STATUS_RESPONSE).verb(), None);
        assert_eq!(Message::from_wire("hello").as_str(), "hello");
    }

    #[test]
    fn message_kind_wire() {
        assert_eq!(MessageKind::from_wire("com"), Some(MessageKind::Com));
        assert_eq!(MessageKind::from_wire("control"), Some(MessageKind::Control));
        assert_eq!(MessageKind::from_wire("Control"), None);
        assert_eq!(MessageKind::Control.as_str(), "control");
    }

    #[test]
    fn command_builder() {
        let cmd = Envelope::command("MQTT_master", Target::from_wire("ESP32-3"), Verb::Off);
        assert!(cmd.is_from("MQTT_master"));
        assert!(!cmd.is_from("intruder"));
        assert_eq!(cmd.status.as_deref(), Some("connected"));
        assert_eq!(cmd.device.device_id(), Some("ESP32-3"));
    }

    #[test]
    fn device_envelope_builder() {
        let env = Envelope::from_device(MessageKind::Com, "ESP32-1", STATE_CHANGED)
            .with_status("Connected")
            .with_state(SwitchState::On);
        assert_eq!(env.controller, None);
        assert_eq!(env.device.device_id(), Some("ESP32-1"));
        assert_eq!(env.state, Some(SwitchState::On));
        assert_eq!(env.message.as_str(), STATE_CHANGED);
    }
}
