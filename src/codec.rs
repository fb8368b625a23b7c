//! JSON codec for bus envelopes.
//!
//! Uses `serde-json-core` so the same code runs on the ESP32 and on the
//! desktop. Encoding writes into a fixed 512-byte buffer and fails rather
//! than truncating. Decoding unescapes string values into bounded buffers
//! and validates every field before an [`Envelope`] is produced.
//!
//! # Example
//!
//! ```
//! use light_node::codec::{decode, encode};
//! use light_node::{Envelope, Target, Verb};
//!
//! let cmd = Envelope::command("MQTT_master", Target::All, Verb::On);
//! let bytes = encode(&cmd).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), cmd);
//! ```

use crate::config::{bounded_string, MAX_SHORT_STRING};
use crate::envelope::{Envelope, Message, MessageKind, Target, MAX_NOTE};
use crate::error::{DecodeError, Error};
use crate::traits::SwitchState;
use serde::{Deserialize, Serialize};

/// Upper bound on an encoded envelope, in bytes.
pub const MAX_PAYLOAD: usize = 512;

/// Encoded envelope bytes.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

// ============================================================================
// Wire Representation
// ============================================================================

#[derive(Serialize)]
struct WireOut<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    controller: Option<&'a str>,
    device: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    message: &'a str,
}

/// Inbound string value after unescaping, sized to the whole payload.
type WireStr = heapless::String<MAX_PAYLOAD>;

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireIn {
    #[serde(rename = "type")]
    kind: Option<WireStr>,
    controller: Option<WireStr>,
    device: Option<WireStr>,
    status: Option<WireStr>,
    state: Option<WireStr>,
    message: Option<WireStr>,
}

// ============================================================================
// Encode / Decode
// ============================================================================

/// Serialize an envelope to its JSON wire form.
///
/// Returns [`Error::PayloadTooLarge`] if the result would not fit in
/// [`MAX_PAYLOAD`] bytes.
pub fn encode(envelope: &Envelope) -> Result<Payload, Error> {
    let wire = WireOut {
        kind: envelope.kind.as_str(),
        controller: envelope.controller.as_deref(),
        device: envelope.device.as_str(),
        status: envelope.status.as_deref(),
        state: envelope.state.map(|s| s.as_str()),
        message: envelope.message.as_str(),
    };
    serde_json_core::to_vec::<_, MAX_PAYLOAD>(&wire).map_err(|_| Error::PayloadTooLarge)
}

/// Parse and validate an inbound payload.
///
/// Unknown keys are ignored. The `controller` key is only required on
/// `control` envelopes.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    if bytes.len() > MAX_PAYLOAD {
        return Err(DecodeError::Oversized { len: bytes.len() });
    }

    let mut scratch = [0u8; MAX_PAYLOAD];
    let (wire, _) = serde_json_core::from_slice_escaped::<WireIn>(bytes, &mut scratch)
        .map_err(|_| DecodeError::Malformed)?;

    let kind = wire.kind.as_deref().ok_or(DecodeError::MissingField("type"))?;
    let kind = MessageKind::from_wire(kind).ok_or(DecodeError::InvalidField("type"))?;

    let device = identifier(wire.device.as_deref(), "device")?
        .ok_or(DecodeError::MissingField("device"))?;
    let controller = identifier(wire.controller.as_deref(), "controller")?;
    if kind == MessageKind::Control && controller.is_none() {
        return Err(DecodeError::MissingField("controller"));
    }
    let status = identifier(wire.status.as_deref(), "status")?;

    let state = match wire.state.as_deref() {
        Some(s) => Some(SwitchState::from_wire(s).ok_or(DecodeError::InvalidField("state"))?),
        None => None,
    };

    let message = wire.message.as_deref().ok_or(DecodeError::MissingField("message"))?;
    if message.len() > MAX_NOTE {
        return Err(DecodeError::InvalidField("message"));
    }

    Ok(Envelope {
        kind,
        controller: controller.map(bounded_string),
        device: Target::from_wire(device),
        status: status.map(bounded_string),
        state,
        message: Message::from_wire(message),
    })
}

/// Checks an identifier field: non-empty and within id capacity.
fn identifier<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<Option<&'a str>, DecodeError> {
    match value {
        Some(s) if s.is_empty() || s.len() > MAX_SHORT_STRING => {
            Err(DecodeError::InvalidField(field))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Verb, STATE_CHANGED, STATUS_RESPONSE};
    use alloc::string::String;

    const MASTER_ON_ALL: &[u8] = br#"{"type":"control","controller":"MQTT_master","device":"ALL","status":"connected","message":"ON"}"#;

    #[test]
    fn decode_controller_broadcast() {
        let env = decode(MASTER_ON_ALL).unwrap();
        assert_eq!(env.kind, MessageKind::Control);
        assert!(env.is_from("MQTT_master"));
        assert_eq!(env.device, Target::All);
        assert_eq!(env.status.as_deref(), Some("connected"));
        assert_eq!(env.state, None);
        assert_eq!(env.message.verb(), Some(Verb::On));
    }

    #[test]
    fn decode_echo_without_controller() {
        let json = br#"{"type":"com","device":"ESP32-2","status":"Connected","state":"OFF","message":"state has changed"}"#;
        let env = decode(json).unwrap();
        assert_eq!(env.kind, MessageKind::Com);
        assert_eq!(env.controller, None);
        assert_eq!(env.device.device_id(), Some("ESP32-2"));
        assert_eq!(env.state, Some(SwitchState::Off));
        assert_eq!(env.message.as_str(), STATE_CHANGED);
    }

    #[test]
    fn decode_ignores_unknown_keys_and_whitespace() {
        let json = br#" { "type" : "control", "controller":"MQTT_master", "device":"ESP32-1", "message":"status", "seq": 7 } "#;
        let env = decode(json).unwrap();
        assert_eq!(env.message.verb(), Some(Verb::Status));
        assert_eq!(env.status, None);
    }

    #[test]
    fn decode_rejects_malformed() {
        assert_eq!(decode(b"not json"), Err(DecodeError::Malformed));
        assert_eq!(decode(b""), Err(DecodeError::Malformed));
        assert_eq!(decode(br#"{"type":"control""#), Err(DecodeError::Malformed));
        assert_eq!(decode(br#"{"type":5}"#), Err(DecodeError::Malformed));
    }

    #[test]
    fn decode_rejects_oversized_before_parsing() {
        let big = [b' '; MAX_PAYLOAD + 1];
        assert_eq!(
            decode(&big),
            Err(DecodeError::Oversized { len: MAX_PAYLOAD + 1 })
        );
    }

    #[test]
    fn decode_reports_missing_fields() {
        assert_eq!(
            decode(br#"{"device":"ALL","message":"ON"}"#),
            Err(DecodeError::MissingField("type"))
        );
        assert_eq!(
            decode(br#"{"type":"com","message":"hi"}"#),
            Err(DecodeError::MissingField("device"))
        );
        assert_eq!(
            decode(br#"{"type":"com","device":"ESP32-1"}"#),
            Err(DecodeError::MissingField("message"))
        );
        assert_eq!(
            decode(br#"{"type":"control","device":"ALL","message":"ON"}"#),
            Err(DecodeError::MissingField("controller"))
        );
    }

    #[test]
    fn decode_reports_invalid_fields() {
        assert_eq!(
            decode(br#"{"type":"command","device":"ALL","message":"ON"}"#),
            Err(DecodeError::InvalidField("type"))
        );
        assert_eq!(
            decode(br#"{"type":"com","device":"ESP32-1","state":"DIM","message":"x"}"#),
            Err(DecodeError::InvalidField("state"))
        );
        assert_eq!(
            decode(br#"{"type":"com","device":"","message":"x"}"#),
            Err(DecodeError::InvalidField("device"))
        );
    }

    #[test]
    fn decode_rejects_overlong_identifier() {
        let mut json = String::from(r#"{"type":"com","device":""#);
        json.extend(core::iter::repeat('d').take(MAX_SHORT_STRING + 1));
        json.push_str(r#"","message":"x"}"#);
        assert_eq!(
            decode(json.as_bytes()),
            Err(DecodeError::InvalidField("device"))
        );
    }

    #[test]
    fn encode_omits_absent_fields() {
        let env = Envelope::from_device(MessageKind::Com, "ESP32-1", "heartbeat");
        let bytes = encode(&env).unwrap();
        assert_eq!(
            core::str::from_utf8(&bytes).unwrap(),
            r#"{"type":"com","device":"ESP32-1","message":"heartbeat"}"#
        );
    }

    #[test]
    fn encode_status_response_shape() {
        let env = Envelope::from_device(MessageKind::Control, "ESP32-1", STATUS_RESPONSE)
            .with_controller("MQTT_master")
            .with_status("Connected")
            .with_state(SwitchState::On);
        let bytes = encode(&env).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "control");
        assert_eq!(value["controller"], "MQTT_master");
        assert_eq!(value["device"], "ESP32-1");
        assert_eq!(value["status"], "Connected");
        assert_eq!(value["state"], "ON");
        assert_eq!(value["message"], "status_response");
    }

    #[test]
    fn encode_then_decode_preserves_envelope() {
        let env = Envelope::from_device(MessageKind::Com, "ESP32-4", STATE_CHANGED)
            .with_status("Connected")
            .with_state(SwitchState::Off);
        assert_eq!(decode(&encode(&env).unwrap()).unwrap(), env);
    }

    #[test]
    fn encode_fails_instead_of_truncating() {
        let long_id: String = core::iter::repeat('x').take(MAX_SHORT_STRING).collect();
        let long_note: String = core::iter::repeat('n').take(MAX_NOTE).collect();
        let env = Envelope::from_device(MessageKind::Control, &long_id, &long_note)
            .with_controller(&long_id)
            .with_status(&long_id)
            .with_state(SwitchState::Off);
        assert_eq!(encode(&env), Err(Error::PayloadTooLarge));
    }

    #[test]
    fn quotes_and_backslashes_survive_round_trip() {
        let env = Envelope::from_device(MessageKind::Com, "ESP32-1", r#"say "hi" to C:\lights"#)
            .with_status("Connected");
        let bytes = encode(&env).unwrap();
        assert_eq!(decode(&bytes).unwrap(), env);
        assert_eq!(
            decode(&bytes).unwrap().message.as_str(),
            r#"say "hi" to C:\lights"#
        );
    }

    #[test]
    fn decode_unescapes_unicode_sequences() {
        let env = decode(br#"{"type":"com","device":"ESP32\u002d1","message":"caf\u00e9"}"#)
            .unwrap();
        assert_eq!(env.device, Target::from_wire("ESP32-1"));
        assert_eq!(env.device.device_id(), Some("ESP32-1"));
        assert_eq!(env.message.as_str(), "caf\u{e9}");
    }

    #[test]
    fn decode_unescapes_control_characters() {
        let env = decode(br#"{"type":"com","device":"ESP32-1","message":"line\nbreak\ttab"}"#)
            .unwrap();
        assert_eq!(env.message.as_str(), "line\nbreak\ttab");
    }

    #[test]
    fn escaped_verb_is_recognised() {
        let env = decode(
            br#"{"type":"control","controller":"MQTT_master","device":"ALL","message":"\u004fN"}"#,
        )
        .unwrap();
        assert_eq!(env.message.verb(), Some(Verb::On));
    }

    #[test]
    fn bad_escape_is_malformed() {
        assert_eq!(
            decode(br#"{"type":"com","device":"ESP32-1","message":"\q"}"#),
            Err(DecodeError::Malformed)
        );
    }
}
