//! Error taxonomy for the control-plane core.
//!
//! Every variant here is transient or local: components absorb them at
//! their own boundary and surface only a state change or a log line.
//! Authorization and targeting filters are not errors; see
//! [`RouteDecision`](crate::RouteDecision).

use thiserror::Error;

/// Errors reported by the link, session, and codec layers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The network link is not connected (retried by the scheduling loop).
    #[error("network link unavailable")]
    LinkUnavailable,

    /// The broker session is not established (retried after a fixed delay).
    #[error("broker session unavailable")]
    SessionUnavailable,

    /// The encoded envelope would exceed the payload bound; nothing was sent.
    #[error("encoded envelope exceeds 512 bytes")]
    PayloadTooLarge,

    /// The broker refused the publish.
    #[error("broker rejected publish")]
    PublishFailed,

    /// An inbound payload could not be decoded into an envelope.
    #[error("envelope decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Returns `true` for conditions the loop retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::LinkUnavailable | Error::SessionUnavailable)
    }
}

/// Reasons an inbound payload is rejected.
///
/// A rejected payload is dropped without side effects; the sender is
/// responsible for re-announcing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is larger than [`MAX_PAYLOAD`](crate::codec::MAX_PAYLOAD).
    #[error("payload of {len} bytes exceeds 512")]
    Oversized {
        /// Received payload length.
        len: usize,
    },

    /// Payload is not a well-formed JSON object, or a field overflowed its buffer.
    #[error("payload is not a well-formed envelope")]
    Malformed,

    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field is present but has an unrecognised value.
    #[error("invalid value for field `{0}`")]
    InvalidField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn transient_classification() {
        assert!(Error::LinkUnavailable.is_transient());
        assert!(Error::SessionUnavailable.is_transient());
        assert!(!Error::PayloadTooLarge.is_transient());
        assert!(!Error::PublishFailed.is_transient());
        assert!(!Error::Decode(DecodeError::Malformed).is_transient());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::PayloadTooLarge.to_string(),
            "encoded envelope exceeds 512 bytes"
        );
        assert_eq!(
            DecodeError::MissingField("device").to_string(),
            "missing required field `device`"
        );
        assert_eq!(
            Error::from(DecodeError::Oversized { len: 600 }).to_string(),
            "envelope decode failed: payload of 600 bytes exceeds 512"
        );
    }
}
