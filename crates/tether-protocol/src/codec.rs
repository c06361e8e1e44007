//! Decoding and encoding of wire payloads.
//!
//! A payload is one JSON document in the Windows-1251 code page. Decoding
//! parses the envelope, reads the `msg_type` discriminator and validates the
//! fields required by that message type; encoding serialises a typed
//! [`Response`] and converts it back to the code page. A failed decode never
//! terminates a connection — callers log the error and wait for the next
//! payload.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1251;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::message::{DeviceId, MessageId, NumericValue, ParamId, Request, Response};

/// Errors surfaced while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not a well-formed message object.
    #[error("malformed payload: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A field required by the recognised message type is absent.
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
}

impl DecodeError {
    /// Creates a malformed-payload error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a malformed-payload error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a missing-field error.
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

/// Error surfaced when a response fails to serialise.
///
/// Every [`Response`] variant has a defined wire form, so this does not
/// occur in practice; the type exists so write paths can propagate instead
/// of panicking.
#[derive(Debug, Error)]
#[error("failed to serialise response: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Envelope shared by all request types.
///
/// Everything is optional here; presence is enforced per message type after
/// the discriminator is known, so a missing `msg_id` on a type that needs it
/// reports `MissingField` rather than a generic parse failure.
#[derive(Debug, Deserialize)]
struct Envelope {
    msg_type: Option<String>,
    msg_id: Option<MessageId>,
    sender_dev_id: Option<DeviceId>,
    dest_dev_id: Option<DeviceId>,
    msg_body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ValueNewWire {
    param_id: Option<ParamId>,
    param_value: Option<Value>,
}

/// Decodes one wire payload into a typed [`Request`].
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] when the payload is not parseable as a
/// message object or a field has the wrong type, and
/// [`DecodeError::MissingField`] when `msg_type` or a field required by the
/// recognised type is absent. An unrecognised `msg_type` is not an error; it
/// decodes to [`Request::Unrecognised`].
pub fn decode(payload: &[u8]) -> Result<Request, DecodeError> {
    let text = decode_text(payload);
    let envelope: Envelope =
        serde_json::from_str(text.as_ref()).map_err(DecodeError::from_json_error)?;
    let Envelope {
        msg_type,
        msg_id,
        sender_dev_id,
        dest_dev_id,
        msg_body,
    } = envelope;
    let msg_type = msg_type.ok_or_else(|| DecodeError::missing("msg_type"))?;

    match msg_type.as_str() {
        "REQUEST_DEVICE_LIST" => Ok(Request::ListDevices {
            requester_id: require(sender_dev_id, "sender_dev_id")?,
        }),
        "REQUEST_SETUP_FULL" => Ok(Request::GetFullSetup {
            msg_id: require(msg_id, "msg_id")?,
            sender_dev_id: require(sender_dev_id, "sender_dev_id")?,
            dest_dev_id: require(dest_dev_id, "dest_dev_id")?,
        }),
        "REQUEST_SETUP_VALUES" => Ok(Request::GetSetupValues),
        "REQUEST_CHANGE_VALUE" => decode_change_value(msg_id, sender_dev_id, dest_dev_id, msg_body),
        _ => Ok(Request::Unrecognised {
            msg_type: msg_type.clone(),
        }),
    }
}

fn decode_change_value(
    msg_id: Option<MessageId>,
    sender_dev_id: Option<DeviceId>,
    dest_dev_id: Option<DeviceId>,
    msg_body: Option<Value>,
) -> Result<Request, DecodeError> {
    let body = require(msg_body, "msg_body")?;
    let value_new = body
        .get("value_new")
        .cloned()
        .ok_or_else(|| DecodeError::missing("value_new"))?;
    let wire: ValueNewWire =
        serde_json::from_value(value_new).map_err(DecodeError::from_json_error)?;
    let raw_value = require(wire.param_value, "param_value")?;
    let new_value: NumericValue = serde_json::from_value(raw_value).map_err(|_| {
        DecodeError::malformed("param_value must be an integer, a float or an integer sequence")
    })?;

    Ok(Request::ChangeValue {
        msg_id: require(msg_id, "msg_id")?,
        sender_dev_id: require(sender_dev_id, "sender_dev_id")?,
        dest_dev_id: require(dest_dev_id, "dest_dev_id")?,
        param_id: require(wire.param_id, "param_id")?,
        new_value,
    })
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField { field })
}

/// Encodes a typed [`Response`] into its wire payload.
///
/// # Errors
///
/// Returns [`EncodeError`] if serde serialisation fails, which the derived
/// response types do not do in practice.
pub fn encode(response: &Response) -> Result<Vec<u8>, EncodeError> {
    let text = serde_json::to_string(response)?;
    Ok(encode_text(&text))
}

/// Converts UTF-8 text to the Windows-1251 wire encoding.
pub fn encode_text(text: &str) -> Vec<u8> {
    WINDOWS_1251.encode(text).0.into_owned()
}

/// Converts Windows-1251 wire bytes to UTF-8 text.
pub fn decode_text(payload: &[u8]) -> Cow<'_, str> {
    WINDOWS_1251.decode(payload).0
}
