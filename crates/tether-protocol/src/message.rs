//! Typed request and response messages.
//!
//! The request schema mirrors the payloads produced by the deployed device
//! clients; the response schema mirrors what those clients parse. Field
//! names and nesting are therefore wire-exact (`dev_id`, `msg_id_confirm`,
//! `value_confirm`, ...) rather than idiomatic Rust names.

use serde::{Deserialize, Serialize};

/// Identifier of a device on the bench network.
pub type DeviceId = u32;

/// Identifier of a configurable parameter within a device setup.
pub type ParamId = u32;

/// Message identifier; sessions hand these out monotonically.
pub type MessageId = u64;

/// Parsed inbound request.
///
/// One variant per recognised `msg_type`. Payloads with a well-formed
/// envelope but an unrecognised discriminator decode to [`Request::Unrecognised`]
/// so the dispatcher can drop them deliberately instead of treating them as
/// decode failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `REQUEST_DEVICE_LIST`: enumerate the configured devices.
    ListDevices {
        /// Device that asked for the listing (wire `sender_dev_id`).
        requester_id: DeviceId,
    },
    /// `REQUEST_SETUP_FULL`: fetch the complete setup document of one device.
    GetFullSetup {
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
    },
    /// `REQUEST_SETUP_VALUES`: fetch the shared values file verbatim.
    GetSetupValues,
    /// `REQUEST_CHANGE_VALUE`: set one parameter to a new value.
    ChangeValue {
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        param_id: ParamId,
        new_value: NumericValue,
    },
    /// Any other `msg_type`; ignored without a reply.
    Unrecognised { msg_type: String },
}

/// Parameter value carried end-to-end with its wire-level numeric shape.
///
/// Downstream clients branch on whether `new_value` arrives as a scalar
/// integer, a scalar float or an integer sequence, so the discrimination
/// made at decode time must survive untouched until encode time. The
/// variant order matters: integers must be tried before floats so that `3`
/// stays `Int(3)` rather than widening to `Float(3.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
    IntSequence(Vec<i64>),
}

/// Device summary as published in a `DEVICE_LIST` response.
///
/// Parsed from the `dev_info` section of a descriptor document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub dev_id: DeviceId,
    pub dev_type: String,
    pub dev_name: String,
    pub dev_hw_ver: String,
    pub dev_fw_ver: String,
    pub fw_date: String,
    pub param_uuid: String,
}

/// Outbound response.
///
/// Serialised with `msg_type` first (internal serde tag) followed by the
/// remaining fields in declaration order, matching the framing the clients
/// expect. The `REQUEST_SETUP_VALUES` reply is raw passthrough bytes and is
/// not represented here; see the dispatcher's passthrough outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msg_type")]
pub enum Response {
    #[serde(rename = "DEVICE_LIST")]
    DeviceList {
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        msg_body: DeviceListBody,
    },
    #[serde(rename = "DEVICE_SETUP_FULL")]
    FullSetup {
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        /// Setup document copied verbatim from catalog storage.
        msg_body: serde_json::Value,
    },
    #[serde(rename = "DEVICE_VALUE_CONFIRM")]
    ValueConfirm {
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        msg_body: ValueConfirmBody,
    },
}

impl Response {
    /// Builds a `DEVICE_LIST` response.
    pub fn device_list(
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        devices: Vec<DeviceDescriptor>,
    ) -> Self {
        Self::DeviceList {
            msg_id,
            sender_dev_id,
            dest_dev_id,
            msg_body: DeviceListBody {
                device_list: devices,
            },
        }
    }

    /// Builds a `DEVICE_SETUP_FULL` response around a passthrough body.
    pub fn full_setup(
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        body: serde_json::Value,
    ) -> Self {
        Self::FullSetup {
            msg_id,
            sender_dev_id,
            dest_dev_id,
            msg_body: body,
        }
    }

    /// Builds a `DEVICE_VALUE_CONFIRM` response.
    pub fn value_confirm(
        msg_id: MessageId,
        sender_dev_id: DeviceId,
        dest_dev_id: DeviceId,
        confirm: ValueConfirm,
    ) -> Self {
        Self::ValueConfirm {
            msg_id,
            sender_dev_id,
            dest_dev_id,
            msg_body: ValueConfirmBody {
                value_confirm: confirm,
            },
        }
    }
}

/// Body wrapper for `DEVICE_LIST`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListBody {
    pub device_list: Vec<DeviceDescriptor>,
}

/// Body wrapper for `DEVICE_VALUE_CONFIRM`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueConfirmBody {
    pub value_confirm: ValueConfirm,
}

/// Confirmation payload echoed back for a `REQUEST_CHANGE_VALUE`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueConfirm {
    /// `msg_id` of the request being confirmed.
    pub msg_id_confirm: MessageId,
    pub result: ValueResult,
    pub param_id: ParamId,
    /// Requested value echoed verbatim, numeric shape preserved.
    pub new_value: NumericValue,
}

/// Outcome reported in a value confirmation.
///
/// The current dispatcher has no validation path and always confirms `Ok`;
/// `Failed` exists because the wire schema reserves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueResult {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
}
