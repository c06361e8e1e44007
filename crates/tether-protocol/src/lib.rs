//! Wire message types and byte-level codec for the tether device protocol.
//!
//! Clients exchange single JSON payloads with the hub over a stream socket.
//! Each inbound payload carries a `msg_type` discriminator that selects one
//! of the recognised request forms; each outbound payload is a typed
//! response serialised with a fixed field order (`msg_type`, `msg_id`,
//! `sender_dev_id`, `dest_dev_id`, `msg_body`). All payloads travel in the
//! Windows-1251 code page for compatibility with the deployed device
//! clients; the conversion happens at the codec boundary and nowhere else.

mod codec;
mod message;

pub use codec::{DecodeError, EncodeError, decode, decode_text, encode, encode_text};
pub use message::{
    DeviceDescriptor, DeviceId, DeviceListBody, MessageId, NumericValue, ParamId, Request,
    Response, ValueConfirm, ValueConfirmBody, ValueResult,
};
