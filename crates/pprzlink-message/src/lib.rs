//! pprzlink message values and codecs.
//!
//! [`WireCodec`] turns [`Message`]s into binary frames and back;
//! [`TextCodec`] does the same for the human-readable text bus. Both only
//! read the shared [`SchemaModel`](pprzlink_schema::SchemaModel).

pub mod error;
pub mod message;
pub mod request_id;
pub mod text;
pub mod value;
pub mod wire;

pub use error::{CodecError, Result, TextError};
pub use message::Message;
pub use request_id::{InvalidRequestId, RequestId, RequestIdGenerator};
pub use text::{
    answered_name, payload_string, request_name, to_csv, TextCodec, TextConfig, TextMessage,
    REQUEST_SUFFIX,
};
pub use value::{FieldValue, MAX_VARIABLE_LEN};
pub use wire::{decode_payload, encode_payload, Address, Envelope, WireCodec};
