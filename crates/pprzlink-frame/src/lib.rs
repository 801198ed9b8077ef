//! pprzlink frame transport.
//!
//! Every frame on the wire is
//! - STX (`0x99`) for synchronization
//! - a one-byte total length
//! - the version-specific header ids (2 bytes for v1.0, 4 for v2.0)
//! - the message payload
//! - two 8-bit running checksums
//!
//! [`FrameParser`] recovers frames from an unreliable byte stream one byte at
//! a time; [`FrameReader`]/[`FrameWriter`] wrap blocking streams.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod header;
pub mod parser;
pub mod reader;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod writer;

pub use checksum::Checksum;
pub use codec::{encode_frame, Frame, FrameConfig};
pub use error::{FrameError, Result};
pub use header::{FrameHeader, ProtocolVersion, UnknownVersion, STX, TRANSPORT_OVERHEAD};
pub use parser::{FrameParser, ParserState, ParserStats};
pub use reader::FrameReader;
#[cfg(feature = "async")]
pub use tokio_codec::PprzCodec;
pub use writer::FrameWriter;
