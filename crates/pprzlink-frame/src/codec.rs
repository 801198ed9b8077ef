use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::Checksum;
use crate::error::{FrameError, Result};
use crate::header::{FrameHeader, ProtocolVersion, STX};

/// Link-level framing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Header layout spoken on the link.
    pub version: ProtocolVersion,
    /// Class assigned to v1.0 frames, whose header carries no class id.
    pub link_class_id: u8,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::V2,
            link_class_id: 1,
        }
    }
}

impl FrameConfig {
    pub fn v1(link_class_id: u8) -> Self {
        Self {
            version: ProtocolVersion::V1,
            link_class_id,
        }
    }

    pub fn v2() -> Self {
        Self::default()
    }
}

/// A validated frame: checksum verified, header ids split from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: ProtocolVersion,
    pub header: FrameHeader,
    /// Message payload without header ids.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(version: ProtocolVersion, header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        Self {
            version,
            header,
            payload: payload.into(),
        }
    }

    /// Split a frame body (the bytes between `length` and the checksum).
    pub fn from_body(body: &[u8], config: &FrameConfig) -> Option<Self> {
        let header = FrameHeader::read(config.version, body, config.link_class_id)?;
        let payload = Bytes::copy_from_slice(&body[config.version.header_len()..]);
        Some(Self::new(config.version, header, payload))
    }

    /// Total bytes on the wire, STX and checksum included.
    pub fn wire_size(&self) -> usize {
        self.version.frame_overhead() + self.payload.len()
    }

    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        encode_frame(self.version, &self.header, &self.payload, dst)
    }
}

/// Append one complete frame to `dst`.
///
/// ```text
/// STX | length | header ids | payload | ck_a | ck_b
/// ```
pub fn encode_frame(
    version: ProtocolVersion,
    header: &FrameHeader,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let max = version.max_payload();
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }
    let length = (version.frame_overhead() + payload.len()) as u8;

    dst.reserve(length as usize);
    dst.put_u8(STX);
    let body_start = dst.len() + 1;
    dst.put_u8(length);
    header.put(version, dst);
    dst.put_slice(payload);

    let sum = Checksum::compute(length, &dst[body_start..]);
    dst.put_u8(sum.ck_a);
    dst.put_u8(sum.ck_b);
    Ok(())
}
