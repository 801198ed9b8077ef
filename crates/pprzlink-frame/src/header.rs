//! Protocol versions and their header layouts.
//!
//! ```text
//! v1.0: STX | length | sender_id | msg_id | payload | ck_a | ck_b
//! v2.0: STX | length | sender_id | receiver_id | comp<<4 | class | msg_id | payload | ck_a | ck_b
//! ```
//!
//! `length` counts the whole frame, STX and checksum included.

use std::fmt;
use std::str::FromStr;

use bytes::BufMut;

/// Start-of-frame byte.
pub const STX: u8 = 0x99;

/// Bytes every frame carries besides its header ids and payload:
/// STX, length, ck_a, ck_b.
pub const TRANSPORT_OVERHEAD: usize = 4;

/// Wire protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2,
}

impl ProtocolVersion {
    /// Id bytes between the length byte and the payload.
    pub const fn header_len(self) -> usize {
        match self {
            Self::V1 => 2,
            Self::V2 => 4,
        }
    }

    /// Total frame length for an empty payload.
    pub const fn frame_overhead(self) -> usize {
        TRANSPORT_OVERHEAD + self.header_len()
    }

    /// Largest payload whose frame length still fits in one byte.
    pub const fn max_payload(self) -> usize {
        u8::MAX as usize - self.frame_overhead()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized protocol version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol version '{0}' (expected 1.0 or 2.0)")]
pub struct UnknownVersion(pub String);

impl FromStr for ProtocolVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "1.0" | "v1" => Ok(Self::V1),
            "2" | "2.0" | "v2" => Ok(Self::V2),
            other => Err(UnknownVersion(other.to_string())),
        }
    }
}

/// Addressing fields of a frame.
///
/// v1.0 frames only carry `sender_id` and `msg_id`; the class comes from the
/// link configuration and `receiver_id`/`component_id` are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameHeader {
    pub sender_id: u8,
    pub receiver_id: u8,
    /// 4-bit sub-address behind one link (v2.0 only).
    pub component_id: u8,
    /// 4-bit class id on the wire (v2.0 only).
    pub class_id: u8,
    pub msg_id: u8,
}

impl FrameHeader {
    pub fn new(sender_id: u8, class_id: u8, msg_id: u8) -> Self {
        Self {
            sender_id,
            class_id,
            msg_id,
            ..Self::default()
        }
    }

    pub fn with_receiver(mut self, receiver_id: u8) -> Self {
        self.receiver_id = receiver_id;
        self
    }

    pub fn with_component(mut self, component_id: u8) -> Self {
        self.component_id = component_id;
        self
    }

    /// v2.0 packed byte: component in the high nibble, class in the low one.
    pub fn comp_class(&self) -> u8 {
        ((self.component_id & 0x0F) << 4) | (self.class_id & 0x0F)
    }

    /// Append the id bytes for `version`.
    pub fn put<B: BufMut>(&self, version: ProtocolVersion, dst: &mut B) {
        match version {
            ProtocolVersion::V1 => {
                dst.put_u8(self.sender_id);
                dst.put_u8(self.msg_id);
            }
            ProtocolVersion::V2 => {
                dst.put_u8(self.sender_id);
                dst.put_u8(self.receiver_id);
                dst.put_u8(self.comp_class());
                dst.put_u8(self.msg_id);
            }
        }
    }

    /// Read the id bytes at the start of a frame body (the bytes between
    /// `length` and the checksum). Returns `None` if `body` is too short.
    pub fn read(version: ProtocolVersion, body: &[u8], link_class_id: u8) -> Option<Self> {
        if body.len() < version.header_len() {
            return None;
        }
        let header = match version {
            ProtocolVersion::V1 => Self {
                sender_id: body[0],
                receiver_id: 0,
                component_id: 0,
                class_id: link_class_id,
                msg_id: body[1],
            },
            ProtocolVersion::V2 => Self {
                sender_id: body[0],
                receiver_id: body[1],
                component_id: (body[2] & 0xF0) >> 4,
                class_id: body[2] & 0x0F,
                msg_id: body[3],
            },
        };
        Some(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_layouts() {
        assert_eq!(ProtocolVersion::V1.frame_overhead(), 6);
        assert_eq!(ProtocolVersion::V2.frame_overhead(), 8);
        assert_eq!(ProtocolVersion::V1.max_payload(), 249);
        assert_eq!(ProtocolVersion::V2.max_payload(), 247);
    }

    #[test]
    fn version_parse_and_display() {
        assert_eq!("1.0".parse::<ProtocolVersion>(), Ok(ProtocolVersion::V1));
        assert_eq!("2".parse::<ProtocolVersion>(), Ok(ProtocolVersion::V2));
        assert!("3.0".parse::<ProtocolVersion>().is_err());
        assert_eq!(ProtocolVersion::V2.to_string(), "2.0");
    }

    #[test]
    fn v2_header_packs_component_and_class() {
        let header = FrameHeader::new(7, 2, 40)
            .with_receiver(9)
            .with_component(3);
        let mut out = Vec::new();
        header.put(ProtocolVersion::V2, &mut out);
        assert_eq!(out, [7, 9, 0x32, 40]);

        let back = FrameHeader::read(ProtocolVersion::V2, &out, 0).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn v1_header_takes_class_from_link() {
        let mut out = Vec::new();
        FrameHeader::new(5, 1, 8).put(ProtocolVersion::V1, &mut out);
        assert_eq!(out, [5, 8]);

        let back = FrameHeader::read(ProtocolVersion::V1, &out, 2).unwrap();
        assert_eq!(back, FrameHeader::new(5, 2, 8));
        assert!(FrameHeader::read(ProtocolVersion::V2, &out, 0).is_none());
    }
}
