//! `tokio_util::codec` adapter so a link can be driven by `FramedRead`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::FrameError;
use crate::parser::{FrameParser, ParserStats};

#[derive(Debug, Clone, Default)]
pub struct PprzCodec {
    parser: FrameParser,
}

impl PprzCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            parser: FrameParser::new(config),
        }
    }

    pub fn stats(&self) -> &ParserStats {
        self.parser.stats()
    }
}

impl Decoder for PprzCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let mut consumed = 0;
        while consumed < src.len() {
            let byte = src[consumed];
            consumed += 1;
            if let Some(frame) = self.parser.push_byte(byte) {
                src.advance(consumed);
                return Ok(Some(frame));
            }
        }
        src.clear();
        Ok(None)
    }
}

impl Encoder<Frame> for PprzCodec {
    type Error = FrameError;

    /// Frames are written as they are; one of another version is refused
    /// rather than re-framed.
    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        let expected = self.parser.config().version;
        if frame.version != expected {
            return Err(FrameError::VersionMismatch {
                expected,
                found: frame.version,
            });
        }
        encode_frame(expected, &frame.header, &frame.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{FrameHeader, ProtocolVersion};

    #[test]
    fn decodes_frames_split_across_buffers() {
        let mut codec = PprzCodec::new(FrameConfig::v2());
        let mut wire = BytesMut::new();
        encode_frame(
            ProtocolVersion::V2,
            &FrameHeader::new(1, 1, 5),
            b"abc",
            &mut wire,
        )
        .unwrap();
        encode_frame(
            ProtocolVersion::V2,
            &FrameHeader::new(1, 1, 6),
            b"de",
            &mut wire,
        )
        .unwrap();

        let mut first = wire.split_to(7);
        assert!(codec.decode(&mut first).unwrap().is_none());
        assert!(first.is_empty());

        let frame = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.header.msg_id, 5);
        let frame = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.header.msg_id, 6);
        assert!(codec.decode(&mut wire).unwrap().is_none());
        assert_eq!(codec.stats().frames, 2);
    }

    #[test]
    fn encoder_matches_frame_encoding() {
        let mut codec = PprzCodec::new(FrameConfig::v1(2));
        let mut dst = BytesMut::new();
        let frame = Frame::new(ProtocolVersion::V1, FrameHeader::new(5, 2, 8), Vec::new());
        codec.encode(frame, &mut dst).unwrap();
        assert_eq!(dst.as_ref(), &[0x99, 0x06, 0x05, 0x08, 0x13, 0x24]);
    }

    #[test]
    fn encoder_refuses_frames_of_another_version() {
        let mut codec = PprzCodec::new(FrameConfig::v1(2));
        let mut dst = BytesMut::new();
        let frame = Frame::new(ProtocolVersion::V2, FrameHeader::new(5, 2, 8), Vec::new());
        assert!(matches!(
            codec.encode(frame, &mut dst),
            Err(FrameError::VersionMismatch {
                expected: ProtocolVersion::V1,
                found: ProtocolVersion::V2,
            })
        ));
        assert!(dst.is_empty());
    }
}
