use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::header::FrameHeader;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(u8::MAX as usize),
            config,
        }
    }

    /// Write a frame using its own header; the link version applies.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(&frame.header, frame.payload.as_ref())
    }

    /// Encode and send one payload.
    pub fn send(&mut self, header: &FrameHeader, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(self.config.version, header, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FrameParser;

    #[derive(Debug, Default)]
    struct ShortWriter {
        written: Vec<u8>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(3);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn v1_ping_bytes() {
        let mut writer = FrameWriter::with_config(Vec::new(), FrameConfig::v1(2));
        writer.send(&FrameHeader::new(5, 2, 8), &[]).unwrap();
        assert_eq!(writer.get_ref(), &[0x99, 0x06, 0x05, 0x08, 0x13, 0x24]);
    }

    #[test]
    fn short_writes_are_completed() {
        let mut writer = FrameWriter::new(ShortWriter::default());
        writer
            .send(&FrameHeader::new(3, 1, 20), b"partial writes")
            .unwrap();

        let mut parser = FrameParser::new(FrameConfig::v2());
        let frames = parser.push(&writer.into_inner().written);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"partial writes");
    }

    #[test]
    fn write_frame_uses_frame_header() {
        let frame = Frame::new(
            crate::ProtocolVersion::V2,
            FrameHeader::new(7, 2, 40).with_receiver(9),
            vec![1, 2, 3],
        );
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame(&frame).unwrap();

        let mut parser = FrameParser::new(FrameConfig::v2());
        assert_eq!(parser.push(writer.get_ref()), vec![frame]);
    }

    #[test]
    fn oversized_payload_is_refused() {
        let mut writer = FrameWriter::new(Vec::new());
        let err = writer
            .send(&FrameHeader::default(), &[0u8; 300])
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn zero_write_means_closed() {
        let mut writer = FrameWriter::new(ClosedWriter);
        let err = writer.send(&FrameHeader::default(), b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }
}
