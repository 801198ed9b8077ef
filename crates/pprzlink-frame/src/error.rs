use crate::header::ProtocolVersion;

/// Errors that can occur during frame encoding or stream reading.
///
/// Corrupt input is not an error: the parser resynchronizes and counts the
/// dropped frame in [`ParserStats`](crate::ParserStats).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the one-byte frame length.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A frame built for one protocol version was handed to a link running
    /// another.
    #[error("frame is protocol {found}, link is {expected}")]
    VersionMismatch {
        expected: ProtocolVersion,
        found: ProtocolVersion,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
