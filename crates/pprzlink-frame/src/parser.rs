//! Byte-at-a-time frame recognizer.
//!
//! One [`FrameParser`] per physical link. It accepts bytes in any chunking,
//! resumes mid-frame across calls, and never fails on bad input: a corrupt
//! or truncated frame is dropped and the parser hunts for the next STX.

use tracing::trace;

use crate::checksum::Checksum;
use crate::codec::{Frame, FrameConfig};
use crate::header::{STX, TRANSPORT_OVERHEAD};

/// Recognizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    WaitStart,
    GotStart,
    GotLength,
    GotPayload,
    GotCrcA,
}

/// Per-link reception counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserStats {
    /// Frames that passed both checksum bytes.
    pub frames: u64,
    /// Frames dropped on a `ck_a` or `ck_b` mismatch.
    pub checksum_errors: u64,
    /// Length bytes too small to hold the configured header.
    pub malformed_lengths: u64,
    /// Bytes skipped while hunting for STX.
    pub discarded_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct FrameParser {
    config: FrameConfig,
    state: ParserState,
    buf: Vec<u8>,
    expected: usize,
    checksum: Checksum,
    stats: ParserStats,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl FrameParser {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            state: ParserState::WaitStart,
            buf: Vec::with_capacity(u8::MAX as usize),
            expected: 0,
            checksum: Checksum::default(),
            stats: ParserStats::default(),
        }
    }

    /// Advance by one byte. Returns `true` when a checksum-valid frame has
    /// just completed; [`body`](Self::body) then holds its header ids and
    /// payload until the next STX arrives.
    pub fn parse_byte(&mut self, byte: u8) -> bool {
        match self.state {
            ParserState::WaitStart => {
                if byte == STX {
                    self.state = ParserState::GotStart;
                } else {
                    self.stats.discarded_bytes += 1;
                }
            }
            ParserState::GotStart => {
                let length = byte as usize;
                if length < self.config.version.frame_overhead() {
                    trace!(length, "malformed frame length");
                    self.stats.malformed_lengths += 1;
                    self.state = ParserState::WaitStart;
                    return false;
                }
                self.expected = length - TRANSPORT_OVERHEAD;
                self.buf.clear();
                self.checksum = Checksum::seed(byte);
                self.state = ParserState::GotLength;
            }
            ParserState::GotLength => {
                self.buf.push(byte);
                self.checksum.update(byte);
                if self.buf.len() >= self.expected {
                    self.state = ParserState::GotPayload;
                }
            }
            ParserState::GotPayload => {
                if byte == self.checksum.ck_a {
                    self.state = ParserState::GotCrcA;
                } else {
                    self.reject("ck_a", byte, self.checksum.ck_a);
                }
            }
            ParserState::GotCrcA => {
                if byte == self.checksum.ck_b {
                    self.stats.frames += 1;
                    self.state = ParserState::WaitStart;
                    return true;
                }
                self.reject("ck_b", byte, self.checksum.ck_b);
            }
        }
        false
    }

    /// Advance by one byte, returning the completed frame if any.
    pub fn push_byte(&mut self, byte: u8) -> Option<Frame> {
        if self.parse_byte(byte) {
            Frame::from_body(&self.buf, &self.config)
        } else {
            None
        }
    }

    /// Feed a chunk and collect every frame completed inside it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Header ids and payload of the frame being received or just completed.
    pub fn body(&self) -> &[u8] {
        &self.buf
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Abandon any partial frame. Counters are kept.
    pub fn reset(&mut self) {
        self.state = ParserState::WaitStart;
        self.buf.clear();
        self.expected = 0;
    }

    fn reject(&mut self, which: &'static str, got: u8, want: u8) {
        trace!(which, got, want, "checksum mismatch, dropping frame");
        self.stats.checksum_errors += 1;
        self.state = ParserState::WaitStart;
    }
}
