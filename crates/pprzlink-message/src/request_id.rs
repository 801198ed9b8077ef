use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier pairing a text bus request with its answer: `<pid>_<seq>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// True for tokens shaped like a request id (`digits_digits`).
    pub fn matches(token: &str) -> bool {
        let Some((pid, seq)) = token.split_once('_') else {
            return false;
        };
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        digits(pid) && digits(seq)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token is not shaped like a request id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a request id")]
pub struct InvalidRequestId(pub String);

impl FromStr for RequestId {
    type Err = InvalidRequestId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::matches(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidRequestId(s.to_string()))
        }
    }
}

/// Issues request ids that are unique within a process and, through the
/// process id prefix, across processes sharing a bus.
///
/// Share one generator (by reference or `Arc`) among every caller issuing
/// requests.
#[derive(Debug)]
pub struct RequestIdGenerator {
    pid: u32,
    seq: AtomicU64,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdGenerator {
    /// Generator prefixed with the current process id.
    pub fn new() -> Self {
        Self::with_pid(std::process::id())
    }

    pub fn with_pid(pid: u32) -> Self {
        Self {
            pid,
            seq: AtomicU64::new(0),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Next id. Sequence numbers start at 1 and are never reused.
    pub fn next_id(&self) -> RequestId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        RequestId(format!("{}_{}", self.pid, seq))
    }
}
