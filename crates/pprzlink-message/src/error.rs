use pprzlink_frame::FrameError;

/// Per-message encode/decode failures.
///
/// All of these are scoped to one message: a receiver drops the offending
/// message and keeps processing its stream.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unknown message class '{0}'")]
    UnknownClass(String),

    #[error("unknown message '{class}.{message}'")]
    UnknownMessage { class: String, message: String },

    #[error("no message with id {msg_id} in class {class_id}")]
    UnknownMessageId { class_id: u8, msg_id: u8 },

    #[error("message '{message}' has no field '{field}'")]
    UnknownField { message: String, field: String },

    #[error("payload of '{message}' truncated at field '{field}' (needs {needed} bytes, {available} left)")]
    TruncatedPayload {
        message: String,
        field: String,
        needed: usize,
        available: usize,
    },

    #[error("message '{message}' expects {expected} values, got {actual}")]
    FieldCountMismatch {
        message: String,
        expected: usize,
        actual: usize,
    },

    #[error("field '{field}' is {expected}, cannot hold {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("value {value} out of range for field '{field}' ({ty})")]
    ValueOutOfRange {
        field: String,
        value: String,
        ty: String,
    },

    #[error("field '{field}' has no enumerated value '{name}'")]
    UnknownEnumValue { field: String, name: String },

    #[error("field '{field}' expects {expected} elements, got {actual}")]
    ArrayLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("field '{field}' has {len} elements, max {max}")]
    ArrayTooLong { field: String, len: usize, max: usize },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("message JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message JSON: {0}")]
    InvalidJson(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Text bus line failures. Always recoverable: the caller skips the line.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("empty line")]
    Empty,

    #[error("unknown message '{0}'")]
    UnknownMessage(String),

    #[error("malformed line '{0}'")]
    Malformed(String),

    #[error("sender '{0}' is not an aircraft id")]
    InvalidSender(String),

    #[error("field '{field}': cannot parse '{value}'")]
    InvalidValue { field: String, value: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}
