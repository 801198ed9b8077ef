use std::fmt;
use std::io;

use pprzlink_bindgen::BindgenError;
use pprzlink_frame::FrameError;
use pprzlink_message::{CodecError, TextError};
use pprzlink_schema::LoadError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn load_error(context: &str, err: LoadError) -> CliError {
    match err {
        LoadError::LoadFailed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        LoadError::TooLarge { .. } | LoadError::InvalidJson(_) | LoadError::Compile(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::VersionMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    match err {
        CodecError::Frame(err) => frame_error(context, err),
        CodecError::UnknownClass(_)
        | CodecError::UnknownMessage { .. }
        | CodecError::UnknownField { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn text_error(context: &str, err: TextError) -> CliError {
    match err {
        TextError::Codec(err) => codec_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn bindgen_error(context: &str, err: BindgenError) -> CliError {
    match err {
        BindgenError::UnknownClass(_) => CliError::new(USAGE, format!("{context}: {err}")),
        BindgenError::VariableFieldNotLast { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        BindgenError::Emit(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_library_errors_to_exit_codes() {
        let err = load_error("load", LoadError::LoadFailed("gone".into()));
        assert_eq!(err.code, FAILURE);

        let err = codec_error("encode", CodecError::UnknownClass("nope".into()));
        assert_eq!(err.code, USAGE);
        assert_eq!(err.message, "encode: unknown message class 'nope'");

        let err = text_error("parse", TextError::Empty);
        assert_eq!(err.code, DATA_INVALID);

        let err = frame_error(
            "write",
            FrameError::Io(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}
