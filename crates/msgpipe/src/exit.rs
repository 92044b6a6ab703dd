use std::fmt;
use std::io;

use msgpipe_dispatch::DispatchError;
use msgpipe_frame::FrameError;
use msgpipe_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const PROTOCOL_VIOLATION: i32 = 65;
pub const HANDLER_FAILED: i32 = 70;
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
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => DATA_INVALID,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Transport(source) => transport_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ChannelClosed { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        FrameError::BadReadyByte(_) => {
            CliError::new(PROTOCOL_VIOLATION, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn dispatch_error(context: &str, err: DispatchError) -> CliError {
    match err {
        DispatchError::Frame(source) => frame_error(context, source),
        DispatchError::Decode(_) | DispatchError::MalformedRequest { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DispatchError::MissingTypeTag
        | DispatchError::InvalidTypeTag { .. }
        | DispatchError::UnknownMessageType(_) => {
            CliError::new(PROTOCOL_VIOLATION, format!("{context}: {err}"))
        }
        DispatchError::Handler { .. } => {
            CliError::new(HANDLER_FAILED, format!("{context}: {err}"))
        }
        DispatchError::Encode { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        DispatchError::InvalidRequest { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        DispatchError::Terminated => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_map_to_protocol_violation() {
        assert_eq!(
            dispatch_error("x", DispatchError::MissingTypeTag).code,
            PROTOCOL_VIOLATION
        );
        assert_eq!(
            dispatch_error("x", DispatchError::UnknownMessageType("Nope".into())).code,
            PROTOCOL_VIOLATION
        );
        assert_eq!(
            frame_error("x", FrameError::BadReadyByte(0)).code,
            PROTOCOL_VIOLATION
        );
    }

    #[test]
    fn truncated_stream_is_transport_error() {
        let err = frame_error(
            "read failed",
            FrameError::ChannelClosed {
                expected: 4,
                received: 2,
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("read failed: "));
    }

    #[test]
    fn handler_failure_code() {
        let err = DispatchError::Handler {
            tag: "Ping".into(),
            source: "boom".into(),
        };
        assert_eq!(dispatch_error("x", err).code, HANDLER_FAILED);
    }

    #[test]
    fn nested_io_errors_are_unwrapped() {
        let err = DispatchError::Frame(FrameError::Io(io::Error::from(
            io::ErrorKind::BrokenPipe,
        )));
        assert_eq!(dispatch_error("x", err).code, TRANSPORT_ERROR);
    }
}
