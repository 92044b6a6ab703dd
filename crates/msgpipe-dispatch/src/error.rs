use msgpipe_frame::FrameError;

/// Opaque failure returned by a handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by a payload codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// MessagePack serialization error.
    #[error("msgpack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MessagePack deserialization error.
    #[error("msgpack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// MessagePack payload could not be read as a generic value.
    #[error("msgpack decode error: {0}")]
    MsgPackValue(#[from] rmpv::decode::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload decoded, but not to a map.
    #[error("expected a map, found {found}")]
    NotAMap { found: &'static str },
}

/// Errors that end a dispatch loop or a client session.
///
/// None of these are recoverable: the channel is unusable afterwards.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Framing or stream failure, including the peer closing the channel.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The payload is not a valid encoded map.
    #[error("payload decode failed: {0}")]
    Decode(#[source] CodecError),

    /// The inbound map has no `$type` key.
    #[error("message has no $type key")]
    MissingTypeTag,

    /// The `$type` value is not a string.
    #[error("message $type must be a string, found {found}")]
    InvalidTypeTag { found: &'static str },

    /// No handler is registered for the tag.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// The fields do not match the registered request shape.
    #[error("malformed {tag} request: {source}")]
    MalformedRequest {
        tag: String,
        #[source]
        source: rmpv::ext::Error,
    },

    /// The handler failed.
    #[error("{tag} handler failed: {source}")]
    Handler {
        tag: String,
        #[source]
        source: BoxError,
    },

    /// A value could not be encoded for the wire.
    #[error("failed to encode {tag} payload: {source}")]
    Encode {
        tag: String,
        #[source]
        source: CodecError,
    },

    /// A client request does not serialize to a map.
    #[error("invalid {tag} request: {reason}")]
    InvalidRequest { tag: String, reason: String },

    /// The dispatcher already stopped on an earlier error.
    #[error("dispatcher terminated by an earlier error")]
    Terminated,
}

impl DispatchError {
    /// True when the peer closed the channel exactly at a frame boundary.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, DispatchError::Frame(err) if err.is_clean_close())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
