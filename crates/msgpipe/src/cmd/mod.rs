use clap::{Args, Subcommand, ValueEnum};
use msgpipe_dispatch::{CodecError, JsonCodec, MsgPackCodec, PayloadCodec};
use msgpipe_transport::{DEFAULT_READ_FD, DEFAULT_WRITE_FD};
use serde::Serialize;
use serde_json::Value;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod inspect;
pub mod request;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the dispatch loop on descriptors inherited from a parent.
    Serve(ServeArgs),
    /// Write one framed request to stdout.
    Request(RequestArgs),
    /// Read frames from stdin and print them.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Request(args) => request::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Payload encoding selectable on the command line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    #[default]
    Msgpack,
    Json,
}

impl CodecArg {
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            CodecArg::Msgpack => MsgPackCodec::encode(value),
            CodecArg::Json => JsonCodec::encode(value),
        }
    }

    /// Decode a payload for display. MessagePack `bin` shows up as an
    /// array of byte values.
    pub fn decode(self, payload: &[u8]) -> Result<Value, CodecError> {
        match self {
            CodecArg::Msgpack => {
                let value = MsgPackCodec::decode_value(payload)?;
                Ok(serde_json::to_value(value)?)
            }
            CodecArg::Json => JsonCodec::decode(payload),
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Descriptor to read requests from.
    #[arg(long, env = "MSGPIPE_READ_FD", default_value_t = DEFAULT_READ_FD)]
    pub read_fd: i32,
    /// Descriptor to write responses to.
    #[arg(long, env = "MSGPIPE_WRITE_FD", default_value_t = DEFAULT_WRITE_FD)]
    pub write_fd: i32,
    /// Payload encoding.
    #[arg(long, env = "MSGPIPE_CODEC", value_enum, default_value_t = CodecArg::Msgpack)]
    pub codec: CodecArg,
    /// Reject frames larger than this many bytes.
    #[arg(long, env = "MSGPIPE_MAX_PAYLOAD", value_name = "BYTES")]
    pub max_payload: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Message type tag.
    #[arg(long = "type", value_name = "TAG")]
    pub tag: String,
    /// Request fields as a JSON object.
    #[arg(long, value_name = "OBJECT", default_value = "{}")]
    pub json: String,
    /// Precede the frame with the ready byte.
    #[arg(long)]
    pub with_ready: bool,
    /// Payload encoding.
    #[arg(long, env = "MSGPIPE_CODEC", value_enum, default_value_t = CodecArg::Msgpack)]
    pub codec: CodecArg,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Require the stream to start with the ready byte.
    #[arg(long)]
    pub expect_ready: bool,
    /// Stop after N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Payload encoding.
    #[arg(long, env = "MSGPIPE_CODEC", value_enum, default_value_t = CodecArg::Msgpack)]
    pub codec: CodecArg,
    /// Reject frames larger than this many bytes.
    #[arg(long, env = "MSGPIPE_MAX_PAYLOAD", value_name = "BYTES")]
    pub max_payload: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
