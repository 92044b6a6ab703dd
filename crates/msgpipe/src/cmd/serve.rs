use std::convert::Infallible;
use std::io::{Read, Write};

use msgpipe_dispatch::{
    Dispatcher, HandlerRegistry, JsonCodec, MsgPackCodec, PayloadCodec, Value,
};
use msgpipe_frame::{Channel, FrameConfig, PipeChannel};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cmd::{CodecArg, ServeArgs};
use crate::exit::{dispatch_error, frame_error, CliResult, SUCCESS};

#[derive(Debug, Deserialize)]
pub struct Ping {}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub pong: bool,
}

/// Echo request and response: the value comes back unchanged, binary and
/// extension types included.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub value: Value,
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = FrameConfig {
        max_payload_size: args.max_payload,
    };

    // SAFETY: the parent set these descriptors up for this process and
    // nothing else here has opened them.
    let channel = unsafe { PipeChannel::open_inherited(args.read_fd, args.write_fd, config) }
        .map_err(|err| frame_error("failed to open channel", err))?;

    match args.codec {
        CodecArg::Msgpack => serve_with(channel, builtin_registry::<MsgPackCodec>()),
        CodecArg::Json => serve_with(channel, builtin_registry::<JsonCodec>()),
    }
}

/// Handlers answered by `msgpipe serve`.
pub fn builtin_registry<C: PayloadCodec>() -> HandlerRegistry<C> {
    HandlerRegistry::with_codec()
        .register("Ping", |_: Ping| Ok::<_, Infallible>(Pong { pong: true }))
        .register("Echo", |req: Echo| Ok::<_, Infallible>(req))
}

/// Run the dispatch loop until the parent goes away or something fails.
fn serve_with<R, W, C>(channel: Channel<R, W>, registry: HandlerRegistry<C>) -> CliResult<i32>
where
    R: Read,
    W: Write,
    C: PayloadCodec,
{
    info!(tags = ?registry.tags(), "serving");
    let mut dispatcher = Dispatcher::new(channel, registry);

    match dispatcher.run() {
        Ok(never) => match never {},
        Err(err) if err.is_clean_close() => Ok(SUCCESS),
        Err(err) => Err(dispatch_error("dispatch loop failed", err)),
    }
}
