//! Request dispatch over a framed msgpipe channel.
//!
//! The child side registers handlers in a [`HandlerRegistry`] keyed by a
//! message-type tag, then hands the registry and a
//! [`Channel`](msgpipe_frame::Channel) to a [`Dispatcher`], which answers one
//! request at a time until the channel fails.
//!
//! Every inbound payload is a map carrying the reserved [`TYPE_KEY`]
//! (`"$type"`). The remaining fields are narrowed into the handler's typed
//! request; the handler's return value is encoded as the response with no
//! envelope.
//!
//! The parent side talks to a child through a [`Client`].

pub mod client;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod registry;

pub use client::Client;
pub use codec::{JsonCodec, MsgPackCodec, PayloadCodec};
pub use dispatcher::{Dispatcher, Phase};
pub use error::{BoxError, CodecError, DispatchError, Result};
pub use message::{value_kind, Fields, InboundMessage, TYPE_KEY};
pub use registry::{HandlerRegistry, Reply};
pub use rmpv::Value;
