//! Parent-side client for talking to a dispatching child.

use std::io::{Read, Write};
use std::marker::PhantomData;

use msgpipe_frame::Channel;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{MsgPackCodec, PayloadCodec};
use crate::error::{DispatchError, Result};
use crate::message::tagged_request;

/// Sends tagged requests to a child and reads its responses.
///
/// The child answers strictly in order, so [`Client::send`] may be called
/// several times before the matching [`Client::recv`] calls.
pub struct Client<R, W, C = MsgPackCodec> {
    channel: Channel<R, W>,
    pending: usize,
    _codec: PhantomData<fn() -> C>,
}

impl<R: Read, W: Write> Client<R, W, MsgPackCodec> {
    /// Wait for the child's ready byte on `inbound`.
    pub fn connect(inbound: R, outbound: W) -> Result<Self> {
        Self::connect_with(Channel::new(inbound, outbound))
    }
}

impl<R: Read, W: Write, C: PayloadCodec> Client<R, W, C> {
    /// Wait for the child's ready byte on an existing channel.
    pub fn connect_with(mut channel: Channel<R, W>) -> Result<Self> {
        channel.await_ready()?;
        info!(codec = C::NAME, "child is ready");

        Ok(Self {
            channel,
            pending: 0,
            _codec: PhantomData,
        })
    }

    /// Send one request and wait for its response.
    pub fn request<Req, Resp>(&mut self, tag: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.send(tag, request)?;
        self.recv()
    }

    /// Send one request without waiting for the response.
    pub fn send<Req: Serialize + ?Sized>(&mut self, tag: &str, request: &Req) -> Result<()> {
        let value = tagged_request(tag, request)?;
        let payload = C::encode(&value).map_err(|source| DispatchError::Encode {
            tag: tag.to_string(),
            source,
        })?;

        self.channel.write_frame(&payload)?;
        self.pending += 1;
        debug!(tag, len = payload.len(), pending = self.pending, "sent request");
        Ok(())
    }

    /// Read the next response.
    pub fn recv<Resp: DeserializeOwned>(&mut self) -> Result<Resp> {
        let payload = self.channel.read_frame()?;
        self.pending = self.pending.saturating_sub(1);
        debug!(len = payload.len(), pending = self.pending, "received response");

        C::decode(&payload).map_err(DispatchError::Decode)
    }

    /// Requests sent whose responses have not been read.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Consume the client and return its channel.
    pub fn into_channel(self) -> Channel<R, W> {
        self.channel
    }
}
