//! The child-side dispatch loop.

use std::convert::Infallible;
use std::fmt;
use std::io::{Read, Write};

use msgpipe_frame::Channel;
use tracing::{debug, error, info};

use crate::codec::{MsgPackCodec, PayloadCodec};
use crate::error::{DispatchError, Result};
use crate::message::InboundMessage;
use crate::registry::HandlerRegistry;

/// Where a [`Dispatcher`] is in its request cycle.
///
/// ```text
/// AwaitingHandshake -> Ready -> ReceivingFrame -> Decoding -> Dispatching
///     -> Encoding -> SendingFrame -> ReceivingFrame -> ...
/// ```
///
/// Any error moves the dispatcher to `Terminated`, which it never leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingHandshake,
    Ready,
    ReceivingFrame,
    Decoding,
    Dispatching,
    Encoding,
    SendingFrame,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingHandshake => "awaiting-handshake",
            Phase::Ready => "ready",
            Phase::ReceivingFrame => "receiving-frame",
            Phase::Decoding => "decoding",
            Phase::Dispatching => "dispatching",
            Phase::Encoding => "encoding",
            Phase::SendingFrame => "sending-frame",
            Phase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Serves requests from a channel, one at a time, in strict lockstep.
///
/// Each request is read, handled and answered before the next frame is
/// read. The first error of any kind terminates the dispatcher.
pub struct Dispatcher<R, W, C = MsgPackCodec> {
    channel: Channel<R, W>,
    registry: HandlerRegistry<C>,
    phase: Phase,
    served: u64,
}

impl<R: Read, W: Write, C: PayloadCodec> Dispatcher<R, W, C> {
    /// Take ownership of a channel and a finished registry.
    pub fn new(channel: Channel<R, W>, registry: HandlerRegistry<C>) -> Self {
        let phase = if channel.is_ready() {
            Phase::Ready
        } else {
            Phase::AwaitingHandshake
        };

        Self {
            channel,
            registry,
            phase,
            served: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of requests answered so far.
    pub fn requests_served(&self) -> u64 {
        self.served
    }

    /// The registry requests are dispatched against.
    pub fn registry(&self) -> &HandlerRegistry<C> {
        &self.registry
    }

    /// Send the ready byte to the parent.
    pub fn start(&mut self) -> Result<()> {
        if self.phase == Phase::Terminated {
            return Err(DispatchError::Terminated);
        }

        match self.channel.signal_ready() {
            Ok(()) => {
                self.phase = Phase::Ready;
                info!(
                    codec = C::NAME,
                    handlers = self.registry.len(),
                    "signalled ready"
                );
                Ok(())
            }
            Err(err) => Err(self.terminate(err.into())),
        }
    }

    /// Read, handle and answer exactly one request.
    pub fn serve_one(&mut self) -> Result<()> {
        if self.phase == Phase::Terminated {
            return Err(DispatchError::Terminated);
        }

        match self.step() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.terminate(err)),
        }
    }

    /// Signal ready if not done yet, then serve requests until an error.
    ///
    /// Never returns `Ok`. A peer closing the channel between requests
    /// surfaces as an error for which
    /// [`DispatchError::is_clean_close`] is true.
    pub fn run(&mut self) -> Result<Infallible> {
        if self.phase == Phase::AwaitingHandshake {
            self.start()?;
        }

        loop {
            self.serve_one()?;
        }
    }

    /// Consume the dispatcher and return its channel.
    pub fn into_channel(self) -> Channel<R, W> {
        self.channel
    }

    fn step(&mut self) -> Result<()> {
        self.phase = Phase::ReceivingFrame;
        let payload = self.channel.read_frame()?;

        self.phase = Phase::Decoding;
        let message = InboundMessage::decode::<C>(&payload)?;
        debug!(tag = %message.tag, len = payload.len(), "received request");

        self.phase = Phase::Dispatching;
        let reply = self.registry.invoke(message)?;

        self.phase = Phase::Encoding;
        let tag = reply.tag().to_string();
        let response = reply.encode()?;

        self.phase = Phase::SendingFrame;
        self.channel.write_frame(&response)?;

        self.served += 1;
        self.phase = Phase::ReceivingFrame;
        debug!(%tag, len = response.len(), "sent response");
        Ok(())
    }

    fn terminate(&mut self, err: DispatchError) -> DispatchError {
        let phase = self.phase;
        self.phase = Phase::Terminated;

        if err.is_clean_close() {
            info!(served = self.served, "peer closed channel");
        } else {
            error!(%phase, served = self.served, error = %err, "dispatcher terminated");
        }
        err
    }
}

impl<R, W, C> fmt::Debug for Dispatcher<R, W, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("phase", &self.phase)
            .field("served", &self.served)
            .field("registry", &self.registry)
            .finish()
    }
}
