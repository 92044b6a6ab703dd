//! Framed request/response messaging between a parent process and its child.
//!
//! The parent spawns a child with two extra pipe descriptors. The child
//! announces itself with a single ready byte, then answers length-prefixed
//! requests one at a time, routing each to a handler by its `$type` tag.
//!
//! # Crate Structure
//!
//! - [`transport`] - Inherited descriptors and the byte streams over them
//! - [`frame`] - Ready handshake and `u32` little-endian length framing
//! - [`dispatch`] - Handler registry, dispatch loop and parent-side client
//!   (behind the `dispatch` feature, on by default)

/// Re-export transport types.
pub mod transport {
    pub use msgpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use msgpipe_frame::*;
}

/// Re-export dispatch types (requires `dispatch` feature).
#[cfg(feature = "dispatch")]
pub mod dispatch {
    pub use msgpipe_dispatch::*;
}
