//! Relay sockets for skirmish
//!
//! The chat relay and the lobby relay both speak concatenated JSON over TCP.
//! [`JsonFrameCodec`] turns the byte stream into whole frames,
//! [`RelayConnection`] owns one socket and a reader task, and
//! [`FrameWaiter`] is a one-shot subscription to the next frame matching a
//! predicate.

pub mod codec;
pub mod connection;
pub mod error;
pub mod router;

pub use codec::{FrameError, JsonFrameCodec};
pub use connection::RelayConnection;
pub use error::RelayError;
pub use router::{FrameRouter, FrameWaiter};
