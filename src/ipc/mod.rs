//! Client for the compositor's IPC socket.
//!
//! Messages are length-prefixed JSON over a Unix stream socket (see
//! [`codec`]).  [`session::Session`] is the entry point: it issues calls,
//! matches their replies and queues the events pushed in between.

pub mod codec;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod session;
pub mod transport;
