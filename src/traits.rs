//! The seam between the [`Session`](crate::ipc::session::Session) and the
//! byte stream underneath it.
//!
//! The session only ever needs exact-length reads and whole writes.  Putting
//! that behind a trait keeps the correlation and queueing logic independent
//! of the socket, so it can be driven by a test double.

use crate::ipc::error::IpcError;

/// Result of one read attempt on a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Exactly the requested number of bytes.
    Data(Vec<u8>),
    /// Nothing can be read right now.  Only returned by
    /// [`Transport::try_read_available`].
    WouldBlock,
    /// The peer closed the stream before the requested bytes arrived.
    EndOfStream,
}

/// A bidirectional byte stream to the compositor.
///
/// # Contract
///
/// * Bytes are never handed out in pieces: a read returns all `n` bytes or
///   none.  Bytes received during an incomplete non-blocking read are kept by
///   the transport and handed out by a later read.
/// * A read never spins.  Each underlying read yields bytes, would-block or
///   end-of-stream, and the caller decides whether to try again.
pub trait Transport {
    /// Block until exactly `n` bytes are available, or the peer hangs up.
    fn read_exact_blocking(&mut self, n: usize) -> Result<ReadOutcome, IpcError>;

    /// Return `n` bytes if they can be had without blocking.
    fn try_read_available(&mut self, n: usize) -> Result<ReadOutcome, IpcError>;

    /// Bytes received but not yet handed out by a read.
    ///
    /// Non-zero after an [`EndOfStream`](ReadOutcome::EndOfStream) means the
    /// peer hung up in the middle of something, not between frames.
    fn buffered(&self) -> usize;

    /// Write every byte of `bytes`, blocking as needed.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IpcError>;

    /// Release the connection.  Calling this twice is harmless.
    fn close(&mut self);
}
