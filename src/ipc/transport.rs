//! Unix-socket [`Transport`] implementation.

use super::endpoint::Endpoint;
use super::error::IpcError;
use crate::traits::{ReadOutcome, Transport};
use log::debug;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

/// A stream connection to the compositor's IPC socket.
///
/// The socket is kept in blocking mode except for the duration of a
/// [`try_read_available`](Transport::try_read_available) call.
pub struct UnixTransport {
    endpoint: Endpoint,
    stream: Option<UnixStream>,
    /// Bytes received by a read that has not completed yet.
    partial: Vec<u8>,
}

impl UnixTransport {
    /// Connect to the socket at `endpoint`.
    pub fn connect(endpoint: &Endpoint) -> Result<Self, IpcError> {
        let stream = UnixStream::connect(endpoint.path()).map_err(|e| IpcError::Connection {
            endpoint: endpoint.path().to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("connected to {}", endpoint);
        Ok(Self::from_stream(stream, endpoint.clone()))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: UnixStream, endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            stream: Some(stream),
            partial: Vec::new(),
        }
    }

    /// The endpoint this transport was connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn closed_error(&self) -> IpcError {
        IpcError::Connection {
            endpoint: self.endpoint.path().to_path_buf(),
            reason: "transport is closed".into(),
        }
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), IpcError> {
        match &self.stream {
            Some(stream) => stream.set_nonblocking(nonblocking).map_err(IpcError::Read),
            None => Err(self.closed_error()),
        }
    }

    /// Fill `self.partial` up to `n` bytes.
    ///
    /// Returns `WouldBlock` as soon as the socket has nothing more to give,
    /// which only happens in non-blocking mode.
    fn fill(&mut self, n: usize) -> Result<ReadOutcome, IpcError> {
        let mut chunk = [0u8; 4096];
        while self.partial.len() < n {
            let stream = match self.stream.as_mut() {
                Some(stream) => stream,
                None => return Err(self.closed_error()),
            };
            let want = (n - self.partial.len()).min(chunk.len());
            match stream.read(&mut chunk[..want]) {
                Ok(0) => {
                    debug!(
                        "end of stream on {} ({} of {} bytes buffered)",
                        self.endpoint,
                        self.partial.len(),
                        n
                    );
                    return Ok(ReadOutcome::EndOfStream);
                }
                Ok(k) => self.partial.extend_from_slice(&chunk[..k]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadOutcome::WouldBlock),
                Err(e) => return Err(IpcError::Read(e)),
            }
        }
        let rest = self.partial.split_off(n);
        Ok(ReadOutcome::Data(std::mem::replace(&mut self.partial, rest)))
    }
}

impl Transport for UnixTransport {
    fn read_exact_blocking(&mut self, n: usize) -> Result<ReadOutcome, IpcError> {
        self.set_nonblocking(false)?;
        match self.fill(n)? {
            // Only a receive timeout set by someone else can get us here.
            ReadOutcome::WouldBlock => Err(IpcError::Read(ErrorKind::WouldBlock.into())),
            outcome => Ok(outcome),
        }
    }

    fn try_read_available(&mut self, n: usize) -> Result<ReadOutcome, IpcError> {
        self.set_nonblocking(true)?;
        let outcome = self.fill(n);
        self.set_nonblocking(false)?;
        outcome
    }

    fn buffered(&self) -> usize {
        self.partial.len()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IpcError> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(IpcError::Write(ErrorKind::NotConnected.into())),
        };
        stream.write_all(bytes).map_err(IpcError::Write)?;
        stream.flush().map_err(IpcError::Write)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            debug!("closed connection to {}", self.endpoint);
        }
        self.partial.clear();
    }
}

impl AsRawFd for UnixTransport {
    /// The socket descriptor, for registering with an external event loop.
    ///
    /// Returns `-1` once the transport is closed.
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_ref().map_or(-1, |s| s.as_raw_fd())
    }
}

impl Drop for UnixTransport {
    fn drop(&mut self) {
        self.close();
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "wfmenu-transport-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    fn pair() -> (UnixTransport, UnixStream) {
        let (ours, theirs) = UnixStream::pair().expect("socket pair");
        (
            UnixTransport::from_stream(ours, Endpoint::new("/pair")),
            theirs,
        )
    }

    #[test]
    fn connect_to_missing_path_fails() {
        let endpoint = Endpoint::new(tmp_socket_path());
        match UnixTransport::connect(&endpoint) {
            Err(IpcError::Connection { endpoint: path, .. }) => {
                assert_eq!(path, endpoint.path())
            }
            Err(other) => panic!("unexpected {:?}", other),
            Ok(_) => panic!("connected to a missing socket"),
        }
    }

    #[test]
    fn connect_to_listening_socket() {
        let path = tmp_socket_path();
        let _listener = UnixListener::bind(&path).expect("bind");
        let transport = UnixTransport::connect(&Endpoint::new(&path)).expect("connect");
        assert_eq!(transport.endpoint().path(), path.as_path());
        assert!(transport.as_raw_fd() >= 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn blocking_read_returns_exact_bytes() {
        let (mut t, mut peer) = pair();
        peer.write_all(b"abcdef").unwrap();
        assert_eq!(t.read_exact_blocking(4).unwrap(), ReadOutcome::Data(b"abcd".to_vec()));
        assert_eq!(t.read_exact_blocking(2).unwrap(), ReadOutcome::Data(b"ef".to_vec()));
    }

    #[test]
    fn zero_length_read_needs_no_data() {
        let (mut t, _peer) = pair();
        assert_eq!(t.read_exact_blocking(0).unwrap(), ReadOutcome::Data(Vec::new()));
    }

    #[test]
    fn try_read_with_nothing_pending_would_block() {
        let (mut t, _peer) = pair();
        assert_eq!(t.try_read_available(4).unwrap(), ReadOutcome::WouldBlock);
    }

    #[test]
    fn short_data_is_buffered_not_exposed() {
        let (mut t, mut peer) = pair();
        peer.write_all(b"ab").unwrap();
        assert_eq!(t.try_read_available(4).unwrap(), ReadOutcome::WouldBlock);
        peer.write_all(b"cd").unwrap();
        assert_eq!(t.try_read_available(4).unwrap(), ReadOutcome::Data(b"abcd".to_vec()));
    }

    #[test]
    fn blocking_read_completes_buffered_bytes() {
        let (mut t, mut peer) = pair();
        peer.write_all(b"xy").unwrap();
        assert_eq!(t.try_read_available(3).unwrap(), ReadOutcome::WouldBlock);
        peer.write_all(b"z").unwrap();
        assert_eq!(t.read_exact_blocking(3).unwrap(), ReadOutcome::Data(b"xyz".to_vec()));
    }

    #[test]
    fn hangup_before_n_bytes_is_end_of_stream() {
        let (mut t, mut peer) = pair();
        peer.write_all(b"ab").unwrap();
        drop(peer);
        assert_eq!(t.read_exact_blocking(4).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn bytes_left_at_hangup_stay_buffered() {
        let (mut t, mut peer) = pair();
        assert_eq!(t.buffered(), 0);
        peer.write_all(b"abc").unwrap();
        drop(peer);
        assert_eq!(t.read_exact_blocking(4).unwrap(), ReadOutcome::EndOfStream);
        assert_eq!(t.buffered(), 3);
        t.close();
        assert_eq!(t.buffered(), 0);
    }

    #[test]
    fn hangup_is_end_of_stream_for_try_read() {
        let (mut t, peer) = pair();
        drop(peer);
        assert_eq!(t.try_read_available(4).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn write_reaches_peer() {
        let (mut t, mut peer) = pair();
        t.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let (mut t, _peer) = pair();
        t.close();
        t.close();
        assert_eq!(t.as_raw_fd(), -1);
        assert!(matches!(t.write_all(b"x"), Err(IpcError::Write(_))));
        assert!(matches!(
            t.read_exact_blocking(1),
            Err(IpcError::Connection { .. })
        ));
    }
}
