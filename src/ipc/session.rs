//! The client session: calls, replies and queued events.
//!
//! The compositor pushes events on the same connection that carries call
//! replies, so a reply may arrive behind any number of events.  [`Session::call`]
//! reads until it finds the reply and parks every event it passes in a FIFO
//! queue.  [`Session::next_event`] drains that queue before touching the
//! socket again, so each received frame is handed out exactly once.
//!
//! One call at a time: the protocol has no request ids, and replies are
//! matched purely by order.

use super::codec::{self, HEADER_LEN};
use super::discovery::{self, DiscoveryOptions};
use super::endpoint::Endpoint;
use super::error::IpcError;
use super::message::{self, Message};
use super::transport::UnixTransport;
use crate::traits::{ReadOutcome, Transport};
use log::debug;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::os::unix::io::{AsRawFd, RawFd};

/// Method used by [`Session::watch`] to subscribe to events.
pub const WATCH_METHOD: &str = "subscribe-events";

/// Whether a call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// Outcome of [`Session::try_next_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPoll {
    Event(Message),
    /// No complete frame is available yet.
    Pending,
    /// The connection is gone.
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum ReadMode {
    Blocking,
    NonBlocking,
}

enum Frame {
    Message(Message),
    WouldBlock,
    EndOfStream,
}

/// A live connection to the compositor.
pub struct Session<T: Transport = UnixTransport> {
    transport: T,
    endpoint: Endpoint,
    pending: VecDeque<Message>,
    state: SessionState,
    /// Payload length of a frame whose header was read but whose body is
    /// still outstanding.
    header: Option<usize>,
    closed: bool,
}

impl Session<UnixTransport> {
    /// Connect to `endpoint`.  Never falls back to discovery.
    pub fn connect(endpoint: &Endpoint) -> Result<Self, IpcError> {
        let transport = UnixTransport::connect(endpoint)?;
        Ok(Self::new(transport, endpoint.clone()))
    }

    /// Resolve the endpoint and connect.
    ///
    /// `explicit` wins, then the [`SOCKET_ENV`](super::endpoint::SOCKET_ENV)
    /// variable.  Only when neither is set is `discovery` consulted, and only
    /// if it is enabled.
    pub fn open(
        explicit: Option<Endpoint>,
        discovery: Option<&DiscoveryOptions>,
    ) -> Result<Self, IpcError> {
        if let Some(endpoint) = explicit.or_else(Endpoint::from_env) {
            return Self::connect(&endpoint);
        }
        match discovery {
            Some(options) if options.enabled => {
                let transport = discovery::discover(options)?;
                let endpoint = transport.endpoint().clone();
                Ok(Self::new(transport, endpoint))
            }
            _ => Err(IpcError::Discovery(
                "no socket configured and discovery is disabled".into(),
            )),
        }
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already connected transport.
    pub fn new(transport: T, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
            pending: VecDeque::new(),
            state: SessionState::Idle,
            header: None,
            closed: false,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of events received but not yet handed out.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Send `request` and wait for its reply.
    ///
    /// Events that arrive first are queued for [`next_event`](Self::next_event).
    pub fn call(&mut self, request: Message) -> Result<Message, IpcError> {
        let method = match message::method(&request) {
            Some(m) => m.to_string(),
            None => return Err(IpcError::Protocol("missing method".into())),
        };
        if self.closed {
            return Err(self.lost("session is closed"));
        }

        self.state = SessionState::AwaitingResponse;
        let result = self.exchange(&request, &method);
        self.state = SessionState::Idle;
        result
    }

    fn exchange(&mut self, request: &Message, method: &str) -> Result<Message, IpcError> {
        let frame = codec::encode_request(request)?;
        if let Err(e) = self.transport.write_all(&frame) {
            // Part of the frame may be on the wire already.
            self.close();
            return Err(e);
        }

        loop {
            let reply = match self.read_frame(ReadMode::Blocking)? {
                Frame::Message(m) => m,
                Frame::EndOfStream => {
                    return Err(self.lost(&format!("closed while waiting for {} reply", method)))
                }
                Frame::WouldBlock => {
                    self.close();
                    return Err(IpcError::Read(ErrorKind::WouldBlock.into()));
                }
            };

            if message::is_event(&reply) {
                debug!("queued {:?} while waiting for {}", message::event_name(&reply), method);
                self.pending.push_back(reply);
                continue;
            }
            if let Some(text) = message::error_text(&reply) {
                debug!("{} failed: {}", method, text);
                return Err(IpcError::from_remote(&text, message::method(&reply), Some(method)));
            }
            return Ok(reply);
        }
    }

    /// Next event, blocking until one arrives.
    ///
    /// Queued events come first.  Otherwise one frame is read from the socket
    /// and returned as is.  `None` once the peer has hung up.
    pub fn next_event(&mut self) -> Result<Option<Message>, IpcError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        if self.closed {
            return Ok(None);
        }
        match self.read_frame(ReadMode::Blocking)? {
            Frame::Message(m) => Ok(Some(m)),
            Frame::EndOfStream => Ok(None),
            Frame::WouldBlock => {
                self.close();
                Err(IpcError::Read(ErrorKind::WouldBlock.into()))
            }
        }
    }

    /// Next event if one can be had without blocking.
    ///
    /// Intended for readiness callbacks of an external event loop; a frame
    /// that has only partly arrived is kept until the rest shows up.
    pub fn try_next_event(&mut self) -> Result<EventPoll, IpcError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(EventPoll::Event(event));
        }
        if self.closed {
            return Ok(EventPoll::Closed);
        }
        Ok(match self.read_frame(ReadMode::NonBlocking)? {
            Frame::Message(m) => EventPoll::Event(m),
            Frame::WouldBlock => EventPoll::Pending,
            Frame::EndOfStream => EventPoll::Closed,
        })
    }

    /// Subscribe to `events`, or to everything when `None`.
    pub fn watch(&mut self, events: Option<&[String]>) -> Result<Message, IpcError> {
        self.watch_with(WATCH_METHOD, events)
    }

    /// [`watch`](Self::watch) through a different subscription method.
    pub fn watch_with(
        &mut self,
        method: &str,
        events: Option<&[String]>,
    ) -> Result<Message, IpcError> {
        let mut data = Map::new();
        if let Some(events) = events {
            data.insert(
                "events".into(),
                Value::Array(events.iter().cloned().map(Value::String).collect()),
            );
        }
        self.call(message::request_with(method, data))
    }

    /// Close the connection.  Queued events can still be drained.
    pub fn close(&mut self) {
        self.transport.close();
        self.closed = true;
        self.header = None;
    }

    fn lost(&self, reason: &str) -> IpcError {
        IpcError::Connection {
            endpoint: self.endpoint.path().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Read `n` bytes.  A transport failure ends the session.
    fn read(&mut self, n: usize, mode: ReadMode) -> Result<ReadOutcome, IpcError> {
        let outcome = match mode {
            ReadMode::Blocking => self.transport.read_exact_blocking(n),
            ReadMode::NonBlocking => self.transport.try_read_available(n),
        };
        if outcome.is_err() {
            self.close();
        }
        outcome
    }

    /// Read one whole frame.
    ///
    /// End-of-stream between frames is reported as such; end-of-stream
    /// inside a frame is a connection error.  Either way the session is
    /// finished, as it is after any read or decode failure: replies are
    /// matched by order only, so a frame that cannot be read or understood
    /// leaves no way to tell which reply comes next.
    fn read_frame(&mut self, mode: ReadMode) -> Result<Frame, IpcError> {
        let len = match self.header {
            Some(len) => len,
            None => match self.read(HEADER_LEN, mode)? {
                ReadOutcome::Data(bytes) => match codec::decode_header(&bytes) {
                    Ok(len) => {
                        self.header = Some(len);
                        len
                    }
                    Err(e) => {
                        // The stream cannot be resynchronised after this.
                        self.close();
                        return Err(e);
                    }
                },
                ReadOutcome::WouldBlock => return Ok(Frame::WouldBlock),
                ReadOutcome::EndOfStream => {
                    let buffered = self.transport.buffered();
                    self.close();
                    if buffered > 0 {
                        return Err(self.lost(&format!(
                            "closed after {} of {} header bytes",
                            buffered, HEADER_LEN
                        )));
                    }
                    return Ok(Frame::EndOfStream);
                }
            },
        };

        match self.read(len, mode)? {
            ReadOutcome::Data(payload) => {
                self.header = None;
                match codec::decode(&payload) {
                    Ok(m) => Ok(Frame::Message(m)),
                    Err(e) => {
                        self.close();
                        Err(e)
                    }
                }
            }
            ReadOutcome::WouldBlock => Ok(Frame::WouldBlock),
            ReadOutcome::EndOfStream => {
                self.close();
                Err(self.lost(&format!("closed in the middle of a {} byte frame", len)))
            }
        }
    }
}

impl<T: Transport + AsRawFd> AsRawFd for Session<T> {
    fn as_raw_fd(&self) -> RawFd {
        self.transport.as_raw_fd()
    }
}

//  Tests
