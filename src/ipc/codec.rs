//! Wire framing.
//!
//! # Wire format
//!
//! ```text
//! +----------------------+--------------------------+
//! | length N (u32, LE)   | N bytes of UTF-8 JSON    |
//! +----------------------+--------------------------+
//! ```
//!
//! No padding, checksum or version byte.  Nothing else in the crate looks at
//! raw frame bytes.

use super::error::IpcError;
use super::message::{self, Message};
use serde::Serialize;

/// Size of the length prefix.
pub const HEADER_LEN: usize = 4;

/// Largest payload accepted from the peer (64 MiB).
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Serialize `message` and prepend its length.
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, IpcError> {
    let payload = serde_json::to_vec(message).map_err(|e| IpcError::Encoding(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| IpcError::Encoding(format!("payload of {} bytes", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Like [`encode`], but refuses messages without a string `method`.
pub fn encode_request(message: &Message) -> Result<Vec<u8>, IpcError> {
    if message::method(message).is_none() {
        return Err(IpcError::Encoding("request has no method".into()));
    }
    encode(message)
}

/// Parse a frame payload.
pub fn decode(payload: &[u8]) -> Result<Message, IpcError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Read the payload length out of a frame header.
pub fn decode_header(header: &[u8]) -> Result<usize, IpcError> {
    let bytes: [u8; HEADER_LEN] = header
        .try_into()
        .map_err(|_| IpcError::Protocol(format!("frame header of {} bytes", header.len())))?;
    let len = u32::from_le_bytes(bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(IpcError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(len)
}
