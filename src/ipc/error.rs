//! Errors produced by the IPC client.

use std::path::PathBuf;

/// The error text the compositor sends when a method is not registered.
pub const METHOD_NOT_FOUND: &str = "No such method found!";

/// Everything that can go wrong between the caller and the compositor.
///
/// None of these are retried internally; they all surface to the immediate
/// caller.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// The socket could not be opened, or the peer went away.
    #[error("connection to {}: {reason}", .endpoint.display())]
    Connection { endpoint: PathBuf, reason: String },

    /// No endpoint was configured and no candidate socket accepted a
    /// connection.
    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("cannot encode message: {0}")]
    Encoding(String),

    #[error("cannot decode message: {0}")]
    Decoding(#[from] serde_json::Error),

    /// A frame header announced a payload larger than
    /// [`MAX_FRAME_LEN`](crate::ipc::codec::MAX_FRAME_LEN).
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// Caller misuse, detected before any I/O.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The compositor reported a failure for a call.
    #[error("{}", remote_text(.method, .message))]
    Remote {
        message: String,
        method: Option<String>,
    },

    /// The compositor does not know the requested method.
    #[error(
        "method {method} is not available. Please ensure that the '{plugin}' plugin is enabled, \
         then restart the compositor so that ipc picks it up"
    )]
    UnsupportedMethod { method: String, plugin: String },

    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
}

fn remote_text(method: &Option<String>, message: &str) -> String {
    match method {
        Some(method) => format!("{} failed: {}", method, message),
        None => message.to_string(),
    }
}

impl IpcError {
    /// `true` for errors the compositor reported, including
    /// [`UnsupportedMethod`](IpcError::UnsupportedMethod).
    pub fn is_remote(&self) -> bool {
        matches!(self, IpcError::Remote { .. } | IpcError::UnsupportedMethod { .. })
    }

    /// Build the error for an inbound `{"error": ...}` frame.
    ///
    /// `fallback_method` names the call in flight and is used when the frame
    /// itself carries no `method`.
    pub fn from_remote(message: &str, method: Option<&str>, fallback_method: Option<&str>) -> Self {
        let method = method.or(fallback_method);
        match method {
            Some(method) if message == METHOD_NOT_FOUND => IpcError::UnsupportedMethod {
                method: method.to_string(),
                plugin: plugin_for_method(method).to_string(),
            },
            _ => IpcError::Remote {
                message: message.to_string(),
                method: method.map(str::to_string),
            },
        }
    }
}

/// Name of the compositor plugin that registers `method`.
///
/// Methods are namespaced as `plugin/...`; a method with no namespace is
/// assumed to be provided by a plugin of the same name.
pub fn plugin_for_method(method: &str) -> &str {
    method.split('/').next().unwrap_or(method)
}
