//! Location of the compositor's IPC socket.

use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable the compositor exports with its socket path.
pub const SOCKET_ENV: &str = "WAYFIRE_SOCKET";

/// Path of a Unix domain socket.  Resolved once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(PathBuf);

impl Endpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The endpoint named by [`SOCKET_ENV`], if it is set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(SOCKET_ENV)
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for Endpoint {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}
