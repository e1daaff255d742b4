//! Fallback search for a compositor socket when none is configured.
//!
//! The compositor creates its socket in a shared directory (usually `/tmp`)
//! under a name containing a fixed fragment (`wayfire-wayland`).  Several
//! may exist at once, some of them stale.  Candidates are sorted by name and
//! the *last* one is taken to be the newest.
//!
//! The sort is plain lexicographic: `a-10` sorts before `a-2`.  That only
//! picks the newest socket when the naming scheme is lexicographically
//! monotonic, which is what the compositor is assumed to guarantee.

use super::endpoint::Endpoint;
use super::error::IpcError;
use super::transport::UnixTransport;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where and how to look for candidate sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Whether to search at all when no endpoint is configured.  Default: `true`.
    pub enabled: bool,
    /// Directory to scan.  Default: `/tmp`.
    pub directory: PathBuf,
    /// Substring a candidate's file name must contain.  Default: `wayfire-wayland`.
    pub name_fragment: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("/tmp"),
            name_fragment: "wayfire-wayland".into(),
        }
    }
}

/// List entries of `directory` whose name contains `name_fragment`, sorted
/// ascending by name.
pub fn discover_candidates(directory: &Path, name_fragment: &str) -> Result<Vec<PathBuf>, IpcError> {
    let entries = std::fs::read_dir(directory).map_err(|e| {
        IpcError::Discovery(format!("cannot list {}: {}", directory.display(), e))
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.contains(name_fragment))
        .collect();
    names.sort();

    Ok(names.into_iter().map(|name| directory.join(name)).collect())
}

/// Connect to the newest candidate that accepts a connection.
pub fn try_connect_in_order(candidates: &[PathBuf]) -> Result<UnixTransport, IpcError> {
    try_connect_with(candidates, UnixTransport::connect)
}

/// Walk `candidates` from the end, returning the first successful `connect`.
///
/// Failures are skipped.  Fails with [`IpcError::Discovery`] when the list is
/// empty or nothing connects.
pub fn try_connect_with<T, F>(candidates: &[PathBuf], mut connect: F) -> Result<T, IpcError>
where
    F: FnMut(&Endpoint) -> Result<T, IpcError>,
{
    if candidates.is_empty() {
        return Err(IpcError::Discovery("no candidate sockets found".into()));
    }

    for path in candidates.iter().rev() {
        let endpoint = Endpoint::new(path);
        match connect(&endpoint) {
            Ok(conn) => {
                info!("discovered compositor socket at {}", endpoint);
                return Ok(conn);
            }
            Err(e) => debug!("skipping candidate {}: {}", endpoint, e),
        }
    }

    Err(IpcError::Discovery(format!(
        "none of {} candidate sockets accepted a connection",
        candidates.len()
    )))
}

/// Scan per `options` and connect to the newest live socket.
pub fn discover(options: &DiscoveryOptions) -> Result<UnixTransport, IpcError> {
    let candidates = discover_candidates(&options.directory, &options.name_fragment)?;
    debug!(
        "{} candidate(s) matching {:?} in {}",
        candidates.len(),
        options.name_fragment,
        options.directory.display()
    );
    try_connect_in_order(&candidates)
}
