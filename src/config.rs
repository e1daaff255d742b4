//! Configuration loaded from `$XDG_CONFIG_HOME/wfmenu/config.json`.
//!
//! ```json
//! {
//!   "socket": "/tmp/wayfire-wayland-1.socket",
//!   "discovery": {
//!     "enabled": true,
//!     "directory": "/tmp",
//!     "name_fragment": "wayfire-wayland"
//!   },
//!   "events": ["view-focused", "view-gtk-dbus-properties-changed"],
//!   "watch_method": "window-rules/events/watch",
//!   "self_app_id": "wfmenu"
//! }
//! ```

use crate::ipc::discovery::DiscoveryOptions;
use crate::ipc::endpoint::Endpoint;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Where wfmenu looks for its config file.
///
/// `$XDG_CONFIG_HOME/wfmenu/config.json`, or `$HOME/.config/...` when the
/// XDG variable is unset or empty.
pub fn default_path() -> PathBuf {
    config_path(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn config_path(xdg_config_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    let base = match xdg_config_home.filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(home.unwrap_or_else(|| "/tmp".into())).join(".config"),
    };
    base.join("wfmenu").join("config.json")
}

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit socket path.  The `WAYFIRE_SOCKET` environment variable
    /// takes precedence over it.
    pub socket: Option<PathBuf>,

    /// Fallback search used when no socket is configured.
    pub discovery: DiscoveryOptions,

    /// Events to subscribe to.  `None` subscribes to everything.
    pub events: Option<Vec<String>>,

    /// Subscription method, for compositors that register it under a
    /// plugin namespace.
    pub watch_method: Option<String>,

    /// App-id of the mirror window, so its own focus is ignored.
    pub self_app_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: None,
            discovery: DiscoveryOptions::default(),
            events: None,
            watch_method: None,
            self_app_id: "wfmenu".into(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Load `path`, or fall back to the defaults.
    ///
    /// A missing file is normal; a file that exists but does not parse is
    /// reported, since the user clearly meant to configure something.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => {
                debug!("loaded config from {}", path.display());
                cfg
            }
            Err(e) if path.exists() => {
                warn!("{}; using defaults", e);
                Self::default()
            }
            Err(_) => {
                debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The configured socket as an [`Endpoint`].
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.socket.clone().map(Endpoint::from)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "socket": "/run/wf.sock",
            "discovery": {
                "enabled": false,
                "directory": "/run/user/1000",
                "name_fragment": "wf-ipc"
            },
            "events": ["view-focused"],
            "watch_method": "window-rules/events/watch",
            "self_app_id": "menu-mirror"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.endpoint(), Some(Endpoint::new("/run/wf.sock")));
        assert!(!cfg.discovery.enabled);
        assert_eq!(cfg.discovery.directory, PathBuf::from("/run/user/1000"));
        assert_eq!(cfg.discovery.name_fragment, "wf-ipc");
        assert_eq!(cfg.events, Some(vec!["view-focused".to_string()]));
        assert_eq!(cfg.watch_method.as_deref(), Some("window-rules/events/watch"));
        assert_eq!(cfg.self_app_id, "menu-mirror");
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        let dd = DiscoveryOptions::default();
        assert_eq!(cfg.endpoint(), None);
        assert!(cfg.discovery.enabled);
        assert_eq!(cfg.discovery.directory, dd.directory);
        assert_eq!(cfg.discovery.name_fragment, "wayfire-wayland");
        assert_eq!(cfg.events, None);
        assert_eq!(cfg.watch_method, None);
        assert_eq!(cfg.self_app_id, "wfmenu");
    }

    #[test]
    fn deserialize_partial_discovery() {
        let json = r#"{ "discovery": { "directory": "/var/tmp" } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.discovery.directory, PathBuf::from("/var/tmp"));
        assert!(cfg.discovery.enabled);
        assert_eq!(cfg.discovery.name_fragment, "wayfire-wayland");
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "events": null, "future_section": { "key": 42 } }"#;
        let _cfg: Config = serde_json::from_str(json).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "wfmenu-config-test-{}-missing.json",
            std::process::id()
        ));
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("config error: failed to read"));
    }

    #[test]
    fn config_path_prefers_xdg() {
        let path = config_path(Some("/xdg".into()), Some("/home/u".into()));
        assert_eq!(path, PathBuf::from("/xdg/wfmenu/config.json"));
    }

    #[test]
    fn config_path_falls_back_to_home() {
        let path = config_path(Some("".into()), Some("/home/u".into()));
        assert_eq!(path, PathBuf::from("/home/u/.config/wfmenu/config.json"));
        let path = config_path(None, None);
        assert_eq!(path, PathBuf::from("/tmp/.config/wfmenu/config.json"));
    }

    #[test]
    fn load_or_default_tolerates_missing_and_broken_files() {
        let path = std::env::temp_dir().join(format!(
            "wfmenu-config-test-{}-fallback.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        assert_eq!(Config::load_or_default(&path).self_app_id, "wfmenu");

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_or_default(&path).self_app_id, "wfmenu");

        std::fs::write(&path, r#"{ "self_app_id": "mirror" }"#).unwrap();
        assert_eq!(Config::load_or_default(&path).self_app_id, "mirror");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!(
            "wfmenu-config-test-{}-load.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "self_app_id": "mirror" }"#).unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.self_app_id, "mirror");
        let _ = std::fs::remove_file(&path);
    }
}
