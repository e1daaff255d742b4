//! Tracks which view is focused and where its menu lives on DBus.
//!
//! Gtk applications export their menus over DBus, and the compositor relays
//! the addresses in `view-gtk-dbus-properties-changed` events.  The
//! [`MenuTracker`] remembers them per view and, whenever another view gains
//! focus, reports that view's menu so the GUI can bind it.
//!
//! The mirror window is a view too.  Focusing it must not replace the menu
//! being shown, so its own view id is recognised by app-id and ignored.

use crate::ipc::message::{self, Message};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// Id the compositor assigns to a view.
pub type ViewId = u64;

/// DBus coordinates of an application's menu.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuAddress {
    pub unique_bus_name: String,
    pub menubar_path: String,
    #[serde(default)]
    pub app_menu_path: String,
    pub window_object_path: String,
    pub application_object_path: String,
}

/// Reported when a view other than the mirror gains focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusChange {
    pub view_id: ViewId,
    /// App-id seen for the view, if any event reported one.
    pub app_id: Option<String>,
    /// Where to find the view's menu, if it exported one.
    pub menu: Option<MenuAddress>,
}

//  Minimal serde structs for the event fields we read

#[derive(Deserialize)]
struct ViewJson {
    id: ViewId,
    #[serde(rename = "app-id")]
    app_id: String,
}

#[derive(Deserialize)]
struct ViewEventJson {
    view: Option<ViewJson>,
}

#[derive(Deserialize)]
struct MenuEventJson {
    view: ViewJson,
    #[serde(flatten)]
    menu: MenuAddress,
}

/// Per-view state built from the compositor's event stream.
#[derive(Debug, Default)]
pub struct MenuTracker {
    self_app_id: String,
    self_id: Option<ViewId>,
    active: Option<ViewId>,
    app_ids: HashMap<ViewId, String>,
    menus: HashMap<ViewId, MenuAddress>,
}

impl MenuTracker {
    /// `self_app_id` is the app-id of the mirror window itself.
    pub fn new(self_app_id: impl Into<String>) -> Self {
        Self {
            self_app_id: self_app_id.into(),
            ..Self::default()
        }
    }

    /// The view whose menu is currently mirrored.
    pub fn active_view(&self) -> Option<ViewId> {
        self.active
    }

    /// The mirror's own view id, once seen.
    pub fn self_view(&self) -> Option<ViewId> {
        self.self_id
    }

    pub fn app_id(&self, view: ViewId) -> Option<&str> {
        self.app_ids.get(&view).map(String::as_str)
    }

    pub fn menu(&self, view: ViewId) -> Option<&MenuAddress> {
        self.menus.get(&view)
    }

    /// Feed one event.  Returns the new focus target when it changed.
    ///
    /// Messages that are not events, or whose payload does not have the
    /// expected shape, are skipped.
    pub fn handle(&mut self, event: &Message) -> Option<FocusChange> {
        let name = message::event_name(event)?;

        if let Some(view) = self.parse::<ViewEventJson>(name, event).and_then(|e| e.view) {
            if view.app_id == self.self_app_id {
                self.self_id = Some(view.id);
            }
            self.app_ids.insert(view.id, view.app_id);
        }

        match name {
            "view-gtk-dbus-properties-changed" => {
                let parsed = self.parse::<MenuEventJson>(name, event)?;
                debug!(
                    "view {} exports its menu at {} {}",
                    parsed.view.id, parsed.menu.unique_bus_name, parsed.menu.menubar_path
                );
                self.menus.insert(parsed.view.id, parsed.menu);
                None
            }
            "view-focused" => {
                let view = self.parse::<ViewEventJson>(name, event)?.view?;
                if Some(view.id) == self.self_id {
                    return None;
                }
                self.active = Some(view.id);
                Some(FocusChange {
                    view_id: view.id,
                    app_id: self.app_ids.get(&view.id).cloned(),
                    menu: self.menus.get(&view.id).cloned(),
                })
            }
            "view-unmapped" => {
                if let Some(view) = self.parse::<ViewEventJson>(name, event)?.view {
                    self.forget(view.id);
                }
                None
            }
            _ => None,
        }
    }

    /// Forget everything about a view.
    pub fn forget(&mut self, view: ViewId) {
        self.app_ids.remove(&view);
        self.menus.remove(&view);
        if self.active == Some(view) {
            self.active = None;
        }
    }

    fn parse<T: DeserializeOwned>(&self, name: &str, event: &Message) -> Option<T> {
        match T::deserialize(event) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                if event.get("view").is_some() {
                    warn!("skipping malformed {} event: {}", name, e);
                }
                None
            }
        }
    }
}
