//! **wfmenu**: mirror the focused application's menu from the compositor.
//!
//! Gtk applications export their menus over DBus.  The compositor knows
//! which view owns which menu and pushes that over its IPC socket, together
//! with focus changes.  wfmenu listens to that stream and keeps track of the
//! menu belonging to whatever is focused, so a separate window can show it.
//!
//! # Architecture
//!
//! * [`ipc`]: the socket client: framing, transport, socket discovery and
//!   the [`Session`](ipc::session::Session) that matches call replies and
//!   queues pushed events.
//! * [`traits::Transport`]: abstracts the byte stream under the session so
//!   the protocol logic is not tied to a real socket.
//! * [`menu`]: folds the event stream into per-view menu state.
//!
//! Drawing the menu and binding it on DBus is left to the GUI that embeds
//! this crate; it pulls events with
//! [`next_event`](ipc::session::Session::next_event) or
//! [`try_next_event`](ipc::session::Session::try_next_event) whenever the
//! socket is readable.

pub mod config;
pub mod ipc;
pub mod menu;
pub mod traits;
