//! Entry point for the **wfmenu** watcher.
//!
//! Connects to the compositor, subscribes to events and follows focus
//! changes, logging the menu address a GUI would bind for each focused view.
//! Runs until the compositor closes the connection.

use log::{error, info};
use wfmenu::config::Config;
use wfmenu::ipc::endpoint::Endpoint;
use wfmenu::ipc::error::IpcError;
use wfmenu::ipc::message::{self, Message};
use wfmenu::ipc::session::Session;
use wfmenu::menu::{FocusChange, MenuTracker};

fn main() {
    env_logger::init();

    let path = wfmenu::config::default_path();
    let config = Config::load_or_default(&path);
    if let Err(e) = run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), IpcError> {
    // The environment names the running compositor, so it beats the file.
    let explicit = Endpoint::from_env().or_else(|| config.endpoint());
    let mut session = Session::open(explicit, Some(&config.discovery))?;
    info!("connected to {}", session.endpoint());

    let events = config.events.as_deref();
    match &config.watch_method {
        Some(method) => session.watch_with(method, events)?,
        None => session.watch(events)?,
    };

    let mut tracker = MenuTracker::new(config.self_app_id.clone());
    while let Some(event) = session.next_event()? {
        log_event(&event);
        if let Some(change) = tracker.handle(&event) {
            log_focus(&change);
        }
    }

    info!("compositor closed the connection");
    Ok(())
}

fn log_event(event: &Message) {
    let name = message::event_name(event).unwrap_or("<no event>");
    match event.get("view").filter(|v| !v.is_null()) {
        Some(view) => info!(
            "{:<25}: {} - {}",
            name,
            view.get("app-id").and_then(|v| v.as_str()).unwrap_or("?"),
            view.get("id").map(|v| v.to_string()).unwrap_or_default()
        ),
        None => info!("{:<25}", name),
    }
}

fn log_focus(change: &FocusChange) {
    let app = change.app_id.as_deref().unwrap_or("");
    match &change.menu {
        Some(menu) => info!(
            "focused view {} ({}): menu {} at {} (app {}, window {})",
            change.view_id,
            app,
            menu.unique_bus_name,
            menu.menubar_path,
            menu.application_object_path,
            menu.window_object_path
        ),
        None => info!("focused view {} ({}): no menu", change.view_id, app),
    }
}
