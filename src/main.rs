//! Entry point for the **snapdock** daemon.
//!
//! Spawns all command sources on background threads and processes incoming
//! commands one at a time on the main thread.  Preview events are logged by
//! a dedicated thread.

use log::{debug, error, info};
use snapdock::command::Command;
use snapdock::config::Config;
use snapdock::engine::DockEngine;
use snapdock::hyprland::events::HyprlandEventSource;
use snapdock::hyprland::host::HyprlandHost;
use snapdock::ipc::listener::{default_socket_path, UnixSocketListener};
use snapdock::traits::{CommandSource, PreviewEvent};
use std::path::PathBuf;
use std::sync::mpsc;

/// Resolve the config directory (`$XDG_CONFIG_HOME/snapdock`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("snapdock")
}

/// Try to load the config from `$XDG_CONFIG_HOME/snapdock/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    let mut engine = DockEngine::new(HyprlandHost::new(), config);
    if let Err(e) = engine.sync_monitors() {
        error!("failed to query monitors: {}", e);
        std::process::exit(1);
    }
    info!("found {} monitor(s)", engine.layout().monitors().len());

    let (preview_tx, preview_rx) = mpsc::channel();
    engine.set_preview(preview_tx);
    spawn_preview_logger(preview_rx);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx);

    info!("snapdock running");
    for cmd in cmd_rx {
        if let Err(e) = engine.handle(cmd) {
            error!("command error: {}", e);
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_preview_logger(rx: mpsc::Receiver<PreviewEvent>) {
    std::thread::spawn(move || {
        for event in rx {
            debug!("preview: {:?}", event);
        }
    });
}

fn spawn_command_sources(tx: mpsc::Sender<Command>) {
    {
        let tx = tx.clone();
        let path = default_socket_path();
        std::thread::spawn(move || {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error: {}", e);
            }
        });
    }

    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            let mut source = HyprlandEventSource::new();
            if let Err(e) = source.run(tx) {
                error!("hyprland event source error: {}", e);
            }
        });
    }

    drop(tx);
}
