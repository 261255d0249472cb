//! Translates Hyprland window and monitor events into snapdock
//! [`Command`]s.
//!
//! Hyprland broadcasts events on its event socket (`socket2`) at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`, one
//! `EVENT>>DATA` line each.  The ones snapdock cares about:
//!
//! | Event              | Payload                         | Command           |
//! |--------------------|---------------------------------|-------------------|
//! | `openwindow`       | `ADDR,WORKSPACE,CLASS,TITLE`    | `Register`        |
//! | `closewindow`      | `ADDR`                          | `Deregister`      |
//! | `monitoradded(v2)` | `NAME` / `ID,NAME,DESCRIPTION`  | `MonitorsChanged` |
//! | `monitorremoved`   | `NAME`                          | `MonitorsChanged` |
//!
//! Event addresses lack the `0x` prefix used by `j/clients`; it is added so
//! that window ids match across both sockets.  Bounds and monitor geometry
//! are not part of the events and are queried from the command socket.

use super::host::{client, clients, monitors, socket_path};
use crate::command::Command;
use crate::entity::WindowId;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;

/// A parsed event of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HyprEvent {
    Opened(WindowId),
    Closed(WindowId),
    MonitorsChanged,
}

/// Parse a single event line from socket2.
///
/// Lines have the form `EVENT>>DATA`.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(">>")
}

fn window_id(address: &str) -> WindowId {
    let address = address.trim();
    if address.starts_with("0x") {
        WindowId(address.to_string())
    } else {
        WindowId(format!("0x{}", address))
    }
}

fn parse_event(event: &str, data: &str) -> Option<HyprEvent> {
    match event {
        "openwindow" => {
            let address = data.split(',').next().filter(|a| !a.is_empty())?;
            Some(HyprEvent::Opened(window_id(address)))
        }
        "closewindow" if !data.is_empty() => Some(HyprEvent::Closed(window_id(data))),
        "monitoradded" | "monitoraddedv2" | "monitorremoved" => Some(HyprEvent::MonitorsChanged),
        _ => None,
    }
}

/// A [`CommandSource`] that follows Hyprland's event socket.
///
/// On start every existing client is registered, so that the engine knows
/// about windows opened before the daemon.
#[derive(Default)]
pub struct HyprlandEventSource;

/// Error from the Hyprland event source.
#[derive(Debug, thiserror::Error)]
#[error("hyprland event error: {0}")]
pub struct HyprlandEventError(String);

impl HyprlandEventSource {
    pub fn new() -> Self {
        Self
    }

    /// Resolve an event to a command, querying Hyprland where the event
    /// does not carry enough data.
    fn resolve(&self, event: HyprEvent) -> Result<Option<Command>, HyprlandEventError> {
        match event {
            HyprEvent::Opened(window) => {
                let found = client(&window).map_err(|e| HyprlandEventError(e.to_string()))?;
                match found {
                    Some(c) => Ok(Some(Command::Register(c.into_spec()))),
                    None => {
                        debug!("{} vanished before it could be registered", window);
                        Ok(None)
                    }
                }
            }
            HyprEvent::Closed(window) => Ok(Some(Command::Deregister { window })),
            HyprEvent::MonitorsChanged => {
                let monitors = monitors().map_err(|e| HyprlandEventError(e.to_string()))?;
                Ok(Some(Command::MonitorsChanged { monitors }))
            }
        }
    }
}

impl CommandSource for HyprlandEventSource {
    type Error = HyprlandEventError;

    /// Register the existing clients, then connect to Hyprland's event
    /// socket and follow it.
    ///
    /// This method **blocks** forever (until the socket is closed or an
    /// error occurs).  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let existing = clients().map_err(|e| HyprlandEventError(e.to_string()))?;
        info!("registering {} existing client(s)", existing.len());
        for c in existing {
            if sink.send(Command::Register(c.into_spec())).is_err() {
                return Ok(());
            }
        }

        let path = socket_path(".socket2.sock").map_err(|e| HyprlandEventError(e.to_string()))?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandEventError(format!("connect to {}: {}", path.display(), e)))?;
        info!("event source connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            let line = line.map_err(|e| {
                error!("socket2 read error: {}", e);
                HyprlandEventError(format!("read error: {}", e))
            })?;
            let Some(event) = parse_event_line(&line).and_then(|(e, d)| parse_event(e, d)) else {
                continue;
            };
            match self.resolve(event) {
                Ok(Some(cmd)) => {
                    if sink.send(cmd).is_err() {
                        info!("sink closed, shutting down");
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_lines_split_on_marker() {
        assert_eq!(
            parse_event_line("openwindow>>5d1c,1,kitty,a>>b"),
            Some(("openwindow", "5d1c,1,kitty,a>>b"))
        );
        assert_eq!(parse_event_line("garbage"), None);
    }

    #[test]
    fn open_and_close_carry_prefixed_address() {
        assert_eq!(
            parse_event("openwindow", "5d1c,1,kitty,title, with commas"),
            Some(HyprEvent::Opened("0x5d1c".into()))
        );
        assert_eq!(
            parse_event("closewindow", "5d1c"),
            Some(HyprEvent::Closed("0x5d1c".into()))
        );
        assert_eq!(
            parse_event("closewindow", "0x5d1c"),
            Some(HyprEvent::Closed("0x5d1c".into()))
        );
    }

    #[test]
    fn monitor_events_trigger_refresh() {
        for event in ["monitoradded", "monitoraddedv2", "monitorremoved"] {
            assert_eq!(
                parse_event(event, "1,DP-2,Dell"),
                Some(HyprEvent::MonitorsChanged)
            );
        }
    }

    #[test]
    fn other_events_are_ignored() {
        assert_eq!(parse_event("activewindow", "kitty,shell"), None);
        assert_eq!(parse_event("openwindow", ""), None);
        assert_eq!(parse_event("closewindow", ""), None);
    }
}
