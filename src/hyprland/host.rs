//! [`HostSurface`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! avoiding any shell command invocation or third-party crate for socket
//! discovery.
//!
//! Minimized windows and inactive tabs are parked on a special workspace
//! and brought back to the workspace they came from.

use crate::command::WindowSpec;
use crate::entity::{WindowId, WindowState};
use crate::geometry::Rect;
use crate::monitor::Monitor;
use crate::traits::HostSurface;
use log::debug;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Special workspace holding hidden windows.
const PARKING: &str = "special:snapdock";

/// Hyprland-backed host.
///
/// All communication happens over Hyprland's IPC socket.  No child
/// processes are spawned.
#[derive(Default)]
pub struct HyprlandHost {
    /// Workspace each parked window came from.
    parked: RefCell<HashMap<WindowId, i64>>,
}

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandHostError(String);

impl HyprlandHost {
    /// Create a new handle.
    ///
    /// No connection is opened eagerly; each method call opens a short-lived
    /// IPC request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mapped client, as registration specs.
    pub fn windows(&self) -> Result<Vec<WindowSpec>, HyprlandHostError> {
        Ok(clients()?.into_iter().map(ClientJson::into_spec).collect())
    }

    /// Move `window` back from the parking workspace, if it is there.
    fn unpark(&self, window: &WindowId) -> Result<(), HyprlandHostError> {
        let Some(client) = client(window)? else {
            return Ok(());
        };
        if client.workspace.name != PARKING {
            return Ok(());
        }
        let workspace = match self.parked.borrow_mut().remove(window) {
            Some(id) => id,
            None => active_workspace()?,
        };
        ipc_dispatch(&format!(
            "movetoworkspacesilent {},address:{}",
            workspace, window
        ))
    }

    fn park(&self, window: &WindowId) -> Result<(), HyprlandHostError> {
        let Some(client) = client(window)? else {
            return Ok(());
        };
        if client.workspace.name == PARKING {
            return Ok(());
        }
        self.parked
            .borrow_mut()
            .insert(window.clone(), client.workspace.id);
        ipc_dispatch(&format!(
            "movetoworkspacesilent {},address:{}",
            PARKING, window
        ))
    }
}

//  Direct Hyprland IPC helpers

/// Resolve a Hyprland socket path.
///
/// Hyprland ≥ 0.40 stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/<name>`.
pub(crate) fn socket_path(name: &str) -> Result<PathBuf, HyprlandHostError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandHostError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandHostError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(runtime_dir).join("hypr").join(his).join(name))
}

/// Send a raw command to the Hyprland command socket and return the
/// response as a string.
fn ipc_request(command: &str) -> Result<String, HyprlandHostError> {
    let path = socket_path(".socket.sock")?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandHostError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandHostError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandHostError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandHostError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and parse the response.
fn ipc_json<T: for<'de> Deserialize<'de>>(data_command: &str) -> Result<T, HyprlandHostError> {
    let json = ipc_request(&format!("j/{}", data_command))?;
    serde_json::from_str(&json).map_err(|e| HyprlandHostError(format!("parse: {}", e)))
}

/// Send a dispatch command and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandHostError> {
    debug!("dispatch {}", args);
    let response = ipc_request(&format!("/dispatch {}", args))?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandHostError(format!("dispatch error: {}", response)))
    }
}

pub(crate) fn clients() -> Result<Vec<ClientJson>, HyprlandHostError> {
    ipc_json("clients")
}

pub(crate) fn client(window: &WindowId) -> Result<Option<ClientJson>, HyprlandHostError> {
    Ok(clients()?.into_iter().find(|c| c.address == window.0))
}

pub(crate) fn monitors() -> Result<Vec<Monitor>, HyprlandHostError> {
    let monitors: Vec<MonitorJson> = ipc_json("monitors")?;
    Ok(monitors.into_iter().map(MonitorJson::into_monitor).collect())
}

fn active_workspace() -> Result<i64, HyprlandHostError> {
    let ws: WorkspaceJson = ipc_json("activeworkspace")?;
    Ok(ws.id)
}

//  Minimal serde structs for the JSON we care about

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceJson {
    id: i64,
    #[serde(default)]
    name: String,
}

/// Subset of the JSON object returned by `j/clients`.
#[derive(Debug, Deserialize)]
pub(crate) struct ClientJson {
    address: String,
    at: [i32; 2],
    size: [i32; 2],
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
    workspace: WorkspaceJson,
    /// A bool on older releases, a mode number on newer ones.
    #[serde(default)]
    fullscreen: serde_json::Value,
}

impl ClientJson {
    fn bounds(&self) -> Rect {
        Rect::new(self.at[0], self.at[1], self.size[0], self.size[1])
    }

    fn is_fullscreen(&self) -> bool {
        match &self.fullscreen {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        }
    }

    pub(crate) fn into_spec(self) -> WindowSpec {
        let state = if self.workspace.name == PARKING {
            WindowState::Minimized
        } else if self.is_fullscreen() {
            WindowState::Maximized
        } else {
            WindowState::Normal
        };
        let bounds = self.bounds();
        WindowSpec {
            state,
            application: self.class,
            title: self.title,
            ..WindowSpec::new(self.address, bounds)
        }
    }
}

/// Subset of the JSON object returned by `j/monitors`.
#[derive(Debug, Deserialize)]
struct MonitorJson {
    name: String,
    width: i32,
    height: i32,
    x: i32,
    y: i32,
    #[serde(default = "unit_scale")]
    scale: f64,
    /// Odd transforms rotate the output by 90°.
    #[serde(default)]
    transform: i64,
    /// Space taken by bars: `[left, top, right, bottom]`.
    #[serde(default)]
    reserved: [i32; 4],
}

fn unit_scale() -> f64 {
    1.0
}

impl MonitorJson {
    /// Convert to layout coordinates: logical size, work area minus the
    /// reserved space.
    fn into_monitor(self) -> Monitor {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let (mut width, mut height) = (
            (f64::from(self.width) / scale).round() as i32,
            (f64::from(self.height) / scale).round() as i32,
        );
        if self.transform % 2 == 1 {
            std::mem::swap(&mut width, &mut height);
        }
        let bounds = Rect::new(self.x, self.y, width, height);
        let [left, top, right, bottom] = self.reserved;
        let work_area = Rect::new(
            bounds.x + left,
            bounds.y + top,
            (bounds.width - left - right).max(1),
            (bounds.height - top - bottom).max(1),
        );
        Monitor {
            name: self.name,
            bounds,
            work_area,
        }
    }
}

/// Dispatch arguments placing `window` at `bounds`.
fn placement_dispatches(window: &WindowId, bounds: Rect) -> [String; 2] {
    [
        format!(
            "movewindowpixel exact {} {},address:{}",
            bounds.x, bounds.y, window
        ),
        format!(
            "resizewindowpixel exact {} {},address:{}",
            bounds.width, bounds.height, window
        ),
    ]
}

//  HostSurface implementation

impl HostSurface for HyprlandHost {
    type Error = HyprlandHostError;

    fn monitors(&self) -> Result<Vec<Monitor>, Self::Error> {
        monitors()
    }

    fn bounds(&self, window: &WindowId) -> Result<Option<Rect>, Self::Error> {
        Ok(client(window)?.map(|c| c.bounds()))
    }

    fn set_bounds(&self, window: &WindowId, bounds: Rect) -> Result<(), Self::Error> {
        for args in placement_dispatches(window, bounds) {
            ipc_dispatch(&args)?;
        }
        Ok(())
    }

    fn set_state(&self, window: &WindowId, state: WindowState) -> Result<(), Self::Error> {
        let fullscreen = client(window)?.is_some_and(|c| c.is_fullscreen());
        match state {
            WindowState::Minimized => self.park(window),
            WindowState::Maximized => {
                self.unpark(window)?;
                if fullscreen {
                    return Ok(());
                }
                ipc_dispatch(&format!("focuswindow address:{}", window))?;
                ipc_dispatch("fullscreen 1")
            }
            WindowState::Normal => {
                self.unpark(window)?;
                if !fullscreen {
                    return Ok(());
                }
                ipc_dispatch(&format!("focuswindow address:{}", window))?;
                ipc_dispatch("fullscreen 1")
            }
        }
    }

    fn set_visible(&self, window: &WindowId, visible: bool) -> Result<(), Self::Error> {
        if visible {
            self.unpark(window)
        } else {
            self.park(window)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_json_becomes_spec() {
        let json = r#"[{
            "address": "0x5d1c",
            "at": [10, 40],
            "size": [800, 600],
            "class": "kitty",
            "title": "shell",
            "workspace": {"id": 1, "name": "1"},
            "fullscreen": 0,
            "floating": true
        }]"#;
        let clients: Vec<ClientJson> = serde_json::from_str(json).unwrap();
        let spec = clients.into_iter().next().unwrap().into_spec();
        assert_eq!(spec.id, WindowId::from("0x5d1c"));
        assert_eq!(spec.bounds, Rect::new(10, 40, 800, 600));
        assert_eq!(spec.application, "kitty");
        assert_eq!(spec.title, "shell");
        assert_eq!(spec.state, WindowState::Normal);
    }

    #[test]
    fn fullscreen_and_parked_clients_map_to_states() {
        let full: ClientJson = serde_json::from_str(
            r#"{"address":"a","at":[0,0],"size":[1,1],"workspace":{"id":1,"name":"1"},"fullscreen":true}"#,
        )
        .unwrap();
        assert_eq!(full.into_spec().state, WindowState::Maximized);
        let parked: ClientJson = serde_json::from_str(
            r#"{"address":"a","at":[0,0],"size":[1,1],"workspace":{"id":-98,"name":"special:snapdock"},"fullscreen":1}"#,
        )
        .unwrap();
        assert_eq!(parked.into_spec().state, WindowState::Minimized);
    }

    #[test]
    fn monitor_work_area_excludes_reserved_space() {
        let m: MonitorJson = serde_json::from_str(
            r#"{"name":"DP-1","width":2560,"height":1440,"x":0,"y":0,"scale":1.0,"transform":0,"reserved":[0,30,0,0]}"#,
        )
        .unwrap();
        let m = m.into_monitor();
        assert_eq!(m.bounds, Rect::new(0, 0, 2560, 1440));
        assert_eq!(m.work_area, Rect::new(0, 30, 2560, 1410));
    }

    #[test]
    fn monitor_size_is_logical() {
        let m: MonitorJson = serde_json::from_str(
            r#"{"name":"eDP-1","width":2880,"height":1800,"x":2560,"y":0,"scale":2.0,"transform":1}"#,
        )
        .unwrap();
        let m = m.into_monitor();
        assert_eq!(m.bounds, Rect::new(2560, 0, 900, 1440));
        assert_eq!(m.work_area, m.bounds);
    }

    #[test]
    fn placement_uses_exact_pixels() {
        let [mv, rs] = placement_dispatches(&"0xab".into(), Rect::new(-5, 20, 300, 200));
        assert_eq!(mv, "movewindowpixel exact -5 20,address:0xab");
        assert_eq!(rs, "resizewindowpixel exact 300 200,address:0xab");
    }

    #[test]
    fn socket_path_uses_instance_directory() {
        if std::env::var("XDG_RUNTIME_DIR").is_err()
            || std::env::var("HYPRLAND_INSTANCE_SIGNATURE").is_err()
        {
            assert!(socket_path(".socket.sock").is_err());
            return;
        }
        let path = socket_path(".socket.sock").unwrap();
        assert!(path.ends_with(".socket.sock"));
    }
}
