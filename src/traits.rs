//! Core traits that decouple snapdock from any specific compositor or
//! transport mechanism.
//!
//! Every concrete backend (Hyprland, a Unix-socket listener, a test harness,
//! …) implements one of these traits.  The [`DockEngine`](crate::engine::DockEngine)
//! only depends on these abstractions.

use crate::command::Command;
use crate::entity::{WindowId, WindowState};
use crate::geometry::Rect;
use crate::monitor::Monitor;
use std::sync::mpsc;

/// Abstraction over the host that actually places windows on screen.
///
/// The engine never assumes a request took effect: the host reports back
/// through [`Command::BoundsChanged`] and friends.
pub trait HostSurface {
    /// The error type produced by this host.
    type Error: std::error::Error + Send + 'static;

    /// Return the monitors the host knows about, with their work areas.
    fn monitors(&self) -> Result<Vec<Monitor>, Self::Error>;

    /// Current bounds of `window`, or `None` when the host no longer knows
    /// the window.
    fn bounds(&self, window: &WindowId) -> Result<Option<Rect>, Self::Error>;

    fn set_bounds(&self, window: &WindowId, bounds: Rect) -> Result<(), Self::Error>;

    fn set_state(&self, window: &WindowId, state: WindowState) -> Result<(), Self::Error>;

    /// Show or hide a window without changing its state (inactive tabs).
    fn set_visible(&self, window: &WindowId, visible: bool) -> Result<(), Self::Error>;
}

//  Preview

/// What a preview highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Where the dragged entity would snap.
    Snap,
    /// The tabstrip the dragged window would join.
    Tab,
}

/// Events sent from the [`DockEngine`](crate::engine::DockEngine) to a
/// preview renderer over an [`mpsc`](std::sync::mpsc) channel.
///
/// The engine holds an `Option<mpsc::Sender<PreviewEvent>>`; the receiver is
/// free to draw an overlay, log, or ignore the events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewEvent {
    /// Show (or move) the preview.  An invalid preview is still shown so
    /// the user sees why the drop will not happen.
    Show {
        kind: PreviewKind,
        bounds: Rect,
        valid: bool,
    },
    Hide,
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, the Hyprland
/// event stream, an in-memory channel) and forward parsed commands into
/// the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
