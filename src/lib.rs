//! **snapdock**: window snapping, docking and tabbing.
//!
//! Windows dragged close to each other snap edge to edge and dock into a
//! *snap group* that moves and resizes as one.  Windows can also be merged
//! into *tab groups* that share a single frame.  The layout model keeps
//! every group contiguous and on screen as monitors come and go.
//!
//! # Architecture
//!
//! [`layout::Layout`] owns all entities, snap groups and tab groups.  Its
//! operations are spread over [`group`] (dock, undock, explode), [`resize`]
//! (constraint propagation), [`snap`] (candidate detection), [`tabs`] and
//! [`monitor`].  Mutations never talk to the compositor directly; they queue
//! [`layout::HostRequest`]s.
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::HostSurface`]: abstracts window placement so the layout
//!   logic is not coupled to any specific compositor.
//! * [`traits::CommandSource`]: abstracts the transport that delivers
//!   commands (a Unix socket, the compositor's event stream, …) so the main
//!   loop is not coupled to any specific IPC mechanism.
//!
//! [`engine::DockEngine`] ties them together.  Concrete implementations live
//! in [`hyprland`] (Hyprland IPC) and [`ipc`] (Unix-socket command listener).

pub mod command;
pub mod config;
pub mod engine;
pub mod entity;
pub mod geometry;
pub mod group;
pub mod hyprland;
pub mod ipc;
pub mod layout;
pub mod monitor;
pub mod resize;
pub mod snap;
pub mod tabs;
pub mod traits;
