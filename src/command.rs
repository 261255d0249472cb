//! Commands and wire types shared by every component.
//!
//! [`Command`] describes every operation the engine performs, whether it is
//! a host notification (window lifecycle, drags, monitor changes) or a
//! request from a remote client.
//!
//! Parsing is lenient where clients are likely to differ: sides accept any
//! case, pointer positions accept `{"x", "y"}` or `"x y"`, and tab indices
//! accept a number or a string.

use crate::entity::{Constraints, EntityId, Scope, TabGroupId, Window, WindowId, WindowState};
use crate::geometry::{Point, Rect, Side};
use crate::monitor::Monitor;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Wire format for a pointer position: `{"x": 10, "y": 20}` or `"10 20"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pointer(pub Point);

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Pointer;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "object {{x, y}} or string \"x y\"")
            }
            fn visit_map<A>(self, mut map: A) -> Result<Pointer, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut x = None;
                let mut y = None;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "x" => x = Some(map.next_value()?),
                        "y" => y = Some(map.next_value()?),
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(Pointer(Point::new(
                    x.ok_or_else(|| DeError::missing_field("x"))?,
                    y.ok_or_else(|| DeError::missing_field("y"))?,
                )))
            }
            fn visit_str<E>(self, s: &str) -> Result<Pointer, E>
            where
                E: DeError,
            {
                let parts: Vec<&str> = s.split_whitespace().collect();
                if parts.len() != 2 {
                    return Err(DeError::custom(format!(
                        "pointer: expected \"x y\", got {:?}",
                        s
                    )));
                }
                let x: i32 = parts[0]
                    .parse()
                    .map_err(|_| DeError::custom("pointer: x must be an integer"))?;
                let y: i32 = parts[1]
                    .parse()
                    .map_err(|_| DeError::custom("pointer: y must be an integer"))?;
                Ok(Pointer(Point::new(x, y)))
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Wire format for a tab index: accepts number or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TabIndex(pub usize);

impl<'de> Deserialize<'de> for TabIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = TabIndex;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "non-negative integer or string")
            }
            fn visit_u64<E>(self, n: u64) -> Result<TabIndex, E> {
                Ok(TabIndex(n as usize))
            }
            fn visit_str<E>(self, s: &str) -> Result<TabIndex, E>
            where
                E: DeError,
            {
                let n: usize = s
                    .trim()
                    .parse()
                    .map_err(|_| DeError::custom("SwitchTab: expected non-negative integer"))?;
                Ok(TabIndex(n))
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Everything the host knows about a newly mapped window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub id: WindowId,
    pub bounds: Rect,
    /// Owning application, used to resolve feature rules.
    #[serde(default)]
    pub application: String,
    /// Window name within the application.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub state: WindowState,
}

impl WindowSpec {
    pub fn new(id: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: WindowId(id.into()),
            bounds,
            application: String::new(),
            title: String::new(),
            constraints: Constraints::default(),
            state: WindowState::Normal,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope {
            application: self.application.clone(),
            window: self.title.clone(),
        }
    }

    /// Build the model window.  Features are resolved by the caller.
    pub fn into_window(self) -> Window {
        let scope = self.scope();
        let mut window = Window::new(self.id, self.bounds);
        window.scope = scope;
        window.constraints = self.constraints;
        window.state = self.state;
        if self.state != WindowState::Normal {
            window.restore_bounds = Some(self.bounds);
        }
        window
    }
}

/// Every operation the dock engine performs.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by the
/// [`DockEngine`](crate::engine::DockEngine), one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    //  Host notifications
    /// A window appeared.
    Register(WindowSpec),

    /// A window closed.
    Deregister { window: WindowId },

    /// The host reports new bounds for a window.  Echoes of the model's own
    /// bounds are ignored.
    BoundsChanged { window: WindowId, bounds: Rect },

    /// The host changed a window's state (e.g. the user minimized it).
    StateChanged { window: WindowId, state: WindowState },

    /// The set of monitors changed.
    MonitorsChanged { monitors: Vec<Monitor> },

    /// The user is dragging `window` to `bounds`.
    DragUpdate {
        window: WindowId,
        bounds: Rect,
        #[serde(default)]
        pointer: Option<Pointer>,
    },

    /// The drag ended; apply the pending snap or tab drop.
    DragEnd { window: WindowId },

    /// The drag was aborted; discard the pending candidate.
    DragCancel { window: WindowId },

    //  Layout operations
    /// Resize an entity, propagating through its snap group.
    Resize { entity: EntityId, bounds: Rect },

    /// Translate an entity together with its snap group.
    Move { entity: EntityId, dx: i32, dy: i32 },

    /// Dock `entity` so that its `side` touches `target`.
    Dock {
        entity: EntityId,
        target: EntityId,
        side: Side,
    },

    Undock { entity: EntityId },

    /// Dissolve the snap group containing `entity`.
    Explode { entity: EntityId },

    //  Tabs
    CreateTabGroup { windows: Vec<WindowId> },

    AddTab { group: TabGroupId, window: WindowId },

    /// Tear a tab out.  Without `drop_at` the window keeps the content
    /// bounds.
    RemoveTab {
        group: TabGroupId,
        window: WindowId,
        #[serde(default)]
        drop_at: Option<Rect>,
    },

    SwitchTab { group: TabGroupId, index: TabIndex },

    MaximizeTabGroup { group: TabGroupId },

    MinimizeTabGroup { group: TabGroupId },

    RestoreTabGroup { group: TabGroupId },

    /// Drop `window` onto the tabstrip of `target`.
    TabDrop {
        window: WindowId,
        target: EntityId,
        pointer: Pointer,
    },

    SetTabstripHidden { group: TabGroupId, hidden: bool },

    /// Log the current layout as JSON.
    Snapshot,
}

//  Tests
