//! The entities that take part in snapping and tabbing.
//!
//! An [`Entity`] is either a single [`Window`] or a [`TabGroup`].  A tab
//! group is exposed to the rest of the engine through the same contract as a
//! plain window (bounds, constraints, state), so snap detection and resize
//! propagation never special-case tabs.

use crate::config::Features;
use crate::geometry::{Axis, Rect, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned identity of a window (e.g. a compositor address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub String);

impl From<&str> for WindowId {
    fn from(s: &str) -> Self {
        WindowId(s.to_string())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-assigned identity of a tab group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabGroupId(pub u32);

impl fmt::Display for TabGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tabgroup-{}", self.0)
    }
}

/// Identity of a top-level entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityId {
    Window(WindowId),
    TabGroup(TabGroupId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Window(w) => write!(f, "{}", w),
            EntityId::TabGroup(t) => write!(f, "{}", t),
        }
    }
}

impl From<WindowId> for EntityId {
    fn from(id: WindowId) -> Self {
        EntityId::Window(id)
    }
}

impl From<TabGroupId> for EntityId {
    fn from(id: TabGroupId) -> Self {
        EntityId::TabGroup(id)
    }
}

/// Visual state of a window or tab group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// Which edges the user may drag to resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeRegions {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Default for ResizeRegions {
    fn default() -> Self {
        Self {
            left: true,
            right: true,
            top: true,
            bottom: true,
        }
    }
}

impl ResizeRegions {
    pub fn enabled(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
            Side::Top => self.top,
            Side::Bottom => self.bottom,
        }
    }
}

/// Size limits of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub resizable: bool,
    pub resize_regions: ResizeRegions,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
            max_width: None,
            max_height: None,
            resizable: true,
            resize_regions: ResizeRegions::default(),
        }
    }
}

impl Constraints {
    /// Fixed-size constraints, as reported for non-resizable windows.
    pub fn fixed() -> Self {
        Self {
            resizable: false,
            ..Self::default()
        }
    }

    pub fn min(&self, axis: Axis) -> i32 {
        let min = match axis {
            Axis::Horizontal => self.min_width,
            Axis::Vertical => self.min_height,
        };
        min.max(1)
    }

    pub fn max(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.max_width,
            Axis::Vertical => self.max_height,
        }
        .unwrap_or(i32::MAX)
    }

    /// Whether the edge on `side` may move relative to the opposite edge.
    pub fn can_resize(&self, side: Side) -> bool {
        self.resizable && self.resize_regions.enabled(side)
    }

    /// Clamp a length along `axis` into `[min, max]`.
    pub fn clamp_len(&self, axis: Axis, len: i32) -> i32 {
        len.max(self.min(axis)).min(self.max(axis))
    }

    /// Whether `min <= max` on both axes.
    pub fn is_satisfiable(&self) -> bool {
        self.min(Axis::Horizontal) <= self.max(Axis::Horizontal)
            && self.min(Axis::Vertical) <= self.max(Axis::Vertical)
    }

    /// Intersection of two constraint sets.
    pub fn intersect(&self, other: &Constraints) -> Constraints {
        let max = |a: Option<i32>, b: Option<i32>| match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Constraints {
            min_width: self.min_width.max(other.min_width),
            min_height: self.min_height.max(other.min_height),
            max_width: max(self.max_width, other.max_width),
            max_height: max(self.max_height, other.max_height),
            resizable: self.resizable && other.resizable,
            resize_regions: ResizeRegions {
                left: self.resize_regions.left && other.resize_regions.left,
                right: self.resize_regions.right && other.resize_regions.right,
                top: self.resize_regions.top && other.resize_regions.top,
                bottom: self.resize_regions.bottom && other.resize_regions.bottom,
            },
        }
    }
}

/// The rule-store scope of a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Scope {
    /// Owning application (e.g. window class).
    pub application: String,
    /// Window name within the application.
    pub window: String,
}

/// A single top-level surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub id: WindowId,
    pub scope: Scope,
    pub bounds: Rect,
    pub constraints: Constraints,
    pub state: WindowState,
    /// Bounds to return to when leaving `Minimized` / `Maximized`.
    pub restore_bounds: Option<Rect>,
    pub features: Features,
    /// Position before the entity first joined a snap group.
    pub pre_group_bounds: Option<Rect>,
    /// Registration order, used as a deterministic tie-break.
    pub seq: u64,
}

impl Window {
    pub fn new(id: WindowId, bounds: Rect) -> Self {
        Self {
            id,
            scope: Scope::default(),
            bounds,
            constraints: Constraints::default(),
            state: WindowState::Normal,
            restore_bounds: None,
            features: Features::default(),
            pre_group_bounds: None,
            seq: 0,
        }
    }
}

/// An ordered set of windows sharing one tabstrip.
#[derive(Debug, Clone, PartialEq)]
pub struct TabGroup {
    pub id: TabGroupId,
    /// Never empty while the group is registered.
    pub tabs: Vec<Window>,
    pub active: usize,
    /// Union of the tabstrip and the active tab's content area.
    pub bounds: Rect,
    pub tabstrip_height: i32,
    pub state: WindowState,
    pub restore_bounds: Option<Rect>,
    /// Set when minimized straight out of `Maximized`; restoring then goes
    /// back to `Maximized` first.
    pub minimized_from_maximized: bool,
    /// The tabstrip is covered by another window.
    pub hidden: bool,
    pub pre_group_bounds: Option<Rect>,
    pub seq: u64,
}

impl TabGroup {
    /// The tabstrip header rectangle.
    pub fn tabstrip(&self) -> Rect {
        Rect::new(
            self.bounds.x,
            self.bounds.y,
            self.bounds.width,
            self.tabstrip_height.min(self.bounds.height),
        )
    }

    /// Area below the tabstrip, shared by every tab.
    pub fn content(&self) -> Rect {
        let strip = self.tabstrip().height;
        Rect::new(
            self.bounds.x,
            self.bounds.y + strip,
            self.bounds.width,
            self.bounds.height - strip,
        )
    }

    /// Outer bounds of a tab group whose content area is `content`.
    pub fn outer_for_content(content: Rect, tabstrip_height: i32) -> Rect {
        Rect::new(
            content.x,
            content.y - tabstrip_height,
            content.width,
            content.height + tabstrip_height,
        )
    }

    pub fn active_tab(&self) -> Option<&Window> {
        self.tabs.get(self.active)
    }

    pub fn position(&self, window: &WindowId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.id == window)
    }

    /// Constraints every tab agrees on, extended by the tabstrip height.
    pub fn constraints(&self) -> Constraints {
        let mut combined = self
            .tabs
            .iter()
            .map(|t| t.constraints)
            .reduce(|a, b| a.intersect(&b))
            .unwrap_or_default();
        combined.min_height = combined.min_height.max(1) + self.tabstrip_height;
        combined.max_height = combined.max_height.map(|h| h + self.tabstrip_height);
        combined
    }

    /// A feature is enabled for the group only if every tab enables it.
    pub fn features(&self) -> Features {
        Features {
            docking: self.tabs.iter().all(|t| t.features.docking),
            tabbing: self.tabs.iter().all(|t| t.features.tabbing),
        }
    }

    /// Move/resize the group and keep every tab on the content area.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        let content = self.content();
        for tab in &mut self.tabs {
            tab.bounds = content;
        }
    }
}

/// A top-level participant in snapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Window(Window),
    TabGroup(TabGroup),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Window(w) => EntityId::Window(w.id.clone()),
            Entity::TabGroup(g) => EntityId::TabGroup(g.id),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Entity::Window(w) => w.bounds,
            Entity::TabGroup(g) => g.bounds,
        }
    }

    pub fn constraints(&self) -> Constraints {
        match self {
            Entity::Window(w) => w.constraints,
            Entity::TabGroup(g) => g.constraints(),
        }
    }

    pub fn state(&self) -> WindowState {
        match self {
            Entity::Window(w) => w.state,
            Entity::TabGroup(g) => g.state,
        }
    }

    pub fn features(&self) -> Features {
        match self {
            Entity::Window(w) => w.features,
            Entity::TabGroup(g) => g.features(),
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            Entity::Window(w) => w.seq,
            Entity::TabGroup(g) => g.seq,
        }
    }

    pub fn restore_bounds(&self) -> Option<Rect> {
        match self {
            Entity::Window(w) => w.restore_bounds,
            Entity::TabGroup(g) => g.restore_bounds,
        }
    }

    /// Bounds used for layout decisions: the restore bounds of a minimized
    /// entity, the live bounds otherwise.
    pub fn layout_bounds(&self) -> Rect {
        match self.state() {
            WindowState::Minimized => self.restore_bounds().unwrap_or_else(|| self.bounds()),
            _ => self.bounds(),
        }
    }

    pub fn pre_group_bounds(&self) -> Option<Rect> {
        match self {
            Entity::Window(w) => w.pre_group_bounds,
            Entity::TabGroup(g) => g.pre_group_bounds,
        }
    }

    pub fn set_pre_group_bounds(&mut self, bounds: Option<Rect>) {
        match self {
            Entity::Window(w) => w.pre_group_bounds = bounds,
            Entity::TabGroup(g) => g.pre_group_bounds = bounds,
        }
    }

    /// Whether the entity may take part in snap adjacency right now.
    pub fn is_snappable(&self) -> bool {
        self.state() == WindowState::Normal && self.features().docking
    }

    /// Windows whose host bounds follow this entity.
    pub fn windows(&self) -> Vec<&Window> {
        match self {
            Entity::Window(w) => vec![w],
            Entity::TabGroup(g) => g.tabs.iter().collect(),
        }
    }
}
