//! The layout model: every registered entity, snap group membership, and the
//! queue of host requests produced by mutations.
//!
//! [`Layout`] is the single owner of bounds and membership.  The snap,
//! group, resize, tab and monitor modules extend it with their operations;
//! nothing outside those operations writes bounds or membership.
//!
//! Snap groups are stored as plain member sets.  Adjacency between members
//! is never stored: it is recomputed from the current bounds whenever a
//! mutation needs it.

use crate::config::{SnapConfig, TabConfig};
use crate::entity::{Entity, EntityId, TabGroup, TabGroupId, Window, WindowId, WindowState};
use crate::geometry::Rect;
use crate::monitor::Monitor;
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Errors surfaced synchronously to the caller.  No state is mutated when
/// one of these is returned.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("unknown window: {0}")]
    UnknownWindow(WindowId),
    #[error("unknown tab group: {0}")]
    UnknownTabGroup(TabGroupId),
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),
    #[error("window already registered: {0}")]
    AlreadyRegistered(WindowId),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{feature} is disabled for {entity}")]
    FeatureDisabled {
        feature: &'static str,
        entity: EntityId,
    },
    #[error("tabstrip of {0} is hidden")]
    TabstripHidden(TabGroupId),
    #[error("invalid drop region on {0}")]
    InvalidDropRegion(EntityId),
}

/// A request the host must apply for the model to become durable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    SetBounds { window: WindowId, bounds: Rect },
    SetState { window: WindowId, state: WindowState },
    SetVisible { window: WindowId, visible: bool },
}

impl HostRequest {
    pub fn window(&self) -> &WindowId {
        match self {
            HostRequest::SetBounds { window, .. }
            | HostRequest::SetState { window, .. }
            | HostRequest::SetVisible { window, .. } => window,
        }
    }

    fn same_kind(&self, other: &HostRequest) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.window() == other.window()
    }
}

/// Serializable view of the whole layout, as enumerated by a workspace
/// serializer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub windows: Vec<WindowSnapshot>,
    pub tab_groups: Vec<TabGroupSnapshot>,
    /// Only groups of two or more members.
    pub snap_groups: Vec<Vec<EntityId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub bounds: Rect,
    pub state: WindowState,
    pub tab_group: Option<TabGroupId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabGroupSnapshot {
    pub id: TabGroupId,
    pub tabs: Vec<WindowId>,
    pub active: usize,
    pub bounds: Rect,
    pub state: WindowState,
}

/// Owner of all entities and snap groups.
#[derive(Debug, Clone)]
pub struct Layout {
    entities: BTreeMap<EntityId, Entity>,
    /// Windows that currently live inside a tab group.
    tab_of: HashMap<WindowId, TabGroupId>,
    groups: BTreeMap<u32, BTreeSet<EntityId>>,
    group_of: HashMap<EntityId, u32>,
    next_group_id: u32,
    next_tab_group_id: u32,
    next_seq: u64,
    snap: SnapConfig,
    tabs: TabConfig,
    monitors: Vec<Monitor>,
    requests: Vec<HostRequest>,
}

impl Layout {
    pub fn new(snap: SnapConfig, tabs: TabConfig) -> Self {
        Self {
            entities: BTreeMap::new(),
            tab_of: HashMap::new(),
            groups: BTreeMap::new(),
            group_of: HashMap::new(),
            next_group_id: 1,
            next_tab_group_id: 1,
            next_seq: 0,
            snap,
            tabs,
            monitors: Vec::new(),
            requests: Vec::new(),
        }
    }

    pub fn snap_config(&self) -> &SnapConfig {
        &self.snap
    }

    pub fn tab_config(&self) -> &TabConfig {
        &self.tabs
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub(crate) fn set_monitors(&mut self, monitors: Vec<Monitor>) {
        self.monitors = monitors;
    }

    //  Registry

    /// Register a new standalone window.
    pub fn register(&mut self, mut window: Window) -> Result<(), LayoutError> {
        if self.is_registered(&window.id) {
            return Err(LayoutError::AlreadyRegistered(window.id));
        }
        if !window.constraints.is_satisfiable() {
            return Err(LayoutError::InvalidRequest(format!(
                "window {} has min size above max size",
                window.id
            )));
        }
        window.seq = self.next_seq();
        info!("register {} at {:?}", window.id, window.bounds);
        self.entities
            .insert(EntityId::Window(window.id.clone()), Entity::Window(window));
        Ok(())
    }

    /// Remove a window from the model.  Its tab group and snap group are
    /// repaired as if the window had been torn out and undocked without
    /// moving anything.
    pub fn deregister(&mut self, id: &WindowId) -> Result<(), LayoutError> {
        if let Some(&group) = self.tab_of.get(id) {
            info!("deregister {} (tab of {})", id, group);
            self.detach_tab(group, id)?;
            self.requests.retain(|r| r.window() != id);
            return Ok(());
        }
        let eid = EntityId::Window(id.clone());
        if self.entities.remove(&eid).is_none() {
            return Err(LayoutError::UnknownWindow(id.clone()));
        }
        info!("deregister {}", id);
        self.requests.retain(|r| r.window() != id);
        if let Some(remaining) = self.remove_from_group(&eid) {
            self.validate_contiguity(&remaining);
        }
        Ok(())
    }

    /// Record a state change the host applied to a standalone window.  A
    /// window leaving the normal state keeps its normal bounds as restore
    /// bounds, and a maximized window leaves its snap group.
    pub fn record_window_state(
        &mut self,
        id: &WindowId,
        state: WindowState,
    ) -> Result<(), LayoutError> {
        let eid = EntityId::Window(id.clone());
        let Some(Entity::Window(w)) = self.entities.get_mut(&eid) else {
            return Err(LayoutError::UnknownWindow(id.clone()));
        };
        let previous = w.state;
        if previous == state {
            return Ok(());
        }
        let mut restored = None;
        match (previous, state) {
            (WindowState::Normal, _) => w.restore_bounds = Some(w.bounds),
            (_, WindowState::Normal) => restored = w.restore_bounds.take(),
            _ => {}
        }
        w.state = state;
        info!("{} is now {:?}", id, state);

        if state == WindowState::Maximized {
            w.pre_group_bounds = None;
            if let Some(remaining) = self.remove_from_group(&eid) {
                self.validate_contiguity(&remaining);
            }
        }
        if let Some(bounds) = restored {
            self.set_bounds(&eid, bounds);
            self.revalidate_group_of(&eid);
        }
        Ok(())
    }

    pub fn is_registered(&self, id: &WindowId) -> bool {
        self.tab_of.contains_key(id) || self.entities.contains_key(&EntityId::Window(id.clone()))
    }

    /// Look up a window, standalone or tabbed.
    pub fn window(&self, id: &WindowId) -> Option<&Window> {
        match self.tab_of.get(id) {
            Some(group) => self.tab_group(*group)?.tabs.iter().find(|t| &t.id == id),
            None => match self.entities.get(&EntityId::Window(id.clone())) {
                Some(Entity::Window(w)) => Some(w),
                _ => None,
            },
        }
    }

    pub(crate) fn window_mut(&mut self, id: &WindowId) -> Option<&mut Window> {
        match self.tab_of.get(id).copied() {
            Some(group) => match self.entities.get_mut(&EntityId::TabGroup(group)) {
                Some(Entity::TabGroup(g)) => g.tabs.iter_mut().find(|t| &t.id == id),
                _ => None,
            },
            None => match self.entities.get_mut(&EntityId::Window(id.clone())) {
                Some(Entity::Window(w)) => Some(w),
                _ => None,
            },
        }
    }

    pub fn tab_group(&self, id: TabGroupId) -> Option<&TabGroup> {
        match self.entities.get(&EntityId::TabGroup(id)) {
            Some(Entity::TabGroup(g)) => Some(g),
            _ => None,
        }
    }

    pub(crate) fn tab_group_mut(&mut self, id: TabGroupId) -> Option<&mut TabGroup> {
        match self.entities.get_mut(&EntityId::TabGroup(id)) {
            Some(Entity::TabGroup(g)) => Some(g),
            _ => None,
        }
    }

    /// The tab group a window is tabbed into, if any.
    pub fn tab_group_of(&self, window: &WindowId) -> Option<TabGroupId> {
        self.tab_of.get(window).copied()
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub(crate) fn entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// All top-level entities, in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// The top-level entity a window belongs to: the window itself, or the
    /// tab group it is tabbed into.
    pub fn top_level_of(&self, window: &WindowId) -> Option<EntityId> {
        match self.tab_of.get(window) {
            Some(group) => Some(EntityId::TabGroup(*group)),
            None => {
                let id = EntityId::Window(window.clone());
                self.entities.contains_key(&id).then_some(id)
            }
        }
    }

    pub fn bounds(&self, id: &EntityId) -> Option<Rect> {
        self.entities.get(id).map(Entity::bounds)
    }

    /// Bounds used for layout decisions (restore bounds when minimized).
    pub fn layout_bounds(&self, id: &EntityId) -> Option<Rect> {
        self.entities.get(id).map(Entity::layout_bounds)
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub(crate) fn insert_tab_group(&mut self, mut group: TabGroup) -> TabGroupId {
        group.id = TabGroupId(self.next_tab_group_id);
        self.next_tab_group_id += 1;
        group.seq = self.next_seq();
        for tab in &group.tabs {
            self.tab_of.insert(tab.id.clone(), group.id);
        }
        let id = group.id;
        self.entities.insert(EntityId::TabGroup(id), Entity::TabGroup(group));
        id
    }

    /// Take a standalone window out of the top-level registry (to move it
    /// into a tab group).
    pub(crate) fn take_standalone(&mut self, id: &WindowId) -> Option<Window> {
        match self.entities.remove(&EntityId::Window(id.clone())) {
            Some(Entity::Window(w)) => Some(w),
            Some(other) => {
                self.entities.insert(other.id(), other);
                None
            }
            None => None,
        }
    }

    pub(crate) fn insert_standalone(&mut self, window: Window) {
        self.tab_of.remove(&window.id);
        self.entities
            .insert(EntityId::Window(window.id.clone()), Entity::Window(window));
    }

    pub(crate) fn remove_tab_group_entity(&mut self, id: TabGroupId) -> Option<TabGroup> {
        match self.entities.remove(&EntityId::TabGroup(id)) {
            Some(Entity::TabGroup(g)) => {
                for tab in &g.tabs {
                    self.tab_of.remove(&tab.id);
                }
                Some(g)
            }
            Some(other) => {
                self.entities.insert(other.id(), other);
                None
            }
            None => None,
        }
    }

    pub(crate) fn set_tab_of(&mut self, window: WindowId, group: Option<TabGroupId>) {
        match group {
            Some(g) => {
                self.tab_of.insert(window, g);
            }
            None => {
                self.tab_of.remove(&window);
            }
        }
    }

    //  Geometry writes

    /// Set the live bounds of an entity and queue the host requests that
    /// make it durable.
    pub(crate) fn set_bounds(&mut self, id: &EntityId, bounds: Rect) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        match entity {
            Entity::Window(w) => w.bounds = bounds,
            Entity::TabGroup(g) => g.set_bounds(bounds),
        }
        let windows: Vec<(WindowId, Rect)> = entity
            .windows()
            .into_iter()
            .map(|w| (w.id.clone(), w.bounds))
            .collect();
        for (window, bounds) in windows {
            self.push_request(HostRequest::SetBounds { window, bounds });
        }
    }

    /// Write layout bounds: the restore bounds of a minimized entity (no host
    /// request until it is restored), the live bounds otherwise.
    pub(crate) fn set_layout_bounds(&mut self, id: &EntityId, bounds: Rect) {
        let minimized = self
            .entities
            .get(id)
            .is_some_and(|e| e.state() == WindowState::Minimized);
        if !minimized {
            self.set_bounds(id, bounds);
            return;
        }
        match self.entities.get_mut(id) {
            Some(Entity::Window(w)) => w.restore_bounds = Some(bounds),
            Some(Entity::TabGroup(g)) => g.restore_bounds = Some(bounds),
            None => {}
        }
    }

    /// Record the model's bounds for a window without queuing a host request
    /// (the host already has them).
    pub(crate) fn record_window_bounds(&mut self, id: &WindowId, bounds: Rect) {
        if let Some(w) = self.window_mut(id) {
            w.bounds = bounds;
        }
    }

    pub(crate) fn push_request(&mut self, request: HostRequest) {
        self.requests.retain(|r| !r.same_kind(&request));
        self.requests.push(request);
    }

    /// Drain the queued host requests, oldest first.
    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }

    //  Snap group membership

    /// Members of the snap group containing `id`, or `None` when the entity
    /// is not grouped (a group of one counts as not grouped).
    pub fn snap_group(&self, id: &EntityId) -> Option<Vec<EntityId>> {
        let group = self.group_of.get(id)?;
        let members = self.groups.get(group)?;
        (members.len() > 1).then(|| members.iter().cloned().collect())
    }

    pub fn is_grouped(&self, id: &EntityId) -> bool {
        self.snap_group(id).is_some()
    }

    /// Every snap group of two or more members.
    pub fn snap_groups(&self) -> Vec<Vec<EntityId>> {
        self.groups
            .values()
            .filter(|m| m.len() > 1)
            .map(|m| m.iter().cloned().collect())
            .collect()
    }

    /// Members of the group containing `id`, or just `id` when ungrouped.
    pub fn members_or_self(&self, id: &EntityId) -> Vec<EntityId> {
        self.snap_group(id).unwrap_or_else(|| vec![id.clone()])
    }

    /// Replace the groups of every listed entity with one group holding
    /// exactly `members`.  Fewer than two members leaves them ungrouped.
    pub(crate) fn set_group(&mut self, members: &[EntityId]) {
        for m in members {
            self.remove_membership(m);
        }
        if members.len() < 2 {
            return;
        }
        let id = self.next_group_id;
        self.next_group_id += 1;
        for m in members {
            self.group_of.insert(m.clone(), id);
        }
        debug!("snap group {} = {:?}", id, members);
        self.groups.insert(id, members.iter().cloned().collect());
    }

    /// Remove `id` from its group and return the remaining members (which
    /// may now be a group of one).
    pub(crate) fn remove_from_group(&mut self, id: &EntityId) -> Option<Vec<EntityId>> {
        let group = self.group_of.remove(id)?;
        let members = self.groups.get_mut(&group)?;
        members.remove(id);
        let remaining: Vec<EntityId> = members.iter().cloned().collect();
        if remaining.len() < 2 {
            self.groups.remove(&group);
            for m in &remaining {
                self.group_of.remove(m);
            }
        }
        Some(remaining)
    }

    /// Put `new` in the group slot `old` occupied.
    pub(crate) fn replace_in_group(&mut self, old: &EntityId, new: &EntityId) {
        let Some(group) = self.group_of.remove(old) else {
            return;
        };
        if let Some(members) = self.groups.get_mut(&group) {
            members.remove(old);
            members.insert(new.clone());
        }
        self.group_of.insert(new.clone(), group);
    }

    fn remove_membership(&mut self, id: &EntityId) {
        if let Some(group) = self.group_of.remove(id) {
            if let Some(members) = self.groups.get_mut(&group) {
                members.remove(id);
                if members.is_empty() {
                    self.groups.remove(&group);
                }
            }
        }
    }

    //  Queries

    /// Serializable view of the current layout.
    pub fn snapshot(&self) -> LayoutSnapshot {
        let mut windows = Vec::new();
        let mut tab_groups = Vec::new();
        for entity in self.entities.values() {
            match entity {
                Entity::Window(w) => windows.push(WindowSnapshot {
                    id: w.id.clone(),
                    bounds: w.bounds,
                    state: w.state,
                    tab_group: None,
                }),
                Entity::TabGroup(g) => {
                    for t in &g.tabs {
                        windows.push(WindowSnapshot {
                            id: t.id.clone(),
                            bounds: t.bounds,
                            state: t.state,
                            tab_group: Some(g.id),
                        });
                    }
                    tab_groups.push(TabGroupSnapshot {
                        id: g.id,
                        tabs: g.tabs.iter().map(|t| t.id.clone()).collect(),
                        active: g.active,
                        bounds: g.bounds,
                        state: g.state,
                    });
                }
            }
        }
        windows.sort_by(|a, b| a.id.cmp(&b.id));
        LayoutSnapshot {
            windows,
            tab_groups,
            snap_groups: self.snap_groups(),
        }
    }

    /// Describe every pair of `ids` whose layout bounds overlap.  Unknown
    /// ids are skipped.
    pub fn overlaps_among(&self, ids: &[EntityId]) -> Vec<String> {
        let mut overlaps = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                if let (Some(ra), Some(rb)) = (self.layout_bounds(a), self.layout_bounds(b)) {
                    if ra.intersects(&rb) {
                        overlaps.push(format!("{} overlaps {}", a, b));
                    }
                }
            }
        }
        overlaps
    }

    /// Check the connectivity and no-overlap invariants of every snap group
    /// and return a description of each violation.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for members in self.snap_groups() {
            if self.components(&members).len() > 1 {
                violations.push(format!("snap group {:?} is disconnected", members));
            }
            violations.extend(self.overlaps_among(&members));
        }
        for (window, group) in &self.tab_of {
            if self.entities.contains_key(&EntityId::Window(window.clone())) {
                violations.push(format!("{} is both standalone and a tab of {}", window, group));
            }
        }
        violations
    }
}
