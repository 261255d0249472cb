//! Tab group state machine: membership, active tab, tear-out, and the
//! normal / maximized / minimized state of a group as a unit.
//!
//! A tab group's bounds cover the tabstrip header plus the content area.
//! Every tab is kept on the content area; only the active one is visible.

use crate::entity::{EntityId, TabGroup, TabGroupId, Window, WindowId, WindowState};
use crate::geometry::{Axis, Point, Rect};
use crate::layout::{HostRequest, Layout, LayoutError};
use log::{debug, info};

impl Layout {
    /// The region a pointer must be in to drop a tab onto `target`: the
    /// tabstrip of a tab group, or the top tabstrip-height band of a window.
    pub fn tab_drop_region(&self, target: &EntityId) -> Option<Rect> {
        match target {
            EntityId::TabGroup(id) => self.tab_group(*id).map(TabGroup::tabstrip),
            EntityId::Window(_) => {
                let r = self.bounds(target)?;
                let h = self.tab_config().tabstrip_height.min(r.height);
                Some(Rect::new(r.x, r.y, r.width, h))
            }
        }
    }

    /// Merge `windows` into a new tab group.  The tabstrip is placed above
    /// the first window, which keeps its position.  Windows taken out of
    /// another tab group leave it behind with the remaining tabs in place.
    pub fn create_tab_group(&mut self, windows: &[WindowId]) -> Result<TabGroupId, LayoutError> {
        if windows.len() < 2 {
            return Err(LayoutError::InvalidRequest(
                "a tab group needs at least two windows".into(),
            ));
        }
        for (i, w) in windows.iter().enumerate() {
            if windows[..i].contains(w) {
                return Err(LayoutError::InvalidRequest(format!("{} listed twice", w)));
            }
            self.check_tabbable(w)?;
        }
        let combined = windows
            .iter()
            .filter_map(|w| self.window(w).map(|w| w.constraints))
            .reduce(|a, b| a.intersect(&b))
            .unwrap_or_default();
        if !combined.is_satisfiable() {
            return Err(LayoutError::InvalidRequest(
                "tab constraints have no common size".into(),
            ));
        }
        let first = self
            .window(&windows[0])
            .map(|w| w.bounds)
            .ok_or_else(|| LayoutError::UnknownWindow(windows[0].clone()))?;

        let mut trial = self.clone();
        let mut tabs = Vec::with_capacity(windows.len());
        for w in windows {
            tabs.push(trial.detach_window(w)?);
        }
        let content = Rect::new(
            first.x,
            first.y,
            combined.clamp_len(Axis::Horizontal, first.width),
            combined.clamp_len(Axis::Vertical, first.height),
        );
        let tabstrip_height = trial.tab_config().tabstrip_height;
        let group = TabGroup {
            id: TabGroupId(0),
            tabs,
            active: 0,
            bounds: TabGroup::outer_for_content(content, tabstrip_height),
            tabstrip_height,
            state: WindowState::Normal,
            restore_bounds: None,
            minimized_from_maximized: false,
            hidden: false,
            pre_group_bounds: None,
            seq: 0,
        };
        let bounds = group.bounds;
        let id = trial.insert_tab_group(group);
        trial.set_bounds(&EntityId::TabGroup(id), bounds);
        for (i, w) in windows.iter().enumerate() {
            trial.push_request(HostRequest::SetVisible {
                window: w.clone(),
                visible: i == 0,
            });
        }
        *self = trial;
        info!("created {} from {:?}", id, windows);
        Ok(id)
    }

    /// Add `window` to `group` as its active tab.
    pub fn add_tab(&mut self, group: TabGroupId, window: &WindowId) -> Result<(), LayoutError> {
        let g = self.open_tab_group(group)?;
        if !g.features().tabbing {
            return Err(LayoutError::FeatureDisabled {
                feature: "tabbing",
                entity: EntityId::TabGroup(group),
            });
        }
        if g.position(window).is_some() {
            return Err(LayoutError::InvalidRequest(format!(
                "{} is already a tab of {}",
                window, group
            )));
        }
        if g.state != WindowState::Normal {
            return Err(LayoutError::InvalidRequest(format!(
                "{} is {:?}",
                group, g.state
            )));
        }
        self.check_tabbable(window)?;
        let own = self
            .window(window)
            .map(|w| w.constraints)
            .ok_or_else(|| LayoutError::UnknownWindow(window.clone()))?;
        let combined = g.tabs.iter().fold(own, |acc, t| acc.intersect(&t.constraints));
        if !combined.is_satisfiable() {
            return Err(LayoutError::InvalidRequest(format!(
                "{} cannot share a size with the tabs of {}",
                window, group
            )));
        }

        let mut trial = self.clone();
        let tab = trial.detach_window(window)?;
        let gid = EntityId::TabGroup(group);
        let previous = {
            let g = trial
                .tab_group_mut(group)
                .ok_or(LayoutError::UnknownTabGroup(group))?;
            let previous = g.active_tab().map(|t| t.id.clone());
            g.tabs.push(tab);
            g.active = g.tabs.len() - 1;
            previous
        };
        trial.set_tab_of(window.clone(), Some(group));
        trial.fit_tab_group(group)?;
        if let Some(previous) = previous {
            trial.push_request(HostRequest::SetVisible {
                window: previous,
                visible: false,
            });
        }
        trial.push_request(HostRequest::SetVisible {
            window: window.clone(),
            visible: true,
        });
        trial.revalidate_group_of(&gid);
        *self = trial;
        info!("added {} to {}", window, group);
        Ok(())
    }

    /// Tear `window` out of `group`.  The window becomes standalone at
    /// `drop_at` (its current bounds when `None`).  Removing the
    /// second-to-last tab dissolves the group.
    pub fn remove_tab(
        &mut self,
        group: TabGroupId,
        window: &WindowId,
        drop_at: Option<Rect>,
    ) -> Result<(), LayoutError> {
        let g = self.open_tab_group(group)?;
        if g.position(window).is_none() {
            return Err(LayoutError::InvalidRequest(format!(
                "{} is not a tab of {}",
                window, group
            )));
        }
        if g.state != WindowState::Normal {
            return Err(LayoutError::InvalidRequest(format!(
                "{} is {:?}",
                group, g.state
            )));
        }
        let mut tab = self.detach_tab(group, window)?;
        let bounds = drop_at.unwrap_or(tab.bounds);
        tab.bounds = Rect::new(
            bounds.x,
            bounds.y,
            tab.constraints.clamp_len(Axis::Horizontal, bounds.width),
            tab.constraints.clamp_len(Axis::Vertical, bounds.height),
        );
        tab.pre_group_bounds = None;
        let id = EntityId::Window(tab.id.clone());
        let bounds = tab.bounds;
        self.insert_standalone(tab);
        self.set_bounds(&id, bounds);
        self.push_request(HostRequest::SetVisible {
            window: window.clone(),
            visible: true,
        });
        info!("tore {} out of {} to {:?}", window, group, bounds);
        Ok(())
    }

    /// Remove `window` from `group`'s tab list.  When a single tab remains
    /// the group is replaced by that window, which takes over the group's
    /// bounds and snap group slot.  The detached window is returned
    /// without being re-registered.
    pub(crate) fn detach_tab(
        &mut self,
        group: TabGroupId,
        window: &WindowId,
    ) -> Result<Window, LayoutError> {
        let g = self
            .tab_group_mut(group)
            .ok_or(LayoutError::UnknownTabGroup(group))?;
        let index = g
            .position(window)
            .ok_or_else(|| LayoutError::UnknownWindow(window.clone()))?;
        let was_active = index == g.active;
        let tab = g.tabs.remove(index);
        if index < g.active || g.active >= g.tabs.len() {
            g.active = g.active.saturating_sub(1);
        }
        let newly_active = was_active.then(|| g.active_tab().map(|t| t.id.clone())).flatten();
        let remaining = g.tabs.len();
        self.set_tab_of(window.clone(), None);
        debug!("detached {} from {} ({} left)", window, group, remaining);

        if remaining >= 2 {
            if let Some(active) = newly_active {
                self.push_request(HostRequest::SetVisible {
                    window: active,
                    visible: true,
                });
            }
            return Ok(tab);
        }

        let gid = EntityId::TabGroup(group);
        let Some(dissolved) = self.remove_tab_group_entity(group) else {
            return Ok(tab);
        };
        let Some(mut last) = dissolved.tabs.into_iter().next() else {
            return Ok(tab);
        };
        let outer = match dissolved.state {
            WindowState::Minimized => dissolved.restore_bounds.unwrap_or(dissolved.bounds),
            _ => dissolved.bounds,
        };
        let fitted = Rect::new(
            outer.x,
            outer.y,
            last.constraints.clamp_len(Axis::Horizontal, outer.width),
            last.constraints.clamp_len(Axis::Vertical, outer.height),
        );
        last.state = dissolved.state;
        last.pre_group_bounds = dissolved.pre_group_bounds;
        let wid = EntityId::Window(last.id.clone());
        let last_id = last.id.clone();
        match dissolved.state {
            WindowState::Minimized => {
                last.restore_bounds = Some(fitted);
            }
            WindowState::Maximized => {
                last.restore_bounds = dissolved.restore_bounds;
                last.bounds = dissolved.bounds;
            }
            WindowState::Normal => {
                last.restore_bounds = None;
                last.bounds = fitted;
            }
        }
        let live = last.bounds;
        self.insert_standalone(last);
        self.replace_in_group(&gid, &wid);
        if dissolved.state != WindowState::Minimized {
            self.set_bounds(&wid, live);
            self.push_request(HostRequest::SetVisible {
                window: last_id.clone(),
                visible: true,
            });
        }
        self.revalidate_group_of(&wid);
        info!("{} dissolved, {} is standalone again", group, last_id);
        Ok(tab)
    }

    /// Make the tab at `index` the visible one.  Bounds do not change.
    pub fn switch_tab(&mut self, group: TabGroupId, index: usize) -> Result<(), LayoutError> {
        let g = self.open_tab_group(group)?;
        if index >= g.tabs.len() {
            return Err(LayoutError::InvalidRequest(format!(
                "{} has no tab {}",
                group, index
            )));
        }
        if index == g.active {
            return Ok(());
        }
        let previous = g.tabs[g.active].id.clone();
        let next = g.tabs[index].id.clone();
        if let Some(g) = self.tab_group_mut(group) {
            g.active = index;
        }
        self.push_request(HostRequest::SetVisible {
            window: previous,
            visible: false,
        });
        self.push_request(HostRequest::SetVisible {
            window: next.clone(),
            visible: true,
        });
        info!("{} switched to {}", group, next);
        Ok(())
    }

    /// Maximize a tab group onto its monitor's work area.  A docked group
    /// leaves its snap group first (without moving the other members).
    pub fn maximize_tab_group(&mut self, group: TabGroupId) -> Result<(), LayoutError> {
        let g = self.open_tab_group(group)?;
        match g.state {
            WindowState::Maximized => return Ok(()),
            WindowState::Minimized => {
                return Err(LayoutError::InvalidRequest(format!(
                    "{} is minimized, restore it first",
                    group
                )))
            }
            WindowState::Normal => {}
        }
        let bounds = g.bounds;
        let gid = EntityId::TabGroup(group);
        if let Some(remaining) = self.remove_from_group(&gid) {
            self.validate_contiguity(&remaining);
        }
        let area = self
            .nearest_monitor(&bounds)
            .map(|m| m.work_area)
            .unwrap_or(bounds);
        if let Some(g) = self.tab_group_mut(group) {
            g.state = WindowState::Maximized;
            g.restore_bounds = Some(bounds);
            g.pre_group_bounds = None;
        }
        self.set_tab_states(group, WindowState::Maximized);
        self.set_bounds(&gid, area);
        info!("maximized {} to {:?}", group, area);
        Ok(())
    }

    /// Minimize a tab group.  A group minimized from the maximized state
    /// remembers it, so that restoring takes two steps.
    pub fn minimize_tab_group(&mut self, group: TabGroupId) -> Result<(), LayoutError> {
        let g = self.open_tab_group(group)?;
        let (state, bounds) = (g.state, g.bounds);
        if let Some(g) = self.tab_group_mut(group) {
            match state {
                WindowState::Minimized => return Ok(()),
                WindowState::Maximized => g.minimized_from_maximized = true,
                WindowState::Normal => {
                    g.minimized_from_maximized = false;
                    g.restore_bounds = Some(bounds);
                }
            }
            g.state = WindowState::Minimized;
        }
        self.set_tab_states(group, WindowState::Minimized);
        info!("minimized {}", group);
        Ok(())
    }

    /// Step a tab group back toward the normal state: minimized goes to
    /// maximized when it was minimized from there, everything else goes to
    /// normal at the restore bounds.
    pub fn restore_tab_group(&mut self, group: TabGroupId) -> Result<(), LayoutError> {
        let g = self.open_tab_group(group)?;
        let (state, from_max, restore) = (g.state, g.minimized_from_maximized, g.restore_bounds);
        let gid = EntityId::TabGroup(group);
        match state {
            WindowState::Normal => return Ok(()),
            WindowState::Minimized if from_max => {
                if let Some(g) = self.tab_group_mut(group) {
                    g.state = WindowState::Maximized;
                    g.minimized_from_maximized = false;
                }
                self.set_tab_states(group, WindowState::Maximized);
                info!("restored {} to maximized", group);
            }
            WindowState::Minimized | WindowState::Maximized => {
                if let Some(g) = self.tab_group_mut(group) {
                    g.state = WindowState::Normal;
                    g.restore_bounds = None;
                }
                self.set_tab_states(group, WindowState::Normal);
                if let Some(restore) = restore {
                    self.set_bounds(&gid, restore);
                }
                self.revalidate_group_of(&gid);
                info!("restored {} to normal", group);
            }
        }
        Ok(())
    }

    /// Hide or show the tabstrip of `group`.  Tab operations on a group
    /// with a hidden tabstrip are rejected.
    pub fn set_tabstrip_hidden(
        &mut self,
        group: TabGroupId,
        hidden: bool,
    ) -> Result<(), LayoutError> {
        let g = self
            .tab_group_mut(group)
            .ok_or(LayoutError::UnknownTabGroup(group))?;
        g.hidden = hidden;
        info!("tabstrip of {} {}", group, if hidden { "hidden" } else { "shown" });
        Ok(())
    }

    /// Drop `window` onto `target` with the pointer at `pointer`: joins a
    /// tab group, or forms a new one with a target window.
    pub fn tab_drop(
        &mut self,
        window: &WindowId,
        target: &EntityId,
        pointer: Point,
    ) -> Result<TabGroupId, LayoutError> {
        if self.top_level_of(window).as_ref() == Some(target) {
            return Err(LayoutError::InvalidRequest(format!(
                "cannot drop {} onto itself",
                window
            )));
        }
        if let EntityId::TabGroup(id) = target {
            self.open_tab_group(*id)?;
        }
        let region = self
            .tab_drop_region(target)
            .ok_or_else(|| LayoutError::UnknownEntity(target.clone()))?;
        if !region.contains_point(pointer) {
            return Err(LayoutError::InvalidDropRegion(target.clone()));
        }
        match target {
            EntityId::TabGroup(id) => {
                self.add_tab(*id, window)?;
                Ok(*id)
            }
            EntityId::Window(target_window) => {
                self.create_tab_group(&[target_window.clone(), window.clone()])
            }
        }
    }

    //  Helpers

    /// A tab group that accepts tab operations.
    fn open_tab_group(&self, group: TabGroupId) -> Result<&TabGroup, LayoutError> {
        let g = self
            .tab_group(group)
            .ok_or(LayoutError::UnknownTabGroup(group))?;
        if g.hidden {
            return Err(LayoutError::TabstripHidden(group));
        }
        Ok(g)
    }

    /// Preconditions for moving `window` into a tab group.
    fn check_tabbable(&self, window: &WindowId) -> Result<(), LayoutError> {
        let w = self
            .window(window)
            .ok_or_else(|| LayoutError::UnknownWindow(window.clone()))?;
        if !w.features.tabbing {
            return Err(LayoutError::FeatureDisabled {
                feature: "tabbing",
                entity: EntityId::Window(window.clone()),
            });
        }
        if let Some(group) = self.tab_group_of(window) {
            self.open_tab_group(group)?;
        }
        let state = self
            .top_level_of(window)
            .and_then(|id| self.entity(&id))
            .map(|e| e.state());
        if state != Some(WindowState::Normal) {
            return Err(LayoutError::InvalidRequest(format!(
                "{} is not in the normal state",
                window
            )));
        }
        Ok(())
    }

    /// Take `window` out of whatever contains it: its tab group, or the
    /// top-level registry and its snap group.
    fn detach_window(&mut self, window: &WindowId) -> Result<Window, LayoutError> {
        if let Some(group) = self.tab_group_of(window) {
            return self.detach_tab(group, window);
        }
        let id = EntityId::Window(window.clone());
        if let Some(remaining) = self.remove_from_group(&id) {
            self.validate_contiguity(&remaining);
        }
        let mut w = self
            .take_standalone(window)
            .ok_or_else(|| LayoutError::UnknownWindow(window.clone()))?;
        w.pre_group_bounds = None;
        Ok(w)
    }

    /// Resize a tab group whose bounds no longer satisfy its constraints
    /// (after gaining a tab), then put every tab on the content area.
    ///
    /// Fails when the snap group cannot make room for the new size.
    fn fit_tab_group(&mut self, group: TabGroupId) -> Result<(), LayoutError> {
        let g = self
            .tab_group(group)
            .ok_or(LayoutError::UnknownTabGroup(group))?;
        let c = g.constraints();
        let bounds = g.bounds;
        let fitted = Rect::new(
            bounds.x,
            bounds.y,
            c.clamp_len(Axis::Horizontal, bounds.width),
            c.clamp_len(Axis::Vertical, bounds.height),
        );
        let gid = EntityId::TabGroup(group);
        let reached = if fitted != bounds {
            debug!("{} resized to {:?} for its new tab", group, fitted);
            self.resize_entity(&gid, fitted)?
        } else {
            bounds
        };
        if c.clamp_len(Axis::Horizontal, reached.width) != reached.width
            || c.clamp_len(Axis::Vertical, reached.height) != reached.height
        {
            return Err(LayoutError::InvalidRequest(format!(
                "{} cannot reach {}x{} next to its snap group",
                group, fitted.width, fitted.height
            )));
        }
        self.set_bounds(&gid, reached);
        Ok(())
    }

    fn set_tab_states(&mut self, group: TabGroupId, state: WindowState) {
        let ids: Vec<WindowId> = match self.tab_group_mut(group) {
            Some(g) => g
                .tabs
                .iter_mut()
                .map(|t| {
                    t.state = state;
                    t.id.clone()
                })
                .collect(),
            None => return,
        };
        for window in ids {
            self.push_request(HostRequest::SetState { window, state });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{Constraints, EntityId, TabGroupId, WindowId, WindowState};
    use crate::geometry::{Point, Rect};
    use crate::layout::tests::{add, layout, wid};
    use crate::layout::{HostRequest, Layout, LayoutError};
    use crate::monitor::Monitor;

    fn w(id: &str) -> WindowId {
        id.into()
    }

    fn tabs_of(l: &Layout, g: TabGroupId) -> Vec<WindowId> {
        l.tab_group(g)
            .map(|g| g.tabs.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn create_needs_two_windows() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 100, 100);
        assert!(matches!(
            l.create_tab_group(&[w("a")]),
            Err(LayoutError::InvalidRequest(_))
        ));
        assert_eq!(
            l.create_tab_group(&[w("a"), w("ghost")]),
            Err(LayoutError::UnknownWindow(w("ghost")))
        );
        assert!(l.entity(&wid("a")).is_some());
    }

    #[test]
    fn first_member_does_not_move() {
        let mut l = layout();
        add(&mut l, "a", 100, 100, 300, 200);
        add(&mut l, "b", 600, 600, 200, 200);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let group = l.tab_group(g).unwrap();
        assert_eq!(group.bounds, Rect::new(100, 70, 300, 230));
        assert_eq!(l.window(&w("a")).unwrap().bounds, Rect::new(100, 100, 300, 200));
        assert_eq!(l.window(&w("b")).unwrap().bounds, Rect::new(100, 100, 300, 200));
        assert_eq!(l.entity(&wid("b")), None);
        assert_eq!(l.tab_group_of(&w("b")), Some(g));
    }

    #[test]
    fn create_hides_all_but_the_first_tab() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 100, 100);
        add(&mut l, "b", 200, 100, 100, 100);
        l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let requests = l.take_requests();
        assert!(requests.contains(&HostRequest::SetVisible {
            window: w("a"),
            visible: true
        }));
        assert!(requests.contains(&HostRequest::SetVisible {
            window: w("b"),
            visible: false
        }));
    }

    #[test]
    fn create_leaves_snap_groups() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 100, 100, 100);
        let b = add(&mut l, "b", 100, 100, 100, 100);
        let c = add(&mut l, "c", 200, 100, 100, 100);
        l.set_group(&[a, b, c.clone()]);
        let g = l.create_tab_group(&[w("b"), w("d_missing")]);
        assert!(g.is_err());
        assert_eq!(l.snap_group(&c).map(|m| m.len()), Some(3));

        add(&mut l, "d", 500, 500, 100, 100);
        l.create_tab_group(&[w("d"), w("b")]).unwrap();
        assert_eq!(l.snap_group(&c), None);
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn ejected_tabs_stay_a_group_in_place() {
        let mut l = layout();
        for id in ["a", "b", "c", "d"] {
            add(&mut l, id, 0, 100, 200, 200);
        }
        let old = l.create_tab_group(&[w("a"), w("b"), w("c"), w("d")]).unwrap();
        let old_bounds = l.tab_group(old).unwrap().bounds;
        l.switch_tab(old, 2).unwrap();

        let before_c = l.window(&w("c")).unwrap().bounds;
        let new = l.create_tab_group(&[w("c"), w("a")]).unwrap();

        assert_eq!(tabs_of(&l, old), vec![w("b"), w("d")]);
        assert_eq!(l.tab_group(old).unwrap().bounds, old_bounds);
        assert_eq!(tabs_of(&l, new), vec![w("c"), w("a")]);
        assert_eq!(l.window(&w("c")).unwrap().bounds, before_c);
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn three_tabs_then_tear_out() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 400, 100, 300, 200);
        add(&mut l, "c", 800, 100, 300, 200);

        let g = l.tab_drop(&w("b"), &wid("a"), Point::new(10, 105)).unwrap();
        l.add_tab(g, &w("c")).unwrap();
        assert_eq!(tabs_of(&l, g), vec![w("a"), w("b"), w("c")]);
        assert_eq!(l.tab_group(g).unwrap().active, 2);

        let drop = Rect::new(900, 500, 300, 200);
        l.remove_tab(g, &w("a"), Some(drop)).unwrap();
        assert_eq!(tabs_of(&l, g), vec![w("b"), w("c")]);
        assert_eq!(l.entity(&wid("a")).map(|e| e.bounds()), Some(drop));
        assert_eq!(l.tab_group_of(&w("a")), None);
    }

    #[test]
    fn removing_second_to_last_tab_dissolves_the_group() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 0, 100, 300, 200);
        let n = add(&mut l, "n", 300, 70, 100, 100);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let outer = l.tab_group(g).unwrap().bounds;
        l.set_group(&[EntityId::TabGroup(g), n.clone()]);

        l.remove_tab(g, &w("a"), Some(Rect::new(900, 900, 300, 200))).unwrap();
        assert!(l.tab_group(g).is_none());
        assert_eq!(l.entity(&wid("b")).map(|e| e.bounds()), Some(outer));
        assert_eq!(l.snap_group(&n), Some(vec![wid("b"), n.clone()]));
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn switch_tab_only_changes_visibility() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 100, 100);
        add(&mut l, "b", 0, 100, 100, 100);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        l.take_requests();
        l.switch_tab(g, 1).unwrap();
        assert_eq!(
            l.take_requests(),
            vec![
                HostRequest::SetVisible {
                    window: w("a"),
                    visible: false
                },
                HostRequest::SetVisible {
                    window: w("b"),
                    visible: true
                },
            ]
        );
        assert!(matches!(l.switch_tab(g, 5), Err(LayoutError::InvalidRequest(_))));
    }

    #[test]
    fn hidden_tabstrip_rejects_tab_operations() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 100, 100);
        add(&mut l, "b", 0, 100, 100, 100);
        add(&mut l, "c", 0, 400, 100, 100);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        l.set_tabstrip_hidden(g, true).unwrap();
        assert_eq!(l.add_tab(g, &w("c")), Err(LayoutError::TabstripHidden(g)));
        assert_eq!(l.switch_tab(g, 1), Err(LayoutError::TabstripHidden(g)));
        assert_eq!(
            l.remove_tab(g, &w("a"), None),
            Err(LayoutError::TabstripHidden(g))
        );
        assert_eq!(tabs_of(&l, g), vec![w("a"), w("b")]);
        l.set_tabstrip_hidden(g, false).unwrap();
        l.add_tab(g, &w("c")).unwrap();
    }

    #[test]
    fn drop_outside_tabstrip_is_rejected() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 400, 100, 300, 200);
        assert_eq!(
            l.tab_drop(&w("b"), &wid("a"), Point::new(10, 250)),
            Err(LayoutError::InvalidDropRegion(wid("a")))
        );
        assert!(l.entity(&wid("b")).is_some());
    }

    #[test]
    fn disabled_tabbing_is_rejected() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 400, 100, 300, 200);
        if let Some(b) = l.window_mut(&w("b")) {
            b.features.tabbing = false;
        }
        assert_eq!(
            l.create_tab_group(&[w("a"), w("b")]),
            Err(LayoutError::FeatureDisabled {
                feature: "tabbing",
                entity: wid("b")
            })
        );
    }

    #[test]
    fn maximize_undocks_and_restore_returns() {
        let mut l = layout();
        l.set_monitors(vec![Monitor::new("m", Rect::new(0, 0, 1000, 1000))]);
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 0, 100, 300, 200);
        let n = add(&mut l, "n", 300, 70, 100, 100);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let gid = EntityId::TabGroup(g);
        l.set_group(&[gid.clone(), n.clone()]);
        let normal = l.bounds(&gid).unwrap();

        l.maximize_tab_group(g).unwrap();
        assert_eq!(l.bounds(&gid), Some(Rect::new(0, 0, 1000, 1000)));
        assert!(!l.is_grouped(&gid));
        assert_eq!(l.bounds(&n), Some(Rect::new(300, 70, 100, 100)));

        l.restore_tab_group(g).unwrap();
        assert_eq!(l.bounds(&gid), Some(normal));
        assert_eq!(l.tab_group(g).unwrap().state, WindowState::Normal);
    }

    #[test]
    fn restore_from_minimized_maximized_takes_two_steps() {
        let mut l = layout();
        l.set_monitors(vec![Monitor::new("m", Rect::new(0, 0, 1000, 1000))]);
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 0, 100, 300, 200);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let normal = l.tab_group(g).unwrap().bounds;

        l.maximize_tab_group(g).unwrap();
        l.minimize_tab_group(g).unwrap();
        assert_eq!(l.tab_group(g).unwrap().state, WindowState::Minimized);

        l.restore_tab_group(g).unwrap();
        assert_eq!(l.tab_group(g).unwrap().state, WindowState::Maximized);
        l.restore_tab_group(g).unwrap();
        let group = l.tab_group(g).unwrap();
        assert_eq!(group.state, WindowState::Normal);
        assert_eq!(group.bounds, normal);
        assert!(group.tabs.iter().all(|t| t.state == WindowState::Normal));
    }

    #[test]
    fn add_tab_clamps_group_to_new_constraints() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 0, 100, 300, 200);
        add(&mut l, "c", 500, 100, 100, 100);
        if let Some(c) = l.window_mut(&w("c")) {
            c.constraints.max_width = Some(250);
        }
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        l.add_tab(g, &w("c")).unwrap();
        let group = l.tab_group(g).unwrap();
        assert_eq!(group.bounds.width, 250);
        assert!(group.tabs.iter().all(|t| t.bounds == group.content()));
    }

    #[test]
    fn add_tab_that_cannot_grow_past_fixed_neighbor_is_rejected() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 0, 100, 300, 200);
        let n = add(&mut l, "n", 300, 70, 100, 230);
        add(&mut l, "c", 600, 100, 400, 200);
        if let Some(n) = l.window_mut(&w("n")) {
            n.constraints = Constraints::fixed();
        }
        if let Some(c) = l.window_mut(&w("c")) {
            c.constraints.min_width = 400;
        }
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let gid = EntityId::TabGroup(g);
        l.set_group(&[gid.clone(), n.clone()]);
        l.take_requests();

        assert!(matches!(l.add_tab(g, &w("c")), Err(LayoutError::InvalidRequest(_))));
        assert_eq!(l.bounds(&gid), Some(Rect::new(0, 70, 300, 230)));
        assert_eq!(l.bounds(&n), Some(Rect::new(300, 70, 100, 230)));
        assert_eq!(tabs_of(&l, g), vec![w("a"), w("b")]);
        assert!(l.entity(&wid("c")).is_some());
        assert!(l.is_grouped(&gid));
        assert!(l.take_requests().is_empty());
        assert!(l.overlaps_among(&[gid, n, wid("c")]).is_empty());
    }

    #[test]
    fn deregistering_a_tab_keeps_the_group_consistent() {
        let mut l = layout();
        add(&mut l, "a", 0, 100, 300, 200);
        add(&mut l, "b", 0, 100, 300, 200);
        let g = l.create_tab_group(&[w("a"), w("b")]).unwrap();
        let outer = l.tab_group(g).unwrap().bounds;
        l.deregister(&w("a")).unwrap();
        assert!(l.tab_group(g).is_none());
        assert_eq!(l.window(&w("b")).map(|b| b.bounds), Some(outer));
        assert!(!l.take_requests().iter().any(|r| r.window() == &w("a")));
    }
}
