//! Monitor assignment validation.
//!
//! Whenever the monitor set changes every snap group (ungrouped entities
//! included) must end up inside some monitor's work area.  Groups are moved
//! rigidly where possible; a group larger than every work area is split into
//! pieces that fit.

use crate::entity::{EntityId, WindowState};
use crate::geometry::{bounding_rect, Axis, Rect};
use crate::layout::Layout;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A physical output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub name: String,
    /// Full output area.
    pub bounds: Rect,
    /// Output area minus reserved space (bars, docks).
    pub work_area: Rect,
}

impl Monitor {
    /// A monitor without reserved space.
    pub fn new(name: impl Into<String>, bounds: Rect) -> Self {
        Self {
            name: name.into(),
            bounds,
            work_area: bounds,
        }
    }

    /// Whether `rect` would fit the work area if translated.
    fn can_hold(&self, rect: &Rect) -> bool {
        rect.width <= self.work_area.width && rect.height <= self.work_area.height
    }
}

/// Smallest `(dx, dy)` bringing `rect` inside `area`.  Assumes `rect` fits.
fn translation_into(rect: &Rect, area: &Rect) -> (i32, i32) {
    let shift = |lo: i32, hi: i32, area_lo: i32, area_hi: i32| {
        if lo < area_lo {
            area_lo - lo
        } else if hi > area_hi {
            area_hi - hi
        } else {
            0
        }
    };
    (
        shift(rect.left(), rect.right(), area.left(), area.right()),
        shift(rect.top(), rect.bottom(), area.top(), area.bottom()),
    )
}

/// Squared distance from the center of `rect` to `area` (zero inside).
fn distance_sq(rect: &Rect, area: &Rect) -> f64 {
    let (cx, cy) = rect.center();
    let clamp = |v: f64, lo: i32, hi: i32| v.max(f64::from(lo)).min(f64::from(hi));
    let dx = cx - clamp(cx, area.left(), area.right());
    let dy = cy - clamp(cy, area.top(), area.bottom());
    dx * dx + dy * dy
}

impl Layout {
    /// Replace the monitor set and re-validate every group against it.
    pub fn update_monitors(&mut self, monitors: Vec<Monitor>) {
        info!(
            "monitors changed: {:?}",
            monitors.iter().map(|m| m.name.as_str()).collect::<Vec<_>>()
        );
        self.set_monitors(monitors);
        self.validate_monitors();
    }

    /// The monitor whose work area is closest to `rect`, ties broken by
    /// monitor order.
    pub fn nearest_monitor(&self, rect: &Rect) -> Option<&Monitor> {
        self.monitors().iter().fold(None, |best: Option<&Monitor>, m| match best {
            Some(b) if distance_sq(rect, &b.work_area) <= distance_sq(rect, &m.work_area) => {
                Some(b)
            }
            _ => Some(m),
        })
    }

    /// Make every group fit inside a monitor work area.  Window states are
    /// left unchanged.
    ///
    /// Groups already inside a work area stay put.  The others are moved
    /// (or split) onto free space next to them where there is any.
    pub fn validate_monitors(&mut self) {
        if self.monitors().is_empty() {
            debug!("no monitors, skipping validation");
            return;
        }
        let mut seen = BTreeSet::new();
        let mut placed = Vec::new();
        let mut pending = Vec::new();
        let ids: Vec<EntityId> = self.entities().map(|e| e.id()).collect();
        for id in ids {
            if seen.contains(&id) {
                continue;
            }
            let members = self.members_or_self(&id);
            seen.extend(members.iter().cloned());

            if let [single] = members.as_slice() {
                if self.entity(single).map(|e| e.state()) == Some(WindowState::Maximized) {
                    self.refit_maximized(single);
                    continue;
                }
            }
            let rects = self.unit_rects(&members);
            let contained = bounding_rect(rects.iter().map(|(_, r)| r))
                .is_some_and(|bbox| self.monitors().iter().any(|m| m.work_area.contains_rect(&bbox)));
            if contained {
                placed.extend(rects.into_iter().map(|(_, r)| r));
            } else {
                pending.push(members);
            }
        }
        for members in pending {
            self.fit_unit(&members, 0, &mut placed);
        }
        for group in self.snap_groups() {
            self.validate_contiguity(&group);
        }
    }

    /// A maximized entity always covers a work area; move it to the nearest
    /// one if its own has gone.
    fn refit_maximized(&mut self, id: &EntityId) {
        let Some(bounds) = self.bounds(id) else {
            return;
        };
        if self.monitors().iter().any(|m| m.work_area == bounds) {
            return;
        }
        if let Some(area) = self.nearest_monitor(&bounds).map(|m| m.work_area) {
            info!("maximized {} moved to work area {:?}", id, area);
            self.set_bounds(id, area);
        }
    }

    fn unit_rects(&self, members: &[EntityId]) -> Vec<(EntityId, Rect)> {
        members
            .iter()
            .filter_map(|m| self.layout_bounds(m).map(|r| (m.clone(), r)))
            .collect()
    }

    /// Bring one group inside a work area without landing on `placed`,
    /// then add its rectangles to `placed`.
    fn fit_unit(&mut self, members: &[EntityId], depth: usize, placed: &mut Vec<Rect>) {
        let rects = self.unit_rects(members);
        let Some(bbox) = bounding_rect(rects.iter().map(|(_, r)| r)) else {
            return;
        };
        let inside = self.monitors().iter().any(|m| m.work_area.contains_rect(&bbox));
        if inside && !lands_on(&rects, (0, 0), placed.as_slice()) {
            placed.extend(rects.into_iter().map(|(_, r)| r));
            return;
        }

        if self.monitors().iter().any(|m| m.can_hold(&bbox)) {
            let free = self.free_translation(&bbox, &rects, placed.as_slice());
            let (dx, dy) = free.unwrap_or_else(|| {
                warn!("no free space for group of {}, overlapping", rects[0].0);
                self.nearest_translation(&bbox)
            });
            info!("moving group of {} by ({}, {}) onto a monitor", rects[0].0, dx, dy);
            for (m, r) in &rects {
                let moved = r.translate(dx, dy);
                self.set_layout_bounds(m, moved);
                placed.push(moved);
            }
            return;
        }

        let Some(area) = self.nearest_monitor(&bbox).map(|m| m.work_area) else {
            return;
        };
        if rects.len() == 1 || depth > 2 {
            for (m, r) in &rects {
                let moved = self.place_oversized(m, r, &area);
                placed.extend(moved);
            }
            return;
        }

        let axis = if bbox.width > area.width {
            Axis::Horizontal
        } else {
            Axis::Vertical
        };
        let pieces = split_to_fit(&rects, axis, area.len(axis));
        warn!(
            "group of {} does not fit any monitor, splitting into {} pieces",
            rects[0].0,
            pieces.len()
        );
        for piece in pieces {
            self.set_group(&piece);
            for component in self.components(&piece) {
                self.set_group(&component);
                self.fit_unit(&component, depth + 1, placed);
            }
        }
    }

    /// Cheapest rigid translation onto a monitor that can hold `bbox`.
    fn nearest_translation(&self, bbox: &Rect) -> (i32, i32) {
        self.monitors()
            .iter()
            .filter(|m| m.can_hold(bbox))
            .map(|m| translation_into(bbox, &m.work_area))
            .min_by_key(|(dx, dy)| dx.abs() + dy.abs())
            .unwrap_or((0, 0))
    }

    /// Cheapest translation that puts the group inside a work area without
    /// touching `placed`.  Spots tried are the group's own position and
    /// the positions next to each placed rectangle, pulled into each work
    /// area.
    fn free_translation(
        &self,
        bbox: &Rect,
        rects: &[(EntityId, Rect)],
        placed: &[Rect],
    ) -> Option<(i32, i32)> {
        let mut anchors = vec![(bbox.x, bbox.y)];
        for p in placed {
            anchors.extend([
                (p.right(), bbox.y),
                (p.left() - bbox.width, bbox.y),
                (bbox.x, p.bottom()),
                (bbox.x, p.top() - bbox.height),
                (p.right(), p.top()),
                (p.left(), p.bottom()),
            ]);
        }
        let mut best: Option<(i32, i32)> = None;
        for m in self.monitors().iter().filter(|m| m.can_hold(bbox)) {
            anchors.push((m.work_area.x, m.work_area.y));
            for &(x, y) in &anchors {
                let (sx, sy) = (x - bbox.x, y - bbox.y);
                let (tx, ty) = translation_into(&bbox.translate(sx, sy), &m.work_area);
                let offset = (sx + tx, sy + ty);
                if lands_on(rects, offset, placed) {
                    continue;
                }
                let cost = |(dx, dy): (i32, i32)| dx.abs() + dy.abs();
                if best.map_or(true, |b| cost(offset) < cost(b)) {
                    best = Some(offset);
                }
            }
            anchors.pop();
        }
        best
    }

    /// Put an entity that is larger than every monitor at the work area's
    /// origin, shrunk as far as its constraints allow.
    fn place_oversized(&mut self, id: &EntityId, rect: &Rect, area: &Rect) -> Option<Rect> {
        let constraints = self.entity(id).map(|e| e.constraints())?;
        let width = rect.width.min(area.width).max(constraints.min(Axis::Horizontal));
        let height = rect.height.min(area.height).max(constraints.min(Axis::Vertical));
        let placed = Rect::new(area.x, area.y, width, height);
        info!("placing oversized {} at {:?}", id, placed);
        self.set_layout_bounds(id, placed);
        Some(placed)
    }
}

/// Whether any of `rects`, translated by `offset`, overlaps `placed`.
fn lands_on(rects: &[(EntityId, Rect)], (dx, dy): (i32, i32), placed: &[Rect]) -> bool {
    rects.iter().any(|(_, r)| {
        let moved = r.translate(dx, dy);
        placed.iter().any(|p| p.intersects(&moved))
    })
}

/// Greedy sweep along `axis`: members are taken in order of their near edge
/// and a new piece starts whenever the current one would exceed `limit`.
fn split_to_fit(rects: &[(EntityId, Rect)], axis: Axis, limit: i32) -> Vec<Vec<EntityId>> {
    let mut sorted: Vec<&(EntityId, Rect)> = rects.iter().collect();
    sorted.sort_by_key(|(id, r)| (r.span(axis).0, id.clone()));

    let mut pieces: Vec<Vec<EntityId>> = Vec::new();
    let mut start = i32::MIN;
    for (id, r) in sorted {
        let (lo, hi) = r.span(axis);
        match pieces.last_mut() {
            Some(piece) if hi - start <= limit => piece.push(id.clone()),
            _ => {
                start = lo;
                pieces.push(vec![id.clone()]);
            }
        }
    }
    pieces
}
