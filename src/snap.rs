//! Snap and tab-drop detection.
//!
//! Detection is pure: it reads the layout and reports what a drop would do,
//! leaving every mutation to [`Layout::apply_snap`] and the tab operations.

use crate::entity::{Entity, EntityId, WindowId, WindowState};
use crate::geometry::{Axis, Point, Rect, Side};
use crate::layout::{Layout, LayoutError};
use log::debug;
use serde::Serialize;

/// The best snap for a dragged group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapCandidate {
    /// Member of the dragged group whose edge snaps.
    pub source: EntityId,
    pub target: EntityId,
    /// Side of `source` that touches `target`.
    pub side: Side,
    /// Translation applied to the whole dragged group.
    pub dx: i32,
    pub dy: i32,
    /// Bounds of `source` once snapped.
    pub preview: Rect,
    /// False when the snapped group would overlap another entity.
    pub valid: bool,
}

/// A tab drop under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabDropCandidate {
    pub window: WindowId,
    pub target: EntityId,
    /// The drop region under the pointer.
    pub region: Rect,
    pub valid: bool,
}

/// Sort key: smallest gap, then larger overlap, then registration order of
/// the target, then side order.
type Rank = (i32, i32, u64, Side, u64);

impl Layout {
    /// Find the closest snap for the group containing `dragged`, using its
    /// current bounds.
    pub fn detect_snap(&self, dragged: &EntityId) -> Option<SnapCandidate> {
        let members = self.members_or_self(dragged);
        let snap = self.snap_config();
        let mut best: Option<(Rank, SnapCandidate)> = None;

        for source in &members {
            let src = self.entity(source)?;
            if !src.is_snappable() {
                return None;
            }
            let rs = src.bounds();
            for other in self.entities() {
                let target = other.id();
                if members.contains(&target) || !other.is_snappable() {
                    continue;
                }
                let rt = other.bounds();
                for side in Side::ALL {
                    let gap = rs.gap_to(&rt, side);
                    let overlap = rs.overlap(&rt, side.axis().perpendicular());
                    if gap.abs() > snap.distance || overlap < snap.min_overlap {
                        continue;
                    }
                    let rank = (gap.abs(), -overlap, other.seq(), side, src.seq());
                    if best.as_ref().is_some_and(|(r, _)| *r <= rank) {
                        continue;
                    }
                    let (ux, uy) = side.outward();
                    let (mut dx, mut dy) = (ux * gap, uy * gap);
                    if snap.align_edges {
                        let axis = side.axis().perpendicular();
                        let shift = alignment(&rs, &rt, axis, snap.distance);
                        match side.axis() {
                            Axis::Horizontal => dy += shift,
                            Axis::Vertical => dx += shift,
                        }
                    }
                    let candidate = SnapCandidate {
                        source: source.clone(),
                        target: target.clone(),
                        side,
                        dx,
                        dy,
                        preview: rs.translate(dx, dy),
                        valid: true,
                    };
                    best = Some((rank, candidate));
                }
            }
        }

        let (_, mut candidate) = best?;
        candidate.valid = !self.overlaps_outside(&members, candidate.dx, candidate.dy);
        debug!(
            "snap candidate: {} {} of {} (valid: {})",
            candidate.source, candidate.side, candidate.target, candidate.valid
        );
        Some(candidate)
    }

    /// Whether the group `members`, translated by `(dx, dy)`, would overlap
    /// any entity outside it.
    fn overlaps_outside(&self, members: &[EntityId], dx: i32, dy: i32) -> bool {
        let moved: Vec<Rect> = members
            .iter()
            .filter_map(|m| self.bounds(m))
            .map(|r| r.translate(dx, dy))
            .collect();
        self.entities()
            .filter(|e| !members.contains(&e.id()) && e.state() != WindowState::Minimized)
            .any(|e| moved.iter().any(|r| r.intersects(&e.bounds())))
    }

    /// Translate the dragged group by the candidate's offset and dock it.
    /// Nothing changes when the dock does not hold.
    pub fn apply_snap(&mut self, candidate: &SnapCandidate) -> Result<bool, LayoutError> {
        if !candidate.valid {
            return Ok(false);
        }
        let mut trial = self.clone();
        trial.move_entity(&candidate.source, candidate.dx, candidate.dy)?;
        if !trial.dock(&candidate.source, &candidate.target, candidate.side)? {
            return Ok(false);
        }
        *self = trial;
        Ok(true)
    }

    /// Find the entity whose tab-drop region is under `pointer` while
    /// `window` is dragged.  Earlier registered entities win.
    pub fn detect_tab_drop(&self, window: &WindowId, pointer: Point) -> Option<TabDropCandidate> {
        let own = self.top_level_of(window)?;
        let target = self
            .entities()
            .filter(|e| e.id() != own && e.state() != WindowState::Minimized)
            .filter(|e| {
                self.tab_drop_region(&e.id())
                    .is_some_and(|r| r.contains_point(pointer))
            })
            .min_by_key(|e| e.seq())?;
        let region = self.tab_drop_region(&target.id())?;

        let dragged_ok = matches!(own, EntityId::Window(_))
            && !self.is_grouped(&own)
            && self.window(window).is_some_and(|w| w.features.tabbing);
        let target_ok = target.state() == WindowState::Normal
            && target.features().tabbing
            && !matches!(target, Entity::TabGroup(g) if g.hidden);
        Some(TabDropCandidate {
            window: window.clone(),
            target: target.id(),
            region,
            valid: dragged_ok && target_ok,
        })
    }
}

/// Perpendicular shift that lines `rs` up with `rt` when one pair of edges
/// is within `distance`; the closer pair wins.
fn alignment(rs: &Rect, rt: &Rect, axis: Axis, distance: i32) -> i32 {
    let (s_lo, s_hi) = rs.span(axis);
    let (t_lo, t_hi) = rt.span(axis);
    let (lo, hi) = (t_lo - s_lo, t_hi - s_hi);
    match (lo.abs() <= distance, hi.abs() <= distance) {
        (true, true) if hi.abs() < lo.abs() => hi,
        (true, _) => lo,
        (false, true) => hi,
        (false, false) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tests::{add, layout, wid};

    #[test]
    fn two_px_gap_snaps_left() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 250, 250);
        let b = add(&mut l, "b", 252, 0, 250, 250);
        let c = l.detect_snap(&b).unwrap();
        assert_eq!(c.target, a);
        assert_eq!(c.side, Side::Left);
        assert_eq!((c.dx, c.dy), (-2, 0));
        assert_eq!(c.preview, Rect::new(250, 0, 250, 250));
        assert!(c.valid);

        assert!(l.apply_snap(&c).unwrap());
        assert_eq!(l.bounds(&b).unwrap().left(), l.bounds(&a).unwrap().right());
        assert_eq!(l.snap_group(&a).map(|g| g.len()), Some(2));
    }

    #[test]
    fn detection_does_not_mutate() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 250, 250);
        let b = add(&mut l, "b", 252, 0, 250, 250);
        let before = l.snapshot();
        l.detect_snap(&b);
        assert_eq!(l.snapshot(), before);
        assert!(l.take_requests().is_empty());
    }

    #[test]
    fn too_far_is_no_candidate() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 130, 0, 100, 100);
        assert_eq!(l.detect_snap(&b), None);
    }

    #[test]
    fn too_little_overlap_is_no_candidate() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 100, 100);
        // Touches `a` but shares only 5px of edge.
        let c = add(&mut l, "c", 100, 95, 100, 100);
        assert_eq!(l.detect_snap(&c), None);
    }

    #[test]
    fn closest_candidate_wins() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 108, 0, 100, 100);
        let c = add(&mut l, "c", 212, 0, 100, 100);
        let found = l.detect_snap(&b).unwrap();
        assert_eq!(found.target, c);
        assert_eq!(found.side, Side::Right);
    }

    #[test]
    fn equal_gaps_prefer_larger_overlap_then_registration_order() {
        let mut l = layout();
        let first = add(&mut l, "z", 0, 0, 100, 50);
        add(&mut l, "y", 0, 0, 100, 50);
        let src = add(&mut l, "x", 105, 0, 100, 100);
        assert_eq!(l.detect_snap(&src).unwrap().target, first);

        let mut l = layout();
        add(&mut l, "z", 0, 0, 100, 40);
        let big = add(&mut l, "y", 0, 50, 100, 50);
        let src = add(&mut l, "x", 105, 0, 100, 100);
        assert_eq!(l.detect_snap(&src).unwrap().target, big);
    }

    #[test]
    fn edges_align_when_close() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 104, 6, 100, 100);
        let found = l.detect_snap(&b).unwrap();
        assert_eq!((found.dx, found.dy), (-4, -6));
        assert_eq!(found.preview, Rect::new(100, 0, 100, 100));
    }

    #[test]
    fn overlap_with_third_entity_is_invalid() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 100, 100);
        // Too short to be a candidate itself, but in the way of `b`.
        add(&mut l, "blocker", 101, 60, 1, 5);
        let b = add(&mut l, "b", 103, 40, 100, 100);
        let found = l.detect_snap(&b).unwrap();
        assert_eq!(found.target, wid("a"));
        assert!(!found.valid);
        assert!(!l.apply_snap(&found).unwrap());
    }

    #[test]
    fn grouped_members_are_sources() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 0, 100, 100, 100);
        l.set_group(&[a.clone(), b.clone()]);
        let c = add(&mut l, "c", 103, 150, 100, 100);
        let found = l.detect_snap(&a).unwrap();
        assert_eq!(found.source, b);
        assert_eq!(found.target, c);
        assert_eq!(found.side, Side::Right);
    }

    #[test]
    fn tab_drop_over_title_band() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 300, 200);
        add(&mut l, "b", 400, 0, 300, 200);
        let found = l.detect_tab_drop(&"b".into(), Point::new(50, 10)).unwrap();
        assert_eq!(found.target, a);
        assert_eq!(found.region, Rect::new(0, 0, 300, 30));
        assert!(found.valid);
        assert_eq!(l.detect_tab_drop(&"b".into(), Point::new(50, 100)), None);
    }

    #[test]
    fn tab_drop_from_grouped_window_is_invalid() {
        let mut l = layout();
        add(&mut l, "a", 0, 0, 300, 200);
        let b = add(&mut l, "b", 400, 0, 300, 200);
        let c = add(&mut l, "c", 700, 0, 300, 200);
        l.set_group(&[b, c]);
        let found = l.detect_tab_drop(&"b".into(), Point::new(50, 10)).unwrap();
        assert!(!found.valid);
    }
}
