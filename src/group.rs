//! Snap group management: dock, undock, explode, contiguity repair, and
//! rigid group moves.
//!
//! A snap group is always exactly one connected component of the adjacency
//! graph of its members.  Every operation that can change bounds finishes by
//! re-validating contiguity, which splits a group into its components
//! without moving anything.

use crate::entity::{EntityId, WindowState};
use crate::geometry::{Rect, Side};
use crate::layout::{Layout, LayoutError};
use log::{debug, info};
use std::collections::{BTreeSet, VecDeque};

impl Layout {
    /// Connected components of `members` under zero-gap adjacency, each in
    /// id order.  Unknown ids are dropped.
    pub fn components(&self, members: &[EntityId]) -> Vec<Vec<EntityId>> {
        let known: Vec<(EntityId, Rect)> = members
            .iter()
            .filter_map(|m| self.layout_bounds(m).map(|r| (m.clone(), r)))
            .collect();
        let mut seen = vec![false; known.len()];
        let mut components = Vec::new();

        for start in 0..known.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut queue = VecDeque::from([start]);
            let mut component = BTreeSet::new();
            while let Some(i) = queue.pop_front() {
                component.insert(known[i].0.clone());
                for j in 0..known.len() {
                    if !seen[j] && known[i].1.adjacency(&known[j].1).is_some() {
                        seen[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            components.push(component.into_iter().collect());
        }
        components
    }

    /// Neighbors of `id` inside its own snap group, with the side of `id`
    /// they touch.
    pub fn adjacent_members(&self, id: &EntityId) -> Vec<(EntityId, Side)> {
        let Some(rect) = self.layout_bounds(id) else {
            return Vec::new();
        };
        self.members_or_self(id)
            .into_iter()
            .filter(|m| m != id)
            .filter_map(|m| {
                let other = self.layout_bounds(&m)?;
                rect.adjacency(&other).map(|side| (m, side))
            })
            .collect()
    }

    /// Recompute adjacency among `members` and regroup them per connected
    /// component.  Bookkeeping only: no entity moves.
    ///
    /// Returns the number of components found.
    pub fn validate_contiguity(&mut self, members: &[EntityId]) -> usize {
        let components = self.components(members);
        if components.len() > 1 {
            info!(
                "snap group split into {} components: {:?}",
                components.len(),
                components
            );
        }
        for component in &components {
            self.set_group(component);
        }
        components.len()
    }

    /// Re-validate the group containing `id`.
    pub(crate) fn revalidate_group_of(&mut self, id: &EntityId) {
        if let Some(members) = self.snap_group(id) {
            self.validate_contiguity(&members);
        }
    }

    /// Translate `id` and every member of its snap group by `(dx, dy)`.
    pub fn move_entity(&mut self, id: &EntityId, dx: i32, dy: i32) -> Result<(), LayoutError> {
        if self.entity(id).is_none() {
            return Err(LayoutError::UnknownEntity(id.clone()));
        }
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        for member in self.members_or_self(id) {
            if let Some(r) = self.layout_bounds(&member) {
                self.set_layout_bounds(&member, r.translate(dx, dy));
            }
        }
        debug!("moved group of {} by ({}, {})", id, dx, dy);
        Ok(())
    }

    /// Dock `a` onto `b`: `a`'s `side` edge is brought against `b`'s
    /// opposite edge and both snap groups merge into one.
    ///
    /// Returns `Ok(false)` without changing anything when the result would
    /// not be a valid adjacency (no perpendicular overlap, or an overlap
    /// between the two groups).
    pub fn dock(&mut self, a: &EntityId, b: &EntityId, side: Side) -> Result<bool, LayoutError> {
        for id in [a, b] {
            let entity = self
                .entity(id)
                .ok_or_else(|| LayoutError::UnknownEntity(id.clone()))?;
            if !entity.is_snappable() {
                return Err(LayoutError::FeatureDisabled {
                    feature: "docking",
                    entity: id.clone(),
                });
            }
        }
        if a == b {
            return Err(LayoutError::InvalidRequest(format!("cannot dock {} to itself", a)));
        }
        let group_a = self.members_or_self(a);
        let group_b = self.members_or_self(b);
        if group_a.contains(b) {
            debug!("{} and {} already share a snap group", a, b);
            return Ok(false);
        }

        let (ra, rb) = match (self.bounds(a), self.bounds(b)) {
            (Some(ra), Some(rb)) => (ra, rb),
            _ => return Ok(false),
        };
        let gap = ra.gap_to(&rb, side);
        let (ux, uy) = side.outward();
        let (dx, dy) = (ux * gap, uy * gap);

        let mut trial = self.clone();
        trial.move_entity(a, dx, dy)?;
        if self.snap_config().match_size {
            trial.match_perpendicular_extent(a, &rb, side)?;
        }

        let Some(moved) = trial.bounds(a) else {
            return Ok(false);
        };
        if !moved.is_adjacent(&rb, side) {
            debug!("dock {} -> {} {}: no valid adjacency", a, b, side);
            return Ok(false);
        }
        for x in trial.members_or_self(a) {
            for y in &group_b {
                if let (Some(rx), Some(ry)) = (trial.layout_bounds(&x), trial.layout_bounds(y)) {
                    if rx.intersects(&ry) {
                        debug!("dock {} -> {}: {} would overlap {}", a, b, x, y);
                        return Ok(false);
                    }
                }
            }
        }

        for id in group_a.iter().chain(group_b.iter()) {
            if !self.is_grouped(id) {
                let original = self.layout_bounds(id);
                if let Some(e) = trial.entity_mut(id) {
                    e.set_pre_group_bounds(original);
                }
            }
        }
        let mut merged = trial.members_or_self(a);
        merged.extend(group_b);
        trial.validate_contiguity(&merged);
        *self = trial;
        info!("docked {} to {} on its {} side", a, b, side);
        Ok(true)
    }

    /// One-shot alignment resize used by [`dock`](Layout::dock): when both
    /// perpendicular edges of `a` are within the snap distance of `target`'s,
    /// resize `a` to match them exactly.
    fn match_perpendicular_extent(
        &mut self,
        a: &EntityId,
        target: &Rect,
        side: Side,
    ) -> Result<(), LayoutError> {
        let Some(ra) = self.bounds(a) else {
            return Ok(());
        };
        let axis = side.axis().perpendicular();
        let (a_lo, a_hi) = ra.span(axis);
        let (t_lo, t_hi) = target.span(axis);
        let d = self.snap_config().distance;
        if (a_lo, a_hi) == (t_lo, t_hi) || (a_lo - t_lo).abs() > d || (a_hi - t_hi).abs() > d {
            return Ok(());
        }
        debug!("aligning {} to {:?} along {:?}", a, (t_lo, t_hi), axis);
        let reached = self.resize_entity(a, ra.with_span(axis, t_lo, t_hi))?;
        if reached.span(axis) != (t_lo, t_hi) {
            debug!("alignment of {} clamped to {:?}", a, reached.span(axis));
        }
        Ok(())
    }

    /// Remove `id` from its snap group and push it away from its former
    /// neighbors by the undock distance.  Undocking an ungrouped entity is a
    /// no-op.
    pub fn undock(&mut self, id: &EntityId) -> Result<(), LayoutError> {
        if self.entity(id).is_none() {
            return Err(LayoutError::UnknownEntity(id.clone()));
        }
        if !self.is_grouped(id) {
            debug!("undock {}: not grouped", id);
            return Ok(());
        }
        let offset = self.undock_offset(id);

        if let Some(remaining) = self.remove_from_group(id) {
            self.validate_contiguity(&remaining);
        }
        if let Some(e) = self.entity_mut(id) {
            e.set_pre_group_bounds(None);
        }
        match (offset, self.layout_bounds(id)) {
            (Some((dx, dy)), Some(r)) => self.set_layout_bounds(id, r.translate(dx, dy)),
            _ => debug!("undock {}: no free direction, staying in place", id),
        }
        info!("undocked {}", id);
        Ok(())
    }

    /// Where to push `id` when it leaves its group.
    ///
    /// Directions are tried away from the neighbor with the longest shared
    /// edge first, then along the other axis, then the rest.  A direction
    /// is taken only if the moved entity lands on nothing it does not
    /// already overlap.
    fn undock_offset(&self, id: &EntityId) -> Option<(i32, i32)> {
        let rect = self.layout_bounds(id)?;
        let mut ranked: Vec<(i32, Side)> = self
            .adjacent_members(id)
            .iter()
            .filter_map(|(m, side)| {
                let other = self.layout_bounds(m)?;
                Some((rect.overlap(&other, side.axis().perpendicular()), *side))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let strongest = ranked.first()?.1;

        let (p_lo, p_hi) = strongest.axis().perpendicular().sides();
        let mut order: Vec<Side> = Vec::new();
        let candidates = ranked.iter().map(|(_, s)| *s).chain([p_lo, p_hi]).chain(Side::ALL);
        for side in candidates {
            if !order.contains(&side) {
                order.push(side);
            }
        }

        let others: Vec<Rect> = self
            .entities()
            .filter(|e| &e.id() != id && e.state() != WindowState::Minimized)
            .map(|e| e.layout_bounds())
            .filter(|r| !r.intersects(&rect))
            .collect();
        let d = self.snap_config().undock_distance;
        order.into_iter().find_map(|side| {
            let (ux, uy) = side.opposite().outward();
            let moved = rect.translate(ux * d, uy * d);
            (!others.iter().any(|r| r.intersects(&moved))).then_some((ux * d, uy * d))
        })
    }

    /// Disband the snap group containing `id` so that no member keeps an
    /// adjacency.  Members are spread apart from the group's center.
    ///
    /// An ungrouped entity returns to its recorded pre-group position, if
    /// any, and otherwise stays where it is.
    pub fn explode(&mut self, id: &EntityId) -> Result<(), LayoutError> {
        if self.entity(id).is_none() {
            return Err(LayoutError::UnknownEntity(id.clone()));
        }
        let Some(members) = self.snap_group(id) else {
            let original = self.entity(id).and_then(|e| e.pre_group_bounds());
            if let Some(original) = original {
                debug!("explode {}: back to pre-group position", id);
                self.set_layout_bounds(id, original);
            }
            if let Some(e) = self.entity_mut(id) {
                e.set_pre_group_bounds(None);
            }
            return Ok(());
        };

        let rects: Vec<(EntityId, Rect)> = members
            .iter()
            .filter_map(|m| self.layout_bounds(m).map(|r| (m.clone(), r)))
            .collect();
        let Some(bbox) = crate::geometry::bounding_rect(rects.iter().map(|(_, r)| r)) else {
            return Ok(());
        };
        let (gx, gy) = bbox.center();

        // Scaling centers by `s` about the group center opens every seam by
        // (s - 1) * (la + lb) / 2 along its axis.
        let d = f64::from(self.snap_config().undock_distance.max(1) + 1);
        let mut scale: f64 = 1.0;
        for (i, (_, ra)) in rects.iter().enumerate() {
            for (_, rb) in &rects[i + 1..] {
                if let Some(side) = ra.adjacency(rb) {
                    let axis = side.axis();
                    let half_sum = f64::from(ra.len(axis) + rb.len(axis));
                    scale = scale.max(1.0 + 2.0 * d / half_sum);
                }
            }
        }

        for (m, r) in &rects {
            self.set_group(std::slice::from_ref(m));
            let (cx, cy) = r.center();
            let dx = ((cx - gx) * (scale - 1.0)).round() as i32;
            let dy = ((cy - gy) * (scale - 1.0)).round() as i32;
            self.set_layout_bounds(m, r.translate(dx, dy));
            if let Some(e) = self.entity_mut(m) {
                e.set_pre_group_bounds(None);
            }
        }
        info!("exploded snap group of {} ({} members)", id, rects.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{Entity, EntityId};
    use crate::geometry::{Rect, Side};
    use crate::layout::tests::{add, layout, wid};
    use crate::layout::LayoutError;

    #[test]
    fn dock_closes_gap_and_groups_two_windows() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 250, 250);
        let b = add(&mut l, "b", 252, 0, 250, 250);
        assert!(l.dock(&b, &a, Side::Left).unwrap());
        let ra = l.bounds(&a).unwrap();
        let rb = l.bounds(&b).unwrap();
        assert_eq!(rb.left(), ra.right());
        assert_eq!(ra, Rect::new(0, 0, 250, 250));
        assert_eq!(l.snap_group(&a).unwrap().len(), 2);
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn dock_without_perpendicular_overlap_is_noop() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 300, 100, 100);
        assert!(!l.dock(&a, &b, Side::Right).unwrap());
        assert!(!l.is_grouped(&a));
        assert_eq!(l.bounds(&a), Some(Rect::new(0, 0, 100, 100)));
    }

    #[test]
    fn dock_rejects_unknown_entity() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        assert_eq!(
            l.dock(&a, &wid("ghost"), Side::Right),
            Err(LayoutError::UnknownEntity(wid("ghost")))
        );
    }

    #[test]
    fn dock_rejects_disabled_docking() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 105, 0, 100, 100);
        if let Some(Entity::Window(w)) = l.entity_mut(&b) {
            w.features.docking = false;
        }
        assert!(matches!(
            l.dock(&a, &b, Side::Right),
            Err(LayoutError::FeatureDisabled { .. })
        ));
    }

    #[test]
    fn dock_moves_the_whole_source_group() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 0, 100, 100, 100);
        l.set_group(&[a.clone(), b.clone()]);
        let c = add(&mut l, "c", 105, 0, 100, 200);
        assert!(l.dock(&a, &c, Side::Right).unwrap());
        assert_eq!(l.bounds(&a), Some(Rect::new(5, 0, 100, 100)));
        assert_eq!(l.bounds(&b), Some(Rect::new(5, 100, 100, 100)));
        assert_eq!(l.snap_group(&c).unwrap().len(), 3);
    }

    #[test]
    fn dock_aligns_size_when_edges_are_close() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 200, 200);
        let b = add(&mut l, "b", 203, 5, 200, 190);
        assert!(l.dock(&b, &a, Side::Left).unwrap());
        assert_eq!(l.bounds(&b), Some(Rect::new(200, 0, 200, 200)));
    }

    #[test]
    fn dock_into_overlap_is_noop() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        l.set_group(&[a.clone(), b.clone()]);
        // `d` would land on `b` once `c` is pushed against `a`'s bottom.
        let c = add(&mut l, "c", 50, 120, 100, 100);
        let d = add(&mut l, "d", 140, 90, 50, 30);
        l.set_group(&[c.clone(), d.clone()]);
        assert!(!l.dock(&c, &a, Side::Top).unwrap());
        assert_eq!(l.bounds(&c), Some(Rect::new(50, 120, 100, 100)));
    }

    #[test]
    fn undock_singleton_does_not_move() {
        let mut l = layout();
        let a = add(&mut l, "a", 10, 20, 100, 100);
        l.undock(&a).unwrap();
        assert_eq!(l.bounds(&a), Some(Rect::new(10, 20, 100, 100)));
        assert!(l.take_requests().is_empty());
    }

    #[test]
    fn undock_pushes_away_from_strongest_neighbor() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        l.set_group(&[a.clone(), b.clone()]);
        l.undock(&b).unwrap();
        let d = l.snap_config().undock_distance;
        assert_eq!(l.bounds(&b), Some(Rect::new(100 + d, 0, 100, 100)));
        assert!(!l.is_grouped(&a));
        assert!(!l.is_grouped(&b));
    }

    #[test]
    fn undock_between_two_neighbors_moves_sideways() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        let c = add(&mut l, "c", 200, 0, 100, 100);
        l.set_group(&[a.clone(), b.clone(), c.clone()]);
        l.undock(&b).unwrap();
        let d = l.snap_config().undock_distance;
        assert_eq!(l.bounds(&b), Some(Rect::new(100, d, 100, 100)));
        assert_eq!(l.bounds(&a), Some(Rect::new(0, 0, 100, 100)));
        assert_eq!(l.bounds(&c), Some(Rect::new(200, 0, 100, 100)));
        assert!(!l.is_grouped(&b));
        assert!(l.overlaps_among(&[a, b, c]).is_empty());
    }

    #[test]
    fn undock_with_no_free_direction_stays_in_place() {
        let mut l = layout();
        let b = add(&mut l, "b", 100, 100, 100, 100);
        let around: Vec<EntityId> = [(0, 100), (200, 100), (100, 0), (100, 200)]
            .iter()
            .enumerate()
            .map(|(i, (x, y))| add(&mut l, &format!("n{}", i), *x, *y, 100, 100))
            .collect();
        let mut members = around.clone();
        members.push(b.clone());
        l.set_group(&members);
        l.undock(&b).unwrap();
        assert_eq!(l.bounds(&b), Some(Rect::new(100, 100, 100, 100)));
        assert!(!l.is_grouped(&b));
        assert!(l.overlaps_among(&members).is_empty());
    }

    #[test]
    fn undock_of_connector_splits_remaining_group() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        let c = add(&mut l, "c", 200, 0, 100, 100);
        let d = add(&mut l, "d", 200, 100, 100, 100);
        l.set_group(&[a.clone(), b.clone(), c.clone(), d.clone()]);
        l.undock(&b).unwrap();
        assert_eq!(l.snap_group(&a), None);
        assert_eq!(l.snap_group(&c), Some(vec![c.clone(), d.clone()]));
        assert!(l.invariant_violations().is_empty());
        assert!(l.overlaps_among(&[a, b, c, d]).is_empty());
    }

    #[test]
    fn explode_leaves_no_adjacency() {
        let mut l = layout();
        let ids: Vec<EntityId> = (0..4)
            .map(|i| {
                let (x, y) = ((i % 2) * 100, (i / 2) * 100);
                add(&mut l, &format!("w{}", i), x, y, 100, 100)
            })
            .collect();
        l.set_group(&ids);
        l.explode(&ids[0]).unwrap();
        for id in &ids {
            assert!(!l.is_grouped(id));
            assert!(l.adjacent_members(id).is_empty());
        }
        for (i, x) in ids.iter().enumerate() {
            for y in &ids[i + 1..] {
                let (rx, ry) = (l.bounds(x).unwrap(), l.bounds(y).unwrap());
                assert!(rx.adjacency(&ry).is_none(), "{} still touches {}", x, y);
            }
        }
        assert!(l.overlaps_among(&ids).is_empty());
    }

    #[test]
    fn explode_singleton_without_record_is_noop() {
        let mut l = layout();
        let a = add(&mut l, "a", 10, 10, 100, 100);
        l.explode(&a).unwrap();
        assert_eq!(l.bounds(&a), Some(Rect::new(10, 10, 100, 100)));
    }

    #[test]
    fn explode_singleton_returns_to_pre_group_position() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 108, 0, 100, 100);
        assert!(l.dock(&b, &a, Side::Left).unwrap());
        // A resize elsewhere disconnects the pair without moving `b`.
        l.set_bounds(&a, Rect::new(0, 0, 90, 100));
        l.validate_contiguity(&[a.clone(), b.clone()]);
        assert!(!l.is_grouped(&b));
        l.explode(&b).unwrap();
        assert_eq!(l.bounds(&b), Some(Rect::new(108, 0, 100, 100)));
    }

    #[test]
    fn validate_contiguity_splits_without_moving() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        let c = add(&mut l, "c", 500, 0, 100, 100);
        let d = add(&mut l, "d", 600, 0, 100, 100);
        l.set_group(&[a.clone(), b.clone(), c.clone(), d.clone()]);
        assert_eq!(l.validate_contiguity(&[a.clone(), b.clone(), c.clone(), d.clone()]), 2);
        assert_eq!(l.snap_group(&a), Some(vec![a.clone(), b.clone()]));
        assert_eq!(l.snap_group(&c), Some(vec![c.clone(), d.clone()]));
        assert_eq!(l.bounds(&c), Some(Rect::new(500, 0, 100, 100)));
        assert!(l.take_requests().is_empty());
    }

    #[test]
    fn move_is_rigid_for_the_whole_group() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        let c = add(&mut l, "c", 0, 100, 200, 50);
        l.set_group(&[a.clone(), b.clone(), c.clone()]);
        let before: Vec<Rect> = [&a, &b, &c].iter().map(|id| l.bounds(id).unwrap()).collect();
        l.move_entity(&b, 37, -12).unwrap();
        for (id, r) in [&a, &b, &c].iter().zip(before) {
            assert_eq!(l.bounds(id), Some(r.translate(37, -12)));
        }
        assert_eq!(l.snap_group(&a).unwrap().len(), 3);
        assert!(l.invariant_violations().is_empty());
    }
}
