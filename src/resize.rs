//! Resize propagation across a snap group.
//!
//! A resize is applied one edge at a time.  For the axis of that edge the
//! group is reduced to a set of *seams*: every group of edges that lie on the
//! same coordinate and are joined by zero-gap adjacency moves together.  A
//! seam with members on only one side is an outer seam of the group.
//!
//! Moving the root seam by `d` raises the displacement of neighboring seams
//! until every member is consistent with its constraints:
//!
//! * a member pushed from behind shrinks first (if the trailing side may
//!   resize and it is above its minimum), then pushes its far seam;
//! * a member pulled from ahead grows first (if the leading side may resize
//!   and it is below its maximum), then drags its near seam along.
//!
//! Outer seams other than the moved one never move, so an inner resize
//! keeps the group's outline.  When the wanted displacement is not
//! satisfiable the largest satisfiable one is applied instead.

use crate::entity::{Constraints, EntityId, WindowState};
use crate::geometry::{Axis, Rect, Side};
use crate::layout::{Layout, LayoutError};
use log::debug;

impl Layout {
    /// Resize `id` toward `proposed`, propagating the change through its
    /// snap group.  Returns the bounds actually reached, which differ from
    /// `proposed` when a constraint clamped the resize.
    ///
    /// Edges are processed left, right, top, bottom.  Only entities in the
    /// normal state can be resized.
    pub fn resize_entity(&mut self, id: &EntityId, proposed: Rect) -> Result<Rect, LayoutError> {
        let entity = self
            .entity(id)
            .ok_or_else(|| LayoutError::UnknownEntity(id.clone()))?;
        if entity.state() != WindowState::Normal {
            return Err(LayoutError::InvalidRequest(format!(
                "{} cannot be resized while {:?}",
                id,
                entity.state()
            )));
        }

        for side in Side::ALL {
            let Some(current) = self.layout_bounds(id) else {
                break;
            };
            let delta = proposed.edge(side) - current.edge(side);
            if delta != 0 {
                self.move_edge(id, side, delta);
            }
        }

        let reached = self
            .layout_bounds(id)
            .ok_or_else(|| LayoutError::UnknownEntity(id.clone()))?;
        if reached != proposed {
            debug!("resize of {} clamped: wanted {:?}, got {:?}", id, proposed, reached);
        }
        if let Some(members) = self.snap_group(id) {
            self.validate_contiguity(&members);
        }
        Ok(reached)
    }

    /// Move the `side` edge of `id` by up to `delta` pixels and return the
    /// displacement applied.
    fn move_edge(&mut self, id: &EntityId, side: Side, delta: i32) -> i32 {
        let Some(entity) = self.entity(id) else {
            return 0;
        };
        if !entity.constraints().can_resize(side) {
            debug!("{} has no resize region on its {} side", id, side);
            return 0;
        }
        let members = self.members_or_self(id);
        let Some(model) = SeamModel::build(self, &members, side.axis()) else {
            return 0;
        };
        let Some(root) = members.iter().position(|m| m == id) else {
            return 0;
        };

        let forward = delta > 0;
        let wanted = i64::from(delta).abs();
        let solve = |amount: i64| {
            model
                .solve(root, side, forward, amount)
                .filter(|shifts| model.is_valid(shifts, forward))
        };

        let (achieved, shifts) = match solve(wanted) {
            Some(shifts) => (wanted, shifts),
            None => {
                // `lo` is always satisfiable, `hi` never.
                let (mut lo, mut hi) = (0, wanted);
                let mut best = None;
                while hi - lo > 1 {
                    let mid = lo + (hi - lo) / 2;
                    match solve(mid) {
                        Some(shifts) => {
                            lo = mid;
                            best = Some(shifts);
                        }
                        None => hi = mid,
                    }
                }
                match best {
                    Some(shifts) => (lo, shifts),
                    None => {
                        debug!("{} edge of {} cannot move", side, id);
                        return 0;
                    }
                }
            }
        };

        for (i, member) in members.iter().enumerate() {
            let updated = model.moved_rect(i, &shifts, forward);
            if updated != model.nodes[i].rect {
                self.set_layout_bounds(member, updated);
            }
        }
        let applied = if forward { achieved } else { -achieved };
        debug!("moved {} edge of {} by {} (wanted {})", side, id, applied, delta);
        applied as i32
    }
}

/// One group member projected on the resize axis.
#[derive(Debug)]
struct Node {
    rect: Rect,
    constraints: Constraints,
    near_seam: usize,
    far_seam: usize,
}

/// The seams of a snap group along one axis.
#[derive(Debug)]
struct SeamModel {
    axis: Axis,
    nodes: Vec<Node>,
    outer: Vec<bool>,
    /// Pairs of members adjacent before the resize, with the side of the
    /// first one they touch on.
    adjacent: Vec<(usize, usize, Side)>,
}

impl SeamModel {
    fn build(layout: &Layout, members: &[EntityId], axis: Axis) -> Option<Self> {
        let mut entries = Vec::with_capacity(members.len());
        for m in members {
            let entity = layout.entity(m)?;
            entries.push((entity.layout_bounds(), entity.constraints()));
        }
        let n = entries.len();
        let (_, far) = axis.sides();

        // Edge 2i is member i's near edge, 2i + 1 its far edge.
        let mut parent: Vec<usize> = (0..2 * n).collect();
        for i in 0..n {
            for j in 0..n {
                if i != j && entries[i].0.is_adjacent(&entries[j].0, far) {
                    union(&mut parent, 2 * i + 1, 2 * j);
                }
            }
        }

        let mut seam_of_root = vec![usize::MAX; 2 * n];
        let mut seam_of = vec![0; 2 * n];
        let mut seam_count = 0;
        for edge in 0..2 * n {
            let root = find(&mut parent, edge);
            if seam_of_root[root] == usize::MAX {
                seam_of_root[root] = seam_count;
                seam_count += 1;
            }
            seam_of[edge] = seam_of_root[root];
        }

        let mut has_near_edge = vec![false; seam_count];
        let mut has_far_edge = vec![false; seam_count];
        for i in 0..n {
            has_near_edge[seam_of[2 * i]] = true;
            has_far_edge[seam_of[2 * i + 1]] = true;
        }
        let outer = (0..seam_count)
            .map(|s| !(has_near_edge[s] && has_far_edge[s]))
            .collect();

        let mut adjacent = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                if let Some(side) = entries[i].0.adjacency(&entries[j].0) {
                    adjacent.push((i, j, side));
                }
            }
        }

        let nodes = entries
            .into_iter()
            .enumerate()
            .map(|(i, (rect, constraints))| Node {
                rect,
                constraints,
                near_seam: seam_of[2 * i],
                far_seam: seam_of[2 * i + 1],
            })
            .collect();

        Some(Self {
            axis,
            nodes,
            outer,
            adjacent,
        })
    }

    /// Smallest seam displacements (in the direction of motion) that move
    /// the root's `side` seam by `amount`, or `None` when an outer seam
    /// would have to move.
    fn solve(&self, root: usize, side: Side, forward: bool, amount: i64) -> Option<Vec<i64>> {
        let node = &self.nodes[root];
        let moved = if side.is_far() {
            node.far_seam
        } else {
            node.near_seam
        };
        let mut shift = vec![0i64; self.outer.len()];
        shift[moved] = amount;

        let (near_side, far_side) = self.axis.sides();
        loop {
            let mut changed = false;
            for node in &self.nodes {
                let (back, front, back_side, front_side) = if forward {
                    (node.near_seam, node.far_seam, near_side, far_side)
                } else {
                    (node.far_seam, node.near_seam, far_side, near_side)
                };
                let len = i64::from(node.rect.len(self.axis));
                let c = &node.constraints;
                let shrink = if c.can_resize(back_side) {
                    (len - i64::from(c.min(self.axis))).max(0)
                } else {
                    0
                };
                let grow = if c.can_resize(front_side) {
                    (i64::from(c.max(self.axis)) - len).max(0)
                } else {
                    0
                };

                let push = shift[back] - shrink;
                if push > shift[front] {
                    shift[front] = push;
                    changed = true;
                }
                let pull = shift[front] - grow;
                if pull > shift[back] {
                    shift[back] = pull;
                    changed = true;
                }
            }
            let pinned = self
                .outer
                .iter()
                .enumerate()
                .any(|(s, &outer)| outer && s != moved && shift[s] != 0);
            if pinned {
                return None;
            }
            if !changed {
                return Some(shift);
            }
        }
    }

    fn moved_rect(&self, i: usize, shift: &[i64], forward: bool) -> Rect {
        let node = &self.nodes[i];
        let sign = if forward { 1 } else { -1 };
        let (lo, hi) = node.rect.span(self.axis);
        let lo = i64::from(lo) + sign * shift[node.near_seam];
        let hi = i64::from(hi) + sign * shift[node.far_seam];
        node.rect.with_span(self.axis, lo as i32, hi as i32)
    }

    /// Former adjacencies survive and no two members overlap.
    fn is_valid(&self, shift: &[i64], forward: bool) -> bool {
        let rects: Vec<Rect> = (0..self.nodes.len())
            .map(|i| self.moved_rect(i, shift, forward))
            .collect();
        let kept = self
            .adjacent
            .iter()
            .all(|&(i, j, side)| rects[i].is_adjacent(&rects[j], side));
        let disjoint = (0..rects.len())
            .all(|i| (i + 1..rects.len()).all(|j| !rects[i].intersects(&rects[j])));
        kept && disjoint
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        parent[rb] = ra;
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{Constraints, Entity, EntityId};
    use crate::geometry::Rect;
    use crate::layout::tests::{add, layout};
    use crate::layout::{Layout, LayoutError};

    fn constrain(l: &mut Layout, id: &EntityId, f: impl FnOnce(&mut Constraints)) {
        if let Some(Entity::Window(w)) = l.entity_mut(id) {
            f(&mut w.constraints);
        }
    }

    fn row(l: &mut Layout, n: usize) -> Vec<EntityId> {
        let ids: Vec<EntityId> = (0..n)
            .map(|i| add(l, &format!("w{}", i), 100 * i as i32, 0, 100, 100))
            .collect();
        l.set_group(&ids);
        ids
    }

    #[test]
    fn singleton_resize_is_clamped_to_max() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        constrain(&mut l, &a, |c| c.max_width = Some(150));
        let got = l.resize_entity(&a, Rect::new(0, 0, 300, 120)).unwrap();
        assert_eq!(got, Rect::new(0, 0, 150, 120));
    }

    #[test]
    fn singleton_resize_is_clamped_to_min() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        constrain(&mut l, &a, |c| c.min_height = 80);
        let got = l.resize_entity(&a, Rect::new(0, 0, 100, 10)).unwrap();
        assert_eq!(got, Rect::new(0, 0, 100, 80));
    }

    #[test]
    fn inner_seam_moves_both_neighbors() {
        let mut l = layout();
        let ids = row(&mut l, 2);
        l.resize_entity(&ids[0], Rect::new(0, 0, 120, 100)).unwrap();
        assert_eq!(l.bounds(&ids[0]), Some(Rect::new(0, 0, 120, 100)));
        assert_eq!(l.bounds(&ids[1]), Some(Rect::new(120, 0, 80, 100)));
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn non_resizable_neighbor_blocks_inner_resize() {
        let mut l = layout();
        let ids = row(&mut l, 2);
        constrain(&mut l, &ids[1], |c| *c = Constraints::fixed());
        let got = l.resize_entity(&ids[0], Rect::new(0, 0, 130, 100)).unwrap();
        assert_eq!(got, Rect::new(0, 0, 100, 100));
        assert_eq!(l.bounds(&ids[1]), Some(Rect::new(100, 0, 100, 100)));
        assert!(l.take_requests().is_empty());
    }

    #[test]
    fn shrink_against_non_resizable_neighbor_keeps_its_size() {
        let mut l = layout();
        let ids = row(&mut l, 2);
        constrain(&mut l, &ids[1], |c| *c = Constraints::fixed());
        l.resize_entity(&ids[0], Rect::new(0, 0, 70, 100)).unwrap();
        assert_eq!(l.bounds(&ids[0]), Some(Rect::new(0, 0, 100, 100)));
        assert_eq!(l.bounds(&ids[1]).map(|r| r.width), Some(100));
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn chain_overflow_pushes_outward() {
        let mut l = layout();
        let ids = row(&mut l, 3);
        constrain(&mut l, &ids[1], |c| c.min_width = 90);
        l.resize_entity(&ids[0], Rect::new(0, 0, 130, 100)).unwrap();
        assert_eq!(l.bounds(&ids[0]), Some(Rect::new(0, 0, 130, 100)));
        assert_eq!(l.bounds(&ids[1]), Some(Rect::new(130, 0, 90, 100)));
        assert_eq!(l.bounds(&ids[2]), Some(Rect::new(220, 0, 80, 100)));
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn inner_resize_is_clamped_when_chain_is_exhausted() {
        let mut l = layout();
        let ids = row(&mut l, 2);
        constrain(&mut l, &ids[1], |c| c.min_width = 60);
        let got = l.resize_entity(&ids[0], Rect::new(0, 0, 180, 100)).unwrap();
        assert_eq!(got, Rect::new(0, 0, 140, 100));
        assert_eq!(l.bounds(&ids[1]), Some(Rect::new(140, 0, 60, 100)));
    }

    #[test]
    fn parallel_neighbors_share_the_seam() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 200);
        let b = add(&mut l, "b", 100, 0, 100, 100);
        let c = add(&mut l, "c", 100, 100, 100, 100);
        l.set_group(&[a.clone(), b.clone(), c.clone()]);
        l.resize_entity(&a, Rect::new(0, 0, 110, 200)).unwrap();
        assert_eq!(l.bounds(&b), Some(Rect::new(110, 0, 90, 100)));
        assert_eq!(l.bounds(&c), Some(Rect::new(110, 100, 90, 100)));
        assert!(l.invariant_violations().is_empty());
    }

    #[test]
    fn outer_edge_resize_leaves_neighbors_alone() {
        let mut l = layout();
        let ids = row(&mut l, 2);
        l.resize_entity(&ids[1], Rect::new(100, 0, 150, 100)).unwrap();
        assert_eq!(l.bounds(&ids[0]), Some(Rect::new(0, 0, 100, 100)));
        assert_eq!(l.bounds(&ids[1]), Some(Rect::new(100, 0, 150, 100)));
    }

    #[test]
    fn outer_shrink_below_min_pushes_the_chain() {
        let mut l = layout();
        let ids = row(&mut l, 2);
        constrain(&mut l, &ids[1], |c| c.min_width = 80);
        l.resize_entity(&ids[1], Rect::new(100, 0, 50, 100)).unwrap();
        assert_eq!(l.bounds(&ids[1]), Some(Rect::new(70, 0, 80, 100)));
        assert_eq!(l.bounds(&ids[0]), Some(Rect::new(0, 0, 70, 100)));
    }

    #[test]
    fn entities_outside_the_seam_are_unaffected() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 0, 100, 100, 100);
        l.set_group(&[a.clone(), b.clone()]);
        l.resize_entity(&a, Rect::new(0, 0, 140, 100)).unwrap();
        assert_eq!(l.bounds(&a), Some(Rect::new(0, 0, 140, 100)));
        assert_eq!(l.bounds(&b), Some(Rect::new(0, 100, 100, 100)));
        assert!(l.is_grouped(&a));
    }

    #[test]
    fn perpendicular_adjacency_is_never_lost() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        let b = add(&mut l, "b", 50, 100, 100, 100);
        l.set_group(&[a.clone(), b.clone()]);
        let got = l.resize_entity(&a, Rect::new(0, 0, 20, 100)).unwrap();
        assert_eq!(got, Rect::new(0, 0, 51, 100));
        assert!(l.is_grouped(&a));
    }

    #[test]
    fn disabled_resize_region_blocks_the_edge() {
        let mut l = layout();
        let a = add(&mut l, "a", 0, 0, 100, 100);
        constrain(&mut l, &a, |c| c.resize_regions.right = false);
        let got = l.resize_entity(&a, Rect::new(0, 0, 150, 150)).unwrap();
        assert_eq!(got, Rect::new(0, 0, 100, 150));
    }

    #[test]
    fn resize_of_unknown_entity_fails() {
        let mut l = layout();
        let ghost = EntityId::Window("ghost".into());
        assert_eq!(
            l.resize_entity(&ghost, Rect::new(0, 0, 1, 1)),
            Err(LayoutError::UnknownEntity(ghost))
        );
    }
}
