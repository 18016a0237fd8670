//! Doors of complete rooms and obstacle rooms.
//!
//! Every border piece of a room that no neighbour touches becomes a new
//! incomplete room on the far side, with a door back to the room.

use pcb_common::db::item::{Item, ItemKind};
use pcb_common::db::ItemId;
use pcb_common::geom::shape_tree::TreeEntry;
use pcb_common::geom::{Dimension, FloatLine, FloatPoint, IntPoint, Line, TileShape, EPS};
use pcb_common::util::config::NonTraceDoorPolicy;

use crate::context::AutorouteContext;
use crate::geometry::TileGeometry;
use crate::rooms::{DoorKind, RoomId, RoomKind};
use crate::tree::TreeOwner;

/// Distance the ends of a gap are pulled in before snapping to the grid.
const GAP_INSET: f64 = 1.0;

/// Gaps shorter than this after snapping get no room.
const MIN_GAP: f64 = 2.0;

#[derive(Clone, Debug)]
enum NeighbourRef {
    Room(RoomId),
    Obstacle {
        item: ItemId,
        shape_index: usize,
        shape: TileShape,
    },
    /// Covers the border but offers no door.
    Blocked,
}

#[derive(Clone, Debug)]
struct Neighbour {
    side: usize,
    from: f64,
    to: f64,
    shape: TileShape,
    target: NeighbourRef,
}

#[derive(Default)]
struct Touching {
    neighbours: Vec<Neighbour>,
    targets: Vec<(ItemId, usize, TileShape)>,
}

/// Side of `edges` that `touching` lies on, with its parameter range along it.
fn side_range(
    shape: &TileShape,
    edges: &[(Line, FloatLine)],
    touching: &TileShape,
) -> Option<(usize, f64, f64)> {
    let side = shape.touching_side(touching)?;
    let (_, edge) = edges.get(side)?;
    let len = edge.length();
    if len <= EPS {
        return None;
    }
    let dir = (edge.b - edge.a) * (1.0 / len);
    let (p, q) = touching.extreme_points()?;
    let (s, t) = ((p - edge.a).dot(dir), (q - edge.a).dot(dir));
    Some((side, s.min(t).clamp(0.0, len), s.max(t).clamp(0.0, len)))
}

/// Uncovered parameter ranges of `[0, len]`.
fn gaps(mut covered: Vec<(f64, f64)>, len: f64) -> Vec<(f64, f64)> {
    covered.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut result = Vec::new();
    let mut reached = 0.0;
    for (from, to) in covered {
        if from > reached + EPS {
            result.push((reached, from));
        }
        reached = f64::max(reached, to);
    }
    if len > reached + EPS {
        result.push((reached, len));
    }
    result
}

/// Integer point near `p` on `side` or on its outer side, moved towards `towards`.
fn snap_outward(side: &Line, p: FloatPoint, towards: FloatPoint) -> IntPoint {
    let q = side.grid_point_towards(p, towards);
    if side.side_of(q) <= 0 {
        return q;
    }
    let (fx, fy) = (p.x.floor() as i64, p.y.floor() as i64);
    [(0, 0), (1, 0), (0, 1), (1, 1)]
        .into_iter()
        .map(|(dx, dy)| IntPoint::new(fx + dx, fy + dy))
        .filter(|c| side.side_of(*c) <= 0)
        .min_by(|a, b| a.to_float().distance(p).total_cmp(&b.to_float().distance(p)))
        .unwrap_or(q)
}

impl<G: TileGeometry> AutorouteContext<'_, G> {
    /// True if a trace may rip `item` by entering its obstacle room.
    pub(crate) fn admits_obstacle_door(&self, item: &Item) -> bool {
        if !self.control.ripup_allowed || item.fixed || !item.is_route() {
            return false;
        }
        match item.kind {
            ItemKind::Trace(_) => true,
            _ => self.control.non_trace_door_policy == NonTraceDoorPolicy::Admit,
        }
    }

    fn touching(&self, id: RoomId) -> Touching {
        let room = self.graph.room(id);
        let (shape, layer) = (&room.shape, room.layer);
        let own_item = room.obstacle_item();
        let edges = shape.border_edges();
        let mut result = Touching::default();
        for entry in self.tree.overlapping(shape, layer) {
            let overlap = shape.intersection(&entry.shape);
            let dimension = overlap.dimension();
            let target = match entry.key.owner {
                TreeOwner::Room(other) if other == id || !self.graph.room(other).is_complete() => {
                    continue;
                }
                TreeOwner::Room(other) => NeighbourRef::Room(other),
                TreeOwner::Item(item_id) if Some(item_id) == own_item => continue,
                TreeOwner::Item(item_id) => {
                    let Some(item) = self.board.item(item_id) else {
                        continue;
                    };
                    if !item.is_obstacle_for(self.control.net) {
                        let connection = own_item
                            .is_none()
                            .then(|| item.trace_connection_shape(entry.key.shape_index))
                            .flatten();
                        if let Some(connection) = connection {
                            let target = connection.intersection(shape);
                            if target.dimension() != Dimension::Empty {
                                result.targets.push((item_id, entry.key.shape_index, target));
                            }
                        }
                        continue;
                    }
                    if own_item.is_none() && self.admits_obstacle_door(item) {
                        NeighbourRef::Obstacle {
                            item: item_id,
                            shape_index: entry.key.shape_index,
                            shape: entry.shape.clone(),
                        }
                    } else {
                        NeighbourRef::Blocked
                    }
                }
            };
            match dimension {
                Dimension::Line => match side_range(shape, &edges, &overlap) {
                    Some((side, from, to)) => result.neighbours.push(Neighbour {
                        side,
                        from,
                        to,
                        shape: overlap,
                        target,
                    }),
                    None => log::debug!("{:?} touches {:?} off its border", entry.key.owner, id),
                },
                Dimension::Area if own_item.is_none() => {
                    log::warn!("{:?} overlaps {:?} on layer {}", entry.key.owner, id, layer)
                }
                _ => {}
            }
        }
        result
            .neighbours
            .sort_by(|a, b| a.side.cmp(&b.side).then(a.from.total_cmp(&b.from)));
        result
    }

    fn on_board_border(&self, line: &Line) -> bool {
        self.board_shape().border_lines().iter().any(|b| b.is_equal_or_opposite(line))
    }

    /// Drops border `side` of the room and completes again around the old
    /// shape. Accepted only if the area grows.
    fn enlarge_room(&mut self, id: RoomId, side: usize) -> bool {
        let room = self.graph.room(id);
        let (old, layer) = (room.shape.clone(), room.layer);
        let start = old.without_border_line(side).intersection(self.board_shape());
        let grown = self
            .complete_shape(&start, &old, layer, Some(id))
            .map(|shape| self.split_whole_board(shape, &old));
        match grown {
            Ok(shape) if shape.area() > old.area() + EPS && shape.contains_shape(&old) => {
                log::trace!(
                    "enlarged {:?} across side {} from {:.0} to {:.0}",
                    id,
                    side,
                    old.area(),
                    shape.area()
                );
                self.tree.remove_room(id);
                self.tree.insert_room(id, shape.clone(), layer);
                self.graph.room_mut(id).shape = shape;
                true
            }
            _ => false,
        }
    }

    /// Doors to the neighbours of a complete room, target doors to the net's
    /// items in it and incomplete rooms for the border pieces left over.
    pub fn calculate_doors(&mut self, id: RoomId) {
        if self.graph.room(id).doors_calculated() {
            return;
        }
        let mut passes = 0;
        let mut failed: Vec<usize> = Vec::new();
        let touching = loop {
            let touching = self.touching(id);
            let edges = self.graph.room(id).shape.border_edges();
            let bare = (0..edges.len()).find(|&side| {
                !failed.contains(&side)
                    && !self.on_board_border(&edges[side].0)
                    && !touching.neighbours.iter().any(|n| n.side == side)
            });
            match bare {
                Some(side) if passes < self.control.max_enlarge_passes => {
                    passes += 1;
                    if self.enlarge_room(id, side) {
                        failed.clear();
                    } else {
                        failed.push(side);
                    }
                }
                _ => break touching,
            }
        };
        let layer = self.graph.room(id).layer;
        for neighbour in &touching.neighbours {
            let other = match &neighbour.target {
                NeighbourRef::Room(other) => *other,
                NeighbourRef::Obstacle {
                    item,
                    shape_index,
                    shape,
                } => self.graph.add_obstacle_room(*item, *shape_index, shape.clone(), layer),
                NeighbourRef::Blocked => continue,
            };
            if self.graph.find_door(id, other).is_none() {
                let sections = self.door_sections(&neighbour.shape, DoorKind::Line, layer);
                self.graph.add_door(id, other, neighbour.shape.clone(), DoorKind::Line, sections);
            }
        }
        for (item, shape_index, shape) in touching.targets {
            let known = self.graph.room(id).targets().iter().any(|&t| {
                let target = self.graph.target(t);
                target.item == item && target.shape_index == shape_index
            });
            if !known {
                self.graph.add_target(id, item, shape_index, shape);
            }
        }
        self.add_gap_rooms(id, &touching.neighbours);
        self.graph.mark_doors_calculated(id);
    }

    /// True if the obstacle room of `item` shape `shape_index` gets an
    /// overlap door to the tree entry `other`: another shape of the same
    /// item, or a rippable item of the same net.
    fn joins_obstacle_room(
        &self,
        item: ItemId,
        shape_index: usize,
        other: &TreeEntry<TreeOwner>,
    ) -> bool {
        match other.key.owner {
            TreeOwner::Item(id) if id == item => other.key.shape_index != shape_index,
            TreeOwner::Item(id) => {
                let (Some(own), Some(candidate)) = (self.board.item(item), self.board.item(id))
                else {
                    return false;
                };
                own.shares_net(candidate)
                    && candidate.is_obstacle_for(self.control.net)
                    && self.admits_obstacle_door(candidate)
            }
            TreeOwner::Room(_) => false,
        }
    }

    /// Doors of an obstacle room: to touching complete rooms, overlap doors
    /// to the other shapes of the same item and to obstacle rooms of the same
    /// net, and incomplete rooms along the free parts of its border.
    pub fn calculate_obstacle_doors(&mut self, id: RoomId) {
        let room = self.graph.room(id);
        let RoomKind::Obstacle {
            item,
            shape_index,
            doors_calculated: false,
        } = room.kind
        else {
            return;
        };
        let (shape, layer) = (room.shape.clone(), room.layer);
        for entry in self.tree.overlapping(&shape, layer) {
            let TreeOwner::Item(other_item) = entry.key.owner else {
                continue;
            };
            if !self.joins_obstacle_room(item, shape_index, &entry) {
                continue;
            }
            let overlap = shape.intersection(&entry.shape);
            if overlap.dimension() < Dimension::Line {
                continue;
            }
            let other = self
                .graph
                .add_obstacle_room(other_item, entry.key.shape_index, entry.shape.clone(), layer);
            let sections = self.door_sections(&overlap, DoorKind::Overlap, layer);
            self.graph.add_door(id, other, overlap, DoorKind::Overlap, sections);
        }
        let touching = self.touching(id);
        for neighbour in &touching.neighbours {
            if let NeighbourRef::Room(other) = neighbour.target {
                if self.graph.find_door(id, other).is_none() {
                    let shape = neighbour.shape.clone();
                    let sections = self.door_sections(&shape, DoorKind::Line, layer);
                    self.graph.add_door(id, other, shape, DoorKind::Line, sections);
                }
            }
        }
        self.add_gap_rooms(id, &touching.neighbours);
        self.graph.mark_doors_calculated(id);
    }

    fn add_gap_rooms(&mut self, id: RoomId, neighbours: &[Neighbour]) {
        let room = self.graph.room(id);
        let layer = room.layer;
        let edges = room.shape.border_edges();
        for (side, (line, edge)) in edges.iter().enumerate() {
            if self.on_board_border(line) {
                continue;
            }
            let covered: Vec<(f64, f64)> = neighbours
                .iter()
                .filter(|n| n.side == side)
                .map(|n| (n.from, n.to))
                .collect();
            for (from, to) in gaps(covered, edge.length()) {
                self.add_gap_room(id, layer, line, edge, from, to);
            }
        }
    }

    fn add_gap_room(
        &mut self,
        id: RoomId,
        layer: usize,
        side: &Line,
        edge: &FloatLine,
        from: f64,
        to: f64,
    ) {
        if to - from < MIN_GAP + 2.0 * GAP_INSET {
            return;
        }
        let dir = (edge.b - edge.a) * (1.0 / edge.length());
        let a = edge.a + dir * (from + GAP_INSET);
        let b = edge.a + dir * (to - GAP_INSET);
        let middle = a.middle(b);
        let (pa, pb) = (snap_outward(side, a, middle), snap_outward(side, b, middle));
        if pa.distance(pb) < MIN_GAP {
            return;
        }
        let contained = TileShape::segment(pa, pb);
        let start = self.board_shape().intersection_with_halfplane(&side.opposite());
        if start.dimension() != Dimension::Area {
            return;
        }
        let gap_room = self.graph.add_room(
            start,
            layer,
            RoomKind::Incomplete {
                contained: contained.clone(),
            },
        );
        let sections = self.door_sections(&contained, DoorKind::Line, layer);
        self.graph.add_door(id, gap_room, contained, DoorKind::Line, sections);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::IntBox;

    #[test]
    fn gaps_between_covered_ranges() {
        assert_eq!(gaps(vec![], 10.0), vec![(0.0, 10.0)]);
        assert_eq!(gaps(vec![(6.0, 10.0), (0.0, 2.0)], 10.0), vec![(2.0, 6.0)]);
        assert!(gaps(vec![(0.0, 7.0), (3.0, 10.0)], 10.0).is_empty());
    }

    #[test]
    fn sides_are_found_with_their_range() {
        let room = TileShape::Box(IntBox::from_coords(0, 0, 100, 50));
        let edges = room.border_edges();
        let touching = TileShape::segment(IntPoint::new(100, 10), IntPoint::new(100, 30));
        assert_eq!(side_range(&room, &edges, &touching), Some((1, 10.0, 30.0)));
        let top = TileShape::segment(IntPoint::new(20, 50), IntPoint::new(80, 50));
        // the top edge runs from right to left
        assert_eq!(side_range(&room, &edges, &top), Some((2, 20.0, 80.0)));
    }

    #[test]
    fn snapped_gap_ends_stay_outside() {
        let side = Line::new(IntPoint::new(0, 0), IntPoint::new(7, 3));
        let p = FloatPoint::new(3.5, 1.5);
        let q = snap_outward(&side, p, FloatPoint::new(0.0, 0.0));
        assert!(side.side_of(q) <= 0);
        assert!(q.to_float().distance(p) < 1.5);
        let axis = Line::new(IntPoint::new(0, 10), IntPoint::new(1, 10));
        assert_eq!(
            snap_outward(&axis, FloatPoint::new(4.4, 10.0), FloatPoint::new(9.0, 10.0)),
            IntPoint::new(5, 10)
        );
    }

    fn board_with_via_and_trace() -> (pcb_common::db::board::Board, ItemId, ItemId) {
        use pcb_common::db::board::{Board, Layer, LayerDirection};
        use pcb_common::db::rules::{ClearanceMatrix, Rules, ViaInfo};
        let layers = (0..2)
            .map(|i| Layer {
                name: format!("L{}", i),
                is_signal: true,
                direction: LayerDirection::Unknown,
            })
            .collect();
        let mut rules = Rules::new(ClearanceMatrix::new(vec!["default".into()], 2, 100), 50);
        rules.via_infos.push(ViaInfo {
            name: "v".into(),
            first_layer: 0,
            last_layer: 1,
            radius: 150,
            clearance_class: 0,
            attach_smd_allowed: false,
        });
        let mut board = Board::new(layers, IntBox::from_coords(0, 0, 10000, 10000), rules);
        board.rules.add_net("A", 0);
        let other = board.rules.add_net("B", 0);
        let via = board.add_via(IntPoint::new(5000, 5000), 0, vec![other], 0, false).unwrap();
        let trace = board
            .add_trace(
                vec![IntPoint::new(1000, 1000), IntPoint::new(3000, 1000)],
                50,
                0,
                vec![other],
                0,
            )
            .unwrap();
        (board, via, trace)
    }

    #[test]
    fn non_trace_obstacle_doors_follow_the_policy() {
        use crate::control::ArtControl;
        use crate::geometry::SimplexGeometry;
        use crate::tree::TreeStore;
        use pcb_common::db::NetId;
        use pcb_common::util::config::AutorouteConfig;
        use std::collections::BTreeSet;

        let (board, via, trace) = board_with_via_and_trace();
        let policies = [(NonTraceDoorPolicy::Admit, true), (NonTraceDoorPolicy::Reject, false)];
        for (policy, via_admitted) in policies {
            let config = AutorouteConfig {
                ripup_allowed: true,
                non_trace_door_policy: policy,
                ..AutorouteConfig::default()
            };
            let control = ArtControl::new(&board, NetId::new(0), &config);
            let mut trees = TreeStore::default();
            let tree = trees.get(&board, 0, &SimplexGeometry);
            let ctx = AutorouteContext::new(
                &board,
                &control,
                tree,
                SimplexGeometry,
                BTreeSet::new(),
                BTreeSet::new(),
            );
            let via_item = board.item(via).unwrap();
            let trace_item = board.item(trace).unwrap();
            assert_eq!(ctx.admits_obstacle_door(via_item), via_admitted);
            assert!(ctx.admits_obstacle_door(trace_item));
        }
    }

    #[test]
    fn no_obstacle_doors_without_ripup() {
        use crate::control::ArtControl;
        use crate::geometry::SimplexGeometry;
        use crate::tree::TreeStore;
        use pcb_common::db::NetId;
        use pcb_common::util::config::AutorouteConfig;
        use std::collections::BTreeSet;

        let (mut board, via, trace) = board_with_via_and_trace();
        let config = AutorouteConfig::default();
        let control = ArtControl::new(&board, NetId::new(0), &config);
        {
            let mut trees = TreeStore::default();
            let tree = trees.get(&board, 0, &SimplexGeometry);
            let ctx = AutorouteContext::new(
                &board,
                &control,
                tree,
                SimplexGeometry,
                BTreeSet::new(),
                BTreeSet::new(),
            );
            assert!(!ctx.admits_obstacle_door(board.item(via).unwrap()));
            assert!(!ctx.admits_obstacle_door(board.item(trace).unwrap()));
        }
        board.set_fixed(trace, true).unwrap();
        let config = AutorouteConfig {
            ripup_allowed: true,
            ..AutorouteConfig::default()
        };
        let control = ArtControl::new(&board, NetId::new(0), &config);
        let mut trees = TreeStore::default();
        let tree = trees.get(&board, 0, &SimplexGeometry);
        let ctx = AutorouteContext::new(
            &board,
            &control,
            tree,
            SimplexGeometry,
            BTreeSet::new(),
            BTreeSet::new(),
        );
        assert!(!ctx.admits_obstacle_door(board.item(trace).unwrap()));
    }

    #[test]
    fn obstacle_rooms_of_one_net_share_overlap_doors() {
        use crate::control::ArtControl;
        use crate::geometry::SimplexGeometry;
        use crate::tree::TreeStore;
        use pcb_common::db::board::{Board, Layer, LayerDirection};
        use pcb_common::db::rules::{ClearanceMatrix, Rules};
        use pcb_common::util::config::AutorouteConfig;
        use std::collections::BTreeSet;

        let layers = vec![Layer {
            name: "L0".into(),
            is_signal: true,
            direction: LayerDirection::Unknown,
        }];
        let rules = Rules::new(ClearanceMatrix::new(vec!["default".into()], 1, 100), 50);
        let mut board = Board::new(layers, IntBox::from_coords(0, 0, 10000, 10000), rules);
        let net = board.rules.add_net("A", 0);
        let b = board.rules.add_net("B", 0);
        let c = board.rules.add_net("C", 0);
        let p = IntPoint::new;
        let mut trace =
            |from, to, net| board.add_trace(vec![from, to], 50, 0, vec![net], 0).unwrap();
        let first = trace(p(1000, 1000), p(3000, 1000), b);
        let second = trace(p(3000, 1000), p(3000, 3000), b);
        let crossing = trace(p(2000, 500), p(2000, 1500), c);

        let config = AutorouteConfig {
            ripup_allowed: true,
            ..AutorouteConfig::default()
        };
        let control = ArtControl::new(&board, net, &config);
        let mut trees = TreeStore::default();
        let tree = trees.get(&board, 0, &SimplexGeometry);
        let mut ctx = AutorouteContext::new(
            &board,
            &control,
            tree,
            SimplexGeometry,
            BTreeSet::new(),
            BTreeSet::new(),
        );
        let shape = ctx.tree().item_shape(first, 0).unwrap();
        let room = ctx.graph.add_obstacle_room(first, 0, shape, 0);

        ctx.calculate_obstacle_doors(room);

        let joined = ctx
            .graph
            .obstacle_room(second, 0)
            .expect("no room for the trace of the same net");
        let door = ctx.graph.find_door(room, joined).unwrap();
        assert_eq!(ctx.graph.door(door).kind, DoorKind::Overlap);
        assert!(ctx.graph.obstacle_room(crossing, 0).is_none());
    }
}
