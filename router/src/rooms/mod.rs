//! Expansion rooms, doors and target doors of one routing attempt.
//!
//! Everything lives in a [`RoomGraph`] arena addressed by small ids. Rooms
//! reference doors and doors reference rooms by id only, and the whole arena
//! is dropped when the attempt ends.

pub mod drill;

use std::collections::HashMap;

use pcb_common::db::ItemId;
use pcb_common::geom::{FloatLine, FloatPoint, TileShape};

pub use drill::{Drill, DrillId, DrillPages};

pcb_common::define_index!(RoomId);
pcb_common::define_index!(DoorId);
pcb_common::define_index!(TargetId);

#[derive(Clone, Debug)]
pub enum RoomKind {
    /// Free space whose shape may still grow. Any completed shape has to
    /// keep covering `contained`.
    Incomplete { contained: TileShape },
    /// Maximal free space on one layer.
    Complete {
        targets: Vec<TargetId>,
        /// Set once a target door of the routed net was found in the room.
        net_dependent: bool,
        doors_calculated: bool,
    },
    /// One shape of a board item, entered only when ripping it.
    Obstacle {
        item: ItemId,
        shape_index: usize,
        doors_calculated: bool,
    },
    /// Incomplete room whose completion produced no area.
    Discarded,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub shape: TileShape,
    pub layer: usize,
    pub kind: RoomKind,
    pub doors: Vec<DoorId>,
}

impl Room {
    pub fn is_complete(&self) -> bool {
        matches!(self.kind, RoomKind::Complete { .. })
    }

    pub fn obstacle_item(&self) -> Option<ItemId> {
        match self.kind {
            RoomKind::Obstacle { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn targets(&self) -> &[TargetId] {
        match &self.kind {
            RoomKind::Complete { targets, .. } => targets,
            _ => &[],
        }
    }

    pub fn doors_calculated(&self) -> bool {
        match self.kind {
            RoomKind::Complete { doors_calculated, .. }
            | RoomKind::Obstacle { doors_calculated, .. } => doors_calculated,
            _ => false,
        }
    }

    fn set_doors_calculated(&mut self) {
        match &mut self.kind {
            RoomKind::Complete { doors_calculated, .. }
            | RoomKind::Obstacle { doors_calculated, .. } => {
                *doors_calculated = true
            }
            _ => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorKind {
    /// Shared piece of the two room borders.
    Line,
    /// Overlap of two obstacle rooms of the same item.
    Overlap,
}

#[derive(Clone, Debug)]
pub struct Door {
    pub first: RoomId,
    pub second: RoomId,
    pub shape: TileShape,
    pub kind: DoorKind,
    /// Pieces of the door a trace centre line may cross. Empty if the door is
    /// too narrow for the trace.
    pub sections: Vec<FloatLine>,
}

impl Door {
    pub fn other(&self, room: RoomId) -> Option<RoomId> {
        if room == self.first {
            Some(self.second)
        } else if room == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Connection shape of a net item inside a complete room.
#[derive(Clone, Debug)]
pub struct TargetDoor {
    pub room: RoomId,
    pub item: ItemId,
    pub shape_index: usize,
    pub layer: usize,
    pub shape: TileShape,
}

impl TargetDoor {
    pub fn nearest_point(&self, p: FloatPoint) -> FloatPoint {
        self.shape.nearest_point(p)
    }
}

/// Arena of the rooms, doors and target doors of one attempt, plus the
/// side-table from item shapes to their obstacle rooms.
#[derive(Default)]
pub struct RoomGraph {
    rooms: Vec<Room>,
    doors: Vec<Door>,
    targets: Vec<TargetDoor>,
    door_pairs: HashMap<(RoomId, RoomId), DoorId>,
    obstacle_rooms: HashMap<(ItemId, usize), RoomId>,
}

fn pair_key(a: RoomId, b: RoomId) -> (RoomId, RoomId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl RoomGraph {
    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.index()]
    }

    pub(crate) fn room_mut(&mut self, id: RoomId) -> &mut Room {
        &mut self.rooms[id.index()]
    }

    pub fn door(&self, id: DoorId) -> &Door {
        &self.doors[id.index()]
    }

    pub fn target(&self, id: TargetId) -> &TargetDoor {
        &self.targets[id.index()]
    }

    pub fn rooms(&self) -> impl Iterator<Item = (RoomId, &Room)> {
        self.rooms.iter().enumerate().map(|(i, r)| (RoomId::new(i), r))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn door_count(&self) -> usize {
        self.door_pairs.len()
    }

    pub fn add_room(&mut self, shape: TileShape, layer: usize, kind: RoomKind) -> RoomId {
        let id = RoomId::new(self.rooms.len());
        self.rooms.push(Room {
            shape,
            layer,
            kind,
            doors: Vec::new(),
        });
        id
    }

    pub fn obstacle_room(&self, item: ItemId, shape_index: usize) -> Option<RoomId> {
        self.obstacle_rooms.get(&(item, shape_index)).copied()
    }

    pub fn add_obstacle_room(
        &mut self,
        item: ItemId,
        shape_index: usize,
        shape: TileShape,
        layer: usize,
    ) -> RoomId {
        if let Some(id) = self.obstacle_room(item, shape_index) {
            return id;
        }
        let id = self.add_room(
            shape,
            layer,
            RoomKind::Obstacle {
                item,
                shape_index,
                doors_calculated: false,
            },
        );
        self.obstacle_rooms.insert((item, shape_index), id);
        id
    }

    pub fn find_door(&self, a: RoomId, b: RoomId) -> Option<DoorId> {
        self.door_pairs.get(&pair_key(a, b)).copied()
    }

    /// Adds a door between `a` and `b`, or returns the one that already exists.
    pub fn add_door(
        &mut self,
        a: RoomId,
        b: RoomId,
        shape: TileShape,
        kind: DoorKind,
        sections: Vec<FloatLine>,
    ) -> DoorId {
        if let Some(existing) = self.find_door(a, b) {
            return existing;
        }
        let id = DoorId::new(self.doors.len());
        self.doors.push(Door {
            first: a,
            second: b,
            shape,
            kind,
            sections,
        });
        self.door_pairs.insert(pair_key(a, b), id);
        self.rooms[a.index()].doors.push(id);
        self.rooms[b.index()].doors.push(id);
        id
    }

    /// Detaches a door from both rooms. The id stays allocated.
    pub fn remove_door(&mut self, id: DoorId) {
        let (a, b) = (self.doors[id.index()].first, self.doors[id.index()].second);
        self.door_pairs.remove(&pair_key(a, b));
        self.rooms[a.index()].doors.retain(|&d| d != id);
        self.rooms[b.index()].doors.retain(|&d| d != id);
    }

    pub fn add_target(
        &mut self,
        room: RoomId,
        item: ItemId,
        shape_index: usize,
        shape: TileShape,
    ) -> TargetId {
        let id = TargetId::new(self.targets.len());
        let layer = self.rooms[room.index()].layer;
        self.targets.push(TargetDoor {
            room,
            item,
            shape_index,
            layer,
            shape,
        });
        if let RoomKind::Complete {
            targets, net_dependent, ..
        } = &mut self.rooms[room.index()].kind
        {
            targets.push(id);
            *net_dependent = true;
        }
        id
    }

    pub(crate) fn mark_doors_calculated(&mut self, room: RoomId) {
        self.rooms[room.index()].set_doors_calculated();
    }

    pub fn complete_rooms(&self) -> impl Iterator<Item = (RoomId, &Room)> {
        self.rooms().filter(|(_, r)| r.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::{IntBox, IntPoint};

    fn b(x0: i64, y0: i64, x1: i64, y1: i64) -> TileShape {
        TileShape::Box(IntBox::from_coords(x0, y0, x1, y1))
    }

    fn complete() -> RoomKind {
        RoomKind::Complete {
            targets: Vec::new(),
            net_dependent: false,
            doors_calculated: false,
        }
    }

    #[test]
    fn one_door_per_room_pair() {
        let mut graph = RoomGraph::default();
        let left = graph.add_room(b(0, 0, 10, 10), 0, complete());
        let right = graph.add_room(b(10, 0, 20, 10), 0, complete());
        let shape = TileShape::segment(IntPoint::new(10, 0), IntPoint::new(10, 10));
        let d1 = graph.add_door(left, right, shape.clone(), DoorKind::Line, Vec::new());
        let d2 = graph.add_door(right, left, shape.clone(), DoorKind::Line, Vec::new());
        assert_eq!(d1, d2);
        assert_eq!(graph.door_count(), 1);
        assert_eq!(graph.room(left).doors, vec![d1]);
        assert_eq!(graph.room(right).doors, vec![d1]);
        assert_eq!(graph.door(d1).other(right), Some(left));
        assert_eq!(graph.door(d1).shape, shape);

        graph.remove_door(d1);
        assert!(graph.room(left).doors.is_empty());
        assert_eq!(graph.find_door(left, right), None);
    }

    #[test]
    fn targets_make_a_room_net_dependent() {
        let mut graph = RoomGraph::default();
        let room = graph.add_room(b(0, 0, 10, 10), 1, complete());
        assert!(graph.room(room).targets().is_empty());
        let t = graph.add_target(room, ItemId::new(7), 0, TileShape::point(IntPoint::new(5, 5)));
        assert_eq!(graph.room(room).targets(), &[t]);
        assert_eq!(graph.target(t).layer, 1);
        assert!(matches!(graph.room(room).kind, RoomKind::Complete { net_dependent: true, .. }));
    }

    #[test]
    fn obstacle_rooms_are_shared_per_item_shape() {
        let mut graph = RoomGraph::default();
        let a = graph.add_obstacle_room(ItemId::new(3), 1, b(0, 0, 5, 5), 0);
        let again = graph.add_obstacle_room(ItemId::new(3), 1, b(0, 0, 5, 5), 0);
        assert_eq!(a, again);
        assert_eq!(graph.room(a).obstacle_item(), Some(ItemId::new(3)));
        assert_ne!(graph.obstacle_room(ItemId::new(3), 1), graph.obstacle_room(ItemId::new(3), 0));
    }
}
