//! State of one routing attempt.

use std::collections::BTreeSet;

use pcb_common::db::board::Board;
use pcb_common::db::item::ItemKind;
use pcb_common::db::ItemId;
use pcb_common::geom::{FloatLine, FloatPoint, TileShape};

use crate::control::ArtControl;
use crate::geometry::TileGeometry;
use crate::rooms::{DoorKind, DrillPages, RoomGraph, RoomKind};
use crate::tree::SearchTree;

/// Pin of the connection that a trace may enter with a narrower width.
#[derive(Clone, Copy, Debug)]
struct NeckPin {
    centre: FloatPoint,
    reach: f64,
    half_width: i64,
}

/// Rooms, doors and drills created while routing one connection.
///
/// Complete rooms are entered into the search tree as they are created and
/// taken out again by [`AutorouteContext::clear`], which also runs on drop.
pub struct AutorouteContext<'a, G: TileGeometry> {
    pub board: &'a Board,
    pub control: &'a ArtControl,
    pub geometry: G,
    pub(crate) tree: &'a mut SearchTree<G::Bounds>,
    pub graph: RoomGraph,
    pub(crate) drills: DrillPages,
    pub start_items: BTreeSet<ItemId>,
    pub dest_items: BTreeSet<ItemId>,
    neck_pins: Vec<NeckPin>,
    board_shape: TileShape,
}

impl<'a, G: TileGeometry> AutorouteContext<'a, G> {
    pub fn new(
        board: &'a Board,
        control: &'a ArtControl,
        tree: &'a mut SearchTree<G::Bounds>,
        geometry: G,
        start_items: BTreeSet<ItemId>,
        dest_items: BTreeSet<ItemId>,
    ) -> Self {
        let neck_pins = if control.with_neckdown {
            start_items
                .iter()
                .chain(&dest_items)
                .filter_map(|&id| board.item(id))
                .filter(|item| matches!(item.kind, ItemKind::Pin(_)))
                .filter_map(|item| {
                    Some(NeckPin {
                        centre: item.centre()?.to_float(),
                        reach: item.max_pad_width() as f64,
                        half_width: item.neckdown_half_width()?,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        let bounding_box = board.bounding_box();
        Self {
            board,
            control,
            geometry,
            tree,
            graph: RoomGraph::default(),
            drills: DrillPages::new(bounding_box, control.drill_page_width),
            start_items,
            dest_items,
            neck_pins,
            board_shape: TileShape::Box(bounding_box),
        }
    }

    pub fn board_shape(&self) -> &TileShape {
        &self.board_shape
    }

    pub fn tree(&self) -> &SearchTree<G::Bounds> {
        &*self.tree
    }

    /// Half width a trace may use when crossing a door near `p`: the
    /// narrowest neckdown width of a connection pin in reach, if any.
    pub(crate) fn neck_half_width(&self, p: FloatPoint) -> Option<i64> {
        self.neck_pins
            .iter()
            .filter(|pin| pin.centre.distance(p) <= pin.reach)
            .map(|pin| pin.half_width)
            .min()
    }

    /// Crossable pieces of a door on `layer`.
    pub(crate) fn door_sections(
        &self,
        shape: &TileShape,
        kind: DoorKind,
        layer: usize,
    ) -> Vec<FloatLine> {
        if kind == DoorKind::Overlap {
            return vec![FloatLine::point(shape.centre())];
        }
        let Some((a, b)) = shape.extreme_points() else {
            return Vec::new();
        };
        let door = FloatLine::new(a, b);
        let full = self.control.compensated_trace_half_width[layer] as f64;
        let shrunk = door.shrink(full).or_else(|| {
            let neck = self.neck_half_width(door.middle())?;
            door.shrink((neck + self.control.compensation[layer]) as f64)
        });
        let Some(shrunk) = shrunk else {
            return Vec::new();
        };
        // At most one section per board unit.
        let count = (shrunk.length() / self.control.door_section_length)
            .ceil()
            .clamp(1.0, shrunk.length().ceil().max(1.0));
        shrunk.divide(count as usize)
    }

    /// Removes the rooms of this attempt from the search tree and forgets
    /// all rooms, doors and drills.
    pub fn clear(&mut self) {
        let mut removed = 0;
        for (id, room) in self.graph.rooms() {
            if matches!(room.kind, RoomKind::Complete { .. }) && self.tree.remove_room(id) {
                removed += 1;
            }
        }
        if removed > 0 {
            log::trace!("removed {} rooms from the search tree", removed);
        }
        self.graph = RoomGraph::default();
        self.drills = DrillPages::new(self.board.bounding_box(), self.control.drill_page_width);
    }
}

impl<G: TileGeometry> Drop for AutorouteContext<'_, G> {
    fn drop(&mut self) {
        self.clear();
    }
}
