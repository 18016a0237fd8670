//! Via locations offered to the maze search.
//!
//! The board is tiled into square pages. A page computes its drills on first
//! use: the page is cut by every obstacle enlarged for the largest via, and
//! each remaining convex piece gets one drill at its centre.

use pcb_common::geom::{IntBox, IntPoint, TileShape};

use super::RoomId;
use crate::context::AutorouteContext;
use crate::geometry::TileGeometry;
use crate::tree::TreeOwner;

pcb_common::define_index!(DrillId);

/// Upper bound for the pieces of one page.
const MAX_PAGE_PIECES: usize = 512;

/// Extra factor on the via radius for the octagon around a round via.
const VIA_OCTAGON_FACTOR: f64 = 1.09;

#[derive(Clone, Debug)]
pub struct Drill {
    pub location: IntPoint,
    pub first_layer: usize,
    pub last_layer: usize,
    rooms: Vec<Option<RoomId>>,
}

impl Drill {
    pub fn spans(&self, layer: usize) -> bool {
        layer >= self.first_layer && layer <= self.last_layer
    }

    pub fn room(&self, layer: usize) -> Option<RoomId> {
        if !self.spans(layer) {
            return None;
        }
        self.rooms[layer - self.first_layer]
    }
}

pub struct DrillPages {
    bounds: IntBox,
    page_width: i64,
    columns: usize,
    rows: usize,
    pages: Vec<Option<Vec<DrillId>>>,
    drills: Vec<Drill>,
}

impl DrillPages {
    pub fn new(bounds: IntBox, page_width: i64) -> Self {
        let page_width = page_width.max(1);
        let (columns, rows) = if bounds.is_empty() {
            (0, 0)
        } else {
            (
                ((bounds.width() + page_width - 1) / page_width).max(1) as usize,
                ((bounds.height() + page_width - 1) / page_width).max(1) as usize,
            )
        };
        Self {
            bounds,
            page_width,
            columns,
            rows,
            pages: vec![None; columns * rows],
            drills: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_box(&self, index: usize) -> IntBox {
        let (col, row) = ((index % self.columns) as i64, (index / self.columns) as i64);
        let ll = IntPoint::new(
            self.bounds.ll.x + col * self.page_width,
            self.bounds.ll.y + row * self.page_width,
        );
        let ur = IntPoint::new(
            (ll.x + self.page_width).min(self.bounds.ur.x),
            (ll.y + self.page_width).min(self.bounds.ur.y),
        );
        IntBox::new(ll, ur)
    }

    pub fn pages_overlapping(&self, area: &IntBox) -> Vec<usize> {
        let clipped = area.intersection(&self.bounds);
        if clipped.is_empty() || self.columns == 0 {
            return Vec::new();
        }
        let column =
            |x: i64| (((x - self.bounds.ll.x) / self.page_width) as usize).min(self.columns - 1);
        let row = |y: i64| (((y - self.bounds.ll.y) / self.page_width) as usize).min(self.rows - 1);
        let mut result = Vec::new();
        for r in row(clipped.ll.y)..=row(clipped.ur.y) {
            for c in column(clipped.ll.x)..=column(clipped.ur.x) {
                result.push(r * self.columns + c);
            }
        }
        result
    }

    pub fn page_drills(&self, page: usize) -> Option<&[DrillId]> {
        self.pages.get(page)?.as_deref()
    }

    fn set_page_drills(
        &mut self,
        page: usize,
        locations: Vec<IntPoint>,
        first_layer: usize,
        last_layer: usize,
    ) {
        let ids = locations
            .into_iter()
            .map(|location| {
                let id = DrillId::new(self.drills.len());
                self.drills.push(Drill {
                    location,
                    first_layer,
                    last_layer,
                    rooms: vec![None; last_layer + 1 - first_layer],
                });
                id
            })
            .collect();
        self.pages[page] = Some(ids);
    }

    pub fn drill(&self, id: DrillId) -> &Drill {
        &self.drills[id.index()]
    }

    pub fn len(&self) -> usize {
        self.drills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drills.is_empty()
    }

    fn set_room(&mut self, id: DrillId, layer: usize, room: RoomId) {
        let drill = &mut self.drills[id.index()];
        if drill.spans(layer) {
            drill.rooms[layer - drill.first_layer] = Some(room);
        }
    }
}

/// One location per convex piece of `page` left after removing `obstacles`.
pub fn drill_locations(page: &TileShape, obstacles: &[TileShape]) -> Vec<IntPoint> {
    let mut pieces = vec![page.clone()];
    for obstacle in obstacles {
        pieces = pieces.iter().flat_map(|piece| piece.cutout(obstacle)).collect();
        if pieces.len() > MAX_PAGE_PIECES {
            log::debug!(
                "drill page cut into {} pieces, keeping the first {}",
                pieces.len(),
                MAX_PAGE_PIECES
            );
            pieces.truncate(MAX_PAGE_PIECES);
        }
    }
    let mut locations: Vec<IntPoint> = Vec::with_capacity(pieces.len());
    for piece in &pieces {
        let p = piece.centre().round();
        let inside = piece.contains(p.to_float())
            && !obstacles.iter().any(|o| o.contains_inside(p.to_float()));
        if inside && !locations.contains(&p) {
            locations.push(p);
        }
    }
    locations
}

impl<G: TileGeometry> AutorouteContext<'_, G> {
    /// Drills of the pages under `shape` whose location lies in `shape`.
    pub(crate) fn drills_in(&mut self, shape: &TileShape) -> Vec<DrillId> {
        let mut result = Vec::new();
        for page in self.drills.pages_overlapping(&shape.bounding_box()) {
            if self.drills.page_drills(page).is_none() {
                self.calculate_page_drills(page);
            }
            for &id in self.drills.page_drills(page).unwrap_or(&[]) {
                if shape.contains(self.drills.drill(id).location.to_float()) {
                    result.push(id);
                }
            }
        }
        result
    }

    fn calculate_page_drills(&mut self, page: usize) {
        let vias: Vec<_> = self
            .control
            .via_rule
            .iter()
            .filter_map(|&i| self.board.rules.via_infos.get(i))
            .collect();
        let last_board_layer = self.board.layer_count().saturating_sub(1);
        let first_layer = vias.iter().map(|v| v.first_layer).min().unwrap_or(0);
        let last_layer = vias
            .iter()
            .map(|v| v.last_layer)
            .max()
            .unwrap_or(0)
            .min(last_board_layer);
        let page_shape = TileShape::Box(self.drills.page_box(page));
        let max_radius = self.control.max_via_radius(self.board) as f64;
        let radius = (VIA_OCTAGON_FACTOR * max_radius).ceil() as i64;
        let mut obstacles = Vec::new();
        for layer in first_layer..=last_layer {
            let enlargement = (radius + self.control.compensation[layer]) as f64;
            for entry in self.tree.overlapping(&page_shape.offset(enlargement), layer) {
                let TreeOwner::Item(id) = entry.key.owner else {
                    continue;
                };
                if self.board.item(id).is_some_and(|i| i.is_obstacle_for(self.control.net)) {
                    obstacles.push(entry.shape.offset(enlargement));
                }
            }
        }
        let locations = drill_locations(&page_shape, &obstacles);
        log::trace!("drill page {} has {} drills", page, locations.len());
        if first_layer <= last_layer {
            self.drills.set_page_drills(page, locations, first_layer, last_layer);
        } else {
            self.drills.set_page_drills(page, Vec::new(), 0, 0);
        }
    }

    /// Complete room on `layer` containing the drill, found or created on first use.
    pub(crate) fn drill_room(&mut self, id: DrillId, layer: usize) -> Option<RoomId> {
        let drill = self.drills.drill(id);
        if let Some(room) = drill.room(layer) {
            return Some(room);
        }
        if !drill.spans(layer) {
            return None;
        }
        let location = TileShape::point(drill.location);
        let room = self.room_containing(&location, layer)?;
        self.drills.set_room(id, layer, room);
        Some(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_tile_the_board() {
        let pages = DrillPages::new(IntBox::from_coords(0, 0, 250, 100), 100);
        assert_eq!(pages.page_count(), 3);
        assert_eq!(pages.page_box(2), IntBox::from_coords(200, 0, 250, 100));
        assert_eq!(pages.pages_overlapping(&IntBox::from_coords(150, 10, 210, 20)), vec![1, 2]);
        assert!(pages.pages_overlapping(&IntBox::from_coords(300, 0, 400, 10)).is_empty());
    }

    #[test]
    fn one_drill_per_free_piece() {
        let page = TileShape::Box(IntBox::from_coords(0, 0, 100, 100));
        let obstacle = TileShape::Box(IntBox::from_coords(40, 40, 60, 60));
        let drills = drill_locations(&page, std::slice::from_ref(&obstacle));
        assert_eq!(drills.len(), 4);
        for p in drills {
            assert!(page.contains(p.to_float()));
            assert!(!obstacle.contains_inside(p.to_float()), "{:?}", p);
        }
    }

    #[test]
    fn covered_page_has_no_drills() {
        let page = TileShape::Box(IntBox::from_coords(0, 0, 100, 100));
        let obstacle = TileShape::Box(IntBox::from_coords(-10, -10, 110, 110));
        assert!(drill_locations(&page, &[obstacle]).is_empty());
    }
}
