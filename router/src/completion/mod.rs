//! Growing incomplete rooms into maximal free shapes.
//!
//! A room starts as a large shape (usually the board or the part of the board
//! beyond one side of a neighbour) and is restrained against every obstacle
//! overlapping it, keeping the half-plane that leaves the most room around
//! the shape it has to contain.

pub mod doors;

use pcb_common::geom::{Dimension, GeometryWarning, IntBox, IntPoint, Line, TileShape, EPS};

use crate::context::AutorouteContext;
use crate::geometry::TileGeometry;
use crate::rooms::{RoomId, RoomKind};
use crate::tree::TreeOwner;

/// Nesting limit for splitting the contained shape.
pub const MAX_SPLIT_DEPTH: usize = 32;

/// How far the contained shape may reach into a restraining half-plane.
const CONTAIN_TOLERANCE: f64 = 1e-3;

enum Restraint {
    /// Outer half-plane of an obstacle border that keeps all of `contained`.
    Keep(Line),
    /// No border separates `contained` from the obstacle; split along this one.
    Split(Line),
}

fn restraint(obstacle: &TileShape, contained: &TileShape) -> Option<Restraint> {
    let corners = contained.corners();
    let mut keep: Option<(f64, Line)> = None;
    let mut split: Option<(f64, Line)> = None;
    for line in obstacle.border_lines() {
        let outer = line.opposite();
        let (min, max) = corners.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            let d = outer.signed_distance(*c);
            (lo.min(d), hi.max(d))
        });
        if min >= -CONTAIN_TOLERANCE && keep.is_none_or(|(best, _)| min > best) {
            keep = Some((min, outer));
        }
        if split.is_none_or(|(best, _)| max > best) {
            split = Some((max, outer));
        }
    }
    if let Some((_, line)) = keep {
        return Some(Restraint::Keep(line));
    }
    split.filter(|(max, _)| *max > CONTAIN_TOLERANCE).map(|(_, line)| Restraint::Split(line))
}

fn measure(shape: &TileShape) -> f64 {
    match shape.dimension() {
        Dimension::Area => shape.area(),
        Dimension::Line => shape.extreme_points().map(|(a, b)| a.distance(b)).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Largest part of `shape` whose interior meets no obstacle and which still
/// covers `contained`.
///
/// When no border line of an obstacle separates it from `contained`, the
/// contained shape is split along the border reaching furthest out and the
/// larger piece is kept, so the result may cover only part of it.
pub fn restrain(
    shape: &TileShape,
    contained: &TileShape,
    obstacles: &[TileShape],
) -> Result<TileShape, GeometryWarning> {
    restrain_from(shape.clone(), contained.clone(), obstacles, 0)
}

fn restrain_from(
    mut shape: TileShape,
    contained: TileShape,
    obstacles: &[TileShape],
    depth: usize,
) -> Result<TileShape, GeometryWarning> {
    if shape.dimension() != Dimension::Area {
        return Err(GeometryWarning::NotAnArea(shape.dimension()));
    }
    for obstacle in obstacles {
        if !shape.overlaps_interior(obstacle) {
            continue;
        }
        match restraint(obstacle, &contained) {
            Some(Restraint::Keep(line)) => {
                shape = shape.intersection_with_halfplane(&line);
                if shape.dimension() != Dimension::Area {
                    return Err(GeometryWarning::NotAnArea(shape.dimension()));
                }
            }
            Some(Restraint::Split(line)) => {
                let dimension = contained.dimension();
                if depth >= MAX_SPLIT_DEPTH || dimension <= Dimension::Point {
                    return Err(GeometryWarning::NotAnArea(dimension));
                }
                let outside = contained.intersection_with_halfplane(&line);
                let inside = contained.intersection_with_halfplane(&line.opposite());
                let (piece, half) = [(outside, line), (inside, line.opposite())]
                    .into_iter()
                    .filter(|(piece, _)| piece.dimension() == dimension)
                    .max_by(|(a, _), (b, _)| measure(a).total_cmp(&measure(b)))
                    .ok_or(GeometryWarning::NotAnArea(dimension))?;
                log::trace!("splitting contained shape at depth {}", depth);
                let rest = shape.intersection_with_halfplane(&half);
                return restrain_from(rest, piece, obstacles, depth + 1);
            }
            None => return Err(GeometryWarning::EmptyShape),
        }
    }
    Ok(shape)
}

/// Half of `board` along its longer axis that covers `contained`.
fn board_half(board: &IntBox, contained: &TileShape) -> Option<IntBox> {
    let (ll, ur) = (board.ll, board.ur);
    let halves = if board.width() >= board.height() {
        let mid = ll.x + board.width() / 2;
        [IntBox::new(ll, IntPoint::new(mid, ur.y)), IntBox::new(IntPoint::new(mid, ll.y), ur)]
    } else {
        let mid = ll.y + board.height() / 2;
        [IntBox::new(ll, IntPoint::new(ur.x, mid)), IntBox::new(IntPoint::new(ll.x, mid), ur)]
    };
    halves.into_iter().find(|h| TileShape::Box(*h).contains_shape(contained))
}

impl<G: TileGeometry> AutorouteContext<'_, G> {
    /// Shapes that a room on `layer` must not overlap: obstacle items and the
    /// complete rooms other than `ignore`.
    fn completion_obstacles(
        &self,
        shape: &TileShape,
        layer: usize,
        ignore: Option<RoomId>,
    ) -> Vec<TileShape> {
        self.tree
            .overlapping(shape, layer)
            .into_iter()
            .filter(|entry| match entry.key.owner {
                TreeOwner::Item(id) => {
                    self.board.item(id).is_some_and(|i| i.is_obstacle_for(self.control.net))
                }
                TreeOwner::Room(id) => Some(id) != ignore && self.graph.room(id).is_complete(),
            })
            .map(|entry| entry.shape)
            .collect()
    }

    pub(crate) fn complete_shape(
        &self,
        start: &TileShape,
        contained: &TileShape,
        layer: usize,
        ignore: Option<RoomId>,
    ) -> Result<TileShape, GeometryWarning> {
        let obstacles = self.completion_obstacles(start, layer, ignore);
        restrain(start, contained, &obstacles)
    }

    /// Completes an incomplete room and calculates its doors. Returns false
    /// if the room could not be completed; it is discarded then.
    pub fn complete_room(&mut self, id: RoomId) -> bool {
        let room = self.graph.room(id);
        let RoomKind::Incomplete { contained } = &room.kind else {
            return room.is_complete();
        };
        let layer = room.layer;
        let contained = contained.clone();
        let start = room.shape.intersection(self.board_shape());
        let shape = match self.complete_shape(&start, &contained, layer, None) {
            Ok(shape) => shape,
            Err(warning) => {
                log::debug!("{:?} on layer {} not completed: {}", id, layer, warning);
                self.discard_room(id);
                return false;
            }
        };
        let shape = self.split_whole_board(shape, &contained);
        let room = self.graph.room_mut(id);
        room.shape = shape.clone();
        room.kind = RoomKind::Complete {
            targets: Vec::new(),
            net_dependent: false,
            doors_calculated: false,
        };
        self.tree.insert_room(id, shape, layer);
        self.calculate_doors(id);
        true
    }

    fn discard_room(&mut self, id: RoomId) {
        for door in self.graph.room(id).doors.clone() {
            self.graph.remove_door(door);
        }
        self.graph.room_mut(id).kind = RoomKind::Discarded;
    }

    /// A room spanning the whole board leaves the search nothing to choose
    /// from; it is cut to the half holding `contained`.
    fn split_whole_board(&self, shape: TileShape, contained: &TileShape) -> TileShape {
        let board = self.board.bounding_box();
        if shape.bounding_box() != board || (shape.area() - board.area()).abs() > EPS {
            return shape;
        }
        match board_half(&board, contained) {
            Some(half) => {
                log::trace!("room covers the whole board, keeping {:?}", half);
                shape.intersection(&TileShape::Box(half))
            }
            None => shape,
        }
    }

    /// Complete room on `layer` that covers `contained`, reusing an existing
    /// one if possible.
    pub fn room_containing(&mut self, contained: &TileShape, layer: usize) -> Option<RoomId> {
        let existing = self
            .tree
            .overlapping(contained, layer)
            .into_iter()
            .filter_map(|entry| match entry.key.owner {
                TreeOwner::Room(id) => Some(id),
                TreeOwner::Item(_) => None,
            })
            .find(|&id| {
                let room = self.graph.room(id);
                room.is_complete() && room.shape.contains_shape(contained)
            });
        if existing.is_some() {
            return existing;
        }
        let id = self.graph.add_room(
            self.board_shape().clone(),
            layer,
            RoomKind::Incomplete {
                contained: contained.clone(),
            },
        );
        self.complete_room(id).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::{FloatPoint, IntOctagon};

    fn b(x0: i64, y0: i64, x1: i64, y1: i64) -> TileShape {
        TileShape::Box(IntBox::from_coords(x0, y0, x1, y1))
    }

    fn assert_free(shape: &TileShape, obstacles: &[TileShape]) {
        for o in obstacles {
            assert!(!shape.overlaps_interior(o), "{:?} overlaps {:?}", shape, o);
        }
    }

    #[test]
    fn restrained_box_keeps_the_contained_point() {
        let board = b(0, 0, 1000, 1000);
        let obstacles = [b(400, 400, 600, 600), b(100, 700, 300, 900), b(700, 100, 900, 200)];
        let contained = TileShape::point(IntPoint::new(200, 300));
        let room = restrain(&board, &contained, &obstacles).unwrap();
        assert_eq!(room.dimension(), Dimension::Area);
        assert!(room.contains_shape(&contained));
        assert_free(&room, &obstacles);
        assert!(matches!(room, TileShape::Box(_)));
    }

    #[test]
    fn restrained_by_diagonal_obstacle() {
        let board = b(0, 0, 1000, 1000);
        let diamond = TileShape::Octagon(IntOctagon::bounding(&[
            FloatPoint::new(500.0, 300.0),
            FloatPoint::new(700.0, 500.0),
            FloatPoint::new(500.0, 700.0),
            FloatPoint::new(300.0, 500.0),
        ]));
        let contained = TileShape::segment(IntPoint::new(100, 100), IntPoint::new(200, 150));
        let room = restrain(&board, &contained, std::slice::from_ref(&diamond)).unwrap();
        assert!(room.contains_shape(&contained));
        assert_free(&room, &[diamond]);
        // the diagonal border facing the contained segment is kept
        assert!(room.contains(FloatPoint::new(350.0, 50.0)));
    }

    #[test]
    fn contained_point_inside_an_obstacle_fails() {
        let board = b(0, 0, 100, 100);
        let obstacle = b(40, 40, 60, 60);
        let contained = TileShape::point(IntPoint::new(50, 50));
        assert!(restrain(&board, &contained, &[obstacle]).is_err());
    }

    #[test]
    fn segment_around_a_corner_is_split() {
        let board = b(0, 0, 100, 100);
        let obstacle = b(40, 40, 60, 60);
        // passes the lower right corner outside, but no border line separates it
        let contained = TileShape::segment(IntPoint::new(50, 20), IntPoint::new(80, 50));
        let room = restrain(&board, &contained, std::slice::from_ref(&obstacle)).unwrap();
        assert_eq!(room.dimension(), Dimension::Area);
        assert_free(&room, &[obstacle]);
        assert!(
            room.contains(FloatPoint::new(50.0, 20.0)) || room.contains(FloatPoint::new(80.0, 50.0))
        );
    }

    #[test]
    fn whole_board_half_covers_contained() {
        let board = IntBox::from_coords(0, 0, 200, 100);
        let half = board_half(&board, &TileShape::point(IntPoint::new(150, 10))).unwrap();
        assert_eq!(half, IntBox::from_coords(100, 0, 200, 100));
        let across = TileShape::segment(IntPoint::new(50, 10), IntPoint::new(150, 10));
        assert!(board_half(&board, &across).is_none());
    }
}
