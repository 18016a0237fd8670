//! Locate for 45 and 90 degree routing. Doors are crossed on grid points of
//! the room border, and illegal legs get one intermediate corner. Each step
//! keeps the compensated half width from every obstacle; when the direct
//! legs come too close, other crossing points of the section and short stubs
//! straight out of and into the doors are tried.

use std::collections::BTreeSet;
use std::iter::once;

use pcb_common::db::ItemId;
use pcb_common::geom::{Dimension, FloatPoint, IntBox, IntPoint, TileShape};

use super::{snap_into, RunPlan, Waypoint};
use crate::context::AutorouteContext;
use crate::geometry::TileGeometry;
use crate::rooms::{DoorId, RoomId};
use crate::tree::TreeOwner;

/// Allowed shortfall of a leg's distance to an enlarged obstacle, within the
/// rounding slack of the search tree.
const CLEARANCE_TOLERANCE: f64 = 1.0;

/// Stub lengths tried at doors, in compensated half widths.
const STUB_DEPTHS: [f64; 3] = [1.0, 2.0, 3.0];

/// Points of a section tried after the one nearest to the path.
const SECTION_FRACTIONS: [f64; 5] = [0.5, 0.0, 0.25, 0.75, 1.0];

fn depth(shape: &TileShape, p: IntPoint) -> f64 {
    shape
        .border_lines()
        .iter()
        .map(|l| l.signed_distance(p.to_float()))
        .fold(f64::INFINITY, f64::min)
}

/// Picks the corner for the leg `a`..`b` through a room: candidates the
/// trace fits around come first, then the one deepest inside the room. Ties
/// keep the preferred order of the geometry.
pub(crate) fn choose_corner(
    candidates: &[IntPoint],
    room: &TileShape,
    shrunk: Option<&TileShape>,
) -> Option<IntPoint> {
    let mut best: Option<(bool, f64, IntPoint)> = None;
    for &c in candidates {
        let fits = shrunk.is_some_and(|s| s.contains(c.to_float()));
        let d = depth(room, c);
        let better = match best {
            None => true,
            Some((best_fits, best_depth, _)) => {
                (fits, d) > (best_fits, best_depth) && (fits != best_fits || d > best_depth + 1e-9)
            }
        };
        if better {
            best = Some((fits, d, c));
        }
    }
    best.map(|(_, _, c)| c)
}

fn waypoint_hint(waypoint: &Waypoint) -> FloatPoint {
    match waypoint {
        Waypoint::Target(shape) => shape.centre(),
        Waypoint::Section { line, .. } => line.middle(),
        Waypoint::Drill(p) => p.to_float(),
    }
}

/// Stub depth pairs `(exit, entry)` as indices, 0 meaning no stub, shortest
/// detours first.
fn stub_pairs() -> Vec<(usize, usize)> {
    let n = STUB_DEPTHS.len();
    let mut pairs: Vec<(usize, usize)> =
        (0..=n).flat_map(|i| (0..=n).map(move |j| (i, j))).collect();
    pairs.sort_by_key(|&(i, j)| (i + j, i));
    pairs
}

impl<G: TileGeometry> AutorouteContext<'_, G> {
    /// Grid point where the path crosses a door section, on the border line
    /// of `room` that carries the door.
    fn crossing_point(&self, room: RoomId, waypoint: &Waypoint, from: IntPoint) -> IntPoint {
        self.crossing_near(room, waypoint, from.to_float())
    }

    fn crossing_near(&self, room: RoomId, waypoint: &Waypoint, from: FloatPoint) -> IntPoint {
        match waypoint {
            Waypoint::Drill(p) => *p,
            Waypoint::Target(shape) => snap_into(shape, from),
            Waypoint::Section { line, door } => {
                let p = line.nearest_point(from);
                let shape = &self.graph.room(room).shape;
                match shape.touching_side(&self.graph.door(*door).shape) {
                    Some(side) => shape.border_lines()[side].grid_point_towards(p, line.middle()),
                    None => p.round(),
                }
            }
        }
    }

    /// Crossing points of `waypoint`, the one nearest to `from` first.
    fn crossing_candidates(
        &self,
        room: RoomId,
        waypoint: &Waypoint,
        from: IntPoint,
    ) -> Vec<IntPoint> {
        let mut result = vec![self.crossing_point(room, waypoint, from)];
        let others: Vec<FloatPoint> = match waypoint {
            Waypoint::Drill(_) => Vec::new(),
            Waypoint::Target(shape) => vec![shape.centre()],
            Waypoint::Section { line, .. } => SECTION_FRACTIONS
                .iter()
                .map(|&t| line.a + (line.b - line.a) * t)
                .collect(),
        };
        for p in others {
            let c = self.crossing_near(room, waypoint, p);
            if !result.contains(&c) {
                result.push(c);
            }
        }
        result
    }

    /// Unit grid step from the door into `room`, perpendicular to the border
    /// line carrying the door.
    fn inward_step(&self, room: RoomId, door: DoorId) -> Option<IntPoint> {
        let shape = &self.graph.room(room).shape;
        let side = shape.touching_side(&self.graph.door(door).shape)?;
        let d = shape.border_lines()[side].direction();
        Some(IntPoint::new(-d.y.signum(), d.x.signum()))
    }

    /// Points straight into `room` from `at` on the door of `waypoint`,
    /// shortest first. Empty unless `waypoint` is a door section.
    fn stubs(
        &self,
        room: RoomId,
        waypoint: &Waypoint,
        at: IntPoint,
        layer: usize,
    ) -> Vec<IntPoint> {
        let Waypoint::Section { door, .. } = waypoint else {
            return Vec::new();
        };
        let Some(step) = self.inward_step(room, *door) else {
            return Vec::new();
        };
        let step_length = step.to_float().length();
        let radius = self.control.compensated_trace_half_width[layer] as f64;
        STUB_DEPTHS
            .iter()
            .map(|depth| {
                let n = (depth * radius / step_length).ceil() as i64;
                at + IntPoint::new(step.x * n, step.y * n)
            })
            .collect()
    }

    fn leg_corner(&self, room: RoomId, a: IntPoint, b: IntPoint, layer: usize) -> Option<IntPoint> {
        let candidates = self.geometry.corner_candidates(a, b);
        if candidates.is_empty() {
            return None;
        }
        let shape = &self.graph.room(room).shape;
        let shrunk = shape.shrink(self.control.compensated_trace_half_width[layer] as f64);
        let shrunk = (shrunk.dimension() != Dimension::Empty).then_some(&shrunk);
        let corner = choose_corner(&candidates, shape, shrunk);
        if corner.is_some_and(|c| !shape.contains(c.to_float())) {
            log::debug!("corner {:?} of leg {:?}..{:?} leaves {:?}", corner, a, b, room);
        }
        corner
    }

    /// Ways to realise the leg `a`..`b`: no corner if the leg is legal,
    /// otherwise each candidate corner, the chosen one first.
    fn corner_options(
        &self,
        room: RoomId,
        a: IntPoint,
        b: IntPoint,
        layer: usize,
    ) -> Vec<Option<IntPoint>> {
        if self.geometry.segment_allowed(a, b) {
            return vec![None];
        }
        let preferred = self.leg_corner(room, a, b, layer);
        let rest = self
            .geometry
            .corner_candidates(a, b)
            .into_iter()
            .filter(|&c| Some(c) != preferred);
        preferred.into_iter().chain(rest).map(Some).collect()
    }

    /// True if a centre line `a`..`b` on `layer` keeps the compensated half
    /// width from every obstacle not in `ripped`.
    pub(crate) fn leg_is_clear(
        &self,
        a: IntPoint,
        b: IntPoint,
        layer: usize,
        ripped: &BTreeSet<ItemId>,
    ) -> bool {
        let radius = self.control.compensated_trace_half_width[layer];
        let area = TileShape::Box(IntBox::from_coords(a.x, a.y, b.x, b.y).offset(radius));
        let (fa, fb) = (a.to_float(), b.to_float());
        self.tree().overlapping(&area, layer).iter().all(|entry| match entry.key.owner {
            TreeOwner::Item(id)
                if !ripped.contains(&id)
                    && self.board.item(id).is_some_and(|i| i.is_obstacle_for(self.control.net)) =>
            {
                entry.shape.distance_to_segment(fa, fb) >= radius as f64 - CLEARANCE_TOLERANCE
            }
            _ => true,
        })
    }

    fn legs_are_clear(
        &self,
        from: IntPoint,
        legs: &[IntPoint],
        layer: usize,
        ripped: &BTreeSet<ItemId>,
    ) -> bool {
        let mut a = from;
        for &b in legs {
            let legal = self.geometry.segment_allowed(a, b);
            if b != a && !(legal && self.leg_is_clear(a, b, layer, ripped)) {
                return false;
            }
            a = b;
        }
        true
    }

    /// Corners from `current` across `waypoint` through `room`, ending on the
    /// crossing point, with every leg clear. `previous` is the waypoint
    /// `current` lies on.
    fn clear_step(
        &self,
        room: RoomId,
        previous: &Waypoint,
        waypoint: &Waypoint,
        current: IntPoint,
        layer: usize,
        ripped: &BTreeSet<ItemId>,
    ) -> Option<Vec<IntPoint>> {
        let crossings = self.crossing_candidates(room, waypoint, current);
        if crossings.first() == Some(&current) {
            return Some(Vec::new());
        }
        let exits: Vec<Option<IntPoint>> = once(None)
            .chain(self.stubs(room, previous, current, layer).into_iter().map(Some))
            .collect();
        for (i, j) in stub_pairs() {
            let Some(&exit) = exits.get(i) else {
                continue;
            };
            for &next in crossings.iter().filter(|&&c| c != current) {
                let entry = match j {
                    0 => None,
                    j => match self.stubs(room, waypoint, next, layer).get(j - 1) {
                        Some(&e) => Some(e),
                        None => continue,
                    },
                };
                let (from, to) = (exit.unwrap_or(current), entry.unwrap_or(next));
                for corner in self.corner_options(room, from, to, layer) {
                    let legs: Vec<IntPoint> =
                        exit.into_iter().chain(corner).chain(entry).chain(once(next)).collect();
                    if self.legs_are_clear(current, &legs, layer, ripped) {
                        return Some(legs);
                    }
                }
            }
        }
        None
    }
}

/// Corners of one run. Items in `ripped` are ignored as obstacles.
pub(super) fn locate_run<G: TileGeometry>(
    ctx: &AutorouteContext<'_, G>,
    run: &RunPlan,
    ripped: &BTreeSet<ItemId>,
) -> Vec<IntPoint> {
    let Some(first) = run.waypoints.first() else {
        return Vec::new();
    };
    let hint = run.waypoints.get(1).map(waypoint_hint).unwrap_or_else(|| waypoint_hint(first));
    let mut current = match first {
        Waypoint::Target(shape) => snap_into(shape, hint),
        Waypoint::Drill(p) => *p,
        Waypoint::Section { line, .. } => line.middle().round(),
    };
    let mut corners = vec![current];
    for (k, &room) in run.rooms.iter().enumerate() {
        let (Some(previous), Some(waypoint)) = (run.waypoints.get(k), run.waypoints.get(k + 1))
        else {
            break;
        };
        let legs = ctx
            .clear_step(room, previous, waypoint, current, run.layer, ripped)
            .unwrap_or_else(|| {
                log::debug!(
                    "no clear legs from {:?} through {:?} on layer {}",
                    current,
                    room,
                    run.layer
                );
                let next = ctx.crossing_point(room, waypoint, current);
                if next == current {
                    return Vec::new();
                }
                let mut legs = Vec::with_capacity(2);
                if !ctx.geometry.segment_allowed(current, next) {
                    legs.extend(ctx.leg_corner(room, current, next, run.layer));
                }
                legs.push(next);
                legs
            });
        if let Some(&last) = legs.last() {
            corners.extend(legs);
            current = last;
        }
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::IntBox;

    #[test]
    fn corner_deepest_in_the_room_wins() {
        let room = TileShape::Box(IntBox::from_coords(0, 0, 100, 40));
        let candidates = [IntPoint::new(90, 40), IntPoint::new(10, 30)];
        assert_eq!(choose_corner(&candidates, &room, None), Some(IntPoint::new(10, 30)));
    }

    #[test]
    fn fitting_corner_beats_a_deeper_one() {
        let room = TileShape::Box(IntBox::from_coords(0, 0, 100, 100));
        let shrunk = TileShape::Box(IntBox::from_coords(10, 10, 40, 40));
        let candidates = [IntPoint::new(50, 50), IntPoint::new(20, 20)];
        assert_eq!(choose_corner(&candidates, &room, Some(&shrunk)), Some(IntPoint::new(20, 20)));
    }

    #[test]
    fn direct_legs_are_tried_before_stubs() {
        let pairs = stub_pairs();
        assert_eq!(pairs.len(), (STUB_DEPTHS.len() + 1).pow(2));
        assert_eq!(&pairs[..3], &[(0, 0), (0, 1), (1, 0)]);
        assert!(pairs.windows(2).all(|w| w[0].0 + w[0].1 <= w[1].0 + w[1].1));
    }

    #[test]
    fn ties_keep_the_preferred_candidate() {
        let room = TileShape::Box(IntBox::from_coords(0, 0, 100, 100));
        let candidates = [IntPoint::new(30, 50), IntPoint::new(70, 50)];
        assert_eq!(choose_corner(&candidates, &room, None), Some(IntPoint::new(30, 50)));
    }
}
