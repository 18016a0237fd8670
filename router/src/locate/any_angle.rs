//! Any-angle locate. The centre line is pulled tight through the door
//! sections; where it bends at the end of a section, or passes a door corner
//! too closely, it is moved onto the tangents of a circle around the corner.

use pcb_common::geom::math::{line_intersection, tangent_points, turn};
use pcb_common::geom::{Dimension, FloatLine, FloatPoint, TileShape};

use super::{RunPlan, Waypoint};
use crate::context::AutorouteContext;
use crate::geometry::TileGeometry;

const MAX_PASSES: usize = 64;
const CONVERGED: f64 = 1e-3;
const SEARCH_STEPS: usize = 60;

/// Middle points closer than this to the line through their neighbours are dropped.
const STRAIGHT_TOLERANCE: f64 = 0.5;

/// Tangent corners further than this many radii from the door corner are rejected.
const MAX_CORNER_DISTANCE: f64 = 10.0;

enum Constraint {
    Fixed(FloatPoint),
    Segment(FloatLine),
    Shape(TileShape),
}

impl Constraint {
    fn new(waypoint: &Waypoint) -> Self {
        match waypoint {
            Waypoint::Drill(p) => Constraint::Fixed(p.to_float()),
            Waypoint::Section { line, .. } => Constraint::Segment(*line),
            Waypoint::Target(shape) if shape.dimension() == Dimension::Point => {
                Constraint::Fixed(shape.centre())
            }
            Waypoint::Target(shape) => Constraint::Shape(shape.clone()),
        }
    }

    fn initial(&self) -> FloatPoint {
        match self {
            Constraint::Fixed(p) => *p,
            Constraint::Segment(line) => line.middle(),
            Constraint::Shape(shape) => shape.centre(),
        }
    }

    fn nearest(&self, p: FloatPoint) -> FloatPoint {
        match self {
            Constraint::Fixed(q) => *q,
            Constraint::Segment(line) => line.nearest_point(p),
            Constraint::Shape(shape) => shape.nearest_point(p),
        }
    }

    /// Point of the constraint minimising the path length from `prev` to `next`.
    fn shortest_between(&self, prev: FloatPoint, next: FloatPoint) -> FloatPoint {
        let Constraint::Segment(line) = self else {
            return self.nearest(prev.middle(next));
        };
        let at = |t: f64| line.a + (line.b - line.a) * t;
        let length = |t: f64| prev.distance(at(t)) + at(t).distance(next);
        let (mut lo, mut hi) = (0.0, 1.0);
        for _ in 0..SEARCH_STEPS {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            if length(m1) <= length(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        at(0.5 * (lo + hi))
    }
}

/// Shortest polyline through the constraints, by repeated local improvement.
fn pull_tight(constraints: &[Constraint]) -> Vec<FloatPoint> {
    let mut points: Vec<FloatPoint> = constraints.iter().map(Constraint::initial).collect();
    let n = points.len();
    if n < 2 {
        return points;
    }
    for _ in 0..MAX_PASSES {
        let mut moved: f64 = 0.0;
        for i in 0..n {
            let p = match (i.checked_sub(1), (i + 1 < n).then_some(i + 1)) {
                (Some(prev), Some(next)) => {
                    constraints[i].shortest_between(points[prev], points[next])
                }
                (None, Some(next)) => constraints[i].nearest(points[next]),
                (Some(prev), None) => constraints[i].nearest(points[prev]),
                (None, None) => points[i],
            };
            moved = moved.max(p.distance(points[i]));
            points[i] = p;
        }
        if moved < CONVERGED {
            break;
        }
    }
    points
}

/// Indices of the points where the polyline bends, end points included.
fn bends(points: &[FloatPoint]) -> Vec<usize> {
    let n = points.len();
    if n <= 2 {
        return (0..n).collect();
    }
    let mut kept = vec![0];
    for i in 1..n - 1 {
        let a = points[kept[kept.len() - 1]];
        if points[i].distance_to_segment(a, points[i + 1]) > STRAIGHT_TOLERANCE {
            kept.push(i);
        }
    }
    kept.push(n - 1);
    kept
}

/// Moves the bend `v` between `a` and `b` so that both legs keep `radius`
/// from `corner`. Returns `v` if the legs are clear already or no usable
/// tangent corner exists.
pub(crate) fn tangent_corner(
    a: FloatPoint,
    v: FloatPoint,
    b: FloatPoint,
    corner: FloatPoint,
    radius: f64,
) -> FloatPoint {
    let clear = corner.distance_to_segment(a, v) >= radius - 1e-6
        && corner.distance_to_segment(v, b) >= radius - 1e-6;
    if clear {
        return v;
    }
    let tangents = tangent_points(a, corner, radius).and_then(|(a_left, a_right)| {
        let (b_left, b_right) = tangent_points(b, corner, radius)?;
        // The corner lies on the inside of the bend.
        if turn(a, v, b) > 0.0 {
            line_intersection(a, a_right, b, b_left)
        } else {
            line_intersection(a, a_left, b, b_right)
        }
    });
    match tangents {
        Ok(x) if x.distance(corner) <= MAX_CORNER_DISTANCE * radius => x,
        Ok(x) => {
            log::debug!("tangent corner {:?} too far from {:?}", x, corner);
            v
        }
        Err(warning) => {
            log::debug!("no tangent corner at {:?}: {}", v, warning);
            v
        }
    }
}

/// Bend for the straight leg `a`..`b` that passes closer than `radius` to
/// `corner`: the leg is pushed away from the corner onto its tangents.
fn bend_around(a: FloatPoint, b: FloatPoint, corner: FloatPoint, radius: f64) -> FloatPoint {
    let foot = FloatLine::new(a, b).nearest_point(corner);
    let away = foot - corner;
    let distance = away.length();
    let away = if distance > 1e-9 {
        away * (1.0 / distance)
    } else {
        let d = b - a;
        FloatPoint::new(-d.y, d.x) * (1.0 / d.length().max(1e-9))
    };
    let v = corner + away * radius;
    tangent_corner(a, v, b, corner, radius)
}

/// Inserts a bend into every leg of `corners` that passes closer than
/// `radius` to one of the door corners it crosses; `crossed[k]` holds those
/// of leg `k`. Only the nearest corner of a leg is taken into account.
fn clear_crossed_corners(
    corners: &[FloatPoint],
    crossed: &[Vec<FloatPoint>],
    radius: f64,
) -> Vec<FloatPoint> {
    let mut result = Vec::with_capacity(corners.len());
    for (k, w) in corners.windows(2).enumerate() {
        let (a, b) = (w[0], w[1]);
        result.push(a);
        let nearest = crossed
            .get(k)
            .into_iter()
            .flatten()
            .map(|&c| (c.distance_to_segment(a, b), c))
            .filter(|&(d, _)| d < radius - 1e-6)
            .min_by(|x, y| x.0.total_cmp(&y.0));
        if let Some((_, c)) = nearest {
            let v = bend_around(a, b, c, radius);
            if v != a && v != b {
                result.push(v);
            }
        }
    }
    result.extend(corners.last());
    result
}

pub(super) fn locate_run<G: TileGeometry>(
    ctx: &AutorouteContext<'_, G>,
    run: &RunPlan,
) -> Vec<FloatPoint> {
    let constraints: Vec<Constraint> = run.waypoints.iter().map(Constraint::new).collect();
    let points = pull_tight(&constraints);
    let kept = bends(&points);
    let radius = ctx.control.compensated_trace_half_width[run.layer] as f64;
    let door_ends = |i: usize| match &run.waypoints[i] {
        Waypoint::Section { door, .. } => ctx.graph.door(*door).shape.extreme_points(),
        _ => None,
    };
    let mut corners: Vec<FloatPoint> = Vec::with_capacity(kept.len());
    for (k, &i) in kept.iter().enumerate() {
        let v = points[i];
        let (Some(&a), Some(&next)) = (corners.last(), kept.get(k + 1)) else {
            corners.push(v);
            continue;
        };
        let door_corner =
            door_ends(i).map(|(p, q)| if p.distance(v) <= q.distance(v) { p } else { q });
        match door_corner {
            Some(c) => corners.push(tangent_corner(a, v, points[next], c, radius)),
            None => corners.push(v),
        }
    }
    // Sections passed in a straight line were dropped with their bends.
    let crossed: Vec<Vec<FloatPoint>> = kept
        .windows(2)
        .map(|w| {
            (w[0] + 1..w[1])
                .filter_map(&door_ends)
                .flat_map(|(p, q)| [p, q])
                .collect()
        })
        .collect();
    clear_crossed_corners(&corners, &crossed, radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb_common::geom::IntPoint;

    fn fp(x: f64, y: f64) -> FloatPoint {
        FloatPoint::new(x, y)
    }

    fn section(x: f64, y0: f64, y1: f64) -> Constraint {
        Constraint::Segment(FloatLine::new(fp(x, y0), fp(x, y1)))
    }

    #[test]
    fn collinear_sections_reduce_to_the_end_points() {
        let constraints = vec![
            Constraint::Fixed(fp(0.0, 0.0)),
            section(100.0, -50.0, 80.0),
            section(250.0, -10.0, 300.0),
            section(400.0, -200.0, 200.0),
            Constraint::Fixed(fp(1000.0, 333.0)),
        ];
        let points = pull_tight(&constraints);
        let kept = bends(&points);
        assert_eq!(kept, vec![0, 4]);
    }

    #[test]
    fn path_bends_at_the_section_end() {
        let constraints = vec![
            Constraint::Fixed(fp(0.0, 0.0)),
            section(100.0, 50.0, 200.0),
            Constraint::Fixed(fp(200.0, 0.0)),
        ];
        let points = pull_tight(&constraints);
        assert!(points[1].approx_eq(fp(100.0, 50.0), 1e-3), "{:?}", points[1]);
        assert_eq!(bends(&points), vec![0, 1, 2]);
    }

    #[test]
    fn trace_segment_targets_are_entered_at_the_nearest_point() {
        let target = TileShape::segment(IntPoint::new(300, -100), IntPoint::new(300, 100));
        let constraints = vec![Constraint::Fixed(fp(0.0, 40.0)), Constraint::Shape(target)];
        let points = pull_tight(&constraints);
        assert!(points[1].approx_eq(fp(300.0, 40.0), 1e-6));
    }

    #[test]
    fn tangent_corner_keeps_the_radius() {
        // Right turn around a corner at (100, 40).
        let (a, b) = (fp(0.0, 0.0), fp(200.0, 0.0));
        let corner = fp(100.0, 40.0);
        let v = fp(100.0, 50.0);
        let x = tangent_corner(a, v, b, corner, 10.0);
        assert!(corner.distance_to_segment(a, x) >= 10.0 - 1e-6);
        assert!(corner.distance_to_segment(x, b) >= 10.0 - 1e-6);
        assert!(x.y > 50.0 && (x.x - 100.0).abs() < 1e-6, "{:?}", x);
        // Legs already clear keep the bend.
        let far = fp(100.0, 200.0);
        assert_eq!(tangent_corner(a, v, b, far, 10.0), v);
    }

    #[test]
    fn straight_legs_bend_around_crossed_door_corners() {
        // A 30 degree leg crossing a section whose upper end sits 7 units
        // from the centre line.
        let (a, b) = (fp(0.0, 0.0), fp(300.0, 173.2));
        let corner = fp(150.0, 95.0);
        assert!(corner.distance_to_segment(a, b) < 10.0);

        let corners = clear_crossed_corners(&[a, b], &[vec![fp(150.0, -200.0), corner]], 10.0);

        assert_eq!(corners.len(), 3);
        assert_eq!((corners[0], corners[2]), (a, b));
        for leg in corners.windows(2) {
            assert!(corner.distance_to_segment(leg[0], leg[1]) >= 10.0 - 1e-6, "{:?}", corners);
        }
        // The bend moves to the side of the leg away from the corner.
        assert!(turn(a, b, corners[1]) * turn(a, b, corner) < 0.0, "{:?}", corners[1]);
    }

    #[test]
    fn clear_legs_keep_their_corners() {
        let corners = [fp(0.0, 0.0), fp(300.0, 0.0), fp(300.0, 300.0)];
        let crossed = vec![vec![fp(150.0, 50.0), fp(150.0, -50.0)], Vec::new()];
        assert_eq!(clear_crossed_corners(&corners, &crossed, 10.0), corners.to_vec());
    }
}
