use super::int_box::IntBox;
use super::line::Line;
use super::point::{FloatPoint, IntPoint};
use super::EPS;

/// Half extent of the box every half-plane intersection starts from.
const BIG: i64 = 1 << 36;

/// Convex polygon given as the intersection of half-planes.
///
/// `lines` are the edges in counter-clockwise order, starting with the edge of
/// smallest direction angle. `corners[i]` is the start of edge `i`. Degenerate
/// polygons (segments and points) keep all edge lines, so that enlarging them
/// yields a bounded shape again. No lines means empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Simplex {
    lines: Vec<Line>,
    corners: Vec<FloatPoint>,
}

impl Simplex {
    pub const EMPTY: Simplex = Simplex {
        lines: Vec::new(),
        corners: Vec::new(),
    };

    /// Intersection of the half-planes on the left of `lines`.
    pub fn from_lines(lines: &[Line]) -> Simplex {
        let start = IntBox::from_coords(-BIG, -BIG, BIG, BIG).border_lines().to_vec();
        Self::clip_all(start, lines)
    }

    /// Degenerate simplex for the closed segment `a`..`b`.
    pub fn segment(a: IntPoint, b: IntPoint) -> Simplex {
        if a == b {
            return Self::from_lines(&IntBox::point(a).border_lines());
        }
        let d = b - a;
        let perp = IntPoint::new(-d.y, d.x);
        Self::from_lines(&[
            Line::new(a, b),
            Line::new(b, b + perp),
            Line::new(b, a),
            Line::new(a, a - perp),
        ])
    }

    fn clip_all(mut edges: Vec<Line>, lines: &[Line]) -> Simplex {
        for line in lines {
            if line.a == line.b {
                continue;
            }
            match clip(&edges, line) {
                Some(clipped) => edges = clipped,
                None => return Simplex::EMPTY,
            }
        }
        Self::canonical(edges)
    }

    fn canonical(mut edges: Vec<Line>) -> Simplex {
        if edges.is_empty() {
            return Simplex::EMPTY;
        }
        let mut corners = vertices(&edges);
        if is_area(&corners) {
            let n = edges.len();
            let keep: Vec<bool> = (0..n)
                .map(|i| corners[i].distance(corners[(i + 1) % n]) > EPS)
                .collect();
            if keep.iter().any(|k| !k) {
                edges = edges
                    .into_iter()
                    .zip(keep)
                    .filter_map(|(e, k)| k.then_some(e))
                    .collect();
                corners = vertices(&edges);
            }
        }
        let first = edges
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.angle().total_cmp(&b.angle()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        edges.rotate_left(first);
        corners.rotate_left(first);
        Simplex {
            lines: edges,
            corners,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn corners(&self) -> &[FloatPoint] {
        &self.corners
    }

    /// Corners with coincident neighbours merged.
    pub fn distinct_corners(&self) -> Vec<FloatPoint> {
        let mut result: Vec<FloatPoint> = Vec::with_capacity(self.corners.len());
        for c in &self.corners {
            if !result.iter().any(|r| r.approx_eq(*c, EPS)) {
                result.push(*c);
            }
        }
        result
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.corners)
    }

    pub fn has_area(&self) -> bool {
        is_area(&self.corners)
    }

    pub fn intersection(&self, other: &Simplex) -> Simplex {
        if self.is_empty() || other.is_empty() {
            return Simplex::EMPTY;
        }
        Self::clip_all(self.lines.clone(), &other.lines)
    }

    pub fn intersection_with_halfplane(&self, line: &Line) -> Simplex {
        if self.is_empty() {
            return Simplex::EMPTY;
        }
        Self::clip_all(self.lines.clone(), std::slice::from_ref(line))
    }

    /// Moves every border line outwards by `offset`; negative values shrink.
    pub fn offset(&self, offset: f64) -> Simplex {
        if self.is_empty() || offset == 0.0 {
            return self.clone();
        }
        let moved: Vec<Line> = self.lines.iter().map(|l| l.translate(offset)).collect();
        Self::from_lines(&moved)
    }

    pub fn without_line(&self, index: usize) -> Simplex {
        let rest: Vec<Line> = self
            .lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| (i != index).then_some(*l))
            .collect();
        Self::from_lines(&rest)
    }

    pub fn contains(&self, p: FloatPoint) -> bool {
        !self.is_empty() && self.lines.iter().all(|l| l.signed_distance(p) >= -EPS)
    }

    pub fn contains_inside(&self, p: FloatPoint) -> bool {
        !self.is_empty() && self.lines.iter().all(|l| l.signed_distance(p) > EPS)
    }
}

/// `vertices[i]` is the intersection of edge `i - 1` with edge `i`.
fn vertices(edges: &[Line]) -> Vec<FloatPoint> {
    let n = edges.len();
    let mut result: Vec<FloatPoint> = Vec::with_capacity(n);
    for i in 0..n {
        let prev = &edges[(i + n - 1) % n];
        let p = match prev.intersection(&edges[i]) {
            Ok(p) => p,
            Err(_) => match result.last() {
                Some(last) => edges[i].projection(*last),
                None => edges[i].a.to_float(),
            },
        };
        result.push(p);
    }
    result
}

/// Clips the convex polygon `edges` by the half-plane left of `h`.
fn clip(edges: &[Line], h: &Line) -> Option<Vec<Line>> {
    let n = edges.len();
    let verts = vertices(edges);
    let inside: Vec<bool> = verts.iter().map(|v| h.signed_distance(*v) >= -EPS).collect();
    if inside.iter().all(|&b| b) {
        return Some(edges.to_vec());
    }
    if !inside.iter().any(|&b| b) {
        return None;
    }
    let exit = (0..n).find(|&k| inside[k] && !inside[(k + 1) % n])?;
    let entry = (0..n).find(|&m| !inside[m] && inside[(m + 1) % n])?;
    let mut result = Vec::with_capacity(n + 1);
    let mut i = entry;
    loop {
        result.push(edges[i]);
        if i == exit {
            break;
        }
        i = (i + 1) % n;
    }
    result.push(*h);
    Some(result)
}

pub(crate) fn polygon_area(corners: &[FloatPoint]) -> f64 {
    let n = corners.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        sum += corners[i].cross(corners[(i + 1) % n]);
    }
    0.5 * sum.abs()
}

fn perimeter(corners: &[FloatPoint]) -> f64 {
    let n = corners.len();
    (0..n).map(|i| corners[i].distance(corners[(i + 1) % n])).sum()
}

/// A polygon counts as an area once its mean width exceeds the noise level.
pub(crate) fn is_area(corners: &[FloatPoint]) -> bool {
    let area = polygon_area(corners);
    area > 0.0 && area > perimeter(corners) * 1e-3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn triangle() -> Simplex {
        Simplex::from_lines(&[
            Line::new(p(0, 0), p(10, 0)),
            Line::new(p(10, 0), p(0, 10)),
            Line::new(p(0, 10), p(0, 0)),
        ])
    }

    #[test]
    fn triangle_from_three_lines() {
        let t = triangle();
        assert_eq!(t.lines().len(), 3);
        assert!((t.area() - 50.0).abs() < 1e-6);
        assert!(t.contains(FloatPoint::new(1.0, 1.0)));
        assert!(!t.contains(FloatPoint::new(6.0, 6.0)));
        assert!(t.contains(FloatPoint::new(5.0, 5.0)));
        assert!(!t.contains_inside(FloatPoint::new(5.0, 5.0)));
    }

    #[test]
    fn redundant_lines_are_dropped() {
        let t = triangle().intersection_with_halfplane(&Line::new(p(100, 0), p(100, 1)));
        assert_eq!(t.lines().len(), 3);
    }

    #[test]
    fn clipping_to_a_touching_line_leaves_a_segment() {
        let b = Simplex::from_lines(&IntBox::from_coords(0, 0, 10, 10).border_lines());
        // Keep x >= 10 only.
        let edge = b.intersection_with_halfplane(&Line::new(p(10, 10), p(10, 0)));
        assert!(!edge.is_empty());
        assert!(!edge.has_area());
        assert_eq!(edge.distinct_corners().len(), 2);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let b = Simplex::from_lines(&IntBox::from_coords(0, 0, 10, 10).border_lines());
        let far = Simplex::from_lines(&IntBox::from_coords(20, 20, 30, 30).border_lines());
        assert!(b.intersection(&far).is_empty());
    }

    #[test]
    fn segment_offset_becomes_rectangle() {
        let s = Simplex::segment(p(0, 0), p(10, 0));
        assert!(!s.has_area());
        let r = s.offset(2.0);
        assert!((r.area() - 14.0 * 4.0).abs() < 1e-6);
    }
}
