use super::int_box::IntBox;
use super::line::Line;
use super::octagon::IntOctagon;
use super::point::{FloatLine, FloatPoint, IntPoint};
use super::simplex::Simplex;
use super::EPS;

/// Tolerance for deciding that a point lies on a border line.
pub const TOUCH_EPS: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Empty,
    Point,
    Line,
    Area,
}

/// A convex integer shape in one of three families of increasing generality.
#[derive(Clone, Debug, PartialEq)]
pub enum TileShape {
    Box(IntBox),
    Octagon(IntOctagon),
    Simplex(Simplex),
}

impl TileShape {
    pub fn point(p: IntPoint) -> TileShape {
        TileShape::Box(IntBox::point(p))
    }

    /// Degenerate shape of the closed segment `a`..`b`.
    pub fn segment(a: IntPoint, b: IntPoint) -> TileShape {
        if a.x == b.x || a.y == b.y {
            return TileShape::Box(IntBox::from_coords(a.x, a.y, b.x, b.y));
        }
        TileShape::Simplex(Simplex::segment(a, b)).simplify()
    }

    pub fn to_simplex(&self) -> Simplex {
        match self {
            TileShape::Box(b) if b.is_empty() => Simplex::EMPTY,
            TileShape::Box(b) => Simplex::from_lines(&b.border_lines()),
            TileShape::Octagon(o) if o.is_empty() => Simplex::EMPTY,
            TileShape::Octagon(o) => Simplex::from_lines(&o.border_lines()),
            TileShape::Simplex(s) => s.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TileShape::Box(b) => b.is_empty(),
            TileShape::Octagon(o) => o.is_empty(),
            TileShape::Simplex(s) => s.is_empty(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            TileShape::Box(b) => {
                if b.is_empty() {
                    Dimension::Empty
                } else if b.width() == 0 && b.height() == 0 {
                    Dimension::Point
                } else if b.width() == 0 || b.height() == 0 {
                    Dimension::Line
                } else {
                    Dimension::Area
                }
            }
            TileShape::Octagon(o) => {
                if o.is_empty() {
                    Dimension::Empty
                } else if o.lx == o.rx && o.ly == o.uy {
                    Dimension::Point
                } else if o.area() > 0.0 {
                    Dimension::Area
                } else {
                    Dimension::Line
                }
            }
            TileShape::Simplex(s) => {
                if s.is_empty() {
                    Dimension::Empty
                } else if s.has_area() {
                    Dimension::Area
                } else if s.distinct_corners().len() <= 1 {
                    Dimension::Point
                } else {
                    Dimension::Line
                }
            }
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            TileShape::Box(b) => b.area(),
            TileShape::Octagon(o) => o.area(),
            TileShape::Simplex(s) => s.area(),
        }
    }

    pub fn corners(&self) -> Vec<FloatPoint> {
        match self {
            TileShape::Box(b) if b.is_empty() => Vec::new(),
            TileShape::Box(b) => b.corners().to_vec(),
            TileShape::Octagon(_) => self.to_simplex().corners().to_vec(),
            TileShape::Simplex(s) => s.corners().to_vec(),
        }
    }

    pub fn border_lines(&self) -> Vec<Line> {
        match self {
            TileShape::Box(b) if b.is_empty() => Vec::new(),
            TileShape::Box(b) => b.border_lines().to_vec(),
            TileShape::Octagon(_) => self.to_simplex().lines().to_vec(),
            TileShape::Simplex(s) => s.lines().to_vec(),
        }
    }

    /// Border lines together with the segment each one contributes.
    pub fn border_edges(&self) -> Vec<(Line, FloatLine)> {
        let simplex;
        let (lines, corners): (Vec<Line>, Vec<FloatPoint>) = match self {
            TileShape::Octagon(_) => {
                simplex = self.to_simplex();
                (simplex.lines().to_vec(), simplex.corners().to_vec())
            }
            _ => (self.border_lines(), self.corners()),
        };
        let n = corners.len();
        lines
            .into_iter()
            .enumerate()
            .map(|(i, l)| (l, FloatLine::new(corners[i], corners[(i + 1) % n])))
            .collect()
    }

    /// End points of a one-dimensional shape, or the two corners farthest apart.
    pub fn extreme_points(&self) -> Option<(FloatPoint, FloatPoint)> {
        let corners = self.corners();
        let first = *corners.first()?;
        let mut best = (first, first, 0.0);
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                let d = a.distance_square(*b);
                if d > best.2 {
                    best = (*a, *b, d);
                }
            }
        }
        Some((best.0, best.1))
    }

    pub fn bounding_box(&self) -> IntBox {
        match self {
            TileShape::Box(b) => *b,
            TileShape::Octagon(o) => o.bounding_box(),
            TileShape::Simplex(s) if s.is_empty() => IntBox::EMPTY,
            TileShape::Simplex(s) => IntBox::bounding(s.corners()),
        }
    }

    pub fn bounding_octagon(&self) -> IntOctagon {
        match self {
            TileShape::Box(b) => IntOctagon::from_box(b),
            TileShape::Octagon(o) => *o,
            TileShape::Simplex(s) => IntOctagon::bounding(s.corners()),
        }
    }

    pub fn centre(&self) -> FloatPoint {
        let corners = match self {
            TileShape::Simplex(s) => s.distinct_corners(),
            _ => self.corners(),
        };
        if corners.is_empty() {
            return FloatPoint::default();
        }
        let sum = corners.iter().fold(FloatPoint::default(), |acc, c| acc + *c);
        sum * (1.0 / corners.len() as f64)
    }

    pub fn intersection(&self, other: &TileShape) -> TileShape {
        match (self, other) {
            (TileShape::Box(a), TileShape::Box(b)) => TileShape::Box(a.intersection(b)),
            (
                TileShape::Box(_) | TileShape::Octagon(_),
                TileShape::Box(_) | TileShape::Octagon(_),
            ) => {
                let octagon = self.bounding_octagon().intersection(&other.bounding_octagon());
                TileShape::Octagon(octagon)
            }
            _ => TileShape::Simplex(self.to_simplex().intersection(&other.to_simplex())),
        }
    }

    /// Intersection with the closed half-plane on the left of `line`.
    pub fn intersection_with_halfplane(&self, line: &Line) -> TileShape {
        TileShape::Simplex(self.to_simplex().intersection_with_halfplane(line)).simplify()
    }

    /// Enlarges the shape by `offset`; a negative offset shrinks it.
    pub fn offset(&self, offset: f64) -> TileShape {
        match self {
            TileShape::Box(b) if offset.fract() == 0.0 => TileShape::Box(b.offset(offset as i64)),
            TileShape::Octagon(o) => TileShape::Octagon(o.offset(offset)),
            _ => TileShape::Simplex(self.to_simplex().offset(offset)),
        }
    }

    pub fn shrink(&self, offset: f64) -> TileShape {
        self.offset(-offset)
    }

    pub fn contains(&self, p: FloatPoint) -> bool {
        match self {
            TileShape::Box(b) => !b.is_empty() && b.contains(p),
            TileShape::Octagon(o) => !o.is_empty() && o.contains(p),
            TileShape::Simplex(s) => s.contains(p),
        }
    }

    pub fn contains_inside(&self, p: FloatPoint) -> bool {
        match self {
            TileShape::Box(b) => {
                p.x > b.ll.x as f64 + EPS
                    && p.x < b.ur.x as f64 - EPS
                    && p.y > b.ll.y as f64 + EPS
                    && p.y < b.ur.y as f64 - EPS
            }
            _ => self.to_simplex().contains_inside(p),
        }
    }

    /// True if every point of `other` lies in `self`.
    pub fn contains_shape(&self, other: &TileShape) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        other.corners().iter().all(|c| self.contains_with_tolerance(*c, TOUCH_EPS))
    }

    fn contains_with_tolerance(&self, p: FloatPoint, tolerance: f64) -> bool {
        self.border_lines().iter().all(|l| l.signed_distance(p) >= -tolerance)
    }

    /// Closed intersection test, shapes touching at a point intersect.
    pub fn intersects(&self, other: &TileShape) -> bool {
        if !self.bounding_box().intersects(&other.bounding_box()) {
            return false;
        }
        self.intersection(other).dimension() != Dimension::Empty
    }

    pub fn overlaps_interior(&self, other: &TileShape) -> bool {
        if !self.bounding_box().overlaps_interior(&other.bounding_box()) {
            return false;
        }
        self.intersection(other).dimension() == Dimension::Area
    }

    pub fn nearest_point(&self, p: FloatPoint) -> FloatPoint {
        if self.contains(p) {
            return p;
        }
        let corners = self.corners();
        let n = corners.len();
        let mut best = p;
        let mut best_dist = f64::INFINITY;
        for i in 0..n {
            let q = p.nearest_on_segment(corners[i], corners[(i + 1) % n]);
            let d = p.distance_square(q);
            if d < best_dist {
                best_dist = d;
                best = q;
            }
        }
        best
    }

    pub fn distance(&self, p: FloatPoint) -> f64 {
        p.distance(self.nearest_point(p))
    }

    /// Distance between the shape and the closed segment `a`..`b`.
    pub fn distance_to_segment(&self, a: FloatPoint, b: FloatPoint) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        if self.contains(a) || self.contains(b) {
            return 0.0;
        }
        let segment = FloatLine::new(a, b);
        let corners = self.corners();
        let n = corners.len();
        let mut best = f64::INFINITY;
        for i in 0..n {
            let (c, d) = (corners[i], corners[(i + 1) % n]);
            if segment.intersects(&FloatLine::new(c, d), EPS) {
                return 0.0;
            }
            best = best
                .min(c.distance_to_segment(a, b))
                .min(a.distance_to_segment(c, d))
                .min(b.distance_to_segment(c, d));
        }
        best
    }

    /// Distance between the two shapes, zero if they meet.
    pub fn distance_to_shape(&self, other: &TileShape) -> f64 {
        if self.is_empty() || other.is_empty() {
            return f64::INFINITY;
        }
        if self.intersects(other) {
            return 0.0;
        }
        let corners = self.corners();
        let n = corners.len();
        (0..n)
            .map(|i| other.distance_to_segment(corners[i], corners[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min)
    }

    /// Index of the border line of `self` on which all of `touching` lies.
    pub fn touching_side(&self, touching: &TileShape) -> Option<usize> {
        let corners = touching.corners();
        if corners.is_empty() {
            return None;
        }
        self.border_lines().iter().position(|l| {
            corners.iter().all(|c| l.signed_distance(*c).abs() <= TOUCH_EPS)
        })
    }

    /// True if part of the segment `a`..`b` runs through the interior of the shape.
    pub fn segment_crosses_interior(&self, a: FloatPoint, b: FloatPoint) -> bool {
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        for line in self.border_lines() {
            let da = line.signed_distance(a) - TOUCH_EPS;
            let db = line.signed_distance(b) - TOUCH_EPS;
            if da <= 0.0 && db <= 0.0 {
                return false;
            }
            if da < 0.0 || db < 0.0 {
                let t = da / (da - db);
                if da < 0.0 {
                    t0 = t0.max(t);
                } else {
                    t1 = t1.min(t);
                }
            }
        }
        (t1 - t0) * a.distance(b) > TOUCH_EPS
    }

    /// Shape with border line `index` removed. May reach far beyond the
    /// original, callers intersect with the board.
    pub fn without_border_line(&self, index: usize) -> TileShape {
        TileShape::Simplex(self.to_simplex().without_line(index)).simplify()
    }

    /// Cuts the shape into strips no wider than `max_width` along its longer axis.
    pub fn divide_into_sections(&self, max_width: f64) -> Vec<TileShape> {
        let bb = self.bounding_box();
        if bb.is_empty() || max_width <= 0.0 {
            return vec![self.clone()];
        }
        let horizontal = bb.width() >= bb.height();
        let extent = if horizontal { bb.width() } else { bb.height() } as f64;
        let count = (extent / max_width).ceil().max(1.0) as i64;
        if count <= 1 {
            return vec![self.clone()];
        }
        let extent = extent as i64;
        let mut result = Vec::with_capacity(count as usize);
        for i in 0..count {
            let from = extent * i / count;
            let to = extent * (i + 1) / count;
            let strip = if horizontal {
                IntBox::from_coords(bb.ll.x + from, bb.ll.y, bb.ll.x + to, bb.ur.y)
            } else {
                IntBox::from_coords(bb.ll.x, bb.ll.y + from, bb.ur.x, bb.ll.y + to)
            };
            let piece = self.intersection(&TileShape::Box(strip));
            if piece.dimension() == Dimension::Area {
                result.push(piece);
            }
        }
        result
    }

    /// Convex pieces covering `self` minus the interior of `obstacle`.
    pub fn cutout(&self, obstacle: &TileShape) -> Vec<TileShape> {
        if !self.overlaps_interior(obstacle) {
            return vec![self.clone()];
        }
        let mut result = Vec::new();
        let mut remaining = self.clone();
        for line in obstacle.border_lines() {
            let piece = remaining.intersection_with_halfplane(&line.opposite());
            if piece.dimension() == Dimension::Area {
                result.push(piece);
            }
            remaining = remaining.intersection_with_halfplane(&line);
            if remaining.dimension() != Dimension::Area {
                break;
            }
        }
        result
    }

    /// Converts to the simplest family that represents the same point set.
    pub fn simplify(&self) -> TileShape {
        match self {
            TileShape::Box(_) => self.clone(),
            TileShape::Octagon(o) => {
                if !o.is_empty()
                    && o.ulx == o.lx - o.uy
                    && o.lrx == o.rx - o.ly
                    && o.llx == o.lx + o.ly
                    && o.urx == o.rx + o.uy
                {
                    TileShape::Box(o.bounding_box())
                } else {
                    self.clone()
                }
            }
            TileShape::Simplex(s) => {
                if s.is_empty() {
                    self.clone()
                } else if s.lines().iter().all(Line::is_axis_parallel) {
                    TileShape::Box(IntBox::bounding(s.corners()))
                } else if s.lines().iter().all(Line::is_multiple_of_45) {
                    TileShape::Octagon(IntOctagon::bounding(s.corners())).simplify()
                } else {
                    self.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x0: i64, y0: i64, x1: i64, y1: i64) -> TileShape {
        TileShape::Box(IntBox::from_coords(x0, y0, x1, y1))
    }

    fn diamond() -> TileShape {
        TileShape::Octagon(IntOctagon::bounding(&[
            FloatPoint::new(50.0, 0.0),
            FloatPoint::new(100.0, 50.0),
            FloatPoint::new(50.0, 100.0),
            FloatPoint::new(0.0, 50.0),
        ]))
    }

    #[test]
    fn dimensions_of_degenerate_shapes() {
        assert_eq!(b(0, 0, 0, 0).dimension(), Dimension::Point);
        assert_eq!(b(0, 0, 10, 0).dimension(), Dimension::Line);
        assert_eq!(b(0, 0, 10, 10).dimension(), Dimension::Area);
        let touching = b(0, 0, 10, 10).intersection(&b(10, 0, 20, 10));
        assert_eq!(touching.dimension(), Dimension::Line);
        let diagonal = TileShape::segment(IntPoint::new(0, 0), IntPoint::new(7, 7));
        assert_eq!(diagonal.dimension(), Dimension::Line);
    }

    #[test]
    fn mixed_family_intersection() {
        let cut = diamond().intersection(&b(0, 0, 50, 100));
        assert!((cut.area() - 2500.0).abs() < 1e-6);
        let skew = TileShape::Simplex(Simplex::from_lines(&[
            Line::new(IntPoint::new(0, 0), IntPoint::new(3, 1)),
            Line::new(IntPoint::new(3, 1), IntPoint::new(0, 5)),
            Line::new(IntPoint::new(0, 5), IntPoint::new(0, 0)),
        ]));
        let clipped = skew.intersection(&b(0, 0, 1, 5));
        assert_eq!(clipped.dimension(), Dimension::Area);
        assert!(b(0, 0, 1, 5).contains_shape(&clipped));
    }

    #[test]
    fn touching_side_of_neighbour() {
        let room = b(0, 0, 10, 10);
        let contact = room.intersection(&b(10, 2, 20, 8));
        assert_eq!(room.touching_side(&contact), Some(1));
    }

    #[test]
    fn simplify_recovers_families() {
        let square = TileShape::Simplex(b(0, 0, 10, 10).to_simplex());
        assert_eq!(square.simplify(), b(0, 0, 10, 10));
        let d = TileShape::Simplex(diamond().to_simplex()).simplify();
        assert!(matches!(d, TileShape::Octagon(_)));
        assert!((d.area() - 5000.0).abs() < 1e-6);
    }

    #[test]
    fn cutout_covers_the_difference() {
        let pieces = b(0, 0, 100, 100).cutout(&b(40, 40, 60, 60));
        let total: f64 = pieces.iter().map(TileShape::area).sum();
        assert!((total - (10000.0 - 400.0)).abs() < 1e-6);
        for piece in &pieces {
            assert!(!piece.overlaps_interior(&b(40, 40, 60, 60)));
        }
    }

    #[test]
    fn sections_of_a_wide_box() {
        let sections = b(0, 0, 1000, 100).divide_into_sections(300.0);
        assert_eq!(sections.len(), 4);
        let total: f64 = sections.iter().map(TileShape::area).sum();
        assert!((total - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn segment_distance_and_crossing() {
        let room = b(0, 0, 10, 10);
        let a = FloatPoint::new(20.0, 5.0);
        assert!((room.distance_to_segment(a, FloatPoint::new(30.0, 5.0)) - 10.0).abs() < 1e-9);
        assert_eq!(room.distance_to_segment(a, FloatPoint::new(-5.0, 5.0)), 0.0);
        let fp = FloatPoint::new;
        assert!(room.segment_crosses_interior(fp(-5.0, 5.0), fp(5.0, 5.0)));
        assert!(!room.segment_crosses_interior(fp(0.0, -5.0), fp(0.0, 15.0)));
    }
}
