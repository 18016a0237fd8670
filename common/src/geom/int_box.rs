use super::line::Line;
use super::point::{FloatPoint, IntPoint};

/// Axis-aligned integer rectangle with inclusive bounds.
///
/// A box with `ll.x > ur.x` or `ll.y > ur.y` is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntBox {
    pub ll: IntPoint,
    pub ur: IntPoint,
}

impl IntBox {
    pub const EMPTY: IntBox = IntBox {
        ll: IntPoint::new(i64::MAX / 4, i64::MAX / 4),
        ur: IntPoint::new(i64::MIN / 4, i64::MIN / 4),
    };

    pub fn new(ll: IntPoint, ur: IntPoint) -> Self {
        Self { ll, ur }
    }

    pub fn from_coords(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self::new(IntPoint::new(x0.min(x1), y0.min(y1)), IntPoint::new(x0.max(x1), y0.max(y1)))
    }

    pub fn point(p: IntPoint) -> Self {
        Self::new(p, p)
    }

    /// Smallest integer box containing all `points`.
    pub fn bounding(points: &[FloatPoint]) -> Self {
        let mut result = IntBox::EMPTY;
        for p in points {
            result.ll.x = result.ll.x.min(p.x.floor() as i64);
            result.ll.y = result.ll.y.min(p.y.floor() as i64);
            result.ur.x = result.ur.x.max(p.x.ceil() as i64);
            result.ur.y = result.ur.y.max(p.y.ceil() as i64);
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.ll.x > self.ur.x || self.ll.y > self.ur.y
    }

    pub fn width(&self) -> i64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> i64 {
        self.ur.y - self.ll.y
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width() as f64 * self.height() as f64
        }
    }

    pub fn centre(&self) -> FloatPoint {
        self.ll.to_float().middle(self.ur.to_float())
    }

    pub fn union(&self, other: &IntBox) -> IntBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IntBox::new(
            IntPoint::new(self.ll.x.min(other.ll.x), self.ll.y.min(other.ll.y)),
            IntPoint::new(self.ur.x.max(other.ur.x), self.ur.y.max(other.ur.y)),
        )
    }

    pub fn intersection(&self, other: &IntBox) -> IntBox {
        IntBox::new(
            IntPoint::new(self.ll.x.max(other.ll.x), self.ll.y.max(other.ll.y)),
            IntPoint::new(self.ur.x.min(other.ur.x), self.ur.y.min(other.ur.y)),
        )
    }

    /// Closed intersection test, touching boxes intersect.
    pub fn intersects(&self, other: &IntBox) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn overlaps_interior(&self, other: &IntBox) -> bool {
        self.ll.x < other.ur.x
            && self.ur.x > other.ll.x
            && self.ll.y < other.ur.y
            && self.ur.y > other.ll.y
    }

    pub fn contains(&self, p: FloatPoint) -> bool {
        p.x >= self.ll.x as f64
            && p.x <= self.ur.x as f64
            && p.y >= self.ll.y as f64
            && p.y <= self.ur.y as f64
    }

    pub fn contains_box(&self, other: &IntBox) -> bool {
        other.is_empty()
            || (self.ll.x <= other.ll.x
                && self.ll.y <= other.ll.y
                && self.ur.x >= other.ur.x
                && self.ur.y >= other.ur.y)
    }

    /// Enlarges by `offset` on every side; a negative offset shrinks.
    pub fn offset(&self, offset: i64) -> IntBox {
        if self.is_empty() {
            return *self;
        }
        IntBox::new(
            IntPoint::new(self.ll.x - offset, self.ll.y - offset),
            IntPoint::new(self.ur.x + offset, self.ur.y + offset),
        )
    }

    /// Counter-clockwise border lines starting with the bottom edge.
    ///
    /// The lines are defined by unit direction vectors so that degenerate boxes
    /// still produce valid half-planes.
    pub fn border_lines(&self) -> [Line; 4] {
        let (ll, ur) = (self.ll, self.ur);
        [
            Line::new(ll, IntPoint::new(ll.x + 1, ll.y)),
            Line::new(IntPoint::new(ur.x, ll.y), IntPoint::new(ur.x, ll.y + 1)),
            Line::new(ur, IntPoint::new(ur.x - 1, ur.y)),
            Line::new(IntPoint::new(ll.x, ur.y), IntPoint::new(ll.x, ur.y - 1)),
        ]
    }

    /// Corners in counter-clockwise order starting lower left.
    pub fn corners(&self) -> [FloatPoint; 4] {
        [
            self.ll.to_float(),
            FloatPoint::new(self.ur.x as f64, self.ll.y as f64),
            self.ur.to_float(),
            FloatPoint::new(self.ll.x as f64, self.ur.y as f64),
        ]
    }

    /// Euclidean distance from `p` to the box, zero inside.
    pub fn distance(&self, p: FloatPoint) -> f64 {
        let dx = (self.ll.x as f64 - p.x).max(0.0).max(p.x - self.ur.x as f64);
        let dy = (self.ll.y as f64 - p.y).max(0.0).max(p.y - self.ur.y as f64);
        dx.hypot(dy)
    }

    /// Axis distances from `p` to the box, zero inside.
    pub fn axis_distances(&self, p: FloatPoint) -> (f64, f64) {
        let dx = (self.ll.x as f64 - p.x).max(0.0).max(p.x - self.ur.x as f64);
        let dy = (self.ll.y as f64 - p.y).max(0.0).max(p.y - self.ur.y as f64);
        (dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_boxes_intersect_but_do_not_overlap() {
        let a = IntBox::from_coords(0, 0, 10, 10);
        let b = IntBox::from_coords(10, 0, 20, 10);
        assert!(a.intersects(&b));
        assert!(!a.overlaps_interior(&b));
        assert_eq!(a.intersection(&b).width(), 0);
    }

    #[test]
    fn union_ignores_empty() {
        let a = IntBox::from_coords(0, 0, 10, 10);
        assert_eq!(IntBox::EMPTY.union(&a), a);
        assert!(IntBox::EMPTY.is_empty());
        assert_eq!(IntBox::bounding(&[FloatPoint::new(0.5, 1.5)]), IntBox::from_coords(0, 1, 1, 2));
    }

    #[test]
    fn border_lines_enclose_the_box() {
        let b = IntBox::from_coords(0, 0, 10, 5);
        let centre = b.centre();
        for line in b.border_lines() {
            assert!(line.signed_distance(centre) > 0.0);
        }
    }
}
