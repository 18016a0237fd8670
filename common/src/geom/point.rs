use std::ops::{Add, Mul, Neg, Sub};

/// Integer board coordinate. All committed geometry lives on this grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn to_float(self) -> FloatPoint {
        FloatPoint::new(self.x as f64, self.y as f64)
    }

    /// Cross product of `self` and `other` seen as vectors. Exact.
    #[inline]
    pub fn cross(self, other: IntPoint) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    #[inline]
    pub fn dot(self, other: IntPoint) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    pub fn distance(self, other: IntPoint) -> f64 {
        self.to_float().distance(other.to_float())
    }

    pub fn is_axis_direction(self) -> bool {
        (self.x == 0) != (self.y == 0)
    }

    /// True for the eight directions that are multiples of 45 degrees.
    pub fn is_multiple_of_45(self) -> bool {
        if self.x == 0 && self.y == 0 {
            return false;
        }
        self.x == 0 || self.y == 0 || self.x.abs() == self.y.abs()
    }
}

impl Add for IntPoint {
    type Output = IntPoint;
    fn add(self, o: IntPoint) -> IntPoint {
        IntPoint::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for IntPoint {
    type Output = IntPoint;
    fn sub(self, o: IntPoint) -> IntPoint {
        IntPoint::new(self.x - o.x, self.y - o.y)
    }
}

impl Neg for IntPoint {
    type Output = IntPoint;
    fn neg(self) -> IntPoint {
        IntPoint::new(-self.x, -self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FloatPoint {
    pub x: f64,
    pub y: f64,
}

impl FloatPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn round(self) -> IntPoint {
        IntPoint::new(self.x.round() as i64, self.y.round() as i64)
    }

    #[inline]
    pub fn cross(self, other: FloatPoint) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn dot(self, other: FloatPoint) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn distance(self, other: FloatPoint) -> f64 {
        (self - other).length()
    }

    #[inline]
    pub fn distance_square(self, other: FloatPoint) -> f64 {
        let d = self - other;
        d.dot(d)
    }

    pub fn middle(self, other: FloatPoint) -> FloatPoint {
        FloatPoint::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    pub fn approx_eq(self, other: FloatPoint, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }

    /// Unit vector in the direction of `self`, or `None` for the null vector.
    pub fn normalize(self) -> Option<FloatPoint> {
        let len = self.length();
        if len <= f64::EPSILON {
            None
        } else {
            Some(FloatPoint::new(self.x / len, self.y / len))
        }
    }

    /// The point at distance `length` from `self` in the direction of `to`.
    pub fn change_length(self, to: FloatPoint, length: f64) -> FloatPoint {
        match (to - self).normalize() {
            Some(dir) => self + dir * length,
            None => self,
        }
    }

    /// Nearest point to `self` on the closed segment `a`..`b`.
    pub fn nearest_on_segment(self, a: FloatPoint, b: FloatPoint) -> FloatPoint {
        let ab = b - a;
        let len_sq = ab.dot(ab);
        if len_sq <= f64::EPSILON {
            return a;
        }
        let t = ((self - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        a + ab * t
    }

    pub fn distance_to_segment(self, a: FloatPoint, b: FloatPoint) -> f64 {
        self.distance(self.nearest_on_segment(a, b))
    }
}

impl Add for FloatPoint {
    type Output = FloatPoint;
    fn add(self, o: FloatPoint) -> FloatPoint {
        FloatPoint::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for FloatPoint {
    type Output = FloatPoint;
    fn sub(self, o: FloatPoint) -> FloatPoint {
        FloatPoint::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f64> for FloatPoint {
    type Output = FloatPoint;
    fn mul(self, s: f64) -> FloatPoint {
        FloatPoint::new(self.x * s, self.y * s)
    }
}

impl From<IntPoint> for FloatPoint {
    fn from(p: IntPoint) -> FloatPoint {
        p.to_float()
    }
}

/// A segment between two float points. Used for door sections and shape entries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatLine {
    pub a: FloatPoint,
    pub b: FloatPoint,
}

impl FloatLine {
    pub const fn new(a: FloatPoint, b: FloatPoint) -> Self {
        Self { a, b }
    }

    pub fn point(p: FloatPoint) -> Self {
        Self { a: p, b: p }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    pub fn middle(&self) -> FloatPoint {
        self.a.middle(self.b)
    }

    pub fn nearest_point(&self, p: FloatPoint) -> FloatPoint {
        p.nearest_on_segment(self.a, self.b)
    }

    /// Shortens the segment by `offset` at both ends. Returns `None` if nothing is left.
    pub fn shrink(&self, offset: f64) -> Option<FloatLine> {
        let len = self.length();
        if len < 2.0 * offset {
            return None;
        }
        if offset <= 0.0 {
            return Some(*self);
        }
        Some(FloatLine::new(
            self.a.change_length(self.b, offset),
            self.b.change_length(self.a, offset),
        ))
    }

    /// Splits the segment into `count` consecutive pieces of equal length.
    pub fn divide(&self, count: usize) -> Vec<FloatLine> {
        let count = count.max(1);
        let step = (self.b - self.a) * (1.0 / count as f64);
        (0..count)
            .map(|i| {
                let from = self.a + step * i as f64;
                let to = if i + 1 == count { self.b } else { from + step };
                FloatLine::new(from, to)
            })
            .collect()
    }

    /// Distance between the two closed segments.
    pub fn distance_to(&self, other: &FloatLine) -> f64 {
        if self.intersects(other, 0.0) {
            return 0.0;
        }
        other
            .a
            .distance_to_segment(self.a, self.b)
            .min(other.b.distance_to_segment(self.a, self.b))
            .min(self.a.distance_to_segment(other.a, other.b))
            .min(self.b.distance_to_segment(other.a, other.b))
    }

    /// True if the closed segments share at least one point, within `eps`.
    pub fn intersects(&self, other: &FloatLine, eps: f64) -> bool {
        let d1 = self.b - self.a;
        let d2 = other.b - other.a;
        let denom = d1.cross(d2);
        if denom.abs() <= f64::EPSILON {
            // Parallel: touching only if collinear and overlapping.
            return other.a.distance_to_segment(self.a, self.b) <= eps
                || other.b.distance_to_segment(self.a, self.b) <= eps
                || self.a.distance_to_segment(other.a, other.b) <= eps;
        }
        let t = (other.a - self.a).cross(d2) / denom;
        let u = (other.a - self.a).cross(d1) / denom;
        let t_eps = eps / d1.length().max(f64::EPSILON);
        let u_eps = eps / d2.length().max(f64::EPSILON);
        t >= -t_eps && t <= 1.0 + t_eps && u >= -u_eps && u <= 1.0 + u_eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_length_moves_towards_target() {
        let p = FloatPoint::new(0.0, 0.0).change_length(FloatPoint::new(10.0, 0.0), 4.0);
        assert!(p.approx_eq(FloatPoint::new(4.0, 0.0), 1e-9));
    }

    #[test]
    fn shrink_and_divide_segment() {
        let line = FloatLine::new(FloatPoint::new(0.0, 0.0), FloatPoint::new(0.0, 100.0));
        let shrunk = line.shrink(10.0).unwrap();
        assert!(shrunk.a.approx_eq(FloatPoint::new(0.0, 10.0), 1e-9));
        assert!(shrunk.b.approx_eq(FloatPoint::new(0.0, 90.0), 1e-9));
        assert!(line.shrink(60.0).is_none());

        let pieces = shrunk.divide(4);
        assert_eq!(pieces.len(), 4);
        assert!(pieces[3].b.approx_eq(shrunk.b, 1e-9));
    }

    #[test]
    fn segments_crossing_and_missing() {
        let a = FloatLine::new(FloatPoint::new(0.0, 0.0), FloatPoint::new(10.0, 10.0));
        let b = FloatLine::new(FloatPoint::new(0.0, 10.0), FloatPoint::new(10.0, 0.0));
        let c = FloatLine::new(FloatPoint::new(20.0, 0.0), FloatPoint::new(30.0, 0.0));
        assert!(a.intersects(&b, 1e-9));
        assert!(!a.intersects(&c, 1e-9));
    }
}
