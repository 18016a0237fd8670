use super::point::{FloatPoint, IntPoint};
use super::GeometryWarning;

/// A directed line through two distinct integer points.
///
/// Used as a half-plane: the points on the left of the direction, and on the
/// line itself, are inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Line {
    pub a: IntPoint,
    pub b: IntPoint,
}

impl Line {
    pub const fn new(a: IntPoint, b: IntPoint) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn direction(&self) -> IntPoint {
        self.b - self.a
    }

    pub fn opposite(&self) -> Line {
        Line::new(self.b, self.a)
    }

    /// Direction angle in `[0, 2π)`.
    pub fn angle(&self) -> f64 {
        let d = self.direction();
        let a = (d.y as f64).atan2(d.x as f64);
        if a < 0.0 { a + std::f64::consts::TAU } else { a }
    }

    /// Positive on the left (inside), negative on the right.
    pub fn signed_distance(&self, p: FloatPoint) -> f64 {
        let d = self.direction().to_float();
        let len = d.length();
        if len == 0.0 {
            return 0.0;
        }
        d.cross(p - self.a.to_float()) / len
    }

    /// Exact side test for integer points: >0 left, <0 right, 0 on the line.
    pub fn side_of(&self, p: IntPoint) -> i128 {
        self.direction().cross(p - self.a)
    }

    pub fn is_parallel(&self, other: &Line) -> bool {
        self.direction().cross(other.direction()) == 0
    }

    /// Same direction and same supporting line.
    pub fn is_equal_or_opposite(&self, other: &Line) -> bool {
        self.is_parallel(other) && self.side_of(other.a) == 0
    }

    pub fn is_axis_parallel(&self) -> bool {
        self.direction().is_axis_direction()
    }

    pub fn is_multiple_of_45(&self) -> bool {
        self.direction().is_multiple_of_45()
    }

    pub fn intersection(&self, other: &Line) -> Result<FloatPoint, GeometryWarning> {
        let d1 = self.direction();
        let d2 = other.direction();
        let denom = d1.cross(d2);
        if denom == 0 {
            return Err(GeometryWarning::ParallelLines);
        }
        let num = (other.a - self.a).cross(d2);
        // a1 + d1 * num / denom, numerators kept in i128 until the final division.
        let x = (self.a.x as i128 * denom + d1.x as i128 * num) as f64 / denom as f64;
        let y = (self.a.y as i128 * denom + d1.y as i128 * num) as f64 / denom as f64;
        Ok(FloatPoint::new(x, y))
    }

    /// Parallel line moved by `offset` to the right, which enlarges the half-plane.
    pub fn translate(&self, offset: f64) -> Line {
        let d = self.direction().to_float();
        let len = d.length();
        if len == 0.0 || offset == 0.0 {
            return *self;
        }
        let shift = FloatPoint::new(d.y / len * offset, -d.x / len * offset).round();
        Line::new(self.a + shift, self.b + shift)
    }

    /// Orthogonal projection of `p` onto the line.
    pub fn projection(&self, p: FloatPoint) -> FloatPoint {
        let a = self.a.to_float();
        let d = self.direction().to_float();
        let len_sq = d.dot(d);
        if len_sq == 0.0 {
            return a;
        }
        a + d * ((p - a).dot(d) / len_sq)
    }

    /// Integer point on the line near `p`, moved along the line towards `towards`.
    ///
    /// For axis and diagonal lines the result lies exactly on the line.
    pub fn grid_point_towards(&self, p: FloatPoint, towards: FloatPoint) -> IntPoint {
        let d = self.direction();
        let along_x = d.x != 0 && (d.y == 0 || d.x.abs() == d.y.abs());
        if d.x == 0 {
            let y = round_towards(p.y, towards.y);
            return IntPoint::new(self.a.x, y);
        }
        if along_x {
            let x = round_towards(p.x, towards.x);
            let steps = x - self.a.x;
            let y = self.a.y + steps * d.y / d.x.abs() * d.x.signum();
            return IntPoint::new(x, y);
        }
        p.round()
    }
}

fn round_towards(value: f64, towards: f64) -> i64 {
    if (value - value.round()).abs() < 1e-6 {
        value.round() as i64
    } else if towards > value {
        value.ceil() as i64
    } else {
        value.floor() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ax: i64, ay: i64, bx: i64, by: i64) -> Line {
        Line::new(IntPoint::new(ax, ay), IntPoint::new(bx, by))
    }

    #[test]
    fn left_side_is_inside() {
        let l = line(0, 0, 10, 0);
        assert!(l.signed_distance(FloatPoint::new(5.0, 3.0)) > 0.0);
        assert!(l.side_of(IntPoint::new(5, -3)) < 0);
        assert_eq!(l.side_of(IntPoint::new(-7, 0)), 0);
    }

    #[test]
    fn intersection_of_diagonals() {
        let p = line(0, 0, 1, 1).intersection(&line(0, 10, 1, 9)).unwrap();
        assert!(p.approx_eq(FloatPoint::new(5.0, 5.0), 1e-9));
        assert!(line(0, 0, 1, 0).intersection(&line(0, 5, -3, 5)).is_err());
    }

    #[test]
    fn translate_moves_outwards() {
        let l = line(0, 0, 10, 0).translate(4.0);
        assert_eq!(l.a, IntPoint::new(0, -4));
        assert!(l.is_parallel(&line(0, 0, 10, 0)));
    }

    #[test]
    fn grid_point_stays_on_diagonal() {
        let l = line(0, 0, 1, 1);
        let p = l.grid_point_towards(FloatPoint::new(2.5, 2.5), FloatPoint::new(10.0, 10.0));
        assert_eq!(p, IntPoint::new(3, 3));
    }
}
