//! Small float helpers for corner rounding in any-angle routing.

use super::point::FloatPoint;
use super::GeometryWarning;

/// Tangent points from `p` to the circle around `centre`.
///
/// Returns `(left, right)`: seen from `p` looking at `centre`, the circle lies
/// to the right of the ray towards `left` and to the left of the ray towards
/// `right`.
pub fn tangent_points(
    p: FloatPoint,
    centre: FloatPoint,
    radius: f64,
) -> Result<(FloatPoint, FloatPoint), GeometryWarning> {
    let to_centre = centre - p;
    let dist = to_centre.length();
    if dist <= radius {
        return Err(GeometryWarning::NoTangent);
    }
    let tangent_len = (dist * dist - radius * radius).sqrt();
    let alpha = (radius / dist).asin();
    let dir = to_centre.normalize().ok_or(GeometryWarning::DegenerateSegment)?;
    let rotate = |a: f64| {
        let (s, c) = a.sin_cos();
        FloatPoint::new(dir.x * c - dir.y * s, dir.x * s + dir.y * c)
    };
    Ok((p + rotate(alpha) * tangent_len, p + rotate(-alpha) * tangent_len))
}

/// Intersection of the infinite lines through `a0`,`a1` and `b0`,`b1`.
pub fn line_intersection(
    a0: FloatPoint,
    a1: FloatPoint,
    b0: FloatPoint,
    b1: FloatPoint,
) -> Result<FloatPoint, GeometryWarning> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.cross(db);
    if denom.abs() <= 1e-12 * da.length() * db.length() {
        return Err(GeometryWarning::ParallelLines);
    }
    let t = (b0 - a0).cross(db) / denom;
    Ok(a0 + da * t)
}

/// Positive if `c` lies left of the directed line `a`..`b`.
#[inline]
pub fn turn(a: FloatPoint, b: FloatPoint, c: FloatPoint) -> f64 {
    (b - a).cross(c - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangents_touch_the_circle() {
        let p = FloatPoint::new(0.0, 0.0);
        let c = FloatPoint::new(10.0, 0.0);
        let (left, right) = tangent_points(p, c, 5.0).unwrap();
        assert!((left.distance(c) - 5.0).abs() < 1e-9);
        assert!((right.distance(c) - 5.0).abs() < 1e-9);
        assert!(left.y > 0.0 && right.y < 0.0);
        assert!(tangent_points(p, c, 20.0).is_err());
    }

    #[test]
    fn crossing_lines() {
        let x = line_intersection(
            FloatPoint::new(0.0, 0.0),
            FloatPoint::new(1.0, 1.0),
            FloatPoint::new(0.0, 2.0),
            FloatPoint::new(1.0, 1.0),
        )
        .unwrap();
        assert!(x.approx_eq(FloatPoint::new(1.0, 1.0), 1e-12));
    }
}
