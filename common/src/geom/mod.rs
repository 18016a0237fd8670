pub mod int_box;
pub mod line;
pub mod math;
pub mod octagon;
pub mod point;
pub mod rtree;
pub mod shape_tree;
pub mod simplex;
pub mod tile;

pub use int_box::IntBox;
pub use line::Line;
pub use octagon::IntOctagon;
pub use point::{FloatLine, FloatPoint, IntPoint};
pub use simplex::Simplex;
pub use tile::{Dimension, TileShape};

use thiserror::Error;

/// Tolerance for float comparisons against integer geometry.
pub const EPS: f64 = 1e-6;

/// Recoverable geometry degeneracies. Callers usually log these and skip the
/// offending shape instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryWarning {
    #[error("lines are parallel and have no single intersection")]
    ParallelLines,
    #[error("shape is empty")]
    EmptyShape,
    #[error("shape has no area (dimension {0:?})")]
    NotAnArea(Dimension),
    #[error("point lies inside the circle, no tangent exists")]
    NoTangent,
    #[error("segment has zero length")]
    DegenerateSegment,
}
