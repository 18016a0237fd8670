//! Shape families for the three angle restrictions.
//!
//! Room completion and locate are generic over [`TileGeometry`]; the engine
//! picks the implementation once per attempt.

use std::collections::BTreeMap;

use pcb_common::geom::shape_tree::BoundingShape;
use pcb_common::geom::{IntBox, IntOctagon, IntPoint, TileShape};
use pcb_common::util::config::AngleRestriction;

use crate::tree::{SearchTree, TreeStore};

/// Shared by reference with the worker threads that build the search trees.
pub trait TileGeometry: Copy + Default + Send + Sync {
    type Bounds: BoundingShape;
    const ANGLE: AngleRestriction;

    /// Converts an enlarged item shape to the family, never shrinking it.
    fn tree_shape(&self, shape: &TileShape) -> TileShape;

    fn trees(store: &mut TreeStore) -> &mut BTreeMap<usize, SearchTree<Self::Bounds>>;

    fn segment_allowed(&self, a: IntPoint, b: IntPoint) -> bool;

    /// Intermediate corners for an illegal leg `a`..`b`, most preferred first.
    /// The leg along the axis with the larger delta comes first.
    fn corner_candidates(&self, a: IntPoint, b: IntPoint) -> Vec<IntPoint>;
}

/// Axis-parallel boxes, 90 degree traces.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxGeometry;

/// Octagons, 45 degree traces.
#[derive(Clone, Copy, Debug, Default)]
pub struct OctagonGeometry;

/// General convex shapes, any-angle traces.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimplexGeometry;

impl TileGeometry for BoxGeometry {
    type Bounds = IntBox;
    const ANGLE: AngleRestriction = AngleRestriction::Ninety;

    fn tree_shape(&self, shape: &TileShape) -> TileShape {
        TileShape::Box(shape.bounding_box())
    }

    fn trees(store: &mut TreeStore) -> &mut BTreeMap<usize, SearchTree<IntBox>> {
        &mut store.boxes
    }

    fn segment_allowed(&self, a: IntPoint, b: IntPoint) -> bool {
        a.x == b.x || a.y == b.y
    }

    fn corner_candidates(&self, a: IntPoint, b: IntPoint) -> Vec<IntPoint> {
        if self.segment_allowed(a, b) {
            return Vec::new();
        }
        let horizontal_first = IntPoint::new(b.x, a.y);
        let vertical_first = IntPoint::new(a.x, b.y);
        if (b.x - a.x).abs() >= (b.y - a.y).abs() {
            vec![horizontal_first, vertical_first]
        } else {
            vec![vertical_first, horizontal_first]
        }
    }
}

impl TileGeometry for OctagonGeometry {
    type Bounds = IntOctagon;
    const ANGLE: AngleRestriction = AngleRestriction::FortyFive;

    fn tree_shape(&self, shape: &TileShape) -> TileShape {
        TileShape::Octagon(shape.bounding_octagon()).simplify()
    }

    fn trees(store: &mut TreeStore) -> &mut BTreeMap<usize, SearchTree<IntOctagon>> {
        &mut store.octagons
    }

    fn segment_allowed(&self, a: IntPoint, b: IntPoint) -> bool {
        let (dx, dy) = ((b.x - a.x).abs(), (b.y - a.y).abs());
        dx == 0 || dy == 0 || dx == dy
    }

    fn corner_candidates(&self, a: IntPoint, b: IntPoint) -> Vec<IntPoint> {
        if self.segment_allowed(a, b) {
            return Vec::new();
        }
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let (sx, sy) = (dx.signum(), dy.signum());
        if dx.abs() > dy.abs() {
            let d = dy.abs();
            let straight_first = IntPoint::new(b.x - sx * d, a.y);
            let diagonal_first = IntPoint::new(a.x + sx * d, b.y);
            vec![straight_first, diagonal_first]
        } else {
            let d = dx.abs();
            let straight_first = IntPoint::new(a.x, b.y - sy * d);
            let diagonal_first = IntPoint::new(b.x, a.y + sy * d);
            vec![straight_first, diagonal_first]
        }
    }
}

impl TileGeometry for SimplexGeometry {
    type Bounds = IntOctagon;
    const ANGLE: AngleRestriction = AngleRestriction::None;

    fn tree_shape(&self, shape: &TileShape) -> TileShape {
        shape.clone()
    }

    fn trees(store: &mut TreeStore) -> &mut BTreeMap<usize, SearchTree<IntOctagon>> {
        &mut store.simplexes
    }

    fn segment_allowed(&self, _a: IntPoint, _b: IntPoint) -> bool {
        true
    }

    fn corner_candidates(&self, _a: IntPoint, _b: IntPoint) -> Vec<IntPoint> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_corners_follow_the_longer_axis() {
        let g = BoxGeometry;
        let a = IntPoint::new(0, 0);
        assert!(g.corner_candidates(a, IntPoint::new(10, 0)).is_empty());
        let c = g.corner_candidates(a, IntPoint::new(10, 4));
        assert_eq!(c, vec![IntPoint::new(10, 0), IntPoint::new(0, 4)]);
        let c = g.corner_candidates(a, IntPoint::new(3, -8));
        assert_eq!(c[0], IntPoint::new(0, -8));
    }

    #[test]
    fn octagon_corners_give_legal_legs() {
        let g = OctagonGeometry;
        let (a, b) = (IntPoint::new(0, 0), IntPoint::new(-10, 4));
        let candidates = g.corner_candidates(a, b);
        assert_eq!(candidates.len(), 2);
        for c in candidates {
            assert!(g.segment_allowed(a, c) && g.segment_allowed(c, b), "{:?}", c);
        }
        assert!(g.corner_candidates(a, IntPoint::new(5, -5)).is_empty());
    }

    /// Compiles only because every geometry is `Send + Sync`.
    fn corners_in_parallel<G: TileGeometry>(g: &G, a: IntPoint, b: IntPoint) -> (usize, usize) {
        rayon::join(
            || g.corner_candidates(a, b).len(),
            || g.corner_candidates(b, a).len(),
        )
    }

    #[test]
    fn geometries_can_be_shared_with_worker_threads() {
        let (a, b) = (IntPoint::new(0, 0), IntPoint::new(10, 4));
        assert_eq!(corners_in_parallel(&BoxGeometry, a, b), (2, 2));
        assert_eq!(corners_in_parallel(&OctagonGeometry, a, b), (2, 2));
        assert_eq!(corners_in_parallel(&SimplexGeometry, a, b).0, 0);
    }
}
