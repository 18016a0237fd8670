use super::int_box::IntBox;
use rstar::{AABB, RTree, RTreeObject};

/// Coarse bounding-box index over board items.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedBox>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct IndexedBox {
    bounds: IntBox,
    id: u32,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_aabb(&self.bounds)
    }
}

fn to_aabb(b: &IntBox) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [b.ll.x as f64, b.ll.y as f64],
        [b.ur.x as f64, b.ur.y as f64],
    )
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, bounds: IntBox, id: u32) {
        self.tree.insert(IndexedBox { bounds, id });
    }

    pub fn remove(&mut self, bounds: IntBox, id: u32) -> bool {
        self.tree.remove(&IndexedBox { bounds, id }).is_some()
    }

    /// Ids of all entries whose box meets `bounds`, touching included.
    pub fn query(&self, bounds: IntBox) -> Vec<u32> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let mut ids: Vec<u32> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(&bounds))
            .map(|item| item.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_query_remove() {
        let mut index = SpatialIndex::new();
        index.insert(IntBox::from_coords(0, 0, 10, 10), 1);
        index.insert(IntBox::from_coords(20, 20, 30, 30), 2);
        assert_eq!(index.query(IntBox::from_coords(10, 10, 15, 15)), vec![1]);
        assert!(index.remove(IntBox::from_coords(0, 0, 10, 10), 1));
        assert!(index.query(IntBox::from_coords(0, 0, 15, 15)).is_empty());
        assert_eq!(index.len(), 1);
    }
}
