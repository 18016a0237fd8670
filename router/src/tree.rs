//! Search trees kept per clearance class, synchronised with the board.

use std::collections::BTreeMap;

use pcb_common::db::board::{Board, BoardChange};
use pcb_common::db::item::{Item, ItemKind};
use pcb_common::db::ItemId;
use pcb_common::geom::shape_tree::{BoundingShape, ShapeTree, TreeEntry, TreeError};
use pcb_common::geom::{IntBox, IntOctagon, TileShape};
use rayon::prelude::*;

use crate::geometry::TileGeometry;
use crate::rooms::RoomId;

/// Extra enlargement of item shapes, absorbing the rounding of border lines
/// and of located corners to board units.
pub const ROUNDING_SLACK: i64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TreeOwner {
    Item(ItemId),
    Room(RoomId),
}

/// Item shapes enlarged for one clearance class, plus the complete rooms of
/// the running attempt.
pub struct SearchTree<B> {
    pub clearance_class: usize,
    tree: ShapeTree<TreeOwner, B>,
    revision: usize,
}

/// Shapes of `item` as stored for `clearance_class`: enlarged by the
/// clearance minus the class compensation, in the family of `geometry`.
pub fn item_tree_shapes<G: TileGeometry>(
    board: &Board,
    item: &Item,
    clearance_class: usize,
    geometry: &G,
) -> Vec<Option<(TileShape, usize)>> {
    let clearance = &board.rules.clearance;
    let enlargement = |layer: usize| {
        let value = clearance.value(clearance_class, item.clearance_class, layer);
        (value - clearance.compensation(clearance_class, layer) + ROUNDING_SLACK).max(0)
    };
    match &item.kind {
        ItemKind::Trace(t) => t
            .corners
            .windows(2)
            .map(|w| {
                let offset = t.half_width + enlargement(t.layer);
                let shape = TileShape::segment(w[0], w[1]).offset(offset as f64);
                (!shape.is_empty()).then(|| (geometry.tree_shape(&shape), t.layer))
            })
            .collect(),
        _ => item
            .shapes()
            .into_iter()
            .map(|(shape, layer)| {
                let shape = shape.offset(enlargement(layer) as f64);
                (!shape.is_empty()).then(|| (geometry.tree_shape(&shape), layer))
            })
            .collect(),
    }
}

impl<B: BoundingShape> SearchTree<B> {
    pub fn build<G: TileGeometry<Bounds = B>>(
        board: &Board,
        clearance_class: usize,
        geometry: &G,
    ) -> Self {
        let items: Vec<&Item> = board.items().collect();
        let shapes: Vec<(ItemId, Vec<Option<(TileShape, usize)>>)> = items
            .par_iter()
            .map(|item| (item.id, item_tree_shapes(board, item, clearance_class, geometry)))
            .collect();
        let mut tree = ShapeTree::new();
        for (id, item_shapes) in shapes {
            tree.insert_object(TreeOwner::Item(id), item_shapes);
        }
        log::debug!(
            "built search tree for class {} with {} entries",
            clearance_class,
            tree.len()
        );
        Self {
            clearance_class,
            tree,
            revision: board.revision(),
        }
    }

    /// Applies the board changes made since the last call.
    pub fn sync<G: TileGeometry<Bounds = B>>(&mut self, board: &Board, geometry: &G) {
        let changes = board.changes_since(self.revision);
        if changes.is_empty() {
            return;
        }
        log::trace!("syncing {} board changes into class {}", changes.len(), self.clearance_class);
        for change in changes {
            match *change {
                BoardChange::Inserted(id) => {
                    let owner = TreeOwner::Item(id);
                    if let Some(item) = board.item(id) {
                        if !self.tree.contains_owner(&owner) {
                            let shapes =
                                item_tree_shapes(board, item, self.clearance_class, geometry);
                            self.tree.insert_object(owner, shapes);
                        }
                    }
                }
                BoardChange::Removed(id) => {
                    self.tree.remove_object(&TreeOwner::Item(id));
                }
            }
        }
        self.revision = board.revision();
    }

    pub fn insert_room(&mut self, room: RoomId, shape: TileShape, layer: usize) {
        self.tree.insert_object(TreeOwner::Room(room), [Some((shape, layer))]);
    }

    pub fn remove_room(&mut self, room: RoomId) -> bool {
        self.tree.remove_object(&TreeOwner::Room(room)) > 0
    }

    /// Entries on `layer` whose bounding shape meets the one of `shape`,
    /// ordered by owner.
    pub fn overlapping(&self, shape: &TileShape, layer: usize) -> Vec<TreeEntry<TreeOwner>> {
        let mut entries: Vec<TreeEntry<TreeOwner>> = self
            .tree
            .overlapping(&B::from_shape(shape), Some(layer))
            .into_iter()
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.key);
        entries
    }

    pub fn item_shape(&self, item: ItemId, shape_index: usize) -> Option<TileShape> {
        self.tree
            .entries_of(&TreeOwner::Item(item))
            .into_iter()
            .find(|e| e.key.shape_index == shape_index)
            .map(|e| e.shape.clone())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn room_count(&self) -> usize {
        self.tree
            .entries()
            .filter(|e| matches!(e.key.owner, TreeOwner::Room(_)))
            .count()
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        self.tree.validate()
    }
}

/// One search tree per clearance class and shape family.
#[derive(Default)]
pub struct TreeStore {
    pub(crate) boxes: BTreeMap<usize, SearchTree<IntBox>>,
    pub(crate) octagons: BTreeMap<usize, SearchTree<IntOctagon>>,
    pub(crate) simplexes: BTreeMap<usize, SearchTree<IntOctagon>>,
}

impl TreeStore {
    /// The synchronised tree for `clearance_class`, built on first use.
    pub fn get<'a, G: TileGeometry>(
        &'a mut self,
        board: &Board,
        clearance_class: usize,
        geometry: &G,
    ) -> &'a mut SearchTree<G::Bounds> {
        let tree = G::trees(self)
            .entry(clearance_class)
            .or_insert_with(|| SearchTree::build(board, clearance_class, geometry));
        tree.sync(board, geometry);
        tree
    }

    /// Room entries left in any tree. Zero between attempts.
    pub fn room_count(&self) -> usize {
        self.boxes.values().map(SearchTree::room_count).sum::<usize>()
            + self.octagons.values().map(SearchTree::room_count).sum::<usize>()
            + self.simplexes.values().map(SearchTree::room_count).sum::<usize>()
    }

    pub fn validate(&self) -> Result<(), TreeError> {
        self.boxes.values().try_for_each(SearchTree::validate)?;
        self.octagons.values().try_for_each(SearchTree::validate)?;
        self.simplexes.values().try_for_each(SearchTree::validate)
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
        self.octagons.clear();
        self.simplexes.clear();
    }
}
