//! Area-minimizing binary tree over convex tile shapes.
//!
//! Leaves carry one shape of an object together with its layer; every inner
//! node stores the union of the bounding shapes below it. New leaves go to
//! the side whose bounding shape grows the least.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use log::trace;
use thiserror::Error;

use super::int_box::IntBox;
use super::octagon::IntOctagon;
use super::tile::{Dimension, TileShape};

/// Bounding shape family stored in the inner nodes.
pub trait BoundingShape: Clone + PartialEq + fmt::Debug {
    fn empty() -> Self;
    fn from_shape(shape: &TileShape) -> Self;
    fn union(&self, other: &Self) -> Self;
    fn intersects(&self, other: &Self) -> bool;
    fn contains(&self, other: &Self) -> bool;
    fn area(&self) -> f64;
}

impl BoundingShape for IntBox {
    fn empty() -> Self {
        IntBox::EMPTY
    }
    fn from_shape(shape: &TileShape) -> Self {
        shape.bounding_box()
    }
    fn union(&self, other: &Self) -> Self {
        IntBox::union(self, other)
    }
    fn intersects(&self, other: &Self) -> bool {
        IntBox::intersects(self, other)
    }
    fn contains(&self, other: &Self) -> bool {
        self.contains_box(other)
    }
    fn area(&self) -> f64 {
        IntBox::area(self)
    }
}

impl BoundingShape for IntOctagon {
    fn empty() -> Self {
        IntOctagon::EMPTY
    }
    fn from_shape(shape: &TileShape) -> Self {
        shape.bounding_octagon()
    }
    fn union(&self, other: &Self) -> Self {
        IntOctagon::union(self, other)
    }
    fn intersects(&self, other: &Self) -> bool {
        IntOctagon::intersects(self, other)
    }
    fn contains(&self, other: &Self) -> bool {
        self.contains_octagon(other)
    }
    fn area(&self) -> f64 {
        IntOctagon::area(self)
    }
}

/// Identifies one leaf: the owning object and the index of its shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey<O> {
    pub owner: O,
    pub shape_index: usize,
}

#[derive(Clone, Debug)]
pub struct TreeEntry<O> {
    pub key: EntryKey<O>,
    pub shape: TileShape,
    pub layer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} has a wrong parent link")]
    BrokenParentLink(usize),
    #[error("node {0} does not contain the bounding shape of its child")]
    BoundingViolation(usize),
    #[error("leaf index out of sync for node {0}")]
    StaleLeafIndex(usize),
}

#[derive(Clone, Debug)]
enum NodeKind<O> {
    Leaf(TreeEntry<O>),
    Fork([usize; 2]),
    Free,
}

#[derive(Clone, Debug)]
struct Node<O, B> {
    bounding: B,
    parent: Option<usize>,
    kind: NodeKind<O>,
}

pub struct ShapeTree<O, B> {
    nodes: Vec<Node<O, B>>,
    free: Vec<usize>,
    root: Option<usize>,
    leaves: HashMap<O, Vec<(usize, usize)>>,
    leaf_count: usize,
}

impl<O, B> Default for ShapeTree<O, B>
where
    O: Copy + Eq + Hash + fmt::Debug,
    B: BoundingShape,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<O, B> ShapeTree<O, B>
where
    O: Copy + Eq + Hash + fmt::Debug,
    B: BoundingShape,
{
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leaves: HashMap::new(),
            leaf_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    pub fn contains_owner(&self, owner: &O) -> bool {
        self.leaves.contains_key(owner)
    }

    /// Inserts all shapes of `owner`. `None` and empty shapes are skipped but
    /// still consume their shape index.
    pub fn insert_object<I>(&mut self, owner: O, shapes: I)
    where
        I: IntoIterator<Item = Option<(TileShape, usize)>>,
    {
        for (shape_index, shape) in shapes.into_iter().enumerate() {
            let Some((shape, layer)) = shape else {
                continue;
            };
            if shape.dimension() == Dimension::Empty {
                trace!("skipping empty shape {} of {:?}", shape_index, owner);
                continue;
            }
            let key = EntryKey { owner, shape_index };
            self.insert_leaf(TreeEntry { key, shape, layer });
        }
    }

    fn alloc(&mut self, node: Node<O, B>) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) {
        self.nodes[id] = Node {
            bounding: B::empty(),
            parent: None,
            kind: NodeKind::Free,
        };
        self.free.push(id);
    }

    fn node(&self, id: usize) -> &Node<O, B> {
        &self.nodes[id]
    }

    fn node_mut(&mut self, id: usize) -> &mut Node<O, B> {
        &mut self.nodes[id]
    }

    fn insert_leaf(&mut self, entry: TreeEntry<O>) {
        let bounding = B::from_shape(&entry.shape);
        let key = entry.key;
        let leaf = self.alloc(Node {
            bounding: bounding.clone(),
            parent: None,
            kind: NodeKind::Leaf(entry),
        });
        self.leaves
            .entry(key.owner)
            .or_default()
            .push((key.shape_index, leaf));
        self.leaf_count += 1;

        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };

        // Descend to the leaf whose subtree grows the least, widening the
        // forks on the way down.
        let mut current = root;
        loop {
            let NodeKind::Fork(children) = self.node(current).kind else {
                break;
            };
            let grown = self.node(current).bounding.union(&bounding);
            self.node_mut(current).bounding = grown;
            let growth = |tree: &Self, child: usize| {
                let b = &tree.node(child).bounding;
                b.union(&bounding).area() - b.area()
            };
            let (g0, g1) = (growth(self, children[0]), growth(self, children[1]));
            current = if g0 <= g1 { children[0] } else { children[1] };
        }

        // Replace the found leaf by a fork holding it and the new leaf.
        let parent = self.node(current).parent;
        let fork_bounding = self.node(current).bounding.union(&bounding);
        let fork = self.alloc(Node {
            bounding: fork_bounding,
            parent,
            kind: NodeKind::Fork([current, leaf]),
        });
        self.node_mut(current).parent = Some(fork);
        self.node_mut(leaf).parent = Some(fork);
        match parent {
            None => self.root = Some(fork),
            Some(p) => self.replace_child(p, current, fork),
        }
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if let NodeKind::Fork(children) = &mut self.node_mut(parent).kind {
            for c in children.iter_mut() {
                if *c == old {
                    *c = new;
                }
            }
        }
    }

    /// Removes all entries of `owner`. Returns the number of removed leaves.
    pub fn remove_object(&mut self, owner: &O) -> usize {
        let Some(leaves) = self.leaves.remove(owner) else {
            return 0;
        };
        for &(_, leaf) in &leaves {
            self.remove_leaf(leaf);
        }
        leaves.len()
    }

    pub fn remove_entries(&mut self, keys: &[EntryKey<O>]) {
        for key in keys {
            let Some(list) = self.leaves.get_mut(&key.owner) else {
                continue;
            };
            let Some(pos) = list.iter().position(|(i, _)| *i == key.shape_index) else {
                continue;
            };
            let (_, leaf) = list.swap_remove(pos);
            if list.is_empty() {
                self.leaves.remove(&key.owner);
            }
            self.remove_leaf(leaf);
        }
    }

    fn remove_leaf(&mut self, leaf: usize) {
        self.leaf_count -= 1;
        let parent = self.node(leaf).parent;
        self.release(leaf);
        let Some(parent) = parent else {
            self.root = None;
            return;
        };
        let NodeKind::Fork([a, b]) = self.node(parent).kind else {
            return;
        };
        let sibling = if a == leaf { b } else { a };
        let grand = self.node(parent).parent;
        self.release(parent);
        self.node_mut(sibling).parent = grand;
        let Some(grand) = grand else {
            self.root = Some(sibling);
            return;
        };
        self.replace_child(grand, parent, sibling);

        // Shrink the unions upwards until one still covers its old value.
        let mut current = Some(grand);
        while let Some(id) = current {
            let NodeKind::Fork([a, b]) = self.node(id).kind else {
                break;
            };
            let recalculated = self.node(a).bounding.union(&self.node(b).bounding);
            let node = self.node_mut(id);
            if recalculated.contains(&node.bounding) {
                break;
            }
            node.bounding = recalculated;
            current = node.parent;
        }
    }

    /// Entries whose bounding shape meets `query`, optionally on one layer.
    pub fn overlapping(&self, query: &B, layer: Option<usize>) -> Vec<&TreeEntry<O>> {
        let mut result = Vec::new();
        let Some(root) = self.root else {
            return result;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if !node.bounding.intersects(query) {
                continue;
            }
            match &node.kind {
                NodeKind::Fork([a, b]) => {
                    stack.push(*b);
                    stack.push(*a);
                }
                NodeKind::Leaf(entry) => {
                    if layer.is_none_or(|l| l == entry.layer) {
                        result.push(entry);
                    }
                }
                NodeKind::Free => {}
            }
        }
        result
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry<O>> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Leaf(entry) => Some(entry),
            _ => None,
        })
    }

    pub fn entries_of(&self, owner: &O) -> Vec<&TreeEntry<O>> {
        let Some(list) = self.leaves.get(owner) else {
            return Vec::new();
        };
        list.iter()
            .filter_map(|&(_, leaf)| match &self.node(leaf).kind {
                NodeKind::Leaf(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }

    /// Checks parent links, the leaf index and that every fork covers its children.
    pub fn validate(&self) -> Result<(), TreeError> {
        let Some(root) = self.root else {
            return Ok(());
        };
        if self.node(root).parent.is_some() {
            return Err(TreeError::BrokenParentLink(root));
        }
        let mut leaf_count = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            match &node.kind {
                NodeKind::Fork(children) => {
                    for &c in children {
                        let child = self.node(c);
                        if matches!(child.kind, NodeKind::Free) || child.parent != Some(id) {
                            return Err(TreeError::BrokenParentLink(c));
                        }
                        if !node.bounding.contains(&child.bounding) {
                            return Err(TreeError::BoundingViolation(id));
                        }
                        stack.push(c);
                    }
                }
                NodeKind::Leaf(entry) => {
                    leaf_count += 1;
                    let indexed = self
                        .leaves
                        .get(&entry.key.owner)
                        .is_some_and(|l| l.contains(&(entry.key.shape_index, id)));
                    if !indexed {
                        return Err(TreeError::StaleLeafIndex(id));
                    }
                }
                NodeKind::Free => return Err(TreeError::BrokenParentLink(id)),
            }
        }
        if leaf_count != self.leaf_count {
            return Err(TreeError::StaleLeafIndex(root));
        }
        Ok(())
    }
}
