//! Maze search over the room graph.
//!
//! Nodes are target doors, door sections and drills on a layer. Rooms are
//! completed and their doors calculated only when the search first enters
//! them.

use std::collections::{BTreeSet, HashMap, HashSet};

use pcb_common::db::ItemId;
use pcb_common::geom::FloatPoint;

use super::cost::DestinationDistance;
use super::frontier::Frontier;
use crate::context::AutorouteContext;
use crate::control::StopFlag;
use crate::geometry::TileGeometry;
use crate::rooms::{DoorId, DrillId, RoomId, RoomKind, TargetId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Target(TargetId),
    Door { door: DoorId, section: usize },
    Drill { drill: DrillId, layer: usize },
}

#[derive(Clone, Debug)]
struct Node {
    cost: f64,
    position: FloatPoint,
    layer: usize,
    /// Room entered at this node. Drills find theirs when expanded.
    room: Option<RoomId>,
    from_room: Option<RoomId>,
    previous: Option<NodeKey>,
    ripped: Option<ItemId>,
}

/// One step of a found connection, from the start item to the destination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MazeElement {
    Start { target: TargetId, room: RoomId },
    Door { door: DoorId, section: usize, room: RoomId },
    Drill { drill: DrillId, from_layer: usize, to_layer: usize, room: RoomId },
    Destination { target: TargetId },
}

impl MazeElement {
    /// Room the path is in after this step.
    pub fn room(&self) -> Option<RoomId> {
        match *self {
            MazeElement::Start { room, .. }
            | MazeElement::Door { room, .. }
            | MazeElement::Drill { room, .. } => Some(room),
            MazeElement::Destination { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MazeResult {
    pub elements: Vec<MazeElement>,
    pub ripped_items: BTreeSet<ItemId>,
    pub cost: f64,
}

#[derive(Clone, Debug)]
pub enum MazeOutcome {
    Found(MazeResult),
    NotFound,
    /// Start or destination offered nothing to search from or to.
    NotInitialized,
    Stopped,
}

pub struct MazeSearch<'c, 'a, G: TileGeometry> {
    ctx: &'c mut AutorouteContext<'a, G>,
    stop: &'c StopFlag,
    frontier: Frontier<NodeKey>,
    nodes: HashMap<NodeKey, Node>,
    settled: HashSet<NodeKey>,
    destination: DestinationDistance,
    expanded: usize,
}

impl<'c, 'a, G: TileGeometry> MazeSearch<'c, 'a, G> {
    pub fn new(ctx: &'c mut AutorouteContext<'a, G>, stop: &'c StopFlag) -> Self {
        let control = ctx.control;
        let destination = DestinationDistance::new(
            control.layer_count(),
            control.min_trace_cost,
            if control.vias_allowed { control.effective_via_cost() } else { 0.0 },
        );
        Self {
            ctx,
            stop,
            frontier: Frontier::new(),
            nodes: HashMap::new(),
            settled: HashSet::new(),
            destination,
            expanded: 0,
        }
    }

    /// Seeds the frontier with the start items. Returns false if nothing
    /// could be seeded or the destination has no connection shape.
    fn initialize(&mut self) -> bool {
        let board = self.ctx.board;
        for &id in &self.ctx.dest_items {
            let Some(item) = board.item(id) else {
                continue;
            };
            for index in 0..item.shape_count() {
                if let Some(shape) = item.trace_connection_shape(index) {
                    self.destination.add(&shape, item.shape_layer(index));
                }
            }
        }
        if self.destination.is_empty() {
            log::debug!("destination items offer no connection shape");
            return false;
        }
        let start: Vec<ItemId> = self.ctx.start_items.iter().copied().collect();
        for id in start {
            let Some(item) = board.item(id) else {
                continue;
            };
            for index in 0..item.shape_count() {
                let layer = item.shape_layer(index);
                if !self.ctx.control.layer_active.get(layer).copied().unwrap_or(false) {
                    continue;
                }
                let Some(connection) = item.trace_connection_shape(index) else {
                    continue;
                };
                let Some(room) = self.ctx.room_containing(&connection, layer) else {
                    log::debug!("no room around {:?} shape {} on layer {}", id, index, layer);
                    continue;
                };
                let target = self.ctx.graph.room(room).targets().iter().copied().find(|&t| {
                    let t = self.ctx.graph.target(t);
                    t.item == id && t.shape_index == index
                });
                let Some(target) = target else {
                    continue;
                };
                let position = self.ctx.graph.target(target).shape.centre();
                self.relax(
                    NodeKey::Target(target),
                    Node {
                        cost: 0.0,
                        position,
                        layer,
                        room: Some(room),
                        from_room: None,
                        previous: None,
                        ripped: None,
                    },
                );
            }
        }
        !self.frontier.is_empty()
    }

    fn relax(&mut self, key: NodeKey, node: Node) {
        if self.settled.contains(&key) {
            return;
        }
        if self.nodes.get(&key).is_some_and(|n| n.cost <= node.cost) {
            return;
        }
        let sorting_value = node.cost + self.destination.calculate(node.position, node.layer);
        self.frontier.push(key, sorting_value);
        self.nodes.insert(key, node);
    }

    pub fn run(mut self) -> MazeOutcome {
        if self.ctx.start_items.is_empty() || self.ctx.dest_items.is_empty() || !self.initialize() {
            return MazeOutcome::NotInitialized;
        }
        while let Some((key, _)) = self.frontier.pop() {
            if self.stop.is_stop_requested() {
                log::debug!("maze search stopped after {} expansions", self.expanded);
                return MazeOutcome::Stopped;
            }
            if !self.settled.insert(key) {
                continue;
            }
            let Some(node) = self.nodes.get(&key).cloned() else {
                continue;
            };
            match key {
                NodeKey::Target(t)
                    if self.ctx.dest_items.contains(&self.ctx.graph.target(t).item) =>
                {
                    log::debug!(
                        "destination reached after {} expansions, cost {:.1}",
                        self.expanded,
                        node.cost
                    );
                    return MazeOutcome::Found(self.backtrack(key));
                }
                NodeKey::Drill { .. } if self.ctx.control.fanout => {
                    return MazeOutcome::Found(self.backtrack(key));
                }
                _ => {}
            }
            if self.ctx.graph.room_count() > self.ctx.control.max_rooms {
                log::warn!(
                    "maze search gave up after creating {} rooms",
                    self.ctx.graph.room_count()
                );
                return MazeOutcome::NotFound;
            }
            let room = match (node.room, key) {
                (Some(room), _) => Some(room),
                (None, NodeKey::Drill { drill, layer }) => self.ctx.drill_room(drill, layer),
                _ => None,
            };
            let Some(room) = room else {
                continue;
            };
            if let Some(n) = self.nodes.get_mut(&key) {
                n.room = Some(room);
            }
            self.expanded += 1;
            self.expand(key, &node, room);
        }
        log::debug!("frontier exhausted after {} expansions", self.expanded);
        MazeOutcome::NotFound
    }

    /// Makes sure the doors of `room` exist. Returns false if it cannot be entered.
    fn prepare_room(&mut self, room: RoomId) -> bool {
        match self.ctx.graph.room(room).kind {
            RoomKind::Incomplete { .. } => self.ctx.complete_room(room),
            RoomKind::Complete { .. } => {
                self.ctx.calculate_doors(room);
                true
            }
            RoomKind::Obstacle { .. } => {
                self.ctx.calculate_obstacle_doors(room);
                true
            }
            RoomKind::Discarded => false,
        }
    }

    fn expand(&mut self, key: NodeKey, node: &Node, room: RoomId) {
        if !self.prepare_room(room) {
            return;
        }
        let control = self.ctx.control;
        let (p, layer) = (node.position, node.layer);
        let trace_cost = control.trace_costs[layer];
        let current_item = self.ctx.graph.room(room).obstacle_item();

        let targets: Vec<TargetId> = self.ctx.graph.room(room).targets().to_vec();
        for t in targets {
            let target = self.ctx.graph.target(t);
            if !self.ctx.dest_items.contains(&target.item) {
                continue;
            }
            let q = target.nearest_point(p);
            self.relax(
                NodeKey::Target(t),
                Node {
                    cost: node.cost + trace_cost.cost(p, q),
                    position: q,
                    layer,
                    room: Some(room),
                    from_room: Some(room),
                    previous: Some(key),
                    ripped: None,
                },
            );
        }

        let doors = self.ctx.graph.room(room).doors.clone();
        for d in doors {
            if matches!(key, NodeKey::Door { door, .. } if door == d) {
                continue;
            }
            let door = self.ctx.graph.door(d);
            let Some(other) = door.other(room) else {
                continue;
            };
            let next = self.ctx.graph.room(other);
            if matches!(next.kind, RoomKind::Discarded) {
                continue;
            }
            let ripped = next.obstacle_item();
            if ripped.is_some() && !control.ripup_allowed {
                continue;
            }
            let ripup =
                if ripped.is_some() && ripped != current_item { control.ripup_cost } else { 0.0 };
            let sections: Vec<FloatPoint> =
                door.sections.iter().map(|s| s.nearest_point(p)).collect();
            for (section, q) in sections.into_iter().enumerate() {
                self.relax(
                    NodeKey::Door { door: d, section },
                    Node {
                        cost: node.cost + trace_cost.cost(p, q) + ripup,
                        position: q,
                        layer,
                        room: Some(other),
                        from_room: Some(room),
                        previous: Some(key),
                        ripped,
                    },
                );
            }
        }

        if !control.vias_allowed || !self.ctx.graph.room(room).is_complete() {
            return;
        }
        let shape = self.ctx.graph.room(room).shape.clone();
        for drill in self.ctx.drills_in(&shape) {
            let d = self.ctx.drills.drill(drill);
            let (location, first, last) = (d.location.to_float(), d.first_layer, d.last_layer);
            let base = node.cost + trace_cost.cost(p, location) + control.effective_via_cost();
            for to_layer in first..=last {
                if to_layer == layer
                    || !control.layer_active.get(to_layer).copied().unwrap_or(false)
                    || control.vias_between(self.ctx.board, layer, to_layer).next().is_none()
                {
                    continue;
                }
                self.relax(
                    NodeKey::Drill { drill, layer: to_layer },
                    Node {
                        cost: base,
                        position: location,
                        layer: to_layer,
                        room: None,
                        from_room: Some(room),
                        previous: Some(key),
                        ripped: None,
                    },
                );
            }
        }
    }

    fn backtrack(&self, end: NodeKey) -> MazeResult {
        let mut chain: Vec<(NodeKey, &Node)> = Vec::new();
        let mut current = Some(end);
        while let Some(key) = current {
            let Some(node) = self.nodes.get(&key) else {
                log::warn!("backtrack chain broken at {:?}", key);
                break;
            };
            chain.push((key, node));
            current = node.previous;
        }
        chain.reverse();
        let mut elements = Vec::with_capacity(chain.len());
        let mut ripped_items = BTreeSet::new();
        let mut previous_layer = None;
        let last = chain.len().saturating_sub(1);
        for (i, (key, node)) in chain.iter().enumerate() {
            ripped_items.extend(node.ripped);
            let room = node.room.or(node.from_room);
            let element = match (*key, room) {
                (NodeKey::Target(target), Some(room)) if i == 0 => {
                    MazeElement::Start { target, room }
                }
                (NodeKey::Target(target), _) if i == last => MazeElement::Destination { target },
                (NodeKey::Door { door, section }, Some(room)) => {
                    MazeElement::Door { door, section, room }
                }
                (NodeKey::Drill { drill, layer }, Some(room)) => MazeElement::Drill {
                    drill,
                    from_layer: previous_layer.unwrap_or(layer),
                    to_layer: layer,
                    room,
                },
                (key, _) => {
                    log::warn!("unexpected {:?} at position {} of the backtrack chain", key, i);
                    continue;
                }
            };
            previous_layer = Some(node.layer);
            elements.push(element);
        }
        MazeResult {
            elements,
            ripped_items,
            cost: self.nodes.get(&end).map(|n| n.cost).unwrap_or(0.0),
        }
    }
}
