use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::indices::{ItemId, NetId};
use super::item::{point_on_segment, Area, Item, ItemKind, Pin, Trace, Via};
use super::rules::{Rules, ViaInfo};
use crate::geom::rtree::SpatialIndex;
use crate::geom::{FloatLine, IntBox, IntPoint, TileShape};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerDirection {
    Vertical,
    Horizontal,
    #[default]
    Unknown,
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub is_signal: bool,
    pub direction: LayerDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardChange {
    Inserted(ItemId),
    Removed(ItemId),
}

/// Receives item insertions and removals while notification is switched on.
pub trait BoardObserver {
    fn item_inserted(&mut self, item: &Item);
    fn item_removed(&mut self, item: &Item);
}

/// Limits handed to trace insertion. The board inserts without shoving, so
/// only the pull-tight accuracy affects the result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShoveLimits {
    pub trace_depth: u32,
    pub via_depth: u32,
    pub spring_over_depth: u32,
    pub pull_tight_accuracy: i64,
}

impl Default for ShoveLimits {
    fn default() -> Self {
        Self {
            trace_depth: 20,
            via_depth: 8,
            spring_over_depth: 5,
            pull_tight_accuracy: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("unknown item {0:?}")]
    UnknownItem(ItemId),
    #[error("layer {0} does not exist")]
    InvalidLayer(usize),
    #[error("a trace needs at least one corner")]
    EmptyTrace,
    #[error("the via rule has no entry {0}")]
    UnknownViaRule(usize),
    #[error("via at {0:?} violates clearance")]
    ViaClearance(IntPoint),
    #[error("unknown net {0:?}")]
    UnknownNet(String),
    #[error("unknown clearance class {0:?}")]
    UnknownClearanceClass(String),
}

/// Routing board: items, design rules and a coarse spatial index.
///
/// Every insertion and removal is appended to a change log, so that derived
/// indices can catch up with [`Board::changes_since`].
pub struct Board {
    layers: Vec<Layer>,
    bounding_box: IntBox,
    pub rules: Rules,
    items: BTreeMap<ItemId, Item>,
    next_id: u32,
    index: SpatialIndex,
    changes: Vec<BoardChange>,
    observers: Vec<Box<dyn BoardObserver + Send + Sync>>,
    observers_active: bool,
}

impl Board {
    pub fn new(layers: Vec<Layer>, bounding_box: IntBox, rules: Rules) -> Self {
        Self {
            layers,
            bounding_box,
            rules,
            items: BTreeMap::new(),
            next_id: 1,
            index: SpatialIndex::new(),
            changes: Vec::new(),
            observers: Vec::new(),
            observers_active: false,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn bounding_box(&self) -> IntBox {
        self.bounding_box
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn items_of_net(&self, net: NetId) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|i| i.contains_net(net))
            .map(|i| i.id)
            .collect()
    }

    pub fn revision(&self) -> usize {
        self.changes.len()
    }

    pub fn changes_since(&self, revision: usize) -> &[BoardChange] {
        &self.changes[revision.min(self.changes.len())..]
    }

    pub fn add_observer(&mut self, observer: Box<dyn BoardObserver + Send + Sync>) {
        self.observers.push(observer);
    }

    pub fn start_notify_observers(&mut self) {
        self.observers_active = true;
    }

    pub fn end_notify_observers(&mut self) {
        self.observers_active = false;
    }

    pub fn add_item(
        &mut self,
        nets: Vec<NetId>,
        clearance_class: usize,
        fixed: bool,
        kind: ItemKind,
    ) -> Result<ItemId, BoardError> {
        let id = ItemId(self.next_id);
        let item = Item {
            id,
            nets,
            clearance_class,
            fixed,
            kind,
        };
        if item.last_layer() >= self.layers.len() || item.first_layer() > item.last_layer() {
            return Err(BoardError::InvalidLayer(item.last_layer()));
        }
        if let ItemKind::Trace(t) = &item.kind {
            if t.corners.is_empty() {
                return Err(BoardError::EmptyTrace);
            }
        }
        self.next_id += 1;
        self.index.insert(item.bounding_box(), id.0);
        if self.observers_active {
            for o in &mut self.observers {
                o.item_inserted(&item);
            }
        }
        trace!("inserted {:?}", id);
        self.items.insert(id, item);
        self.changes.push(BoardChange::Inserted(id));
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_pin(
        &mut self,
        name: impl Into<String>,
        centre: IntPoint,
        first_layer: usize,
        last_layer: usize,
        pad: TileShape,
        nets: Vec<NetId>,
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        let pin = Pin {
            name: name.into(),
            centre,
            first_layer,
            last_layer,
            pad,
        };
        self.add_item(nets, clearance_class, true, ItemKind::Pin(pin))
    }

    pub fn add_trace(
        &mut self,
        corners: Vec<IntPoint>,
        half_width: i64,
        layer: usize,
        nets: Vec<NetId>,
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        let trace = Trace {
            corners,
            half_width,
            layer,
        };
        self.add_item(nets, clearance_class, false, ItemKind::Trace(trace))
    }

    pub fn add_via(
        &mut self,
        centre: IntPoint,
        rule_index: usize,
        nets: Vec<NetId>,
        clearance_class: usize,
        fixed: bool,
    ) -> Result<ItemId, BoardError> {
        let info = self
            .rules
            .via_infos
            .get(rule_index)
            .ok_or(BoardError::UnknownViaRule(rule_index))?;
        let via = Via {
            centre,
            first_layer: info.first_layer,
            last_layer: info.last_layer,
            radius: info.radius,
            rule_index,
        };
        self.add_item(nets, clearance_class, fixed, ItemKind::Via(via))
    }

    pub fn add_obstacle_area(
        &mut self,
        name: impl Into<String>,
        shape: TileShape,
        layer: usize,
        nets: Vec<NetId>,
    ) -> Result<ItemId, BoardError> {
        let area = Area {
            name: name.into(),
            shape,
            layer,
        };
        self.add_item(nets, 0, true, ItemKind::ObstacleArea(area))
    }

    pub fn add_conduction_area(
        &mut self,
        name: impl Into<String>,
        shape: TileShape,
        layer: usize,
        nets: Vec<NetId>,
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        let area = Area {
            name: name.into(),
            shape,
            layer,
        };
        self.add_item(nets, clearance_class, true, ItemKind::ConductionArea(area))
    }

    pub fn set_fixed(&mut self, id: ItemId, fixed: bool) -> Result<(), BoardError> {
        let item = self.items.get_mut(&id).ok_or(BoardError::UnknownItem(id))?;
        item.fixed = fixed;
        Ok(())
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        if !self.index.remove(item.bounding_box(), id.0) {
            warn!("{:?} was missing from the spatial index", id);
        }
        if self.observers_active {
            for o in &mut self.observers {
                o.item_removed(&item);
            }
        }
        trace!("removed {:?}", id);
        self.changes.push(BoardChange::Removed(id));
        Some(item)
    }

    /// Removes the unfixed items among `ids`. Returns how many were removed.
    pub fn remove_items_unfixed(&mut self, ids: &BTreeSet<ItemId>) -> usize {
        let mut count = 0;
        for id in ids {
            if self.items.get(id).is_some_and(|i| !i.fixed) && self.remove_item(*id).is_some() {
                count += 1;
            }
        }
        count
    }

    /// Items whose bounding box meets `bounds`, optionally restricted to one layer.
    pub fn pick_items(&self, bounds: IntBox, layer: Option<usize>) -> Vec<ItemId> {
        self.index
            .query(bounds)
            .into_iter()
            .map(ItemId)
            .filter(|id| {
                self.items
                    .get(id)
                    .is_some_and(|i| layer.is_none_or(|l| i.is_on_layer(l)))
            })
            .collect()
    }

    fn obstacles_near<'a>(
        &'a self,
        bounds: IntBox,
        layer: usize,
        nets: &'a [NetId],
    ) -> impl Iterator<Item = &'a Item> + 'a {
        self.pick_items(bounds, Some(layer))
            .into_iter()
            .filter_map(move |id| self.items.get(&id))
            .filter(move |i| i.is_obstacle_for_nets(nets))
    }

    /// Length of the part of `a`..`b`, measured from `a`, that keeps clearance
    /// at the given half width. Infinite if the whole segment is clear.
    #[allow(clippy::too_many_arguments)]
    pub fn check_trace_segment(
        &self,
        a: IntPoint,
        b: IntPoint,
        layer: usize,
        nets: &[NetId],
        half_width: i64,
        clearance_class: usize,
    ) -> f64 {
        let margin = half_width + self.rules.clearance.max_value(clearance_class, layer);
        let bounds = IntBox::from_coords(a.x, a.y, b.x, b.y).offset(margin + 1);
        let obstacles: Vec<(&Item, f64)> = self
            .obstacles_near(bounds, layer, nets)
            .map(|item| {
                let clearance =
                    self.rules.clearance.value(clearance_class, item.clearance_class, layer);
                (item, (half_width + clearance) as f64)
            })
            .collect();
        let (af, bf) = (a.to_float(), b.to_float());
        let violates = |t: f64| {
            let end = af + (bf - af) * t;
            let piece = FloatLine::new(af, end);
            obstacles
                .iter()
                .any(|(item, need)| centre_line_distance(item, layer, &piece) < need - 1e-6)
        };
        if !violates(1.0) {
            return f64::INFINITY;
        }
        if violates(0.0) {
            return 0.0;
        }
        let (mut lo, mut hi) = (0.0, 1.0);
        for _ in 0..40 {
            let mid = 0.5 * (lo + hi);
            if violates(mid) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo * af.distance(bf)
    }

    /// Inserts the clear prefix of the polyline `corners` as a trace, without
    /// pushing anything aside. Returns the furthest corner reached; equal to
    /// the last corner when everything fit. With `check_only` nothing is
    /// inserted.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_trace(
        &mut self,
        corners: &[IntPoint],
        half_width: i64,
        layer: usize,
        nets: &[NetId],
        clearance_class: usize,
        limits: &ShoveLimits,
        check_only: bool,
    ) -> Result<IntPoint, BoardError> {
        let first = *corners.first().ok_or(BoardError::EmptyTrace)?;
        if layer >= self.layers.len() {
            return Err(BoardError::InvalidLayer(layer));
        }
        trace!(
            "insert trace with {} corners on layer {} (shove depth {}, accuracy {})",
            corners.len(),
            layer,
            limits.trace_depth,
            limits.pull_tight_accuracy
        );
        let mut reached = vec![first];
        for w in corners.windows(2) {
            let (a, b) = (w[0], w[1]);
            if a == b {
                continue;
            }
            let ok = self.check_trace_segment(a, b, layer, nets, half_width, clearance_class);
            if ok.is_infinite() {
                reached.push(b);
                continue;
            }
            let len = (ok - 1.0).max(0.0);
            let p = a.to_float().change_length(b.to_float(), len).round();
            if p != a
                && self
                    .check_trace_segment(a, p, layer, nets, half_width, clearance_class)
                    .is_infinite()
            {
                reached.push(p);
            }
            break;
        }
        let end = *reached.last().unwrap_or(&first);
        if !check_only && reached.len() >= 2 {
            self.add_trace(reached, half_width, layer, nets.to_vec(), clearance_class)?;
        }
        Ok(end)
    }

    pub fn check_via(
        &self,
        centre: IntPoint,
        info: &ViaInfo,
        nets: &[NetId],
        clearance_class: usize,
    ) -> bool {
        let shape = TileShape::Octagon(super::item::via_octagon(centre, info.radius));
        for layer in info.first_layer..=info.last_layer.min(self.layers.len().saturating_sub(1)) {
            let margin = info.radius + self.rules.clearance.max_value(clearance_class, layer) + 1;
            let bounds = IntBox::point(centre).offset(margin);
            for item in self.obstacles_near(bounds, layer, nets) {
                let need =
                    self.rules.clearance.value(clearance_class, item.clearance_class, layer) as f64;
                if copper_distance(item, layer, &shape) < need - 1e-6 {
                    trace!("via at {:?} blocked by {:?} on layer {}", centre, item.id, layer);
                    return false;
                }
            }
        }
        true
    }

    pub fn insert_via(
        &mut self,
        centre: IntPoint,
        rule_index: usize,
        nets: &[NetId],
        clearance_class: usize,
    ) -> Result<ItemId, BoardError> {
        let info = self
            .rules
            .via_infos
            .get(rule_index)
            .ok_or(BoardError::UnknownViaRule(rule_index))?;
        if !self.check_via(centre, info, nets, clearance_class) {
            return Err(BoardError::ViaClearance(centre));
        }
        self.add_via(centre, rule_index, nets.to_vec(), clearance_class, false)
    }

    /// Items of a shared net that touch `id` electrically.
    pub fn normal_contacts(&self, id: ItemId) -> Vec<ItemId> {
        let Some(item) = self.items.get(&id) else {
            return Vec::new();
        };
        if !item.is_connectable() {
            return Vec::new();
        }
        self.index
            .query(item.bounding_box().offset(1))
            .into_iter()
            .map(ItemId)
            .filter(|&o| o != id)
            .filter_map(|o| self.items.get(&o))
            .filter(|other| {
                other.is_connectable() && item.shares_net(other) && items_touch(item, other)
            })
            .map(|other| other.id)
            .collect()
    }

    /// All items reachable from `id` over contacts.
    pub fn connected_set(&self, id: ItemId) -> BTreeSet<ItemId> {
        self.collect_connected(id, |_| true)
    }

    /// `id` and the traces reachable from it without passing a via or pin.
    pub fn connection_items(&self, id: ItemId) -> BTreeSet<ItemId> {
        self.collect_connected(id, |item| matches!(item.kind, ItemKind::Trace(_)))
    }

    fn collect_connected(&self, id: ItemId, follow: impl Fn(&Item) -> bool) -> BTreeSet<ItemId> {
        let mut result = BTreeSet::new();
        if !self.items.contains_key(&id) {
            return result;
        }
        let mut queue = VecDeque::from([id]);
        result.insert(id);
        while let Some(current) = queue.pop_front() {
            for next in self.normal_contacts(current) {
                let Some(item) = self.items.get(&next) else {
                    continue;
                };
                if !follow(item) || result.contains(&next) {
                    continue;
                }
                result.insert(next);
                queue.push_back(next);
            }
        }
        result
    }

    fn endpoint_has_contact(&self, trace_item: &Item, p: IntPoint, layer: usize) -> bool {
        let bounds = IntBox::point(p).offset(1);
        self.pick_items(bounds, Some(layer)).into_iter().any(|o| {
            if o == trace_item.id {
                return false;
            }
            let Some(other) = self.items.get(&o) else {
                return false;
            };
            if !other.is_connectable() || !other.shares_net(trace_item) {
                return false;
            }
            ends_at(other, p, layer)
        })
    }

    /// Removes dangling traces and vias of `net` until none are left.
    pub fn remove_trace_tails(&mut self, net: NetId) -> usize {
        let mut removed = 0;
        loop {
            let mut tails = Vec::new();
            for item in self.items.values().filter(|i| i.contains_net(net) && !i.fixed) {
                match &item.kind {
                    ItemKind::Trace(t) => {
                        let (Some(&first), Some(&last)) = (t.corners.first(), t.corners.last())
                        else {
                            continue;
                        };
                        if !self.endpoint_has_contact(item, first, t.layer)
                            || !self.endpoint_has_contact(item, last, t.layer)
                        {
                            tails.push(item.id);
                        }
                    }
                    ItemKind::Via(_) => {
                        if self.normal_contacts(item.id).len() < 2 {
                            tails.push(item.id);
                        }
                    }
                    _ => {}
                }
            }
            if tails.is_empty() {
                break;
            }
            for id in tails {
                if self.remove_item(id).is_some() {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            debug!("removed {} trace tails of {:?}", removed, net);
        }
        removed
    }

    /// Splits a trace of `nets` on `layer` that passes through `p` without
    /// ending there, so that `p` becomes a shared end point. Returns true if a
    /// trace was split.
    pub fn connect_to_trace(
        &mut self,
        p: IntPoint,
        layer: usize,
        nets: &[NetId],
    ) -> Result<bool, BoardError> {
        let bounds = IntBox::point(p).offset(1);
        for id in self.pick_items(bounds, Some(layer)) {
            let Some(item) = self.items.get(&id) else {
                continue;
            };
            let Some(t) = item.as_trace() else {
                continue;
            };
            if !item.shares_net_with(nets) || t.layer != layer {
                continue;
            }
            let n = t.corners.len();
            if n < 2 || t.corners[0] == p || t.corners[n - 1] == p {
                continue;
            }
            let Some(i) = (0..n - 1).find(|&i| point_on_segment(p, t.corners[i], t.corners[i + 1]))
            else {
                continue;
            };
            let mut head: Vec<IntPoint> = t.corners[..=i].to_vec();
            if head.last() != Some(&p) {
                head.push(p);
            }
            let mut tail = vec![p];
            tail.extend(t.corners[i + 1..].iter().copied().filter(|&c| c != p));
            let (hw, nets, class, fixed) =
                (t.half_width, item.nets.clone(), item.clearance_class, item.fixed);
            self.remove_item(id);
            let first = self.add_trace(head, hw, layer, nets.clone(), class)?;
            let second = self.add_trace(tail, hw, layer, nets, class)?;
            if fixed {
                self.set_fixed(first, true)?;
                self.set_fixed(second, true)?;
            }
            debug!("split {:?} at {:?} into {:?} and {:?}", id, p, first, second);
            return Ok(true);
        }
        Ok(false)
    }

    /// Drops redundant corners of the traces of `net` and joins traces that
    /// meet end to end with nothing else attached.
    pub fn normalize_traces(&mut self, net: NetId) -> Result<(), BoardError> {
        let ids: Vec<ItemId> = self
            .items
            .values()
            .filter(|i| i.contains_net(net) && !i.fixed && matches!(i.kind, ItemKind::Trace(_)))
            .map(|i| i.id)
            .collect();
        for id in ids {
            let Some(t) = self.items.get(&id).and_then(Item::as_trace) else {
                continue;
            };
            let simplified = simplify_corners(&t.corners);
            if simplified == t.corners {
                continue;
            }
            let Some(item) = self.remove_item(id) else {
                continue;
            };
            if simplified.len() >= 2 {
                let (half_width, layer) = (trace_half_width(&item), item.first_layer());
                self.add_trace(simplified, half_width, layer, item.nets, item.clearance_class)?;
            }
        }
        while let Some((a, b, p)) = self.find_combinable(net) {
            let (Some(ia), Some(ib)) = (self.remove_item(a), self.remove_item(b)) else {
                break;
            };
            let (Some(ta), Some(tb)) = (ia.as_trace(), ib.as_trace()) else {
                break;
            };
            let mut first = ta.corners.clone();
            if first.first() == Some(&p) {
                first.reverse();
            }
            let mut second = tb.corners.clone();
            if second.last() == Some(&p) {
                second.reverse();
            }
            first.extend(second.into_iter().skip(1));
            let merged = simplify_corners(&first);
            let (nets, class) = (ia.nets.clone(), ia.clearance_class);
            let id = self.add_trace(merged, ta.half_width, ta.layer, nets, class)?;
            trace!("combined {:?} and {:?} into {:?}", a, b, id);
        }
        Ok(())
    }

    fn find_combinable(&self, net: NetId) -> Option<(ItemId, ItemId, IntPoint)> {
        for item in self.items.values().filter(|i| i.contains_net(net) && !i.fixed) {
            let Some(t) = item.as_trace() else {
                continue;
            };
            let ends = [t.corners.first().copied(), t.corners.last().copied()];
            for p in ends.into_iter().flatten() {
                let at_p: Vec<ItemId> = self
                    .pick_items(IntBox::point(p).offset(1), Some(t.layer))
                    .into_iter()
                    .filter(|&o| o != item.id)
                    .filter(|o| {
                        self.items.get(o).is_some_and(|other| {
                            other.shares_net(item)
                                && other.is_connectable()
                                && ends_at(other, p, t.layer)
                        })
                    })
                    .collect();
                if at_p.len() != 1 {
                    continue;
                }
                let Some(other) = self.items.get(&at_p[0]) else {
                    continue;
                };
                let Some(ot) = other.as_trace() else {
                    continue;
                };
                if !other.fixed
                    && ot.half_width == t.half_width
                    && other.nets == item.nets
                    && ot.corners.len() >= 2
                    && t.corners.len() >= 2
                {
                    return Some((item.id, other.id, p));
                }
            }
        }
        None
    }
}

/// True if `item` is a trace on `layer` ending at `p`, or another item whose
/// shape on `layer` contains `p`.
fn ends_at(item: &Item, p: IntPoint, layer: usize) -> bool {
    match &item.kind {
        ItemKind::Trace(t) => {
            t.layer == layer && (t.corners.first() == Some(&p) || t.corners.last() == Some(&p))
        }
        _ => item.shape_on_layer(layer).is_some_and(|s| s.contains(p.to_float())),
    }
}

fn trace_half_width(item: &Item) -> i64 {
    item.as_trace().map(|t| t.half_width).unwrap_or(0)
}

fn trace_ends(t: &Trace) -> impl Iterator<Item = IntPoint> + '_ {
    t.corners.first().into_iter().chain(t.corners.last()).copied()
}

fn items_touch(a: &Item, b: &Item) -> bool {
    match (&a.kind, &b.kind) {
        (ItemKind::Trace(t1), ItemKind::Trace(t2)) => {
            t1.layer == t2.layer && trace_ends(t1).any(|p| trace_ends(t2).any(|q| q == p))
        }
        (ItemKind::Trace(t), _) => trace_end_inside(t, b),
        (_, ItemKind::Trace(t)) => trace_end_inside(t, a),
        _ => {
            let lo = a.first_layer().max(b.first_layer());
            let hi = a.last_layer().min(b.last_layer());
            (lo..=hi).any(|l| match (a.shape_on_layer(l), b.shape_on_layer(l)) {
                (Some(sa), Some(sb)) => sa.intersects(&sb),
                _ => false,
            })
        }
    }
}

fn trace_end_inside(t: &Trace, other: &Item) -> bool {
    other
        .shape_on_layer(t.layer)
        .is_some_and(|s| trace_ends(t).any(|p| s.contains(p.to_float())))
}

/// Distance from the centre line `segment` to the copper of `item` on `layer`.
fn centre_line_distance(item: &Item, layer: usize, segment: &FloatLine) -> f64 {
    match &item.kind {
        ItemKind::Trace(t) if t.layer == layer => t
            .corners
            .windows(2)
            .map(|w| {
                FloatLine::new(w[0].to_float(), w[1].to_float()).distance_to(segment)
                    - t.half_width as f64
            })
            .fold(f64::INFINITY, f64::min),
        ItemKind::Trace(_) => f64::INFINITY,
        _ => item
            .shape_on_layer(layer)
            .map(|s| s.distance_to_segment(segment.a, segment.b))
            .unwrap_or(f64::INFINITY),
    }
}

/// Distance from `shape` to the copper of `item` on `layer`.
pub fn copper_distance(item: &Item, layer: usize, shape: &TileShape) -> f64 {
    match &item.kind {
        ItemKind::Trace(t) if t.layer == layer => t
            .corners
            .windows(2)
            .map(|w| {
                shape.distance_to_segment(w[0].to_float(), w[1].to_float()) - t.half_width as f64
            })
            .fold(f64::INFINITY, f64::min),
        ItemKind::Trace(_) => f64::INFINITY,
        _ => item
            .shape_on_layer(layer)
            .map(|s| s.distance_to_shape(shape))
            .unwrap_or(f64::INFINITY),
    }
}

/// Removes repeated corners and corners lying on the line through their neighbours.
pub fn simplify_corners(corners: &[IntPoint]) -> Vec<IntPoint> {
    let mut out: Vec<IntPoint> = Vec::with_capacity(corners.len());
    for &c in corners {
        if out.last() == Some(&c) {
            continue;
        }
        out.push(c);
        while out.len() >= 3 {
            let n = out.len();
            let (a, b, c) = (out[n - 3], out[n - 2], out[n - 1]);
            if (b - a).cross(c - b) == 0 {
                out.remove(n - 2);
            } else {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::rules::ClearanceMatrix;
    use crate::geom::IntBox;

    fn board() -> (Board, NetId, NetId) {
        let layers = vec![
            Layer { name: "top".into(), is_signal: true, direction: LayerDirection::Horizontal },
            Layer { name: "bottom".into(), is_signal: true, direction: LayerDirection::Vertical },
        ];
        let mut rules = Rules::new(ClearanceMatrix::new(vec!["default".into()], 2, 10), 10);
        rules.via_infos.push(ViaInfo {
            name: "via".into(),
            first_layer: 0,
            last_layer: 1,
            radius: 30,
            clearance_class: 0,
            attach_smd_allowed: false,
        });
        let a = rules.add_net("A", 0);
        let b = rules.add_net("B", 0);
        (Board::new(layers, IntBox::from_coords(0, 0, 1000, 1000), rules), a, b)
    }

    fn pad(board: &mut Board, x: i64, y: i64, net: NetId) -> ItemId {
        let shape = TileShape::Box(IntBox::from_coords(x - 20, y - 20, x + 20, y + 20));
        board.add_pin("P", IntPoint::new(x, y), 0, 0, shape, vec![net], 0).unwrap()
    }

    fn trace(
        board: &mut Board,
        from: (i64, i64),
        to: (i64, i64),
        half_width: i64,
        net: NetId,
    ) -> ItemId {
        let corners = vec![IntPoint::new(from.0, from.1), IntPoint::new(to.0, to.1)];
        board.add_trace(corners, half_width, 0, vec![net], 0).unwrap()
    }

    #[test]
    fn trace_insert_stops_before_obstacle() {
        let (mut board, a, b) = board();
        trace(&mut board, (500, 0), (500, 1000), 10, b);
        let corners = [IntPoint::new(100, 500), IntPoint::new(900, 500)];
        let limits = ShoveLimits::default();
        let reached = board.insert_trace(&corners, 10, 0, &[a], 0, &limits, true).unwrap();
        // 500 - obstacle half width - clearance - own half width
        assert!(reached.x <= 470 && reached.x >= 465, "reached {:?}", reached);
        assert_eq!(board.item_count(), 1);

        let on_other_layer = board.insert_trace(&corners, 10, 1, &[a], 0, &limits, false).unwrap();
        assert_eq!(on_other_layer, corners[1]);
        assert_eq!(board.item_count(), 2);
    }

    #[test]
    fn contacts_and_connected_sets() {
        let (mut board, a, _) = board();
        let p1 = pad(&mut board, 100, 100, a);
        let p2 = pad(&mut board, 400, 100, a);
        let t1 = trace(&mut board, (100, 100), (250, 100), 5, a);
        let t2 = trace(&mut board, (250, 100), (400, 100), 5, a);
        assert_eq!(board.normal_contacts(t1).len(), 2);
        assert!(board.connected_set(p1).contains(&p2));
        let connection = board.connection_items(t1);
        assert!(connection.contains(&t2) && !connection.contains(&p1));

        board.normalize_traces(a).unwrap();
        let traces: Vec<&Item> = board.items().filter(|i| i.as_trace().is_some()).collect();
        assert_eq!(traces.len(), 1);
        assert_eq!(
            traces[0].as_trace().unwrap().corners,
            vec![IntPoint::new(100, 100), IntPoint::new(400, 100)]
        );
    }

    #[test]
    fn tails_are_removed_and_splits_connect() {
        let (mut board, a, _) = board();
        let p1 = pad(&mut board, 100, 100, a);
        trace(&mut board, (100, 100), (100, 600), 5, a);
        trace(&mut board, (100, 300), (400, 300), 5, a);
        assert!(board.connect_to_trace(IntPoint::new(100, 300), 0, &[a]).unwrap());
        let removed = board.remove_trace_tails(a);
        // The branch to (400, 300) and the stub to (100, 600) both dangle.
        assert_eq!(removed, 3);
        assert_eq!(board.connected_set(p1).len(), 1);
    }

    #[test]
    fn via_check_respects_obstacles() {
        let (mut board, a, b) = board();
        pad(&mut board, 500, 500, b);
        let info = board.rules.via_infos[0].clone();
        assert!(!board.check_via(IntPoint::new(540, 500), &info, &[a], 0));
        assert!(board.check_via(IntPoint::new(700, 500), &info, &[a], 0));
        assert!(board.insert_via(IntPoint::new(540, 500), 0, &[a], 0).is_err());
        let revision = board.revision();
        board.insert_via(IntPoint::new(700, 500), 0, &[a], 0).unwrap();
        assert_eq!(board.changes_since(revision).len(), 1);
    }

    #[test]
    fn corner_simplification() {
        let c = |x, y| IntPoint::new(x, y);
        assert_eq!(
            simplify_corners(&[c(0, 0), c(0, 0), c(5, 0), c(10, 0), c(10, 10)]),
            vec![c(0, 0), c(10, 0), c(10, 10)]
        );
    }
}
