//! Design rule check of a routed board.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::db::board::{copper_distance, Board};
use crate::db::indices::{ItemId, NetId};
use crate::db::item::{Item, ItemKind};
use crate::geom::{IntPoint, TileShape};

/// Rounding of routed corners to board units may eat into the clearance by this much.
const CHECK_TOLERANCE: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ClearanceViolation {
    pub first: ItemId,
    pub second: ItemId,
    pub layer: usize,
    pub distance: f64,
    pub required: i64,
}

pub fn run(board: &Board) -> Result<(), String> {
    log::info!("Starting design rule check of {} items", board.item_count());

    let (violations, opens) = rayon::join(|| clearance_violations(board), || open_nets(board));

    let mut msgs = Vec::new();
    if violations.is_empty() {
        log::info!("\x1b[32mPASS\x1b[0m: No clearance violations.");
    } else {
        log::error!("\x1b[31mFAIL\x1b[0m: {} clearance violations", violations.len());
        for v in violations.iter().take(10) {
            log::error!(
                "  {:?} - {:?} on layer {}: distance {:.1} < {}",
                v.first,
                v.second,
                v.layer,
                v.distance,
                v.required
            );
        }
        msgs.push(format!("{} clearance violations", violations.len()));
    }

    if opens.is_empty() {
        log::info!("\x1b[32mPASS\x1b[0m: All nets are fully connected.");
    } else {
        let names: Vec<&str> = opens
            .iter()
            .map(|&n| board.rules.net(n).map(|i| i.name.as_str()).unwrap_or("?"))
            .collect();
        log::warn!("\x1b[33mOPEN\x1b[0m: {} nets not connected: {}", opens.len(), names.join(", "));
        msgs.push(format!("{} open nets", opens.len()));
    }

    if msgs.is_empty() { Ok(()) } else { Err(msgs.join("; ")) }
}

/// Pairs of items of different nets closer than their clearance.
pub fn clearance_violations(board: &Board) -> Vec<ClearanceViolation> {
    let items: Vec<&Item> = board.items().collect();
    let mut result: Vec<ClearanceViolation> = items
        .par_iter()
        .flat_map_iter(|item| violations_of(board, item))
        .collect();
    result.sort_by_key(|v| (v.first, v.second, v.layer));
    result
}

fn violations_of(board: &Board, item: &Item) -> Vec<ClearanceViolation> {
    let mut result = Vec::new();
    for layer in item.first_layer()..=item.last_layer() {
        let margin = board.rules.clearance.max_value(item.clearance_class, layer);
        let bounds = item.bounding_box().offset(margin + 1);
        for other_id in board.pick_items(bounds, Some(layer)) {
            if other_id <= item.id {
                continue;
            }
            let Some(other) = board.item(other_id) else {
                continue;
            };
            if item.shares_net(other) || (item.nets.is_empty() && other.nets.is_empty()) {
                continue;
            }
            let required =
                board.rules.clearance.value(item.clearance_class, other.clearance_class, layer);
            let distance = item_distance(item, other, layer);
            if distance < required as f64 - CHECK_TOLERANCE {
                result.push(ClearanceViolation {
                    first: item.id,
                    second: other.id,
                    layer,
                    distance,
                    required,
                });
            }
        }
    }
    result
}

fn item_distance(item: &Item, other: &Item, layer: usize) -> f64 {
    match &item.kind {
        ItemKind::Trace(t) if t.layer == layer => t
            .corners
            .windows(2)
            .map(|w| {
                copper_distance(other, layer, &TileShape::segment(w[0], w[1])) - t.half_width as f64
            })
            .fold(f64::INFINITY, f64::min),
        ItemKind::Trace(_) => f64::INFINITY,
        _ => item
            .shape_on_layer(layer)
            .map(|s| copper_distance(other, layer, &s))
            .unwrap_or(f64::INFINITY),
    }
}

/// Nets whose pins are not all connected with each other.
pub fn open_nets(board: &Board) -> Vec<NetId> {
    (0..board.rules.nets.len())
        .into_par_iter()
        .map(NetId::new)
        .filter(|&net| {
            let pins: Vec<ItemId> = board
                .items_of_net(net)
                .into_iter()
                .filter(|&id| board.item(id).is_some_and(|i| matches!(i.kind, ItemKind::Pin(_))))
                .collect();
            let Some(&first) = pins.first() else {
                return false;
            };
            let connected: BTreeSet<ItemId> = board.connected_set(first);
            pins.iter().any(|p| !connected.contains(p))
        })
        .collect()
}

/// Total centre line length of the traces on the board.
pub fn wire_length(board: &Board) -> f64 {
    board
        .items()
        .filter_map(Item::as_trace)
        .map(|t| {
            t.corners
                .windows(2)
                .map(|w| IntPoint::distance(w[0], w[1]))
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::board::{Layer, LayerDirection};
    use crate::db::rules::{ClearanceMatrix, Rules};
    use crate::geom::IntBox;

    fn board() -> (Board, NetId, NetId) {
        let layers = vec![Layer {
            name: "top".into(),
            is_signal: true,
            direction: LayerDirection::Unknown,
        }];
        let mut rules = Rules::new(ClearanceMatrix::new(vec!["default".into()], 1, 20), 10);
        let a = rules.add_net("A", 0);
        let b = rules.add_net("B", 0);
        (Board::new(layers, IntBox::from_coords(0, 0, 1000, 1000), rules), a, b)
    }

    fn pad(board: &mut Board, x: i64, y: i64, net: NetId) -> ItemId {
        let shape = TileShape::Box(IntBox::from_coords(x - 10, y - 10, x + 10, y + 10));
        board.add_pin("P", IntPoint::new(x, y), 0, 0, shape, vec![net], 0).unwrap()
    }

    fn trace(board: &mut Board, y: i64, x0: i64, x1: i64, half_width: i64, net: NetId) -> ItemId {
        let corners = vec![IntPoint::new(x0, y), IntPoint::new(x1, y)];
        board.add_trace(corners, half_width, 0, vec![net], 0).unwrap()
    }

    #[test]
    fn close_traces_of_different_nets_violate() {
        let (mut board, a, b) = board();
        let first = trace(&mut board, 100, 0, 500, 10, a);
        let second = trace(&mut board, 130, 0, 500, 10, b);
        trace(&mut board, 300, 0, 500, 10, b);
        let violations = clearance_violations(&board);
        assert_eq!(violations.len(), 1);
        assert_eq!((violations[0].first, violations[0].second), (first, second));
        assert!((violations[0].distance - 10.0).abs() < 1e-6);
    }

    #[test]
    fn opens_are_reported_until_connected() {
        let (mut board, a, _) = board();
        pad(&mut board, 100, 100, a);
        pad(&mut board, 400, 100, a);
        assert_eq!(open_nets(&board), vec![a]);
        assert!(run(&board).is_err());
        trace(&mut board, 100, 100, 400, 5, a);
        assert!(open_nets(&board).is_empty());
        assert!(run(&board).is_ok());
        assert!((wire_length(&board) - 300.0).abs() < 1e-9);
    }
}
