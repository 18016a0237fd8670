use std::collections::{BTreeSet, HashSet};

use pcb_autoroute::algo::{MazeOutcome, MazeSearch};
use pcb_autoroute::context::AutorouteContext;
use pcb_autoroute::geometry::{BoxGeometry, SimplexGeometry};
use pcb_autoroute::tree::{TreeOwner, TreeStore};
use pcb_autoroute::{ArtControl, AutorouteEngine, AutorouteError, AutorouteResult, StopFlag};
use pcb_common::db::board::{Board, Layer, LayerDirection};
use pcb_common::db::item::ItemKind;
use pcb_common::db::rules::{ClearanceMatrix, Rules, ViaInfo};
use pcb_common::db::{ItemId, NetId};
use pcb_common::geom::{IntBox, IntPoint, TileShape};
use pcb_common::util::check;
use pcb_common::util::config::{AngleRestriction, AutorouteConfig};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn p(x: i64, y: i64) -> IntPoint {
    IntPoint::new(x, y)
}

fn rect(x0: i64, y0: i64, x1: i64, y1: i64) -> TileShape {
    TileShape::Box(IntBox::from_coords(x0, y0, x1, y1))
}

/// 10000 square board, clearance 100, trace half width 50. Net 0 is routed,
/// net 1 owns the obstacles.
fn board(layer_count: usize) -> (Board, NetId, NetId) {
    let layers = (0..layer_count)
        .map(|i| Layer {
            name: format!("L{}", i + 1),
            is_signal: true,
            direction: LayerDirection::Unknown,
        })
        .collect();
    let mut rules = Rules::new(ClearanceMatrix::new(vec!["default".into()], layer_count, 100), 50);
    let net = rules.add_net("SIG", 0);
    let other = rules.add_net("OTHER", 0);
    (Board::new(layers, IntBox::from_coords(0, 0, 10000, 10000), rules), net, other)
}

fn pin(
    board: &mut Board,
    name: &str,
    centre: IntPoint,
    layer: usize,
    w: i64,
    h: i64,
    net: NetId,
) -> ItemId {
    let pad = rect(centre.x - w / 2, centre.y - h / 2, centre.x + w / 2, centre.y + h / 2);
    board.add_pin(name, centre, layer, layer, pad, vec![net], 0).unwrap()
}

fn traces_of(board: &Board, net: NetId) -> Vec<(Vec<IntPoint>, i64, usize)> {
    board
        .items()
        .filter(|i| i.contains_net(net))
        .filter_map(|i| i.as_trace())
        .map(|t| (t.corners.clone(), t.half_width, t.layer))
        .collect()
}

fn route(
    board: &mut Board,
    a: ItemId,
    b: ItemId,
    net: NetId,
    config: &AutorouteConfig,
) -> AutorouteResult {
    let mut engine = AutorouteEngine::new();
    let (start, dest) = (BTreeSet::from([a]), BTreeSet::from([b]));
    let result = engine
        .route_connection(board, &start, &dest, net, config, &StopFlag::new())
        .unwrap();
    assert_eq!(engine.room_entries(), 0);
    engine.validate().unwrap();
    result
}

#[test]
fn straight_connection_on_one_layer() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 5000), 0, 400, 400, net);

    let result = route(&mut board, a, b, net, &AutorouteConfig::default());

    assert_eq!(result, AutorouteResult::Routed);
    assert!(board.connected_set(a).contains(&b));
    let traces = traces_of(&board, net);
    assert_eq!(traces.len(), 1);
    let (corners, half_width, _) = &traces[0];
    assert_eq!(*half_width, 50);
    assert_eq!(corners.first(), Some(&p(2000, 5000)));
    assert_eq!(corners.last(), Some(&p(8000, 5000)));
    assert!(corners.iter().all(|c| c.y == 5000));
}

#[test]
fn layer_change_places_one_via() {
    init_logger();
    let (mut board, net, _) = board(2);
    for radius in [150, 200] {
        board.rules.via_infos.push(ViaInfo {
            name: format!("via{}", radius),
            first_layer: 0,
            last_layer: 1,
            radius,
            clearance_class: 0,
            attach_smd_allowed: false,
        });
    }
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 5000), 1, 400, 400, net);

    let result = route(&mut board, a, b, net, &AutorouteConfig::default());

    assert_eq!(result, AutorouteResult::Routed);
    let vias: Vec<_> = board
        .items()
        .filter_map(|i| match &i.kind {
            ItemKind::Via(v) => Some(v.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(vias.len(), 1);
    assert_eq!(vias[0].rule_index, 0);
    assert!(board.connected_set(a).contains(&b));
    let layers: BTreeSet<usize> = traces_of(&board, net).iter().map(|t| t.2).collect();
    assert_eq!(layers, BTreeSet::from([0, 1]));
}

#[test]
fn connected_pins_are_left_alone() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 5000), 0, 400, 400, net);
    board.add_trace(vec![p(2000, 5000), p(8000, 5000)], 50, 0, vec![net], 0).unwrap();
    let count = board.item_count();

    let result = route(&mut board, a, b, net, &AutorouteConfig::default());

    assert_eq!(result, AutorouteResult::AlreadyConnected);
    assert_eq!(board.item_count(), count);
}

#[test]
fn enclosed_destination_is_not_routed() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 5000), 0, 400, 400, net);
    for (i, wall) in [
        rect(7000, 6000, 9000, 6400),
        rect(7000, 3600, 9000, 4000),
        rect(7000, 4000, 7400, 6000),
        rect(8600, 4000, 9000, 6000),
    ]
    .into_iter()
    .enumerate()
    {
        board.add_obstacle_area(format!("wall{}", i), wall, 0, Vec::new()).unwrap();
    }
    let count = board.item_count();

    let result = route(&mut board, a, b, net, &AutorouteConfig::default());

    assert_eq!(result, AutorouteResult::NotRouted);
    assert_eq!(board.item_count(), count);
}

#[test]
fn stop_before_the_search_leaves_the_board_unchanged() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 5000), 0, 400, 400, net);
    let count = board.item_count();
    let stop = StopFlag::new();
    stop.request_stop();

    let mut engine = AutorouteEngine::new();
    let result = engine
        .route_connection(
            &mut board,
            &BTreeSet::from([a]),
            &BTreeSet::from([b]),
            net,
            &AutorouteConfig::default(),
            &stop,
        )
        .unwrap();

    assert_eq!(result, AutorouteResult::NotRouted);
    assert_eq!(board.item_count(), count);
    assert_eq!(engine.room_entries(), 0);
}

#[test]
fn bad_requests() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let config = AutorouteConfig::default();
    let stop = StopFlag::new();
    let mut engine = AutorouteEngine::new();

    let start = BTreeSet::from([a]);
    let unknown =
        engine.route_connection(&mut board, &start, &start, NetId::new(9), &config, &stop);
    assert!(matches!(unknown, Err(AutorouteError::UnknownNet(_))));

    let empty = engine
        .route_connection(&mut board, &BTreeSet::from([a]), &BTreeSet::new(), net, &config, &stop)
        .unwrap();
    assert_eq!(empty, AutorouteResult::NotRouted);
}

fn assert_directions(board: &Board, net: NetId, allowed: impl Fn(i64, i64) -> bool) {
    let traces = traces_of(board, net);
    assert!(!traces.is_empty());
    for (corners, _, _) in traces {
        for w in corners.windows(2) {
            let (dx, dy) = (w[1].x - w[0].x, w[1].y - w[0].y);
            assert!(allowed(dx, dy), "segment {:?} -> {:?}", w[0], w[1]);
        }
    }
}

#[test]
fn ninety_degree_routes_are_axis_parallel() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 3000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 7000), 0, 400, 400, net);
    let config = AutorouteConfig {
        angle_restriction: AngleRestriction::Ninety,
        ..AutorouteConfig::default()
    };

    assert_eq!(route(&mut board, a, b, net, &config), AutorouteResult::Routed);
    assert!(board.connected_set(a).contains(&b));
    assert_directions(&board, net, |dx, dy| dx == 0 || dy == 0);
}

#[test]
fn forty_five_degree_routes_use_eight_directions() {
    init_logger();
    let (mut board, net, _) = board(1);
    let a = pin(&mut board, "A", p(2000, 3000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 7000), 0, 400, 400, net);
    let config = AutorouteConfig {
        angle_restriction: AngleRestriction::FortyFive,
        ..AutorouteConfig::default()
    };

    assert_eq!(route(&mut board, a, b, net, &config), AutorouteResult::Routed);
    assert!(board.connected_set(a).contains(&b));
    assert_directions(&board, net, |dx, dy| dx == 0 || dy == 0 || dx.abs() == dy.abs());
}

#[test]
fn narrow_gap_is_entered_with_neckdown() {
    init_logger();
    let (mut board, net, other) = board(1);
    board.rules.nets[net.index()].trace_half_width = Some(100);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 800, 200, net);
    let b = pin(&mut board, "B", p(6000, 5000), 0, 200, 200, net);
    let pad_c = rect(2500, 5180, 2700, 5380);
    let pad_d = rect(2500, 4620, 2700, 4820);
    board.add_pin("C", p(2600, 5280), 0, 0, pad_c, vec![other], 0).unwrap();
    board.add_pin("D", p(2600, 4720), 0, 0, pad_d, vec![other], 0).unwrap();

    let result = route(&mut board, a, b, net, &AutorouteConfig::default());

    assert_eq!(result, AutorouteResult::Routed);
    let traces = traces_of(&board, net);
    assert!(traces.iter().any(|(c, hw, _)| *hw == 50 && c.first() == Some(&p(2000, 5000))));
    assert!(traces.iter().any(|(_, hw, _)| *hw == 100));
    assert!(board.connected_set(a).contains(&b));
}

/// Trace of the other net straight across the way from A to B.
fn board_with_blocking_trace() -> (Board, NetId, ItemId, ItemId, ItemId) {
    let (mut board, net, other) = board(1);
    let a = pin(&mut board, "A", p(2000, 5000), 0, 400, 400, net);
    let b = pin(&mut board, "B", p(8000, 5000), 0, 400, 400, net);
    let blocker = board
        .add_trace(vec![p(5000, 3000), p(5000, 7000)], 50, 0, vec![other], 0)
        .unwrap();
    (board, net, a, b, blocker)
}

fn search(
    board: &Board,
    net: NetId,
    a: ItemId,
    b: ItemId,
    config: &AutorouteConfig,
) -> MazeOutcome {
    let control = ArtControl::new(board, net, config);
    let mut trees = TreeStore::default();
    let tree = trees.get(board, control.clearance_class, &SimplexGeometry);
    let mut ctx = AutorouteContext::new(
        board,
        &control,
        tree,
        SimplexGeometry,
        BTreeSet::from([a]),
        BTreeSet::from([b]),
    );
    let stop = StopFlag::new();
    MazeSearch::new(&mut ctx, &stop).run()
}

fn search_with_ripup(
    board: &Board,
    net: NetId,
    a: ItemId,
    b: ItemId,
    ripup_cost: f64,
) -> MazeOutcome {
    let config = AutorouteConfig {
        ripup_allowed: true,
        ripup_cost,
        ..AutorouteConfig::default()
    };
    search(board, net, a, b, &config)
}

#[test]
fn cheap_ripup_goes_through_the_trace() {
    init_logger();
    let (board, net, a, b, blocker) = board_with_blocking_trace();
    let MazeOutcome::Found(found) = search_with_ripup(&board, net, a, b, 200.0) else {
        panic!("no path found");
    };
    assert!(found.ripped_items.contains(&blocker));
    assert!((found.cost - 6200.0).abs() < 1.0, "cost {}", found.cost);
}

/// Two layers, horizontal over vertical, with through-hole pins at (2000, 5000)
/// and (8000, 5000) and a trace of the other net cutting the top layer in two.
fn board_with_cut_top_layer() -> (Board, NetId, ItemId, ItemId, ItemId) {
    let layers = [LayerDirection::Horizontal, LayerDirection::Vertical]
        .into_iter()
        .enumerate()
        .map(|(i, direction)| Layer {
            name: format!("L{}", i + 1),
            is_signal: true,
            direction,
        })
        .collect();
    let mut rules = Rules::new(ClearanceMatrix::new(vec!["default".into()], 2, 100), 50);
    let net = rules.add_net("SIG", 0);
    let other = rules.add_net("OTHER", 0);
    let mut board = Board::new(layers, IntBox::from_coords(0, 0, 10000, 10000), rules);
    let a = board
        .add_pin("A", p(2000, 5000), 0, 1, rect(1800, 4800, 2200, 5200), vec![net], 0)
        .unwrap();
    let b = board
        .add_pin("B", p(8000, 5000), 0, 1, rect(7800, 4800, 8200, 5200), vec![net], 0)
        .unwrap();
    let blocker = board
        .add_trace(vec![p(5000, 0), p(5000, 10000)], 50, 0, vec![other], 0)
        .unwrap();
    (board, net, a, b, blocker)
}

#[test]
fn expensive_ripup_goes_around_the_trace() {
    init_logger();
    let (board, net, a, b, blocker) = board_with_cut_top_layer();
    let config = |ripup_cost| AutorouteConfig {
        vias_allowed: false,
        ripup_allowed: true,
        ripup_cost,
        preferred_direction_cost: 1.0,
        against_direction_cost: 3.0,
        ..AutorouteConfig::default()
    };

    // Straight along the vertical layer: 6000 against its direction.
    let MazeOutcome::Found(around) = search(&board, net, a, b, &config(20_000.0)) else {
        panic!("no path found");
    };
    assert!(around.ripped_items.is_empty());
    assert!((around.cost - 18_000.0).abs() < 1.0, "cost {}", around.cost);

    // Straight along the horizontal layer through the trace.
    let MazeOutcome::Found(through) = search(&board, net, a, b, &config(200.0)) else {
        panic!("no path found");
    };
    assert_eq!(through.ripped_items, BTreeSet::from([blocker]));
    assert!((through.cost - 6200.0).abs() < 1.0, "cost {}", through.cost);
}

#[test]
fn engine_removes_ripped_traces() {
    init_logger();
    let (mut board, net, a, b, blocker) = board_with_blocking_trace();
    let config = AutorouteConfig {
        ripup_allowed: true,
        ..AutorouteConfig::default()
    };

    assert_eq!(route(&mut board, a, b, net, &config), AutorouteResult::Routed);
    assert!(board.item(blocker).is_none());
    assert!(board.connected_set(a).contains(&b));
    let traces = traces_of(&board, net);
    assert_eq!(traces.len(), 1);
    assert!(traces[0].0.iter().all(|c| c.y == 5000));
}

#[test]
fn doors_are_listed_by_both_rooms() {
    init_logger();
    let (board, net, a, b, _) = board_with_blocking_trace();
    let control = ArtControl::new(&board, net, &AutorouteConfig::default());
    let mut trees = TreeStore::default();
    let tree = trees.get(&board, control.clearance_class, &SimplexGeometry);
    let mut ctx = AutorouteContext::new(
        &board,
        &control,
        tree,
        SimplexGeometry,
        BTreeSet::from([a]),
        BTreeSet::from([b]),
    );
    let stop = StopFlag::new();
    assert!(matches!(MazeSearch::new(&mut ctx, &stop).run(), MazeOutcome::Found(_)));

    let mut pairs = HashSet::new();
    for (id, room) in ctx.graph.rooms() {
        for &door_id in &room.doors {
            let door = ctx.graph.door(door_id);
            let other = door.other(id).expect("door does not belong to the room listing it");
            assert!(ctx.graph.room(other).doors.contains(&door_id));
            let key = (door.first.min(door.second), door.first.max(door.second));
            pairs.insert((key, door_id));
        }
    }
    let keys: HashSet<_> = pairs.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys.len(), pairs.len());
    assert_eq!(keys.len(), ctx.graph.door_count());
}

#[test]
fn complete_rooms_stay_clear_of_obstacles() {
    init_logger();
    let (board, net, a, b, _) = board_with_blocking_trace();
    let control = ArtControl::new(&board, net, &AutorouteConfig::default());
    let mut trees = TreeStore::default();
    let tree = trees.get(&board, control.clearance_class, &BoxGeometry);
    let mut ctx = AutorouteContext::new(
        &board,
        &control,
        tree,
        BoxGeometry,
        BTreeSet::from([a]),
        BTreeSet::from([b]),
    );
    let stop = StopFlag::new();
    assert!(matches!(MazeSearch::new(&mut ctx, &stop).run(), MazeOutcome::Found(_)));

    let mut checked = 0;
    for (_, room) in ctx.graph.complete_rooms() {
        checked += 1;
        for entry in ctx.tree().overlapping(&room.shape, room.layer) {
            let TreeOwner::Item(item) = entry.key.owner else {
                continue;
            };
            if board.item(item).is_some_and(|i| i.is_obstacle_for(net)) {
                assert!(
                    !room.shape.overlaps_interior(&entry.shape),
                    "room {:?} overlaps {:?}",
                    room.shape,
                    item
                );
            }
        }
    }
    assert!(checked > 0);
}

/// Two blocks of the other net between the pins, leaving a horizontal
/// channel of width `gap` around y = 5000.
fn board_with_gap(gap: i64) -> (Board, NetId, ItemId, ItemId) {
    let (mut board, net, other) = board(1);
    let a = pin(&mut board, "A", p(1500, 1500), 0, 200, 200, net);
    let b = pin(&mut board, "B", p(8500, 8500), 0, 200, 200, net);
    let lower = rect(4000, 3000, 6000, 5000 - gap / 2);
    let upper = rect(4000, 5000 + gap / 2, 6000, 7000);
    board.add_obstacle_area("lower", lower, 0, vec![other]).unwrap();
    board.add_obstacle_area("upper", upper, 0, vec![other]).unwrap();
    (board, net, a, b)
}

#[test]
fn gap_between_blocks_is_routed_in_every_angle_mode() {
    init_logger();
    let modes: [(AngleRestriction, fn(i64, i64) -> bool); 3] = [
        (AngleRestriction::None, |_, _| true),
        (AngleRestriction::FortyFive, |dx, dy| dx == 0 || dy == 0 || dx.abs() == dy.abs()),
        (AngleRestriction::Ninety, |dx, dy| dx == 0 || dy == 0),
    ];
    for (angle, allowed) in modes {
        for gap in [400, 500, 700] {
            let (mut board, net, a, b) = board_with_gap(gap);
            let config = AutorouteConfig {
                angle_restriction: angle,
                ..AutorouteConfig::default()
            };

            let result = route(&mut board, a, b, net, &config);

            assert_eq!(result, AutorouteResult::Routed, "{:?} gap {}", angle, gap);
            assert!(board.connected_set(a).contains(&b), "{:?} gap {}", angle, gap);
            assert_directions(&board, net, allowed);
            let violations = check::clearance_violations(&board);
            assert!(violations.is_empty(), "{:?} gap {}: {:?}", angle, gap, violations);
        }
    }
}

#[test]
fn undivided_doors_still_route() {
    init_logger();
    for door_section_length in [0.0, -1.0] {
        let (mut board, net, _) = board(1);
        let a = pin(&mut board, "A", p(2000, 3000), 0, 400, 400, net);
        let b = pin(&mut board, "B", p(8000, 7000), 0, 400, 400, net);
        let config = AutorouteConfig {
            door_section_length,
            ..AutorouteConfig::default()
        };
        assert_eq!(route(&mut board, a, b, net, &config), AutorouteResult::Routed);
        assert!(board.connected_set(a).contains(&b));
    }
}
