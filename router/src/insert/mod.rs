//! Connection insert: commits a located connection to the board.

pub mod neckdown;

use pcb_common::db::board::{Board, BoardChange};
use pcb_common::db::{ItemId, NetId};
use pcb_common::geom::IntPoint;

use crate::control::{ArtControl, StopFlag};
use crate::error::InsertError;
use crate::locate::LocatedConnection;
use neckdown::{insert_run, Neck};

/// Places a via of the first rule entry, in preference order, that keeps
/// clearance at `location`.
fn insert_via(
    board: &mut Board,
    control: &ArtControl,
    location: IntPoint,
    from: usize,
    to: usize,
) -> Result<ItemId, InsertError> {
    let nets = [control.net];
    let rule = control.vias_between(board, from, to).find(|&i| {
        board
            .rules
            .via_infos
            .get(i)
            .is_some_and(|info| board.check_via(location, info, &nets, control.clearance_class))
    });
    let Some(rule) = rule else {
        return Err(InsertError::NoVia { location, from, to });
    };
    log::trace!("via rule {} at {:?}", rule, location);
    Ok(board.insert_via(location, rule, &nets, control.clearance_class)?)
}

fn neck_at(
    board: &Board,
    control: &ArtControl,
    item: Option<ItemId>,
    at: Option<IntPoint>,
) -> Option<Neck> {
    if !control.with_neckdown {
        return None;
    }
    Neck::of_pin(board.item(item?)?, at?)
}

fn insert_steps(
    board: &mut Board,
    control: &ArtControl,
    connection: &LocatedConnection,
    stop: &StopFlag,
) -> Result<(), InsertError> {
    let last = connection.runs.len() - 1;
    let start_neck = neck_at(board, control, connection.start_item, connection.first_corner());
    let end_neck = neck_at(board, control, connection.dest_item, connection.last_corner());
    for (i, run) in connection.runs.iter().enumerate() {
        if stop.is_stop_requested() {
            return Err(InsertError::Stopped);
        }
        if i > 0 {
            let from = connection.runs[i - 1].layer;
            if let Some(&location) = run.corners.first() {
                insert_via(board, control, location, from, run.layer)?;
            }
        }
        let start = start_neck.as_ref().filter(|_| i == 0);
        let end = end_neck.as_ref().filter(|_| i == last);
        insert_run(board, control, run, start, end)?;
    }
    Ok(())
}

fn is_trace(board: &Board, item: Option<ItemId>) -> bool {
    item.and_then(|id| board.item(id)).is_some_and(|i| i.as_trace().is_some())
}

/// Joins the new traces to trace items they end on, then tidies the net.
fn finish(
    board: &mut Board,
    control: &ArtControl,
    connection: &LocatedConnection,
) -> Result<(), InsertError> {
    let nets: [NetId; 1] = [control.net];
    let first_layer = connection.runs.first().map(|r| r.layer);
    let last_layer = connection.runs.last().map(|r| r.layer);
    let ends = [
        (connection.first_corner(), first_layer, connection.start_item),
        (connection.last_corner(), last_layer, connection.dest_item),
    ];
    for (corner, layer, item) in ends {
        if let (Some(p), Some(layer)) = (corner, layer) {
            if is_trace(board, item) {
                board.connect_to_trace(p, layer, &nets)?;
            }
        }
    }
    if control.remove_trace_tails && !control.fanout {
        board.remove_trace_tails(control.net);
    }
    board.normalize_traces(control.net)?;
    Ok(())
}

/// Removes the items inserted since `revision`.
fn roll_back(board: &mut Board, revision: usize) {
    let inserted: Vec<ItemId> = board
        .changes_since(revision)
        .iter()
        .filter_map(|change| match change {
            BoardChange::Inserted(id) => Some(*id),
            BoardChange::Removed(_) => None,
        })
        .collect();
    let removed = inserted.into_iter().filter(|&id| board.remove_item(id).is_some()).count();
    log::debug!("rolled back {} inserted items", removed);
}

/// Inserts vias and traces of `connection`. On failure the items inserted
/// so far are removed again.
pub fn insert_connection(
    board: &mut Board,
    control: &ArtControl,
    connection: &LocatedConnection,
    stop: &StopFlag,
) -> Result<(), InsertError> {
    if !connection.complete || connection.runs.is_empty() {
        return Err(InsertError::Incomplete);
    }
    board.start_notify_observers();
    let revision = board.revision();
    let result = insert_steps(board, control, connection, stop)
        .and_then(|()| finish(board, control, connection));
    if let Err(e) = &result {
        log::debug!("insert of {:?} failed: {}", control.net, e);
        roll_back(board, revision);
    }
    board.end_notify_observers();
    result
}
