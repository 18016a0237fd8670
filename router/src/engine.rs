//! Routing of single connections on a board.

use std::collections::BTreeSet;
use std::fmt;

use pcb_common::db::board::Board;
use pcb_common::db::{ItemId, NetId};
use pcb_common::util::config::{AngleRestriction, AutorouteConfig};
use pcb_common::util::profiler::{PhaseTimes, ScopedTimer};

use crate::algo::{MazeOutcome, MazeSearch};
use crate::context::AutorouteContext;
use crate::control::{ArtControl, StopFlag};
use crate::error::{AutorouteError, InsertError};
use crate::geometry::{BoxGeometry, OctagonGeometry, SimplexGeometry, TileGeometry};
use crate::insert::insert_connection;
use crate::locate::LocatedConnection;
use crate::tree::TreeStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AutorouteResult {
    AlreadyConnected,
    Routed,
    NotRouted,
    InsertError,
}

impl fmt::Display for AutorouteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutorouteResult::AlreadyConnected => "already connected",
            AutorouteResult::Routed => "routed",
            AutorouteResult::NotRouted => "not routed",
            AutorouteResult::InsertError => "insert error",
        };
        f.write_str(name)
    }
}

/// Keeps the search trees between attempts. Rooms, doors and drills live
/// only for one attempt.
#[derive(Default)]
pub struct AutorouteEngine {
    trees: TreeStore,
    times: PhaseTimes,
}

impl AutorouteEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase_times(&self) -> &PhaseTimes {
        &self.times
    }

    /// Checks the retained trees. Between attempts they hold no rooms.
    pub fn validate(&self) -> Result<(), AutorouteError> {
        self.trees.validate()?;
        Ok(())
    }

    pub fn room_entries(&self) -> usize {
        self.trees.room_count()
    }

    /// Drops all retained trees; they are rebuilt on the next attempt.
    pub fn clear(&mut self) {
        self.trees.clear();
    }

    /// Routes one connection of `net` from any item of `start` to any item
    /// of `dest`.
    pub fn route_connection(
        &mut self,
        board: &mut Board,
        start: &BTreeSet<ItemId>,
        dest: &BTreeSet<ItemId>,
        net: NetId,
        config: &AutorouteConfig,
        stop: &StopFlag,
    ) -> Result<AutorouteResult, AutorouteError> {
        if board.rules.net(net).is_none() {
            return Err(AutorouteError::UnknownNet(net));
        }
        if let Some(&missing) = start.iter().chain(dest).find(|&&id| board.item(id).is_none()) {
            return Err(AutorouteError::UnknownItem(missing));
        }
        if start.is_empty() || dest.is_empty() {
            log::debug!("connection of {:?} has an empty end", net);
            return Ok(AutorouteResult::NotRouted);
        }
        let connected = start.iter().any(|&s| {
            let set = board.connected_set(s);
            dest.iter().any(|d| set.contains(d))
        });
        if connected {
            return Ok(AutorouteResult::AlreadyConnected);
        }
        let control = ArtControl::new(board, net, config);
        let found = match config.angle_restriction {
            AngleRestriction::None => {
                self.search(board, &control, SimplexGeometry, start, dest, stop)
            }
            AngleRestriction::FortyFive => {
                self.search(board, &control, OctagonGeometry, start, dest, stop)
            }
            AngleRestriction::Ninety => {
                self.search(board, &control, BoxGeometry, start, dest, stop)
            }
        };
        let Some((connection, ripped)) = found else {
            return Ok(AutorouteResult::NotRouted);
        };
        if !ripped.is_empty() {
            let mut remove = BTreeSet::new();
            for &id in &ripped {
                remove.extend(board.connection_items(id));
            }
            let count = board.remove_items_unfixed(&remove);
            log::debug!("ripped {} items for {:?}", count, net);
        }
        let timer = ScopedTimer::new("insert");
        let inserted = insert_connection(board, &control, &connection, stop);
        self.times.add("insert", timer.stop());
        match inserted {
            Ok(()) => Ok(AutorouteResult::Routed),
            Err(InsertError::Stopped) => Ok(AutorouteResult::NotRouted),
            Err(e) => {
                log::info!("connection of {:?} not inserted: {}", net, e);
                Ok(AutorouteResult::InsertError)
            }
        }
    }

    /// Maze search and locate. The rooms are gone from the tree when this
    /// returns.
    fn search<G: TileGeometry>(
        &mut self,
        board: &Board,
        control: &ArtControl,
        geometry: G,
        start: &BTreeSet<ItemId>,
        dest: &BTreeSet<ItemId>,
        stop: &StopFlag,
    ) -> Option<(LocatedConnection, BTreeSet<ItemId>)> {
        let tree = self.trees.get(board, control.clearance_class, &geometry);
        let mut ctx =
            AutorouteContext::new(board, control, tree, geometry, start.clone(), dest.clone());
        let timer = ScopedTimer::new("maze search");
        let outcome = MazeSearch::new(&mut ctx, stop).run();
        self.times.add("search", timer.stop());
        log::trace!(
            "{} rooms and {} doors for {:?}",
            ctx.graph.room_count(),
            ctx.graph.door_count(),
            control.net
        );
        match outcome {
            MazeOutcome::Found(result) => {
                let timer = ScopedTimer::new("locate");
                let connection = ctx.locate(&result);
                self.times.add("locate", timer.stop());
                Some((connection, result.ripped_items))
            }
            MazeOutcome::NotFound => {
                log::debug!("no path for {:?}", control.net);
                None
            }
            MazeOutcome::NotInitialized => {
                log::debug!("search for {:?} not initialized", control.net);
                None
            }
            MazeOutcome::Stopped => None,
        }
    }
}
