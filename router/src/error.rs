use pcb_common::db::{BoardError, ItemId, NetId};
use pcb_common::geom::shape_tree::TreeError;
use pcb_common::geom::IntPoint;
use thiserror::Error;

/// Internal failures of a routing attempt. Ordinary outcomes such as an
/// unreachable destination are reported through `AutorouteResult` instead.
#[derive(Debug, Error)]
pub enum AutorouteError {
    #[error("board rejected a change: {0}")]
    Board(#[from] BoardError),
    #[error("item {0:?} is not on the board")]
    UnknownItem(ItemId),
    #[error("net {0:?} does not exist")]
    UnknownNet(NetId),
    #[error("search tree is inconsistent: {0}")]
    Tree(#[from] TreeError),
}

/// Reasons a located connection could not be committed. The engine reports
/// these as `AutorouteResult::InsertError`.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("connection was only partly located")]
    Incomplete,
    #[error("no via of the rule fits at {location:?} between layers {from} and {to}")]
    NoVia { location: IntPoint, from: usize, to: usize },
    #[error("trace on layer {layer} blocked at {reached:?}")]
    TraceBlocked { layer: usize, reached: IntPoint },
    #[error("stop requested during insertion")]
    Stopped,
    #[error(transparent)]
    Board(#[from] BoardError),
}
