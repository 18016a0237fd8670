pub mod board;
pub mod description;
pub mod indices;
pub mod item;
pub mod rules;

pub use board::{Board, BoardChange, BoardError, BoardObserver, Layer, LayerDirection, ShoveLimits};
pub use indices::{ItemId, NetId};
pub use item::{Item, ItemKind};
pub use rules::{ClearanceMatrix, Rules, ViaInfo};
