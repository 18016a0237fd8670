//! Autorouting of single connections through expansion rooms.
//!
//! An attempt completes free space around the start items into rooms, joins
//! neighbouring rooms by doors, searches the room graph for the cheapest
//! path to the destination, turns that path into trace corners and inserts
//! them on the board.

pub mod algo;
pub mod completion;
pub mod context;
pub mod control;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod insert;
pub mod locate;
pub mod rooms;
pub mod tree;

pub use control::{ArtControl, StopFlag};
pub use engine::{AutorouteEngine, AutorouteResult};
pub use error::{AutorouteError, InsertError};
