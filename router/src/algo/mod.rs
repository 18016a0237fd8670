pub mod cost;
pub mod frontier;
pub mod maze;

pub use maze::{MazeElement, MazeOutcome, MazeResult, MazeSearch};
