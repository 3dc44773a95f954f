pub mod gesture;
pub mod session;
pub mod state;

pub use gesture::{DragController, DragState, DropOutcome, MoveCommit};
pub use session::{BoardSession, CommitHandle};
pub use state::{BoardState, DropTarget, Location};
