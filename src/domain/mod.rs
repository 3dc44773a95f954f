pub mod card;
pub mod error;
pub mod position;

pub use card::{Board, BoardList, Card, CardPatch, NewCard};
pub use error::{BoardError, GestureError};
pub use position::Allocation;
