pub mod http_store;
pub mod sqlite_store;
pub mod store;
pub mod sync;

pub use http_store::HttpBoardStore;
pub use sqlite_store::SqliteBoardStore;
pub use store::BoardStore;
pub use sync::{BoardEvent, CommitPolicy, LoadedBoard, Synchronizer};
