// Like state: local storage, backend commit and the stores built on them

mod backend;
mod storage;
mod store;

pub use backend::{EngagementBackend, HttpEngagementBackend, LikeData, LikeResponse};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{EngagementStore, PropertyLikeStore, ToggleOutcome};
