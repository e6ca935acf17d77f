pub mod config;
pub mod error;
pub mod seed;
pub mod storage;
pub mod store;
pub mod task;

pub use error::{StorageError, StoreError};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageAdapter, StorageInfo};
pub use store::{Clock, DragChange, ImportReport, SharedTaskStore, Snapshot, SystemClock, TaskStore};
pub use task::{Assignee, Column, Priority, Status, Task, TaskId};
