pub mod engine;
pub mod jobs;
pub mod model;
pub mod store;

pub use engine::LifecycleEngine;
pub use model::{Priority, Task, TaskStatus};
pub use store::TaskStore;
