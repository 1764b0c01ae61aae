// Infrastructure module - background task lifecycle
pub mod task_manager;

pub use task_manager::TaskManager;
