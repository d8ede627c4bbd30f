pub mod messages;
pub mod scheduler;

pub use messages::CleanupCommand;
pub use scheduler::{CleanupHandle, CleanupScheduler};
