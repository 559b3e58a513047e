//! Event-driven notification inbox with client-local persistence.

pub mod center;
pub mod notification;
pub mod store;

pub use center::{NotificationCenter, DEFAULT_HISTORY_CAP};
pub use notification::{Notification, NotificationLevel};
pub use store::{JsonFileStore, MemoryStore, NotificationStore};
