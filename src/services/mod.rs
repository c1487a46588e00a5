pub mod dispatcher;
pub mod store;

pub use dispatcher::NotificationDispatcher;
pub use store::{InMemoryNotificationStore, NotificationStore};
