pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{
    Notification, NotificationInput, NotificationPriority, NotificationType, SubscriberId,
};
pub use services::{InMemoryNotificationStore, NotificationDispatcher, NotificationStore};
pub use websocket::{ConnectionRegistry, NotificationSession, PushSender};
