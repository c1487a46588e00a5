/// WebSocket real-time notification push
///
/// Architecture:
/// 1. ConnectionRegistry: maps a subscriber id to its live push channel
/// 2. NotificationSession: per-connection actor handling the subscribe
///    handshake, heartbeat, and frame delivery
/// 3. Deliver-or-queue: the dispatcher routes through the registry and
///    falls back to the pending queue for offline subscribers

pub mod messages;
pub mod registry;
pub mod session;

pub use messages::{ClientMessage, ServerMessage};
pub use registry::{ConnectionRegistry, PushSender};
pub use session::NotificationSession;
