/// Per-connection WebSocket session actor
///
/// The session stays unrouted until the client sends a valid subscribe
/// frame; it then registers a push channel with the ConnectionRegistry
/// (replacing any earlier connection for the same subscriber) and asks
/// the dispatcher to flush that subscriber's pending queue.
use actix::prelude::*;
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{Notification, SubscriberId};
use crate::services::NotificationDispatcher;
use crate::websocket::messages::{ClientMessage, ServerMessage};
use crate::websocket::registry::{ConnectionRegistry, PushSender};

/// How often the server pings the client
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
/// Close the connection when no pong arrives within this window
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

/// Mailbox message carrying a record pushed through the registry channel
#[derive(Message)]
#[rtype(result = "()")]
struct Deliver(Notification);

pub struct NotificationSession {
    registry: ConnectionRegistry,
    dispatcher: Arc<NotificationDispatcher>,
    subscriber: Option<SubscriberId>,
    sender: Option<PushSender>,
    hb: Instant,
}

impl NotificationSession {
    pub fn new(registry: ConnectionRegistry, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
            subscriber: None,
            sender: None,
            hb: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!(
                    subscriber = act.subscriber.as_ref().map(|s| s.as_str()),
                    "websocket client heartbeat timed out, closing"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn subscribe(&mut self, subscriber: SubscriberId, ctx: &mut ws::WebsocketContext<Self>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.subscriber = Some(subscriber.clone());
        self.sender = Some(tx.clone());

        // Forward records pushed through the registry channel into the
        // actor mailbox. The loop ends when the sending half is dropped,
        // either by unregister or by a replacing connection.
        let addr = ctx.address();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                addr.do_send(Deliver(notification));
            }
        });

        match ServerMessage::connected(subscriber.clone()).to_json() {
            Ok(ack) => ctx.text(ack),
            Err(e) => warn!(error = %e, "failed to serialize connected frame"),
        }

        let registry = self.registry.clone();
        let dispatcher = self.dispatcher.clone();
        ctx.spawn(
            async move {
                registry.register(subscriber.clone(), tx).await;
                let flushed = dispatcher.flush_pending(&subscriber).await;
                if flushed > 0 {
                    debug!(
                        subscriber = %subscriber,
                        flushed, "delivered pending notifications on reconnect"
                    );
                }
            }
            .into_actor(self),
        );
    }
}

impl Actor for NotificationSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Drop the routing entry unless a newer connection already
        // replaced it; queued-but-undelivered records are retained.
        if let (Some(subscriber), Some(sender)) = (self.subscriber.take(), self.sender.take()) {
            let registry = self.registry.clone();
            tokio::spawn(async move {
                registry.unregister_channel(&subscriber, &sender).await;
            });
        }
    }
}

impl Handler<Deliver> for NotificationSession {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg.0) {
            Ok(frame) => ctx.text(frame),
            Err(e) => warn!(error = %e, "failed to serialize notification frame"),
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for NotificationSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(ClientMessage::Subscribe { subscriber_id }) => {
                    if subscriber_id.is_empty() {
                        warn!("subscribe frame with empty subscriber id ignored");
                        if let Ok(frame) =
                            ServerMessage::error("INVALID_SUBSCRIBE", "subscriberId must not be empty")
                                .to_json()
                        {
                            ctx.text(frame);
                        }
                        return;
                    }
                    self.subscribe(subscriber_id, ctx);
                }
                Err(e) => {
                    // Unhandled message types leave the connection open
                    // but unrouted until a valid subscribe arrives.
                    debug!(error = %e, "ignoring unhandled websocket message");
                }
            },
            Ok(ws::Message::Binary(_)) => {
                debug!("ignoring binary websocket frame");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "websocket protocol error, closing");
                ctx.stop();
            }
        }
    }
}
