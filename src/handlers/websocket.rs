/// WebSocket upgrade and connection-status handlers
use actix_web::{web, Error, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;
use std::sync::Arc;

use crate::models::SubscriberId;
use crate::services::NotificationDispatcher;
use crate::websocket::{ConnectionRegistry, NotificationSession};

/// WebSocket upgrade endpoint
///
/// Endpoint: GET /ws
///
/// Routing is established by the subscribe frame after the handshake,
/// not by the URL.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<ConnectionRegistry>,
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
) -> Result<HttpResponse, Error> {
    ws::start(
        NotificationSession::new(registry.get_ref().clone(), dispatcher.get_ref().clone()),
        &req,
        stream,
    )
}

/// Live-connection status for a subscriber
///
/// Endpoint: GET /api/v1/ws/status/{subscriber_id}
pub async fn ws_status(
    path: web::Path<String>,
    registry: web::Data<ConnectionRegistry>,
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
) -> ActixResult<HttpResponse> {
    let subscriber = SubscriberId::new(path.into_inner());

    let connected = registry.is_connected(&subscriber).await;
    let pending = dispatcher.pending_count(&subscriber).await;

    Ok(HttpResponse::Ok().json(json!({
        "subscriberId": subscriber,
        "connected": connected,
        "pendingNotifications": pending,
    })))
}

/// Connection and queue metrics
///
/// Endpoint: GET /api/v1/ws/metrics
pub async fn ws_metrics(
    registry: web::Data<ConnectionRegistry>,
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
) -> ActixResult<HttpResponse> {
    let connected = registry.connected_count().await;
    let pending = dispatcher.total_pending().await;

    Ok(HttpResponse::Ok().json(json!({
        "connectedSubscribers": connected,
        "totalPendingNotifications": pending,
    })))
}

/// List connected subscriber ids
///
/// Endpoint: GET /api/v1/ws/subscribers
pub async fn list_connected_subscribers(
    registry: web::Data<ConnectionRegistry>,
) -> ActixResult<HttpResponse> {
    let subscribers = registry.connected_subscriber_ids().await;

    Ok(HttpResponse::Ok().json(json!({
        "count": subscribers.len(),
        "subscribers": subscribers,
    })))
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect)).service(
        web::scope("/api/v1/ws")
            .route("/status/{subscriber_id}", web::get().to(ws_status))
            .route("/metrics", web::get().to(ws_metrics))
            .route("/subscribers", web::get().to(list_connected_subscribers)),
    );
}
