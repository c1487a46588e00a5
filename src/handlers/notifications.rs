/// Producer and read-side notification handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    NotificationInput, NotificationPriority, NotificationType, SubscriberId,
};
use crate::services::{NotificationDispatcher, NotificationStore};

/// Producer contract: a subscriber id plus the notification fields.
///
/// `type` and `priority` arrive as free-form producer strings and are
/// folded onto the closed enumerations, falling back to `system` /
/// `medium` for unknown tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationPayload {
    pub recipient: SubscriberId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub content: String,
    pub priority: Option<String>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationPayload {
    pub recipients: Vec<SubscriberId>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub content: String,
    pub priority: Option<String>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn build_input(
    notification_type: &str,
    title: String,
    content: String,
    priority: Option<&str>,
    data: Option<serde_json::Value>,
) -> NotificationInput {
    let mut input = NotificationInput::new(
        NotificationType::parse(notification_type),
        title,
        content,
        priority
            .map(NotificationPriority::parse)
            .unwrap_or_default(),
    );
    input.data = data;
    input
}

/// Dispatch a notification to one subscriber
///
/// POST /api/v1/notifications
pub async fn send_notification(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    req: web::Json<SendNotificationPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = req.into_inner();
    if payload.recipient.is_empty() {
        return Err(AppError::BadRequest("recipient must not be empty".into()));
    }

    let input = build_input(
        &payload.notification_type,
        payload.title,
        payload.content,
        payload.priority.as_deref(),
        payload.data,
    );
    let notification = dispatcher.send(&payload.recipient, input).await;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(notification)))
}

/// Fan a notification out to a list of subscribers, independently per
/// recipient
///
/// POST /api/v1/notifications/bulk
pub async fn send_bulk_notification(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    req: web::Json<BulkNotificationPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = req.into_inner();

    let recipients: Vec<SubscriberId> = payload
        .recipients
        .into_iter()
        .filter(|r| {
            if r.is_empty() {
                warn!("skipping empty recipient in bulk dispatch");
                false
            } else {
                true
            }
        })
        .collect();
    if recipients.is_empty() {
        return Err(AppError::BadRequest(
            "recipients must contain at least one subscriber id".into(),
        ));
    }

    let input = build_input(
        &payload.notification_type,
        payload.title,
        payload.content,
        payload.priority.as_deref(),
        payload.data,
    );
    let notifications = dispatcher.send_bulk(&recipients, input).await;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(notifications)))
}

/// Notification history for a subscriber, newest first; seeds the
/// frontend before the live channel takes over
///
/// GET /api/v1/notifications/{subscriber_id}
pub async fn notification_history(
    store: web::Data<Arc<dyn NotificationStore>>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let subscriber = SubscriberId::new(path.into_inner());
    let limit = query.limit.unwrap_or(config.dispatch.history_limit);

    let notifications = store.history(&subscriber, limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(notifications)))
}

/// GET /api/v1/notifications/{subscriber_id}/unread-count
pub async fn unread_count(
    store: web::Data<Arc<dyn NotificationStore>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let subscriber = SubscriberId::new(path.into_inner());
    let count = store.unread_count(&subscriber).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "subscriberId": subscriber,
        "unreadCount": count,
    }))))
}

/// Mark a notification as read
///
/// PUT /api/v1/notifications/{id}/read
pub async fn mark_as_read(
    store: web::Data<Arc<dyn NotificationStore>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let notification_id = path.into_inner();
    store.mark_read(notification_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "id": notification_id,
        "read": true,
    }))))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("", web::post().to(send_notification))
            .route("/bulk", web::post().to(send_bulk_notification))
            .route("/{subscriber_id}", web::get().to(notification_history))
            .route(
                "/{subscriber_id}/unread-count",
                web::get().to(unread_count),
            )
            .route("/{id}/read", web::put().to(mark_as_read)),
    );
}
