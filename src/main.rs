use actix_web::{middleware, web, App, HttpServer};
use placement_notification_service::{
    handlers::{register_notifications, register_websocket},
    metrics, Config, ConnectionRegistry, InMemoryNotificationStore, NotificationDispatcher,
    NotificationStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting placement notification service");

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    let store: Arc<dyn NotificationStore> = Arc::new(InMemoryNotificationStore::new());
    let registry = ConnectionRegistry::new();
    let dispatcher = Arc::new(NotificationDispatcher::with_queue_cap(
        registry.clone(),
        store.clone(),
        config.dispatch.max_pending_per_subscriber,
    ));
    tracing::info!(
        max_pending = config.dispatch.max_pending_per_subscriber,
        "connection registry and dispatcher initialized"
    );

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("Starting HTTP server on {}", addr);

    let app_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(store.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .route(
                "/",
                web::get().to(|| async { "Placement Notification Service v1.0" }),
            )
            .configure(|cfg| {
                register_notifications(cfg);
                register_websocket(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await?;

    Ok(())
}
