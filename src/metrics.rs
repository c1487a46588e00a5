use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "placement_notification_http_requests_total",
            "Total HTTP requests handled by the placement notification service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create placement_notification_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register placement_notification_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "placement_notification_http_request_duration_seconds",
            "HTTP request latency for the placement notification service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path", "status"],
    )
    .expect("failed to create placement_notification_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register placement_notification_http_request_duration_seconds");
    histogram
});

static NOTIFICATIONS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "placement_notification_dispatched_total",
            "Notifications dispatched, by type and outcome (delivered or queued)",
        ),
        &["type", "outcome"],
    )
    .expect("failed to create placement_notification_dispatched_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register placement_notification_dispatched_total");
    counter
});

static PENDING_EVICTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "placement_notification_pending_evictions_total",
        "Pending-queue records evicted oldest-first at the per-subscriber cap",
    )
    .expect("failed to create placement_notification_pending_evictions_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register placement_notification_pending_evictions_total");
    counter
});

static CONNECTED_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "placement_notification_connected_subscribers",
        "Subscribers with a registered live channel",
    )
    .expect("failed to create placement_notification_connected_subscribers");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register placement_notification_connected_subscribers");
    gauge
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub fn observe_dispatch(notification_type: &str, outcome: &str) {
    NOTIFICATIONS_DISPATCHED_TOTAL
        .with_label_values(&[notification_type, outcome])
        .inc();
}

pub fn observe_pending_eviction() {
    PENDING_EVICTIONS_TOTAL.inc();
}

pub fn set_connected_subscribers(count: i64) {
    CONNECTED_SUBSCRIBERS.set(count);
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(response) => {
                    observe_http_request(&method, &path, response.status().as_u16(), elapsed);
                }
                Err(_) => {
                    observe_http_request(&method, &path, 500, elapsed);
                }
            }
            result
        })
    }
}
