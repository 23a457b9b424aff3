//! Application startup and lifecycle management.

use crate::config::{StorageBackend, SubscriptionConfig};
use crate::handlers;
use crate::services::{
    connect_with_retry, MemoryBackend, PgBackend, SubscriptionBackend, SubscriptionStore,
};
use axum::{routing::get, Router};
use service_core::error::AppError;
use service_core::middleware::tracing::{request_id_middleware, RequestId};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SubscriptionConfig>,
    pub store: SubscriptionStore,
}

/// Build the HTTP router over an already constructed state.
pub fn build_router(state: AppState) -> Router {
    let timeout = state.config.http_timeout();

    let routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/subscriptions",
            get(handlers::subscriptions::list_subscriptions)
                .post(handlers::subscriptions::create_subscription),
        )
        .route(
            "/subscriptions/sum",
            get(handlers::subscriptions::sum_subscriptions),
        )
        .route(
            "/subscription/:uuid",
            get(handlers::subscriptions::get_subscription)
                .put(handlers::subscriptions::update_subscription)
                .delete(handlers::subscriptions::delete_subscription),
        )
        .with_state(state);

    with_http_layers(routes, timeout)
}

/// Wrap routes with the request timeout, the request span and request-id
/// propagation.
///
/// The request id is assigned outermost so the span and every handler see it.
/// Requests exceeding `timeout` are answered with 408.
fn with_http_layers(routes: Router, timeout: Duration) -> Router {
    routes
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
}

/// Select and prepare the configured storage backend.
async fn build_backend(
    config: &SubscriptionConfig,
) -> Result<Arc<dyn SubscriptionBackend>, AppError> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
        StorageBackend::Postgres => {
            let pool = connect_with_retry(&config.database).await?;
            let backend = PgBackend::new(pool);
            backend.run_migrations().await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// Port 0 binds a random free port, which tests rely on.
    pub async fn build(config: SubscriptionConfig) -> Result<Self, AppError> {
        let backend = build_backend(&config).await?;
        let store = SubscriptionStore::new(backend);

        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let state = AppState {
            config: Arc::new(config),
            store,
        };
        let router = build_router(state);

        tracing::info!(port, "Subscription service listening");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use service_core::middleware::tracing::REQUEST_ID_HEADER;
    use tower::ServiceExt;

    fn layered(timeout: Duration) -> Router {
        let routes = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .route(
                "/echo",
                get(|headers: HeaderMap| async move {
                    headers
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            );
        with_http_layers(routes, timeout)
    }

    #[tokio::test]
    async fn slow_requests_time_out() {
        let response = layered(Duration::from_millis(20))
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn request_id_is_assigned_before_inner_layers() {
        let response = layered(Duration::from_secs(5))
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        assert!(!header.is_empty());
        assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), header);
    }
}
