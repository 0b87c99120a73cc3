//! Server lifecycle: middleware stack, serving and graceful shutdown

use crate::{HttpConfig, HttpError, HttpResult};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Wrap `router` in the standard layer stack
pub fn apply_middleware(router: Router, config: &HttpConfig) -> Router {
    router
        .layer(CompressionLayer::new())
        .layer(cors_layer(config))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_request_size))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(config: &HttpConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Serve until `shutdown` resolves, then give in-flight requests
/// `shutdown_timeout` to finish before dropping them.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    config: &HttpConfig,
    shutdown: F,
) -> HttpResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| HttpError::startup(format!("Listener has no local address: {}", e)))?;
    info!("Server listening on {}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut handle = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut handle => return flatten(result),
        _ = shutdown => {}
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(config.shutdown_timeout(), &mut handle).await {
        Ok(result) => flatten(result),
        Err(_) => {
            warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "In-flight requests did not finish in time, forcing shutdown"
            );
            handle.abort();
            Ok(())
        }
    }
}

fn flatten(result: Result<std::io::Result<()>, tokio::task::JoinError>) -> HttpResult<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(HttpError::internal(format!("Server error: {}", e))),
        Err(e) => Err(HttpError::internal(format!("Server task failed: {}", e))),
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down gracefully");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum_test::TestServer;

    fn app(config: &HttpConfig) -> Router {
        let router = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route("/upload", post(|body: String| async move { body.len().to_string() }));
        apply_middleware(router, config)
    }

    #[tokio::test]
    async fn test_request_id_is_set() {
        let server = TestServer::new(app(&HttpConfig::default())).unwrap();
        let response = server.get("/ping").await;
        response.assert_status_ok();
        assert!(response.headers().get("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = HttpConfig {
            max_request_size: 16,
            ..Default::default()
        };
        let server = TestServer::new(app(&config)).unwrap();
        server.post("/upload").text("small").await.assert_status_ok();

        let response = server.post("/upload").text("x".repeat(64)).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = HttpConfig::default();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let router = Router::new().route("/ping", get(|| async { "pong" }));

        let task = tokio::spawn(async move {
            serve(listener, router, &config, async move {
                let _ = rx.await;
            })
            .await
        });
        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
