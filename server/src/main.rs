use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pagecast_server::config::Config;
use pagecast_server::document::{LocalDocumentStore, document_routes, uploads_routes};
use pagecast_server::server::{AppState, WsConfig, ws_handler};
use pagecast_server::session::session_routes;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Ensure a directory exists, creating it if necessary.
/// Returns true if directory exists and is empty.
fn ensure_directory(path: &Path, name: &str) -> std::io::Result<bool> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created {} directory: {:?}", name, path);
        Ok(true) // newly created, so empty
    } else if path.is_dir() {
        let is_empty = path.read_dir()?.next().is_none();
        Ok(is_empty)
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} path {:?} exists but is not a directory", name, path),
        ))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    websocket: &'static str,
    uptime_seconds: u64,
}

async fn health() -> Json<HealthResponse> {
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        websocket: "ready", // WebSocket is always ready if server is running
        uptime_seconds: uptime,
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    /// Server uptime in seconds
    uptime_seconds: u64,
    /// Server version
    version: &'static str,
    /// Number of live sessions
    active_sessions: usize,
    /// Connections currently holding a room membership
    total_connections: usize,
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let (sessions, connections) = state.get_stats().await;

    Json(MetricsResponse {
        uptime_seconds: uptime,
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: sessions,
        total_connections: connections,
    })
}

/// Prometheus metrics handle for exposing metrics in Prometheus format
static PROMETHEUS_HANDLE: std::sync::OnceLock<PrometheusHandle> = std::sync::OnceLock::new();

/// Initialize the Prometheus metrics recorder
fn setup_prometheus_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Endpoint to expose metrics in Prometheus format
async fn prometheus_metrics() -> impl IntoResponse {
    let handle = PROMETHEUS_HANDLE
        .get()
        .expect("Prometheus handle not initialized");
    handle.render()
}

/// Update gauge metrics for sessions and connections (called periodically)
async fn update_gauge_metrics(state: &AppState) {
    let (sessions, connections) = state.get_stats().await;

    metrics::gauge!("pagecast_sessions_active").set(sessions as f64);
    metrics::gauge!("pagecast_ws_connections_active").set(connections as f64);

    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);
    metrics::gauge!("pagecast_uptime_seconds").set(uptime as f64);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Record server start time
    START_TIME.set(Instant::now()).ok();

    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    let prometheus_handle = setup_prometheus_metrics();
    PROMETHEUS_HANDLE.set(prometheus_handle).ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagecast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Loaded configuration: host={}, port={}",
        config.host, config.port
    );
    if let Some(ref base_url) = config.public_base_url {
        info!("Public base URL: {}", base_url);
    }

    // Ensure the upload directory exists (auto-create for dev-friendly startup)
    let upload_dir = &config.document.upload_dir;
    match ensure_directory(upload_dir, "uploads") {
        Ok(is_empty) => {
            if !is_empty {
                info!("Upload directory {:?} has existing documents", upload_dir);
            }
        }
        Err(e) => {
            warn!("Failed to create upload directory {:?}: {}", upload_dir, e);
        }
    }

    let documents = Arc::new(LocalDocumentStore::new(upload_dir.clone())?);

    let app_state = AppState::new(documents)
        .with_max_upload_size(config.document.max_upload_size)
        .with_ws_config(WsConfig {
            ping_interval: config.ws.ping_interval,
            ping_timeout: config.ws.ping_timeout,
            ..WsConfig::default()
        });

    // Periodic update of gauge metrics (every 5 seconds)
    let metrics_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            update_gauge_metrics(&metrics_state).await;
        }
    });

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router. Session and document APIs share AppState.
    let api = session_routes().merge(document_routes(config.document.max_upload_size));

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .route("/ws", get(ws_handler))
        .nest("/api", api)
        .merge(uploads_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Add static file serving if configured (for unified Docker image)
    let app = if let Some(ref static_dir) = config.static_files.dir {
        if static_dir.exists() {
            info!("Serving static files from: {:?}", static_dir);

            // ServeDir with SPA fallback: serve index.html for any unmatched routes
            let index_path = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_path));

            // Add compression layer for static files (gzip)
            let static_service = ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .service(serve_dir);

            app.fallback_service(static_service)
        } else {
            warn!(
                "Static files directory not found: {:?} - static file serving disabled",
                static_dir
            );
            app
        }
    } else {
        info!("Static file serving disabled (STATIC_FILES_DIR not set)");
        app
    };

    // Start the server. Connect info supplies the origin identity captured
    // at session creation and join time.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("PageCast server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
