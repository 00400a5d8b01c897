use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use weave_api::AppStateInner;
use weave_collab::LogNotifier;
use weave_db::Database;
use weave_gateway::{Dispatcher, Fanout, HttpPublisher, Publisher, RoomMessage};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weave=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("WEAVE_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: WEAVE_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       This must match the identity service's signing secret.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let db_path: PathBuf = std::env::var("WEAVE_DB_PATH")
        .unwrap_or_else(|_| "weave.db".into())
        .into();
    let host = std::env::var("WEAVE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("WEAVE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let socket_server_url = std::env::var("WEAVE_SOCKET_SERVER_URL")
        .unwrap_or_else(|_| "http://localhost:4000".into());
    let broadcast_timeout = Duration::from_millis(
        std::env::var("WEAVE_BROADCAST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000),
    );
    let public_url =
        std::env::var("WEAVE_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".into());

    // Init database
    let db = Arc::new(Database::open(&db_path)?);

    // Room events go to the in-process dispatcher and, when configured, the socket server
    let dispatcher = Dispatcher::new();
    tokio::spawn(trace_room_events(dispatcher.subscribe()));
    let mut publisher = Fanout::new().with(Arc::new(dispatcher));
    if socket_server_url.trim().is_empty() {
        info!("WEAVE_SOCKET_SERVER_URL is empty, room events stay in-process");
    } else {
        publisher = publisher.with(Arc::new(HttpPublisher::spawn(&socket_server_url, broadcast_timeout)?));
    }
    let publisher: Arc<dyn Publisher> = Arc::new(publisher);

    let state = Arc::new(AppStateInner::new(
        db,
        publisher,
        Arc::new(LogNotifier),
        &public_url,
        jwt_secret,
    ));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let app = weave_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Weave server listening on {}", addr);
    info!("Database: {}", db_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Mirror every room event into the debug log.
async fn trace_room_events(mut rx: broadcast::Receiver<RoomMessage>) {
    loop {
        match rx.recv().await {
            Ok(msg) => debug!("[{}] {}", msg.room_id, msg.json),
            Err(RecvError::Lagged(n)) => warn!("Room event trace lagged by {} events", n),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
