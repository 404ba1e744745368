mod config;
mod relay;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use flock_api::auth::{AppState, AppStateInner};
use flock_backend::Backend;
use flock_gateway::{Dispatcher, RealtimeBridge, TokenVerifier, connection};
use flock_media::MediaClient;

use crate::config::Config;
use crate::relay::Relay;

/// Largest accepted request body; compose uploads go through here.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    verifier: TokenVerifier,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flock=debug,flock_api=debug,flock_gateway=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let backend = Backend::new(config.backend.clone())?;
    let media = MediaClient::new(config.media.clone())?;
    let verifier = TokenVerifier::new(&config.jwt_secret);
    let dispatcher = Dispatcher::new();

    match backend.check_connection().await {
        Ok(()) => info!("Connected to backend at {}", backend.url()),
        Err(e) => warn!("Backend unreachable at {}: {}", backend.url(), e),
    }

    if config.realtime {
        let bridge = RealtimeBridge::new(
            backend.url(),
            backend.anon_key(),
            Relay::new(backend.clone(), dispatcher.clone()),
        );
        tokio::spawn(bridge.run());
    } else {
        info!("Realtime relay disabled");
    }

    let app_state: AppState = Arc::new(AppStateInner {
        backend,
        media,
        verifier: verifier.clone(),
        profile_bucket: config.profile_bucket.clone(),
    });

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(ServerState {
            dispatcher,
            verifier,
        });

    let app = flock_api::router(app_state)
        .merge(ws_route)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Flock server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Flock server stopped");
    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.verifier)
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
