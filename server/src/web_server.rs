use std::future::Future;
use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use common::id_generator::generate_player_id;
use common::{log, PlayerId};

use crate::broadcaster::Broadcaster;
use crate::message_handler::MessageHandler;
use crate::poll_handler;
use crate::server_config::ServerConfig;
use crate::ws_handler::handle_websocket;

#[derive(Clone)]
pub struct WebServerState {
    pub handler: MessageHandler,
    pub broadcaster: Broadcaster,
}

pub fn build_router(state: WebServerState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(poll_handler::api_routes(config.enable_pull));

    if config.enable_push {
        app = app.route("/ws", get(ws_upgrade_handler));
    }

    if let Some(path) = &config.static_files_path {
        app = app.nest_service("/ui", ServeDir::new(path));
    }

    app.fallback(poll_handler::unknown_route)
        .layer(cors)
        .with_state(state)
}

pub async fn run_web_server(
    state: WebServerState,
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    log!(
        "Web server listening on {} (push: {}, pull: {})",
        config.bind_address, config.enable_push, config.enable_pull
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsParams {
    player_id: Option<String>,
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<WebServerState>,
) -> impl IntoResponse {
    let player_id = params
        .player_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(PlayerId::new)
        .unwrap_or_else(generate_player_id);

    ws.on_upgrade(move |socket| handle_websocket(socket, state, player_id))
}
