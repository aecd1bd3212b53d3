//! HTTP polling transport and the stateless helper endpoints.
//!
//! Every response uses the `{success, data?, code?, message?}` envelope. Room
//! mutations made here are also pushed to occupants connected over `/ws`.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use common::games::SessionRng;
use common::games::tictactoe::{get_best_move, Board, Difficulty};
use common::id_generator::generate_player_id;
use common::protocol::ApiResponse;
use common::room::{RoomSummary, RoomView};
use common::{log, ErrorCode, GameError, PlayerId, RoomId};

use crate::history::{GameRecord, NewGameRecord};
use crate::message_handler::{parse_position, Command, CommandResult};
use crate::web_server::WebServerState;

#[derive(Debug)]
pub struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(error: GameError) -> Self {
        Self(error)
    }
}

pub fn status_for(error: &GameError) -> StatusCode {
    match error {
        GameError::RoomNotFound => StatusCode::NOT_FOUND,
        GameError::RoomFull
        | GameError::PositionOccupied
        | GameError::GameAlreadyFinished
        | GameError::NotYourTurn => StatusCode::CONFLICT,
        GameError::PlayerNotInRoom => StatusCode::FORBIDDEN,
        GameError::UnknownAction(_) | GameError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
        GameError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(ApiResponse::<()>::err(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    #[serde(default)]
    pub player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub player_id: String,
    pub position: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateParams {
    #[serde(default)]
    pub last_update: i64,
}

#[derive(Debug, Deserialize)]
pub struct AiMoveRequest {
    pub board: Board,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    pub timestamp: i64,
}

/// Identity handed back to a polling client so it can keep acting in the room.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSession {
    pub player_id: PlayerId,
    pub room: RoomView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub changed: bool,
    pub last_update: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomView>,
}

#[derive(Debug, Serialize)]
pub struct AiMoveResponse {
    pub position: Option<usize>,
    pub difficulty: Difficulty,
}

pub fn api_routes(enable_pull: bool) -> Router<WebServerState> {
    let rooms = if enable_pull {
        get(active_rooms).post(create_room)
    } else {
        get(active_rooms)
    };

    let mut router = Router::new()
        .route("/api/ping", get(ping))
        .route("/api/rooms", rooms)
        .route("/api/rooms/{room_id}", get(room_info))
        .route("/api/ai/move", post(ai_move))
        .route("/api/history", get(list_history).post(save_history).delete(clear_history))
        .route("/api/history/{id}", get(get_history));

    if enable_pull {
        router = router
            .route("/api/rooms/{room_id}/join", post(join_room))
            .route("/api/rooms/{room_id}/moves", post(make_move))
            .route("/api/rooms/{room_id}/new-game", post(new_game))
            .route("/api/rooms/{room_id}/leave", post(leave_room))
            .route("/api/rooms/{room_id}/state", get(room_state));
    }

    router
}

pub async fn unknown_route(method: Method, uri: Uri) -> Response {
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        code: Some(ErrorCode::UnknownAction),
        message: Some(format!("Unknown action: {} {}", method, uri.path())),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GameError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GameError::malformed(rejection.body_text()))
}

/// Create and join may omit the body entirely; the caller then gets a fresh identity.
fn requester(payload: Result<Json<PlayerRequest>, JsonRejection>) -> Result<PlayerId, GameError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => PlayerRequest::default(),
        Err(rejection) => return Err(GameError::malformed(rejection.body_text())),
    };

    Ok(request
        .player_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(PlayerId::new)
        .unwrap_or_else(generate_player_id))
}

async fn run_command(state: &WebServerState, player_id: &PlayerId, command: Command) -> Result<RoomView, GameError> {
    let result = state.handler.execute(player_id, command).await?;
    let room = result.room().cloned().ok_or(GameError::Internal)?;

    if let Some(broadcast) = result.into_push_plan(player_id).broadcast {
        state.broadcaster.deliver(broadcast).await;
    }

    Ok(room)
}

async fn ping(State(state): State<WebServerState>) -> ApiResult<PingResponse> {
    match state.handler.execute(&PlayerId::from("http"), Command::Ping).await? {
        CommandResult::Pong { timestamp } => ok(PingResponse { timestamp }),
        _ => Err(GameError::Internal.into()),
    }
}

async fn active_rooms(State(state): State<WebServerState>) -> ApiResult<Vec<RoomSummary>> {
    ok(state.handler.rooms().list_active_rooms().await)
}

async fn room_info(State(state): State<WebServerState>, Path(room_id): Path<String>) -> ApiResult<RoomView> {
    let room_id = RoomId::parse(&room_id)?;
    ok(state.handler.rooms().get_room(&room_id).await?)
}

async fn create_room(
    State(state): State<WebServerState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<RoomSession> {
    let player_id = requester(payload)?;
    let room = run_command(&state, &player_id, Command::CreateRoom).await?;
    ok(RoomSession { player_id, room })
}

async fn join_room(
    State(state): State<WebServerState>,
    Path(room_id): Path<String>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<RoomSession> {
    let room_id = RoomId::parse(&room_id)?;
    let player_id = requester(payload)?;
    let room = run_command(&state, &player_id, Command::JoinRoom { room_id }).await?;
    ok(RoomSession { player_id, room })
}

async fn make_move(
    State(state): State<WebServerState>,
    Path(room_id): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<RoomView> {
    let room_id = RoomId::parse(&room_id)?;
    let request = json_body(payload)?;
    let position = parse_position(request.position)?;
    let player_id = PlayerId::new(request.player_id);

    ok(run_command(&state, &player_id, Command::MakeMove { room_id, position }).await?)
}

async fn new_game(
    State(state): State<WebServerState>,
    Path(room_id): Path<String>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<RoomView> {
    let room_id = RoomId::parse(&room_id)?;
    let player_id = requester(payload)?;
    ok(run_command(&state, &player_id, Command::NewGame { room_id }).await?)
}

async fn leave_room(
    State(state): State<WebServerState>,
    Path(room_id): Path<String>,
    payload: Result<Json<LeaveRequest>, JsonRejection>,
) -> ApiResult<RoomView> {
    let room_id = RoomId::parse(&room_id)?;
    let request = json_body(payload)?;
    let player_id = PlayerId::new(request.player_id);

    let broadcast = state.handler.handle_leave(&room_id, &player_id).await?;
    let room = broadcast.room.clone();
    state.broadcaster.deliver(broadcast).await;

    ok(room)
}

async fn room_state(
    State(state): State<WebServerState>,
    Path(room_id): Path<String>,
    params: Result<Query<StateParams>, QueryRejection>,
) -> ApiResult<PollResponse> {
    let room_id = RoomId::parse(&room_id)?;
    let Query(params) = params.map_err(|rejection| GameError::malformed(rejection.body_text()))?;

    let response = match state.handler.rooms().room_state_since(&room_id, params.last_update).await? {
        Some(room) => PollResponse {
            changed: true,
            last_update: room.last_activity,
            room: Some(room),
        },
        None => PollResponse {
            changed: false,
            last_update: params.last_update,
            room: None,
        },
    };

    ok(response)
}

async fn ai_move(payload: Result<Json<AiMoveRequest>, JsonRejection>) -> ApiResult<AiMoveResponse> {
    let request = json_body(payload)?;
    let difficulty = request
        .difficulty
        .as_deref()
        .map(Difficulty::parse_or_default)
        .unwrap_or_default();

    let mut rng = SessionRng::from_random();
    let position = get_best_move(&request.board, difficulty, &mut rng);

    ok(AiMoveResponse { position, difficulty })
}

async fn list_history(State(state): State<WebServerState>) -> ApiResult<Vec<GameRecord>> {
    ok(state.handler.history().list().await)
}

async fn save_history(
    State(state): State<WebServerState>,
    payload: Result<Json<NewGameRecord>, JsonRejection>,
) -> ApiResult<GameRecord> {
    let record = json_body(payload)?;
    let saved = state.handler.history().save(record).await;
    log!("Saved game #{} ({:?})", saved.id, saved.outcome);
    ok(saved)
}

async fn get_history(State(state): State<WebServerState>, Path(id): Path<String>) -> ApiResult<Option<GameRecord>> {
    let id: u64 = id
        .parse()
        .map_err(|_| GameError::malformed(format!("invalid game id '{}'", id)))?;
    ok(state.handler.history().get(id).await)
}

async fn clear_history(State(state): State<WebServerState>) -> ApiResult<bool> {
    state.handler.history().clear().await;
    log!("Game history cleared");
    ok(true)
}
