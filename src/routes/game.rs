use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::game::{
        AdvanceRoundResponse, CreateGameRequest, GameCredentials, GameReport, GameStateResponse,
        JoinGameRequest, LeaderboardEntry, StartGameResponse, SubmitAnswerRequest,
        SubmitAnswerResponse,
    },
    error::AppError,
    routes::into_app_error,
    services::game_service::{self, SubmitAnswerInput},
    state::SharedState,
};

/// Routes handling the game lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{code}/join", post(join_game))
        .route("/games/{code}/start", post(start_game))
        .route(
            "/games/{code}/rounds/{round_number}/submit",
            post(submit_answer),
        )
        .route("/games/{code}/advance-round", post(advance_round))
        .route("/games/{code}/state", get(game_state))
        .route("/games/{code}/report", get(game_report))
        .route("/games/{code}/leaderboard", get(leaderboard))
}

/// Query parameters identifying the requesting player.
#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    /// Identifier received when joining the game.
    pub player_id: Uuid,
}

/// Create a fresh game and return the host's credentials.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameCredentials)
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<GameCredentials>, AppError> {
    payload.validate()?;
    let credentials = game_service::create_game(&state, payload.display_name)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(credentials))
}

/// Join a waiting game by code.
#[utoipa::path(
    post,
    path = "/games/{code}/join",
    tag = "game",
    params(("code" = String, Path, description = "Shareable game code")),
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined the game", body = GameCredentials),
        (status = 404, description = "No game matches the code"),
        (status = 409, description = "Game already started")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<GameCredentials>, AppError> {
    payload.validate()?;
    let credentials = game_service::join_game(&state, &code, payload.display_name)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(credentials))
}

/// Generate the rounds and begin play.
#[utoipa::path(
    post,
    path = "/games/{code}/start",
    tag = "game",
    params(("code" = String, Path, description = "Shareable game code")),
    responses(
        (status = 200, description = "Game started", body = StartGameResponse),
        (status = 404, description = "No game matches the code"),
        (status = 409, description = "Game already started")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<StartGameResponse>, AppError> {
    game_service::start_game(&state, &code)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(StartGameResponse { started: true }))
}

/// Submit a player's answer for one round.
#[utoipa::path(
    post,
    path = "/games/{code}/rounds/{round_number}/submit",
    tag = "game",
    params(
        ("code" = String, Path, description = "Shareable game code"),
        ("round_number" = u32, Path, description = "Round being answered")
    ),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 404, description = "Game or round not found"),
        (status = 409, description = "Round closed or already answered")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path((code, round_number)): Path<(String, u32)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let result = game_service::submit_answer(
        &state,
        SubmitAnswerInput {
            game_code: code,
            round_number,
            player_id: payload.player_id,
            answer: payload.answer,
            time_taken_ms: payload.time_taken_ms,
        },
    )
    .await
    .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(result))
}

/// Poll-driven check that closes the current round once its conditions are met.
#[utoipa::path(
    post,
    path = "/games/{code}/advance-round",
    tag = "game",
    params(("code" = String, Path, description = "Shareable game code")),
    responses(
        (status = 200, description = "Advance check performed", body = AdvanceRoundResponse)
    )
)]
pub async fn advance_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<AdvanceRoundResponse>, AppError> {
    game_service::advance_round_if_needed(&state, &code)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(AdvanceRoundResponse { advanced: true }))
}

/// Current game state from one player's perspective.
#[utoipa::path(
    get,
    path = "/games/{code}/state",
    tag = "game",
    params(
        ("code" = String, Path, description = "Shareable game code"),
        ("player_id" = Uuid, Query, description = "Requesting player")
    ),
    responses(
        (status = 200, description = "Current game state", body = GameStateResponse),
        (status = 404, description = "No game matches the code")
    )
)]
pub async fn game_state(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<GameStateResponse>, AppError> {
    let snapshot = game_service::get_game_state(&state, &code, query.player_id)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(snapshot))
}

/// Per-round results for one player plus the final leaderboard.
#[utoipa::path(
    get,
    path = "/games/{code}/report",
    tag = "game",
    params(
        ("code" = String, Path, description = "Shareable game code"),
        ("player_id" = Uuid, Query, description = "Requesting player")
    ),
    responses(
        (status = 200, description = "Game report", body = GameReport),
        (status = 404, description = "No game matches the code")
    )
)]
pub async fn game_report(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<GameReport>, AppError> {
    let report = game_service::get_game_report(&state, &code, query.player_id)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(report))
}

/// Current standings for a game.
#[utoipa::path(
    get,
    path = "/games/{code}/leaderboard",
    tag = "game",
    params(("code" = String, Path, description = "Shareable game code")),
    responses(
        (status = 200, description = "Leaderboard entries", body = [LeaderboardEntry]),
        (status = 404, description = "No game matches the code")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries = game_service::get_leaderboard(&state, &code)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(entries))
}
