use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Math Rush Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::health::metrics,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::start_game,
        crate::routes::game::submit_answer,
        crate::routes::game::advance_round,
        crate::routes::game::game_state,
        crate::routes::game::game_report,
        crate::routes::game::leaderboard,
        crate::routes::events::list_events,
        crate::routes::events::event_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::MetricsSnapshot,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::SubmitAnswerRequest,
            crate::dto::game::GameCredentials,
            crate::dto::game::StartGameResponse,
            crate::dto::game::AdvanceRoundResponse,
            crate::dto::game::GameStateResponse,
            crate::dto::game::RoundView,
            crate::dto::game::PlayerSummary,
            crate::dto::game::SubmitAnswerResponse,
            crate::dto::game::LeaderboardEntry,
            crate::dto::game::RoundResult,
            crate::dto::game::GameReport,
            crate::dto::events::EventRecord,
            crate::dao::models::GameStatus,
            crate::dao::models::RoundStatus,
            crate::dao::models::GameEventType,
        )
    ),
    tags(
        (name = "health", description = "Health and monitoring endpoints"),
        (name = "game", description = "Game lifecycle operations"),
        (name = "events", description = "Per-game lifecycle event log"),
    )
)]
pub struct ApiDoc;
