use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        GameStatus, LeaderboardRowEntity, PlayerEntity, RoundEntity, RoundStatus, SubmissionEntity,
    },
    dto::{format_system_time, validation::validate_display_name},
};

/// Payload used to create a brand-new game as its host.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Name shown to other players. Defaults to "Player" when omitted or blank.
    #[serde(default)]
    #[validate(custom(function = validate_display_name))]
    pub display_name: Option<String>,
}

/// Payload used to join an existing game by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    /// Name shown to other players. Defaults to "Player" when omitted or blank.
    #[serde(default)]
    #[validate(custom(function = validate_display_name))]
    pub display_name: Option<String>,
}

/// Payload carrying a player's answer for one round.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Identifier received when joining the game.
    pub player_id: Uuid,
    /// Numeric answer to the round's equation.
    pub answer: f64,
    /// Client-measured answering time in milliseconds, if available.
    #[serde(default)]
    pub time_taken_ms: Option<u32>,
}

/// Credentials returned when a game is created or joined.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameCredentials {
    /// Shareable six character join code.
    pub game_code: String,
    /// Identifier of the newly created player.
    pub player_id: Uuid,
    /// Opaque per-session credential; only ever returned here.
    pub session_token: String,
    /// Whether this player created the game.
    pub is_host: bool,
}

/// Acknowledgement returned when a game is started.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartGameResponse {
    pub started: bool,
}

/// Acknowledgement returned by the poll-driven advance check.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdvanceRoundResponse {
    pub advanced: bool,
}

/// Public projection of a player in the roster.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub display_name: String,
    pub is_host: bool,
}

impl From<PlayerEntity> for PlayerSummary {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            display_name: player.display_name,
            is_host: player.is_host,
        }
    }
}

/// The requesting player's view of the round currently being played.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundView {
    pub round_number: u32,
    pub equation_text: String,
    pub status: RoundStatus,
    pub started_at: Option<String>,
    pub countdown_ends_at: Option<String>,
    /// Whether the requesting player has already answered this round.
    pub has_submitted: bool,
}

impl RoundView {
    /// Build the view for one player from the persisted round.
    pub fn for_player(round: RoundEntity, has_submitted: bool) -> Self {
        Self {
            round_number: round.round_number,
            equation_text: round.equation_text,
            status: round.status,
            started_at: round.started_at.map(format_system_time),
            countdown_ends_at: round.countdown_ends_at.map(format_system_time),
            has_submitted,
        }
    }
}

/// Full game state projection returned to polling clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStateResponse {
    pub game_code: String,
    pub status: GameStatus,
    /// Absent before start and after finish.
    pub current_round: Option<RoundView>,
    pub total_rounds: u32,
    pub completed_rounds: u64,
    pub current_round_number: u32,
    pub players: Vec<PlayerSummary>,
}

/// Outcome of a submission, returned to the answering player.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub correct_answer: f64,
    pub round_number: u32,
    pub score: u32,
    /// Round the player should move to, or `None` once all rounds are answered.
    pub next_round_number: Option<u32>,
}

/// One player's standing on the game leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub player_id: Uuid,
    pub display_name: String,
    pub total_score: i64,
    pub correct_count: i64,
    pub average_time_ms: i64,
}

impl From<LeaderboardRowEntity> for LeaderboardEntry {
    fn from(row: LeaderboardRowEntity) -> Self {
        Self {
            player_id: row.player_id,
            display_name: row.display_name,
            total_score: row.total_score,
            correct_count: row.correct_count,
            average_time_ms: row.average_time_ms,
        }
    }
}

/// Per-round outcome inside a player's game report.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResult {
    pub round_number: u32,
    pub equation_text: String,
    pub correct_answer: f64,
    pub player_answer: f64,
    pub is_correct: bool,
    pub time_taken_ms: Option<u32>,
    pub score: u32,
}

impl From<(SubmissionEntity, RoundEntity)> for RoundResult {
    fn from((submission, round): (SubmissionEntity, RoundEntity)) -> Self {
        Self {
            round_number: round.round_number,
            equation_text: round.equation_text,
            correct_answer: round.correct_answer,
            player_answer: submission.answer,
            is_correct: submission.is_correct,
            time_taken_ms: submission.time_taken_ms,
            score: submission.score,
        }
    }
}

/// A single player's results for a finished game, plus the leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameReport {
    pub game_code: String,
    pub total_rounds: u32,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total_score: i64,
    pub rounds: Vec<RoundResult>,
    pub leaderboard: Vec<LeaderboardEntry>,
}
