use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Lobby is open; players can still join.
    Waiting,
    /// Rounds are being played.
    InProgress,
    /// All ten rounds have ended.
    Finished,
}

/// Lifecycle status of a single round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    /// Created at game start, not yet reached.
    Pending,
    /// Accepting submissions, nobody has answered correctly yet.
    Active,
    /// First correct answer landed; remaining players race the countdown.
    Countdown,
    /// Closed. Terminal per round.
    Ended,
}

impl RoundStatus {
    /// Whether submissions may still be recorded against the round.
    pub fn accepts_submissions(self) -> bool {
        matches!(self, RoundStatus::Active | RoundStatus::Countdown)
    }
}

/// Error returned when a persisted status string does not match any variant.
#[derive(Debug, Error)]
#[error("unknown status `{value}`")]
pub struct ParseStatusError {
    /// The unrecognised stored value.
    pub value: String,
}

impl GameStatus {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Waiting => "WAITING",
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Finished => "FINISHED",
        }
    }

    /// Parse the storage representation back into a status.
    pub fn parse(value: &str) -> Result<Self, ParseStatusError> {
        match value {
            "WAITING" => Ok(GameStatus::Waiting),
            "IN_PROGRESS" => Ok(GameStatus::InProgress),
            "FINISHED" => Ok(GameStatus::Finished),
            other => Err(ParseStatusError {
                value: other.to_string(),
            }),
        }
    }
}

impl RoundStatus {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Pending => "PENDING",
            RoundStatus::Active => "ACTIVE",
            RoundStatus::Countdown => "COUNTDOWN",
            RoundStatus::Ended => "ENDED",
        }
    }

    /// Parse the storage representation back into a status.
    pub fn parse(value: &str) -> Result<Self, ParseStatusError> {
        match value {
            "PENDING" => Ok(RoundStatus::Pending),
            "ACTIVE" => Ok(RoundStatus::Active),
            "COUNTDOWN" => Ok(RoundStatus::Countdown),
            "ENDED" => Ok(RoundStatus::Ended),
            other => Err(ParseStatusError {
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of lifecycle event appended to a game's event log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEventType {
    PlayerJoined,
    GameStarted,
    RoundStarted,
    AnswerSubmitted,
    FirstCorrect,
    CountdownStarted,
    RoundEnded,
    GameEnded,
    /// Reserved for incremental score pushes between rounds; never emitted today.
    LeaderboardUpdated,
}

impl GameEventType {
    /// Stable storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            GameEventType::PlayerJoined => "PLAYER_JOINED",
            GameEventType::GameStarted => "GAME_STARTED",
            GameEventType::RoundStarted => "ROUND_STARTED",
            GameEventType::AnswerSubmitted => "ANSWER_SUBMITTED",
            GameEventType::FirstCorrect => "FIRST_CORRECT",
            GameEventType::CountdownStarted => "COUNTDOWN_STARTED",
            GameEventType::RoundEnded => "ROUND_ENDED",
            GameEventType::GameEnded => "GAME_ENDED",
            GameEventType::LeaderboardUpdated => "LEADERBOARD_UPDATED",
        }
    }

    /// Parse the storage representation back into an event type.
    pub fn parse(value: &str) -> Result<Self, ParseStatusError> {
        match value {
            "PLAYER_JOINED" => Ok(GameEventType::PlayerJoined),
            "GAME_STARTED" => Ok(GameEventType::GameStarted),
            "ROUND_STARTED" => Ok(GameEventType::RoundStarted),
            "ANSWER_SUBMITTED" => Ok(GameEventType::AnswerSubmitted),
            "FIRST_CORRECT" => Ok(GameEventType::FirstCorrect),
            "COUNTDOWN_STARTED" => Ok(GameEventType::CountdownStarted),
            "ROUND_ENDED" => Ok(GameEventType::RoundEnded),
            "GAME_ENDED" => Ok(GameEventType::GameEnded),
            "LEADERBOARD_UPDATED" => Ok(GameEventType::LeaderboardUpdated),
            other => Err(ParseStatusError {
                value: other.to_string(),
            }),
        }
    }
}

/// Game aggregate persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Human-shareable six character join code, unique across all games.
    pub game_code: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Number of the round currently being played (0 before start).
    pub current_round_number: u32,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Participant of a single game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Primary key of the player.
    pub id: Uuid,
    /// Game this player belongs to.
    pub game_id: Uuid,
    /// Display name shown to other players.
    pub display_name: String,
    /// Opaque per-session credential, never exposed after the join response.
    pub session_token: String,
    /// Whether this player created the game.
    pub is_host: bool,
    /// Join timestamp, used for stable roster ordering.
    pub joined_at: SystemTime,
}

/// One of the ten equations of a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundEntity {
    /// Primary key of the round.
    pub id: Uuid,
    /// Game this round belongs to.
    pub game_id: Uuid,
    /// Position within the game, 1 through 10.
    pub round_number: u32,
    /// Equation presented to players.
    pub equation_text: String,
    /// Expected numeric answer.
    pub correct_answer: f64,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// Set when the round becomes active.
    pub started_at: Option<SystemTime>,
    /// Set at most once, by the atomic first-correct claim.
    pub first_correct_at: Option<SystemTime>,
    /// Deadline after which no further submissions are accepted.
    pub countdown_ends_at: Option<SystemTime>,
    /// Set when the round closes.
    pub ended_at: Option<SystemTime>,
}

/// A player's answer to a round. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionEntity {
    /// Primary key of the submission.
    pub id: Uuid,
    /// Round the answer was given for.
    pub round_id: Uuid,
    /// Player who answered.
    pub player_id: Uuid,
    /// Numeric answer as given.
    pub answer: f64,
    /// Whether the answer matched within tolerance.
    pub is_correct: bool,
    /// Points awarded for this submission.
    pub score: u32,
    /// Client-reported answering time, when provided.
    pub time_taken_ms: Option<u32>,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Lifecycle event appended to a game's event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEventEntity {
    /// Primary key of the event.
    pub id: Uuid,
    /// Game the event belongs to.
    pub game_id: Uuid,
    /// Kind of event.
    pub event_type: GameEventType,
    /// Free-form JSON payload.
    pub payload: serde_json::Value,
    /// Append timestamp, used for range reads.
    pub created_at: SystemTime,
}

/// Aggregated standing of one player within a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRowEntity {
    /// Player the row describes.
    pub player_id: Uuid,
    /// Display name shown on the board.
    pub display_name: String,
    /// Sum of all submission scores.
    pub total_score: i64,
    /// Number of correct submissions.
    pub correct_count: i64,
    /// Rounded average answering time across correct submissions (0 when none).
    pub average_time_ms: i64,
}

/// Optional timestamps applied together with a round status update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoundTimestamps {
    /// New activation timestamp, if any.
    pub started_at: Option<SystemTime>,
    /// New closing timestamp, if any.
    pub ended_at: Option<SystemTime>,
}
