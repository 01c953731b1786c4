//! Round lifecycle coordination.
//!
//! Every externally triggered action enters here, reads the persisted state,
//! applies the transition rules, writes back atomically where it matters and
//! appends lifecycle events. Progression is driven entirely by client calls:
//! there is no timer thread, the countdown deadline is a plain wall-clock
//! comparison re-checked by [`advance_round_if_needed`] on every poll.

use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{
            GameEntity, GameEventType, GameStatus, PlayerEntity, RoundEntity, RoundStatus,
            RoundTimestamps, SubmissionEntity,
        },
        storage::StorageError,
    },
    dto::{
        format_system_time,
        game::{
            GameCredentials, GameReport, GameStateResponse, LeaderboardEntry, RoundResult,
            RoundView, SubmitAnswerResponse,
        },
    },
    equations,
    error::ServiceError,
    services::{event_service, scoring_service},
    state::SharedState,
};

/// Fixed number of rounds per game.
pub const ROUNDS_PER_GAME: u32 = 10;
/// Absolute tolerance when comparing a submitted answer to the expected one.
const ANSWER_TOLERANCE: f64 = 0.01;
/// Grace period granted to remaining players after the first correct answer.
const COUNTDOWN_DURATION: Duration = Duration::from_millis(5_000);

const GAME_CODE_LENGTH: usize = 6;
const GAME_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// How often game creation retries a colliding code before giving up.
const GAME_CODE_ATTEMPTS: usize = 5;

const DEFAULT_DISPLAY_NAME: &str = "Player";

/// Inputs of a single answer submission.
#[derive(Debug, Clone)]
pub struct SubmitAnswerInput {
    pub game_code: String,
    pub round_number: u32,
    pub player_id: Uuid,
    pub answer: f64,
    pub time_taken_ms: Option<u32>,
}

/// Create a new game and its host player.
pub async fn create_game(
    state: &SharedState,
    display_name: Option<String>,
) -> Result<GameCredentials, ServiceError> {
    let store = state.require_game_store().await?;
    let display_name = resolve_display_name(display_name);

    let game = create_game_with_unique_code(store.as_ref()).await?;
    let player = new_player(game.id, display_name.clone(), true);
    store.create_player(player.clone()).await?;

    event_service::emit(
        state,
        store.as_ref(),
        game.id,
        GameEventType::PlayerJoined,
        serde_json::json!({ "player_id": player.id, "display_name": display_name }),
    )
    .await?;
    state.metrics().record_game_created();

    Ok(GameCredentials {
        game_code: game.game_code,
        player_id: player.id,
        session_token: player.session_token,
        is_host: true,
    })
}

/// Join an existing game that has not started yet.
pub async fn join_game(
    state: &SharedState,
    game_code: &str,
    display_name: Option<String>,
) -> Result<GameCredentials, ServiceError> {
    let store = state.require_game_store().await?;
    let display_name = resolve_display_name(display_name);

    let game = find_game(store.as_ref(), game_code).await?;
    if game.status != GameStatus::Waiting {
        return Err(ServiceError::InvalidState("game already started".into()));
    }

    let player = new_player(game.id, display_name.clone(), false);
    store.create_player(player.clone()).await?;

    event_service::emit(
        state,
        store.as_ref(),
        game.id,
        GameEventType::PlayerJoined,
        serde_json::json!({ "player_id": player.id, "display_name": display_name }),
    )
    .await?;

    Ok(GameCredentials {
        game_code: game.game_code,
        player_id: player.id,
        session_token: player.session_token,
        is_host: false,
    })
}

/// Generate all rounds, flip the game to in-progress, and activate round 1.
pub async fn start_game(state: &SharedState, game_code: &str) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;

    let game = find_game(store.as_ref(), game_code).await?;
    if game.status != GameStatus::Waiting {
        return Err(ServiceError::InvalidState("game already started".into()));
    }

    let mut rounds = Vec::with_capacity(ROUNDS_PER_GAME as usize);
    for round_number in 1..=ROUNDS_PER_GAME {
        let difficulty = equations::difficulty_for_round(round_number);
        let equation = equations::generate(state.equations(), difficulty).await?;
        rounds.push(RoundEntity {
            id: Uuid::new_v4(),
            game_id: game.id,
            round_number,
            equation_text: equation.text,
            correct_answer: equation.answer,
            status: RoundStatus::Pending,
            started_at: None,
            first_correct_at: None,
            countdown_ends_at: None,
            ended_at: None,
        });
    }

    // A racing second start loses against the (game, round_number) constraint.
    match store.create_rounds(rounds).await {
        Ok(()) => {}
        Err(StorageError::Duplicate { .. }) => {
            return Err(ServiceError::InvalidState("game already started".into()));
        }
        Err(err) => return Err(err.into()),
    }

    store
        .update_game_status(game_code.to_string(), GameStatus::InProgress)
        .await?;
    event_service::emit(
        state,
        store.as_ref(),
        game.id,
        GameEventType::GameStarted,
        serde_json::json!({}),
    )
    .await?;

    start_round(state, store.as_ref(), game_code, game.id, 1).await
}

/// Activate a round and point the game at it.
async fn start_round(
    state: &SharedState,
    store: &dyn GameStore,
    game_code: &str,
    game_id: Uuid,
    round_number: u32,
) -> Result<(), ServiceError> {
    let Some(round) = store.find_round(game_id, round_number).await? else {
        warn!(game_code, round_number, "round to activate is missing");
        return Ok(());
    };

    store
        .update_round_status(
            round.id,
            RoundStatus::Active,
            RoundTimestamps {
                started_at: Some(SystemTime::now()),
                ended_at: None,
            },
        )
        .await?;
    store
        .update_game_current_round(game_code.to_string(), round_number)
        .await?;

    event_service::emit(
        state,
        store,
        game_id,
        GameEventType::RoundStarted,
        serde_json::json!({
            "round_number": round_number,
            "equation_text": round.equation_text,
        }),
    )
    .await?;

    Ok(())
}

/// Record one player's answer, the centerpiece of the round lifecycle.
pub async fn submit_answer(
    state: &SharedState,
    input: SubmitAnswerInput,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let game = find_game(store.as_ref(), &input.game_code).await?;
    if game.status != GameStatus::InProgress {
        return Err(ServiceError::InvalidState("game is not in progress".into()));
    }

    let Some(round) = store.find_round(game.id, input.round_number).await? else {
        return Err(ServiceError::NotFound(format!(
            "round {} not found",
            input.round_number
        )));
    };

    if !round.status.accepts_submissions() {
        return Err(ServiceError::InvalidState(
            "round is not accepting submissions".into(),
        ));
    }

    if let Some(deadline) = round.countdown_ends_at {
        if SystemTime::now() >= deadline {
            // Close the round for everyone even though this caller is rejected.
            advance_round_if_needed(state, &input.game_code).await?;
            return Err(ServiceError::InvalidState(
                "round countdown has expired".into(),
            ));
        }
    }

    // Fast-path duplicate check; the store's uniqueness constraint below is
    // the actual guard under races.
    if store
        .find_submission(round.id, input.player_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::InvalidState(
            "already submitted for this round".into(),
        ));
    }

    let is_correct = (input.answer - round.correct_answer).abs() <= ANSWER_TOLERANCE;

    let mut is_first_correct = false;
    if is_correct && round.first_correct_at.is_none() {
        let now = SystemTime::now();
        let countdown_ends_at = now + COUNTDOWN_DURATION;
        is_first_correct = store
            .claim_first_correct(round.id, now, countdown_ends_at)
            .await?;
        if is_first_correct {
            event_service::emit(
                state,
                store.as_ref(),
                game.id,
                GameEventType::FirstCorrect,
                serde_json::json!({
                    "round_number": input.round_number,
                    "player_id": input.player_id,
                }),
            )
            .await?;
            event_service::emit(
                state,
                store.as_ref(),
                game.id,
                GameEventType::CountdownStarted,
                serde_json::json!({
                    "round_number": input.round_number,
                    "countdown_ends_at": format_system_time(countdown_ends_at),
                }),
            )
            .await?;
        }
    }

    let score = scoring_service::calculate_score(is_correct, is_first_correct, input.time_taken_ms);

    let submission = SubmissionEntity {
        id: Uuid::new_v4(),
        round_id: round.id,
        player_id: input.player_id,
        answer: input.answer,
        is_correct,
        score,
        time_taken_ms: input.time_taken_ms,
        created_at: SystemTime::now(),
    };
    match store.create_submission(submission).await {
        Ok(()) => {}
        Err(StorageError::Duplicate { .. }) => {
            return Err(ServiceError::InvalidState(
                "already submitted for this round".into(),
            ));
        }
        Err(err) => return Err(err.into()),
    }
    state.metrics().record_submission(is_correct);

    event_service::emit(
        state,
        store.as_ref(),
        game.id,
        GameEventType::AnswerSubmitted,
        serde_json::json!({
            "round_number": input.round_number,
            "player_id": input.player_id,
        }),
    )
    .await?;

    // Fast path: once everyone has answered the round ends immediately,
    // countdown or not.
    let player_count = store.count_players(game.id).await?;
    let submission_count = store.count_submissions_for_round(round.id).await?;
    if submission_count >= player_count {
        end_round(
            state,
            store.as_ref(),
            &input.game_code,
            game.id,
            input.round_number,
        )
        .await?;
    }

    let completed = store
        .count_submissions_for_player(game.id, input.player_id)
        .await?;
    let next_round_number =
        (completed < u64::from(ROUNDS_PER_GAME)).then_some(game.current_round_number);

    Ok(SubmitAnswerResponse {
        is_correct,
        correct_answer: round.correct_answer,
        round_number: round.round_number,
        score,
        next_round_number,
    })
}

/// Poll-driven convergence check: close the current round when its countdown
/// has expired or everyone has answered. Safe to call any number of times.
pub async fn advance_round_if_needed(
    state: &SharedState,
    game_code: &str,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;

    let Some(game) = store.find_game_by_code(game_code.to_string()).await? else {
        return Ok(());
    };
    if game.status != GameStatus::InProgress || game.current_round_number == 0 {
        return Ok(());
    }

    let Some(round) = store.find_round(game.id, game.current_round_number).await? else {
        return Ok(());
    };
    if round.status == RoundStatus::Ended {
        return Ok(());
    }

    if round.status == RoundStatus::Countdown {
        if let Some(deadline) = round.countdown_ends_at {
            if SystemTime::now() >= deadline {
                end_round(
                    state,
                    store.as_ref(),
                    game_code,
                    game.id,
                    game.current_round_number,
                )
                .await?;
            }
        }
        return Ok(());
    }

    if round.status == RoundStatus::Active {
        let player_count = store.count_players(game.id).await?;
        let submission_count = store.count_submissions_for_round(round.id).await?;
        if submission_count >= player_count {
            let correct_count = store.count_correct_submissions_for_round(round.id).await?;
            if correct_count > 0 && round.first_correct_at.is_none() {
                // Everyone answered and someone was correct, yet no countdown
                // was recorded. The counts and the round come from separate
                // reads, so treat it as complete and close out.
                end_round(
                    state,
                    store.as_ref(),
                    game_code,
                    game.id,
                    game.current_round_number,
                )
                .await?;
            } else if correct_count == 0 {
                // Nobody got it right; nothing to wait for.
                end_round(
                    state,
                    store.as_ref(),
                    game_code,
                    game.id,
                    game.current_round_number,
                )
                .await?;
            } else if let Some(deadline) = round.countdown_ends_at {
                if SystemTime::now() >= deadline {
                    end_round(
                        state,
                        store.as_ref(),
                        game_code,
                        game.id,
                        game.current_round_number,
                    )
                    .await?;
                }
            }
        }
    }

    Ok(())
}

/// Close a round, then finish the game or activate the next round. Idempotent.
async fn end_round(
    state: &SharedState,
    store: &dyn GameStore,
    game_code: &str,
    game_id: Uuid,
    round_number: u32,
) -> Result<(), ServiceError> {
    let Some(round) = store.find_round(game_id, round_number).await? else {
        return Ok(());
    };
    if round.status == RoundStatus::Ended {
        return Ok(());
    }

    let ended_at = SystemTime::now();
    store
        .update_round_status(
            round.id,
            RoundStatus::Ended,
            RoundTimestamps {
                started_at: None,
                ended_at: Some(ended_at),
            },
        )
        .await?;

    if let Some(started_at) = round.started_at {
        if let Ok(duration) = ended_at.duration_since(started_at) {
            state
                .metrics()
                .record_round_completed(duration.as_millis() as u64);
        }
    }

    event_service::emit(
        state,
        store,
        game_id,
        GameEventType::RoundEnded,
        serde_json::json!({ "round_number": round_number }),
    )
    .await?;

    if round_number >= ROUNDS_PER_GAME {
        store
            .update_game_status(game_code.to_string(), GameStatus::Finished)
            .await?;
        state.metrics().record_game_finished();
        event_service::emit(
            state,
            store,
            game_id,
            GameEventType::GameEnded,
            serde_json::json!({}),
        )
        .await?;
    } else {
        start_round(state, store, game_code, game_id, round_number + 1).await?;
    }

    Ok(())
}

/// Current game projection for one polling player.
pub async fn get_game_state(
    state: &SharedState,
    game_code: &str,
    player_id: Uuid,
) -> Result<GameStateResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let Some((game, players)) = store.find_game_with_players(game_code.to_string()).await? else {
        return Err(ServiceError::NotFound(format!(
            "game `{game_code}` not found"
        )));
    };

    // Piggyback the convergence check on the poll, then serve the fresh state.
    if game.status == GameStatus::InProgress && game.current_round_number > 0 {
        advance_round_if_needed(state, game_code).await?;
        if let Some((updated_game, updated_players)) =
            store.find_game_with_players(game_code.to_string()).await?
        {
            return build_game_state(store.as_ref(), updated_game, updated_players, player_id)
                .await;
        }
    }

    build_game_state(store.as_ref(), game, players, player_id).await
}

async fn build_game_state(
    store: &dyn GameStore,
    game: GameEntity,
    players: Vec<PlayerEntity>,
    player_id: Uuid,
) -> Result<GameStateResponse, ServiceError> {
    let completed_rounds = store
        .count_rounds_with_status(game.id, RoundStatus::Ended)
        .await?;

    let mut current_round = None;
    if game.status == GameStatus::InProgress && game.current_round_number > 0 {
        if let Some(round) = store.find_round(game.id, game.current_round_number).await? {
            let has_submitted = store.find_submission(round.id, player_id).await?.is_some();
            current_round = Some(RoundView::for_player(round, has_submitted));
        }
    }

    Ok(GameStateResponse {
        game_code: game.game_code,
        status: game.status,
        current_round,
        total_rounds: ROUNDS_PER_GAME,
        completed_rounds,
        current_round_number: game.current_round_number,
        players: players.into_iter().map(Into::into).collect(),
    })
}

/// A player's per-round results plus the game leaderboard.
pub async fn get_game_report(
    state: &SharedState,
    game_code: &str,
    player_id: Uuid,
) -> Result<GameReport, ServiceError> {
    let store = state.require_game_store().await?;
    let game = find_game(store.as_ref(), game_code).await?;

    let submissions = store.submissions_with_rounds(game.id, player_id).await?;
    let leaderboard: Vec<LeaderboardEntry> = store
        .leaderboard(game.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let rounds: Vec<RoundResult> = submissions.into_iter().map(Into::into).collect();
    let total_score = rounds.iter().map(|round| i64::from(round.score)).sum();
    let correct_count = rounds.iter().filter(|round| round.is_correct).count();

    Ok(GameReport {
        game_code: game.game_code,
        total_rounds: ROUNDS_PER_GAME,
        correct_count,
        incorrect_count: rounds.len() - correct_count,
        total_score,
        rounds,
        leaderboard,
    })
}

/// Current standings for a game.
pub async fn get_leaderboard(
    state: &SharedState,
    game_code: &str,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let store = state.require_game_store().await?;
    let game = find_game(store.as_ref(), game_code).await?;
    Ok(store
        .leaderboard(game.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

async fn find_game(store: &dyn GameStore, game_code: &str) -> Result<GameEntity, ServiceError> {
    store
        .find_game_by_code(game_code.to_string())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_code}` not found")))
}

/// Create the game row, retrying code collisions a bounded number of times.
async fn create_game_with_unique_code(store: &dyn GameStore) -> Result<GameEntity, ServiceError> {
    for attempt in 1..GAME_CODE_ATTEMPTS {
        let candidate = new_game_entity();
        match store.create_game(candidate.clone()).await {
            Ok(()) => return Ok(candidate),
            Err(StorageError::Duplicate { .. }) => {
                debug!(attempt, "game code collision; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let candidate = new_game_entity();
    store.create_game(candidate.clone()).await?;
    Ok(candidate)
}

fn new_game_entity() -> GameEntity {
    GameEntity {
        id: Uuid::new_v4(),
        game_code: generate_game_code(),
        status: GameStatus::Waiting,
        current_round_number: 0,
        created_at: SystemTime::now(),
    }
}

fn new_player(game_id: Uuid, display_name: String, is_host: bool) -> PlayerEntity {
    PlayerEntity {
        id: Uuid::new_v4(),
        game_id,
        display_name,
        session_token: generate_session_token(),
        is_host,
        joined_at: SystemTime::now(),
    }
}

fn resolve_display_name(display_name: Option<String>) -> String {
    match display_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => DEFAULT_DISPLAY_NAME.to_string(),
    }
}

fn generate_game_code() -> String {
    let mut rng = rand::rng();
    (0..GAME_CODE_LENGTH)
        .map(|_| GAME_CODE_ALPHABET[rng.random_range(0..GAME_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Two v4 UUIDs worth of randomness rendered as 64 hex characters.
fn generate_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{
        config::{AppConfig, EvaluatorConfig},
        dao::game_store::memory::MemoryGameStore,
        services::event_service,
        state::AppState,
    };

    use super::*;

    async fn test_state() -> SharedState {
        let config = AppConfig {
            evaluator: EvaluatorConfig {
                remote_enabled: false,
                ..EvaluatorConfig::default()
            },
        };
        let state = AppState::new(&config).expect("build state");
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        state
    }

    async fn store_of(state: &SharedState) -> Arc<dyn GameStore> {
        state.require_game_store().await.expect("store installed")
    }

    async fn game_of(state: &SharedState, code: &str) -> GameEntity {
        store_of(state)
            .await
            .find_game_by_code(code.to_string())
            .await
            .expect("load game")
            .expect("game exists")
    }

    async fn round_of(state: &SharedState, code: &str, round_number: u32) -> RoundEntity {
        let game = game_of(state, code).await;
        store_of(state)
            .await
            .find_round(game.id, round_number)
            .await
            .expect("load round")
            .expect("round exists")
    }

    async fn count_events(state: &SharedState, code: &str, event_type: GameEventType) -> usize {
        event_service::events_since(state, code, None)
            .await
            .expect("load events")
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    fn answer_input(
        code: &str,
        round_number: u32,
        player_id: Uuid,
        answer: f64,
        time_taken_ms: Option<u32>,
    ) -> SubmitAnswerInput {
        SubmitAnswerInput {
            game_code: code.to_string(),
            round_number,
            player_id,
            answer,
            time_taken_ms,
        }
    }

    fn conflict_message(err: ServiceError) -> String {
        match err {
            ServiceError::InvalidState(message) => message,
            other => panic!("expected a conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_game_returns_host_credentials() {
        let state = test_state().await;
        let credentials = create_game(&state, Some("Alice".into())).await.unwrap();

        assert_eq!(credentials.game_code.len(), 6);
        assert!(
            credentials
                .game_code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
        assert_eq!(credentials.session_token.len(), 64);
        assert!(credentials.is_host);

        let snapshot = get_game_state(&state, &credentials.game_code, credentials.player_id)
            .await
            .unwrap();
        assert_eq!(snapshot.status, GameStatus::Waiting);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].display_name, "Alice");
        assert!(snapshot.players[0].is_host);
        assert!(snapshot.current_round.is_none());

        assert_eq!(
            count_events(&state, &credentials.game_code, GameEventType::PlayerJoined).await,
            1
        );
    }

    #[tokio::test]
    async fn blank_display_names_fall_back_to_default() {
        let state = test_state().await;
        let credentials = create_game(&state, Some("   ".into())).await.unwrap();
        let snapshot = get_game_state(&state, &credentials.game_code, credentials.player_id)
            .await
            .unwrap();
        assert_eq!(snapshot.players[0].display_name, "Player");
    }

    #[tokio::test]
    async fn join_unknown_game_fails_not_found() {
        let state = test_state().await;
        let err = join_game(&state, "NOPE42", Some("Bob".into()))
            .await
            .unwrap_err();
        match err {
            ServiceError::NotFound(message) => assert!(message.contains("not found")),
            other => panic!("expected not-found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_after_start_fails_with_conflict() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let err = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap_err();
        assert!(conflict_message(err).contains("already started"));
    }

    #[tokio::test]
    async fn start_twice_conflicts_and_round_count_stays_ten() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let err = start_game(&state, &host.game_code).await.unwrap_err();
        assert!(conflict_message(err).contains("already started"));

        let game = game_of(&state, &host.game_code).await;
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.current_round_number, 1);

        let store = store_of(&state).await;
        for round_number in 1..=ROUNDS_PER_GAME {
            let round = store
                .find_round(game.id, round_number)
                .await
                .unwrap()
                .unwrap_or_else(|| panic!("round {round_number} missing"));
            if round_number == 1 {
                assert_eq!(round.status, RoundStatus::Active);
                assert!(round.started_at.is_some());
            } else {
                assert_eq!(round.status, RoundStatus::Pending);
            }
        }
        assert!(
            store
                .find_round(game.id, ROUNDS_PER_GAME + 1)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn first_correct_answer_starts_the_countdown() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        let response = submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer, Some(1_000)),
        )
        .await
        .unwrap();

        assert!(response.is_correct);
        // 100 base + 25 first-correct + 45 speed.
        assert_eq!(response.score, 170);
        assert_eq!(response.next_round_number, Some(1));

        let round = round_of(&state, &host.game_code, 1).await;
        assert_eq!(round.status, RoundStatus::Countdown);
        assert!(round.first_correct_at.is_some());
        assert!(round.countdown_ends_at.is_some());

        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::FirstCorrect).await,
            1
        );
        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::CountdownStarted).await,
            1
        );

        let host_view = get_game_state(&state, &host.game_code, host.player_id)
            .await
            .unwrap();
        let guest_view = get_game_state(&state, &host.game_code, guest.player_id)
            .await
            .unwrap();
        assert!(host_view.current_round.unwrap().has_submitted);
        assert!(!guest_view.current_round.unwrap().has_submitted);
    }

    #[tokio::test]
    async fn answers_within_tolerance_count_as_correct() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        let close = submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer + 0.009, None),
        )
        .await
        .unwrap();
        let off = submit_answer(
            &state,
            answer_input(&host.game_code, 1, guest.player_id, answer + 0.02, None),
        )
        .await
        .unwrap();

        assert!(close.is_correct);
        assert!(!off.is_correct);
        assert_eq!(off.score, 0);
    }

    #[tokio::test]
    async fn second_submission_for_the_same_round_is_rejected() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let _guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer, None),
        )
        .await
        .unwrap();

        let err = submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer, None),
        )
        .await
        .unwrap_err();
        assert!(conflict_message(err).contains("already submitted"));

        let store = store_of(&state).await;
        let round = round_of(&state, &host.game_code, 1).await;
        assert_eq!(store.count_submissions_for_round(round.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn round_ends_once_everyone_has_answered() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer, None),
        )
        .await
        .unwrap();
        submit_answer(
            &state,
            answer_input(&host.game_code, 1, guest.player_id, answer + 100.0, None),
        )
        .await
        .unwrap();

        assert_eq!(
            round_of(&state, &host.game_code, 1).await.status,
            RoundStatus::Ended
        );
        assert_eq!(
            round_of(&state, &host.game_code, 2).await.status,
            RoundStatus::Active
        );
        assert_eq!(game_of(&state, &host.game_code).await.current_round_number, 2);
        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::RoundEnded).await,
            1
        );
        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::RoundStarted).await,
            2
        );
    }

    #[tokio::test]
    async fn solo_round_with_wrong_answer_ends_immediately() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        let response = submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer + 50.0, None),
        )
        .await
        .unwrap();

        assert!(!response.is_correct);
        assert_eq!(response.next_round_number, Some(1));
        assert_eq!(
            round_of(&state, &host.game_code, 1).await.status,
            RoundStatus::Ended
        );
        assert_eq!(
            round_of(&state, &host.game_code, 2).await.status,
            RoundStatus::Active
        );
    }

    #[tokio::test]
    async fn submitting_to_an_ended_round_is_rejected() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer, None),
        )
        .await
        .unwrap();

        // Round 1 ended through the everyone-answered fast path.
        let err = submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer, None),
        )
        .await
        .unwrap_err();
        assert!(conflict_message(err).contains("not accepting submissions"));
    }

    #[tokio::test]
    async fn concurrent_correct_answers_claim_first_exactly_once() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        let (first, second) = tokio::join!(
            submit_answer(
                &state,
                answer_input(&host.game_code, 1, host.player_id, answer, None),
            ),
            submit_answer(
                &state,
                answer_input(&host.game_code, 1, guest.player_id, answer, None),
            ),
        );

        let first = first.unwrap();
        let second = second.unwrap();
        assert!(first.is_correct && second.is_correct);

        // Exactly one of the two earned the first-correct bonus.
        let mut scores = [first.score, second.score];
        scores.sort_unstable();
        assert_eq!(scores, [100, 125]);

        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::FirstCorrect).await,
            1
        );
        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::CountdownStarted).await,
            1
        );

        let store = store_of(&state).await;
        let round = round_of(&state, &host.game_code, 1).await;
        assert_eq!(store.count_submissions_for_round(round.id).await.unwrap(), 2);
        assert!(round.first_correct_at.is_some());
    }

    #[tokio::test]
    async fn expired_countdown_rejects_the_caller_and_closes_the_round() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        // Backdate a first-correct claim so the countdown is already over.
        let store = store_of(&state).await;
        let round = round_of(&state, &host.game_code, 1).await;
        let now = SystemTime::now();
        assert!(
            store
                .claim_first_correct(
                    round.id,
                    now - Duration::from_millis(6_000),
                    now - Duration::from_millis(1_000),
                )
                .await
                .unwrap()
        );

        let answer = round.correct_answer;
        let err = submit_answer(
            &state,
            answer_input(&host.game_code, 1, guest.player_id, answer, None),
        )
        .await
        .unwrap_err();
        assert!(conflict_message(err).contains("countdown has expired"));

        // The rejected call still pushed the lifecycle forward.
        assert_eq!(
            round_of(&state, &host.game_code, 1).await.status,
            RoundStatus::Ended
        );
        assert_eq!(
            round_of(&state, &host.game_code, 2).await.status,
            RoundStatus::Active
        );
    }

    #[tokio::test]
    async fn advance_is_a_noop_until_conditions_are_met() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();

        // Before start there is nothing to advance.
        advance_round_if_needed(&state, &host.game_code).await.unwrap();
        assert_eq!(game_of(&state, &host.game_code).await.status, GameStatus::Waiting);

        let _guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        // One of two players answered: the round stays open for the other.
        let answer = round_of(&state, &host.game_code, 1).await.correct_answer;
        submit_answer(
            &state,
            answer_input(&host.game_code, 1, host.player_id, answer + 3.0, None),
        )
        .await
        .unwrap();
        advance_round_if_needed(&state, &host.game_code).await.unwrap();
        advance_round_if_needed(&state, &host.game_code).await.unwrap();
        assert_eq!(
            round_of(&state, &host.game_code, 1).await.status,
            RoundStatus::Active
        );

        // Unknown codes are silently ignored.
        advance_round_if_needed(&state, "ZZZZZZ").await.unwrap();
    }

    #[tokio::test]
    async fn full_game_finishes_and_ranks_players() {
        let state = test_state().await;
        let host = create_game(&state, Some("Alice".into())).await.unwrap();
        let guest = join_game(&state, &host.game_code, Some("Bob".into()))
            .await
            .unwrap();
        start_game(&state, &host.game_code).await.unwrap();

        for round_number in 1..=ROUNDS_PER_GAME {
            let answer = round_of(&state, &host.game_code, round_number)
                .await
                .correct_answer;
            let alice = submit_answer(
                &state,
                answer_input(
                    &host.game_code,
                    round_number,
                    host.player_id,
                    answer,
                    Some(1_000),
                ),
            )
            .await
            .unwrap();
            assert!(alice.is_correct);
            assert_eq!(alice.score, 170);

            let bob = submit_answer(
                &state,
                answer_input(
                    &host.game_code,
                    round_number,
                    guest.player_id,
                    answer + 100.0,
                    Some(2_000),
                ),
            )
            .await
            .unwrap();
            assert!(!bob.is_correct);
            assert_eq!(bob.score, 0);

            assert_eq!(
                round_of(&state, &host.game_code, round_number).await.status,
                RoundStatus::Ended
            );
        }

        let game = game_of(&state, &host.game_code).await;
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.current_round_number, ROUNDS_PER_GAME);

        // A finished game never exposes a current round.
        let snapshot = get_game_state(&state, &host.game_code, host.player_id)
            .await
            .unwrap();
        assert_eq!(snapshot.status, GameStatus::Finished);
        assert!(snapshot.current_round.is_none());
        assert_eq!(snapshot.completed_rounds, u64::from(ROUNDS_PER_GAME));

        let leaderboard = get_leaderboard(&state, &host.game_code).await.unwrap();
        assert_eq!(leaderboard.len(), 2);
        assert_eq!(leaderboard[0].display_name, "Alice");
        assert_eq!(leaderboard[0].total_score, 1_700);
        assert_eq!(leaderboard[0].correct_count, 10);
        assert_eq!(leaderboard[0].average_time_ms, 1_000);
        assert_eq!(leaderboard[1].display_name, "Bob");
        assert_eq!(leaderboard[1].total_score, 0);
        assert_eq!(leaderboard[1].correct_count, 0);

        let report = get_game_report(&state, &host.game_code, host.player_id)
            .await
            .unwrap();
        assert_eq!(report.correct_count, 10);
        assert_eq!(report.incorrect_count, 0);
        assert_eq!(report.total_score, 1_700);
        assert_eq!(report.rounds.len(), 10);

        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::GameEnded).await,
            1
        );
        assert_eq!(
            count_events(&state, &host.game_code, GameEventType::RoundEnded).await,
            10
        );

        // Submissions against a finished game are turned away.
        let err = submit_answer(
            &state,
            answer_input(&host.game_code, ROUNDS_PER_GAME, host.player_id, 1.0, None),
        )
        .await
        .unwrap_err();
        assert!(conflict_message(err).contains("not in progress"));

        let metrics = state.metrics().snapshot();
        assert_eq!(metrics.games_created, 1);
        assert_eq!(metrics.games_finished, 1);
        assert_eq!(metrics.rounds_completed, 10);
        assert_eq!(metrics.submissions_received, 20);
        assert_eq!(metrics.correct_submissions, 10);
        assert_eq!(metrics.incorrect_submissions, 10);
    }
}
