//! In-memory storage backend.
//!
//! Default store when no database is configured, and the substrate for the
//! coordinator tests. Shard-level locking of the underlying maps provides the
//! same guarantees the relational backend gets from its constraints: the
//! first-correct claim is a single guarded mutation and a second submission
//! for the same (round, player) pair is rejected as a duplicate.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        GameEntity, GameEventEntity, GameStatus, LeaderboardRowEntity, PlayerEntity, RoundEntity,
        RoundStatus, RoundTimestamps, SubmissionEntity,
    },
    storage::{StorageError, StorageResult},
};

/// Process-local [`GameStore`] implementation.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    games: DashMap<Uuid, GameEntity>,
    /// Join code to game id, the uniqueness guard for codes.
    codes: DashMap<String, Uuid>,
    /// Players per game in join order.
    players: DashMap<Uuid, IndexMap<Uuid, PlayerEntity>>,
    rounds: DashMap<(Uuid, u32), RoundEntity>,
    /// Round id back to its (game, number) key.
    round_index: DashMap<Uuid, (Uuid, u32)>,
    /// Keyed by (round, player), the uniqueness guard for submissions.
    submissions: DashMap<(Uuid, Uuid), SubmissionEntity>,
    /// Append-only event log, chronological by construction.
    events: Mutex<Vec<GameEventEntity>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn create_game(&self, game: GameEntity) -> StorageResult<()> {
        match self.codes.entry(game.game_code.clone()) {
            Entry::Occupied(_) => Err(StorageError::duplicate(format!(
                "game code `{}` already exists",
                game.game_code
            ))),
            Entry::Vacant(slot) => {
                slot.insert(game.id);
                self.players.insert(game.id, IndexMap::new());
                self.games.insert(game.id, game);
                Ok(())
            }
        }
    }

    fn find_game_by_code(&self, code: &str) -> Option<GameEntity> {
        let id = *self.codes.get(code)?;
        self.games.get(&id).map(|game| game.value().clone())
    }

    fn with_game_mut(&self, code: &str, apply: impl FnOnce(&mut GameEntity)) {
        let Some(id) = self.codes.get(code).map(|id| *id) else {
            return;
        };
        if let Some(mut game) = self.games.get_mut(&id) {
            apply(&mut game);
        }
    }

    fn players_of(&self, game_id: Uuid) -> Vec<PlayerEntity> {
        self.players
            .get(&game_id)
            .map(|roster| roster.values().cloned().collect())
            .unwrap_or_default()
    }

    fn rounds_of(&self, game_id: Uuid) -> Vec<RoundEntity> {
        let mut rounds: Vec<RoundEntity> = self
            .rounds
            .iter()
            .filter(|entry| entry.game_id == game_id)
            .map(|entry| entry.value().clone())
            .collect();
        rounds.sort_by_key(|round| round.round_number);
        rounds
    }

    fn create_rounds(&self, rounds: Vec<RoundEntity>) -> StorageResult<()> {
        for round in rounds {
            let key = (round.game_id, round.round_number);
            match self.rounds.entry(key) {
                Entry::Occupied(_) => {
                    return Err(StorageError::duplicate(format!(
                        "round {} already exists for game `{}`",
                        round.round_number, round.game_id
                    )));
                }
                Entry::Vacant(slot) => {
                    self.round_index.insert(round.id, key);
                    slot.insert(round);
                }
            }
        }
        Ok(())
    }

    fn with_round_mut(&self, round_id: Uuid, apply: impl FnOnce(&mut RoundEntity)) {
        let Some(key) = self.round_index.get(&round_id).map(|key| *key) else {
            return;
        };
        if let Some(mut round) = self.rounds.get_mut(&key) {
            apply(&mut round);
        }
    }

    fn claim_first_correct(
        &self,
        round_id: Uuid,
        first_correct_at: SystemTime,
        countdown_ends_at: SystemTime,
    ) -> bool {
        let Some(key) = self.round_index.get(&round_id).map(|key| *key) else {
            return false;
        };
        let Some(mut round) = self.rounds.get_mut(&key) else {
            return false;
        };
        // The shard lock held by `get_mut` makes this check-and-set atomic.
        if round.first_correct_at.is_some() {
            return false;
        }
        round.first_correct_at = Some(first_correct_at);
        round.countdown_ends_at = Some(countdown_ends_at);
        round.status = RoundStatus::Countdown;
        true
    }

    fn create_submission(&self, submission: SubmissionEntity) -> StorageResult<()> {
        match self
            .submissions
            .entry((submission.round_id, submission.player_id))
        {
            Entry::Occupied(_) => Err(StorageError::duplicate(format!(
                "submission already exists for round `{}` and player `{}`",
                submission.round_id, submission.player_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(submission);
                Ok(())
            }
        }
    }

    fn leaderboard(&self, game_id: Uuid) -> Vec<LeaderboardRowEntity> {
        let rounds = self.rounds_of(game_id);
        let mut rows: Vec<LeaderboardRowEntity> = self
            .players_of(game_id)
            .into_iter()
            .map(|player| {
                let submissions: Vec<SubmissionEntity> = rounds
                    .iter()
                    .filter_map(|round| {
                        self.submissions
                            .get(&(round.id, player.id))
                            .map(|sub| sub.value().clone())
                    })
                    .collect();
                let total_score = submissions.iter().map(|sub| i64::from(sub.score)).sum();
                let correct: Vec<&SubmissionEntity> =
                    submissions.iter().filter(|sub| sub.is_correct).collect();
                let average_time_ms = if correct.is_empty() {
                    0
                } else {
                    let total: f64 = correct
                        .iter()
                        .map(|sub| f64::from(sub.time_taken_ms.unwrap_or(0)))
                        .sum();
                    (total / correct.len() as f64).round() as i64
                };
                LeaderboardRowEntity {
                    player_id: player.id,
                    display_name: player.display_name,
                    total_score,
                    correct_count: correct.len() as i64,
                    average_time_ms,
                }
            })
            .collect();

        // Stable sort keeps join order for full ties.
        rows.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then(b.correct_count.cmp(&a.correct_count))
                .then(a.average_time_ms.cmp(&b.average_time_ms))
        });
        rows
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create_game(game) })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.find_game_by_code(&code)) })
    }

    fn find_game_with_players(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<(GameEntity, Vec<PlayerEntity>)>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(game) = inner.find_game_by_code(&code) else {
                return Ok(None);
            };
            let players = inner.players_of(game.id);
            Ok(Some((game, players)))
        })
    }

    fn update_game_status(
        &self,
        code: String,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.with_game_mut(&code, |game| game.status = status);
            Ok(())
        })
    }

    fn update_game_current_round(
        &self,
        code: String,
        round_number: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.with_game_mut(&code, |game| game.current_round_number = round_number);
            Ok(())
        })
    }

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .players
                .entry(player.game_id)
                .or_default()
                .insert(player.id, player);
            Ok(())
        })
    }

    fn count_players(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.players_of(game_id).len() as u64) })
    }

    fn create_rounds(&self, rounds: Vec<RoundEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create_rounds(rounds) })
    }

    fn find_round(
        &self,
        game_id: Uuid,
        round_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .rounds
                .get(&(game_id, round_number))
                .map(|round| round.value().clone()))
        })
    }

    fn update_round_status(
        &self,
        round_id: Uuid,
        status: RoundStatus,
        timestamps: RoundTimestamps,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.with_round_mut(round_id, |round| {
                round.status = status;
                if let Some(started_at) = timestamps.started_at {
                    round.started_at = Some(started_at);
                }
                if let Some(ended_at) = timestamps.ended_at {
                    round.ended_at = Some(ended_at);
                }
            });
            Ok(())
        })
    }

    fn claim_first_correct(
        &self,
        round_id: Uuid,
        first_correct_at: SystemTime,
        countdown_ends_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.claim_first_correct(round_id, first_correct_at, countdown_ends_at)) })
    }

    fn count_rounds_with_status(
        &self,
        game_id: Uuid,
        status: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .rounds_of(game_id)
                .iter()
                .filter(|round| round.status == status)
                .count() as u64)
        })
    }

    fn create_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.create_submission(submission) })
    }

    fn find_submission(
        &self,
        round_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .submissions
                .get(&(round_id, player_id))
                .map(|sub| sub.value().clone()))
        })
    }

    fn count_submissions_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .submissions
                .iter()
                .filter(|entry| entry.round_id == round_id)
                .count() as u64)
        })
    }

    fn count_correct_submissions_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .submissions
                .iter()
                .filter(|entry| entry.round_id == round_id && entry.is_correct)
                .count() as u64)
        })
    }

    fn count_submissions_for_player(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let rounds = inner.rounds_of(game_id);
            Ok(rounds
                .iter()
                .filter(|round| inner.submissions.contains_key(&(round.id, player_id)))
                .count() as u64)
        })
    }

    fn submissions_with_rounds(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<(SubmissionEntity, RoundEntity)>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let pairs = inner
                .rounds_of(game_id)
                .into_iter()
                .filter_map(|round| {
                    inner
                        .submissions
                        .get(&(round.id, player_id))
                        .map(|sub| (sub.value().clone(), round.clone()))
                })
                .collect();
            Ok(pairs)
        })
    }

    fn leaderboard(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.leaderboard(game_id)) })
    }

    fn append_event(&self, event: GameEventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
            Ok(())
        })
    }

    fn events_since(
        &self,
        game_id: Uuid,
        after: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEventEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let events = inner
                .events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|event| event.game_id == game_id && event.created_at > after)
                .cloned()
                .collect();
            Ok(events)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn game(code: &str) -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            game_code: code.to_string(),
            status: GameStatus::Waiting,
            current_round_number: 0,
            created_at: SystemTime::now(),
        }
    }

    fn round(game_id: Uuid, number: u32) -> RoundEntity {
        RoundEntity {
            id: Uuid::new_v4(),
            game_id,
            round_number: number,
            equation_text: "2 + 2".into(),
            correct_answer: 4.0,
            status: RoundStatus::Pending,
            started_at: None,
            first_correct_at: None,
            countdown_ends_at: None,
            ended_at: None,
        }
    }

    fn player(game_id: Uuid, name: &str) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            game_id,
            display_name: name.to_string(),
            session_token: "token".into(),
            is_host: false,
            joined_at: SystemTime::now(),
        }
    }

    fn submission(round_id: Uuid, player_id: Uuid, score: u32, correct: bool) -> SubmissionEntity {
        SubmissionEntity {
            id: Uuid::new_v4(),
            round_id,
            player_id,
            answer: 4.0,
            is_correct: correct,
            score,
            time_taken_ms: Some(1000),
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_game_code_is_rejected() {
        let store = MemoryGameStore::new();
        store.create_game(game("ABC123")).await.unwrap();
        let err = store.create_game(game("ABC123")).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn first_correct_claim_is_won_exactly_once() {
        let store = MemoryGameStore::new();
        let g = game("ABC123");
        let game_id = g.id;
        store.create_game(g).await.unwrap();
        let r = round(game_id, 1);
        let round_id = r.id;
        store.create_rounds(vec![r]).await.unwrap();

        let now = SystemTime::now();
        let deadline = now + Duration::from_millis(5_000);
        let first = store.claim_first_correct(round_id, now, deadline).await.unwrap();
        let second = store.claim_first_correct(round_id, now, deadline).await.unwrap();
        assert!(first);
        assert!(!second);

        let stored = store.find_round(game_id, 1).await.unwrap().unwrap();
        assert_eq!(stored.status, RoundStatus::Countdown);
        assert_eq!(stored.first_correct_at, Some(now));
        assert_eq!(stored.countdown_ends_at, Some(deadline));
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected() {
        let store = MemoryGameStore::new();
        let round_id = Uuid::new_v4();
        let player_id = Uuid::new_v4();
        store
            .create_submission(submission(round_id, player_id, 100, true))
            .await
            .unwrap();
        let err = store
            .create_submission(submission(round_id, player_id, 100, true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn duplicate_round_batch_is_rejected() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        store.create_rounds(vec![round(game_id, 1)]).await.unwrap();
        let err = store.create_rounds(vec![round(game_id, 1)]).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn leaderboard_sorts_by_score_then_correct_then_time() {
        let store = MemoryGameStore::new();
        let g = game("ABC123");
        let game_id = g.id;
        store.create_game(g).await.unwrap();

        let alice = player(game_id, "Alice");
        let bob = player(game_id, "Bob");
        store.create_player(alice.clone()).await.unwrap();
        store.create_player(bob.clone()).await.unwrap();

        let r1 = round(game_id, 1);
        let r2 = round(game_id, 2);
        store.create_rounds(vec![r1.clone(), r2.clone()]).await.unwrap();

        store
            .create_submission(submission(r1.id, alice.id, 150, true))
            .await
            .unwrap();
        store
            .create_submission(submission(r1.id, bob.id, 0, false))
            .await
            .unwrap();
        store
            .create_submission(submission(r2.id, bob.id, 100, true))
            .await
            .unwrap();

        let rows = store.leaderboard(game_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_name, "Alice");
        assert_eq!(rows[0].total_score, 150);
        assert_eq!(rows[0].correct_count, 1);
        assert_eq!(rows[1].display_name, "Bob");
        assert_eq!(rows[1].total_score, 100);
    }

    #[tokio::test]
    async fn events_since_filters_strictly_after() {
        let store = MemoryGameStore::new();
        let game_id = Uuid::new_v4();
        let base = SystemTime::now();
        for offset in [0u64, 1, 2] {
            store
                .append_event(GameEventEntity {
                    id: Uuid::new_v4(),
                    game_id,
                    event_type: crate::dao::models::GameEventType::PlayerJoined,
                    payload: serde_json::json!({}),
                    created_at: base + Duration::from_millis(offset),
                })
                .await
                .unwrap();
        }

        let events = store.events_since(game_id, base).await.unwrap();
        assert_eq!(events.len(), 2);
        let all = store
            .events_since(game_id, base - Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }
}
