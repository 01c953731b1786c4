pub mod memory;
#[cfg(feature = "postgres-store")]
pub mod postgres;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        GameEntity, GameEventEntity, GameStatus, LeaderboardRowEntity, PlayerEntity, RoundEntity,
        RoundStatus, RoundTimestamps, SubmissionEntity,
    },
    storage::StorageResult,
};

/// Abstraction over the persistence layer for games, players, rounds,
/// submissions and the per-game event log.
///
/// Two operations carry atomicity guarantees the coordinator depends on:
/// [`GameStore::claim_first_correct`] must be a single conditional write (only
/// one concurrent caller may win the claim), and [`GameStore::create_submission`]
/// must reject a second submission for the same (round, player) pair with
/// [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate).
pub trait GameStore: Send + Sync {
    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game_by_code(&self, code: String)
    -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn find_game_with_players(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<(GameEntity, Vec<PlayerEntity>)>>>;
    fn update_game_status(
        &self,
        code: String,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn update_game_current_round(
        &self,
        code: String,
        round_number: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn count_players(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<u64>>;

    fn create_rounds(&self, rounds: Vec<RoundEntity>) -> BoxFuture<'static, StorageResult<()>>;
    fn find_round(
        &self,
        game_id: Uuid,
        round_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    fn update_round_status(
        &self,
        round_id: Uuid,
        status: RoundStatus,
        timestamps: RoundTimestamps,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Record the first correct answer, flip the round to countdown, and set
    /// the countdown deadline, but only if no first correct answer has been
    /// recorded yet. Returns whether this caller won the claim.
    fn claim_first_correct(
        &self,
        round_id: Uuid,
        first_correct_at: SystemTime,
        countdown_ends_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn count_rounds_with_status(
        &self,
        game_id: Uuid,
        status: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<u64>>;

    fn create_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_submission(
        &self,
        round_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>>;
    fn count_submissions_for_round(&self, round_id: Uuid)
    -> BoxFuture<'static, StorageResult<u64>>;
    fn count_correct_submissions_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    fn count_submissions_for_player(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// A player's submissions across a game, paired with their rounds and
    /// ordered by round number.
    fn submissions_with_rounds(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<(SubmissionEntity, RoundEntity)>>>;
    /// Per-player aggregates ordered by total score, then correct count, then
    /// average answering time, then join order.
    fn leaderboard(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>>;

    fn append_event(&self, event: GameEventEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Events appended strictly after `after`, in append order.
    fn events_since(
        &self,
        game_id: Uuid,
        after: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEventEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
