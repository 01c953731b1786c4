use std::time::SystemTime;

use futures::future::BoxFuture;
use sqlx::{
    Row,
    postgres::{PgPool, PgPoolOptions, PgRow},
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        GameEntity, GameEventEntity, GameEventType, GameStatus, LeaderboardRowEntity, PlayerEntity,
        RoundEntity, RoundStatus, RoundTimestamps, SubmissionEntity,
    },
    storage::{StorageError, StorageResult},
};

const MAX_CONNECTIONS: u32 = 5;

/// DDL applied on connect. Uniqueness constraints on the game code, the
/// (game, round number) pair and the (round, player) pair are what the
/// coordinator's duplicate handling relies on.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS games (
        id UUID PRIMARY KEY,
        game_code TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL,
        current_round_number INT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS players (
        id UUID PRIMARY KEY,
        game_id UUID NOT NULL REFERENCES games(id),
        display_name TEXT NOT NULL,
        session_token TEXT NOT NULL,
        is_host BOOLEAN NOT NULL,
        joined_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS players_game_idx ON players (game_id, joined_at)",
    "CREATE TABLE IF NOT EXISTS rounds (
        id UUID PRIMARY KEY,
        game_id UUID NOT NULL REFERENCES games(id),
        round_number INT NOT NULL,
        equation_text TEXT NOT NULL,
        correct_answer DOUBLE PRECISION NOT NULL,
        status TEXT NOT NULL,
        started_at TIMESTAMPTZ,
        first_correct_at TIMESTAMPTZ,
        countdown_ends_at TIMESTAMPTZ,
        ended_at TIMESTAMPTZ,
        UNIQUE (game_id, round_number)
    )",
    "CREATE TABLE IF NOT EXISTS submissions (
        id UUID PRIMARY KEY,
        round_id UUID NOT NULL REFERENCES rounds(id),
        player_id UUID NOT NULL REFERENCES players(id),
        answer DOUBLE PRECISION NOT NULL,
        is_correct BOOLEAN NOT NULL,
        score INT NOT NULL,
        time_taken_ms INT,
        created_at TIMESTAMPTZ NOT NULL,
        UNIQUE (round_id, player_id)
    )",
    "CREATE TABLE IF NOT EXISTS game_events (
        id UUID PRIMARY KEY,
        game_id UUID NOT NULL REFERENCES games(id),
        event_type TEXT NOT NULL,
        payload JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS game_events_game_created_idx
        ON game_events (game_id, created_at)",
];

/// [`GameStore`] implementation backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PostgresGameStore {
    pool: PgPool,
}

/// Connect to PostgreSQL and make sure the schema is in place.
pub async fn connect(database_url: &str) -> StorageResult<PostgresGameStore> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .map_err(|err| StorageError::unavailable("connecting to PostgreSQL".into(), err))?;

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(|err| StorageError::unavailable("applying schema".into(), err))?;
    }

    Ok(PostgresGameStore { pool })
}

/// Translate a sqlx failure, surfacing unique violations as duplicates.
fn db_err(context: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StorageError::duplicate(format!("{context}: {}", db.message()));
            }
        }
        StorageError::unavailable(context.to_string(), err)
    }
}

fn decode_err(context: &'static str, err: impl std::error::Error + Send + Sync + 'static) -> StorageError {
    StorageError::unavailable(context.to_string(), err)
}

fn to_offset(time: SystemTime) -> OffsetDateTime {
    OffsetDateTime::from(time)
}

fn game_from_row(row: &PgRow) -> StorageResult<GameEntity> {
    let status: String = row.try_get("status").map_err(db_err("decoding game"))?;
    Ok(GameEntity {
        id: row.try_get("id").map_err(db_err("decoding game"))?,
        game_code: row.try_get("game_code").map_err(db_err("decoding game"))?,
        status: GameStatus::parse(&status).map_err(|err| decode_err("decoding game status", err))?,
        current_round_number: row
            .try_get::<i32, _>("current_round_number")
            .map_err(db_err("decoding game"))? as u32,
        created_at: row
            .try_get::<OffsetDateTime, _>("created_at")
            .map_err(db_err("decoding game"))?
            .into(),
    })
}

fn player_from_row(row: &PgRow) -> StorageResult<PlayerEntity> {
    Ok(PlayerEntity {
        id: row.try_get("id").map_err(db_err("decoding player"))?,
        game_id: row.try_get("game_id").map_err(db_err("decoding player"))?,
        display_name: row
            .try_get("display_name")
            .map_err(db_err("decoding player"))?,
        session_token: row
            .try_get("session_token")
            .map_err(db_err("decoding player"))?,
        is_host: row.try_get("is_host").map_err(db_err("decoding player"))?,
        joined_at: row
            .try_get::<OffsetDateTime, _>("joined_at")
            .map_err(db_err("decoding player"))?
            .into(),
    })
}

fn round_from_row(row: &PgRow) -> StorageResult<RoundEntity> {
    let status: String = row.try_get("status").map_err(db_err("decoding round"))?;
    Ok(RoundEntity {
        id: row.try_get("id").map_err(db_err("decoding round"))?,
        game_id: row.try_get("game_id").map_err(db_err("decoding round"))?,
        round_number: row
            .try_get::<i32, _>("round_number")
            .map_err(db_err("decoding round"))? as u32,
        equation_text: row
            .try_get("equation_text")
            .map_err(db_err("decoding round"))?,
        correct_answer: row
            .try_get("correct_answer")
            .map_err(db_err("decoding round"))?,
        status: RoundStatus::parse(&status)
            .map_err(|err| decode_err("decoding round status", err))?,
        started_at: row
            .try_get::<Option<OffsetDateTime>, _>("started_at")
            .map_err(db_err("decoding round"))?
            .map(Into::into),
        first_correct_at: row
            .try_get::<Option<OffsetDateTime>, _>("first_correct_at")
            .map_err(db_err("decoding round"))?
            .map(Into::into),
        countdown_ends_at: row
            .try_get::<Option<OffsetDateTime>, _>("countdown_ends_at")
            .map_err(db_err("decoding round"))?
            .map(Into::into),
        ended_at: row
            .try_get::<Option<OffsetDateTime>, _>("ended_at")
            .map_err(db_err("decoding round"))?
            .map(Into::into),
    })
}

fn submission_from_row(row: &PgRow) -> StorageResult<SubmissionEntity> {
    Ok(SubmissionEntity {
        id: row.try_get("id").map_err(db_err("decoding submission"))?,
        round_id: row
            .try_get("round_id")
            .map_err(db_err("decoding submission"))?,
        player_id: row
            .try_get("player_id")
            .map_err(db_err("decoding submission"))?,
        answer: row.try_get("answer").map_err(db_err("decoding submission"))?,
        is_correct: row
            .try_get("is_correct")
            .map_err(db_err("decoding submission"))?,
        score: row
            .try_get::<i32, _>("score")
            .map_err(db_err("decoding submission"))? as u32,
        time_taken_ms: row
            .try_get::<Option<i32>, _>("time_taken_ms")
            .map_err(db_err("decoding submission"))?
            .map(|ms| ms as u32),
        created_at: row
            .try_get::<OffsetDateTime, _>("created_at")
            .map_err(db_err("decoding submission"))?
            .into(),
    })
}

fn submission_from_prefixed_row(row: &PgRow) -> StorageResult<SubmissionEntity> {
    Ok(SubmissionEntity {
        id: row.try_get("s_id").map_err(db_err("decoding submission"))?,
        round_id: row
            .try_get("s_round_id")
            .map_err(db_err("decoding submission"))?,
        player_id: row
            .try_get("s_player_id")
            .map_err(db_err("decoding submission"))?,
        answer: row
            .try_get("s_answer")
            .map_err(db_err("decoding submission"))?,
        is_correct: row
            .try_get("s_is_correct")
            .map_err(db_err("decoding submission"))?,
        score: row
            .try_get::<i32, _>("s_score")
            .map_err(db_err("decoding submission"))? as u32,
        time_taken_ms: row
            .try_get::<Option<i32>, _>("s_time_taken_ms")
            .map_err(db_err("decoding submission"))?
            .map(|ms| ms as u32),
        created_at: row
            .try_get::<OffsetDateTime, _>("s_created_at")
            .map_err(db_err("decoding submission"))?
            .into(),
    })
}

fn event_from_row(row: &PgRow) -> StorageResult<GameEventEntity> {
    let event_type: String = row.try_get("event_type").map_err(db_err("decoding event"))?;
    Ok(GameEventEntity {
        id: row.try_get("id").map_err(db_err("decoding event"))?,
        game_id: row.try_get("game_id").map_err(db_err("decoding event"))?,
        event_type: GameEventType::parse(&event_type)
            .map_err(|err| decode_err("decoding event type", err))?,
        payload: row.try_get("payload").map_err(db_err("decoding event"))?,
        created_at: row
            .try_get::<OffsetDateTime, _>("created_at")
            .map_err(db_err("decoding event"))?
            .into(),
    })
}

impl GameStore for PostgresGameStore {
    fn create_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO games (id, game_code, status, current_round_number, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(game.id)
            .bind(&game.game_code)
            .bind(game.status.as_str())
            .bind(game.current_round_number as i32)
            .bind(to_offset(game.created_at))
            .execute(&pool)
            .await
            .map_err(db_err("creating game"))?;
            Ok(())
        })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let row = sqlx::query("SELECT * FROM games WHERE game_code = $1")
                .bind(&code)
                .fetch_optional(&pool)
                .await
                .map_err(db_err("loading game"))?;
            row.as_ref().map(game_from_row).transpose()
        })
    }

    fn find_game_with_players(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<(GameEntity, Vec<PlayerEntity>)>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let Some(row) = sqlx::query("SELECT * FROM games WHERE game_code = $1")
                .bind(&code)
                .fetch_optional(&pool)
                .await
                .map_err(db_err("loading game"))?
            else {
                return Ok(None);
            };
            let game = game_from_row(&row)?;

            let rows =
                sqlx::query("SELECT * FROM players WHERE game_id = $1 ORDER BY joined_at ASC")
                    .bind(game.id)
                    .fetch_all(&pool)
                    .await
                    .map_err(db_err("loading players"))?;
            let players = rows
                .iter()
                .map(player_from_row)
                .collect::<StorageResult<Vec<_>>>()?;
            Ok(Some((game, players)))
        })
    }

    fn update_game_status(
        &self,
        code: String,
        status: GameStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query("UPDATE games SET status = $2 WHERE game_code = $1")
                .bind(&code)
                .bind(status.as_str())
                .execute(&pool)
                .await
                .map_err(db_err("updating game status"))?;
            Ok(())
        })
    }

    fn update_game_current_round(
        &self,
        code: String,
        round_number: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query("UPDATE games SET current_round_number = $2 WHERE game_code = $1")
                .bind(&code)
                .bind(round_number as i32)
                .execute(&pool)
                .await
                .map_err(db_err("updating game current round"))?;
            Ok(())
        })
    }

    fn create_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO players (id, game_id, display_name, session_token, is_host, joined_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(player.id)
            .bind(player.game_id)
            .bind(&player.display_name)
            .bind(&player.session_token)
            .bind(player.is_host)
            .bind(to_offset(player.joined_at))
            .execute(&pool)
            .await
            .map_err(db_err("creating player"))?;
            Ok(())
        })
    }

    fn count_players(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players WHERE game_id = $1")
                .bind(game_id)
                .fetch_one(&pool)
                .await
                .map_err(db_err("counting players"))?;
            Ok(count as u64)
        })
    }

    fn create_rounds(&self, rounds: Vec<RoundEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let mut tx = pool.begin().await.map_err(db_err("starting transaction"))?;
            for round in &rounds {
                sqlx::query(
                    "INSERT INTO rounds (id, game_id, round_number, equation_text,
                                         correct_answer, status)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(round.id)
                .bind(round.game_id)
                .bind(round.round_number as i32)
                .bind(&round.equation_text)
                .bind(round.correct_answer)
                .bind(round.status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err("creating rounds"))?;
            }
            tx.commit().await.map_err(db_err("committing rounds"))?;
            Ok(())
        })
    }

    fn find_round(
        &self,
        game_id: Uuid,
        round_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let row = sqlx::query("SELECT * FROM rounds WHERE game_id = $1 AND round_number = $2")
                .bind(game_id)
                .bind(round_number as i32)
                .fetch_optional(&pool)
                .await
                .map_err(db_err("loading round"))?;
            row.as_ref().map(round_from_row).transpose()
        })
    }

    fn update_round_status(
        &self,
        round_id: Uuid,
        status: RoundStatus,
        timestamps: RoundTimestamps,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "UPDATE rounds
                 SET status = $2,
                     started_at = COALESCE($3, started_at),
                     ended_at = COALESCE($4, ended_at)
                 WHERE id = $1",
            )
            .bind(round_id)
            .bind(status.as_str())
            .bind(timestamps.started_at.map(to_offset))
            .bind(timestamps.ended_at.map(to_offset))
            .execute(&pool)
            .await
            .map_err(db_err("updating round status"))?;
            Ok(())
        })
    }

    fn claim_first_correct(
        &self,
        round_id: Uuid,
        first_correct_at: SystemTime,
        countdown_ends_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            // Single conditional write: the WHERE clause arbitrates the race.
            let result = sqlx::query(
                "UPDATE rounds
                 SET status = $2, first_correct_at = $3, countdown_ends_at = $4
                 WHERE id = $1 AND first_correct_at IS NULL",
            )
            .bind(round_id)
            .bind(RoundStatus::Countdown.as_str())
            .bind(to_offset(first_correct_at))
            .bind(to_offset(countdown_ends_at))
            .execute(&pool)
            .await
            .map_err(db_err("claiming first correct"))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn count_rounds_with_status(
        &self,
        game_id: Uuid,
        status: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM rounds WHERE game_id = $1 AND status = $2",
            )
            .bind(game_id)
            .bind(status.as_str())
            .fetch_one(&pool)
            .await
            .map_err(db_err("counting rounds"))?;
            Ok(count as u64)
        })
    }

    fn create_submission(
        &self,
        submission: SubmissionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO submissions (id, round_id, player_id, answer, is_correct,
                                          score, time_taken_ms, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(submission.id)
            .bind(submission.round_id)
            .bind(submission.player_id)
            .bind(submission.answer)
            .bind(submission.is_correct)
            .bind(submission.score as i32)
            .bind(submission.time_taken_ms.map(|ms| ms as i32))
            .bind(to_offset(submission.created_at))
            .execute(&pool)
            .await
            .map_err(db_err("creating submission"))?;
            Ok(())
        })
    }

    fn find_submission(
        &self,
        round_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let row =
                sqlx::query("SELECT * FROM submissions WHERE round_id = $1 AND player_id = $2")
                    .bind(round_id)
                    .bind(player_id)
                    .fetch_optional(&pool)
                    .await
                    .map_err(db_err("loading submission"))?;
            row.as_ref().map(submission_from_row).transpose()
        })
    }

    fn count_submissions_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE round_id = $1")
                    .bind(round_id)
                    .fetch_one(&pool)
                    .await
                    .map_err(db_err("counting submissions"))?;
            Ok(count as u64)
        })
    }

    fn count_correct_submissions_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM submissions WHERE round_id = $1 AND is_correct",
            )
            .bind(round_id)
            .fetch_one(&pool)
            .await
            .map_err(db_err("counting correct submissions"))?;
            Ok(count as u64)
        })
    }

    fn count_submissions_for_player(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*)
                 FROM submissions s
                 JOIN rounds r ON r.id = s.round_id
                 WHERE r.game_id = $1 AND s.player_id = $2",
            )
            .bind(game_id)
            .bind(player_id)
            .fetch_one(&pool)
            .await
            .map_err(db_err("counting player submissions"))?;
            Ok(count as u64)
        })
    }

    fn submissions_with_rounds(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<(SubmissionEntity, RoundEntity)>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            // Round columns keep their bare names so `round_from_row` applies;
            // submission columns are prefixed to avoid the clash.
            let rows = sqlx::query(
                "SELECT s.id AS s_id, s.round_id AS s_round_id, s.player_id AS s_player_id,
                        s.answer AS s_answer, s.is_correct AS s_is_correct, s.score AS s_score,
                        s.time_taken_ms AS s_time_taken_ms, s.created_at AS s_created_at,
                        r.id, r.game_id, r.round_number, r.equation_text, r.correct_answer,
                        r.status, r.started_at, r.first_correct_at, r.countdown_ends_at,
                        r.ended_at
                 FROM submissions s
                 JOIN rounds r ON r.id = s.round_id
                 WHERE r.game_id = $1 AND s.player_id = $2
                 ORDER BY r.round_number ASC",
            )
            .bind(game_id)
            .bind(player_id)
            .fetch_all(&pool)
            .await
            .map_err(db_err("loading player submissions"))?;

            rows.iter()
                .map(|row| Ok((submission_from_prefixed_row(row)?, round_from_row(row)?)))
                .collect()
        })
    }

    fn leaderboard(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT p.id AS player_id,
                        p.display_name,
                        COALESCE(SUM(s.score), 0)::BIGINT AS total_score,
                        COALESCE(COUNT(s.id) FILTER (WHERE s.is_correct), 0)::BIGINT
                            AS correct_count,
                        COALESCE(ROUND(AVG(COALESCE(s.time_taken_ms, 0))
                            FILTER (WHERE s.is_correct)), 0)::BIGINT AS average_time_ms
                 FROM players p
                 LEFT JOIN submissions s ON s.player_id = p.id
                 WHERE p.game_id = $1
                 GROUP BY p.id, p.display_name, p.joined_at
                 ORDER BY total_score DESC, correct_count DESC, average_time_ms ASC,
                          p.joined_at ASC",
            )
            .bind(game_id)
            .fetch_all(&pool)
            .await
            .map_err(db_err("computing leaderboard"))?;

            rows.iter()
                .map(|row| {
                    Ok(LeaderboardRowEntity {
                        player_id: row
                            .try_get("player_id")
                            .map_err(db_err("decoding leaderboard"))?,
                        display_name: row
                            .try_get("display_name")
                            .map_err(db_err("decoding leaderboard"))?,
                        total_score: row
                            .try_get("total_score")
                            .map_err(db_err("decoding leaderboard"))?,
                        correct_count: row
                            .try_get("correct_count")
                            .map_err(db_err("decoding leaderboard"))?,
                        average_time_ms: row
                            .try_get("average_time_ms")
                            .map_err(db_err("decoding leaderboard"))?,
                    })
                })
                .collect()
        })
    }

    fn append_event(&self, event: GameEventEntity) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO game_events (id, game_id, event_type, payload, created_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(event.id)
            .bind(event.game_id)
            .bind(event.event_type.as_str())
            .bind(&event.payload)
            .bind(to_offset(event.created_at))
            .execute(&pool)
            .await
            .map_err(db_err("appending event"))?;
            Ok(())
        })
    }

    fn events_since(
        &self,
        game_id: Uuid,
        after: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEventEntity>>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT * FROM game_events
                 WHERE game_id = $1 AND created_at > $2
                 ORDER BY created_at ASC",
            )
            .bind(game_id)
            .bind(to_offset(after))
            .fetch_all(&pool)
            .await
            .map_err(db_err("loading events"))?;
            rows.iter().map(event_from_row).collect()
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(&pool)
                .await
                .map_err(db_err("pinging database"))?;
            Ok(())
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        // The pool re-establishes connections on demand; a round trip is the
        // reconnect attempt.
        self.health_check()
    }
}
