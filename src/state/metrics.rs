//! Process-wide gameplay counters.
//!
//! Owned by the hosting process through [`AppState`](super::AppState); the
//! coordinator reports into it on each lifecycle event and the snapshot is
//! served on the monitoring route.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::dto::{format_system_time, health::MetricsSnapshot};

/// Shared atomic counters for gameplay activity since process start.
pub struct GameMetrics {
    games_created: AtomicU64,
    games_finished: AtomicU64,
    rounds_completed: AtomicU64,
    submissions_received: AtomicU64,
    correct_submissions: AtomicU64,
    incorrect_submissions: AtomicU64,
    api_errors: AtomicU64,
    total_round_duration_ms: AtomicU64,
    started_at: SystemTime,
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self {
            games_created: AtomicU64::new(0),
            games_finished: AtomicU64::new(0),
            rounds_completed: AtomicU64::new(0),
            submissions_received: AtomicU64::new(0),
            correct_submissions: AtomicU64::new(0),
            incorrect_submissions: AtomicU64::new(0),
            api_errors: AtomicU64::new(0),
            total_round_duration_ms: AtomicU64::new(0),
            started_at: SystemTime::now(),
        }
    }
}

impl GameMetrics {
    /// Fresh counters stamped with the current time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a created game.
    pub fn record_game_created(&self) {
        self.games_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished game.
    pub fn record_game_finished(&self) {
        self.games_finished.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an ended round and accumulate its duration.
    pub fn record_round_completed(&self, duration_ms: u64) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
        self.total_round_duration_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// Count an accepted submission.
    pub fn record_submission(&self, is_correct: bool) {
        self.submissions_received.fetch_add(1, Ordering::Relaxed);
        if is_correct {
            self.correct_submissions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.incorrect_submissions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a request that failed with a server-side error.
    pub fn record_api_error(&self) {
        self.api_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough view of the counters for the monitoring route.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let rounds_completed = self.rounds_completed.load(Ordering::Relaxed);
        let total_round_duration_ms = self.total_round_duration_ms.load(Ordering::Relaxed);
        let avg_round_duration_ms = if rounds_completed > 0 {
            (total_round_duration_ms as f64 / rounds_completed as f64).round() as u64
        } else {
            0
        };

        MetricsSnapshot {
            games_created: self.games_created.load(Ordering::Relaxed),
            games_finished: self.games_finished.load(Ordering::Relaxed),
            rounds_completed,
            submissions_received: self.submissions_received.load(Ordering::Relaxed),
            correct_submissions: self.correct_submissions.load(Ordering::Relaxed),
            incorrect_submissions: self.incorrect_submissions.load(Ordering::Relaxed),
            api_errors: self.api_errors.load(Ordering::Relaxed),
            avg_round_duration_ms,
            started_at: format_system_time(self.started_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submissions_split_by_correctness() {
        let metrics = GameMetrics::new();
        metrics.record_submission(true);
        metrics.record_submission(true);
        metrics.record_submission(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submissions_received, 3);
        assert_eq!(snapshot.correct_submissions, 2);
        assert_eq!(snapshot.incorrect_submissions, 1);
    }

    #[test]
    fn average_round_duration_is_rounded_mean() {
        let metrics = GameMetrics::new();
        metrics.record_round_completed(1_000);
        metrics.record_round_completed(2_001);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rounds_completed, 2);
        assert_eq!(snapshot.avg_round_duration_ms, 1_501);
    }

    #[test]
    fn average_is_zero_without_completed_rounds() {
        let metrics = GameMetrics::new();
        assert_eq!(metrics.snapshot().avg_round_duration_ms, 0);
    }
}
