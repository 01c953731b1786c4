use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}

/// Counter snapshot served on the monitoring route.
#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub games_created: u64,
    pub games_finished: u64,
    pub rounds_completed: u64,
    pub submissions_received: u64,
    pub correct_submissions: u64,
    pub incorrect_submissions: u64,
    pub api_errors: u64,
    /// Rounded mean duration of completed rounds, 0 when none completed yet.
    pub avg_round_duration_ms: u64,
    /// When the counters started accumulating.
    pub started_at: String,
}
