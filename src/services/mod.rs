/// OpenAPI documentation generation.
pub mod documentation;
/// Lifecycle event persistence and fan-out.
pub mod event_service;
/// Core game rules and round lifecycle coordination.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Submission scoring.
pub mod scoring_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision with backoff.
pub mod storage_supervisor;
