use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use serde::Deserialize;
use tracing::info;

use crate::{
    dto::{events::EventRecord, parse_system_time},
    error::AppError,
    routes::into_app_error,
    services::{event_service, sse_service},
    state::SharedState,
};

/// Configure the event log endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{code}/events", get(list_events))
        .route("/games/{code}/events/stream", get(event_stream))
}

/// Query parameters for the timestamp-range event read.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// RFC 3339 lower bound; only events strictly after it are returned.
    pub after: Option<String>,
}

/// Read the persisted event log for a game, optionally bounded below.
#[utoipa::path(
    get,
    path = "/games/{code}/events",
    tag = "events",
    params(
        ("code" = String, Path, description = "Shareable game code"),
        ("after" = Option<String>, Query, description = "RFC 3339 lower bound (exclusive)")
    ),
    responses(
        (status = 200, description = "Events in append order", body = [EventRecord]),
        (status = 404, description = "No game matches the code")
    )
)]
pub async fn list_events(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventRecord>>, AppError> {
    let after = match query.after.as_deref() {
        Some(raw) => Some(
            parse_system_time(raw)
                .ok_or_else(|| AppError::BadRequest("invalid `after` timestamp".into()))?,
        ),
        None => None,
    };

    let events = event_service::events_since(&state, &code, after)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    Ok(Json(events))
}

/// Stream a game's lifecycle events live over SSE.
#[utoipa::path(
    get,
    path = "/games/{code}/events/stream",
    tag = "events",
    params(("code" = String, Path, description = "Shareable game code")),
    responses(
        (status = 200, description = "Live event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "No game matches the code")
    )
)]
pub async fn event_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe(&state, &code)
        .await
        .map_err(|err| into_app_error(&state, err))?;
    info!(game_code = %code, "new SSE connection");
    Ok(sse_service::to_sse_stream(receiver))
}
