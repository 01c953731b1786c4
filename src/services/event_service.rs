//! Lifecycle event persistence and fan-out.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{GameEventEntity, GameEventType},
        storage::StorageResult,
    },
    dto::events::{EventRecord, ServerEvent},
    error::ServiceError,
    state::SharedState,
};

/// Append a lifecycle event to the game's persisted log and fan it out to the
/// game's live SSE subscribers.
pub async fn emit(
    state: &SharedState,
    store: &dyn GameStore,
    game_id: Uuid,
    event_type: GameEventType,
    payload: serde_json::Value,
) -> StorageResult<()> {
    let event = GameEventEntity {
        id: Uuid::new_v4(),
        game_id,
        event_type,
        payload,
        created_at: SystemTime::now(),
    };
    store.append_event(event.clone()).await?;

    match ServerEvent::json(Some(event_type.as_str().to_string()), &event.payload) {
        Ok(server_event) => state.events().broadcast(game_id, server_event),
        Err(err) => warn!(
            event_type = event_type.as_str(),
            error = %err,
            "failed to serialize SSE payload"
        ),
    }

    Ok(())
}

/// Persisted events for a game appended strictly after `after` (or all of
/// them when no lower bound is given).
pub async fn events_since(
    state: &SharedState,
    game_code: &str,
    after: Option<SystemTime>,
) -> Result<Vec<EventRecord>, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(game) = store.find_game_by_code(game_code.to_string()).await? else {
        return Err(ServiceError::NotFound(format!(
            "game `{game_code}` not found"
        )));
    };

    let events = store
        .events_since(game.id, after.unwrap_or(UNIX_EPOCH))
        .await?;
    Ok(events.into_iter().map(Into::into).collect())
}
