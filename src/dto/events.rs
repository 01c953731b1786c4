use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{GameEventEntity, GameEventType},
    dto::format_system_time,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Persisted lifecycle event returned by the timestamp-range read.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventRecord {
    pub id: Uuid,
    pub event_type: GameEventType,
    /// Free-form JSON payload of the event.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: String,
}

impl From<GameEventEntity> for EventRecord {
    fn from(event: GameEventEntity) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            payload: event.payload,
            created_at: format_system_time(event.created_at),
        }
    }
}
