use axum::Router;

use crate::{
    error::{AppError, ServiceError},
    state::SharedState,
};

pub mod docs;
pub mod events;
pub mod game;
pub mod health;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(game::router())
        .merge(events::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Convert a service failure into its HTTP shape, counting server-side
/// failures in the process metrics on the way out.
pub(crate) fn into_app_error(state: &SharedState, err: ServiceError) -> AppError {
    if matches!(
        err,
        ServiceError::Unavailable(_) | ServiceError::Degraded | ServiceError::Equation(_)
    ) {
        state.metrics().record_api_error();
    }
    err.into()
}
