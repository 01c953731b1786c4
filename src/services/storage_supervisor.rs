//! Storage connection supervision.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Keep a storage backend installed, retrying in the background with
/// exponential backoff and toggling degraded mode when connectivity changes.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        if let Some(store) = state.game_store().await {
            match store.health_check().await {
                Ok(()) => {
                    // Healthy connection: reset the retry backoff and avoid
                    // hammering the database with pings.
                    state.update_degraded(false);
                    delay = INITIAL_DELAY;
                    sleep(HEALTH_POLL_INTERVAL).await;
                }
                Err(err) => {
                    warn!(error = %err, "storage health check failed; entering degraded mode");
                    state.update_degraded(true);
                    if let Err(reconnect_err) = store.try_reconnect().await {
                        // Reconnect through the existing handle failed too;
                        // drop it and fall back to a fresh connection attempt.
                        warn!(error = %reconnect_err, "storage reconnect failed");
                        state.clear_game_store().await;
                    }
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
            }
            continue;
        }

        match connect().await {
            Ok(store) => {
                info!("storage connection established; leaving degraded mode");
                state.install_game_store(store).await;
                delay = INITIAL_DELAY;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}
