/// Process-wide gameplay counters.
pub mod metrics;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::game_store::GameStore, equations::MathJsClient, error::ServiceError,
};

pub use self::metrics::GameMetrics;
pub use self::sse::EventStreams;

/// Cheaply cloneable handle on the application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the storage handle, SSE hubs, process
/// metrics and the equation evaluation client.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    events: EventStreams,
    metrics: GameMetrics,
    equations: MathJsClient,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: &AppConfig) -> anyhow::Result<SharedState> {
        let (degraded_tx, _rx) = watch::channel(true);
        Ok(Arc::new(Self {
            game_store: RwLock::new(None),
            events: EventStreams::new(16),
            metrics: GameMetrics::new(),
            equations: MathJsClient::new(&config.evaluator)?,
            degraded: degraded_tx,
        }))
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current game store or fail with a degraded-mode error.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag when the value changes.
    ///
    /// `send_replace` stores the value even while nobody is watching.
    pub fn update_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }

        self.degraded.send_replace(value);
    }

    /// Registry of per-game SSE hubs.
    pub fn events(&self) -> &EventStreams {
        &self.events
    }

    /// Process-wide gameplay counters.
    pub fn metrics(&self) -> &GameMetrics {
        &self.metrics
    }

    /// Client for equation answer computation.
    pub fn equations(&self) -> &MathJsClient {
        &self.equations
    }
}
