//! Client for the remote expression-evaluation service.

use std::time::Duration;

use tracing::debug;

use crate::{
    config::EvaluatorConfig,
    equations::{EquationError, evaluator},
};

/// HTTP client for the math.js evaluation API with a local fallback.
///
/// The remote call is best-effort: any transport failure, non-success status,
/// or non-numeric body falls through to the local evaluator. Only a local
/// evaluation failure is surfaced to the caller.
#[derive(Clone)]
pub struct MathJsClient {
    http: reqwest::Client,
    base_url: String,
    remote_enabled: bool,
}

impl MathJsClient {
    /// Build a client from the evaluator configuration.
    pub fn new(config: &EvaluatorConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            remote_enabled: config.remote_enabled,
        })
    }

    /// Evaluate an expression, preferring the remote service.
    pub async fn evaluate(&self, expression: &str) -> Result<f64, EquationError> {
        if self.remote_enabled {
            match self.evaluate_remote(expression).await {
                Ok(value) => return Ok(value),
                Err(reason) => {
                    debug!(expression, %reason, "remote evaluation failed; using local evaluator");
                }
            }
        }

        evaluator::evaluate(expression).map_err(|source| EquationError::Evaluation {
            expression: expression.to_string(),
            source,
        })
    }

    async fn evaluate_remote(&self, expression: &str) -> Result<f64, RemoteFailure> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("expr", expression)])
            .send()
            .await
            .map_err(RemoteFailure::Transport)?;

        if !response.status().is_success() {
            return Err(RemoteFailure::Status(response.status()));
        }

        let body = response.text().await.map_err(RemoteFailure::Transport)?;
        let value: f64 = body
            .trim()
            .parse()
            .map_err(|_| RemoteFailure::NonNumeric(body.trim().to_string()))?;
        if !value.is_finite() {
            return Err(RemoteFailure::NonNumeric(body.trim().to_string()));
        }
        Ok(value)
    }
}

#[derive(Debug, thiserror::Error)]
enum RemoteFailure {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("non-numeric response `{0}`")]
    NonNumeric(String),
}
