use crate::config::Config;
use crate::screening::evaluation::EvaluationClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Judgment service plus per-call timeout. Cheap to clone.
    pub evaluator: EvaluationClient,
    pub config: Config,
}
