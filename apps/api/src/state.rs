use std::sync::Arc;

use sqlx::PgPool;

use crate::llm::CompletionBackend;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: ObjectStore,
    /// Completion backend behind a trait object so handlers and the
    /// scheduler share one seam.
    pub llm: Arc<dyn CompletionBackend>,
}
