use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::token::TokenIssuer;
use crate::intelligence::DocumentIntelligence;
use crate::storage::FileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Live or offline document intelligence, chosen once at startup.
    pub intelligence: Arc<dyn DocumentIntelligence>,
    pub files: Arc<dyn FileStore>,
    pub tokens: Arc<TokenIssuer>,
}
