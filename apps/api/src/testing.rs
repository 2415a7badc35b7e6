//! Shared fixtures for handler and workflow tests.

use std::sync::Arc;

use tempfile::TempDir;

use crate::auth::token::TokenIssuer;
use crate::config::Config;
use crate::db::test_pool;
use crate::intelligence::{OfflineIntelligence, TagLimits};
use crate::state::AppState;
use crate::storage::LocalFileStore;

/// Offline provider, in-memory database, uploads in a temp directory.
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().to_string_lossy().to_string();
    let config = Config::from_lookup(|key| match key {
        "ENV" => Some("test".to_string()),
        "SECRET_KEY" => Some("test-secret".to_string()),
        "STORAGE_PATH" => Some(storage_path.clone()),
        _ => None,
    })
    .unwrap();

    let state = AppState {
        db: test_pool().await,
        intelligence: Arc::new(OfflineIntelligence::new(TagLimits::default())),
        files: Arc::new(LocalFileStore::new(dir.path()).await.unwrap()),
        tokens: Arc::new(TokenIssuer::new(&config.secret_key, config.token_ttl_minutes)),
    };
    (state, dir)
}
