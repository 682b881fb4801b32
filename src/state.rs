use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Database;
use crate::services::mailer::Mailer;
use crate::services::storage::FileStorage;

/// Shared application state, built once in `main` and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub mailer: Arc<dyn Mailer>,
    pub storage: FileStorage,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, mailer: Arc<dyn Mailer>) -> Self {
        let storage = FileStorage::new(config.server.uploads_dir.clone(), config.server.max_upload_bytes);
        Self {
            config: Arc::new(config),
            db,
            mailer,
            storage,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.security.jwt_secret
    }
}
