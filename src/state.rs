use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{JwtError, JwtKeys, TokenVerifier};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseManager,
    pub keys: Arc<JwtKeys>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseManager) -> Result<Self, JwtError> {
        let keys = JwtKeys::from_config(&config.security)?;
        Ok(Self {
            db,
            keys: Arc::new(keys),
            config: Arc::new(config),
        })
    }

    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }

    /// Token verifier for the authentication middleware
    pub fn verifier(&self) -> Arc<dyn TokenVerifier> {
        self.keys.clone()
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.config.security.bcrypt_work_factor
    }
}
