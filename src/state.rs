use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{auth::jwt::JwtKeys, config::AppConfig, notify::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub jwt: JwtKeys,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection, notifier: Notifier) -> Arc<Self> {
        let jwt = JwtKeys::from_secret(config.auth.jwt_secret.as_bytes());
        Arc::new(Self {
            config,
            db,
            jwt,
            notifier,
        })
    }

    pub fn secure_cookies(&self) -> bool {
        self.config.auth.secure_cookies
    }
}
