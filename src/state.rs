//! Shared application state handed to every handler.

use std::sync::Arc;

use axum::extract::FromRef;
use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::notifications::Notifier;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: TokenKeys,
    pub notifier: Notifier,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, nats: Option<async_nats::Client>) -> Self {
        Self {
            db,
            tokens: TokenKeys::new(config.jwt_secret.expose_secret()),
            notifier: Notifier::new(nats),
            config: Arc::new(config),
        }
    }
}
