use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::db::Store;
use crate::services::auth_service::{TokenPolicy, ttl_from_seconds};
use crate::services::clock::{Clock, SystemClock};
use crate::services::password_reset::PasswordResetTokenManager;
use crate::services::token_codec::JwtTokenCodec;
use crate::services::token_generator::{SecureTokenGenerator, TokenGenerator, URL_SAFE};
use crate::services::{
    AccountService, AuthSessionService, DefaultAuthSessionService, PasswordResetService,
    SeaOrmAccountService, SeaOrmPasswordResetService,
};

const GENERATED_SECRET_LENGTH: usize = 64;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub clock: Arc<dyn Clock>,

    pub auth: Arc<dyn AuthSessionService>,

    pub password_reset: Arc<dyn PasswordResetService>,

    pub accounts: Arc<dyn AccountService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    /// Wires every service around an already-migrated store.
    #[must_use]
    pub fn with_store(config: Config, store: Store, clock: Arc<dyn Clock>) -> Self {
        let generator: Arc<dyn TokenGenerator> = Arc::new(SecureTokenGenerator);

        let secret = if config.tokens.jwt_secret.is_empty() {
            warn!("tokens.jwt_secret is not set; using a random secret for this process");
            generator.random_token(GENERATED_SECRET_LENGTH, URL_SAFE)
        } else {
            config.tokens.jwt_secret.clone()
        };

        let codec = Arc::new(JwtTokenCodec::new(
            secret.as_bytes(),
            config.tokens.issuer.clone(),
            Arc::clone(&clock),
        ));

        let auth = Arc::new(DefaultAuthSessionService::new(
            Arc::new(store.clone()),
            Arc::clone(&clock),
            Arc::clone(&generator),
            codec,
            TokenPolicy::from_seconds(
                config.tokens.access_token_ttl_seconds,
                config.tokens.refresh_token_ttl_seconds,
            ),
            config.security.clone(),
        )) as Arc<dyn AuthSessionService>;

        let manager = PasswordResetTokenManager::new(
            Arc::clone(&clock),
            generator,
            ttl_from_seconds(config.password_reset.token_ttl_seconds),
        );

        let password_reset = Arc::new(SeaOrmPasswordResetService::new(
            store.clone(),
            manager,
            Arc::clone(&clock),
            Arc::clone(&auth),
            config.security.clone(),
            config.password_reset.min_password_length,
        )) as Arc<dyn PasswordResetService>;

        let accounts = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            Arc::clone(&auth),
            config.security.clone(),
            config.password_reset.min_password_length,
        )) as Arc<dyn AccountService>;

        Self {
            config: Arc::new(config),
            store,
            clock,
            auth,
            password_reset,
            accounts,
        }
    }
}
