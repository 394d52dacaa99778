//! Auth state and configuration.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::password;
use super::rate_limit::RateLimiter;
use super::storage::AccountStore;
use super::tokens::Clock;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 10 * 24 * 60 * 60;
const DEFAULT_RESET_TICKET_TTL_SECONDS: i64 = 10 * 60;

#[derive(Clone)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_token_secret: SecretString,
    refresh_token_secret: SecretString,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    reset_ticket_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        frontend_base_url: String,
        access_token_secret: SecretString,
        refresh_token_secret: SecretString,
    ) -> Self {
        Self {
            frontend_base_url,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            reset_ticket_ttl_seconds: DEFAULT_RESET_TICKET_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_ticket_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ticket_ttl_seconds = seconds;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    pub(super) fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    pub(super) fn reset_ticket_ttl_seconds(&self) -> i64 {
        self.reset_ticket_ttl_seconds
    }

    pub(super) fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("access_token_secret", &"***")
            .field("refresh_token_secret", &"***")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("reset_ticket_ttl_seconds", &self.reset_ticket_ttl_seconds)
            .finish()
    }
}

pub struct AuthState {
    config: AuthConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    /// Verified against when the identifier is unknown, to equalize timing.
    dummy_password_hash: String,
    store: Arc<dyn AccountStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl AuthState {
    /// Build the shared auth state from config and its collaborators.
    ///
    /// # Errors
    /// Returns an error if the timing-equalization digest cannot be computed.
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn AccountStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let access_secret = config.access_token_secret.expose_secret().as_bytes();
        let refresh_secret = config.refresh_token_secret.expose_secret().as_bytes();
        let access_encoding = EncodingKey::from_secret(access_secret);
        let access_decoding = DecodingKey::from_secret(access_secret);
        let refresh_encoding = EncodingKey::from_secret(refresh_secret);
        let refresh_decoding = DecodingKey::from_secret(refresh_secret);
        let dummy_password_hash = password::dummy_hash()?;

        Ok(Self {
            config,
            access_encoding,
            access_decoding,
            refresh_encoding,
            refresh_decoding,
            dummy_password_hash,
            store,
            rate_limiter,
            clock,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    pub(super) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    pub(super) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub(super) fn access_encoding(&self) -> &EncodingKey {
        &self.access_encoding
    }

    pub(super) fn access_decoding(&self) -> &DecodingKey {
        &self.access_decoding
    }

    pub(super) fn refresh_encoding(&self) -> &EncodingKey {
        &self.refresh_encoding
    }

    pub(super) fn refresh_decoding(&self) -> &DecodingKey {
        &self.refresh_decoding
    }

    pub(super) fn dummy_password_hash(&self) -> &str {
        &self.dummy_password_hash
    }
}
