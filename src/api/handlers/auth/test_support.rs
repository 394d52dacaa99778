//! In-memory doubles for the account store and clock.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

use super::password;
use super::rate_limit::NoopRateLimiter;
use super::state::{AuthConfig, AuthState};
use super::storage::{AccountRecord, AccountStore};
use super::tokens::Clock;

/// Deterministic clock that only moves when a test advances it.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub(super) fn advance_seconds(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Clone)]
struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    refresh_secret_hash: Option<Vec<u8>>,
    reset_ticket_hash: Option<Vec<u8>>,
    reset_ticket_expires_at: Option<DateTime<Utc>>,
}

/// Mutex-backed account store with the same compare-and-swap semantics as the
/// Postgres implementation.
#[derive(Default)]
pub(super) struct MemoryAccountStore {
    rows: Mutex<Vec<AccountRow>>,
    /// Enqueued reset emails as `(to_email, payload_json)` pairs.
    pub(super) outbox: Mutex<Vec<(String, String)>>,
    fail_outbox: AtomicBool,
}

impl MemoryAccountStore {
    pub(super) fn add_account(&self, username: &str, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        let password_hash = password::hash_password(password).unwrap();
        self.rows.lock().unwrap().push(AccountRow {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            refresh_secret_hash: None,
            reset_ticket_hash: None,
            reset_ticket_expires_at: None,
        });
        id
    }

    /// Make `create_reset_ticket` fail as if the outbox insert were rejected.
    pub(super) fn fail_outbox(&self) {
        self.fail_outbox.store(true, Ordering::SeqCst);
    }

    pub(super) fn has_reset_ticket(&self, email: &str) -> bool {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .any(|row| row.email == email && row.reset_ticket_hash.is_some())
    }

    pub(super) fn has_refresh_digest(&self, account_id: Uuid) -> bool {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .any(|row| row.id == account_id && row.refresh_secret_hash.is_some())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|row| row.username == identifier || row.email == identifier)
            .map(|row| AccountRecord {
                id: row.id,
                username: row.username.clone(),
                email: row.email.clone(),
                password_hash: row.password_hash.clone(),
            }))
    }

    async fn set_refresh_hash(&self, account_id: Uuid, hash: &[u8]) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == account_id) {
            row.refresh_secret_hash = Some(hash.to_vec());
        }
        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        account_id: Uuid,
        expected: &[u8],
        replacement: &[u8],
    ) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|row| row.id == account_id) else {
            return Ok(false);
        };
        if row.refresh_secret_hash.as_deref() == Some(expected) {
            row.refresh_secret_hash = Some(replacement.to_vec());
            return Ok(true);
        }
        Ok(false)
    }

    async fn revoke_refresh(&self, account_id: Uuid) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == account_id) {
            row.refresh_secret_hash = None;
        }
        Ok(())
    }

    async fn create_reset_ticket(
        &self,
        account_id: Uuid,
        ticket_hash: &[u8],
        expires_at: DateTime<Utc>,
        to_email: &str,
        payload_json: &str,
    ) -> Result<()> {
        if self.fail_outbox.load(Ordering::SeqCst) {
            // Rollback semantics: the ticket fields stay untouched.
            bail!("outbox unavailable");
        }
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == account_id) {
            row.reset_ticket_hash = Some(ticket_hash.to_vec());
            row.reset_ticket_expires_at = Some(expires_at);
        }
        drop(rows);
        self.outbox
            .lock()
            .unwrap()
            .push((to_email.to_string(), payload_json.to_string()));
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        ticket_hash: &[u8],
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|row| {
            row.reset_ticket_hash.as_deref() == Some(ticket_hash)
                && row.reset_ticket_expires_at.is_some_and(|expiry| expiry > now)
        }) else {
            return Ok(None);
        };
        row.password_hash = new_password_hash.to_string();
        row.reset_ticket_hash = None;
        row.reset_ticket_expires_at = None;
        row.refresh_secret_hash = None;
        Ok(Some(row.id))
    }
}

pub(super) fn test_state(
    store: Arc<MemoryAccountStore>,
    clock: Arc<ManualClock>,
) -> Arc<AuthState> {
    let config = AuthConfig::new(
        "https://sesio.dev".to_string(),
        SecretString::from("access-secret"),
        SecretString::from("refresh-secret"),
    );
    Arc::new(AuthState::new(config, store, Arc::new(NoopRateLimiter), clock).unwrap())
}
