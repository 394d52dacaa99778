//! Database access for account credentials, refresh state, and reset tickets.
//!
//! Handlers depend on the [`AccountStore`] trait rather than `sqlx` directly,
//! which keeps the session and reset flows testable against an in-memory
//! store. The Postgres implementation expresses every state transition as a
//! single guarded `UPDATE`, so rotation and ticket consumption stay atomic
//! under concurrent requests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Account fields needed by login, refresh, and reset flows.
#[derive(Clone, Debug)]
pub struct AccountRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by normalized username or email.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountRecord>>;

    /// Install a new refresh token digest, replacing whatever was stored.
    async fn set_refresh_hash(&self, account_id: Uuid, hash: &[u8]) -> Result<()>;

    /// Swap the stored refresh digest only if it still matches `expected`.
    ///
    /// Returns `false` when the digest changed underneath us, which means the
    /// presented token was already rotated, revoked, or replayed.
    async fn swap_refresh_hash(
        &self,
        account_id: Uuid,
        expected: &[u8],
        replacement: &[u8],
    ) -> Result<bool>;

    /// Clear the stored refresh digest. Idempotent: clearing an already empty
    /// digest is not an error.
    async fn revoke_refresh(&self, account_id: Uuid) -> Result<()>;

    /// Store a reset ticket digest and enqueue the reset email in the same
    /// transaction. A previous unexpired ticket is overwritten.
    async fn create_reset_ticket(
        &self,
        account_id: Uuid,
        ticket_hash: &[u8],
        expires_at: DateTime<Utc>,
        to_email: &str,
        payload_json: &str,
    ) -> Result<()>;

    /// Consume an unexpired reset ticket: set the new password digest, clear
    /// the ticket fields, and revoke any stored refresh digest.
    ///
    /// Returns the account id when a ticket was consumed, `None` when the
    /// digest is unknown, expired, or already used.
    async fn complete_password_reset(
        &self,
        ticket_hash: &[u8],
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>>;
}

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<AccountRecord>> {
        let query = r"
            SELECT id, username, email, password_hash
            FROM accounts
            WHERE username = $1 OR email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")?;

        Ok(row.map(|row| AccountRecord {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn set_refresh_hash(&self, account_id: Uuid, hash: &[u8]) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET refresh_secret_hash = $2,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store refresh digest")?;

        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        account_id: Uuid,
        expected: &[u8],
        replacement: &[u8],
    ) -> Result<bool> {
        // Guarded update: exactly one of two concurrent rotations can win.
        let query = r"
            UPDATE accounts
            SET refresh_secret_hash = $3,
                updated_at = NOW()
            WHERE id = $1 AND refresh_secret_hash = $2
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account_id)
            .bind(expected)
            .bind(replacement)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to rotate refresh digest")?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh(&self, account_id: Uuid) -> Result<()> {
        let query = r"
            UPDATE accounts
            SET refresh_secret_hash = NULL,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear refresh digest")?;

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
        // Transaction keeps the ticket and its outbox row consistent: if the
        // email cannot be enqueued, no ticket is left behind.
        let mut tx = pool_begin(&self.pool).await?;

        let query = r"
            UPDATE accounts
            SET reset_ticket_hash = $2,
                reset_ticket_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(ticket_hash)
            .bind(expires_at)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to store reset ticket")?;

        let query = r"
            INSERT INTO email_outbox (to_email, template, payload_json)
            VALUES ($1, $2, $3::jsonb)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(to_email)
            .bind("reset_password")
            .bind(payload_json)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert email outbox row")?;

        tx.commit().await.context("commit reset ticket transaction")?;

        Ok(())
    }

    async fn complete_password_reset(
        &self,
        ticket_hash: &[u8],
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        // Single guarded update makes the ticket one-shot: a second attempt
        // with the same ticket matches zero rows. Revoking the refresh digest
        // here forces every outstanding session to log in again.
        let query = r"
            UPDATE accounts
            SET password_hash = $2,
                reset_ticket_hash = NULL,
                reset_ticket_expires_at = NULL,
                refresh_secret_hash = NULL,
                updated_at = NOW()
            WHERE reset_ticket_hash = $1
              AND reset_ticket_expires_at > $3
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(ticket_hash)
            .bind(new_password_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to consume reset ticket")?;

        Ok(row.map(|row| row.get("id")))
    }
}

async fn pool_begin(pool: &PgPool) -> Result<sqlx::Transaction<'_, sqlx::Postgres>> {
    pool.begin()
        .await
        .context("failed to start reset ticket transaction")
}
