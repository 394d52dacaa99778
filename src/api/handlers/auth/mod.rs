//! Auth handlers and supporting modules.
//!
//! This module coordinates password login, token issuance, refresh rotation,
//! and the password reset flow.
//!
//! ## Refresh Rotation
//!
//! Each account stores at most one refresh token digest. Presenting a refresh
//! token swaps the stored digest for a fresh one in a single guarded update,
//! so a replayed token (or the loser of two concurrent refreshes) is rejected
//! without any extra locking.
//!
//! ## Reset Tickets
//!
//! Reset tickets are random 32-byte values delivered by email and stored only
//! as SHA-256 digests with a short expiry. Redemption consumes the ticket and
//! revokes the account's refresh digest, closing any session opened before
//! the password changed.

pub(crate) mod error;
mod password;
mod rate_limit;
pub(crate) mod reset;
pub(crate) mod session;
mod state;
mod storage;
mod tokens;
pub(crate) mod types;
mod utils;

pub use rate_limit::NoopRateLimiter;
pub use state::{AuthConfig, AuthState};
pub use storage::{AccountStore, PgAccountStore};
pub use tokens::{Clock, SystemClock};

#[cfg(test)]
mod test_support;
