//! # Sesio (Credential & Session Lifecycle Manager)
//!
//! `sesio` manages the full credential lifecycle for user accounts: password
//! login, short-lived bearer access tokens, rotating refresh tokens, and a
//! single-use password-reset ticket flow delivered over email.
//!
//! ## Sessions
//!
//! A successful login issues two signed tokens: a short-lived access token
//! and a long-lived refresh token, both returned in the response body and
//! mirrored as `HttpOnly` cookies. The database stores a digest of the
//! active refresh token per account, never the raw value.
//!
//! - **Rotation:** Every refresh atomically swaps the stored digest for a new
//!   one. A stale or replayed refresh token fails the swap and is rejected.
//! - **Revocation:** Logout and password reset clear the stored digest, which
//!   invalidates every outstanding refresh token for the account.
//!
//! ## Password Reset
//!
//! Forgot-password requests mint a random single-use ticket, store only its
//! digest with a short expiry, and enqueue the reset email in a transactional
//! outbox. The endpoint answers the same way whether or not the address is
//! known, so it cannot be used to probe for accounts.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
