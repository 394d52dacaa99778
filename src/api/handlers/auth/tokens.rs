//! Signed token issuance and validation for access and refresh tokens.
//!
//! Both token kinds are HS256 JWTs signed with distinct secrets, so one can
//! never be presented in place of the other. Expiry is checked against an
//! injected [`Clock`] instead of the signer's clock, which keeps expiry
//! behavior deterministic under test.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time source for token issuance and expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used outside of tests.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TokenError {
    /// Signature valid but past its expiry instant.
    Expired,
    /// Garbage, tampered, or signed with the wrong secret.
    Invalid,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct AccessClaims {
    pub(crate) sub: Uuid,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct RefreshClaims {
    pub(crate) sub: Uuid,
    /// Random per-issuance id; makes every rotation produce a distinct token
    /// even within the same second.
    pub(crate) jti: Uuid,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

pub(super) fn issue_access_token(
    key: &EncodingKey,
    account_id: Uuid,
    now: DateTime<Utc>,
    ttl_seconds: i64,
) -> Result<String> {
    let claims = AccessClaims {
        sub: account_id,
        iat: now.timestamp(),
        exp: now.timestamp() + ttl_seconds,
    };
    encode(&Header::new(Algorithm::HS256), &claims, key).context("failed to sign access token")
}

pub(super) fn issue_refresh_token(
    key: &EncodingKey,
    account_id: Uuid,
    now: DateTime<Utc>,
    ttl_seconds: i64,
) -> Result<String> {
    let claims = RefreshClaims {
        sub: account_id,
        jti: Uuid::new_v4(),
        iat: now.timestamp(),
        exp: now.timestamp() + ttl_seconds,
    };
    encode(&Header::new(Algorithm::HS256), &claims, key).context("failed to sign refresh token")
}

pub(super) fn decode_access_token(
    key: &DecodingKey,
    token: &str,
    now: DateTime<Utc>,
) -> Result<AccessClaims, TokenError> {
    let data = decode::<AccessClaims>(token, key, &lenient_validation())
        .map_err(|_| TokenError::Invalid)?;
    check_expiry(data.claims.exp, now)?;
    Ok(data.claims)
}

pub(super) fn decode_refresh_token(
    key: &DecodingKey,
    token: &str,
    now: DateTime<Utc>,
) -> Result<RefreshClaims, TokenError> {
    let data = decode::<RefreshClaims>(token, key, &lenient_validation())
        .map_err(|_| TokenError::Invalid)?;
    check_expiry(data.claims.exp, now)?;
    Ok(data.claims)
}

/// Signature-only validation; expiry is checked against the injected clock.
fn lenient_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation
}

fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<(), TokenError> {
    if exp <= now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn keys(secret: &str) -> (EncodingKey, DecodingKey) {
        (
            EncodingKey::from_secret(secret.as_bytes()),
            DecodingKey::from_secret(secret.as_bytes()),
        )
    }

    #[test]
    fn access_token_round_trip() {
        let (enc, dec) = keys("access-secret");
        let account_id = Uuid::new_v4();
        let now = Utc::now();
        let token = issue_access_token(&enc, account_id, now, 900).unwrap();
        let claims = decode_access_token(&dec, &token, now).unwrap();
        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.exp, claims.iat + 900);
    }

    #[test]
    fn access_token_expires_with_clock() {
        let (enc, dec) = keys("access-secret");
        let now = Utc::now();
        let token = issue_access_token(&enc, Uuid::new_v4(), now, 900).unwrap();

        let just_before = now + Duration::seconds(899);
        assert!(decode_access_token(&dec, &token, just_before).is_ok());

        let at_expiry = now + Duration::seconds(900);
        assert_eq!(
            decode_access_token(&dec, &token, at_expiry).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn tokens_signed_with_other_secret_rejected() {
        let (enc, _) = keys("access-secret");
        let (_, other_dec) = keys("refresh-secret");
        let now = Utc::now();
        let token = issue_access_token(&enc, Uuid::new_v4(), now, 900).unwrap();
        assert_eq!(
            decode_access_token(&other_dec, &token, now).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn tampered_token_rejected() {
        let (enc, dec) = keys("access-secret");
        let now = Utc::now();
        let token = issue_access_token(&enc, Uuid::new_v4(), now, 900).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert_eq!(
            decode_access_token(&dec, &tampered, now).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn garbage_token_rejected() {
        let (_, dec) = keys("access-secret");
        assert_eq!(
            decode_access_token(&dec, "not-a-jwt", Utc::now()).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn refresh_tokens_are_unique_per_issuance() {
        let (enc, dec) = keys("refresh-secret");
        let account_id = Uuid::new_v4();
        let now = Utc::now();
        let first = issue_refresh_token(&enc, account_id, now, 3600).unwrap();
        let second = issue_refresh_token(&enc, account_id, now, 3600).unwrap();
        assert_ne!(first, second);

        let first_claims = decode_refresh_token(&dec, &first, now).unwrap();
        let second_claims = decode_refresh_token(&dec, &second, now).unwrap();
        assert_eq!(first_claims.sub, account_id);
        assert_ne!(first_claims.jti, second_claims.jti);
    }

    #[test]
    fn refresh_token_expires_with_clock() {
        let (enc, dec) = keys("refresh-secret");
        let now = Utc::now();
        let token = issue_refresh_token(&enc, Uuid::new_v4(), now, 60).unwrap();
        let later = now + Duration::seconds(61);
        assert_eq!(
            decode_refresh_token(&dec, &token, later).unwrap_err(),
            TokenError::Expired
        );
    }
}
