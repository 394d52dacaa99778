//! Session endpoints: login, refresh rotation, and logout.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{
    error::AuthError,
    password,
    rate_limit::{RateLimitAction, RateLimitDecision},
    state::AuthState,
    tokens,
    types::{LoginRequest, MessageResponse, RefreshRequest, TokenResponse},
    utils::{extract_client_ip, hash_token, normalize_identifier},
};

const ACCESS_COOKIE_NAME: &str = "sesio_access";
const REFRESH_COOKIE_NAME: &str = "sesio_refresh";

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, tokens issued", body = TokenResponse),
        (status = 400, description = "Missing or malformed payload"),
        (status = 401, description = "Unknown identifier or wrong password"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(payload)) = payload else {
        return Err(AuthError::InvalidInput("Missing payload".to_string()));
    };

    let identifier = normalize_identifier(&payload.identifier);
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(AuthError::InvalidInput(
            "Identifier and password are required".to_string(),
        ));
    }

    let client_ip = extract_client_ip(&headers);
    let limiter = auth_state.rate_limiter();
    if limiter.check_ip(client_ip.as_deref(), RateLimitAction::Login) == RateLimitDecision::Limited
        || limiter.check_identifier(&identifier, RateLimitAction::Login)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let Some(account) = auth_state.store().find_by_identifier(&identifier).await? else {
        // Burn the same Argon2 work as a real mismatch before answering.
        let _ = password::verify_password(&payload.password, auth_state.dummy_password_hash());
        return Err(AuthError::InvalidCredentials);
    };

    if !password::verify_password(&payload.password, &account.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    let now = auth_state.now();
    let access_ttl = auth_state.config().access_token_ttl_seconds();
    let refresh_ttl = auth_state.config().refresh_token_ttl_seconds();
    let access_token =
        tokens::issue_access_token(auth_state.access_encoding(), account.id, now, access_ttl)?;
    let refresh_token =
        tokens::issue_refresh_token(auth_state.refresh_encoding(), account.id, now, refresh_ttl)?;

    // Installing the digest unconditionally supersedes any previous session.
    auth_state
        .store()
        .set_refresh_hash(account.id, &hash_token(&refresh_token))
        .await?;

    info!(username = %account.username, "login succeeded");

    let response = TokenResponse {
        access_token: access_token.clone(),
        refresh_token: refresh_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: access_ttl,
    };
    let cookies = session_cookies(&auth_state, &access_token, &refresh_token)
        .map_err(|err| AuthError::Dependency(err.into()))?;
    Ok((StatusCode::OK, cookies, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh token rotated, new tokens issued", body = TokenResponse),
        (status = 401, description = "Missing, expired, revoked, or replayed refresh token"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, AuthError> {
    // The token may arrive in the JSON body, the cookie, or a bearer header.
    let presented = payload
        .map(|Json(payload)| payload.refresh_token)
        .filter(|token| !token.is_empty())
        .or_else(|| extract_refresh_token(&headers));
    let Some(presented) = presented else {
        return Err(AuthError::Unauthorized);
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Refresh)
        == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let now = auth_state.now();
    let claims = tokens::decode_refresh_token(auth_state.refresh_decoding(), &presented, now)
        .map_err(|_| AuthError::Unauthorized)?;

    let access_ttl = auth_state.config().access_token_ttl_seconds();
    let refresh_ttl = auth_state.config().refresh_token_ttl_seconds();
    let replacement =
        tokens::issue_refresh_token(auth_state.refresh_encoding(), claims.sub, now, refresh_ttl)?;

    // The swap only succeeds if the presented token is still the active one.
    // A replayed or superseded token loses the race and is rejected.
    let rotated = auth_state
        .store()
        .swap_refresh_hash(claims.sub, &hash_token(&presented), &hash_token(&replacement))
        .await?;
    if !rotated {
        // Reuse of a rotated-away token is a compromise signal worth noting.
        warn!(account_id = %claims.sub, "stale refresh token rejected");
        return Err(AuthError::Unauthorized);
    }

    let access_token =
        tokens::issue_access_token(auth_state.access_encoding(), claims.sub, now, access_ttl)?;

    let response = TokenResponse {
        access_token: access_token.clone(),
        refresh_token: replacement.clone(),
        token_type: "Bearer".to_string(),
        expires_in: access_ttl,
    };
    let cookies = session_cookies(&auth_state, &access_token, &replacement)
        .map_err(|err| AuthError::Dependency(err.into()))?;
    Ok((StatusCode::OK, cookies, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session revoked and cookies cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Identify the account from whichever valid token the client presents.
    let now = auth_state.now();
    let account_id = extract_access_token(&headers)
        .and_then(|token| {
            tokens::decode_access_token(auth_state.access_decoding(), &token, now).ok()
        })
        .map(|claims| claims.sub)
        .or_else(|| {
            extract_refresh_token(&headers)
                .and_then(|token| {
                    tokens::decode_refresh_token(auth_state.refresh_decoding(), &token, now).ok()
                })
                .map(|claims| claims.sub)
        });
    if let Some(account_id) = account_id {
        if let Err(err) = auth_state.store().revoke_refresh(account_id).await {
            error!("Failed to revoke refresh digest: {err}");
        } else {
            info!(account_id = %account_id, "session revoked");
        }
    }

    // Always clear the cookies, even if the token was missing or invalid.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_cookie(&auth_state, ACCESS_COOKIE_NAME) {
        response_headers.append(SET_COOKIE, cookie);
    }
    if let Ok(cookie) = clear_cookie(&auth_state, REFRESH_COOKIE_NAME) {
        response_headers.append(SET_COOKIE, cookie);
    }
    let response = MessageResponse {
        message: "Logged out".to_string(),
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

/// Build the `Set-Cookie` pair for a fresh access + refresh token issuance.
fn session_cookies(
    auth_state: &AuthState,
    access_token: &str,
    refresh_token: &str,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        token_cookie(
            auth_state,
            ACCESS_COOKIE_NAME,
            access_token,
            auth_state.config().access_token_ttl_seconds(),
        )?,
    );
    headers.append(
        SET_COOKIE,
        token_cookie(
            auth_state,
            REFRESH_COOKIE_NAME,
            refresh_token,
            auth_state.config().refresh_token_ttl_seconds(),
        )?,
    );
    Ok(headers)
}

/// Build a secure `HttpOnly` cookie for a token.
fn token_cookie(
    auth_state: &AuthState,
    name: &str,
    token: &str,
    ttl_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = auth_state.config().cookie_secure();
    let mut cookie = format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_cookie(auth_state: &AuthState, name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = auth_state.config().cookie_secure();
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, REFRESH_COOKIE_NAME) {
        return Some(token);
    }
    extract_bearer_token(headers)
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, ACCESS_COOKIE_NAME) {
        return Some(token);
    }
    extract_bearer_token(headers)
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.trim() == name {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
