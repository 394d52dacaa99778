//! Password reset flow: ticket issuance over email and single-use redemption.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{
    error::AuthError,
    password,
    rate_limit::{RateLimitAction, RateLimitDecision},
    state::AuthState,
    types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest},
    utils::{
        build_reset_url, extract_client_ip, generate_reset_ticket, hash_token,
        normalize_identifier, valid_email,
    },
};

/// Same answer for known and unknown addresses.
const FORGOT_MESSAGE: &str = "If that address is registered, a reset link is on its way";

#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Accepted; does not reveal whether the address exists", body = MessageResponse),
        (status = 400, description = "Missing or malformed payload"),
        (status = 429, description = "Too many attempts"),
        (status = 500, description = "Reset email could not be queued; no ticket was issued")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(payload)) = payload else {
        return Err(AuthError::InvalidInput("Missing payload".to_string()));
    };

    let email = normalize_identifier(&payload.email);
    if !valid_email(&email) {
        return Err(AuthError::InvalidInput("Invalid email".to_string()));
    }

    let client_ip = extract_client_ip(&headers);
    let limiter = auth_state.rate_limiter();
    if limiter.check_ip(client_ip.as_deref(), RateLimitAction::ForgotPassword)
        == RateLimitDecision::Limited
        || limiter.check_identifier(&email, RateLimitAction::ForgotPassword)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    if let Some(account) = auth_state.store().find_by_identifier(&email).await? {
        let ticket = generate_reset_ticket()?;
        let expires_at = auth_state.now()
            + chrono::Duration::seconds(auth_state.config().reset_ticket_ttl_seconds());
        let reset_url = build_reset_url(auth_state.config().frontend_base_url(), &ticket);
        let payload_json = serde_json::to_string(&json!({
            "username": account.username,
            "reset_url": reset_url,
        }))
        .map_err(|err| AuthError::Dependency(err.into()))?;

        // Ticket and outbox row commit together; if enqueuing fails the
        // transaction rolls back and no ticket exists to redeem.
        auth_state
            .store()
            .create_reset_ticket(
                account.id,
                &hash_token(&ticket),
                expires_at,
                &account.email,
                &payload_json,
            )
            .await?;

        info!(username = %account.username, "reset ticket issued");
    }

    let response = MessageResponse {
        message: FORGOT_MESSAGE.to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/reset-password/{ticket}",
    params(
        ("ticket" = String, Path, description = "Single-use reset ticket from the email link")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated, all sessions revoked", body = MessageResponse),
        (status = 400, description = "Missing payload, password policy violation, or an unknown, expired, or already used ticket"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    Path(ticket): Path<String>,
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(payload)) = payload else {
        return Err(AuthError::InvalidInput("Missing payload".to_string()));
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResetPassword)
        == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    if !password::valid_password(&payload.password) {
        return Err(AuthError::InvalidInput(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }

    let ticket = ticket.trim();
    if ticket.is_empty() {
        return Err(AuthError::InvalidTicket);
    }

    let new_password_hash = password::hash_password(&payload.password)?;
    let now = auth_state.now();
    let Some(account_id) = auth_state
        .store()
        .complete_password_reset(&hash_token(ticket), &new_password_hash, now)
        .await?
    else {
        return Err(AuthError::InvalidTicket);
    };

    info!(account_id = %account_id, "password reset completed");

    let response = MessageResponse {
        message: "Password updated".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}
