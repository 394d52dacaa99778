//! Error taxonomy shared by the auth handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// Failures surfaced by the session and password reset flows.
///
/// Response bodies are intentionally uniform: credential and ticket failures
/// never reveal whether an identifier, password, or ticket was the wrong part.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid or expired reset ticket")]
    InvalidTicket,
    #[error("too many attempts")]
    RateLimited,
    #[error(transparent)]
    Dependency(#[from] anyhow::Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InvalidTicket => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(message) => message.clone(),
            Self::InvalidCredentials => "Invalid credentials".to_string(),
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::InvalidTicket => "Invalid or expired reset ticket".to_string(),
            Self::RateLimited => "Too many attempts".to_string(),
            // Internal detail stays in the logs, never in the response.
            Self::Dependency(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Dependency(err) = &self {
            error!("auth dependency failure: {err:#}");
        }
        let status = self.status();
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            AuthError::InvalidInput("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidTicket.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::RateLimited.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::Dependency(anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn dependency_details_are_not_public() {
        let err = AuthError::Dependency(anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn credential_and_ticket_messages_are_fixed() {
        assert_eq!(
            AuthError::InvalidCredentials.public_message(),
            "Invalid credentials"
        );
        assert_eq!(
            AuthError::InvalidTicket.public_message(),
            "Invalid or expired reset ticket"
        );
    }
}
