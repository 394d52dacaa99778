//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    /// Username or email address.
    pub identifier: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            identifier: "alice".to_string(),
            password: "hunter22hunter22".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let identifier = value
            .get("identifier")
            .and_then(serde_json::Value::as_str)
            .context("missing identifier")?;
        assert_eq!(identifier, "alice");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "hunter22hunter22");
        Ok(())
    }

    #[test]
    fn token_response_shape() -> Result<()> {
        let response = TokenResponse {
            access_token: "jwt".to_string(),
            refresh_token: "refresh-jwt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 900,
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("token_type").and_then(serde_json::Value::as_str),
            Some("Bearer")
        );
        assert_eq!(
            value.get("expires_in").and_then(serde_json::Value::as_i64),
            Some(900)
        );
        Ok(())
    }

    #[test]
    fn forgot_password_request_round_trips() -> Result<()> {
        let request = ForgotPasswordRequest {
            email: "bob@example.com".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: ForgotPasswordRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.email, "bob@example.com");
        Ok(())
    }
}
