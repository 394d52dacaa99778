use axum::response::IntoResponse;

/// Undocumented landing route; returns the service name and version.
pub async fn root() -> impl IntoResponse {
    crate::APP_USER_AGENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn root_returns_name_and_version() {
        let response = root().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
