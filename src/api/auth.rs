//! Login and logout.
//!
//! This is the only writer of the session storage.

use crate::api::client::ApiClient;
use crate::auth::jwt::token_fingerprint;
use crate::auth::session::SessionWriter;
use crate::types::{AppError, LoginRequest, Result, TokenResponse, UserProfile};
use tracing::info;

/// Exchanges credentials for a bearer token and stores it.
pub async fn login(
    client: &ApiClient,
    store: &dyn SessionWriter,
    email: &str,
    password: &str,
) -> Result<TokenResponse> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }

    let body = LoginRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    };
    let tokens: TokenResponse = client.post("/api/auth/login", &body).await?;
    if tokens.access_token.is_empty() {
        return Err(AppError::Auth("Login returned an empty token".to_string()));
    }

    store.set_token(&tokens.access_token)?;
    info!(token = %token_fingerprint(&tokens.access_token), "Signed in as {}", body.email);
    Ok(tokens)
}

/// Clears the stored token.
pub fn logout(store: &dyn SessionWriter) -> Result<()> {
    store.clear()?;
    info!("Signed out");
    Ok(())
}

/// Profile of the signed-in user.
pub async fn current_user(client: &ApiClient) -> Result<UserProfile> {
    client.get("/api/auth/me").await
}
