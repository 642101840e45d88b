use crate::auth::guard::SessionCheck;
use crate::auth::session::{Session, SessionStore};
use crate::types::{AppError, Claims, Result};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Verifies HS256 bearer tokens issued by the Voxa API.
pub struct TokenVerifier {
    jwt_secret: String,
}

impl TokenVerifier {
    /// Creates a verifier for tokens signed with `jwt_secret`.
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Verifies a JWT token and returns the claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))
    }
}

/// Short SHA-256 fingerprint of a token, safe to put in log lines.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(&hasher.finalize()[..6])
}

/// Session check that only accepts a stored token which is a valid,
/// unexpired JWT signed with the configured secret.
pub struct JwtSessionCheck {
    store: Arc<dyn SessionStore>,
    verifier: TokenVerifier,
}

impl JwtSessionCheck {
    pub fn new(store: Arc<dyn SessionStore>, verifier: TokenVerifier) -> Self {
        Self { store, verifier }
    }
}

#[async_trait]
impl SessionCheck for JwtSessionCheck {
    async fn is_authenticated(&self) -> bool {
        let session = Session::read(self.store.as_ref());
        let Some(token) = session.bearer() else {
            return false;
        };

        match self.verifier.verify_token(token) {
            Ok(claims) => {
                debug!(
                    token = %token_fingerprint(token),
                    sub = %claims.sub,
                    "Session token verified"
                );
                true
            }
            Err(e) => {
                debug!(token = %token_fingerprint(token), "Rejecting session: {}", e);
                false
            }
        }
    }
}
