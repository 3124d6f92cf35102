//! Bearer-token identity facts.
//!
//! The raffle core only ever needs two facts about a caller: the user id
//! and whether they are an admin. This module verifies those facts from a
//! compact signed bearer token (`base64(claims).base64(tag)` with a
//! SHA-256 tag over the shared secret, compared in constant time) issued by
//! the identity provider that fronts this service.

use crate::error::AppError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rifa_core::types::UserId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by a bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// Subject (user id)
    sub: Uuid,
    /// Admin flag
    admin: bool,
    /// Expiry as a Unix timestamp (seconds)
    exp: i64,
}

/// Verifies (and, for tooling and tests, issues) bearer tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: Arc<String>,
}

impl TokenVerifier {
    /// Create a verifier over the shared token secret.
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }

    fn tag(&self, payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Issue a token for `user_id` valid until `expires_at`.
    #[must_use]
    pub fn issue(&self, user_id: UserId, admin: bool, expires_at: DateTime<Utc>) -> String {
        let claims = TokenClaims {
            sub: *user_id.as_uuid(),
            admin,
            exp: expires_at.timestamp(),
        };
        // Claims serialization cannot fail for this struct.
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = self.tag(&payload);
        format!("{payload}.{tag}")
    }

    /// Verify `token` and extract the caller's identity facts.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized [`AppError`] for malformed tokens, bad tags
    /// and expired claims.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<CurrentUser, AppError> {
        let (payload, tag) = token
            .split_once('.')
            .ok_or_else(|| AppError::unauthorized("malformed token"))?;

        let expected = self.tag(payload);
        if !constant_time_eq::constant_time_eq(tag.as_bytes(), expected.as_bytes()) {
            return Err(AppError::unauthorized("invalid token signature"));
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AppError::unauthorized("malformed token payload"))?;
        let claims: TokenClaims = serde_json::from_slice(&json)
            .map_err(|_| AppError::unauthorized("malformed token claims"))?;

        if claims.exp < now.timestamp() {
            return Err(AppError::unauthorized("token expired"));
        }

        Ok(CurrentUser {
            user_id: UserId::from_uuid(claims.sub),
            admin: claims.admin,
        })
    }
}

/// The authenticated caller's identity facts.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser {
    /// Authenticated user id
    pub user_id: UserId,
    /// Whether the caller holds the admin role
    pub admin: bool,
}

/// An authenticated caller that holds the admin role.
#[derive(Clone, Copy, Debug)]
pub struct AdminUser(pub CurrentUser);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("malformed Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("expected a bearer token"))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    TokenVerifier: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = TokenVerifier::from_ref(state);
        let token = bearer_token(parts)?;
        verifier.verify(token, Utc::now())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenVerifier: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.admin {
            return Err(AppError::forbidden("admin role required"));
        }
        Ok(Self(user))
    }
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
