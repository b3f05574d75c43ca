use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{Claims, Revocations};
use crate::error::AppError;
use crate::handler::AppState;

/// Identity of a caller that presented a valid, unrevoked bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    pub token: String,
}

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.claims.email
    }

    /// Fails with `Unauthorized` unless the token was issued to `email`.
    pub fn ensure_owner(&self, email: &str) -> Result<(), AppError> {
        if self.claims.email != email {
            tracing::warn!(
                token_email = %self.claims.email,
                requested = %email,
                "token identity does not match requested resource"
            );
            return Err(AppError::Unauthorized(email.to_string()));
        }
        Ok(())
    }
}

/// `None` when no Authorization header was sent at all.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

fn bearer_token(parts: &Parts) -> Option<Result<String, AppError>> {
    let header = parts.headers.get(AUTHORIZATION)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthenticated);
    Some(token)
}

async fn authenticate(token: String, state: &AppState) -> Result<AuthUser, AppError> {
    let claims = state.tokens.verify(&token).map_err(|e| {
        tracing::info!("rejected bearer token: {}", e);
        AppError::Unauthenticated
    })?;

    let revoked = Revocations::new(&state.db)
        .is_revoked(&token)
        .await
        .map_err(|e| AppError::store("Failed to check token revocation", e))?;
    if revoked {
        tracing::info!(email = %claims.email, "rejected revoked bearer token");
        return Err(AppError::Unauthenticated);
    }

    Ok(AuthUser { claims, token })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => authenticate(token?, state).await,
            None => Err(AppError::Unauthenticated),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(MaybeAuthUser(Some(authenticate(token?, state).await?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
