use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};

use super::{AuthUser, Revocations, TokenRequest, TokenResponse};
use crate::api::MessageResponse;
use crate::error::AppError;
use crate::handler::{AppState, success};

pub async fn issue_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }

    let token = state
        .tokens
        .issue(email)
        .map_err(|e| AppError::store("Failed to sign token", e))?;

    tracing::info!(email = %email, "issued token");
    Ok(success(TokenResponse { token }))
}

pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<Response, AppError> {
    Revocations::new(&state.db)
        .revoke(&user.token, &user.claims)
        .await
        .map_err(|e| AppError::store("Failed to revoke token", e))?;

    tracing::info!(email = %user.email(), "revoked token");
    Ok(success(MessageResponse {
        message: "token revoked".to_string(),
    }))
}
