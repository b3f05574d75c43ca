use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
};

use super::{CreateUser, CreateUserOutcome, Role, SetRole, Users};
use crate::api::WriteResult;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::handler::{AppState, created, success};

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    if payload.email.trim().is_empty() {
        return Err(AppError::validation("email is required"));
    }

    let lib = Users::new(&state.db);
    match lib.create_user(payload).await {
        Ok(CreateUserOutcome::Created(user)) => {
            tracing::info!(email = %user.email, "created user");
            Ok(created(user))
        }
        Ok(CreateUserOutcome::AlreadyExists) => Err(AppError::DuplicateEntity("user")),
        Err(e) => Err(AppError::store("Failed to create user", e)),
    }
}

pub async fn get_user(State(state): State<AppState>, Path(email): Path<String>) -> Result<Response, AppError> {
    let lib = Users::new(&state.db);

    match lib.get_user(&email).await {
        Ok(Some(user)) => Ok(success(user)),
        Ok(None) => Err(AppError::NotFound("user")),
        Err(e) => Err(AppError::store("Failed to get user", e)),
    }
}

pub async fn list_users(State(state): State<AppState>, caller: AuthUser) -> Result<Response, AppError> {
    let lib = Users::new(&state.db);

    let users = lib
        .list_users()
        .await
        .map_err(|e| AppError::store("Failed to list users", e))?;

    tracing::info!(caller = %caller.email(), count = users.len(), "listed users");
    Ok(success(users))
}

pub async fn verify_user(State(state): State<AppState>, Path(email): Path<String>) -> Result<Response, AppError> {
    let lib = Users::new(&state.db);

    match lib.verify_user(&email).await {
        Ok(Some(modified)) => {
            tracing::info!(email = %email, modified, "verified user");
            Ok(success(WriteResult::updated(1, modified)))
        }
        Ok(None) => Err(AppError::NotFound("user")),
        Err(e) => Err(AppError::store("Failed to verify user", e)),
    }
}

pub async fn set_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
    payload: Result<Json<SetRole>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let role = Role::from_str(&payload.role)
        .ok_or_else(|| AppError::validation(format!("unknown role {:?}", payload.role)))?;

    let lib = Users::new(&state.db);
    match lib.set_role(&email, role).await {
        Ok(Some(modified)) => {
            tracing::info!(email = %email, role = role.as_str(), "assigned role");
            Ok(success(WriteResult::updated(1, modified)))
        }
        Ok(None) => Err(AppError::NotFound("user")),
        Err(e) => Err(AppError::store("Failed to set role", e)),
    }
}
