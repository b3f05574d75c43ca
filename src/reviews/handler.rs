use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
};

use super::{CreateReview, ReviewOutcome, Reviews};
use crate::error::AppError;
use crate::handler::{AppState, created, success};

pub async fn submit_review(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    payload: Result<Json<CreateReview>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    if payload.user_email.trim().is_empty() {
        return Err(AppError::validation("userEmail is required"));
    }
    if payload.rating.is_none() {
        return Err(AppError::validation("rating is required"));
    }

    let lib = Reviews::new(&state.db);
    match lib.submit_review(product_id, payload).await {
        Ok(ReviewOutcome::Created(review)) => {
            tracing::info!(product_id, author = %review.user_email, "stored review");
            Ok(created(review))
        }
        Ok(ReviewOutcome::Duplicate) => Err(AppError::DuplicateReview),
        Ok(ReviewOutcome::ProductNotFound) => Err(AppError::NotFound("product")),
        Err(e) => Err(AppError::store("Failed to submit review", e)),
    }
}

pub async fn list_reviews(State(state): State<AppState>, Path(product_id): Path<i64>) -> Result<Response, AppError> {
    let reviews = Reviews::new(&state.db)
        .list_by_product(product_id)
        .await
        .map_err(|e| AppError::store("Failed to list reviews", e))?;
    Ok(success(reviews))
}
