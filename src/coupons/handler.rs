use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
};
use chrono::Utc;

use super::{CouponWrite, Coupons, CreateCoupon, UpdateCoupon};
use crate::api::WriteResult;
use crate::error::AppError;
use crate::handler::{AppState, created, success};

pub async fn create_coupon(
    State(state): State<AppState>,
    payload: Result<Json<CreateCoupon>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    payload.validate().map_err(AppError::ValidationError)?;

    let lib = Coupons::new(&state.db);
    match lib.create_coupon(payload).await {
        Ok(CouponWrite::Done(coupon)) => {
            tracing::info!(id = coupon.id, code = %coupon.code, "created coupon");
            Ok(created(coupon))
        }
        Ok(CouponWrite::DuplicateCode) => Err(AppError::DuplicateEntity("coupon code")),
        Ok(CouponWrite::NotFound) => Err(AppError::NotFound("coupon")),
        Err(e) => Err(AppError::store("Failed to create coupon", e)),
    }
}

pub async fn list_coupons(State(state): State<AppState>) -> Result<Response, AppError> {
    let coupons = Coupons::new(&state.db)
        .list_coupons()
        .await
        .map_err(|e| AppError::store("Failed to list coupons", e))?;
    Ok(success(coupons))
}

pub async fn get_coupon(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    let lib = Coupons::new(&state.db);

    match lib.get_coupon(id).await {
        Ok(Some(coupon)) => Ok(success(coupon)),
        Ok(None) => Err(AppError::NotFound("coupon")),
        Err(e) => Err(AppError::store("Failed to get coupon", e)),
    }
}

pub async fn validate_coupon(State(state): State<AppState>, Path(code): Path<String>) -> Result<Response, AppError> {
    let lib = Coupons::new(&state.db);
    let today = Utc::now().date_naive();

    match lib.find_valid(&code, today).await {
        Ok(Some(coupon)) => Ok(success(coupon)),
        Ok(None) => Err(AppError::NotFound("valid coupon")),
        Err(e) => Err(AppError::store("Failed to validate coupon", e)),
    }
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateCoupon>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    if let Some(code) = &payload.code {
        if code.trim().is_empty() {
            return Err(AppError::validation("code must not be empty"));
        }
    }
    if let Some(discount) = payload.discount {
        if !discount.is_finite() || discount < 0.0 {
            return Err(AppError::validation("discount must be a non-negative number"));
        }
    }

    let lib = Coupons::new(&state.db);
    match lib.update_coupon(id, payload).await {
        Ok(CouponWrite::Done(modified)) => {
            tracing::info!(id, modified, "updated coupon");
            Ok(success(WriteResult::updated(1, modified)))
        }
        Ok(CouponWrite::NotFound) => Err(AppError::NotFound("coupon")),
        Ok(CouponWrite::DuplicateCode) => Err(AppError::DuplicateEntity("coupon code")),
        Err(e) => Err(AppError::store("Failed to update coupon", e)),
    }
}

pub async fn delete_coupon(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    let lib = Coupons::new(&state.db);

    match lib.delete_coupon(id).await {
        Ok(true) => {
            tracing::info!(id, "deleted coupon");
            Ok(success(WriteResult::deleted(1)))
        }
        Ok(false) => Err(AppError::NotFound("coupon")),
        Err(e) => Err(AppError::store("Failed to delete coupon", e)),
    }
}
