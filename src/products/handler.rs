use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Response,
};
use serde::Deserialize;

use super::{
    CreateProduct, FEATURED_LIMIT, ProductStatus, ProductType, Products, TRENDING_LIMIT, Tally,
    ToggleRequest, UpdateProduct,
};
use crate::api::{CountResponse, PaginationParams, WriteResult};
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::AppError;
use crate::handler::{AppState, created, success};

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ProductQuery {
    fn tag(&self) -> Option<&str> {
        self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportedQuery {
    pub email: Option<String>,
}

pub async fn list_featured(State(state): State<AppState>) -> Result<Response, AppError> {
    let products = Products::new(&state.db)
        .list_featured(FEATURED_LIMIT)
        .await
        .map_err(|e| AppError::store("Failed to list featured products", e))?;
    Ok(success(products))
}

pub async fn list_trending(State(state): State<AppState>) -> Result<Response, AppError> {
    let products = Products::new(&state.db)
        .list_trending(TRENDING_LIMIT)
        .await
        .map_err(|e| AppError::store("Failed to list trending products", e))?;
    Ok(success(products))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Response, AppError> {
    let page = PaginationParams {
        page: params.page,
        size: params.size,
    }
    .into_page();

    let products = Products::new(&state.db)
        .list_products(params.tag(), page)
        .await
        .map_err(|e| AppError::store("Failed to list products", e))?;
    Ok(success(products))
}

pub async fn count_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Response, AppError> {
    let count = Products::new(&state.db)
        .count_products(params.tag())
        .await
        .map_err(|e| AppError::store("Failed to count products", e))?;
    Ok(success(CountResponse { count }))
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    let lib = Products::new(&state.db);

    match lib.get_product(id).await {
        Ok(Some(product)) => Ok(success(product)),
        Ok(None) => Err(AppError::NotFound("product")),
        Err(e) => Err(AppError::store("Failed to get product", e)),
    }
}

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let product = Products::new(&state.db)
        .create_product(payload)
        .await
        .map_err(|e| AppError::store("Failed to create product", e))?;

    tracing::info!(id = product.id, owner = %product.user_email, "created product");
    Ok(created(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let lib = Products::new(&state.db);

    match lib.update_product(id, payload).await {
        Ok(Some(modified)) => {
            tracing::info!(id, modified, "updated product");
            Ok(success(WriteResult::updated(1, modified)))
        }
        Ok(None) => Err(AppError::NotFound("product")),
        Err(e) => Err(AppError::store("Failed to update product", e)),
    }
}

pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    let lib = Products::new(&state.db);

    match lib.delete_product(id).await {
        Ok(true) => {
            tracing::info!(id, "deleted product");
            Ok(success(WriteResult::deleted(1)))
        }
        Ok(false) => Err(AppError::NotFound("product")),
        Err(e) => Err(AppError::store("Failed to delete product", e)),
    }
}

async fn toggle(
    state: AppState,
    id: i64,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
    tally: Tally,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let actor = payload.user.trim();
    if actor.is_empty() {
        return Err(AppError::validation("user is required"));
    }

    let lib = Products::new(&state.db);
    match lib.toggle(id, actor, tally).await {
        Ok(Some(result)) => {
            tracing::info!(
                id,
                actor = %actor,
                kind = tally.as_str(),
                action = ?result.action,
                "toggled product tally"
            );
            Ok(success(result.product))
        }
        Ok(None) => Err(AppError::NotFound("product")),
        Err(e) => Err(AppError::store("Failed to toggle product tally", e)),
    }
}

pub async fn upvote_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    toggle(state, id, payload, Tally::Votes).await
}

pub async fn report_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    toggle(state, id, payload, Tally::Reports).await
}

async fn moderate(state: AppState, id: i64, change: Moderation) -> Result<Response, AppError> {
    let lib = Products::new(&state.db);
    let result = match change {
        Moderation::Status(status) => lib.set_status(id, status).await,
        Moderation::Type(product_type) => lib.set_type(id, product_type).await,
    };

    match result {
        Ok(Some(modified)) => {
            tracing::info!(id, change = ?change, modified, "moderated product");
            Ok(success(WriteResult::updated(1, modified)))
        }
        Ok(None) => Err(AppError::NotFound("product")),
        Err(e) => Err(AppError::store("Failed to moderate product", e)),
    }
}

#[derive(Debug, Clone, Copy)]
enum Moderation {
    Status(ProductStatus),
    Type(ProductType),
}

pub async fn accept_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    moderate(state, id, Moderation::Status(ProductStatus::Accepted)).await
}

pub async fn reject_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    moderate(state, id, Moderation::Status(ProductStatus::Rejected)).await
}

pub async fn feature_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    moderate(state, id, Moderation::Type(ProductType::Featured)).await
}

pub async fn list_my_products(
    State(state): State<AppState>,
    Path(email): Path<String>,
    caller: AuthUser,
) -> Result<Response, AppError> {
    caller.ensure_owner(&email)?;

    let products = Products::new(&state.db)
        .list_by_owner(&email)
        .await
        .map_err(|e| AppError::store("Failed to list owner products", e))?;
    Ok(success(products))
}

pub async fn list_reported(
    State(state): State<AppState>,
    Query(params): Query<ReportedQuery>,
    MaybeAuthUser(caller): MaybeAuthUser,
) -> Result<Response, AppError> {
    if let (Some(caller), Some(email)) = (&caller, &params.email) {
        caller.ensure_owner(email)?;
    }

    let products = Products::new(&state.db)
        .list_reported()
        .await
        .map_err(|e| AppError::store("Failed to list reported products", e))?;
    Ok(success(products))
}
