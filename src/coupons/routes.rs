use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add-coupon", post(handler::create_coupon))
        .route("/coupons", get(handler::list_coupons))
        .route("/coupon/:id", get(handler::get_coupon))
        .route("/coupon/validate/:code", get(handler::validate_coupon))
        .route("/update-coupon/:id", patch(handler::update_coupon))
        .route("/delete-coupon/:id", delete(handler::delete_coupon))
}
