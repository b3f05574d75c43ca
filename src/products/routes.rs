use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products/featured", get(handler::list_featured))
        .route("/trending-product", get(handler::list_trending))
        .route("/all-products", get(handler::list_products))
        .route("/products-count", get(handler::count_products))
        .route("/product/:id", get(handler::get_product))
        .route("/add-product", post(handler::create_product))
        .route("/update-product/:id", patch(handler::update_product))
        .route("/delete-product/:id", delete(handler::delete_product))
        .route("/product/upvote/:id", patch(handler::upvote_product))
        .route("/product/report/:id", patch(handler::report_product))
        .route("/accept-product/:id", patch(handler::accept_product))
        .route("/reject-product/:id", patch(handler::reject_product))
        .route("/featured/:id", patch(handler::feature_product))
        .route("/my-product/:email", get(handler::list_my_products))
        .route("/reported", get(handler::list_reported))
}
