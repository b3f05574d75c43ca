use axum::{Router, routing::get};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/product/:id/reviews",
        get(handler::list_reviews).post(handler::submit_review),
    )
}
