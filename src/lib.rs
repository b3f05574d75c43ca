use axum::{
    Router,
    http::Method,
    routing::get,
};
use std::error::Error;
use tower_http::cors::{Any, CorsLayer};

pub mod api;
pub mod auth;
pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod handler;
pub mod products;
pub mod reviews;
pub mod users;

#[cfg(test)]
pub(crate) mod test_utils;

use handler::AppState;

/// Full HTTP surface with CORS applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handler::healthcheck))
        .merge(auth::routes())
        .merge(products::routes())
        .merge(reviews::routes())
        .merge(users::routes())
        .merge(coupons::routes())
        .layer(cors)
        .with_state(state)
}

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
