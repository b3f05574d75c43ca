use axum::{
    Router,
    routing::{get, patch, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user", post(handler::create_user))
        .route("/user/:email", get(handler::get_user))
        .route("/user/verify/:email", patch(handler::verify_user))
        .route("/users", get(handler::list_users))
        .route("/users/:email/role", patch(handler::set_role))
}
