//! Registered users: creation, lookup, verification and role assignment.

mod handler;
mod lib;
mod routes;

pub use lib::*;
pub use routes::routes;

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[("users_001_schema.sql", include_str!("migrations/001_schema.sql"))]
}
