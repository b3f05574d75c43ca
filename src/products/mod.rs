//! Product submissions and everything that mutates them: votes, reports,
//! moderation and owner edits.
//!
//! Voter and reporter sets live in their own tables keyed by
//! `(product_id, email)`; the `vote` / `report` counters on the product row are
//! only ever changed in the same transaction as the matching set row, which
//! keeps `vote == likedUsers.len()` and `report == reportedUsers.len()`.

mod handler;
mod lib;
mod routes;

pub use lib::*;
pub use routes::routes;

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "products_001_schema.sql",
        include_str!("migrations/001_schema.sql"),
    )]
}
