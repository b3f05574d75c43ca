//! Bearer token issuance, verification and revocation.
//!
//! Tokens are HS256 JWTs signed with the configured shared secret. Protected
//! handlers take [`AuthUser`] (token required) or [`MaybeAuthUser`] (token
//! optional, but must be valid when present) as an extractor.

mod guard;
mod handler;
mod lib;
mod routes;

pub use guard::{AuthUser, MaybeAuthUser};
pub use lib::*;
pub use routes::routes;

pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "auth_001_revoked_tokens.sql",
        include_str!("migrations/001_revoked_tokens.sql"),
    )]
}
