//! Authentication: JWT issuing/validation, request extractor, password hashing

pub mod extractor;
pub mod jwt;
pub mod password;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};

/// Cookie carrying the token for clients that do not send `Authorization`
pub const AUTH_COOKIE: &str = "auth_token";
