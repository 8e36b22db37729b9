//! Services layer: storage wrapper, token service, deny-list, and the
//! authorization and session engines.

mod auth;
mod authz;
mod database;
mod deny_list;
pub mod error;
mod jwt;

pub use auth::AuthService;
pub use authz::{slugs, AuthzService, GATED_PERMISSIONS};
pub use database::Database;
pub use deny_list::{MockDenyList, RedisDenyList, TokenDenyList};
pub use error::ServiceError;
pub use jwt::{Claims, IssuedToken, JwtService, TokenError};
