pub mod auth;
pub mod authz;

pub use auth::{auth_middleware, AuthUser};
pub use authz::{permission_middleware, role_middleware};
