pub mod auth;
pub mod authz;

pub use auth::{
    AuthPayload, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
pub use authz::{AssignRoleRequest, GrantPermissionRequest};
