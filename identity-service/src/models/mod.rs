pub mod login_log;
pub mod permission;
pub mod reset_token;
pub mod role;
pub mod user;

pub use login_log::{LoginContext, LoginLog, LoginLogResponse};
pub use permission::{Permission, PermissionResponse};
pub use reset_token::PasswordResetToken;
pub use role::{Role, RoleResponse};
pub use user::{User, UserResponse, UserStatus};
