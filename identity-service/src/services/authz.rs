//! Authorization engine: resolves roles and permissions for a principal.
//!
//! Direct grants and role-derived grants are additive; there is no deny
//! list at the grant level and roles do not nest. Every check returns
//! `Result<bool, _>` so a storage failure is never read as a denial.

use uuid::Uuid;

use crate::services::{Database, ServiceError};

/// Permission slugs the route gates reference. Checked against the
/// permissions table at startup; an unknown slug aborts boot instead of
/// silently failing every request.
pub mod slugs {
    pub const USERS_READ: &str = "users:read";
    pub const USERS_UPDATE: &str = "users:update";
    pub const ROLES_UPDATE: &str = "roles:update";
}

pub const GATED_PERMISSIONS: &[&str] = &[slugs::USERS_READ, slugs::USERS_UPDATE, slugs::ROLES_UPDATE];

#[derive(Clone)]
pub struct AuthzService {
    db: Database,
}

impl AuthzService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// True if the user holds the permission directly or through a role.
    /// Direct grants are the cheaper query and short-circuit role lookup.
    pub async fn has_permission(&self, user_id: Uuid, slug: &str) -> Result<bool, ServiceError> {
        if self.db.user_has_direct_permission(user_id, slug).await? {
            return Ok(true);
        }
        Ok(self.db.user_has_role_permission(user_id, slug).await?)
    }

    pub async fn has_any_permission(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, ServiceError> {
        if slugs.is_empty() {
            return Ok(false);
        }
        if self.db.user_has_any_direct_permission(user_id, slugs).await? {
            return Ok(true);
        }
        Ok(self.db.user_has_any_role_permission(user_id, slugs).await?)
    }

    /// True iff every requested slug is covered by the union of direct and
    /// role-derived grants. Coverage is counted by distinct slug, so a
    /// permission held both ways counts once.
    pub async fn has_all_permissions(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, ServiceError> {
        let covered = self.db.count_covered_permissions(user_id, slugs).await?;
        Ok(covered == slugs.len() as i64)
    }

    pub async fn has_role(&self, user_id: Uuid, slug: &str) -> Result<bool, ServiceError> {
        Ok(self.db.user_has_role(user_id, slug).await?)
    }

    pub async fn has_any_role(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, ServiceError> {
        if slugs.is_empty() {
            return Ok(false);
        }
        Ok(self.db.user_has_any_role(user_id, slugs).await?)
    }

    pub async fn has_all_roles(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, ServiceError> {
        let covered = self.db.count_covered_roles(user_id, slugs).await?;
        Ok(covered == slugs.len() as i64)
    }

    /// Assign a role. Idempotent; records the granting actor.
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let role = self
            .db
            .find_role_by_id(role_id)
            .await?
            .ok_or(ServiceError::RoleNotFound)?;

        self.db.assign_role(user_id, role_id, actor).await?;
        tracing::info!(user_id = %user_id, role = %role.slug, actor = ?actor, "Role assigned");
        Ok(())
    }

    pub async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        self.db.remove_role(user_id, role_id).await?;
        tracing::info!(user_id = %user_id, role_id = %role_id, "Role removed");
        Ok(())
    }

    /// Grant a permission directly. Idempotent; records the granting actor.
    pub async fn give_permission(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let permission = self
            .db
            .find_permission_by_id(permission_id)
            .await?
            .ok_or(ServiceError::PermissionNotFound)?;

        self.db.give_permission(user_id, permission_id, actor).await?;
        tracing::info!(user_id = %user_id, permission = %permission.slug, actor = ?actor, "Permission granted");
        Ok(())
    }

    pub async fn remove_permission(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.db.remove_permission(user_id, permission_id).await?;
        tracing::info!(user_id = %user_id, permission_id = %permission_id, "Permission revoked");
        Ok(())
    }

    pub async fn give_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), ServiceError> {
        let role = self
            .db
            .find_role_by_id(role_id)
            .await?
            .ok_or(ServiceError::RoleNotFound)?;
        let permission = self
            .db
            .find_permission_by_id(permission_id)
            .await?
            .ok_or(ServiceError::PermissionNotFound)?;

        self.db.give_permission_to_role(role_id, permission_id).await?;
        tracing::info!(role = %role.slug, permission = %permission.slug, "Permission granted to role");
        Ok(())
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.db.remove_permission_from_role(role_id, permission_id).await?;
        tracing::info!(role_id = %role_id, permission_id = %permission_id, "Permission removed from role");
        Ok(())
    }

    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<crate::models::Role>, ServiceError> {
        Ok(self.db.roles_for_user(user_id).await?)
    }

    /// Effective permissions: direct and role-derived, deduplicated by id.
    pub async fn permissions_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<crate::models::Permission>, ServiceError> {
        Ok(self.db.permissions_for_user(user_id).await?)
    }

    /// Startup check: every slug a route gate references must exist as an
    /// active permission.
    pub async fn verify_registry(&self, required: &[&str]) -> Result<(), ServiceError> {
        let mut unknown = Vec::new();
        for slug in required {
            if !self.db.permission_slug_exists(slug).await? {
                unknown.push(*slug);
            }
        }

        if !unknown.is_empty() {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "Route gates reference unknown permission slugs: {}",
                unknown.join(", ")
            )));
        }

        Ok(())
    }
}
