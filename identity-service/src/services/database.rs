//! PostgreSQL storage wrapper.
//!
//! One abstraction per entity family: identifier -> row plus the few
//! query-by-criteria shapes the services need. All grant mutations are
//! idempotent upserts keyed on the relation's composite unique key.

use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{LoginLog, PasswordResetToken, Permission, Role, User};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== Users ====================

    /// Email lookup is case-insensitive; soft-deleted rows never match.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, role_label, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.role_label)
        .bind(&user.status)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_last_login(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== Roles / Permissions ====================

    pub async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1 AND deleted_at IS NULL")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_role_by_slug(&self, slug: &str) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE slug = $1 AND deleted_at IS NULL")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_permission_by_id(
        &self,
        permission_id: Uuid,
    ) -> Result<Option<Permission>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(permission_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn permission_slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM permissions WHERE slug = $1 AND is_active = TRUE AND deleted_at IS NULL)",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    // ==================== Grant mutations ====================

    /// Idempotent: re-assigning an already-held role is a no-op.
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        assigned_by: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_at, assigned_by)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role_id)
        .bind(assigned_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Idempotent direct grant.
    pub async fn give_permission(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
        granted_by: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, permission_id, granted_at, granted_by)
            VALUES ($1, $2, NOW(), $3)
            ON CONFLICT (user_id, permission_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(permission_id)
        .bind(granted_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_permission(
        &self,
        user_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND permission_id = $2")
            .bind(user_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn give_permission_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== Authorization queries ====================

    pub async fn user_has_direct_permission(
        &self,
        user_id: Uuid,
        slug: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_permissions up
                JOIN permissions p ON p.id = up.permission_id
                WHERE up.user_id = $1 AND p.slug = $2
                  AND p.is_active = TRUE AND p.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn user_has_role_permission(
        &self,
        user_id: Uuid,
        slug: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE ur.user_id = $1 AND p.slug = $2
                  AND r.is_active = TRUE AND r.deleted_at IS NULL
                  AND p.is_active = TRUE AND p.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn user_has_any_direct_permission(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_permissions up
                JOIN permissions p ON p.id = up.permission_id
                WHERE up.user_id = $1 AND p.slug = ANY($2)
                  AND p.is_active = TRUE AND p.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(slugs)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn user_has_any_role_permission(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE ur.user_id = $1 AND p.slug = ANY($2)
                  AND r.is_active = TRUE AND r.deleted_at IS NULL
                  AND p.is_active = TRUE AND p.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(slugs)
        .fetch_one(&self.pool)
        .await
    }

    /// Distinct slugs the user holds out of `slugs`, across both grant
    /// sources. A slug held directly and via a role counts once.
    pub async fn count_covered_permissions(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT p.slug) FROM permissions p
            WHERE p.slug = ANY($2) AND p.is_active = TRUE AND p.deleted_at IS NULL
              AND (
                EXISTS (
                    SELECT 1 FROM user_permissions up
                    WHERE up.user_id = $1 AND up.permission_id = p.id
                )
                OR EXISTS (
                    SELECT 1 FROM user_roles ur
                    JOIN roles r ON r.id = ur.role_id
                    JOIN role_permissions rp ON rp.role_id = ur.role_id
                    WHERE ur.user_id = $1 AND rp.permission_id = p.id
                      AND r.is_active = TRUE AND r.deleted_at IS NULL
                )
              )
            "#,
        )
        .bind(user_id)
        .bind(slugs)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn user_has_role(&self, user_id: Uuid, slug: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = $1 AND r.slug = $2
                  AND r.is_active = TRUE AND r.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn user_has_any_role(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = $1 AND r.slug = ANY($2)
                  AND r.is_active = TRUE AND r.deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(slugs)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn count_covered_roles(
        &self,
        user_id: Uuid,
        slugs: &[String],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT r.slug) FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND r.slug = ANY($2)
              AND r.is_active = TRUE AND r.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(slugs)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1 AND r.deleted_at IS NULL
            ORDER BY r.level DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Union of direct and role-derived permissions, deduplicated.
    pub async fn permissions_for_user(&self, user_id: Uuid) -> Result<Vec<Permission>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN user_permissions up ON up.permission_id = p.id
            WHERE up.user_id = $1 AND p.deleted_at IS NULL
            UNION
            SELECT p.* FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND p.deleted_at IS NULL
              AND r.is_active = TRUE AND r.deleted_at IS NULL
            ORDER BY slug
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    // ==================== Session ledger ====================

    /// Append a ledger entry for a successful login. When `close_previous`
    /// is set, every still-open entry for the user is closed in the same
    /// transaction, so two entries are never simultaneously open.
    pub async fn record_login(
        &self,
        user_id: Uuid,
        login_data: &serde_json::Value,
        close_previous: bool,
    ) -> Result<LoginLog, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if close_previous {
            sqlx::query(
                r#"
                UPDATE login_logs SET logout_time = NOW(), updated_at = NOW()
                WHERE user_id = $1 AND logout_time IS NULL AND deleted_at IS NULL
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let log = sqlx::query_as::<_, LoginLog>(
            r#"
            INSERT INTO login_logs (id, user_id, login_data, login_time)
            VALUES ($1, $2, $3, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(login_data)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(log)
    }

    pub async fn find_latest_open_log(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LoginLog>, sqlx::Error> {
        sqlx::query_as::<_, LoginLog>(
            r#"
            SELECT * FROM login_logs
            WHERE user_id = $1 AND logout_time IS NULL AND deleted_at IS NULL
            ORDER BY login_time DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn close_log(&self, log_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE login_logs SET logout_time = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(log_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_open_logs(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM login_logs WHERE user_id = $1 AND logout_time IS NULL AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn login_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LoginLog>, sqlx::Error> {
        sqlx::query_as::<_, LoginLog>(
            r#"
            SELECT * FROM login_logs
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY login_time DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    // ==================== Password reset tokens ====================

    /// Issue a new reset token, invalidating any outstanding ones for the
    /// user so only the latest is redeemable.
    pub async fn insert_reset_token(
        &self,
        token: &PasswordResetToken,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL",
        )
        .bind(token.user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_active_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, sqlx::Error> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT * FROM password_reset_tokens
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// Redeem a reset token: rewrite the user's credential and mark the
    /// token used in one transaction (single use).
    pub async fn consume_reset_token(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
