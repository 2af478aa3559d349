use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use crate::auth::repo_types::{CaregiverProfile, NewUser, Role, User};
use crate::store::PgStore;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// `None` when the e-mail is already registered.
    async fn create_user(&self, new: &NewUser) -> anyhow::Result<Option<User>>;
    async fn record_login(&self, id: Uuid) -> anyhow::Result<()>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool>;
    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>>;
    async fn update_caregiver_profile(
        &self,
        id: Uuid,
        profile: &CaregiverProfile,
    ) -> anyhow::Result<Option<User>>;
    async fn list_caregivers(&self, available_only: bool) -> anyhow::Result<Vec<User>>;
    /// Soft-deletes the user and unassigns them from every booking.
    /// Returns the number of bookings unassigned, `None` if no such user.
    async fn deactivate_user(&self, id: Uuid) -> anyhow::Result<Option<u64>>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, phone, role, status, \
     caregiver_profile, completed_jobs, last_login_at, created_at, updated_at";

#[async_trait]
impl UserRepo for PgStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn create_user(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.phone)
            .bind(new.role.as_str())
            .fetch_optional(&self.db)
            .await
            .context("insert user")?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("record login")?;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .context("update password")?;
        Ok(res.rows_affected() == 1)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.db)
            .await
            .context("update role")?;
        Ok(user)
    }

    async fn update_caregiver_profile(
        &self,
        id: Uuid,
        profile: &CaregiverProfile,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET caregiver_profile = $2, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(Json(profile))
            .fetch_optional(&self.db)
            .await
            .context("update caregiver profile")?;
        Ok(user)
    }

    async fn list_caregivers(&self, available_only: bool) -> anyhow::Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE role = 'CAREGIVER'
               AND status = 'ACTIVE'
               AND ($1 = FALSE
                    OR COALESCE((caregiver_profile->>'is_available')::boolean, TRUE))
             ORDER BY completed_jobs DESC, name ASC
            "#
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(available_only)
            .fetch_all(&self.db)
            .await
            .context("list caregivers")?;
        Ok(rows)
    }

    async fn deactivate_user(&self, id: Uuid) -> anyhow::Result<Option<u64>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let found = sqlx::query_scalar::<_, Uuid>(
            "UPDATE users SET status = 'DELETED', updated_at = now() WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("soft delete user")?;
        if found.is_none() {
            return Ok(None);
        }

        let unassigned = sqlx::query(
            "UPDATE bookings SET caregiver_id = NULL, updated_at = now() WHERE caregiver_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("unassign caregiver bookings")?
        .rows_affected();

        tx.commit().await.context("commit tx")?;
        Ok(Some(unassigned))
    }
}
