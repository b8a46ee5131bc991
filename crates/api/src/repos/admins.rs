//! Administrator repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::Admin;
use crate::reset_session::ResetSession;

const ADMIN_COLUMNS: &str = "id, username, email, password_hash, otp_hash, otp_expires_at, \
     otp_attempts, otp_verified, last_otp_request_at, locked_until, reset_session_active, \
     reset_session_expires_at, reset_version, created_at";

/// Repository for administrator accounts and their reset sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminRepo: Send + Sync {
    /// Find an admin by (lower-cased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>>;

    async fn create(&self, username: &str, email: &str, password_hash: &str) -> Result<Admin>;

    /// Persist a reset-session transition if the row is still at
    /// `expected_version`. Returns `false` when another request got there first.
    async fn save_reset_session(
        &self,
        id: Uuid,
        expected_version: i64,
        session: &ResetSession,
    ) -> Result<bool>;

    /// Replace the password hash and persist the consumed session in one write,
    /// guarded by the same version check as [`AdminRepo::save_reset_session`].
    async fn complete_password_reset(
        &self,
        id: Uuid,
        expected_version: i64,
        password_hash: &str,
        session: &ResetSession,
    ) -> Result<bool>;
}

/// PostgreSQL implementation of AdminRepo.
#[derive(Clone)]
pub struct PgAdminRepo {
    pool: Pool<Postgres>,
}

impl PgAdminRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminRepo for PgAdminRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn create(&self, username: &str, email: &str, password_hash: &str) -> Result<Admin> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "INSERT INTO admins (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn save_reset_session(
        &self,
        id: Uuid,
        expected_version: i64,
        session: &ResetSession,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE admins SET otp_hash = $3, otp_expires_at = $4, otp_attempts = $5, \
             otp_verified = $6, last_otp_request_at = $7, locked_until = $8, \
             reset_session_active = $9, reset_session_expires_at = $10, \
             reset_version = reset_version + 1 \
             WHERE id = $1 AND reset_version = $2",
        )
        .bind(id)
        .bind(expected_version)
        .bind(&session.otp_hash)
        .bind(session.otp_expires_at)
        .bind(session.otp_attempts)
        .bind(session.otp_verified)
        .bind(session.last_otp_request_at)
        .bind(session.locked_until)
        .bind(session.active)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        expected_version: i64,
        password_hash: &str,
        session: &ResetSession,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE admins SET password_hash = $3, otp_hash = $4, otp_expires_at = $5, \
             otp_attempts = $6, otp_verified = $7, last_otp_request_at = $8, locked_until = $9, \
             reset_session_active = $10, reset_session_expires_at = $11, \
             reset_version = reset_version + 1 \
             WHERE id = $1 AND reset_version = $2",
        )
        .bind(id)
        .bind(expected_version)
        .bind(password_hash)
        .bind(&session.otp_hash)
        .bind(session.otp_expires_at)
        .bind(session.otp_attempts)
        .bind(session.otp_verified)
        .bind(session.last_otp_request_at)
        .bind(session.locked_until)
        .bind(session.active)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
