//! Initial administrator account, created with `--seed-admin`.

use anyhow::{Context, Result};
use garde::Validate;
use serde::Deserialize;
use shared::api::MIN_PASSWORD_LEN;

use crate::repos::AdminRepo;
use crate::services::AuthService;

/// Read from `NEWSDESK_SEED_ADMIN_*`.
#[derive(Debug, Deserialize, Validate)]
pub struct SeedAdmin {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = MIN_PASSWORD_LEN))]
    pub password: String,
    #[serde(default = "default_username")]
    #[garde(length(min = 1))]
    pub username: String,
}

fn default_username() -> String {
    "Admin".to_string()
}

#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyExists,
}

pub async fn seed_admin(
    admins: &dyn AdminRepo,
    auth: &dyn AuthService,
    mut seed: SeedAdmin,
) -> Result<SeedOutcome> {
    seed.email = seed.email.trim().to_lowercase();
    seed.validate().context("invalid seed admin")?;

    if admins.find_by_email(&seed.email).await?.is_some() {
        tracing::info!(email = %seed.email, "seed admin already exists");
        return Ok(SeedOutcome::AlreadyExists);
    }

    let password_hash = auth.hash_password(&seed.password)?;
    let admin = admins
        .create(&seed.username, &seed.email, &password_hash)
        .await?;

    tracing::info!(admin_id = %admin.id, email = %admin.email, "seed admin created");
    Ok(SeedOutcome::Created)
}
