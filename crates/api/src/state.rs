use std::sync::Arc;

use crate::{
    config::Config,
    repos::Repos,
    services::{AuthService, EmailSender},
    stores::Stores,
};

#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Database repositories.
    pub repos: Repos,
    /// Ephemeral stores (Redis).
    pub stores: Stores,
    /// Password hashing and access tokens.
    pub auth: Arc<dyn AuthService>,
    /// Email sender.
    pub email: Arc<dyn EmailSender>,
}
