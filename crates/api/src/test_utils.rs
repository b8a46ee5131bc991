//! Shared test utilities for API handler tests.
//!
//! Provides common mock factories and a flexible `TestStateBuilder` for constructing
//! `AppState` instances with only the mocks needed for each test.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::test_utils::{TestStateBuilder, mock_admin};
//!
//! let mut admin_repo = MockAdminRepo::new();
//! admin_repo.expect_find_by_email().returning(|_| Ok(Some(mock_admin("editor@example.com"))));
//!
//! let state = TestStateBuilder::new()
//!     .with_admin_repo(admin_repo)
//!     .build();
//! ```

use std::sync::Arc;

use axum::response::Response;
use chrono::Utc;
use http_body_util::BodyExt;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Admin, PostWithCategory, RecordId, TrendingRow};
use crate::repos::{MockAdminRepo, MockPostRepo, MockStatusRepo, MockViewRepo, Repos};
use crate::reset_session::ResetSession;
use crate::services::{MockAuthService, MockEmailSender};
use crate::state::AppState;
use crate::stores::{MockRateLimiter, MockStatusStore, RateLimitResult, Stores};

/// Creates a test configuration with dummy values.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        database_url: "postgres://test".to_string(),
        redis_url: "redis://test".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_secs: 3600,
        smtp_url: None,
        resend_api_key: None,
        email_from: "Newsdesk <noreply@localhost>".to_string(),
        app_name: "Newsdesk".to_string(),
        cors_origin: None,
        trust_proxy: true,
        env: "test".to_string(),
        sentry_dsn: None,
    }
}

/// Creates a mock admin with no reset session in progress.
pub fn mock_admin(email: &str) -> Admin {
    Admin {
        id: Uuid::new_v4(),
        username: "Editor".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        reset_session: ResetSession::default(),
        reset_version: 0,
        created_at: Utc::now(),
    }
}

/// Creates a published post in the "Politics" category.
pub fn mock_post(id: &str) -> PostWithCategory {
    PostWithCategory {
        id: RecordId::parse(id).unwrap_or_else(RecordId::generate),
        title: "Council approves new transit plan".to_string(),
        content: "The city council voted 7-2 on Tuesday...".to_string(),
        image: "https://cdn.example.com/transit.jpg".to_string(),
        slug: "council-approves-new-transit-plan".to_string(),
        is_draft: false,
        views: 41,
        category_name: Some("Politics".to_string()),
        category_slug: Some("politics".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Creates a trending row with a fresh id and the given view count.
pub fn trending_row(view_count: i64) -> TrendingRow {
    let id = RecordId::generate();
    TrendingRow {
        title: format!("Story {}", id),
        slug: format!("story-{}", id),
        id,
        view_count,
        image: "https://cdn.example.com/story.jpg".to_string(),
        created_at: Utc::now(),
        category_name: "Politics".to_string(),
        category_slug: "politics".to_string(),
    }
}

/// A rate limiter that admits everything and accepts releases.
pub fn allow_all_limiter() -> MockRateLimiter {
    let mut limiter = MockRateLimiter::new();
    limiter
        .expect_check_simple()
        .returning(|_, _, _| Ok(RateLimitResult::Allowed(1)));
    limiter.expect_release().returning(|_| Ok(()));
    limiter
}

/// Reads a JSON response body.
pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Builder for constructing test `AppState` with custom mocks.
///
/// Uses default (empty) mocks for any repo/store/service not explicitly set.
/// This allows tests to only configure the mocks they actually need.
pub struct TestStateBuilder {
    config: Option<Config>,
    admin_repo: Option<MockAdminRepo>,
    post_repo: Option<MockPostRepo>,
    view_repo: Option<MockViewRepo>,
    status_repo: Option<MockStatusRepo>,
    rate_limiter: Option<MockRateLimiter>,
    status_store: Option<MockStatusStore>,
    auth_service: Option<MockAuthService>,
    email_sender: Option<MockEmailSender>,
}

impl TestStateBuilder {
    /// Creates a new builder with no mocks configured.
    pub fn new() -> Self {
        Self {
            config: None,
            admin_repo: None,
            post_repo: None,
            view_repo: None,
            status_repo: None,
            rate_limiter: None,
            status_store: None,
            auth_service: None,
            email_sender: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_admin_repo(mut self, repo: MockAdminRepo) -> Self {
        self.admin_repo = Some(repo);
        self
    }

    pub fn with_post_repo(mut self, repo: MockPostRepo) -> Self {
        self.post_repo = Some(repo);
        self
    }

    pub fn with_view_repo(mut self, repo: MockViewRepo) -> Self {
        self.view_repo = Some(repo);
        self
    }

    pub fn with_status_repo(mut self, repo: MockStatusRepo) -> Self {
        self.status_repo = Some(repo);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: MockRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_status_store(mut self, store: MockStatusStore) -> Self {
        self.status_store = Some(store);
        self
    }

    pub fn with_auth_service(mut self, service: MockAuthService) -> Self {
        self.auth_service = Some(service);
        self
    }

    pub fn with_email_sender(mut self, sender: MockEmailSender) -> Self {
        self.email_sender = Some(sender);
        self
    }

    /// Builds the `AppState` using configured mocks or defaults.
    pub fn build(self) -> AppState {
        let repos = Repos {
            admins: Arc::new(self.admin_repo.unwrap_or_else(MockAdminRepo::new)),
            posts: Arc::new(self.post_repo.unwrap_or_else(MockPostRepo::new)),
            views: Arc::new(self.view_repo.unwrap_or_else(MockViewRepo::new)),
            status: Arc::new(self.status_repo.unwrap_or_else(MockStatusRepo::new)),
        };

        let stores = Stores {
            rate_limiter: Arc::new(self.rate_limiter.unwrap_or_else(MockRateLimiter::new)),
            status: Arc::new(self.status_store.unwrap_or_else(MockStatusStore::new)),
        };

        let auth = Arc::new(self.auth_service.unwrap_or_else(MockAuthService::new))
            as Arc<dyn crate::services::AuthService>;
        let email = Arc::new(self.email_sender.unwrap_or_else(MockEmailSender::new))
            as Arc<dyn crate::services::EmailSender>;

        AppState {
            config: self.config.unwrap_or_else(test_config),
            repos,
            stores,
            auth,
            email,
        }
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
