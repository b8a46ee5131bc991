//! Database repositories (PostgreSQL).
//!
//! Each repository is abstracted behind a trait to enable mocking in tests.
//!
//! ## Repositories
//!
//! - **admins** - Administrator credentials and reset sessions
//! - **posts** - Post lookup, view counter, recency fallback
//! - **views** - Per-viewer view ledger and trending aggregation
//! - **status** - Database health check
//!
//! ## Usage in Handlers
//!
//! Repositories are accessed via `state.repos`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let admin = state.repos.admins.find_by_email(&email).await?;
//!     let post = state.repos.posts.find_by_id(&id).await?;
//! }
//! ```

mod admins;
mod posts;
mod status;
mod views;

pub use admins::{AdminRepo, PgAdminRepo};
pub use posts::{PgPostRepo, PostRepo};
pub use status::{PgStatusRepo, StatusRepo};
pub use views::{PgViewRepo, ViewRepo};

#[cfg(test)]
pub use admins::MockAdminRepo;
#[cfg(test)]
pub use posts::MockPostRepo;
#[cfg(test)]
pub use status::MockStatusRepo;
#[cfg(test)]
pub use views::MockViewRepo;

use std::sync::Arc;

/// Collection of all database repositories.
#[derive(Clone)]
pub struct Repos {
    pub admins: Arc<dyn AdminRepo>,
    pub posts: Arc<dyn PostRepo>,
    pub views: Arc<dyn ViewRepo>,
    pub status: Arc<dyn StatusRepo>,
}
