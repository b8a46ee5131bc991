use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use shared::api::{AdminProfile, CategoryRef, PostDetail, TrendingPost};
use sqlx::FromRow;
use uuid::Uuid;

use crate::reset_session::ResetSession;

/// Identifier of a post or category: 24 lower-case hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub const LEN: usize = 24;

    /// Accepts exactly 24 hex characters in either case.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Administrator credential record. The password hash and reset-session
/// state never leave the server; use [`Admin::profile`] for responses.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(flatten)]
    pub reset_session: ResetSession,
    /// Bumped on every reset-session write; used for compare-and-swap.
    pub reset_version: i64,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// A post joined with its (optional) category.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithCategory {
    pub id: RecordId,
    pub title: String,
    pub content: String,
    pub image: String,
    pub slug: String,
    pub is_draft: bool,
    pub views: i64,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostWithCategory> for PostDetail {
    fn from(post: PostWithCategory) -> Self {
        let category = match (post.category_name, post.category_slug) {
            (Some(name), Some(slug)) => Some(CategoryRef { name, slug }),
            _ => None,
        };

        PostDetail {
            id: post.id.to_string(),
            title: post.title,
            content: post.content,
            image: post.image,
            slug: post.slug,
            category,
            is_draft: post.is_draft,
            views: post.views,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// One ranked row from the view ledger, or a recency fallback with zero views.
/// Category columns are coalesced to empty strings by the query.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TrendingRow {
    pub id: RecordId,
    pub view_count: i64,
    pub title: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub slug: String,
    pub category_name: String,
    pub category_slug: String,
}

impl From<TrendingRow> for TrendingPost {
    fn from(row: TrendingRow) -> Self {
        TrendingPost {
            id: row.id.to_string(),
            view_count: row.view_count,
            title: row.title,
            image: row.image,
            created_at: row.created_at,
            slug: row.slug,
            category: CategoryRef {
                name: row.category_name,
                slug: row.category_slug,
            },
        }
    }
}
