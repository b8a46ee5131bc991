//! Post repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::models::{PostWithCategory, RecordId, TrendingRow};

/// Repository for published content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Find a post (draft or not) together with its category.
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<PostWithCategory>>;

    /// Atomically add one to the post's popularity counter.
    async fn increment_views(&self, id: &RecordId) -> Result<()>;

    /// Most recently created non-draft posts, skipping `exclude`. Each row is
    /// reported with a view count of zero.
    async fn latest_published(&self, exclude: &[RecordId], limit: i64) -> Result<Vec<TrendingRow>>;
}

/// PostgreSQL implementation of PostRepo.
#[derive(Clone)]
pub struct PgPostRepo {
    pool: Pool<Postgres>,
}

impl PgPostRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepo for PgPostRepo {
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<PostWithCategory>> {
        let post = sqlx::query_as::<_, PostWithCategory>(
            "SELECT p.id, p.title, p.content, p.image, p.slug, p.is_draft, p.views, \
             c.name AS category_name, c.slug AS category_slug, p.created_at, p.updated_at \
             FROM posts p LEFT JOIN categories c ON c.id = p.category_id \
             WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn increment_views(&self, id: &RecordId) -> Result<()> {
        sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn latest_published(&self, exclude: &[RecordId], limit: i64) -> Result<Vec<TrendingRow>> {
        let exclude: Vec<String> = exclude.iter().map(RecordId::to_string).collect();
        let rows = sqlx::query_as::<_, TrendingRow>(
            "SELECT p.id, 0::BIGINT AS view_count, p.title, p.image, p.created_at, p.slug, \
             COALESCE(c.name, '') AS category_name, COALESCE(c.slug, '') AS category_slug \
             FROM posts p LEFT JOIN categories c ON c.id = p.category_id \
             WHERE NOT p.is_draft AND p.id <> ALL($1) \
             ORDER BY p.created_at DESC \
             LIMIT $2",
        )
        .bind(&exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
