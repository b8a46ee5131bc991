//! View ledger repository for PostgreSQL.
//!
//! One row per (post, viewer address) per rolling day. Rows older than seven
//! days are removed by the purge task in `view_ledger`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::models::{RecordId, TrendingRow};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ViewRepo: Send + Sync {
    /// Whether `ip` has a ledger entry for `post_id` created after `since`.
    async fn has_viewed_since(
        &self,
        post_id: &RecordId,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<bool>;

    async fn record(&self, post_id: &RecordId, ip: &str) -> Result<()>;

    /// Non-draft posts ranked by ledger entries created after `since`,
    /// skipping `exclude`. Ties are broken by newest post first.
    async fn top_viewed_since(
        &self,
        since: DateTime<Utc>,
        exclude: &[RecordId],
        limit: i64,
    ) -> Result<Vec<TrendingRow>>;

    /// Delete entries created before `cutoff`. Returns the number removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// PostgreSQL implementation of ViewRepo.
#[derive(Clone)]
pub struct PgViewRepo {
    pool: Pool<Postgres>,
}

impl PgViewRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ViewRepo for PgViewRepo {
    async fn has_viewed_since(
        &self,
        post_id: &RecordId,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let seen: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM post_views WHERE post_id = $1 AND ip = $2 AND created_at > $3 \
             )",
        )
        .bind(post_id)
        .bind(ip)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(seen)
    }

    async fn record(&self, post_id: &RecordId, ip: &str) -> Result<()> {
        sqlx::query("INSERT INTO post_views (post_id, ip) VALUES ($1, $2)")
            .bind(post_id)
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn top_viewed_since(
        &self,
        since: DateTime<Utc>,
        exclude: &[RecordId],
        limit: i64,
    ) -> Result<Vec<TrendingRow>> {
        let exclude: Vec<String> = exclude.iter().map(RecordId::to_string).collect();
        let rows = sqlx::query_as::<_, TrendingRow>(
            "SELECT p.id, v.view_count, p.title, p.image, p.created_at, p.slug, \
             COALESCE(c.name, '') AS category_name, COALESCE(c.slug, '') AS category_slug \
             FROM ( \
                SELECT post_id, COUNT(*) AS view_count FROM post_views \
                WHERE created_at > $1 AND post_id <> ALL($2) \
                GROUP BY post_id \
             ) v \
             JOIN posts p ON p.id = v.post_id \
             LEFT JOIN categories c ON c.id = p.category_id \
             WHERE NOT p.is_draft \
             ORDER BY v.view_count DESC, p.created_at DESC \
             LIMIT $3",
        )
        .bind(since)
        .bind(&exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM post_views WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
