//! Trending ranker.
//!
//! Always tries to return [`TRENDING_SIZE`] posts by cascading through three
//! tiers: views in the last day, views in the last week, then the newest
//! published posts. Each tier only asks for the shortfall and skips posts
//! already collected, so tier order is preserved in the output.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::models::{RecordId, TrendingRow};
use crate::repos::{PostRepo, ViewRepo};

pub const TRENDING_SIZE: usize = 4;

pub async fn rank(
    views: &dyn ViewRepo,
    posts: &dyn PostRepo,
    now: DateTime<Utc>,
) -> Result<Vec<TrendingRow>> {
    let mut ranked = views
        .top_viewed_since(now - Duration::hours(24), &[], TRENDING_SIZE as i64)
        .await?;

    if ranked.len() < TRENDING_SIZE {
        let weekly = views
            .top_viewed_since(now - Duration::days(7), &collected(&ranked), shortfall(&ranked))
            .await?;
        ranked.extend(weekly);
    }

    if ranked.len() < TRENDING_SIZE {
        let latest = posts
            .latest_published(&collected(&ranked), shortfall(&ranked))
            .await?;
        ranked.extend(latest);
    }

    ranked.truncate(TRENDING_SIZE);
    Ok(ranked)
}

fn collected(rows: &[TrendingRow]) -> Vec<RecordId> {
    rows.iter().map(|row| row.id.clone()).collect()
}

fn shortfall(rows: &[TrendingRow]) -> i64 {
    TRENDING_SIZE.saturating_sub(rows.len()) as i64
}
