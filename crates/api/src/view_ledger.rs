//! Per-viewer view counting.
//!
//! A post's counter goes up at most once per caller address per rolling day.
//! Two simultaneous first views from the same address can both be counted;
//! the counter is approximate.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;

use crate::middleware::ClientIp;
use crate::models::RecordId;
use crate::repos::{PostRepo, ViewRepo};
use crate::state::AppState;

/// Window within which repeat views from one address are ignored.
pub const DEDUP_WINDOW: Duration = Duration::hours(24);
/// Ledger entries older than this are purged.
pub const RETENTION: Duration = Duration::days(7);
const PURGE_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

/// Record a view of `raw_id` from `ip`. Returns whether the post's counter was
/// incremented. Identifiers that are not 24 hex characters are ignored.
pub async fn record_view(
    views: &dyn ViewRepo,
    posts: &dyn PostRepo,
    raw_id: &str,
    ip: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(post_id) = RecordId::parse(raw_id) else {
        return Ok(false);
    };

    if views.has_viewed_since(&post_id, ip, now - DEDUP_WINDOW).await? {
        return Ok(false);
    }

    tokio::try_join!(views.record(&post_id, ip), posts.increment_views(&post_id))?;

    tracing::debug!(post_id = %post_id, ip = %ip, "view recorded");
    Ok(true)
}

/// Route middleware for `GET /post/{postId}`: counts the view, then serves
/// the post. Ledger failures are logged and never block the response.
pub async fn track_post_view(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(post_id): Path<String>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = record_view(
        state.repos.views.as_ref(),
        state.repos.posts.as_ref(),
        &post_id,
        &ip,
        Utc::now(),
    )
    .await
    {
        tracing::warn!(post_id = %post_id, "failed to record view: {:?}", e);
    }

    next.run(request).await
}

/// Delete ledger entries past retention every hour.
pub fn spawn_purge_task(views: Arc<dyn ViewRepo>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match views.purge_older_than(Utc::now() - RETENTION).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "purged expired view ledger entries"),
                Err(e) => tracing::error!("view ledger purge failed: {:?}", e),
            }
        }
    })
}
