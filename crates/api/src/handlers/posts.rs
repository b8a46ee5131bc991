//! Public post endpoints.

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use shared::api::{DataResponse, PostDetail, TrendingPost};

use crate::{
    error::AppError, models::RecordId, state::AppState, trending, view_ledger::track_post_view,
};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/trending", get(get_trending))
        .route(
            "/{postId}",
            get(get_post).route_layer(from_fn_with_state(state, track_post_view)),
        )
}

#[debug_handler]
async fn get_trending(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = trending::rank(
        state.repos.views.as_ref(),
        state.repos.posts.as_ref(),
        Utc::now(),
    )
    .await?;

    let posts: Vec<TrendingPost> = rows.into_iter().map(TrendingPost::from).collect();

    Ok(Json(DataResponse::new(posts)))
}

#[debug_handler]
async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = RecordId::parse(&post_id).ok_or_else(|| AppError::bad_id(&post_id))?;

    let post = state
        .repos
        .posts
        .find_by_id(&id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, "Post not found"))?;

    Ok(Json(DataResponse::new(PostDetail::from(post))))
}
