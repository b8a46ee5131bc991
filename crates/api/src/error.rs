use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::state::AppState;

const INTERNAL_MESSAGE: &str = "Something went wrong.";

/// Underlying error text of a 500, carried as a response extension so the
/// body can be extended outside the handler.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// User-facing errors with a computed message (remaining time, attempts)
    Message(StatusCode, String),
    /// Validation errors - safe to show
    Validation(String),
}

impl AppError {
    /// A path identifier that is not a well-formed record id.
    pub fn bad_id(raw: &str) -> Self {
        AppError::Message(
            StatusCode::NOT_FOUND,
            format!("Resource not found with id: {}", raw),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                if let Some(message) = unique_violation_message(&err) {
                    return envelope(StatusCode::CONFLICT, message);
                }

                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                let mut response =
                    envelope(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string());
                response
                    .extensions_mut()
                    .insert(InternalErrorDetail(format!("{:#}", err)));
                response
            }
            AppError::External(status, msg) => envelope(status, msg.to_string()),
            AppError::Message(status, msg) => envelope(status, msg),
            AppError::Validation(msg) => envelope(StatusCode::BAD_REQUEST, msg),
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

fn envelope(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// Adds the underlying error text as `"error"` to 500 bodies when running in
/// the development environment.
pub async fn internal_details(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if state.config.is_development() {
        with_internal_detail(response)
    } else {
        response
    }
}

fn with_internal_detail(response: Response) -> Response {
    let Some(InternalErrorDetail(detail)) =
        response.extensions().get::<InternalErrorDetail>().cloned()
    else {
        return response;
    };

    let (parts, _) = response.into_parts();
    let body = Json(json!({
        "success": false,
        "message": INTERNAL_MESSAGE,
        "error": detail,
    }));

    (parts, body).into_response()
}

/// Maps a PostgreSQL unique violation to a conflict message naming the field.
fn unique_violation_message(err: &anyhow::Error) -> Option<String> {
    let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }

    let detail = db_err
        .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
        .and_then(|pg| pg.detail());

    Some(
        detail
            .and_then(duplicate_key_message)
            .unwrap_or_else(|| "Duplicate value already exists".to_string()),
    )
}

/// Turns `Key (email)=(a@b.com) already exists.` into `Email 'a@b.com' already exists`.
fn duplicate_key_message(detail: &str) -> Option<String> {
    let rest = detail.strip_prefix("Key (")?;
    let (field, rest) = rest.split_once(")=(")?;
    let (value, _) = rest.rsplit_once(") already exists")?;

    let mut chars = field.chars();
    let first = chars.next()?;
    let field: String = first.to_uppercase().chain(chars).collect();

    Some(format!("{} '{}' already exists", field, value))
}
