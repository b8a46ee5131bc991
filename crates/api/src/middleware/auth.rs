//! Admin authentication via signed access tokens.
//!
//! Usage: Add `AuthAdmin` as an extractor parameter to require authentication.
//! The token is read from the `accessToken` cookie, or from an
//! `Authorization: Bearer` header for non-browser clients.
//!
//! ```ignore
//! async fn my_handler(admin: AuthAdmin, ...) -> ... {
//!     // admin.id is available here
//! }
//! ```

use axum::{
    Json, RequestPartsExt,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::services::TokenError;
use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Authenticated administrator extracted from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub id: Uuid,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let token = match jar.get(ACCESS_TOKEN_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => {
                let TypedHeader(Authorization(bearer)) = parts
                    .extract::<TypedHeader<Authorization<Bearer>>>()
                    .await
                    .map_err(|_| AuthError::MissingToken)?;
                bearer.token().to_string()
            }
        };

        let claims = state.auth.verify_token(&token).map_err(|e| match e {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::Invalid => AuthError::InvalidToken,
        })?;

        Ok(AuthAdmin {
            id: claims.sub,
            email: claims.email,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    ExpiredToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Not authorized. Please login.",
            AuthError::ExpiredToken => "Token expired. Please login again.",
            AuthError::InvalidToken => "Invalid token",
        };

        let body = serde_json::json!({ "success": false, "message": message });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
