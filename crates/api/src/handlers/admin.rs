//! Administrator login and password reset.
//!
//! Reset flow:
//! 1. POST /admin/request-verification emails a 6-digit code (valid 5 minutes)
//!    and opens a 15 minute reset session
//! 2. POST /admin/verify-otp checks the code; three wrong codes lock the
//!    account for 30 minutes
//! 3. POST /admin/reset-password replaces the password and closes the session
//!
//! Security notes:
//! - Codes are hashed (SHA256) before storage
//! - Every session write is a compare-and-swap on the admin's reset version,
//!   so concurrent requests cannot interleave their updates
//! - Login never reveals whether an email is registered; the reset endpoints do
//! - Login and code endpoints are rate limited per socket peer address, never
//!   per forwarded header; successful requests are not counted

use axum::{
    Json, Router, debug_handler,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::Utc;
use garde::Validate;
use shared::api::{
    DataResponse, LoginPayload, MessageResponse, RequestVerificationPayload, ResetPasswordPayload,
    VerifyOtpPayload,
};

use crate::{
    error::AppError,
    middleware::{ACCESS_TOKEN_COOKIE, AuthAdmin, PeerIp},
    models::Admin,
    reset_session::{Rejection, ResetSession, generate_otp, hash_otp},
    state::AppState,
};

const RATE_LIMIT_MAX: i64 = 5;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

const LOGIN_LIMITED: &str = "Too many login attempts. Please try again later.";
const OTP_LIMITED: &str = "Too many OTP requests. Please try again in 15 minutes.";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ADMIN_NOT_FOUND: &str = "Admin not found.";
const CONCURRENT_UPDATE: &str = "Reset session changed concurrently. Please retry.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", delete(logout))
        .route("/me", get(me))
        .route("/request-verification", post(request_verification))
        .route("/verify-otp", post(verify_otp))
        .route("/reset-password", post(reset_password))
}

#[debug_handler]
async fn login(
    State(state): State<AppState>,
    PeerIp(ip): PeerIp,
    jar: CookieJar,
    Json(mut payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let limit_key = format!("ratelimit:login:{}", ip);
    enforce_limit(&state, &limit_key, LOGIN_LIMITED).await?;

    payload.email = normalize_email(&payload.email);
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let Some(admin) = state.repos.admins.find_by_email(&payload.email).await? else {
        tracing::warn!(ip = %ip, "login failed: unknown email");
        return Err(AppError::External(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    };

    let auth = state.auth.clone();
    let hash = admin.password_hash.clone();
    let password = payload.password;
    let valid = tokio::task::spawn_blocking(move || auth.verify_password(&password, &hash)).await??;

    if !valid {
        tracing::warn!(admin_id = %admin.id, ip = %ip, "login failed: wrong password");
        return Err(AppError::External(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    }

    let token = state.auth.issue_token(&admin, Utc::now())?;
    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.is_production())
        .path("/")
        .max_age(time::Duration::seconds(state.config.token_ttl_secs));

    release_limit(&state, &limit_key).await;
    tracing::info!(admin_id = %admin.id, "admin logged in");

    Ok((
        jar.add(cookie),
        Json(DataResponse::with_message(admin.profile(), "Login successful")),
    ))
}

#[debug_handler]
async fn logout(
    admin: AuthAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let cookie = Cookie::build(ACCESS_TOKEN_COOKIE)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.is_production())
        .path("/");

    tracing::info!(admin_id = %admin.id, "admin logged out");

    Ok((
        jar.remove(cookie),
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

#[debug_handler]
async fn me(
    admin: AuthAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let admin = state
        .repos
        .admins
        .find_by_id(admin.id)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, ADMIN_NOT_FOUND))?;

    Ok(Json(DataResponse::new(admin.profile())))
}

#[debug_handler]
async fn request_verification(
    State(state): State<AppState>,
    PeerIp(ip): PeerIp,
    Json(mut payload): Json<RequestVerificationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let limit_key = otp_limit_key(&ip);
    enforce_limit(&state, &limit_key, OTP_LIMITED).await?;

    payload.email = normalize_email(&payload.email);
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let admin = find_admin(&state, &payload.email).await?;

    let code = generate_otp();
    let next = match admin.reset_session.request_code(hash_otp(&code), Utc::now()) {
        Ok(next) => next,
        Err(rejection) => return Err(rejected(&state, &admin, rejection).await),
    };
    save_session(&state, &admin, &next).await?;

    // The session is already persisted; a failed send leaves the caller in
    // the request cooldown.
    state
        .email
        .send_verification_code(&admin.email, &code)
        .await?;

    release_limit(&state, &limit_key).await;
    tracing::info!(admin_id = %admin.id, "password reset code issued");

    Ok(Json(MessageResponse::new("OTP sent to your email")))
}

#[debug_handler]
async fn verify_otp(
    State(state): State<AppState>,
    PeerIp(ip): PeerIp,
    Json(mut payload): Json<VerifyOtpPayload>,
) -> Result<impl IntoResponse, AppError> {
    let limit_key = otp_limit_key(&ip);
    enforce_limit(&state, &limit_key, OTP_LIMITED).await?;

    payload.email = normalize_email(&payload.email);
    payload.otp = payload.otp.trim().to_string();
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let admin = find_admin(&state, &payload.email).await?;

    let next = match admin
        .reset_session
        .verify(&hash_otp(&payload.otp), Utc::now())
    {
        Ok(next) => next,
        Err(rejection) => {
            tracing::warn!(
                admin_id = %admin.id,
                ip = %ip,
                reason = %rejection.reason,
                "reset code rejected"
            );
            return Err(rejected(&state, &admin, rejection).await);
        }
    };
    save_session(&state, &admin, &next).await?;

    release_limit(&state, &limit_key).await;
    tracing::info!(admin_id = %admin.id, "password reset code verified");

    Ok(Json(MessageResponse::new(
        "OTP verified successfully. You can now reset your password.",
    )))
}

#[debug_handler]
async fn reset_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = normalize_email(&payload.email);
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let admin = find_admin(&state, &payload.email).await?;

    let next = match admin.reset_session.reset_password(Utc::now()) {
        Ok(next) => next,
        Err(rejection) => return Err(rejected(&state, &admin, rejection).await),
    };

    let auth = state.auth.clone();
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || auth.hash_password(&password)).await??;

    let saved = state
        .repos
        .admins
        .complete_password_reset(admin.id, admin.reset_version, &password_hash, &next)
        .await?;
    if !saved {
        return Err(AppError::External(StatusCode::CONFLICT, CONCURRENT_UPDATE));
    }

    tracing::info!(admin_id = %admin.id, "password reset completed");

    Ok(Json(MessageResponse::new("Password reset successfully")))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn otp_limit_key(ip: &str) -> String {
    format!("ratelimit:otp:{}", ip)
}

async fn enforce_limit(state: &AppState, key: &str, message: &'static str) -> Result<(), AppError> {
    let result = state
        .stores
        .rate_limiter
        .check_simple(key, RATE_LIMIT_MAX, RATE_LIMIT_WINDOW_SECS)
        .await?;

    if !result.is_allowed() {
        tracing::warn!(key = %key, "rate limit exceeded");
        return Err(AppError::External(StatusCode::TOO_MANY_REQUESTS, message));
    }

    Ok(())
}

async fn release_limit(state: &AppState, key: &str) {
    if let Err(e) = state.stores.rate_limiter.release(key).await {
        tracing::warn!(key = %key, "failed to release rate limit hit: {:?}", e);
    }
}

async fn find_admin(state: &AppState, email: &str) -> Result<Admin, AppError> {
    state
        .repos
        .admins
        .find_by_email(email)
        .await?
        .ok_or(AppError::External(StatusCode::NOT_FOUND, ADMIN_NOT_FOUND))
}

async fn save_session(
    state: &AppState,
    admin: &Admin,
    session: &ResetSession,
) -> Result<(), AppError> {
    let saved = state
        .repos
        .admins
        .save_reset_session(admin.id, admin.reset_version, session)
        .await?;

    if !saved {
        tracing::warn!(admin_id = %admin.id, "reset session write lost a race");
        return Err(AppError::External(StatusCode::CONFLICT, CONCURRENT_UPDATE));
    }

    Ok(())
}

/// Persist whatever state the rejection carries, then turn it into the
/// response error.
async fn rejected(state: &AppState, admin: &Admin, rejection: Rejection) -> AppError {
    tracing::debug!(
        admin_id = %admin.id,
        state = ?admin.reset_session.state(Utc::now()),
        "reset session transition rejected"
    );

    if let Some(next) = rejection.next {
        if next.locked_until.is_some() && admin.reset_session.locked_until != next.locked_until {
            tracing::warn!(admin_id = %admin.id, "admin locked after failed reset codes");
        }
        if let Err(e) = save_session(state, admin, &next).await {
            return e;
        }
    }

    AppError::Message(rejection.reason.status(), rejection.reason.to_string())
}
