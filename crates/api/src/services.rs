//! External service abstractions.
//!
//! Each service is abstracted behind a trait to enable mocking in tests.
//!
//! ## Services
//!
//! - **auth** - Argon2 password hashing and signed admin access tokens
//! - **email** - Transactional email via Resend (prod) or SMTP (dev)
//!
//! ## Usage in Handlers
//!
//! Services are accessed via `AppState`:
//!
//! ```ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
//!     let token = state.auth.issue_token(&admin, Utc::now())?;
//!     state.email.send_verification_code(&email, &code).await?;
//! }
//! ```

mod auth;
mod email;

pub use auth::{AuthService, Claims, JwtAuthService, TokenError};
pub use email::{EmailSender, EmailSenderImpl, EmailTemplate};

#[cfg(test)]
pub use auth::MockAuthService;
#[cfg(test)]
pub use email::MockEmailSender;
