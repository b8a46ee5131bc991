//! Password-reset session state machine for administrator accounts.
//!
//! ```text
//!            request_code            verify (match)          reset_password
//!   NONE ───────────────▶ CODE_ISSUED ─────────────▶ CODE_VERIFIED ─────────▶ NONE
//!                              │
//!                              │ 3rd wrong code
//!                              ▼
//!                           LOCKED ── (30 min) ──▶ request_code allowed again
//! ```
//!
//! The session is a plain value embedded in the admin row. Every transition
//! takes the current time and either returns the next state or a
//! [`Rejection`]. Some rejections still change the state (a wrong code bumps
//! the attempt counter, an expired session is cleared); those carry the state
//! to persist in [`Rejection::next`].
//!
//! Codes are never stored in plaintext: callers pass the SHA-256 hex digest
//! produced by [`hash_otp`].

use std::fmt;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::FromRow;

/// How long an issued code stays valid.
pub const OTP_TTL: Duration = Duration::minutes(5);
/// Minimum gap between two code requests.
pub const REQUEST_COOLDOWN: Duration = Duration::seconds(60);
/// How long the whole reset session stays open after a code is issued.
pub const SESSION_TTL: Duration = Duration::minutes(15);
/// Wrong codes allowed before the account is locked.
pub const MAX_OTP_ATTEMPTS: i32 = 3;
pub const LOCKOUT: Duration = Duration::minutes(30);

/// Reset-session fields stored alongside the admin credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct ResetSession {
    pub otp_hash: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_attempts: i32,
    pub otp_verified: bool,
    pub last_otp_request_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    #[sqlx(rename = "reset_session_active")]
    pub active: bool,
    #[sqlx(rename = "reset_session_expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    None,
    CodeIssued,
    CodeVerified,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRejection {
    Locked { remaining_minutes: i64 },
    AlreadyVerified,
    CodeAlreadyVerified,
    Cooldown { remaining_secs: i64 },
    NoActiveSession,
    SessionExpired,
    CodeExpired,
    WrongCode { remaining_attempts: i32 },
    TooManyAttempts,
    NotVerified,
}

impl ResetRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            ResetRejection::Locked { .. } | ResetRejection::NotVerified => StatusCode::FORBIDDEN,
            ResetRejection::Cooldown { .. } | ResetRejection::TooManyAttempts => {
                StatusCode::TOO_MANY_REQUESTS
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ResetRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetRejection::Locked { remaining_minutes } => write!(
                f,
                "Account is locked. Try again after {} minute{}.",
                remaining_minutes,
                plural(*remaining_minutes)
            ),
            ResetRejection::AlreadyVerified => f.write_str(concat!(
                "You are already verified and your reset session is still valid. ",
                "Please reset your password.",
            )),
            ResetRejection::CodeAlreadyVerified => f.write_str("You are already verified"),
            ResetRejection::Cooldown { remaining_secs } => write!(
                f,
                "Please wait {} second{} before requesting a new OTP.",
                remaining_secs,
                plural(*remaining_secs)
            ),
            ResetRejection::NoActiveSession => {
                f.write_str("No active reset password session. Please request an OTP first.")
            }
            ResetRejection::SessionExpired => {
                f.write_str("Reset session expired. Please start over and request a new OTP.")
            }
            ResetRejection::CodeExpired => {
                f.write_str("OTP has expired. Please request a new one.")
            }
            ResetRejection::WrongCode { remaining_attempts } => write!(
                f,
                "Wrong OTP. {} attempt{} remaining",
                remaining_attempts,
                plural(i64::from(*remaining_attempts))
            ),
            ResetRejection::TooManyAttempts => {
                f.write_str("Too many failed attempts. Account locked for 30 minutes")
            }
            ResetRejection::NotVerified => f.write_str("Please verify your email first."),
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: ResetRejection,
    /// State to persist even though the request is rejected.
    pub next: Option<ResetSession>,
}

impl Rejection {
    fn new(reason: ResetRejection) -> Self {
        Self { reason, next: None }
    }

    fn persisting(reason: ResetRejection, next: ResetSession) -> Self {
        Self {
            reason,
            next: Some(next),
        }
    }
}

pub type Transition = Result<ResetSession, Rejection>;

impl ResetSession {
    pub fn state(&self, now: DateTime<Utc>) -> ResetState {
        if self.is_locked(now) {
            ResetState::Locked
        } else if !self.active || self.is_session_expired(now) {
            ResetState::None
        } else if self.otp_verified {
            ResetState::CodeVerified
        } else {
            ResetState::CodeIssued
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    fn is_session_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires <= now)
    }

    /// Issue a new code. `otp_hash` is the digest of the code that will be
    /// emailed to the admin.
    pub fn request_code(&self, otp_hash: String, now: DateTime<Utc>) -> Transition {
        if let Some(until) = self.locked_until.filter(|until| *until > now) {
            return Err(Rejection::new(ResetRejection::Locked {
                remaining_minutes: ceil_minutes(until - now),
            }));
        }

        if self.otp_verified && self.active && !self.is_session_expired(now) {
            return Err(Rejection::new(ResetRejection::AlreadyVerified));
        }

        if let Some(last) = self.last_otp_request_at {
            let elapsed = now - last;
            if elapsed < REQUEST_COOLDOWN {
                return Err(Rejection::new(ResetRejection::Cooldown {
                    remaining_secs: REQUEST_COOLDOWN.num_seconds() - elapsed.num_seconds(),
                }));
            }
        }

        Ok(ResetSession {
            otp_hash: Some(otp_hash),
            otp_expires_at: Some(now + OTP_TTL),
            otp_attempts: 0,
            otp_verified: false,
            last_otp_request_at: Some(now),
            locked_until: None,
            active: true,
            expires_at: Some(now + SESSION_TTL),
        })
    }

    /// Check a submitted code (as a digest) against the issued one.
    pub fn verify(&self, candidate_hash: &str, now: DateTime<Utc>) -> Transition {
        if self.otp_verified {
            return Err(Rejection::new(ResetRejection::CodeAlreadyVerified));
        }

        // A lockout closes the session, so it has to be reported first.
        if let Some(until) = self.locked_until.filter(|until| *until > now) {
            return Err(Rejection::new(ResetRejection::Locked {
                remaining_minutes: ceil_minutes(until - now),
            }));
        }

        if !self.active {
            return Err(Rejection::new(ResetRejection::NoActiveSession));
        }

        if self.is_session_expired(now) {
            let next = ResetSession {
                otp_hash: None,
                otp_expires_at: None,
                otp_verified: false,
                active: false,
                ..self.clone()
            };
            return Err(Rejection::persisting(ResetRejection::SessionExpired, next));
        }

        let Some(stored_hash) = self
            .otp_hash
            .as_deref()
            .filter(|_| self.otp_expires_at.is_some_and(|expires| expires > now))
        else {
            return Err(Rejection::new(ResetRejection::CodeExpired));
        };

        if stored_hash != candidate_hash {
            let attempts = self.otp_attempts + 1;

            if attempts >= MAX_OTP_ATTEMPTS {
                let next = ResetSession {
                    otp_hash: None,
                    otp_expires_at: None,
                    otp_attempts: 0,
                    otp_verified: false,
                    locked_until: Some(now + LOCKOUT),
                    active: false,
                    ..self.clone()
                };
                return Err(Rejection::persisting(ResetRejection::TooManyAttempts, next));
            }

            let next = ResetSession {
                otp_attempts: attempts,
                ..self.clone()
            };
            return Err(Rejection::persisting(
                ResetRejection::WrongCode {
                    remaining_attempts: MAX_OTP_ATTEMPTS - attempts,
                },
                next,
            ));
        }

        Ok(ResetSession {
            otp_hash: None,
            otp_expires_at: None,
            otp_attempts: 0,
            otp_verified: true,
            locked_until: None,
            ..self.clone()
        })
    }

    /// Consume a verified session. The caller replaces the password hash in
    /// the same write as the returned state.
    pub fn reset_password(&self, now: DateTime<Utc>) -> Transition {
        if !self.otp_verified {
            return Err(Rejection::new(ResetRejection::NotVerified));
        }

        if !self.active {
            return Err(Rejection::new(ResetRejection::NoActiveSession));
        }

        if self.is_session_expired(now) {
            let next = ResetSession {
                otp_verified: false,
                active: false,
                ..self.clone()
            };
            return Err(Rejection::persisting(ResetRejection::SessionExpired, next));
        }

        Ok(ResetSession {
            otp_verified: false,
            active: false,
            expires_at: None,
            ..self.clone()
        })
    }
}

fn ceil_minutes(remaining: Duration) -> i64 {
    let secs = remaining.num_seconds().max(0);
    (secs + 59) / 60
}

/// Uniformly random 6-digit code in `[100000, 999999]`.
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

pub fn hash_otp(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn issued(now: DateTime<Utc>) -> ResetSession {
        ResetSession::default()
            .request_code(hash_otp("123456"), now)
            .unwrap()
    }

    #[test]
    fn fresh_session_is_none() {
        assert_eq!(ResetSession::default().state(t0()), ResetState::None);
    }

    #[test]
    fn request_code_opens_session() {
        let now = t0();
        let session = issued(now);

        assert_eq!(session.state(now), ResetState::CodeIssued);
        assert_eq!(session.otp_hash.as_deref(), Some(hash_otp("123456").as_str()));
        assert_eq!(session.otp_expires_at, Some(now + OTP_TTL));
        assert_eq!(session.expires_at, Some(now + SESSION_TTL));
        assert_eq!(session.last_otp_request_at, Some(now));
        assert_eq!(session.otp_attempts, 0);
        assert!(!session.otp_verified);
    }

    #[test]
    fn second_request_within_cooldown_reports_remaining_seconds() {
        let now = t0();
        let session = issued(now);

        let err = session
            .request_code(hash_otp("654321"), now + Duration::seconds(18))
            .unwrap_err();

        assert_eq!(
            err.reason,
            ResetRejection::Cooldown { remaining_secs: 42 }
        );
        assert_eq!(err.reason.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.next.is_none());
        assert_eq!(
            err.reason.to_string(),
            "Please wait 42 seconds before requesting a new OTP."
        );
    }

    #[test]
    fn request_after_cooldown_replaces_code_and_resets_attempts() {
        let now = t0();
        let mut session = issued(now);
        session.otp_attempts = 2;

        let later = now + Duration::seconds(61);
        let next = session.request_code(hash_otp("999999"), later).unwrap();

        assert_eq!(next.otp_hash.as_deref(), Some(hash_otp("999999").as_str()));
        assert_eq!(next.otp_attempts, 0);
        assert_eq!(next.otp_expires_at, Some(later + OTP_TTL));
    }

    #[test]
    fn request_rejected_while_locked() {
        let now = t0();
        let session = ResetSession {
            locked_until: Some(now + Duration::minutes(29) + Duration::seconds(10)),
            ..Default::default()
        };

        let err = session.request_code(hash_otp("111111"), now).unwrap_err();

        assert_eq!(
            err.reason,
            ResetRejection::Locked {
                remaining_minutes: 30
            }
        );
        assert_eq!(err.reason.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn request_rejected_when_already_verified() {
        let now = t0();
        let verified = issued(now).verify(&hash_otp("123456"), now).unwrap();

        let err = verified
            .request_code(hash_otp("222222"), now + Duration::minutes(2))
            .unwrap_err();

        assert_eq!(err.reason, ResetRejection::AlreadyVerified);
    }

    #[test]
    fn request_allowed_when_verified_session_has_expired() {
        let now = t0();
        let verified = issued(now).verify(&hash_otp("123456"), now).unwrap();

        let later = now + SESSION_TTL + Duration::seconds(1);
        let next = verified.request_code(hash_otp("222222"), later).unwrap();

        assert_eq!(next.state(later), ResetState::CodeIssued);
    }

    #[test]
    fn correct_code_marks_verified_and_clears_code() {
        let now = t0();
        let session = issued(now);

        let next = session
            .verify(&hash_otp("123456"), now + Duration::minutes(1))
            .unwrap();

        assert!(next.otp_verified);
        assert!(next.active);
        assert!(next.otp_hash.is_none());
        assert!(next.otp_expires_at.is_none());
        assert_eq!(next.otp_attempts, 0);
        assert_eq!(next.state(now), ResetState::CodeVerified);
    }

    #[test]
    fn verified_code_cannot_be_reused() {
        let now = t0();
        let verified = issued(now).verify(&hash_otp("123456"), now).unwrap();

        let err = verified.verify(&hash_otp("123456"), now).unwrap_err();

        assert_eq!(err.reason, ResetRejection::CodeAlreadyVerified);
        assert_eq!(err.reason.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn wrong_code_counts_attempts() {
        let now = t0();
        let session = issued(now);

        let err = session.verify(&hash_otp("000000"), now).unwrap_err();

        assert_eq!(
            err.reason,
            ResetRejection::WrongCode {
                remaining_attempts: 2
            }
        );
        assert_eq!(err.reason.to_string(), "Wrong OTP. 2 attempts remaining");
        assert_eq!(err.next.unwrap().otp_attempts, 1);
    }

    #[test]
    fn third_wrong_code_locks_account() {
        let now = t0();
        let mut session = issued(now);

        for _ in 0..2 {
            let err = session.verify(&hash_otp("000000"), now).unwrap_err();
            session = err.next.unwrap();
        }
        let err = session.verify(&hash_otp("000000"), now).unwrap_err();

        assert_eq!(err.reason, ResetRejection::TooManyAttempts);
        assert_eq!(err.reason.status(), StatusCode::TOO_MANY_REQUESTS);

        let locked = err.next.unwrap();
        assert_eq!(locked.locked_until, Some(now + LOCKOUT));
        assert_eq!(locked.otp_attempts, 0);
        assert!(locked.otp_hash.is_none());
        assert!(!locked.active);
        assert_eq!(locked.state(now), ResetState::Locked);
    }

    #[test]
    fn locked_account_rejects_new_codes_for_thirty_minutes() {
        let now = t0();
        let mut session = issued(now);
        for _ in 0..3 {
            session = session.verify(&hash_otp("000000"), now).unwrap_err().next.unwrap();
        }

        let during = now + Duration::minutes(29);
        assert!(matches!(
            session.request_code(hash_otp("111111"), during).unwrap_err().reason,
            ResetRejection::Locked { .. }
        ));

        let after = now + LOCKOUT + Duration::seconds(1);
        assert!(session.request_code(hash_otp("111111"), after).is_ok());
    }

    #[test]
    fn locked_account_rejects_codes_for_thirty_minutes() {
        let now = t0();
        let mut session = issued(now);
        for _ in 0..3 {
            session = session.verify(&hash_otp("000000"), now).unwrap_err().next.unwrap();
        }

        let err = session
            .verify(&hash_otp("123456"), now + Duration::minutes(5))
            .unwrap_err();

        assert_eq!(
            err.reason,
            ResetRejection::Locked {
                remaining_minutes: 25
            }
        );
        assert_eq!(err.reason.status(), StatusCode::FORBIDDEN);
        assert!(err.next.is_none());

        let after = now + LOCKOUT + Duration::seconds(1);
        assert_eq!(
            session.verify(&hash_otp("123456"), after).unwrap_err().reason,
            ResetRejection::NoActiveSession
        );
    }

    #[test]
    fn verify_without_session_is_rejected() {
        let err = ResetSession::default()
            .verify(&hash_otp("123456"), t0())
            .unwrap_err();

        assert_eq!(err.reason, ResetRejection::NoActiveSession);
        assert!(err.next.is_none());
    }

    #[test]
    fn verify_after_session_expiry_clears_session() {
        let now = t0();
        let session = issued(now);

        let err = session
            .verify(&hash_otp("123456"), now + SESSION_TTL + Duration::seconds(1))
            .unwrap_err();

        assert_eq!(err.reason, ResetRejection::SessionExpired);
        let next = err.next.unwrap();
        assert!(!next.active);
        assert!(next.otp_hash.is_none());
        assert!(next.otp_expires_at.is_none());
        assert!(!next.otp_verified);
    }

    #[test]
    fn verify_after_code_expiry_is_rejected_without_counting() {
        let now = t0();
        let session = issued(now);

        let err = session
            .verify(&hash_otp("123456"), now + OTP_TTL + Duration::seconds(1))
            .unwrap_err();

        assert_eq!(err.reason, ResetRejection::CodeExpired);
        assert!(err.next.is_none());
    }

    #[test]
    fn reset_requires_verification() {
        let now = t0();
        let err = issued(now).reset_password(now).unwrap_err();

        assert_eq!(err.reason, ResetRejection::NotVerified);
        assert_eq!(err.reason.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.reason.to_string(), "Please verify your email first.");
    }

    #[test]
    fn reset_consumes_verified_session() {
        let now = t0();
        let verified = issued(now).verify(&hash_otp("123456"), now).unwrap();

        let next = verified.reset_password(now + Duration::minutes(3)).unwrap();

        assert!(!next.otp_verified);
        assert!(!next.active);
        assert!(next.expires_at.is_none());
        assert_eq!(next.state(now), ResetState::None);

        let err = next.reset_password(now + Duration::minutes(4)).unwrap_err();
        assert_eq!(err.reason, ResetRejection::NotVerified);
    }

    #[test]
    fn reset_after_session_expiry_deactivates() {
        let now = t0();
        let verified = issued(now).verify(&hash_otp("123456"), now).unwrap();

        let err = verified
            .reset_password(now + SESSION_TTL + Duration::minutes(1))
            .unwrap_err();

        assert_eq!(err.reason, ResetRejection::SessionExpired);
        let next = err.next.unwrap();
        assert!(!next.active);
        assert!(!next.otp_verified);
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            let value: u32 = code.parse().unwrap();

            assert_eq!(code.len(), 6);
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn hash_is_stable_hex_digest() {
        assert_eq!(hash_otp("123456"), hash_otp("123456"));
        assert_ne!(hash_otp("123456"), hash_otp("123457"));
        assert_eq!(hash_otp("123456").len(), 64);
    }
}
