//! Shared API request/response types used by the server and its clients.
//!
//! Every response is wrapped in a `{ success, ... }` envelope. Failures carry
//! `{ success: false, message }` and are produced by the server's error type.

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum length for an administrator password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Request a password-reset code for an administrator account.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RequestVerificationPayload {
    #[garde(email)]
    pub email: String,
}

/// Submit the one-time code received via email.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyOtpPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 6, max = 6), pattern(r"^[0-9]+$"))]
    pub otp: String,
}

/// Set a new password once the code has been verified.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetPasswordPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = MIN_PASSWORD_LEN))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginPayload {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Envelope for responses that only carry a human-readable message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Envelope for responses that carry a payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Public view of an administrator. Never includes credentials or reset state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// A single post as returned by `GET /post/{postId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image: String,
    pub slug: String,
    pub category: Option<CategoryRef>,
    pub is_draft: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the trending list. Every tier produces the same shape;
/// posts filled in by recency carry a view count of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPost {
    pub id: String,
    pub view_count: i64,
    pub title: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub slug: String,
    pub category: CategoryRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_payload_rejects_non_numeric_code() {
        let payload = VerifyOtpPayload {
            email: "admin@example.com".to_string(),
            otp: "12a456".to_string(),
        };

        assert!(payload.validate().is_err());
    }

    #[test]
    fn verify_payload_rejects_short_code() {
        let payload = VerifyOtpPayload {
            email: "admin@example.com".to_string(),
            otp: "12345".to_string(),
        };

        assert!(payload.validate().is_err());
    }

    #[test]
    fn verify_payload_accepts_six_digits() {
        let payload = VerifyOtpPayload {
            email: "admin@example.com".to_string(),
            otp: "042137".to_string(),
        };

        assert!(payload.validate().is_ok());
    }

    #[test]
    fn reset_payload_requires_eight_characters() {
        let short = ResetPasswordPayload {
            email: "admin@example.com".to_string(),
            password: "seven77".to_string(),
        };
        let long_enough = ResetPasswordPayload {
            email: "admin@example.com".to_string(),
            password: "eight888".to_string(),
        };

        assert!(short.validate().is_err());
        assert!(long_enough.validate().is_ok());
    }

    #[test]
    fn login_payload_rejects_invalid_email() {
        let payload = LoginPayload {
            email: "not-an-email".to_string(),
            password: "whatever".to_string(),
        };

        assert!(payload.validate().is_err());
    }

    #[test]
    fn data_response_omits_missing_message() {
        let json = serde_json::to_value(DataResponse::new(vec![1, 2])).unwrap();

        assert_eq!(json, serde_json::json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn trending_post_serializes_camel_case() {
        let post = TrendingPost {
            id: "65a1f0c2e4b0a1b2c3d4e5f6".to_string(),
            view_count: 3,
            title: "Election night".to_string(),
            image: "https://cdn.example.com/a.jpg".to_string(),
            created_at: Utc::now(),
            slug: "election-night".to_string(),
            category: CategoryRef {
                name: String::new(),
                slug: String::new(),
            },
        };

        let json = serde_json::to_value(&post).unwrap();

        assert_eq!(json["viewCount"], 3);
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["category"]["name"], "");
    }
}
