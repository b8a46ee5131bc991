use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// HMAC secret used to sign admin access tokens.
    pub jwt_secret: String,
    /// Lifetime of the access token and its cookie, in seconds.
    pub token_ttl_secs: i64,
    /// SMTP URL for development email (e.g., smtp://localhost:1025)
    #[serde(default)]
    pub smtp_url: Option<String>,
    /// Resend API key for production email
    #[serde(default)]
    pub resend_api_key: Option<String>,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Browser origin allowed to call the API with credentials.
    #[serde(default)]
    pub cors_origin: Option<String>,
    /// Take the client address from X-Forwarded-For / X-Real-IP.
    #[serde(default = "default_trust_proxy")]
    pub trust_proxy: bool,
    /// "production" enables JSON logging and secure cookies; "development"
    /// exposes internal error details in responses.
    #[serde(default)]
    pub env: String,
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

fn default_email_from() -> String {
    "Newsdesk <noreply@localhost>".to_string()
}

fn default_app_name() -> String {
    "Newsdesk".to_string()
}

fn default_trust_proxy() -> bool {
    true
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }
}
