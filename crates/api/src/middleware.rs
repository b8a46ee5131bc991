pub mod auth;
pub mod client_ip;

pub use auth::{ACCESS_TOKEN_COOKIE, AuthAdmin, AuthError};
pub use client_ip::{ClientIp, PeerIp};
