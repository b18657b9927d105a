//! Contract with the external policy API.
//!
//! Everything the dashboard persists lives behind this trait: accounts,
//! tokens, policies. The core only ever talks to `PolicyApi`, so tests can
//! substitute an in-memory backend.

mod client;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::policy::{Policy, PolicyDraft, PolicyId};

pub use client::HttpPolicyApi;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("not authorized; sign in again")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("server responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response too large ({size} bytes > {limit} bytes)")]
    TooLarge { size: usize, limit: usize },
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Maps a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized,
            404 => ApiError::NotFound,
            _ => ApiError::Status {
                status,
                body: truncate_body(body),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(MAX_CHARS).collect();
    short.push('…');
    short
}

/// Bearer token handed out by sign-in. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***redacted***)")
    }
}

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.email.is_empty() {
            return Err("Email is required".to_string());
        }
        if !self.email.contains('@') {
            return Err("Email address is not valid".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserAccount {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Operations the dashboard needs from the backend. Implementations run on
/// a single-threaded runtime, so futures need not be `Send`.
#[cfg_attr(test, mockall::automock)]
#[async_trait(?Send)]
pub trait PolicyApi {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthToken, ApiError>;

    async fn sign_up(&self, credentials: &Credentials) -> Result<UserAccount, ApiError>;

    async fn current_user(&self, token: &AuthToken) -> Result<UserAccount, ApiError>;

    async fn list_policies(&self, token: &AuthToken) -> Result<Vec<Policy>, ApiError>;

    async fn get_policy(&self, token: &AuthToken, id: PolicyId) -> Result<Policy, ApiError>;

    async fn create_policy(
        &self,
        token: &AuthToken,
        draft: &PolicyDraft,
    ) -> Result<Policy, ApiError>;

    async fn update_policy(
        &self,
        token: &AuthToken,
        id: PolicyId,
        draft: &PolicyDraft,
    ) -> Result<Policy, ApiError>;

    async fn delete_policy(&self, token: &AuthToken, id: PolicyId) -> Result<(), ApiError>;
}
