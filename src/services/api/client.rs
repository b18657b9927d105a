use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{ApiError, AuthToken, Credentials, PolicyApi, TokenResponse, UserAccount};
use crate::models::policy::{Policy, PolicyDraft, PolicyId};
use crate::models::settings::Settings;

const POLICIES_PATH: &str = "auth/users/me/policies";

/// reqwest-backed client for the policy API.
pub struct HttpPolicyApi {
    client: Client,
    base_url: String,
    max_response_bytes: usize,
}

impl HttpPolicyApi {
    pub fn new(settings: &Settings) -> Result<Self> {
        let base_url = settings.api_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url).into());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .context("Failed to build policy API HTTP client")?;

        Ok(Self {
            client,
            base_url,
            max_response_bytes: 5 * 1024 * 1024,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn policy_path(id: PolicyId) -> String {
        format!("{}/{}", POLICIES_PATH, id)
    }

    fn request(&self, method: Method, path: &str, token: Option<&AuthToken>) -> RequestBuilder {
        log::debug!("{} {}", method, path);
        let builder = self.client.request(method, self.endpoint(path));
        match token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token.as_str())),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let bytes = self.read_checked(response).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await?;
        self.read_checked(response).await?;
        Ok(())
    }

    async fn read_checked(&self, response: Response) -> Result<Vec<u8>, ApiError> {
        let status = response.status();

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_bytes {
                return Err(ApiError::TooLarge {
                    size: content_length as usize,
                    limit: self.max_response_bytes,
                });
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() > self.max_response_bytes {
            return Err(ApiError::TooLarge {
                size: bytes.len(),
                limit: self.max_response_bytes,
            });
        }

        if !status.is_success() {
            return Err(ApiError::from_status(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait(?Send)]
impl PolicyApi for HttpPolicyApi {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        let request = self.request(Method::POST, "auth/signin", None)
            .json(credentials);
        let response: TokenResponse = self.send_json(request).await?;
        if let Some(kind) = response.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                log::warn!("Unexpected token type '{}' from sign-in", kind);
            }
        }
        Ok(AuthToken::new(response.token))
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<UserAccount, ApiError> {
        let request = self.request(Method::POST, "auth/signup", None)
            .json(credentials);
        self.send_json(request).await
    }

    async fn current_user(&self, token: &AuthToken) -> Result<UserAccount, ApiError> {
        self.send_json(self.request(Method::GET, "auth/users/me", Some(token)))
            .await
    }

    async fn list_policies(&self, token: &AuthToken) -> Result<Vec<Policy>, ApiError> {
        self.send_json(self.request(Method::GET, POLICIES_PATH, Some(token)))
            .await
    }

    async fn get_policy(&self, token: &AuthToken, id: PolicyId) -> Result<Policy, ApiError> {
        self.send_json(self.request(Method::GET, &Self::policy_path(id), Some(token)))
            .await
    }

    async fn create_policy(
        &self,
        token: &AuthToken,
        draft: &PolicyDraft,
    ) -> Result<Policy, ApiError> {
        let request = self.request(Method::POST, POLICIES_PATH, Some(token))
            .json(draft);
        self.send_json(request).await
    }

    async fn update_policy(
        &self,
        token: &AuthToken,
        id: PolicyId,
        draft: &PolicyDraft,
    ) -> Result<Policy, ApiError> {
        let request = self.request(Method::PUT, &Self::policy_path(id), Some(token))
            .json(draft);
        self.send_json(request).await
    }

    async fn delete_policy(&self, token: &AuthToken, id: PolicyId) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &Self::policy_path(id), Some(token)))
            .await
    }
}
