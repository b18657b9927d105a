// Test fixtures - reusable test data and an in-memory policy backend
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dms_dashboard::models::policy::{Policy, PolicyDraft, PolicyId, PolicyStatus};
use dms_dashboard::services::api::{ApiError, AuthToken, Credentials, PolicyApi, UserAccount};

pub const EMAIL: &str = "owner@example.com";
pub const PASSWORD: &str = "secret123";
pub const TOKEN: &str = "token-owner";

/// Fixed instant most fixtures are expressed against
pub fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
}

pub fn policy(id: i64, expiration: impl Into<String>) -> Policy {
    Policy {
        id: PolicyId(id),
        sender_id: Some(1),
        recipients: "friend@example.com".to_string(),
        subject: format!("policy {}", id),
        body: "The key is under the mat.".to_string(),
        expiration_date: expiration.into(),
        attachments: Vec::new(),
        status: PolicyStatus::Active,
    }
}

/// A policy far enough out that it never expires during a test
pub fn future_policy(id: i64) -> Policy {
    policy(id, "2099-01-01T00:00:00Z")
}

pub fn draft(subject: &str) -> PolicyDraft {
    PolicyDraft {
        recipients: "friend@example.com".to_string(),
        subject: subject.to_string(),
        body: "hello".to_string(),
        expiration_date: "2099-06-01".to_string(),
        attachments: vec!["will.pdf".to_string()],
        status: PolicyStatus::Active,
    }
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub policies: Vec<Policy>,
    pub next_id: i64,
    /// Delay applied to successive list calls; the server state is read
    /// before the delay, like a slow response to an early request.
    pub list_delays: VecDeque<Duration>,
    pub fail_deletes: bool,
    pub calls: Vec<String>,
}

/// In-memory stand-in for the policy API. Clones share state.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn with_policies(policies: Vec<Policy>) -> Self {
        let next_id = policies.iter().map(|p| p.id.0).max().unwrap_or(0) + 1;
        let backend = Self::default();
        {
            let mut state = backend.state();
            state.policies = policies;
            state.next_id = next_id;
        }
        backend
    }

    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|call| call.as_str() == name).count()
    }

    fn authorize(&self, token: &AuthToken, call: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        if token.as_str() == TOKEN {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[async_trait(?Send)]
impl PolicyApi for FakeBackend {
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        self.state().calls.push("sign_in".to_string());
        if credentials.email == EMAIL && credentials.password == PASSWORD {
            Ok(AuthToken::new(TOKEN))
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<UserAccount, ApiError> {
        self.state().calls.push("sign_up".to_string());
        Ok(UserAccount {
            id: Some(2),
            email: credentials.email.clone(),
            is_active: true,
        })
    }

    async fn current_user(&self, token: &AuthToken) -> Result<UserAccount, ApiError> {
        self.authorize(token, "current_user")?;
        Ok(UserAccount {
            id: Some(1),
            email: EMAIL.to_string(),
            is_active: true,
        })
    }

    async fn list_policies(&self, token: &AuthToken) -> Result<Vec<Policy>, ApiError> {
        self.authorize(token, "list_policies")?;
        let (snapshot, delay) = {
            let mut state = self.state();
            (state.policies.clone(), state.list_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn get_policy(&self, token: &AuthToken, id: PolicyId) -> Result<Policy, ApiError> {
        self.authorize(token, "get_policy")?;
        self.state()
            .policies
            .iter()
            .find(|policy| policy.id == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_policy(
        &self,
        token: &AuthToken,
        draft: &PolicyDraft,
    ) -> Result<Policy, ApiError> {
        self.authorize(token, "create_policy")?;
        let mut state = self.state();
        let id = PolicyId(state.next_id.max(1));
        state.next_id = id.0 + 1;
        let created = Policy {
            id,
            sender_id: Some(1),
            recipients: draft.recipients.clone(),
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            expiration_date: draft.expiration_date.clone(),
            attachments: draft.attachments.clone(),
            status: draft.status,
        };
        state.policies.push(created.clone());
        Ok(created)
    }

    async fn update_policy(
        &self,
        token: &AuthToken,
        id: PolicyId,
        draft: &PolicyDraft,
    ) -> Result<Policy, ApiError> {
        self.authorize(token, "update_policy")?;
        let mut state = self.state();
        let existing = state
            .policies
            .iter_mut()
            .find(|policy| policy.id == id)
            .ok_or(ApiError::NotFound)?;
        existing.recipients = draft.recipients.clone();
        existing.subject = draft.subject.clone();
        existing.body = draft.body.clone();
        existing.expiration_date = draft.expiration_date.clone();
        existing.attachments = draft.attachments.clone();
        existing.status = draft.status;
        Ok(existing.clone())
    }

    async fn delete_policy(&self, token: &AuthToken, id: PolicyId) -> Result<(), ApiError> {
        self.authorize(token, "delete_policy")?;
        let mut state = self.state();
        if state.fail_deletes {
            return Err(ApiError::from_status(500, "database is locked"));
        }
        let before = state.policies.len();
        state.policies.retain(|policy| policy.id != id);
        if state.policies.len() == before {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
