//! Keeps the local policy list consistent with the API.
//!
//! The list is never patched locally: every successful fetch replaces it
//! wholesale, and every write is followed by a fresh fetch. Fetches carry a
//! sequence number so a slow, older response cannot overwrite a newer one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::models::policy::{Policy, PolicyDraft, PolicyId};
use crate::services::api::{ApiError, AuthToken, PolicyApi};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyListState {
    pub policies: Vec<Policy>,
    /// Bumped every time the list is replaced
    pub generation: u64,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Replaced { count: usize },
    /// A newer fetch was issued while this one was in flight; its result was dropped.
    Stale { seq: u64, latest: u64 },
    Failed(ApiError),
}

impl LoadOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, LoadOutcome::Replaced { .. })
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            LoadOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Owns the policy list for one signed-in session.
///
/// All methods take `&self` so several requests can be in flight at once on
/// a single-threaded runtime; no borrow is held across an await.
pub struct PolicySynchronizer {
    api: Rc<dyn PolicyApi>,
    token: AuthToken,
    state: RefCell<PolicyListState>,
    issued: Cell<u64>,
}

impl PolicySynchronizer {
    pub fn new(api: Rc<dyn PolicyApi>, token: AuthToken) -> Self {
        Self {
            api,
            token,
            state: RefCell::new(PolicyListState::default()),
            issued: Cell::new(0),
        }
    }

    pub fn policies(&self) -> Vec<Policy> {
        self.state.borrow().policies.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    pub fn contains(&self, id: PolicyId) -> bool {
        self.state.borrow().policies.iter().any(|policy| policy.id == id)
    }

    pub fn latest_issued(&self) -> u64 {
        self.issued.get()
    }

    /// Tags a new fetch. Only the most recently issued tag may replace the list.
    pub fn issue_load(&self) -> u64 {
        let seq = self.issued.get() + 1;
        self.issued.set(seq);
        seq
    }

    /// Applies the result of fetch `seq`.
    pub fn apply_load(&self, seq: u64, result: Result<Vec<Policy>, ApiError>) -> LoadOutcome {
        let latest = self.issued.get();
        if seq != latest {
            log::debug!("Discarding policy list response {} (latest is {})", seq, latest);
            return LoadOutcome::Stale { seq, latest };
        }

        match result {
            Ok(policies) => {
                let count = policies.len();
                let mut state = self.state.borrow_mut();
                state.policies = policies;
                state.generation += 1;
                log::info!(
                    "Loaded {} polic{} (generation {})",
                    count,
                    if count == 1 { "y" } else { "ies" },
                    state.generation
                );
                LoadOutcome::Replaced { count }
            }
            Err(err) => {
                log::warn!("Failed to load policies: {}", err);
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Fetches the user's policies and replaces the list on success.
    /// On failure the previous list is kept as-is.
    pub async fn load_policies(&self) -> LoadOutcome {
        let seq = self.issue_load();
        let result = self.api.list_policies(&self.token).await;
        self.apply_load(seq, result)
    }

    /// Deletes a policy, then re-fetches the list from the API.
    pub async fn delete_policy(&self, id: PolicyId) -> Result<LoadOutcome, ApiError> {
        if let Err(err) = self.api.delete_policy(&self.token, id).await {
            log::warn!("Failed to delete policy {}: {}", id, err);
            return Err(err);
        }

        log::info!("Deleted policy {}", id);
        Ok(self.load_policies().await)
    }

    pub async fn create_policy(&self, draft: &PolicyDraft) -> Result<(Policy, LoadOutcome), ApiError> {
        let created = self
            .api
            .create_policy(&self.token, draft)
            .await
            .inspect_err(|err| log::warn!("Failed to create policy: {}", err))?;

        log::info!("Created policy {}", created.id);
        let outcome = self.load_policies().await;
        Ok((created, outcome))
    }

    pub async fn update_policy(
        &self,
        id: PolicyId,
        draft: &PolicyDraft,
    ) -> Result<(Policy, LoadOutcome), ApiError> {
        let updated = self
            .api
            .update_policy(&self.token, id, draft)
            .await
            .inspect_err(|err| log::warn!("Failed to update policy {}: {}", id, err))?;

        log::info!("Updated policy {}", id);
        let outcome = self.load_policies().await;
        Ok((updated, outcome))
    }

    /// Reads one policy for editing. Does not touch the list.
    pub async fn fetch_policy(&self, id: PolicyId) -> Result<Policy, ApiError> {
        self.api.get_policy(&self.token, id).await
    }
}
