use anyhow::Result;
use notify_rust::{Notification, Timeout};

use crate::models::policy::Policy;

/// Service for displaying desktop notifications when a policy fires.
pub struct NotificationService {
    enabled: bool,
}

impl NotificationService {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Show a notification for a policy whose countdown reached zero
    pub fn show_policy_expired(&self, policy: &Policy) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let (summary, body) = expiry_message(policy);
        Notification::new()
            .summary(&summary)
            .body(&body)
            .timeout(Timeout::Milliseconds(10000))
            .show()
            .map_err(|e| anyhow::anyhow!("Failed to show notification: {}", e))?;

        Ok(())
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Summary and body text for an expired policy.
pub fn expiry_message(policy: &Policy) -> (String, String) {
    let subject = if policy.subject.trim().is_empty() {
        "(no subject)"
    } else {
        policy.subject.trim()
    };
    let recipients = policy.recipient_list();
    let body = match recipients.len() {
        0 => "Time's up! No recipients are configured.".to_string(),
        1 => format!("Time's up! Mail goes to {}.", recipients[0]),
        n => format!("Time's up! Mail goes to {} and {} more.", recipients[0], n - 1),
    };
    (format!("Policy expired: {}", subject), body)
}
