use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::date::parse_expiration;

/// Identifier assigned by the policy API. Never generated client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub i64);

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase on the wire. Reading is case-insensitive and anything the
/// dashboard does not know reads as `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    /// Mail goes out when the countdown reaches zero
    #[default]
    Active,
    /// Paused by the owner
    Inactive,
}

impl<'de> Deserialize<'de> for PolicyStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawStatus {
            Text(String),
            Other(IgnoredAny),
        }

        Ok(match RawStatus::deserialize(deserializer)? {
            RawStatus::Text(text) if text.trim().eq_ignore_ascii_case("inactive") => {
                PolicyStatus::Inactive
            }
            RawStatus::Text(text) => {
                if !text.trim().eq_ignore_ascii_case("active") {
                    log::debug!("Unknown policy status '{}', treating as active", text);
                }
                PolicyStatus::Active
            }
            RawStatus::Other(_) => PolicyStatus::Active,
        })
    }
}

impl PolicyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "Active",
            PolicyStatus::Inactive => "Inactive",
        }
    }
}

/// A dead man's switch record as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub recipients: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, deserialize_with = "deserialize_expiration")]
    pub expiration_date: String,
    #[serde(default, with = "attachment_list")]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub status: PolicyStatus,
}

impl Policy {
    /// Absolute expiration instant, or `None` when the wire value is malformed.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_expiration(&self.expiration_date)
    }

    pub fn recipient_list(&self) -> Vec<&str> {
        split_recipients(&self.recipients)
    }

    /// Seeds an edit form with the current values.
    pub fn to_draft(&self) -> PolicyDraft {
        PolicyDraft {
            recipients: self.recipients.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            expiration_date: self.expiration_date.clone(),
            attachments: self.attachments.clone(),
            status: self.status,
        }
    }
}

/// Request body for creating or updating a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PolicyDraft {
    pub recipients: String,
    pub subject: String,
    pub body: String,
    pub expiration_date: String,
    #[serde(with = "attachment_list")]
    pub attachments: Vec<String>,
    pub status: PolicyStatus,
}

impl PolicyDraft {
    pub fn validate(&self) -> Result<(), String> {
        if split_recipients(&self.recipients).is_empty() {
            return Err("At least one recipient is required".to_string());
        }

        if let Some(bad) = split_recipients(&self.recipients)
            .into_iter()
            .find(|recipient| !recipient.contains('@'))
        {
            return Err(format!("'{}' is not an email address", bad));
        }

        if self.subject.trim().is_empty() {
            return Err("Subject cannot be empty".to_string());
        }

        if parse_expiration(&self.expiration_date).is_none() {
            return Err("Expiration date is missing or not a valid date".to_string());
        }

        Ok(())
    }

    /// Adds an attachment name unless it is blank or already listed.
    pub fn add_attachment(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() || self.attachments.iter().any(|existing| existing == name) {
            return false;
        }
        self.attachments.push(name.to_string());
        true
    }

    pub fn remove_attachment(&mut self, name: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|existing| existing != name);
        before != self.attachments.len()
    }
}

/// Recipients are entered space separated; commas and semicolons are tolerated.
pub fn split_recipients(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|part| !part.is_empty())
        .collect()
}

fn deserialize_expiration<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawExpiration {
        Text(String),
        Seconds(i64),
        Fractional(f64),
        Missing(()),
        Other(IgnoredAny),
    }

    // Anything unreadable becomes "", which counts as already expired
    Ok(match RawExpiration::deserialize(deserializer)? {
        RawExpiration::Text(text) => text,
        RawExpiration::Seconds(secs) => secs.to_string(),
        RawExpiration::Fractional(secs) => (secs.trunc() as i64).to_string(),
        RawExpiration::Missing(()) => String::new(),
        RawExpiration::Other(_) => String::new(),
    })
}

/// Attachments travel as one comma-joined string of file names.
pub mod attachment_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(names: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&join(names))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAttachments {
            Joined(String),
            List(Vec<String>),
            Missing(()),
        }

        Ok(match RawAttachments::deserialize(deserializer)? {
            RawAttachments::Joined(joined) => split(&joined),
            RawAttachments::List(list) => list
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            RawAttachments::Missing(()) => Vec::new(),
        })
    }

    pub fn split(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn join(names: &[String]) -> String {
        names.join(",")
    }
}
