// Settings module
// Persisted client configuration for the dashboard

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the policy API, including the `/api` prefix
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Background re-fetch cadence for the policy list; 0 disables it
    pub refresh_interval_secs: u64,
    pub notifications_enabled: bool,
    pub last_email: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 20,
            refresh_interval_secs: 60,
            notifications_enabled: true,
            last_email: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("API URL '{}' must start with http:// or https://", url));
        }

        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0 seconds".to_string());
        }

        Ok(())
    }

    /// Applies the `DMS_API_URL` override. A bare host becomes `https://{host}/api`.
    pub fn apply_api_url_override(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        self.api_url = if value.starts_with("http://") || value.starts_with("https://") {
            value.to_string()
        } else {
            format!("https://{}/api", value.trim_end_matches('/'))
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_validate_rejects_schemeless_url() {
        let settings = Settings {
            api_url: "localhost:3000/api".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_override_with_bare_host() {
        let mut settings = Settings::default();
        settings.apply_api_url_override("dms.example.com/");
        assert_eq!(settings.api_url, "https://dms.example.com/api");
    }

    #[test]
    fn test_override_with_full_url() {
        let mut settings = Settings::default();
        settings.apply_api_url_override("http://127.0.0.1:8000/api");
        assert_eq!(settings.api_url, "http://127.0.0.1:8000/api");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str("refresh_interval_secs = 5").unwrap();
        assert_eq!(settings.refresh_interval_secs, 5);
        assert_eq!(settings.request_timeout_secs, 20);
        assert!(settings.notifications_enabled);
    }
}
