//! Breach intelligence feed
//!
//! HIBP-backed when an API key is configured, deterministic sample data
//! otherwise so the scan flow works in demo installs.

use serde::Deserialize;
use thiserror::Error;

const HIBP_API_URL: &str = "https://haveibeenpwned.com/api/v3/breachedaccount";

#[derive(Debug, Error)]
pub enum BreachError {
    #[error("breach feed rate limit exceeded")]
    RateLimited,

    #[error("breach feed error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("breach feed unreachable: {0}")]
    Network(#[from] reqwest::Error),
}

/// One confirmed credential exposure for an account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BreachRecord {
    pub name: String,
    #[serde(default)]
    pub data_classes: Vec<String>,
    pub breach_date: String,
}

#[derive(Clone)]
pub struct BreachFeed {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl BreachFeed {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    /// True when no API key is configured and sample data is served.
    pub fn demo_mode(&self) -> bool {
        self.api_key.is_none()
    }

    /// Look up confirmed breaches for one email address.
    pub async fn lookup(&self, email: &str) -> Result<Vec<BreachRecord>, BreachError> {
        match &self.api_key {
            Some(key) => self.lookup_live(email, key).await,
            None => Ok(sample_breaches(email)),
        }
    }

    async fn lookup_live(&self, email: &str, api_key: &str) -> Result<Vec<BreachRecord>, BreachError> {
        let url = format!(
            "{}/{}?truncateResponse=false",
            HIBP_API_URL,
            urlencoding::encode(email)
        );

        let response = self
            .http
            .get(&url)
            .header("hibp-api-key", api_key)
            .header("user-agent", "Kinetis-Security-App-v1")
            .send()
            .await?;

        match response.status().as_u16() {
            // Not found means the account is clean
            404 => Ok(Vec::new()),
            429 => Err(BreachError::RateLimited),
            status if !response.status().is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(BreachError::Api { status, message })
            }
            _ => Ok(response.json().await?),
        }
    }
}

/// Deterministic demo data: addresses containing an 'a' get two
/// well-known historical breaches, everything else is clean.
fn sample_breaches(email: &str) -> Vec<BreachRecord> {
    if !email.contains('a') {
        return Vec::new();
    }
    vec![
        BreachRecord {
            name: "LinkedIn".to_string(),
            data_classes: vec![
                "Email addresses".to_string(),
                "Job titles".to_string(),
                "Phone numbers".to_string(),
                "Social media profiles".to_string(),
            ],
            breach_date: "2021-04-08".to_string(),
        },
        BreachRecord {
            name: "Canva".to_string(),
            data_classes: vec![
                "Email addresses".to_string(),
                "Names".to_string(),
                "Usernames".to_string(),
                "Passwords".to_string(),
            ],
            breach_date: "2019-05-24".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_data_is_deterministic() {
        assert_eq!(sample_breaches("maria@corp.test").len(), 2);
        assert!(sample_breaches("joe@corp.test").is_empty());
        assert_eq!(
            sample_breaches("maria@corp.test"),
            sample_breaches("maria@corp.test")
        );
    }
}
