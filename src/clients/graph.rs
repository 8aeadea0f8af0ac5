//! Microsoft Graph directory client
//!
//! Evidence gatherer for the compliance evaluator and source for
//! directory sync. Client-credentials flow, no delegated auth.

use serde::Deserialize;
use thiserror::Error;

use crate::compliance::{AdminAccount, MfaRegistration};
use crate::config::Config;

/// Role template id of the Global Administrator directory role.
const GLOBAL_ADMIN_ROLE_TEMPLATE: &str = "62e90394-69f5-4237-9190-012177145e10";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("directory credentials missing or rejected")]
    Auth,

    #[error("directory API rate limit exceeded")]
    RateLimited,

    #[error("directory API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("directory API unreachable: {0}")]
    Network(#[from] reqwest::Error),
}

/// One directory account, as needed for employee sync.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    pub principal: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GraphCollection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationDetail {
    user_principal_name: String,
    #[serde(default)]
    is_mfa_registered: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryMember {
    user_principal_name: Option<String>,
    display_name: Option<String>,
    mail: Option<String>,
    job_title: Option<String>,
}

impl GraphClient {
    /// Build a client when all three Entra credentials are configured.
    pub fn from_config(http: reqwest::Client, config: &Config) -> Option<Self> {
        match (
            config.graph_tenant_id.clone(),
            config.graph_client_id.clone(),
            config.graph_client_secret.clone(),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(Self {
                http,
                tenant_id,
                client_id,
                client_secret,
            }),
            _ => None,
        }
    }

    async fn token(&self) -> Result<String, GraphError> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        );

        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", "https://graph.microsoft.com/.default"),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GraphError::Auth);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn get_collection<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, GraphError> {
        let token = self.token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GraphError::RateLimited);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GraphError::Auth);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GraphError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let collection: GraphCollection<T> = response.json().await?;
        Ok(collection.value)
    }

    /// MFA registration report for every user in the tenant.
    pub async fn fetch_mfa_report(&self) -> Result<Vec<MfaRegistration>, GraphError> {
        let details: Vec<RegistrationDetail> = self
            .get_collection(
                "https://graph.microsoft.com/beta/reports/credentialUserRegistrationDetails",
            )
            .await?;

        Ok(details
            .into_iter()
            .map(|d| MfaRegistration {
                principal: d.user_principal_name,
                mfa_registered: d.is_mfa_registered,
            })
            .collect())
    }

    /// Accounts currently holding the Global Administrator role.
    pub async fn fetch_global_admins(&self) -> Result<Vec<AdminAccount>, GraphError> {
        let url = format!(
            "https://graph.microsoft.com/v1.0/directoryRoles/roleTemplateId={}/members",
            GLOBAL_ADMIN_ROLE_TEMPLATE
        );
        let members: Vec<DirectoryMember> = self.get_collection(&url).await?;

        Ok(members
            .into_iter()
            .filter_map(|m| m.user_principal_name)
            .map(|principal| AdminAccount { principal })
            .collect())
    }

    /// Full user list for directory sync. Only identity fields are pulled.
    pub async fn fetch_users(&self) -> Result<Vec<DirectoryUser>, GraphError> {
        let members: Vec<DirectoryMember> = self
            .get_collection(
                "https://graph.microsoft.com/v1.0/users?$select=displayName,mail,userPrincipalName,jobTitle&$top=999",
            )
            .await?;

        Ok(members
            .into_iter()
            .filter_map(|m| {
                let principal = m.user_principal_name?;
                Some(DirectoryUser {
                    principal,
                    email: m.mail,
                    display_name: m.display_name,
                    job_title: m.job_title,
                })
            })
            .collect())
    }
}
