//! Firebase Authentication over its REST API.
//!
//! Uses the Identity Toolkit endpoints `accounts:signUp`,
//! `accounts:signInWithPassword` and `accounts:update`. The Firebase ID
//! token is kept in memory only; it identifies the user to Firebase and is
//! never sent to the SuperMall backend.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::provider::{IdentityProvider, ProviderError, EVENT_CHANNEL_CAPACITY};
use super::session::{Identity, SessionEvent};

/// Base URL of the Identity Toolkit REST API
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

struct SignedIn {
    identity: Identity,
    id_token: String,
}

pub struct FirebaseAuthProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    current: RwLock<Option<SignedIn>>,
    events: broadcast::Sender<SessionEvent>,
}

impl FirebaseAuthProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_endpoint(api_key, IDENTITY_TOOLKIT_URL)
    }

    /// Point the provider at another Identity Toolkit host (e.g. the emulator).
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl AsRef<str>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            client,
            endpoint: endpoint.as_ref().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            current: RwLock::new(None),
            events,
        })
    }

    async fn call<B: Serialize>(&self, action: &str, body: &B) -> Result<AccountResponse, ProviderError> {
        let url = format!("{}/accounts:{}", self.endpoint, action);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            warn!(action = action, code = %code, "Firebase request rejected");
            return Err(Self::map_error(&code));
        }
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Rejected(format!("Unexpected Firebase response: {}", e)))
    }

    /// Map an Identity Toolkit error code (e.g. `EMAIL_EXISTS`) to a provider error.
    fn map_error(code: &str) -> ProviderError {
        // Codes may carry a suffix: "WEAK_PASSWORD : Password should be ..."
        let name = code.split(':').next().unwrap_or(code).trim();
        match name {
            "EMAIL_EXISTS" => ProviderError::EmailInUse(name.to_string()),
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                ProviderError::InvalidCredentials
            }
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => ProviderError::NotSignedIn,
            _ => ProviderError::Rejected(code.to_string()),
        }
    }

    fn install(&self, account: AccountResponse) -> Result<Identity, ProviderError> {
        let id_token = account
            .id_token
            .ok_or_else(|| ProviderError::Rejected("Response carried no ID token".to_string()))?;
        let identity = Identity {
            uid: account.local_id,
            display_name: account.display_name.filter(|n| !n.is_empty()),
            email: account.email,
        };
        *self.current.write() = Some(SignedIn {
            identity: identity.clone(),
            id_token,
        });
        let _ = self.events.send(SessionEvent::SignedIn(identity.clone()));
        debug!(uid = %identity.uid, "Firebase session established");
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuthProvider {
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account = self.call("signUp", &body).await?;
        self.install(account)
    }

    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<Identity, ProviderError> {
        let id_token = self
            .current
            .read()
            .as_ref()
            .filter(|s| s.identity.uid == identity.uid)
            .map(|s| s.id_token.clone())
            .ok_or(ProviderError::NotSignedIn)?;

        let body = UpdateRequest {
            id_token: &id_token,
            display_name: name,
            return_secure_token: false,
        };
        self.call("update", &body).await?;

        let mut current = self.current.write();
        let updated = Identity {
            display_name: Some(name.to_string()),
            ..identity.clone()
        };
        if let Some(ref mut signed_in) = *current {
            if signed_in.identity.uid == updated.uid {
                signed_in.identity = updated.clone();
            }
        }
        Ok(updated)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let account = self.call("signInWithPassword", &body).await?;
        self.install(account)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        *self.current.write() = None;
        let _ = self.events.send(SessionEvent::SignedOut);
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.read().as_ref().map(|s| s.identity.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_codes() {
        assert!(matches!(
            FirebaseAuthProvider::map_error("EMAIL_EXISTS"),
            ProviderError::EmailInUse(_)
        ));
        assert!(matches!(
            FirebaseAuthProvider::map_error("INVALID_LOGIN_CREDENTIALS"),
            ProviderError::InvalidCredentials
        ));
        assert!(matches!(
            FirebaseAuthProvider::map_error("TOKEN_EXPIRED"),
            ProviderError::NotSignedIn
        ));
        match FirebaseAuthProvider::map_error("WEAK_PASSWORD : Password should be at least 6 characters") {
            ProviderError::Rejected(msg) => assert!(msg.starts_with("WEAK_PASSWORD")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_sign_in_response() {
        let json = r#"{"kind":"identitytoolkit#VerifyPasswordResponse","localId":"abc123","email":"a@x.com","displayName":"","idToken":"id-tok","registered":true,"refreshToken":"r","expiresIn":"3600"}"#;
        let account: AccountResponse = serde_json::from_str(json).unwrap();
        assert_eq!(account.local_id, "abc123");
        assert_eq!(account.id_token.as_deref(), Some("id-tok"));

        let provider = FirebaseAuthProvider::with_endpoint("key", "http://localhost:9099/v1/").unwrap();
        assert_eq!(provider.endpoint, "http://localhost:9099/v1");
        let identity = provider.install(account).unwrap();
        assert_eq!(identity.display_name, None);
        assert_eq!(provider.current_identity(), Some(identity));
    }
}
