//! Identity provider port.
//!
//! The identity provider owns sign-in/sign-out and reports session changes
//! on a broadcast channel. It knows nothing about backend tokens.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use super::session::{Identity, SessionEvent};

/// Capacity of the session event channel
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already in use: {0}")]
    EmailInUse(String),

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("Identity provider unreachable: {0}")]
    Network(#[from] reqwest::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<Identity, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    fn current_identity(&self) -> Option<Identity>;

    /// Receive every session change from now on, in order.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

struct LocalAccount {
    password: String,
    identity: Identity,
}

/// In-process identity provider with local accounts.
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, LocalAccount>>,
    current: RwLock<Option<Identity>>,
    events: broadcast::Sender<SessionEvent>,
    next_uid: AtomicU64,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            events,
            next_uid: AtomicU64::new(1),
        }
    }

    /// Add an account with a fixed uid.
    pub fn with_account(self, uid: &str, email: &str, password: &str) -> Self {
        let identity = Identity {
            uid: uid.to_string(),
            display_name: None,
            email: Some(email.to_string()),
        };
        self.accounts.write().insert(
            email.to_ascii_lowercase(),
            LocalAccount {
                password: password.to_string(),
                identity,
            },
        );
        self
    }

    fn set_current(&self, identity: Option<Identity>) {
        *self.current.write() = identity.clone();
        let event = match identity {
            Some(identity) => SessionEvent::SignedIn(identity),
            None => SessionEvent::SignedOut,
        };
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_user(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let key = email.to_ascii_lowercase();
        let identity = {
            let mut accounts = self.accounts.write();
            if accounts.contains_key(&key) {
                return Err(ProviderError::EmailInUse(email.to_string()));
            }
            let uid = format!("local-{}", self.next_uid.fetch_add(1, Ordering::Relaxed));
            let identity = Identity {
                uid,
                display_name: None,
                email: Some(email.to_string()),
            };
            accounts.insert(
                key,
                LocalAccount {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };
        debug!(uid = %identity.uid, "Local account created");
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn update_display_name(
        &self,
        identity: &Identity,
        name: &str,
    ) -> Result<Identity, ProviderError> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .values_mut()
            .find(|a| a.identity.uid == identity.uid)
            .ok_or(ProviderError::NotSignedIn)?;
        account.identity.display_name = Some(name.to_string());
        let updated = account.identity.clone();
        drop(accounts);

        let mut current = self.current.write();
        if current.as_ref().is_some_and(|c| c.uid == updated.uid) {
            *current = Some(updated.clone());
        }
        Ok(updated)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let identity = {
            let accounts = self.accounts.read();
            match accounts.get(&email.to_ascii_lowercase()) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => return Err(ProviderError::InvalidCredentials),
            }
        };
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_current(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.read().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
