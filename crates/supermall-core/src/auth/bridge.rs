//! Keeps the identity provider session and the backend credential in step.
//!
//! The bridge has two halves:
//!
//! - a passive observer, started with [`IdentityBridge::start`], that reacts
//!   to provider session events. On sign-in it loads the profile record and
//!   installs the cached backend token; on sign-out it clears the token.
//!   The observer never fails: a profile lookup error leaves the session
//!   authenticated without a credential (`has_credential: false`).
//! - active flows ([`IdentityBridge::register`], [`IdentityBridge::login`],
//!   [`IdentityBridge::logout`]) run on behalf of the user. They propagate
//!   every failure.
//!
//! Active flows and the observer's profile sync are serialized, so a
//! sign-in event raised by a flow is synchronized only after that flow has
//! stored its credential.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, Role};

use super::profile::{ProfileError, ProfileStore};
use super::provider::{IdentityProvider, ProviderError};
use super::session::{Identity, ProfileRecord, ProfileUpdate, Session, SessionEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    Unauthenticated,
    SyncingProfile {
        identity: Identity,
    },
    Authenticated {
        identity: Identity,
        /// Whether the profile sync installed a backend token
        has_credential: bool,
    },
}

impl BridgeState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, BridgeState::Authenticated { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            BridgeState::Unauthenticated => None,
            BridgeState::SyncingProfile { identity } | BridgeState::Authenticated { identity, .. } => {
                Some(identity)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Identity provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider session exists but the backend refused the exchange.
    /// Retry with [`IdentityBridge::exchange_credentials`].
    #[error("Backend sign-in failed: {source}")]
    CredentialExchange {
        identity: Identity,
        #[source]
        source: ApiError,
    },

    #[error("Profile sync failed: {0}")]
    ProfileSync(#[from] ProfileError),
}

/// Details collected at sign-up.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub role: Role,
}

struct ObserverTask {
    handle: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

struct BridgeInner {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    api: ApiClient,
    state: watch::Sender<BridgeState>,
    session: RwLock<Option<Session>>,
    flow_lock: tokio::sync::Mutex<()>,
}

pub struct IdentityBridge {
    inner: Arc<BridgeInner>,
    task: Mutex<Option<ObserverTask>>,
}

impl IdentityBridge {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        api: ApiClient,
    ) -> Self {
        let (state, _) = watch::channel(BridgeState::Unauthenticated);
        Self {
            inner: Arc::new(BridgeInner {
                provider,
                profiles,
                api,
                state,
                session: RwLock::new(None),
                flow_lock: tokio::sync::Mutex::new(()),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start observing provider session events. No-op when already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            debug!("Identity bridge already running");
            return;
        }

        let events = self.inner.provider.subscribe();
        let (stop, stop_rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.observe(events, stop_rx).await });
        *task = Some(ObserverTask { handle, stop });
        debug!("Identity bridge started");
    }

    /// Stop the observer and wait for it to finish. Session events still
    /// queued are discarded.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.stop.send(());
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Identity bridge observer ended abnormally");
            }
            debug!("Identity bridge stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub fn state(&self) -> BridgeState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<BridgeState> {
        self.inner.state.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.session.read().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.session.read().as_ref().map(|s| s.identity.clone())
    }

    pub fn current_profile(&self) -> Option<ProfileRecord> {
        self.inner.session.read().as_ref()?.profile.clone()
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    // ===== Active flows =====

    /// Create the provider account, register it with the backend and store
    /// the issued token.
    pub async fn register(
        &self,
        registration: &Registration,
        password: &str,
    ) -> Result<Session, AuthError> {
        let inner = &self.inner;
        let _flow = inner.flow_lock.lock().await;

        let identity = inner
            .provider
            .create_user(&registration.email, password)
            .await?;
        let identity = inner
            .provider
            .update_display_name(&identity, &registration.name)
            .await?;

        let request = RegisterRequest {
            name: registration.name.clone(),
            email: registration.email.clone(),
            password: password.to_string(),
            role: registration.role,
        };
        let auth = inner
            .api
            .register(&request)
            .await
            .map_err(|source| Self::exchange_failed(&identity, source))?;

        let record = ProfileRecord {
            name: Some(registration.name.clone()),
            email: Some(registration.email.clone()),
            role: registration.role,
            backend_token: Some(auth.access_token.clone()),
            backend_user_id: Some(auth.user.id),
            created_at: Some(chrono::Utc::now()),
            last_login: None,
        };
        inner.profiles.set_profile(&identity.uid, &record).await?;

        inner.api.set_token(Some(auth.access_token));
        info!(uid = %identity.uid, backend_user_id = auth.user.id, "Registered");
        Ok(inner.remember(identity, record))
    }

    /// Sign in with the provider, then exchange the same credentials with
    /// the backend.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _flow = self.inner.flow_lock.lock().await;
        let identity = self.inner.provider.sign_in(email, password).await?;
        self.inner.exchange(identity, email, password).await
    }

    /// Repeat the backend exchange for an identity whose provider session
    /// already exists, e.g. after [`AuthError::CredentialExchange`].
    pub async fn exchange_credentials(
        &self,
        identity: &Identity,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let _flow = self.inner.flow_lock.lock().await;
        self.inner.exchange(identity.clone(), email, password).await
    }

    /// Sign out of the provider and drop the backend token.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _flow = self.inner.flow_lock.lock().await;
        self.inner.provider.sign_out().await?;
        self.inner.api.set_token(None);
        info!("Signed out");
        Ok(())
    }

    fn exchange_failed(identity: &Identity, source: ApiError) -> AuthError {
        warn!(uid = %identity.uid, error = %source, "Backend credential exchange failed");
        AuthError::CredentialExchange {
            identity: identity.clone(),
            source,
        }
    }
}

impl Drop for IdentityBridge {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.handle.abort();
        }
    }
}

impl BridgeInner {
    async fn observe(
        self: Arc<Self>,
        mut events: broadcast::Receiver<SessionEvent>,
        mut stop: oneshot::Receiver<()>,
    ) {
        // A session that predates the subscription counts as a sign-in.
        if let Some(identity) = self.provider.current_identity() {
            self.sync_profile(identity).await;
        }

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                event = events.recv() => match event {
                    Ok(SessionEvent::SignedIn(identity)) => self.sync_profile(identity).await,
                    Ok(SessionEvent::SignedOut) => self.end_session().await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Missed session events, resyncing");
                        match self.provider.current_identity() {
                            Some(identity) => self.sync_profile(identity).await,
                            None => self.end_session().await,
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    async fn sync_profile(&self, identity: Identity) {
        let _flow = self.flow_lock.lock().await;
        debug!(uid = %identity.uid, "Syncing profile");
        self.state.send_replace(BridgeState::SyncingProfile {
            identity: identity.clone(),
        });

        // A token installed for another identity must not outlive the switch.
        let switched = self
            .session
            .read()
            .as_ref()
            .is_some_and(|s| s.identity.uid != identity.uid);
        if switched {
            debug!(uid = %identity.uid, "Identity changed, dropping previous token");
            self.api.set_token(None);
        }

        let profile = match self.profiles.get_profile(&identity.uid).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!(uid = %identity.uid, "No profile record, continuing without a backend token");
                None
            }
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "Profile lookup failed, continuing without a backend token");
                None
            }
        };

        let token = profile.as_ref().and_then(|p| p.backend_token.clone());
        let has_credential = token.is_some();
        if let Some(token) = token {
            self.api.set_token(Some(token));
        }

        *self.session.write() = Some(Session {
            identity: identity.clone(),
            profile,
        });
        self.state.send_replace(BridgeState::Authenticated {
            identity,
            has_credential,
        });
    }

    async fn end_session(&self) {
        let _flow = self.flow_lock.lock().await;
        self.api.set_token(None);
        *self.session.write() = None;
        self.state.send_replace(BridgeState::Unauthenticated);
        debug!("Session cleared");
    }

    /// Backend login for `identity`, then persist and install the token.
    /// Callers hold `flow_lock`.
    async fn exchange(
        &self,
        identity: Identity,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let AuthResponse {
            access_token, user, ..
        } = self
            .api
            .login(&credentials)
            .await
            .map_err(|source| IdentityBridge::exchange_failed(&identity, source))?;

        let update = ProfileUpdate::login(access_token.clone(), user.id);
        let record = self.profiles.merge_profile(&identity.uid, &update).await?;

        self.api.set_token(Some(access_token));
        info!(uid = %identity.uid, backend_user_id = user.id, "Logged in");
        Ok(self.remember(identity, record))
    }

    /// Cache the profile when it belongs to the current session.
    fn remember(&self, identity: Identity, record: ProfileRecord) -> Session {
        let session = Session {
            identity,
            profile: Some(record),
        };
        let mut current = self.session.write();
        if current
            .as_ref()
            .is_some_and(|s| s.identity.uid == session.identity.uid)
        {
            *current = Some(session.clone());
        }
        session
    }
}
