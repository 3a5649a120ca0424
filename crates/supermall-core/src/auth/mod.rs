//! Authentication module for credentials and identity sessions.
//!
//! This module provides:
//! - `TokenStore`: the single active backend bearer token, with memory,
//!   file and OS keychain backends
//! - `IdentityProvider`: sign-in/sign-out with an external identity service
//!   (local accounts or Firebase)
//! - `ProfileStore`: per-identity profile records caching the backend token
//! - `IdentityBridge`: keeps the provider session and the backend token in
//!   sync

pub mod bridge;
pub mod firebase;
pub mod profile;
pub mod provider;
pub mod session;
pub mod token_store;

pub use bridge::{AuthError, BridgeState, IdentityBridge, Registration};
pub use firebase::FirebaseAuthProvider;
pub use profile::{FileProfileStore, MemoryProfileStore, ProfileError, ProfileStore};
pub use provider::{IdentityProvider, MemoryIdentityProvider, ProviderError};
pub use session::{Identity, ProfileRecord, ProfileUpdate, Session, SessionEvent};
pub use token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
