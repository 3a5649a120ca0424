use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
        }
    }

    /// Display name, falling back to the email address, then the uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// Session change delivered by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Identity),
    SignedOut,
}

/// Locally persisted profile document for one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    /// Backend bearer token cached at the last login/registration
    pub backend_token: Option<String>,
    pub backend_user_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Field-wise update merged into a [`ProfileRecord`]; `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub backend_token: Option<String>,
    pub backend_user_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl ProfileUpdate {
    /// Update written after a successful backend login.
    pub fn login(token: String, backend_user_id: i64) -> Self {
        Self {
            backend_token: Some(token),
            backend_user_id: Some(backend_user_id),
            last_login: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn apply(&self, record: &mut ProfileRecord) {
        if let Some(ref name) = self.name {
            record.name = Some(name.clone());
        }
        if let Some(ref email) = self.email {
            record.email = Some(email.clone());
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        if let Some(ref token) = self.backend_token {
            record.backend_token = Some(token.clone());
        }
        if let Some(id) = self.backend_user_id {
            record.backend_user_id = Some(id);
        }
        if let Some(at) = self.created_at {
            record.created_at = Some(at);
        }
        if let Some(at) = self.last_login {
            record.last_login = Some(at);
        }
    }
}

/// Signed-in identity with its cached profile, if one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub identity: Identity,
    pub profile: Option<ProfileRecord>,
}

impl Session {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            profile: None,
        }
    }

    /// Get the cached backend token if the profile carries one
    pub fn token(&self) -> Option<&str> {
        self.profile.as_ref()?.backend_token.as_deref()
    }

    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    pub fn backend_user_id(&self) -> Option<i64> {
        self.profile.as_ref()?.backend_user_id
    }
}
