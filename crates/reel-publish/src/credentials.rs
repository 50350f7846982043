//! Publishing credentials.
//!
//! The OAuth consent flow lives outside this workspace; whatever completes it
//! writes the resulting token into a [`CredentialStore`]. The pipeline only
//! reads.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth access token for the hosting service.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// None means the token does not expire (or expiry is unknown)
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_at(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(expires_at),
        }
    }

    /// Usable at `now`: non-empty and not within the expiry margin.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.trim().is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Source of the current publishing credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The stored token, if one exists and is still valid.
    async fn current(&self) -> Option<AccessToken>;

    /// Forget the stored token after the hosting service rejected it.
    async fn invalidate(&self);
}

/// Process-local credential store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentials {
    inner: Arc<RwLock<Option<AccessToken>>>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(token))),
        }
    }

    /// Seed from `YOUTUBE_ACCESS_TOKEN`, empty when unset.
    pub fn from_env() -> Self {
        match std::env::var("YOUTUBE_ACCESS_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Self::with_token(AccessToken::new(token)),
            _ => Self::new(),
        }
    }

    pub async fn set(&self, token: AccessToken) {
        *self.inner.write().await = Some(token);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentials {
    async fn current(&self) -> Option<AccessToken> {
        self.inner
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_valid())
            .cloned()
    }

    async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}
