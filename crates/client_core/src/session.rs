//! Explicit session context shared by the list controllers and the cart.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use shared::{
    domain::{Role, UserId},
    protocol::User,
};
use tokio::sync::{broadcast, RwLock};
use tracing::info;

/// Opaque bearer credential issued by the storefront API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: UserId, role: Role },
    SignedOut,
    /// The server rejected the credential.
    Expired,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    token: AccessToken,
    user: User,
    epoch: u64,
}

pub struct Session {
    active: RwLock<Option<ActiveSession>>,
    events: broadcast::Sender<SessionEvent>,
    next_epoch: AtomicU64,
}

impl Session {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            active: RwLock::new(None),
            events,
            next_epoch: AtomicU64::new(1),
        })
    }

    pub async fn sign_in(&self, token: AccessToken, user: User) {
        let event = SessionEvent::SignedIn {
            user_id: user.id,
            role: user.role,
        };
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        info!(user_id = %user.id, role = %user.role, epoch, "session started");
        *self.active.write().await = Some(ActiveSession { token, user, epoch });
        let _ = self.events.send(event);
    }

    /// Explicit logout teardown.
    pub async fn end(&self) {
        if self.active.write().await.take().is_some() {
            info!("session ended");
            let _ = self.events.send(SessionEvent::SignedOut);
        }
    }

    pub async fn expire(&self) {
        if self.active.write().await.take().is_some() {
            info!("session credential rejected by server; signing out");
            let _ = self.events.send(SessionEvent::Expired);
        }
    }

    pub async fn token(&self) -> Option<AccessToken> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|active| active.token.clone())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|active| active.user.clone())
    }

    pub async fn role(&self) -> Option<Role> {
        self.active.read().await.as_ref().map(|active| active.user.role)
    }

    /// Identifies the current sign-in. Every `sign_in` gets a new value, so
    /// state tagged with an old epoch belongs to a session that has ended.
    pub async fn epoch(&self) -> Option<u64> {
        self.active.read().await.as_ref().map(|active| active.epoch)
    }

    pub async fn is_signed_in(&self) -> bool {
        self.active.read().await.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
