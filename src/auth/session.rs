//! Session state for cloudshelf.
//!
//! The session is process-wide state owned by the backend client. The rest of
//! the crate reads it only through [`SessionPort::current_account`]; code that
//! needs to react to sign-in/sign-out holds a [`SessionSubscription`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::item::AccountId;

/// A signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSession {
    /// Account that owns every record read or written.
    pub account_id: AccountId,
    /// Contact address, if the backend reported one.
    pub email: Option<String>,
    /// When the session started.
    pub signed_in_at: DateTime<Utc>,
}

impl AccountSession {
    /// Create a session for an account starting now.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            email: None,
            signed_in_at: Utc::now(),
        }
    }

    /// Set the contact address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Narrow accessor for "who is signed in".
#[async_trait]
pub trait SessionPort: Send + Sync {
    /// The current account, or None when nobody is signed in.
    async fn current_account(&self) -> Option<AccountId>;
}

/// Holds the current session and notifies subscribers when it changes.
#[derive(Debug)]
pub struct SessionStore {
    sender: watch::Sender<Option<AccountSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a store with nobody signed in.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Create a store with an account already signed in.
    pub fn signed_in(account_id: AccountId) -> Self {
        let store = Self::new();
        store.sign_in(AccountSession::new(account_id));
        store
    }

    /// Replace the current session.
    pub fn sign_in(&self, session: AccountSession) {
        info!(account = %session.account_id, "Signed in");
        self.sender.send_replace(Some(session));
    }

    /// Clear the current session.
    ///
    /// Returns the session that was active, if any.
    pub fn sign_out(&self) -> Option<AccountSession> {
        let previous = self.sender.send_replace(None);
        if let Some(ref session) = previous {
            info!(account = %session.account_id, "Signed out");
        }
        previous
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Option<AccountSession> {
        self.sender.borrow().clone()
    }

    /// Start receiving session change notifications.
    pub fn subscribe(&self) -> SessionSubscription {
        debug!(
            subscribers = self.sender.receiver_count() + 1,
            "Session subscription added"
        );
        SessionSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl SessionPort for SessionStore {
    async fn current_account(&self) -> Option<AccountId> {
        self.sender
            .borrow()
            .as_ref()
            .map(|session| session.account_id.clone())
    }
}

/// Receives session changes until unsubscribed or dropped.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: watch::Receiver<Option<AccountSession>>,
}

impl SessionSubscription {
    /// Wait for the next change.
    ///
    /// Returns the new session state, or None once the store is gone.
    pub async fn changed(&mut self) -> Option<Option<AccountSession>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// The session state as last observed.
    pub fn current(&self) -> Option<AccountSession> {
        self.receiver.borrow().clone()
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        debug!("Session subscription removed");
    }
}
