//! Session context
//!
//! Holds the signed-in user and announces changes two ways: a
//! `tokio::sync::watch` channel for async subscribers and registered
//! `on_session_change` hooks that run synchronously on the changing thread.

use leadflow_model::User;
use parking_lot::Mutex;
use tokio::sync::watch;

/// What happened to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// A user signed in with no one previously signed in
    SignedIn(User),
    /// The signed-in user signed out
    SignedOut {
        /// User who left
        previous: User,
    },
    /// One user replaced another
    Switched {
        /// User who left
        previous: User,
        /// User now signed in
        current: User,
    },
}

impl SessionChange {
    /// User whose cached views are now stale
    #[must_use]
    pub fn previous(&self) -> Option<&User> {
        match self {
            Self::SignedIn(_) => None,
            Self::SignedOut { previous } | Self::Switched { previous, .. } => Some(previous),
        }
    }

    /// User signed in after the change
    #[must_use]
    pub fn current(&self) -> Option<&User> {
        match self {
            Self::SignedIn(current) | Self::Switched { current, .. } => Some(current),
            Self::SignedOut { .. } => None,
        }
    }
}

type Hook = Box<dyn Fn(&SessionChange) + Send + Sync>;

/// Identity source for the pipeline
pub struct SessionContext {
    tx: watch::Sender<Option<User>>,
    hooks: Mutex<Vec<Hook>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("current", &*self.tx.borrow())
            .field("hooks", &self.hooks.lock().len())
            .finish()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Signed-out context
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            hooks: Mutex::new(Vec::new()),
        }
    }

    /// Context with `user` already signed in
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        let session = Self::new();
        session.tx.send_replace(Some(user));
        session
    }

    /// Current user, if any
    #[must_use]
    pub fn current(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    /// Register a hook run after every change
    pub fn on_session_change<F>(&self, hook: F)
    where
        F: Fn(&SessionChange) + Send + Sync + 'static,
    {
        self.hooks.lock().push(Box::new(hook));
    }

    /// Sign `user` in, replacing whoever was signed in
    ///
    /// Returns `None` when `user` was already the signed-in user.
    pub fn sign_in(&self, user: User) -> Option<SessionChange> {
        let previous = self.tx.send_replace(Some(user.clone()));
        let change = match previous {
            None => SessionChange::SignedIn(user),
            Some(previous) if previous == user => return None,
            Some(previous) => SessionChange::Switched {
                previous,
                current: user,
            },
        };
        self.announce(&change);
        Some(change)
    }

    /// Sign out; `None` when nobody was signed in
    pub fn sign_out(&self) -> Option<SessionChange> {
        let previous = self.tx.send_replace(None)?;
        let change = SessionChange::SignedOut { previous };
        self.announce(&change);
        Some(change)
    }

    fn announce(&self, change: &SessionChange) {
        tracing::info!(
            previous = change.previous().map(|u| u.id.as_str()),
            current = change.current().map(|u| u.id.as_str()),
            "session changed"
        );
        for hook in self.hooks.lock().iter() {
            hook(change);
        }
    }
}
