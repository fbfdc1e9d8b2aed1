//! Session and context state.
//!
//! One writer (`SessionStore`, owned by the token lifecycle) publishes whole
//! snapshots through a `watch` channel; any number of `SessionReader`s observe
//! them.

use tokio::sync::watch;

use paydesk_auth::{ContextKind, PermissionService, SessionToken, User};

use crate::phase::AuthPhase;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// Context the token is scoped to. Restored sessions take it from the
    /// `user_context` cookie, which the client can write.
    pub current_context: Option<ContextKind>,
    /// Set once a login, second factor or switch response named the context.
    pub context_confirmed: bool,
    pub available_contexts: Vec<ContextKind>,
    pub token: Option<SessionToken>,
    pub phase: AuthPhase,
}

impl SessionState {
    /// State after a successful login, 2FA or context switch.
    pub fn authenticated(
        user: User,
        context: Option<ContextKind>,
        token: SessionToken,
        phase: AuthPhase,
    ) -> Self {
        let available_contexts = user.available_contexts();
        Self {
            user: Some(user),
            current_context: context,
            context_confirmed: true,
            available_contexts,
            token: Some(token),
            phase,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.phase.is_authenticated()
    }

    /// Whether the user can hold a session in more than one context.
    pub fn can_switch(&self) -> bool {
        self.available_contexts.len() > 1
    }

    pub fn permissions(&self) -> PermissionService<'_> {
        PermissionService::new(self.user.as_ref())
    }
}

/// The single writer of session state.
#[derive(Debug)]
pub(crate) struct SessionStore {
    tx: watch::Sender<SessionState>,
}

impl SessionStore {
    pub(crate) fn new(initial: SessionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Replace the whole state.
    pub(crate) fn publish(&self, state: SessionState) {
        self.tx.send_replace(state);
    }

    /// Edit a copy of the current state and publish it.
    pub(crate) fn update(&self, edit: impl FnOnce(&mut SessionState)) {
        let mut next = self.snapshot();
        edit(&mut next);
        self.publish(next);
    }

    pub(crate) fn reader(&self) -> SessionReader {
        SessionReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of the session, cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionState>,
}

impl SessionReader {
    pub fn snapshot(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next published state. `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use paydesk_core::{UserId, VendorId};

    #[tokio::test]
    async fn readers_see_whole_snapshots() {
        let store = SessionStore::new(SessionState::default());
        let mut reader = store.reader();
        assert!(!reader.snapshot().is_authenticated());

        let user = User::new(UserId::new(), "v@example.com").with_vendor(VendorId::new());
        store.publish(SessionState::authenticated(
            user,
            Some(ContextKind::Vendor),
            SessionToken::expiring_in("t", 60, Duration::days(1), Utc::now()),
            AuthPhase::Authenticated,
        ));

        let seen = reader.changed().await.unwrap();
        assert!(seen.is_authenticated());
        assert_eq!(seen.available_contexts, vec![ContextKind::Vendor]);
        assert!(!seen.can_switch());
    }

    #[tokio::test]
    async fn changed_ends_when_writer_drops() {
        let store = SessionStore::new(SessionState::default());
        let mut reader = store.reader();
        drop(store);
        assert!(reader.changed().await.is_none());
    }
}
