use quire_common::{BlogApi, QuireError, SessionPersistence, StoredSession, User};
use tokio::sync::{Mutex, watch};

use super::{AuthState, RestoreResult};

/// Process-wide record of who is logged in.
///
/// Writers persist first, then update the in-memory state, which also wakes
/// every [`watch::Receiver`] handed out by [`SessionStore::subscribe`].
/// Writes are serialized; reads never wait on them.
#[derive(Debug)]
pub struct SessionStore<P> {
    persistence: P,
    state: watch::Sender<AuthState>,
    writes: Mutex<()>,
}

impl<P: SessionPersistence> SessionStore<P> {
    pub fn new(persistence: P) -> Self {
        Self {
            persistence,
            state: watch::Sender::new(AuthState::default()),
            writes: Mutex::new(()),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub async fn set_session(&self, session: StoredSession) -> Result<(), QuireError> {
        let _guard = self.writes.lock().await;
        self.persistence.save(&session).await?;
        tracing::debug!(user_id = %session.user.id, "session stored");
        self.state
            .send_modify(|state| state.set_authenticated(session.user));
        Ok(())
    }

    /// Drop the session, including the persisted copy.
    pub async fn clear_session(&self) -> Result<(), QuireError> {
        let _guard = self.writes.lock().await;
        self.persistence.clear().await?;
        self.state.send_modify(AuthState::clear);
        tracing::debug!("session cleared");
        Ok(())
    }

    /// Load the persisted session at start-up and hand its credential back
    /// to `api`. Unreadable data is purged.
    pub async fn restore(&self, api: &impl BlogApi) -> RestoreResult {
        let loaded = self.persistence.load().await;
        match loaded {
            Ok(None) => RestoreResult::NoSession,
            Ok(Some(session)) => {
                if let Some(credential) = &session.credential {
                    api.restore_credential(credential);
                }
                tracing::debug!(user_id = %session.user.id, "session restored");
                self.state
                    .send_modify(|state| state.set_authenticated(session.user));
                RestoreResult::Restored
            }
            Err(e) => {
                tracing::warn!("Session restore failed, clearing dead session: {e}");
                let _ = self.persistence.clear().await;
                RestoreResult::SessionExpired
            }
        }
    }

    /// Clear the session when `err` says the server no longer accepts it.
    /// Returns whether it did.
    pub async fn invalidate_on(&self, err: &QuireError) -> bool {
        if !err.is_unauthorized() || !self.is_authenticated() {
            return false;
        }
        tracing::warn!("server rejected the session, logging out");
        if let Err(e) = self.clear_session().await {
            tracing::warn!("could not clear rejected session: {e}");
        }
        true
    }
}
