use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use super::{SessionManager, UserStore};
use crate::models::{AuthenticatedUser, TokenGrant};

/// Notifications for the front-end root. `ReauthRequired` means "navigate to login".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: i64 },
    Refreshed,
    LoggedOut,
    ReauthRequired,
}

/// Explicitly constructed session state handed to the request pipeline and the UI root.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    sessions: SessionManager,
    users: UserStore,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for SessionContext {
    fn default() -> Self {
        let (events, _rx) = broadcast::channel(32);
        Self { inner: Arc::new(Inner { sessions: SessionManager::new(), users: UserStore::new(), events }) }
    }
}

impl SessionContext {
    pub fn new() -> Self { Self::default() }

    pub fn sessions(&self) -> &SessionManager { &self.inner.sessions }

    pub fn users(&self) -> &UserStore { &self.inner.users }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> { self.inner.events.subscribe() }

    pub fn current_user(&self) -> Option<AuthenticatedUser> { self.inner.users.current() }

    pub(crate) fn emit(&self, ev: SessionEvent) {
        // No listeners is fine.
        let _ = self.inner.events.send(ev);
    }

    /// Commit a login/refresh grant: token first, then the user if the grant carries one.
    pub(crate) fn commit_grant(&self, grant: &TokenGrant) {
        self.inner.sessions.set_session(grant.access_token.clone(), grant.expires_in);
        if let Some(user) = &grant.user {
            self.inner.users.set(user.clone());
        }
    }

    /// Wipe token and user after an explicit logout.
    pub(crate) fn end(&self) {
        self.inner.sessions.clear();
        self.inner.users.clear();
        info!(target: "timeclock::auth", "session ended");
        self.emit(SessionEvent::LoggedOut);
    }

    /// Wipe token and user after an unrecoverable refresh failure.
    pub(crate) fn invalidate(&self, reason: &str) {
        self.inner.sessions.clear();
        self.inner.users.clear();
        warn!(target: "timeclock::auth", reason = reason, "session lost, re-authentication required");
        self.emit(SessionEvent::ReauthRequired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[tokio::test]
    async fn invalidate_clears_everything_and_notifies() {
        let ctx = SessionContext::new();
        let mut rx = ctx.subscribe();
        ctx.commit_grant(&TokenGrant {
            access_token: "tok".into(),
            expires_in: 600,
            user: Some(AuthenticatedUser {
                id: 1,
                username: "a".into(),
                role: Role::Employee,
                first_name: "A".into(),
                last_name: "B".into(),
                departments: None,
            }),
        });
        assert_eq!(ctx.sessions().get_token().as_deref(), Some("tok"));
        assert!(ctx.current_user().is_some());

        ctx.invalidate("test");
        assert_eq!(ctx.sessions().get_token(), None);
        assert!(ctx.current_user().is_none());
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::ReauthRequired);
    }

    #[test]
    fn clones_share_state() {
        let a = SessionContext::new();
        let b = a.clone();
        a.sessions().set_session("shared", 60);
        assert_eq!(b.sessions().get_token().as_deref(), Some("shared"));
        b.end();
        assert_eq!(a.sessions().get_token(), None);
    }
}
