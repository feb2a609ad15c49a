use tokio::sync::watch;

use crate::models::AuthenticatedUser;

/// Observable holder of the signed-in user. Front-end components subscribe and
/// re-render when the value is replaced.
#[derive(Debug)]
pub struct UserStore {
    tx: watch::Sender<Option<AuthenticatedUser>>,
}

impl Default for UserStore {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }
}

impl UserStore {
    pub fn new() -> Self { Self::default() }

    /// Replace the user wholesale.
    pub fn set(&self, user: AuthenticatedUser) {
        self.tx.send_replace(Some(user));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<AuthenticatedUser> { self.tx.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthenticatedUser>> { self.tx.subscribe() }
}
