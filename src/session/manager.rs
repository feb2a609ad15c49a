use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::tprintln;

/// Upper bound on a server-granted lifetime.
pub const MAX_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Token and expiry are stored as one value so readers never see one without the other.
#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    expires_at: Instant,
}

/// Holds the current access token in process memory only.
///
/// Reads are concurrent; writes come from login, the refresh procedure and logout.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new() -> Self { Self::default() }

    /// Replace any prior session. A non-positive lifetime yields an already expired session;
    /// lifetimes beyond [`MAX_LIFETIME`] are clamped.
    pub fn set_session(&self, token: impl Into<String>, expires_in_secs: i64) {
        self.set_session_at(token, expires_in_secs, Instant::now());
    }

    pub fn set_session_at(&self, token: impl Into<String>, expires_in_secs: i64, now: Instant) {
        let lifetime = Duration::from_secs(expires_in_secs.max(0) as u64).min(MAX_LIFETIME);
        let expires_at = now.checked_add(lifetime).unwrap_or(now);
        let sess = Session { access_token: token.into(), expires_at };
        tprintln!("session.set ttl_secs={}", lifetime.as_secs());
        *self.current.write() = Some(sess);
    }

    /// Token if it has not expired yet; `None` is indistinguishable from "never logged in".
    pub fn get_token(&self) -> Option<String> { self.token_at(Instant::now()) }

    pub fn token_at(&self, now: Instant) -> Option<String> {
        let guard = self.current.read();
        match guard.as_ref() {
            Some(s) if now < s.expires_at => Some(s.access_token.clone()),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool { self.get_token().is_some() }

    /// Remaining lifetime; zero when absent or expired.
    pub fn expires_in(&self) -> Duration {
        let now = Instant::now();
        self.current
            .read()
            .as_ref()
            .map(|s| s.expires_at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Idempotent.
    pub fn clear(&self) {
        if self.current.write().take().is_some() {
            tprintln!("session.clear");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_visible_until_expiry() {
        let sm = SessionManager::new();
        let t0 = Instant::now();
        sm.set_session_at("abc", 60, t0);
        assert_eq!(sm.token_at(t0).as_deref(), Some("abc"));
        assert_eq!(sm.token_at(t0 + Duration::from_secs(59)).as_deref(), Some("abc"));
        assert_eq!(sm.token_at(t0 + Duration::from_secs(60)), None);
        assert_eq!(sm.token_at(t0 + Duration::from_secs(3600)), None);
    }

    #[test]
    fn non_positive_lifetime_is_expired() {
        let sm = SessionManager::new();
        sm.set_session("abc", 0);
        assert_eq!(sm.get_token(), None);
        sm.set_session("abc", -30);
        assert_eq!(sm.get_token(), None);
        assert!(!sm.is_active());
    }

    #[test]
    fn set_overwrites_and_clear_is_idempotent() {
        let sm = SessionManager::new();
        sm.set_session("first", 3600);
        sm.set_session("second", 3600);
        assert_eq!(sm.get_token().as_deref(), Some("second"));
        assert!(sm.expires_in() > Duration::from_secs(3500));
        sm.clear();
        sm.clear();
        assert_eq!(sm.get_token(), None);
        assert_eq!(sm.expires_in(), Duration::ZERO);
    }

    #[test]
    fn huge_lifetime_is_clamped() {
        let sm = SessionManager::new();
        sm.set_session("long", i64::MAX);
        assert_eq!(sm.get_token().as_deref(), Some("long"));
        assert!(sm.expires_in() <= MAX_LIFETIME);
        assert!(sm.expires_in() > MAX_LIFETIME - Duration::from_secs(60));
    }

    #[test]
    fn never_logged_in_is_absent() {
        let sm = SessionManager::default();
        assert_eq!(sm.get_token(), None);
        assert!(!sm.is_active());
    }
}
