//! Login, logout, refresh and current-user lookups over the request pipeline.

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, LOGIN_PATH, LOGOUT_PATH, ME_PATH};
use crate::error::ApiResult;
use crate::models::{AuthenticatedUser, LoginRequest, TokenGrant};
use crate::session::SessionEvent;

#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self { Self { client } }

    pub fn client(&self) -> &ApiClient { &self.client }

    /// Authenticate and commit the returned session. A 401 here is returned as-is.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AuthenticatedUser> {
        debug!(target: "timeclock::auth", username = username, "login");
        let grant: TokenGrant = self.client.post(LOGIN_PATH, &LoginRequest { username, password }).await?;
        let ctx = self.client.session();
        ctx.commit_grant(&grant);
        let user = match grant.user {
            Some(u) => u,
            None => match self.me().await {
                Ok(u) => u,
                Err(e) => {
                    // A token without a user is not a session.
                    warn!(target: "timeclock::auth", error = %e, "user lookup after login failed");
                    ctx.sessions().clear();
                    ctx.users().clear();
                    return Err(e);
                }
            },
        };
        info!(target: "timeclock::auth", user_id = user.id, role = ?user.role, "logged in");
        ctx.emit(SessionEvent::LoggedIn { user_id: user.id });
        Ok(user)
    }

    /// Tell the server, then wipe local state no matter what the server said.
    pub async fn logout(&self) {
        if let Err(e) = self.client.request_raw(Method::POST, LOGOUT_PATH, None).await.and_then(|r| r.into_result()) {
            warn!(target: "timeclock::auth", error = %e, "logout request failed; clearing local session anyway");
        }
        self.client.session().end();
    }

    /// Explicit refresh through the same single-flight path the pipeline uses.
    /// Failure clears the session and emits `ReauthRequired`.
    pub async fn refresh(&self) -> ApiResult<()> {
        self.client.shared_refresh().await.map(|_| ())
    }

    /// Fetch and publish the current user.
    pub async fn me(&self) -> ApiResult<AuthenticatedUser> {
        let user: AuthenticatedUser = self.client.get(ME_PATH).await?;
        self.client.session().users().set(user.clone());
        Ok(user)
    }

    /// Start-up attempt to resume from the refresh cookie. Returns `None` when there is
    /// nothing to resume. A missing cookie is not a session loss, so the grant fetch
    /// itself emits no `ReauthRequired`.
    pub async fn restore(&self) -> Option<AuthenticatedUser> {
        let grant = match self.client.fetch_grant().await {
            Ok(g) => g,
            Err(e) => {
                debug!(target: "timeclock::auth", error = %e, "no session to restore");
                return None;
            }
        };
        let ctx = self.client.session();
        ctx.commit_grant(&grant);
        let user = match grant.user {
            Some(u) => u,
            None => match self.me().await {
                Ok(u) => u,
                Err(e) => {
                    debug!(target: "timeclock::auth", error = %e, "restored token but user lookup failed");
                    ctx.sessions().clear();
                    return None;
                }
            },
        };
        ctx.emit(SessionEvent::LoggedIn { user_id: user.id });
        Some(user)
    }
}
