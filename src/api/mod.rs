//!
//! Request pipeline
//! ----------------
//! Every outbound call goes through [`ApiClient`]. It attaches the current bearer
//! token, and when a non-auth endpoint answers 401 it refreshes the session once
//! (shared across concurrent callers) and re-issues the original request a single
//! time. A failed refresh wipes local auth state and broadcasts
//! [`SessionEvent::ReauthRequired`].
//!
//! All other statuses are returned to the caller untouched.

mod refresh;

use std::sync::Arc;

use futures_util::FutureExt;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::models::TokenGrant;
use crate::session::{SessionContext, SessionEvent};
use refresh::RefreshGate;

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const ME_PATH: &str = "/auth/me";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Status and body of a completed exchange, before any status interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    /// Decode the body; an empty body decodes as JSON `null` so `()` and `Option<T>` work.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let bytes: &[u8] = if self.body.iter().all(|b| b.is_ascii_whitespace()) { b"null" } else { &self.body };
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn message(&self) -> Option<String> { ErrorBody::message_from(&self.body) }

    /// Turn a non-success status into the matching error.
    pub fn into_result(self) -> ApiResult<RawResponse> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self.message();
        if self.status == 401 {
            Err(ApiError::Unauthorized { message })
        } else {
            Err(ApiError::Http { status: self.status, message })
        }
    }
}

/// Login and refresh failures are never recovered by a refresh.
fn is_auth_endpoint(path: &str) -> bool {
    let p = path.split('?').next().unwrap_or(path).trim_matches('/');
    p == LOGIN_PATH.trim_matches('/') || p == REFRESH_PATH.trim_matches('/')
}

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    http: reqwest::Client,
    session: SessionContext,
    refresh: RefreshGate,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base_url", &self.inner.config.base_url.as_str()).finish()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: SessionContext) -> ApiResult<Self> {
        // The cookie store carries the refresh credential; the bearer token never leaves memory.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { inner: Arc::new(ClientInner { config, http, session, refresh: RefreshGate::default() }) })
    }

    pub fn config(&self) -> &ClientConfig { &self.inner.config }

    pub fn session(&self) -> &SessionContext { &self.inner.session }

    /// Refreshes started by this client so far.
    pub fn refresh_count(&self) -> u64 { self.inner.refresh.started() }

    pub fn refresh_in_flight(&self) -> bool { self.inner.refresh.in_flight() }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let v = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(v)).await
    }

    /// POST whose response body is ignored.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        let v = serde_json::to_value(body)?;
        self.request_raw(Method::POST, path, Some(v)).await?.into_result()?;
        Ok(())
    }

    pub async fn request<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<T> {
        self.request_raw(method, path, body).await?.into_result()?.json()
    }

    /// Run the pipeline and return the final status and body without interpreting
    /// non-success statuses. Transport failures and a failed refresh are still errors.
    pub async fn request_raw(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<RawResponse> {
        let url = self.inner.config.endpoint(path)?;
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::debug_span!(target: "timeclock::api", "request", method = %method, path = %path, request_id = %request_id);
        async move {
            let token = self.inner.session.sessions().get_token();
            let first = self.send_once(&method, &url, body.as_ref(), token.as_deref(), &request_id).await?;
            if first.status != 401 || is_auth_endpoint(path) {
                return Ok(first);
            }
            debug!(target: "timeclock::api", "401 received, refreshing session");
            let fresh = self.refresh_after(token.as_deref()).await?;
            // One retry only; whatever it returns goes back to the caller.
            let retried = self.send_once(&method, &url, body.as_ref(), Some(&fresh), &request_id).await?;
            if retried.status == 401 {
                warn!(target: "timeclock::api", "request still unauthorized after refresh");
            }
            Ok(retried)
        }
        .instrument(span)
        .await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        token: Option<&str>,
        request_id: &str,
    ) -> ApiResult<RawResponse> {
        let mut req = self.inner.http.request(method.clone(), url.clone()).header(REQUEST_ID_HEADER, request_id);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        debug!(target: "timeclock::api", status = status, bytes = body.len(), "response");
        Ok(RawResponse { status, body })
    }

    /// Obtain a token newer than `stale`, joining or starting the shared refresh.
    async fn refresh_after(&self, stale: Option<&str>) -> ApiResult<String> {
        // A concurrent caller may already have installed a newer token.
        if let Some(current) = self.inner.session.sessions().get_token() {
            if Some(current.as_str()) != stale {
                return Ok(current);
            }
        }
        self.shared_refresh().await
    }

    /// Refresh through the single-flight gate. Failure is terminal for the session.
    pub(crate) async fn shared_refresh(&self) -> ApiResult<String> {
        let client = self.clone();
        let fut = self.inner.refresh.join_or_start(move || {
            async move {
                match client.fetch_grant().await {
                    Ok(grant) => {
                        client.inner.session.commit_grant(&grant);
                        client.inner.session.emit(SessionEvent::Refreshed);
                        info!(target: "timeclock::auth", expires_in = grant.expires_in, "session refreshed");
                        Ok(grant.access_token)
                    }
                    Err(e) => {
                        client.inner.session.invalidate(&e.to_string());
                        Err(ApiError::SessionExpired)
                    }
                }
            }
            .boxed()
        });
        fut.await
    }

    /// Call the refresh endpoint with the ambient cookie only. Commits nothing.
    pub(crate) async fn fetch_grant(&self) -> ApiResult<TokenGrant> {
        let url = self.inner.config.endpoint(REFRESH_PATH)?;
        let request_id = Uuid::new_v4().to_string();
        let resp = self.send_once(&Method::POST, &url, None, None, &request_id).await?.into_result()?;
        resp.json()
    }
}
